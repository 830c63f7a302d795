#![allow(dead_code)]
use std::fs;

use plc::analyzer::Analyzer;
use plc::ast::Program;
use plc::environment::Environment;
use plc::{lexer, parser};

pub const WORKLOADS: [(&str, &str); 2] = [
    ("fibonacci", "tests/programs/fibonacci.plc"),
    ("loops", "tests/programs/bench_loops.plc"),
];

pub fn workloads() -> impl Iterator<Item = (&'static str, &'static str)> {
    WORKLOADS.into_iter()
}

pub fn load_source(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("read {path}: {err}"))
}

pub fn parse_program(path: &str) -> Program {
    let source = load_source(path);
    let tokens = lexer::tokenize(&source).unwrap_or_else(|err| panic!("tokenize {path}: {err}"));
    parser::parse_tokens(tokens).unwrap_or_else(|err| panic!("parse {path}: {err}"))
}

pub fn load_program(environment: &Environment, path: &str) -> Program {
    let program = parse_program(path);
    Analyzer::new(environment)
        .analyze(&program)
        .unwrap_or_else(|err| panic!("analyze {path}: {err}"));
    program
}
