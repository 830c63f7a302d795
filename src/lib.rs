pub mod analyzer;
pub mod ast;
pub mod builtins;
pub mod emitter;
pub mod environment;
pub mod fixtures;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;

use thiserror::Error;

use crate::analyzer::{AnalysisError, Analyzer};
use crate::ast::Program;
use crate::emitter::{EmitError, Emitter};
use crate::environment::Environment;
use crate::interpreter::{Execution, Interpreter, RuntimeError};
use crate::lexer::LexError;
use crate::parser::ParseError;

/// Any failure of the lex, parse, analyze, run or emit pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Tokenizes, parses and analyzes `source` against `environment`.
pub fn check_source(environment: &Environment, source: &str) -> Result<Program, Error> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse_tokens(tokens)?;
    Analyzer::new(environment).analyze(&program)?;
    Ok(program)
}

pub fn run_source_in(environment: &Environment, source: &str) -> Result<Execution, Error> {
    let program = check_source(environment, source)?;
    Ok(Interpreter::new(environment).run(&program)?)
}

pub fn emit_source_in(environment: &Environment, source: &str) -> Result<String, Error> {
    let program = check_source(environment, source)?;
    Ok(Emitter.emit(&program)?)
}

/// Runs `source` with the standard environment.
pub fn run_source(source: &str) -> Result<Execution, Error> {
    run_source_in(&Environment::standard(), source)
}

/// Emits `source` as Java with the standard environment.
pub fn emit_source(source: &str) -> Result<String, Error> {
    emit_source_in(&Environment::standard(), source)
}
