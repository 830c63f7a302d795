use thiserror::Error;

use crate::environment::NameError;

/// Typed errors produced while evaluating an analyzed program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error(transparent)]
    Name(#[from] NameError),
    #[error("Expected a value of type {expected}, got {got}")]
    UnexpectedType { expected: &'static str, got: String },
    #[error("Unknown field '{field}' for type {type_name}")]
    UnknownField { field: String, type_name: String },
    #[error("Function '{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Operator '{operator}' is not defined for {left} and {right}")]
    InvalidOperands {
        operator: String,
        left: String,
        right: String,
    },
    #[error("Value of type {got} is not iterable")]
    NotIterable { got: String },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Program does not define main()")]
    MissingMain,
    #[error("main() returned {got}, expected an Integer")]
    MainNotInteger { got: String },
}

impl RuntimeError {
    pub fn expect_arity(name: &str, expected: usize, found: usize) -> Result<(), RuntimeError> {
        if expected == found {
            Ok(())
        } else {
            Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected,
                found,
            })
        }
    }
}
