use thiserror::Error;

use crate::lexer::LexError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("Expected {expected}, found '{found}' at position {position}")]
    Unexpected {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("Expected {expected} at end of input (position {position})")]
    UnexpectedEnd { expected: String, position: usize },
    #[error("Invalid {kind} literal {literal} at position {position}")]
    InvalidLiteral {
        kind: &'static str,
        literal: String,
        position: usize,
    },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::Lex(error) => error.position(),
            ParseError::Unexpected { position, .. }
            | ParseError::UnexpectedEnd { position, .. }
            | ParseError::InvalidLiteral { position, .. } => *position,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
