use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("Invalid escape sequence '\\{escape}' at position {position}")]
    InvalidEscape { escape: char, position: usize },
    #[error("Empty character literal at position {position}")]
    EmptyCharacter { position: usize },
    #[error("Unterminated character literal at position {position}")]
    UnterminatedCharacter { position: usize },
    #[error("Unterminated string literal at position {position}")]
    UnterminatedString { position: usize },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { position, .. }
            | LexError::InvalidEscape { position, .. }
            | LexError::EmptyCharacter { position }
            | LexError::UnterminatedCharacter { position }
            | LexError::UnterminatedString { position } => *position,
        }
    }
}

pub type LexResult<T> = Result<T, LexError>;
