use thiserror::Error;

use crate::environment::{NameError, TypeError};

/// First violation found while checking a program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error(transparent)]
    Name(#[from] NameError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
