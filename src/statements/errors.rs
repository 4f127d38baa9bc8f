// Statement engine error types

use crate::interpreter::EvalError;
use crate::memory::CacheError;
use std::time::Duration;
use thiserror::Error;

/// Failure of one statement. The engine logs it, skips the statement and
/// carries on with its siblings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatementError {
    #[error("line {line}: condition failed: {source}")]
    Condition {
        line: u32,
        #[source]
        source: EvalError,
    },

    #[error("line {line}: {what} failed: {source}")]
    Eval {
        line: u32,
        what: &'static str,
        #[source]
        source: EvalError,
    },

    #[error("line {line}: {source}")]
    Cache {
        line: u32,
        #[source]
        source: CacheError,
    },

    #[error("line {line}: unknown type '{name}'")]
    UnknownType { line: u32, name: String },

    #[error("line {line}: symbol '{name}' not found on the target")]
    UnresolvedSymbol { line: u32, name: String },

    #[error("line {line}: {message}")]
    Invalid { line: u32, message: String },

    #[error("line {line}: loop stopped after {iterations} iterations")]
    LoopCap { line: u32, iterations: usize },
}

impl StatementError {
    pub fn line(&self) -> u32 {
        match self {
            StatementError::Condition { line, .. }
            | StatementError::Eval { line, .. }
            | StatementError::Cache { line, .. }
            | StatementError::UnknownType { line, .. }
            | StatementError::UnresolvedSymbol { line, .. }
            | StatementError::Invalid { line, .. }
            | StatementError::LoopCap { line, .. } => *line,
        }
    }
}

/// Failure of a whole refresh pass; the output tree is left as it was
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("refresh cancelled")]
    Cancelled,

    #[error("refresh exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

/// Outcome of executing one statement
#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum Interrupt {
    #[error(transparent)]
    Statement(#[from] StatementError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub(crate) type ExecResult<T = ()> = Result<T, Interrupt>;
