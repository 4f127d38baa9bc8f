//! Evaluation error types
//!
//! This module defines [`EvalError`], every way a single expression
//! evaluation can fail. Evaluation is strict: the first error aborts the
//! whole expression and no partial result is produced. Callers that want an
//! "undefined" result instead use [`crate::interpreter::Evaluator::evaluate_or_log`].

use crate::interpreter::host::HostError;
use crate::memory::arith::ArithError;
use crate::parser::ast::Span;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The host does not know the symbol
    #[error("Unresolved symbol '{name}' at {span}")]
    UnresolvedSymbol { name: String, span: Span },

    /// The resolved object has no such member
    #[error("'{object}' has no member '{member}' at {span}")]
    UnresolvedMember {
        object: String,
        member: String,
        span: Span,
    },

    /// Reading a resolved reference produced no value
    #[error("Reading '{what}' failed: {source}")]
    ReadFailed {
        what: String,
        #[source]
        source: HostError,
    },

    /// Writing a resolved reference failed
    #[error("Writing '{what}' failed: {source}")]
    WriteFailed {
        what: String,
        #[source]
        source: HostError,
    },

    /// Assignment or update applied to something that is not storage
    #[error("{what} is not assignable at {span}")]
    InvalidTarget { what: String, span: Span },

    /// Index expression did not produce a non-negative integer
    #[error("Invalid index {value} at {span}")]
    InvalidIndex { value: String, span: Span },

    #[error("{source} at {span}")]
    Arithmetic {
        #[source]
        source: ArithError,
        span: Span,
    },

    /// An intrinsic was given something other than a name
    #[error("{intrinsic} expects a symbol or register name at {span}")]
    InvalidArgument { intrinsic: &'static str, span: Span },

    /// An intrinsic or host call failed or returned nothing
    #[error("{name} failed: {source}")]
    CallFailed {
        name: String,
        #[source]
        source: HostError,
    },

    #[error("Colon path '{path}' could not be resolved: {source}")]
    UnresolvedColonPath {
        path: String,
        #[source]
        source: HostError,
    },

    /// The expression text did not parse
    #[error("Expression does not parse: {0}")]
    Parse(String),
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    pub fn arithmetic(source: ArithError, span: Span) -> Self {
        EvalError::Arithmetic { source, span }
    }

    /// Division or modulo by zero
    pub fn is_division_by_zero(&self) -> bool {
        matches!(
            self,
            EvalError::Arithmetic {
                source: ArithError::DivisionByZero | ArithError::ModuloByZero,
                ..
            }
        )
    }
}
