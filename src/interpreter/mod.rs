//! Expression evaluator
//!
//! This module executes parsed expressions against a resolution host:
//! - [`engine`]: The [`Evaluator`] and its top-level entry points
//! - [`context`]: The reference container threaded through evaluation
//! - [`host`]: The [`ResolutionHost`] trait implemented by data models
//! - [`errors`]: Evaluation error types
//!
//! # Execution Model
//!
//! Evaluation is a recursive walk over the AST. References are resolved into
//! a [`RefContainer`] (anchor symbol plus accumulated byte offset) and read
//! or written through the host. Nested evaluations run in isolated
//! containers. The first error aborts the expression.
//!
//! # Intrinsics
//!
//! Intrinsic calls (`__GetRegVal`, `__CalcMemUsed`, ...) are dispatched to one
//! host method each; see [`builtins`].

pub mod builtins;
pub mod constants;
pub mod context;
pub mod engine;
pub mod errors;
pub mod expressions;
pub mod host;
pub mod ops;
pub mod printf;

#[cfg(test)]
pub(crate) mod testing;

pub use context::RefContainer;
pub use engine::{evaluate, evaluate_or_log, EvalOptions, Evaluator};
pub use errors::{EvalError, EvalResult};
pub use host::{HostError, HostResult, ResolutionHost};
