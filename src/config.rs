//! Engine configuration
//!
//! [`EngineConfig`] collects the limits and policies of one statement engine.
//! Defaults come from [`crate::interpreter::constants`]; the `with_*` methods
//! override them one at a time.

use crate::format::UnknownSpecifier;
use crate::interpreter::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_LIST_ELEMENTS, DEFAULT_MAX_LOOP_ITERATIONS,
    DEFAULT_MAX_STRING_LEN,
};
use crate::interpreter::engine::EvalOptions;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a loop does when it reaches the iteration cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopCapPolicy {
    /// Stop iterating, keep the output produced so far, record an event
    #[default]
    Truncate,
    /// Treat the loop statement as failed and skip it
    Fail,
}

/// Shared cancellation flag, checked between statements
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_loop_iterations: usize,
    pub max_list_elements: usize,
    pub chunk_size: usize,
    pub max_string_len: usize,
    /// Time budget of one refresh pass
    pub deadline: Option<Duration>,
    pub cancel: Option<CancelToken>,
    pub loop_cap_policy: LoopCapPolicy,
    pub unknown_specifier: UnknownSpecifier,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            max_list_elements: DEFAULT_MAX_LIST_ELEMENTS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            deadline: None,
            cancel: None,
            loop_cap_policy: LoopCapPolicy::default(),
            unknown_specifier: UnknownSpecifier::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_max_loop_iterations(mut self, max: usize) -> Self {
        self.max_loop_iterations = max;
        self
    }

    pub fn with_max_list_elements(mut self, max: usize) -> Self {
        self.max_list_elements = max;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn with_max_string_len(mut self, len: usize) -> Self {
        self.max_string_len = len;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_loop_cap_policy(mut self, policy: LoopCapPolicy) -> Self {
        self.loop_cap_policy = policy;
        self
    }

    pub fn with_unknown_specifier(mut self, unknown: UnknownSpecifier) -> Self {
        self.unknown_specifier = unknown;
        self
    }

    /// The part of the configuration the expression evaluator sees
    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            unknown_specifier: self.unknown_specifier,
            max_string_len: self.max_string_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_loop_iterations, 100_000);
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.loop_cap_policy, LoopCapPolicy::Truncate);
        assert!(config.deadline.is_none());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let config = EngineConfig::default().with_cancel(token.clone());
        token.cancel();
        assert!(config.cancel.as_ref().is_some_and(CancelToken::is_cancelled));
        token.reset();
        assert!(!config.cancel.as_ref().is_some_and(CancelToken::is_cancelled));
    }
}
