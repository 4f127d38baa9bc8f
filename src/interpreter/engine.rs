// Evaluator: walks expression ASTs against a resolution host

use crate::format::UnknownSpecifier;
use crate::interpreter::constants::DEFAULT_MAX_STRING_LEN;
use crate::interpreter::context::RefContainer;
use crate::interpreter::errors::{EvalError, EvalResult};
use crate::interpreter::host::ResolutionHost;
use crate::memory::value::Value;
use crate::parser::ast::Expr;
use crate::parser::parse;
use log::{trace, warn};

/// Knobs of the evaluator that come from the engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    pub unknown_specifier: UnknownSpecifier,
    /// Longest string followed through a pointer by `%N` / `%U`
    pub max_string_len: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            unknown_specifier: UnknownSpecifier::Placeholder,
            max_string_len: DEFAULT_MAX_STRING_LEN,
        }
    }
}

/// Expression evaluator.
///
/// Borrows the host for its lifetime. Each top-level evaluation starts from
/// a fresh [`RefContainer`] over `root`; the container of the last
/// successful evaluation stays available through [`Evaluator::last_container`].
pub struct Evaluator<'h, H: ResolutionHost> {
    pub(crate) host: &'h mut H,
    pub(crate) root: H::Ref,
    pub(crate) options: EvalOptions,
    last: Option<RefContainer<H::Ref>>,
}

impl<'h, H: ResolutionHost> Evaluator<'h, H> {
    pub fn new(host: &'h mut H, root: H::Ref) -> Self {
        Evaluator {
            host,
            root,
            options: EvalOptions::default(),
            last: None,
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn host(&mut self) -> &mut H {
        &mut *self.host
    }

    /// Evaluate a parsed expression
    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        let mut ctx = RefContainer::new(self.root.clone());
        let value = self.eval(expr, &mut ctx)?;
        trace!("{} = {:?}", expr.describe(), value);
        self.last = Some(ctx);
        Ok(value)
    }

    /// Evaluate, logging a failure and turning it into an undefined result
    pub fn evaluate_or_log(&mut self, expr: &Expr) -> Option<Value> {
        match self.evaluate(expr) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Evaluation of {} failed: {}", expr.describe(), err);
                None
            }
        }
    }

    /// Parse and evaluate expression text
    pub fn evaluate_text(&mut self, text: &str) -> EvalResult<Value> {
        let parsed = parse(text, false);
        match parsed.ast {
            Some(ast) => self.evaluate(&ast),
            None => Err(EvalError::Parse(
                parsed
                    .first_error()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "no expression".to_string()),
            )),
        }
    }

    /// Container the last successful evaluation finished on
    pub fn last_container(&self) -> Option<&RefContainer<H::Ref>> {
        self.last.as_ref()
    }

    // ===== Reads and writes through a frozen container =====

    /// Read through a resolved container; a missing value is an error
    pub(crate) fn must_read(&mut self, ctx: &RefContainer<H::Ref>) -> EvalResult<Value> {
        self.host
            .read_value(ctx)
            .map_err(|source| EvalError::ReadFailed {
                what: describe_container(ctx),
                source,
            })
    }

    /// Write through a resolved container; returns the stored value
    pub(crate) fn must_write(
        &mut self,
        ctx: &RefContainer<H::Ref>,
        value: &Value,
    ) -> EvalResult<Value> {
        self.host
            .write_value(ctx, value)
            .map_err(|source| EvalError::WriteFailed {
                what: describe_container(ctx),
                source,
            })
    }
}

pub(crate) fn describe_container<R>(ctx: &RefContainer<R>) -> String {
    match (&ctx.member, ctx.index) {
        (Some(name), Some(index)) => format!("{}[{}]", name, index),
        (Some(name), None) => name.clone(),
        (None, _) => "<unresolved>".to_string(),
    }
}

/// Evaluate `expr` once against `host`
pub fn evaluate<H: ResolutionHost>(host: &mut H, root: H::Ref, expr: &Expr) -> EvalResult<Value> {
    Evaluator::new(host, root).evaluate(expr)
}

/// Evaluate `expr` once, logging failures as an undefined result
pub fn evaluate_or_log<H: ResolutionHost>(host: &mut H, root: H::Ref, expr: &Expr) -> Option<Value> {
    Evaluator::new(host, root).evaluate_or_log(expr)
}
