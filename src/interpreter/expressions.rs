//! Expression evaluation dispatch
//!
//! This module walks one AST node at a time:
//!
//! - Folded nodes return their constant without touching the host
//! - References (identifier, member, index) resolve and then read
//! - Operators are delegated to the `ops` modules
//! - Calls and intrinsics go to `builtins`, templates to `printf`
//!
//! Every method takes the [`RefContainer`] it works on explicitly; nested
//! evaluations receive their own isolated container.

use crate::interpreter::context::RefContainer;
use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::{EvalError, EvalResult};
use crate::interpreter::host::ResolutionHost;
use crate::memory::value::Value;
use crate::parser::ast::*;

impl<H: ResolutionHost> Evaluator<'_, H> {
    /// Evaluate an expression within `ctx`
    pub(crate) fn eval(&mut self, expr: &Expr, ctx: &mut RefContainer<H::Ref>) -> EvalResult<Value> {
        if let Some(value) = &expr.constant {
            return Ok(value.clone());
        }

        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),

            ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => {
                self.resolve(expr, ctx)?;
                self.must_read(ctx)
            }

            ExprKind::ColonPath(parts) => {
                self.host
                    .colon_path(parts)
                    .map_err(|source| EvalError::UnresolvedColonPath {
                        path: parts.join(":"),
                        source,
                    })
            }

            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, expr.span, ctx),

            ExprKind::Update { op, prefix, target } => {
                self.eval_update(*op, *prefix, target, expr.span, ctx)
            }

            ExprKind::Binary { op, left, right } => {
                self.eval_binary(*op, left, right, expr.span, ctx)
            }

            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let condition = self.eval(test, ctx)?;
                if condition.is_truthy() {
                    self.eval(consequent, ctx)
                } else {
                    self.eval(alternate, ctx)
                }
            }

            ExprKind::Assign { op, target, value } => {
                self.eval_assign(*op, target, value, expr.span, ctx)
            }

            ExprKind::Call { callee, args } => self.eval_call(callee, args, ctx),

            ExprKind::Intrinsic { which, args } => {
                self.eval_intrinsic(*which, args, expr.span, ctx)
            }

            ExprKind::Printf(segments) => self.eval_printf(segments, ctx).map(Value::Str),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::testing::{eval_text, TestHost};
    use crate::memory::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_folded_constant_skips_host() {
        let mut host = TestHost::new();
        assert_eq!(eval_text(&mut host, "2 * (3 + 4)").unwrap(), Value::I32(14));
        assert_eq!(host.reads, 0);
    }

    #[test]
    fn test_conditional_evaluates_one_branch() {
        let mut host = TestHost::new().with_u32("flag", 1).with_u32("count", 9);
        assert_eq!(
            eval_text(&mut host, "flag ? count : missing").unwrap(),
            Value::U32(9)
        );
        assert_eq!(host.reads, 2);
    }

    #[test]
    fn test_unknown_identifier_fails() {
        let mut host = TestHost::new();
        assert!(eval_text(&mut host, "nope + 1").is_err());
    }
}
