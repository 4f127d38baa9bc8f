// Unary operators and `++` / `--`

use crate::interpreter::context::RefContainer;
use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::{EvalError, EvalResult};
use crate::interpreter::host::ResolutionHost;
use crate::memory::arith;
use crate::memory::value::Value;
use crate::parser::ast::{Expr, Span, UnOp, UpdateOp};

impl<H: ResolutionHost> Evaluator<'_, H> {
    pub(crate) fn eval_unary(
        &mut self,
        op: UnOp,
        operand: &Expr,
        span: Span,
        ctx: &mut RefContainer<H::Ref>,
    ) -> EvalResult<Value> {
        let value = self.eval(operand, ctx)?;
        arith::unary(op, &value).map_err(|e| EvalError::arithmetic(e, span))
    }

    /// `++x` / `x++` and friends. Prefix forms yield the new value, postfix
    /// forms the old one.
    pub(crate) fn eval_update(
        &mut self,
        op: UpdateOp,
        prefix: bool,
        target: &Expr,
        span: Span,
        ctx: &mut RefContainer<H::Ref>,
    ) -> EvalResult<Value> {
        if !target.is_reference() {
            return Err(EvalError::InvalidTarget {
                what: target.describe(),
                span: target.span,
            });
        }

        self.resolve(target, ctx)?;
        let frozen = ctx.clone();
        let old = self.must_read(&frozen)?;
        let new = arith::increment(&old, op == UpdateOp::Increment)
            .map_err(|e| EvalError::arithmetic(e, span))?;
        let stored = self.must_write(&frozen, &new)?;

        Ok(if prefix { stored } else { old })
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::testing::{eval_text, TestHost};
    use crate::memory::value::{ScalarType, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unary() {
        let mut host = TestHost::new().with_u32("mask", 0x0F);
        assert_eq!(eval_text(&mut host, "~mask").unwrap(), Value::U32(0xFFFF_FFF0));
        assert_eq!(eval_text(&mut host, "!mask").unwrap(), Value::I32(0));
        assert_eq!(eval_text(&mut host, "-mask").unwrap(), Value::I32(-15));
    }

    #[test]
    fn test_prefix_and_postfix() {
        let mut host = TestHost::new().with_u32("n", 7);
        assert_eq!(eval_text(&mut host, "n++").unwrap(), Value::U32(7));
        assert_eq!(eval_text(&mut host, "n").unwrap(), Value::U32(8));
        assert_eq!(eval_text(&mut host, "--n").unwrap(), Value::U32(7));
        assert_eq!(host.writes, 2);
    }

    #[test]
    fn test_update_wraps_to_declared_width() {
        let mut host = TestHost::new().with_scalar("b", ScalarType::uint(8), Value::U32(255));
        assert_eq!(eval_text(&mut host, "++b").unwrap(), Value::U32(0));
    }
}
