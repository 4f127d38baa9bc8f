// Binary operators, with short-circuit evaluation of `&&` and `||`

use crate::interpreter::context::RefContainer;
use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::{EvalError, EvalResult};
use crate::interpreter::host::ResolutionHost;
use crate::memory::arith;
use crate::memory::value::Value;
use crate::parser::ast::{BinOp, Expr, Span};

impl<H: ResolutionHost> Evaluator<'_, H> {
    pub(crate) fn eval_binary(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        span: Span,
        ctx: &mut RefContainer<H::Ref>,
    ) -> EvalResult<Value> {
        let lhs = self.eval(left, ctx)?;

        match op {
            BinOp::And if !lhs.is_truthy() => return Ok(Value::from_bool(false)),
            BinOp::Or if lhs.is_truthy() => return Ok(Value::from_bool(true)),
            BinOp::And | BinOp::Or => {
                let rhs = self.eval(right, ctx)?;
                return Ok(Value::from_bool(rhs.is_truthy()));
            }
            _ => {}
        }

        let rhs = self.eval(right, ctx)?;
        arith::binary(op, &lhs, &rhs).map_err(|e| EvalError::arithmetic(e, span))
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::testing::{eval_text, TestHost};
    use crate::memory::value::{ScalarType, Value};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn host() -> TestHost {
        TestHost::new()
            .with_u32("five", 5)
            .with_u32("two", 2)
            .with_u32("zero", 0)
            .with_scalar("half", ScalarType::float(32), Value::F64(0.5))
            .with_scalar("big", ScalarType::uint(64), Value::U64(u64::MAX))
    }

    #[rstest]
    #[case("five / two", Value::U32(2))]
    #[case("five % two", Value::U32(1))]
    #[case("five * half", Value::F64(2.5))]
    #[case("five - two * 3", Value::I32(-1))]
    #[case("big + 1", Value::U64(0))]
    #[case("big >> 60", Value::U64(15))]
    #[case("five > two && two > zero", Value::I32(1))]
    #[case("zero && ghost", Value::I32(0))]
    #[case("five || ghost", Value::I32(1))]
    #[case("five == 5", Value::I32(1))]
    fn test_binary_operators(#[case] text: &str, #[case] expected: Value) {
        let mut host = host();
        assert_eq!(eval_text(&mut host, text).unwrap(), expected);
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let mut host = host();
        assert!(eval_text(&mut host, "five / zero").unwrap_err().is_division_by_zero());
        assert!(eval_text(&mut host, "five % zero").unwrap_err().is_division_by_zero());
    }
}
