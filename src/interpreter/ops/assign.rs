//! Assignment and compound assignment
//!
//! The left-hand side is resolved once into a frozen container before the
//! right-hand side runs, and the right-hand side gets its own container, so
//! nothing it resolves can move the write target.
//!
//! `/=` and `%=` divide according to the declared type of the destination:
//! unsigned types divide their masked bit patterns, signed types truncate,
//! float types divide as floats. Without a declared type, integer division
//! is used only when both operands are whole numbers.

use crate::interpreter::context::RefContainer;
use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::{EvalError, EvalResult};
use crate::interpreter::host::ResolutionHost;
use crate::memory::arith;
use crate::memory::value::Value;
use crate::parser::ast::{AssignOp, BinOp, Expr, Span};

impl<H: ResolutionHost> Evaluator<'_, H> {
    pub(crate) fn eval_assign(
        &mut self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
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

        let mut rhs_ctx = ctx.isolated();
        let rhs = self.eval(value, &mut rhs_ctx)?;

        let result = match op {
            AssignOp::Assign => rhs,
            AssignOp::Compound(op @ (BinOp::Div | BinOp::Mod)) => {
                let current = self.must_read(&frozen)?;
                arith::divide_typed(op, &current, &rhs, frozen.value_type)
                    .map_err(|e| EvalError::arithmetic(e, span))?
            }
            AssignOp::Compound(op) => {
                let current = self.must_read(&frozen)?;
                arith::binary(op, &current, &rhs).map_err(|e| EvalError::arithmetic(e, span))?
            }
        };

        let stored = self.must_write(&frozen, &result)?;
        *ctx = frozen;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::context::RefContainer;
    use crate::interpreter::engine::Evaluator;
    use crate::interpreter::host::{HostError, HostResult, ResolutionHost};
    use crate::interpreter::testing::{eval_text, TestHost};
    use crate::memory::arith::divide_typed;
    use crate::memory::value::{ScalarType, Value};
    use crate::parser::ast::BinOp;
    use pretty_assertions::assert_eq;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_typed_compound_division() {
        let mut host = TestHost::new()
            .with_u32("u", 5)
            .with_scalar("f", ScalarType::float(32), Value::F64(5.0))
            .with_scalar("s", ScalarType::int(16), Value::I32(-7));
        assert_eq!(eval_text(&mut host, "u /= 2").unwrap(), Value::U32(2));
        assert_eq!(eval_text(&mut host, "f /= 2").unwrap(), Value::F64(2.5));
        assert_eq!(eval_text(&mut host, "s /= 2").unwrap(), Value::I32(-3));
        assert_eq!(eval_text(&mut host, "s %= 2").unwrap(), Value::I32(-1));
    }

    #[test]
    fn test_assignment_writes_masked_value() {
        let mut host = TestHost::new().with_scalar("b", ScalarType::uint(8), Value::U32(0));
        assert_eq!(eval_text(&mut host, "b = 0x1FF").unwrap(), Value::U32(0xFF));
        assert_eq!(eval_text(&mut host, "b += 2").unwrap(), Value::U32(1));
    }

    #[test]
    fn test_rhs_does_not_move_the_target() {
        let mut host = TestHost::new()
            .with_array("slots", ScalarType::uint(32), &[10, 20, 30])
            .with_u32("i", 2);
        assert_eq!(eval_text(&mut host, "slots[1] = slots[i] + i").unwrap(), Value::U32(32));
        assert_eq!(eval_text(&mut host, "slots[1]").unwrap(), Value::U32(32));
        assert_eq!(eval_text(&mut host, "slots[2]").unwrap(), Value::U32(30));
    }

    #[test]
    fn test_division_by_zero_in_compound_assignment() {
        let mut host = TestHost::new().with_u32("u", 5);
        assert!(eval_text(&mut host, "u /= 0").unwrap_err().is_division_by_zero());
        assert_eq!(eval_text(&mut host, "u").unwrap(), Value::U32(5));
    }

    /// Host whose values carry no declared type
    #[derive(Default)]
    struct UntypedHost {
        vars: FxHashMap<String, Value>,
    }

    impl ResolutionHost for UntypedHost {
        type Ref = String;

        fn symbol_ref(&mut self, _root: &String, name: &str) -> HostResult<String> {
            Ok(name.to_string())
        }

        fn member_ref(&mut self, _base: &String, property: &str) -> HostResult<String> {
            Err(HostError::Undefined(property.to_string()))
        }

        fn read_value(&mut self, ctx: &RefContainer<String>) -> HostResult<Value> {
            let name = ctx.anchor.clone().unwrap_or_default();
            self.vars.get(&name).cloned().ok_or(HostError::Undefined(name))
        }

        fn write_value(&mut self, ctx: &RefContainer<String>, value: &Value) -> HostResult<Value> {
            let name = ctx.anchor.clone().unwrap_or_default();
            self.vars.insert(name, value.clone());
            Ok(value.clone())
        }
    }

    #[test]
    fn test_untyped_division_heuristic() {
        let mut host = UntypedHost::default();
        host.vars.insert("a".into(), Value::F64(5.0));
        host.vars.insert("b".into(), Value::F64(5.5));
        let mut evaluator = Evaluator::new(&mut host, String::new());
        assert_eq!(evaluator.evaluate_text("a /= 2").unwrap(), Value::I64(2));
        assert_eq!(evaluator.evaluate_text("b /= 2").unwrap(), Value::F64(2.75));
        // Plain division follows the operand kinds
        assert_eq!(evaluator.evaluate_text("5.0 / 2").unwrap(), Value::F64(2.5));
    }

    #[test]
    fn test_typed_division_of_plain_values() {
        let five = Value::I32(5);
        let two = Value::I32(2);
        assert_eq!(
            divide_typed(BinOp::Div, &five, &two, Some(ScalarType::uint(32))).unwrap(),
            Value::U32(2)
        );
        assert_eq!(
            divide_typed(BinOp::Div, &five, &two, Some(ScalarType::float(32))).unwrap(),
            Value::F64(2.5)
        );
    }
}
