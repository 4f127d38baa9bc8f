//! Intrinsic and user function calls
//!
//! This module dispatches calls to the resolution host.
//!
//! # Intrinsics
//!
//! - `__GetRegVal(reg)`: register value
//! - `__FindSymbol(sym)`: symbol address
//! - `__CalcMemUsed(addr, size, fill, magic)`: stack usage
//! - `__size_of(sym)`: symbol size in bytes
//! - `__Symbol_exists(sym)`: 1 if the symbol is known
//! - `__Offset_of(type:member)`: member offset
//! - `__Running`: 1 while the target runs
//!
//! # Implementation Notes
//!
//! - Name-taking intrinsics receive identifiers, string literals and colon
//!   paths verbatim; they are never evaluated
//! - Every other argument is evaluated in its own container
//! - A host failure aborts the evaluation, there is no default result

use crate::interpreter::context::RefContainer;
use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::{EvalError, EvalResult};
use crate::interpreter::host::ResolutionHost;
use crate::memory::value::Value;
use crate::parser::ast::{Expr, ExprKind, Intrinsic, Span};
use smallvec::SmallVec;

impl<H: ResolutionHost> Evaluator<'_, H> {
    pub(crate) fn eval_call(
        &mut self,
        callee: &str,
        args: &[Expr],
        ctx: &mut RefContainer<H::Ref>,
    ) -> EvalResult<Value> {
        let values = self.eval_arguments(args, ctx)?;
        self.host
            .call(callee, &values)
            .map_err(|source| EvalError::CallFailed {
                name: callee.to_string(),
                source,
            })
    }

    pub(crate) fn eval_intrinsic(
        &mut self,
        which: Intrinsic,
        args: &[Expr],
        span: Span,
        ctx: &mut RefContainer<H::Ref>,
    ) -> EvalResult<Value> {
        let result = if which.takes_names() {
            let name = match args.first() {
                Some(arg) => verbatim_name(arg).ok_or(EvalError::InvalidArgument {
                    intrinsic: which.name(),
                    span: arg.span,
                })?,
                None => {
                    return Err(EvalError::InvalidArgument {
                        intrinsic: which.name(),
                        span,
                    })
                }
            };
            match which {
                Intrinsic::GetRegVal => self.host.get_reg_val(&name),
                Intrinsic::FindSymbol => self.host.find_symbol(&name),
                Intrinsic::SizeOf => self.host.size_of(&name),
                Intrinsic::SymbolExists => self.host.symbol_exists(&name),
                _ => self.host.offset_of(&name),
            }
        } else if which == Intrinsic::Running {
            self.host.running()
        } else {
            let values = self.eval_arguments(args, ctx)?;
            let mut numbers = [0u64; 4];
            for (slot, (value, arg)) in numbers.iter_mut().zip(values.iter().zip(args)) {
                *slot = value.as_u64().ok_or(EvalError::InvalidArgument {
                    intrinsic: which.name(),
                    span: arg.span,
                })?;
            }
            let [address, size, fill, magic] = numbers;
            self.host.calc_mem_used(address, size, fill, magic)
        };

        result.map_err(|source| EvalError::CallFailed {
            name: which.name().to_string(),
            source,
        })
    }

    fn eval_arguments(
        &mut self,
        args: &[Expr],
        ctx: &RefContainer<H::Ref>,
    ) -> EvalResult<SmallVec<[Value; 4]>> {
        let mut values = SmallVec::new();
        for arg in args {
            let mut inner = ctx.isolated();
            values.push(self.eval(arg, &mut inner)?);
        }
        Ok(values)
    }
}

/// The name an identifier, string literal or colon path designates
fn verbatim_name(arg: &Expr) -> Option<String> {
    match &arg.kind {
        ExprKind::Identifier(name) => Some(name.clone()),
        ExprKind::Literal(Value::Str(s)) => Some(s.clone()),
        ExprKind::ColonPath(parts) => Some(parts.join(":")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::errors::EvalError;
    use crate::interpreter::testing::{eval_text, TestHost, BASE};
    use crate::memory::value::Value;
    use pretty_assertions::assert_eq;

    fn host() -> TestHost {
        TestHost::new()
            .with_u32("counter", 3)
            .with_register("R0", 0x1234)
    }

    #[test]
    fn test_name_intrinsics_are_not_evaluated() {
        let mut host = host();
        assert_eq!(eval_text(&mut host, "__GetRegVal(R0)").unwrap(), Value::U32(0x1234));
        assert_eq!(
            eval_text(&mut host, "__FindSymbol(\"counter\")").unwrap(),
            Value::U32(BASE as u32)
        );
        assert_eq!(eval_text(&mut host, "__size_of(counter)").unwrap(), Value::U32(4));
        assert_eq!(eval_text(&mut host, "__Symbol_exists(nothing)").unwrap(), Value::I32(0));
        assert_eq!(host.reads, 0);
    }

    #[test]
    fn test_running_and_calls() {
        let mut host = host();
        assert_eq!(eval_text(&mut host, "__Running").unwrap(), Value::I32(0));
        assert_eq!(eval_text(&mut host, "max(counter, 7)").unwrap(), Value::I32(7));
    }

    #[test]
    fn test_unsupported_intrinsic_fails() {
        let mut host = host();
        assert!(matches!(
            eval_text(&mut host, "__Offset_of(T:m)"),
            Err(EvalError::CallFailed { .. })
        ));
        assert!(matches!(
            eval_text(&mut host, "__CalcMemUsed(0, 0, 0, 0)"),
            Err(EvalError::CallFailed { .. })
        ));
        assert!(matches!(
            eval_text(&mut host, "__GetRegVal(1 + 1)"),
            Err(EvalError::InvalidArgument { .. })
        ));
        assert!(matches!(
            eval_text(&mut host, "unknown(1)"),
            Err(EvalError::CallFailed { .. })
        ));
    }
}
