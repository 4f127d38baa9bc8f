// Format template evaluation

use crate::format::{format_value, FormatOptions};
use crate::interpreter::context::RefContainer;
use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::{EvalError, EvalResult};
use crate::interpreter::host::ResolutionHost;
use crate::memory::value::Value;
use crate::parser::ast::{Expr, Segment};

impl<H: ResolutionHost> Evaluator<'_, H> {
    /// Render a template: literal text as is, each `%<spec>[expr]` through
    /// the host override or the specifier engine
    pub(crate) fn eval_printf(
        &mut self,
        segments: &[Segment],
        ctx: &RefContainer<H::Ref>,
    ) -> EvalResult<String> {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Format { spec, expr } => {
                    let (value, container) = self.eval_captured(expr, ctx)?;
                    out.push_str(&self.format_segment(*spec, &value, &container)?);
                }
            }
        }
        Ok(out)
    }

    /// Evaluate a segment expression and keep the container it resolved.
    ///
    /// A reference whose value came from a folded constant or a cached path
    /// never filled its container; it is re-resolved in isolation so the
    /// declared type is still available to the formatter. Expressions that
    /// change state are evaluated exactly once and keep what they resolved.
    fn eval_captured(
        &mut self,
        expr: &Expr,
        ctx: &RefContainer<H::Ref>,
    ) -> EvalResult<(Value, RefContainer<H::Ref>)> {
        let mut container = ctx.isolated();
        let value = self.eval(expr, &mut container)?;

        if expr.is_reference() && container.value_type.is_none() && !expr.has_side_effects() {
            let mut recovered = ctx.isolated();
            if self.resolve(expr, &mut recovered).is_ok() {
                container = recovered;
            }
        }
        Ok((value, container))
    }

    fn format_segment(
        &mut self,
        spec: char,
        value: &Value,
        container: &RefContainer<H::Ref>,
    ) -> EvalResult<String> {
        let overridden = self
            .host
            .format_printf(spec, value, container)
            .map_err(|source| EvalError::CallFailed {
                name: format!("%{} formatter", spec),
                source,
            })?;
        if let Some(text) = overridden {
            return Ok(text);
        }

        let enum_text = match spec {
            'E' => self.host.enum_text(container, value),
            _ => None,
        };
        let symbol = match spec {
            'C' | 'S' => value.as_u64().and_then(|a| self.host.symbol_name(a)),
            _ => None,
        };

        // String pointers are followed on the target
        let value = match (spec, value) {
            ('N' | 'U', Value::Bytes(_) | Value::Str(_)) => value.clone(),
            ('N' | 'U', pointer) => match pointer.as_u64() {
                Some(address) => {
                    let bytes = self
                        .host
                        .read_bytes(address, self.options.max_string_len)
                        .map_err(|source| EvalError::ReadFailed {
                            what: format!("string at 0x{:08x}", address),
                            source,
                        })?;
                    Value::Bytes(bytes)
                }
                None => pointer.clone(),
            },
            _ => value.clone(),
        };

        let options = FormatOptions {
            type_info: container.value_type,
            enum_text: enum_text.as_deref(),
            symbol: symbol.as_deref(),
            pad_hex: false,
            unknown: self.options.unknown_specifier,
        };
        Ok(format_value(spec, &value, &options))
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::context::RefContainer;
    use crate::interpreter::engine::Evaluator;
    use crate::interpreter::host::{HostError, HostResult, ResolutionHost};
    use crate::interpreter::testing::{eval_text, TestHost, BASE};
    use crate::memory::value::{ScalarType, Value};
    use crate::parser::parse::parse;
    use pretty_assertions::assert_eq;

    fn host() -> TestHost {
        let mut host = TestHost::new()
            .with_scalar("prio", ScalarType::int(16), Value::I32(-2))
            .with_u32("state", 2)
            .with_u32("flags", 0x2e)
            .with_scalar("load", ScalarType::float(32), Value::F64(0.75));
        host.memory.extend_from_slice(b"idle\0");
        host.with_u32("name", BASE as u32 + 14)
            .with_u32("ptr", BASE as u32)
    }

    #[test]
    fn test_template_uses_declared_types() {
        let mut host = host();
        assert_eq!(
            eval_text(&mut host, "prio=%d[prio] flags=%x[flags] load=%T[load]").unwrap(),
            Value::Str("prio=-2 flags=0x2e load=0.750".into())
        );
        assert_eq!(eval_text(&mut host, "%u[prio]").unwrap(), Value::Str("65534".into()));
    }

    #[test]
    fn test_enum_symbol_and_string_pointers() {
        let mut host = host();
        assert_eq!(
            eval_text(&mut host, "%E[state] %S[ptr] %S[name] %N[name]").unwrap(),
            Value::Str("Running prio 0x2000000e idle".into())
        );
    }

    #[test]
    fn test_literal_percent_and_expressions() {
        let mut host = host();
        assert_eq!(
            eval_text(&mut host, "%d[flags / 2]%%").unwrap(),
            Value::Str("23%".into())
        );
    }

    /// Host without declared types: a counter `i` and a word array `arr`
    struct UntypedHost {
        i: u64,
        arr: Vec<u32>,
    }

    impl ResolutionHost for UntypedHost {
        type Ref = String;

        fn symbol_ref(&mut self, _root: &String, name: &str) -> HostResult<String> {
            match name {
                "i" | "arr" => Ok(name.to_string()),
                _ => Err(HostError::Undefined(name.to_string())),
            }
        }

        fn member_ref(&mut self, _base: &String, property: &str) -> HostResult<String> {
            Err(HostError::Undefined(property.to_string()))
        }

        fn read_value(&mut self, ctx: &RefContainer<String>) -> HostResult<Value> {
            match ctx.anchor.as_deref() {
                Some("i") => Ok(Value::U32(self.i as u32)),
                Some("arr") => self
                    .arr
                    .get((ctx.offset / 4) as usize)
                    .map(|v| Value::U32(*v))
                    .ok_or_else(|| HostError::Undefined("arr".into())),
                _ => Err(HostError::Undefined("read".into())),
            }
        }

        fn write_value(&mut self, ctx: &RefContainer<String>, value: &Value) -> HostResult<Value> {
            match (ctx.anchor.as_deref(), value.as_u64()) {
                (Some("i"), Some(v)) => {
                    self.i = v;
                    Ok(value.clone())
                }
                _ => Err(HostError::Undefined("write".into())),
            }
        }

        fn target_size(&mut self, _item: &String) -> HostResult<u64> {
            Ok(4)
        }
    }

    #[test]
    fn test_segment_side_effects_run_once() {
        let mut host = UntypedHost { i: 0, arr: vec![10, 20, 30] };
        let mut evaluator = Evaluator::new(&mut host, String::new());
        assert_eq!(evaluator.evaluate_text("%d[arr[i++]]").unwrap(), Value::Str("10".into()));
        assert_eq!(evaluator.evaluate_text("%d[arr[i]]").unwrap(), Value::Str("20".into()));
        assert_eq!(host.i, 1);
    }

    #[test]
    fn test_side_effect_detection() {
        let has = |text: &str| parse(text, false).ast.unwrap().has_side_effects();
        assert!(has("arr[i++]"));
        assert!(has("n = c ? 1 : 0"));
        assert!(has("a[x++].b"));
        assert!(!has("arr[i + 1].next"));
        assert!(!has("__size_of(arr)"));
    }
}
