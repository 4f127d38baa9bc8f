//! Constant folding and external-symbol collection
//!
//! Folding annotates nodes with [`Expr::constant`] bottom-up. Nodes with
//! effects (assignment, update, calls, intrinsics) are never given a value,
//! but their operands still are. Arithmetic that fails while folding (for
//! example a division by zero) leaves the node unfolded so the error is
//! raised at evaluation time.

use super::ast::{BinOp, Expr, ExprKind, Segment};
use crate::memory::arith;
use crate::memory::value::Value;
use rustc_hash::FxHashSet;

/// Fold `expr` in place. Returns the folded value of the root, if any.
pub fn fold(expr: &mut Expr) -> Option<Value> {
    let constant = match &mut expr.kind {
        ExprKind::Literal(value) => Some(value.clone()),
        ExprKind::Identifier(_) | ExprKind::ColonPath(_) => None,
        ExprKind::Member { object, .. } => {
            fold(object);
            None
        }
        ExprKind::Index { array, index } => {
            fold(array);
            fold(index);
            None
        }
        ExprKind::Unary { op, operand } => fold(operand).and_then(|v| arith::unary(*op, &v).ok()),
        ExprKind::Binary { op, left, right } => {
            let l = fold(left);
            let r = fold(right);
            fold_binary(*op, l, r)
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let t = fold(test);
            let c = fold(consequent);
            let a = fold(alternate);
            match t {
                Some(t) if t.is_truthy() => c,
                Some(_) => a,
                None => None,
            }
        }
        ExprKind::Assign { target, value, .. } => {
            fold_operands(target);
            fold(value);
            None
        }
        ExprKind::Update { target, .. } => {
            fold_operands(target);
            None
        }
        ExprKind::Call { args, .. } | ExprKind::Intrinsic { args, .. } => {
            for arg in args.iter_mut() {
                fold(arg);
            }
            None
        }
        ExprKind::Printf(segments) => {
            for segment in segments.iter_mut() {
                if let Segment::Format { expr, .. } = segment {
                    fold(expr);
                }
            }
            None
        }
    };

    expr.constant = constant.clone();
    constant
}

/// Fold the operands of an lvalue without folding the lvalue itself
fn fold_operands(target: &mut Expr) {
    match &mut target.kind {
        ExprKind::Member { object, .. } => {
            fold(object);
        }
        ExprKind::Index { array, index } => {
            fold_operands(array);
            fold(index);
        }
        _ => {}
    }
}

fn fold_binary(op: BinOp, left: Option<Value>, right: Option<Value>) -> Option<Value> {
    match (op, &left) {
        // Short-circuit on a known left operand
        (BinOp::And, Some(l)) if !l.is_truthy() => return Some(Value::from_bool(false)),
        (BinOp::Or, Some(l)) if l.is_truthy() => return Some(Value::from_bool(true)),
        _ => {}
    }
    let (l, r) = (left?, right?);
    arith::binary(op, &l, &r).ok()
}

/// Identifiers the expression reads from the data model, in first-seen
/// order. Names that are assigned to, or that head a colon path, count as
/// defined and are left out. Verbatim intrinsic arguments are not reads.
pub fn external_symbols(expr: &Expr) -> Vec<String> {
    let mut seen = Vec::new();
    let mut defined = FxHashSet::default();
    collect(expr, &mut seen, &mut defined);
    seen.retain(|name| !defined.contains(name));
    seen
}

fn collect(expr: &Expr, seen: &mut Vec<String>, defined: &mut FxHashSet<String>) {
    match &expr.kind {
        ExprKind::Identifier(name) => {
            if !seen.contains(name) {
                seen.push(name.clone());
            }
        }
        ExprKind::ColonPath(parts) => {
            if let Some(head) = parts.first() {
                defined.insert(head.clone());
            }
        }
        ExprKind::Literal(_) => {}
        ExprKind::Member { object, .. } => collect(object, seen, defined),
        ExprKind::Index { array, index } => {
            collect(array, seen, defined);
            collect(index, seen, defined);
        }
        ExprKind::Unary { operand, .. } => collect(operand, seen, defined),
        ExprKind::Update { target, .. } => collect(target, seen, defined),
        ExprKind::Binary { left, right, .. } => {
            collect(left, seen, defined);
            collect(right, seen, defined);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            collect(test, seen, defined);
            collect(consequent, seen, defined);
            collect(alternate, seen, defined);
        }
        ExprKind::Assign { target, value, .. } => {
            if let ExprKind::Identifier(name) = &target.kind {
                defined.insert(name.clone());
            }
            collect(target, seen, defined);
            collect(value, seen, defined);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                collect(arg, seen, defined);
            }
        }
        ExprKind::Intrinsic { which, args } => {
            if !which.takes_names() {
                for arg in args {
                    collect(arg, seen, defined);
                }
            }
        }
        ExprKind::Printf(segments) => {
            for segment in segments {
                if let Segment::Format { expr, .. } = segment {
                    collect(expr, seen, defined);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::value::Value;
    use crate::parser::ast::ExprKind;
    use crate::parser::parse::parse;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("1 + 2 * 3", Some(Value::I32(7)))]
    #[case("(1 << 4) | 3", Some(Value::I32(19)))]
    #[case("-5 / 2", Some(Value::I32(-2)))]
    #[case("1 ? 10 : 20", Some(Value::I32(10)))]
    #[case("0 && x", Some(Value::I32(0)))]
    #[case("1 || x", Some(Value::I32(1)))]
    #[case("1 && x", None)]
    #[case("x + 1", None)]
    #[case("1 / 0", None)]
    #[case("\"a\" + 1", Some(Value::Str("a1".into())))]
    #[case("__Running", None)]
    fn test_folding(#[case] text: &str, #[case] expected: Option<Value>) {
        assert_eq!(parse(text, false).constant, expected);
    }

    #[test]
    fn test_effectful_nodes_keep_folded_operands() {
        let ast = parse("a[1 + 1] = 2 * 3", false).ast.unwrap();
        assert_eq!(ast.constant, None);
        match ast.kind {
            ExprKind::Assign { target, value, .. } => {
                assert_eq!(value.constant, Some(Value::I32(6)));
                assert_eq!(target.constant, None);
                match target.kind {
                    ExprKind::Index { index, .. } => assert_eq!(index.constant, Some(Value::I32(2))),
                    other => panic!("Expected index, got {:?}", other),
                }
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_external_symbols() {
        assert_eq!(parse("a + b * a", false).external_symbols, vec!["a", "b"]);
        assert_eq!(parse("i = i + n", false).external_symbols, vec!["n"]);
        assert_eq!(parse("T:m + v", false).external_symbols, vec!["v"]);
        assert_eq!(
            parse("__GetRegVal(R0) + __CalcMemUsed(s, 64, 0xCC, 0) + base.x", false)
                .external_symbols,
            vec!["s", "base"]
        );
        assert_eq!(
            parse("%d[count] of %d[total]", false).external_symbols,
            vec!["count", "total"]
        );
    }
}
