//! Arithmetic over tagged values
//!
//! Integer operands are widened to `i128`, combined exactly, and narrowed back
//! to the widest operand kind (`I32 < U32 < I64 < U64`). A result that does
//! not fit is promoted to the next kind that holds it; only results outside
//! the 64-bit range wrap.
//!
//! Any float operand selects float arithmetic. Strings concatenate with `+`
//! and compare with the relational operators.

use super::value::{ScalarKind, ScalarType, Value};
use crate::parser::ast::{BinOp, UnOp};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArithError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Modulo by zero")]
    ModuloByZero,

    #[error("Operator '{op}' cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("Shift amount {0} is out of range")]
    InvalidShift(i128),
}

/// Integer kinds ordered by rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum IntKind {
    I32,
    U32,
    I64,
    U64,
}

fn int_kind(v: &Value) -> Option<IntKind> {
    match v {
        Value::I32(_) => Some(IntKind::I32),
        Value::U32(_) => Some(IntKind::U32),
        Value::I64(_) => Some(IntKind::I64),
        Value::U64(_) => Some(IntKind::U64),
        _ => None,
    }
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::I32(_) => "int32",
        Value::U32(_) => "uint32",
        Value::I64(_) => "int64",
        Value::U64(_) => "uint64",
        Value::F64(_) => "float",
        Value::Str(_) => "string",
        Value::Bytes(_) => "bytes",
    }
}

fn mismatch(op: BinOp, left: &Value, right: &Value) -> ArithError {
    ArithError::TypeMismatch {
        op: op.symbol(),
        left: kind_name(left),
        right: kind_name(right),
    }
}

fn try_kind(v: i128, kind: IntKind) -> Option<Value> {
    match kind {
        IntKind::I32 => i32::try_from(v).ok().map(Value::I32),
        IntKind::U32 => u32::try_from(v).ok().map(Value::U32),
        IntKind::I64 => i64::try_from(v).ok().map(Value::I64),
        IntKind::U64 => u64::try_from(v).ok().map(Value::U64),
    }
}

/// Narrow an exact result to `kind`, promoting when it does not fit.
fn narrow(v: i128, kind: IntKind) -> Value {
    let ladder: &[IntKind] = match kind {
        IntKind::I32 => &[IntKind::I32, IntKind::I64, IntKind::U64],
        IntKind::I64 => &[IntKind::I64, IntKind::U64],
        // Unsigned kinds stay unsigned unless the result went negative
        IntKind::U32 if v >= 0 => &[IntKind::U32, IntKind::U64],
        IntKind::U64 if v >= 0 => &[IntKind::U64],
        IntKind::U32 => &[IntKind::I32, IntKind::I64],
        IntKind::U64 => &[IntKind::I64],
    };
    ladder
        .iter()
        .find_map(|k| try_kind(v, *k))
        .unwrap_or(match kind {
            IntKind::I32 | IntKind::I64 => Value::I64(v as i64),
            IntKind::U32 | IntKind::U64 => Value::U64(v as u64),
        })
}

/// Apply a binary operator. `&&` and `||` are evaluated eagerly here;
/// short-circuiting is the caller's concern.
pub fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, ArithError> {
    match op {
        BinOp::And => return Ok(Value::from_bool(left.is_truthy() && right.is_truthy())),
        BinOp::Or => return Ok(Value::from_bool(left.is_truthy() || right.is_truthy())),
        _ => {}
    }

    match (left, right) {
        (Value::Str(_), _) | (_, Value::Str(_)) => string_binary(op, left, right),
        (Value::Bytes(a), Value::Bytes(b)) => match op {
            BinOp::Eq => Ok(Value::from_bool(a == b)),
            BinOp::Ne => Ok(Value::from_bool(a != b)),
            _ => Err(mismatch(op, left, right)),
        },
        (Value::Bytes(_), _) | (_, Value::Bytes(_)) => Err(mismatch(op, left, right)),
        (Value::F64(_), _) | (_, Value::F64(_)) => float_binary(op, left, right),
        _ => integer_binary(op, left, right),
    }
}

fn string_binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, ArithError> {
    if op == BinOp::Add {
        return Ok(Value::Str(format!("{}{}", left, right)));
    }

    let (Value::Str(a), Value::Str(b)) = (left, right) else {
        return match op {
            BinOp::Eq => Ok(Value::from_bool(false)),
            BinOp::Ne => Ok(Value::from_bool(true)),
            _ => Err(mismatch(op, left, right)),
        };
    };

    compare(op, a.cmp(b))
        .map(Value::from_bool)
        .ok_or_else(|| mismatch(op, left, right))
}

fn compare(op: BinOp, ordering: Ordering) -> Option<bool> {
    match op {
        BinOp::Eq => Some(ordering == Ordering::Equal),
        BinOp::Ne => Some(ordering != Ordering::Equal),
        BinOp::Lt => Some(ordering == Ordering::Less),
        BinOp::Le => Some(ordering != Ordering::Greater),
        BinOp::Gt => Some(ordering == Ordering::Greater),
        BinOp::Ge => Some(ordering != Ordering::Less),
        _ => None,
    }
}

fn float_binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, ArithError> {
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(mismatch(op, left, right));
    };

    match op {
        BinOp::Add => Ok(Value::F64(a + b)),
        BinOp::Sub => Ok(Value::F64(a - b)),
        BinOp::Mul => Ok(Value::F64(a * b)),
        BinOp::Div if b == 0.0 => Err(ArithError::DivisionByZero),
        BinOp::Div => Ok(Value::F64(a / b)),
        BinOp::Mod if b == 0.0 => Err(ArithError::ModuloByZero),
        BinOp::Mod => Ok(Value::F64(a % b)),
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
            // Bitwise operators see the truncated integer
            let l = Value::I64(left.as_i64().ok_or_else(|| mismatch(op, left, right))?);
            let r = Value::I64(right.as_i64().ok_or_else(|| mismatch(op, left, right))?);
            integer_binary(op, &l, &r)
        }
        _ => a
            .partial_cmp(&b)
            .map_or(Some(op == BinOp::Ne), |ordering| compare(op, ordering))
            .map(Value::from_bool)
            .ok_or_else(|| mismatch(op, left, right)),
    }
}

fn integer_binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, ArithError> {
    let (Some(a), Some(b), Some(lk), Some(rk)) =
        (left.as_i128(), right.as_i128(), int_kind(left), int_kind(right))
    else {
        return Err(mismatch(op, left, right));
    };
    let kind = lk.max(rk);

    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(ArithError::DivisionByZero);
            }
            a / b
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(ArithError::ModuloByZero);
            }
            a % b
        }
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::Shl | BinOp::Shr => {
            if !(0..64).contains(&b) {
                return Err(ArithError::InvalidShift(b));
            }
            // |a| < 2^64 and b <= 63 keep |a << b| below 2^127, inside i128
            if op == BinOp::Shl {
                a << b
            } else {
                a >> b
            }
        }
        _ => {
            return compare(op, a.cmp(&b))
                .map(Value::from_bool)
                .ok_or_else(|| mismatch(op, left, right));
        }
    };

    Ok(narrow(result, kind))
}

/// Apply a unary operator
pub fn unary(op: UnOp, operand: &Value) -> Result<Value, ArithError> {
    let not_numeric = || ArithError::TypeMismatch {
        op: match op {
            UnOp::Neg => "-",
            UnOp::Plus => "+",
            UnOp::Not => "!",
            UnOp::BitNot => "~",
        },
        left: kind_name(operand),
        right: "nothing",
    };

    match op {
        UnOp::Not => Ok(Value::from_bool(!operand.is_truthy())),
        UnOp::Plus if operand.is_numeric() => Ok(operand.clone()),
        UnOp::Plus => Err(not_numeric()),
        UnOp::Neg => match operand {
            Value::F64(f) => Ok(Value::F64(-f)),
            other => {
                let (Some(n), Some(kind)) = (other.as_i128(), int_kind(other)) else {
                    return Err(not_numeric());
                };
                Ok(narrow(-n, kind))
            }
        },
        UnOp::BitNot => match operand {
            Value::I32(n) => Ok(Value::I32(!n)),
            Value::U32(n) => Ok(Value::U32(!n)),
            Value::I64(n) => Ok(Value::I64(!n)),
            Value::U64(n) => Ok(Value::U64(!n)),
            Value::F64(_) => operand
                .as_i64()
                .map(|n| Value::I64(!n))
                .ok_or_else(not_numeric),
            _ => Err(not_numeric()),
        },
    }
}

/// Division or modulo steered by the declared type of the destination.
///
/// With a type, floats divide as `f64`, unsigned types divide their masked
/// bit patterns, signed types divide as `i64`. Without one, integer
/// division is used only when both operands hold whole numbers.
pub fn divide_typed(
    op: BinOp,
    left: &Value,
    right: &Value,
    ty: Option<ScalarType>,
) -> Result<Value, ArithError> {
    debug_assert!(matches!(op, BinOp::Div | BinOp::Mod));
    let zero_error = if op == BinOp::Div {
        ArithError::DivisionByZero
    } else {
        ArithError::ModuloByZero
    };

    let Some(ty) = ty else {
        if left.is_integral() && right.is_integral() {
            let l = integral_operand(left);
            let r = integral_operand(right);
            return integer_binary(op, &l, &r);
        }
        return float_binary(op, left, right);
    };

    match ty.kind {
        ScalarKind::Float => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(mismatch(op, left, right));
            };
            if b == 0.0 {
                return Err(zero_error);
            }
            Ok(Value::F64(if op == BinOp::Div { a / b } else { a % b }))
        }
        ScalarKind::Uint => {
            let (Some(a), Some(b)) = (left.as_u64(), right.as_u64()) else {
                return Err(mismatch(op, left, right));
            };
            let (a, b) = (a & ty.mask(), b & ty.mask());
            if b == 0 {
                return Err(zero_error);
            }
            let result = if op == BinOp::Div { a / b } else { a % b };
            Ok(if ty.bits <= 32 {
                Value::U32(result as u32)
            } else {
                Value::U64(result)
            })
        }
        ScalarKind::Int => {
            let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) else {
                return Err(mismatch(op, left, right));
            };
            if b == 0 {
                return Err(zero_error);
            }
            let result = if op == BinOp::Div {
                a.wrapping_div(b)
            } else {
                a.wrapping_rem(b)
            };
            Ok(narrow(result as i128, if ty.bits <= 32 { IntKind::I32 } else { IntKind::I64 }))
        }
    }
}

/// Whole-number floats take part in integer division as `int64`
fn integral_operand(v: &Value) -> Value {
    match v {
        Value::F64(_) => Value::I64(v.as_i64().unwrap_or(0)),
        other => other.clone(),
    }
}

/// `value + 1` or `value - 1`, as used by `++` and `--`
pub fn increment(value: &Value, up: bool) -> Result<Value, ArithError> {
    let op = if up { BinOp::Add } else { BinOp::Sub };
    binary(op, value, &Value::I32(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BinOp::Add, Value::I32(1), Value::I32(2), Value::I32(3))]
    #[case(BinOp::Add, Value::I32(i32::MAX), Value::I32(1), Value::I64(1 << 31))]
    #[case(BinOp::Sub, Value::U32(5), Value::U32(7), Value::I32(-2))]
    #[case(BinOp::Mul, Value::U32(0x1_0000), Value::U32(0x1_0000), Value::U64(1 << 32))]
    #[case(BinOp::Add, Value::U64(u64::MAX), Value::I32(1), Value::U64(0))]
    #[case(BinOp::Div, Value::I32(-7), Value::I32(2), Value::I32(-3))]
    #[case(BinOp::Mod, Value::I32(-7), Value::I32(2), Value::I32(-1))]
    #[case(BinOp::Div, Value::I32(5), Value::F64(2.0), Value::F64(2.5))]
    #[case(BinOp::BitAnd, Value::U32(0xF0F0), Value::I32(0xFF), Value::U32(0xF0))]
    #[case(BinOp::Shl, Value::I32(1), Value::I32(4), Value::I32(16))]
    #[case(BinOp::Shl, Value::I32(-1), Value::I32(1), Value::I32(-2))]
    #[case(BinOp::Shl, Value::U32(1), Value::I32(40), Value::U64(1 << 40))]
    #[case(BinOp::Shl, Value::U64(u64::MAX), Value::I32(63), Value::U64(1 << 63))]
    #[case(BinOp::Shl, Value::I64(i64::MIN), Value::I64(63), Value::I64(0))]
    #[case(BinOp::Shr, Value::I32(-16), Value::I32(2), Value::I32(-4))]
    #[case(BinOp::Lt, Value::I32(-1), Value::U32(1), Value::I32(1))]
    #[case(BinOp::Eq, Value::F64(2.0), Value::I32(2), Value::I32(1))]
    fn test_binary(#[case] op: BinOp, #[case] l: Value, #[case] r: Value, #[case] expected: Value) {
        assert_eq!(binary(op, &l, &r), Ok(expected));
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert_eq!(
            binary(BinOp::Div, &Value::I32(1), &Value::I32(0)),
            Err(ArithError::DivisionByZero)
        );
        assert_eq!(
            binary(BinOp::Mod, &Value::U64(1), &Value::U32(0)),
            Err(ArithError::ModuloByZero)
        );
        assert_eq!(
            binary(BinOp::Div, &Value::F64(1.0), &Value::F64(0.0)),
            Err(ArithError::DivisionByZero)
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            binary(BinOp::Add, &Value::from("id="), &Value::I32(4)),
            Ok(Value::from("id=4"))
        );
        assert_eq!(
            binary(BinOp::Lt, &Value::from("abc"), &Value::from("abd")),
            Ok(Value::I32(1))
        );
        assert!(binary(BinOp::Mul, &Value::from("a"), &Value::I32(2)).is_err());
    }

    #[test]
    fn test_typed_division() {
        let five = Value::I32(5);
        let two = Value::I32(2);
        assert_eq!(
            divide_typed(BinOp::Div, &five, &two, Some(ScalarType::uint(32))),
            Ok(Value::U32(2))
        );
        assert_eq!(
            divide_typed(BinOp::Div, &five, &two, Some(ScalarType::float(32))),
            Ok(Value::F64(2.5))
        );
        assert_eq!(
            divide_typed(BinOp::Div, &Value::I32(-1), &two, Some(ScalarType::uint(8))),
            Ok(Value::U32(127))
        );
        assert_eq!(divide_typed(BinOp::Div, &five, &two, None), Ok(Value::I32(2)));
        assert_eq!(
            divide_typed(BinOp::Div, &Value::F64(5.0), &two, None),
            Ok(Value::I64(2))
        );
        assert_eq!(
            divide_typed(BinOp::Div, &Value::F64(5.5), &two, None),
            Ok(Value::F64(2.75))
        );
        assert_eq!(
            divide_typed(BinOp::Mod, &five, &Value::I32(0), Some(ScalarType::int(32))),
            Err(ArithError::ModuloByZero)
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnOp::Neg, &Value::I32(i32::MIN)), Ok(Value::I64(1 << 31)));
        assert_eq!(unary(UnOp::Neg, &Value::U32(5)), Ok(Value::I32(-5)));
        assert_eq!(unary(UnOp::BitNot, &Value::U32(0)), Ok(Value::U32(u32::MAX)));
        assert_eq!(unary(UnOp::Not, &Value::I32(3)), Ok(Value::I32(0)));
        assert!(unary(UnOp::Neg, &Value::from("x")).is_err());
    }

    #[test]
    fn test_increment() {
        assert_eq!(increment(&Value::I32(1), true), Ok(Value::I32(2)));
        assert_eq!(increment(&Value::U32(0), false), Ok(Value::I32(-1)));
    }
}
