//! Runtime value representation
//!
//! This module defines the [`Value`] enum, the tagged result of every
//! expression evaluation, and [`ScalarType`], the declared type of a scalar
//! in target memory.
//!
//! # Value Types
//!
//! - [`Value::I32`] / [`Value::U32`]: 32-bit signed / unsigned integer
//! - [`Value::I64`] / [`Value::U64`]: 64-bit signed / unsigned integer
//! - [`Value::F64`]: floating point (`float` values are widened on read)
//! - [`Value::Str`]: text (string literals, formatted templates)
//! - [`Value::Bytes`]: raw bytes (arrays read as a whole, addresses for `%I`/`%M`)
//!
//! # Byte Codec
//!
//! [`Value::decode`] and [`Value::encode`] convert between little-endian target
//! bytes and values according to a [`ScalarType`], sign-extending signed
//! integers narrower than their container and widening `float` to `f64`.

use std::fmt;

/// Scalar category of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int,
    Uint,
    Float,
}

/// Declared scalar type: category plus bit width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScalarType {
    pub kind: ScalarKind,
    pub bits: u32,
}

impl ScalarType {
    pub const fn int(bits: u32) -> Self {
        ScalarType {
            kind: ScalarKind::Int,
            bits,
        }
    }

    pub const fn uint(bits: u32) -> Self {
        ScalarType {
            kind: ScalarKind::Uint,
            bits,
        }
    }

    pub const fn float(bits: u32) -> Self {
        ScalarType {
            kind: ScalarKind::Float,
            bits,
        }
    }

    /// Parse a type name as used in component descriptions
    /// (`uint32_t`, `int8`, `float`, `double`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        match name {
            "float" => return Some(ScalarType::float(32)),
            "double" => return Some(ScalarType::float(64)),
            "char" => return Some(ScalarType::int(8)),
            "bool" => return Some(ScalarType::uint(8)),
            "int" => return Some(ScalarType::int(32)),
            "unsigned" => return Some(ScalarType::uint(32)),
            _ => {}
        }

        let stem = name.strip_suffix("_t").unwrap_or(name);
        let (kind, digits) = if let Some(rest) = stem.strip_prefix("uint") {
            (ScalarKind::Uint, rest)
        } else if let Some(rest) = stem.strip_prefix("int") {
            (ScalarKind::Int, rest)
        } else {
            return None;
        };

        match digits.parse::<u32>() {
            Ok(bits @ (8 | 16 | 32 | 64)) => Some(ScalarType { kind, bits }),
            _ => None,
        }
    }

    /// Storage size in bytes
    pub fn byte_width(&self) -> usize {
        self.bits.div_ceil(8) as usize
    }

    pub fn is_float(&self) -> bool {
        self.kind == ScalarKind::Float
    }

    pub fn is_signed(&self) -> bool {
        self.kind != ScalarKind::Uint
    }

    /// All-ones mask covering the declared bit width
    pub fn mask(&self) -> u64 {
        if self.bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.bits) {
            (ScalarKind::Float, 32) => write!(f, "float"),
            (ScalarKind::Float, _) => write!(f, "double"),
            (ScalarKind::Int, bits) => write!(f, "int{}_t", bits),
            (ScalarKind::Uint, bits) => write!(f, "uint{}_t", bits),
        }
    }
}

/// Runtime values produced by the evaluator
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl Default for Value {
    fn default() -> Self {
        Value::I32(0)
    }
}

impl Value {
    /// Type an integer literal: the first of `int32`, `uint32`, `int64`,
    /// `uint64` that holds it.
    pub fn from_literal(n: u64) -> Self {
        if let Ok(v) = i32::try_from(n) {
            Value::I32(v)
        } else if let Ok(v) = u32::try_from(n) {
            Value::U32(v)
        } else if let Ok(v) = i64::try_from(n) {
            Value::I64(v)
        } else {
            Value::U64(n)
        }
    }

    pub fn from_bool(b: bool) -> Self {
        Value::I32(b as i32)
    }

    /// Integer view of the value (floats truncate toward zero)
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::I32(n) => Some(*n as i128),
            Value::U32(n) => Some(*n as i128),
            Value::I64(n) => Some(*n as i128),
            Value::U64(n) => Some(*n as i128),
            Value::F64(f) if f.is_finite() => Some(f.trunc() as i128),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().map(|n| n as i64)
    }

    /// Two's-complement 64-bit view, as used for addresses and raw bits
    pub fn as_u64(&self) -> Option<u64> {
        self.as_i128().map(|n| n as u64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::I32(n) => Some(*n as f64),
            Value::U32(n) => Some(*n as f64),
            Value::I64(n) => Some(*n as f64),
            Value::U64(n) => Some(*n as f64),
            Value::F64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::I32(n) => *n != 0,
            Value::U32(n) => *n != 0,
            Value::I64(n) => *n != 0,
            Value::U64(n) => *n != 0,
            Value::F64(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => b.iter().any(|&x| x != 0),
        }
    }

    /// Integer kinds, and floats holding a whole number
    pub fn is_integral(&self) -> bool {
        match self {
            Value::I32(_) | Value::U32(_) | Value::I64(_) | Value::U64(_) => true,
            Value::F64(f) => f.is_finite() && f.fract() == 0.0,
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Str(_) | Value::Bytes(_))
    }

    /// The scalar type matching this value's own tag
    pub fn natural_type(&self) -> Option<ScalarType> {
        match self {
            Value::I32(_) => Some(ScalarType::int(32)),
            Value::U32(_) => Some(ScalarType::uint(32)),
            Value::I64(_) => Some(ScalarType::int(64)),
            Value::U64(_) => Some(ScalarType::uint(64)),
            Value::F64(_) => Some(ScalarType::float(64)),
            _ => None,
        }
    }

    /// Convert to the representation a declared type would store:
    /// truncate to the bit width, sign-extend signed types, round `float`
    /// through `f32`.
    pub fn coerce(&self, ty: ScalarType) -> Option<Value> {
        if ty.is_float() {
            let f = self.as_f64()?;
            return Some(if ty.bits <= 32 {
                Value::F64(f as f32 as f64)
            } else {
                Value::F64(f)
            });
        }
        let raw = self.as_u64()? & ty.mask();
        Some(Self::from_raw(raw, ty))
    }

    /// Build an integer value from raw bits already masked to `ty.bits`
    fn from_raw(raw: u64, ty: ScalarType) -> Value {
        match ty.kind {
            ScalarKind::Int => {
                let shift = 64 - ty.bits.clamp(1, 64);
                let signed = ((raw << shift) as i64) >> shift;
                if ty.bits <= 32 {
                    Value::I32(signed as i32)
                } else {
                    Value::I64(signed)
                }
            }
            _ => {
                if ty.bits <= 32 {
                    Value::U32(raw as u32)
                } else {
                    Value::U64(raw)
                }
            }
        }
    }

    /// Decode little-endian target bytes. Returns `None` when fewer bytes
    /// than the type's width are supplied.
    pub fn decode(bytes: &[u8], ty: ScalarType) -> Option<Value> {
        let width = ty.byte_width();
        if width == 0 || width > 8 || bytes.len() < width {
            return None;
        }

        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(&bytes[..width]);
        let raw = u64::from_le_bytes(buf);

        match ty.kind {
            ScalarKind::Float => match ty.bits {
                32 => Some(Value::F64(f32::from_bits(raw as u32) as f64)),
                64 => Some(Value::F64(f64::from_bits(raw))),
                _ => None,
            },
            _ => Some(Self::from_raw(raw & ty.mask(), ty)),
        }
    }

    /// Encode to little-endian target bytes of the type's width
    pub fn encode(&self, ty: ScalarType) -> Option<Vec<u8>> {
        let width = ty.byte_width();
        if width == 0 || width > 8 {
            return None;
        }

        let raw = match ty.kind {
            ScalarKind::Float => match ty.bits {
                32 => (self.as_f64()? as f32).to_bits() as u64,
                64 => self.as_f64()?.to_bits(),
                _ => return None,
            },
            _ => self.as_u64()?,
        };

        Some(raw.to_le_bytes()[..width].to_vec())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(n) => write!(f, "{}", n),
            Value::U32(n) => write!(f, "{}", n),
            Value::I64(n) => write!(f, "{}", n),
            Value::U64(n) => write!(f, "{}", n),
            Value::F64(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(bytes) => {
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}
