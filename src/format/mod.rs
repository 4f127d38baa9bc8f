//! Format-specifier engine
//!
//! Converts a typed [`Value`] into display text for one printf specifier.
//! Formatting never fails: values that do not fit a specifier fall back to
//! their plain rendering, and unknown specifiers produce a placeholder (or
//! plain rendering, when configured).
//!
//! # Specifiers
//!
//! | spec | output |
//! |------|--------|
//! | `d`  | signed decimal, sign-extended from the declared width |
//! | `u`  | unsigned decimal, masked to the declared width |
//! | `x`  | `0x` hex, optionally zero-padded to the declared width |
//! | `t`  | text with control characters escaped |
//! | `C`, `S` | symbol name for an address, else `0x%08x` |
//! | `E`  | enumerator text, else decimal |
//! | `I`, `J`, `M` | IPv4, IPv6 and MAC addresses |
//! | `N`, `U` | NUL-terminated narrow and wide strings |
//! | `T`  | hex for integers, decimal for floats |
//! | `%`  | literal percent |

pub mod float;
pub mod net;

use crate::memory::value::{ScalarKind, ScalarType, Value};
use std::fmt::Write;

/// What to emit for a specifier letter outside the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownSpecifier {
    /// `<%q?>`
    #[default]
    Placeholder,
    /// The value's plain rendering
    Stringify,
}

/// Context for one specifier
#[derive(Debug, Clone, Default)]
pub struct FormatOptions<'a> {
    /// Declared type of the value, when the reference carried one
    pub type_info: Option<ScalarType>,
    /// Enumerator name matching the value (`%E`)
    pub enum_text: Option<&'a str>,
    /// Symbol containing the address (`%C`, `%S`)
    pub symbol: Option<&'a str>,
    /// Zero-pad `%x` to the declared width
    pub pad_hex: bool,
    pub unknown: UnknownSpecifier,
}

impl FormatOptions<'_> {
    pub fn typed(ty: ScalarType) -> Self {
        FormatOptions {
            type_info: Some(ty),
            ..Default::default()
        }
    }
}

/// Format `value` according to `spec`
pub fn format_value(spec: char, value: &Value, options: &FormatOptions<'_>) -> String {
    match spec {
        'd' | 'i' => signed_decimal(value, options.type_info),
        'u' => unsigned_decimal(value, options.type_info),
        'x' | 'X' => hex(value, options.type_info, options.pad_hex),
        't' => text(value),
        'C' | 'S' => match options.symbol {
            Some(name) => name.to_string(),
            None => match value.as_u64() {
                Some(addr) => format!("0x{:08x}", addr & 0xFFFF_FFFF),
                None => value.to_string(),
            },
        },
        'E' => match options.enum_text {
            Some(text) => text.to_string(),
            None => signed_decimal(value, options.type_info),
        },
        'I' => ipv4(value),
        'J' => ipv6(value),
        'M' => mac(value),
        'N' => narrow_string(value),
        'U' => wide_string(value),
        'T' => typed_auto(value, options.type_info),
        '%' => "%".to_string(),
        _ => match options.unknown {
            UnknownSpecifier::Placeholder => format!("<%{}?>", spec),
            UnknownSpecifier::Stringify => plain(value, options.type_info),
        },
    }
}

/// Default rendering of a value, used outside any specifier
pub fn plain(value: &Value, ty: Option<ScalarType>) -> String {
    match value {
        Value::F64(f) => float::format_float(*f, ty.map_or(64, |t| t.bits)),
        _ => value.to_string(),
    }
}

fn width_of(value: &Value, ty: Option<ScalarType>) -> u32 {
    ty.or_else(|| value.natural_type())
        .map_or(64, |t| t.bits.clamp(1, 64))
}

fn signed_decimal(value: &Value, ty: Option<ScalarType>) -> String {
    if !value.is_numeric() {
        return value.to_string();
    }
    let bits = width_of(value, ty);
    match value.coerce(ScalarType::int(bits)) {
        Some(v) => v.to_string(),
        None => value.to_string(),
    }
}

fn unsigned_decimal(value: &Value, ty: Option<ScalarType>) -> String {
    if !value.is_numeric() {
        return value.to_string();
    }
    let bits = width_of(value, ty);
    match value.coerce(ScalarType::uint(bits)) {
        Some(v) => v.to_string(),
        None => value.to_string(),
    }
}

fn hex(value: &Value, ty: Option<ScalarType>, pad: bool) -> String {
    let raw = match value {
        Value::Bytes(bytes) => {
            let mut out = String::from("0x");
            for b in bytes.iter().rev() {
                let _ = write!(out, "{:02x}", b);
            }
            return out;
        }
        _ => match value.as_u64() {
            Some(raw) => raw,
            None => return value.to_string(),
        },
    };

    let bits = width_of(value, ty);
    let masked = raw & ScalarType::uint(bits).mask();
    if pad {
        let digits = (bits.min(64) as usize).div_ceil(4);
        format!("0x{:0width$x}", masked, width = digits)
    } else {
        format!("0x{:x}", masked)
    }
}

fn text(value: &Value) -> String {
    let raw: String = match value {
        Value::Str(s) => s.clone(),
        Value::Bytes(bytes) => bytes.iter().map(|&b| b as char).collect(),
        other => return other.to_string(),
    };

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\0' => break,
            '%' => {
                if chars.peek() == Some(&'%') {
                    chars.next();
                    out.push('%');
                } else {
                    return "<unescaped '%' in text>".to_string();
                }
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

fn ipv4(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) if bytes.len() >= 4 => {
            net::ipv4([bytes[0], bytes[1], bytes[2], bytes[3]])
        }
        _ => match value.as_u64() {
            Some(n) => net::ipv4((n as u32).to_be_bytes()),
            None => value.to_string(),
        },
    }
}

fn ipv6(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) if bytes.len() >= 16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&bytes[..16]);
            net::ipv6(&octets)
        }
        _ => value.to_string(),
    }
}

fn mac(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) if bytes.len() >= 6 => net::mac(&bytes[..6]),
        _ => match value.as_u64() {
            Some(n) => net::mac(&n.to_be_bytes()[2..]),
            None => value.to_string(),
        },
    }
}

fn narrow_string(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        }
        Value::Str(s) => s.split('\0').next().unwrap_or_default().to_string(),
        other => other.to_string(),
    }
}

fn wide_string(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .take_while(|&u| u != 0)
                .collect();
            String::from_utf16_lossy(&units)
        }
        other => narrow_string(other),
    }
}

fn typed_auto(value: &Value, ty: Option<ScalarType>) -> String {
    let is_float = match ty {
        Some(t) => t.kind == ScalarKind::Float,
        None => !value.is_integral(),
    };
    match value {
        Value::Str(_) | Value::Bytes(_) => value.to_string(),
        Value::F64(f) if is_float => float::format_float(*f, ty.map_or(64, |t| t.bits)),
        _ if is_float => match value.as_f64() {
            Some(f) => float::format_float(f, ty.map_or(64, |t| t.bits)),
            None => value.to_string(),
        },
        _ => hex(value, ty, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn fmt(spec: char, value: Value, ty: Option<ScalarType>) -> String {
        let options = FormatOptions {
            type_info: ty,
            ..Default::default()
        };
        format_value(spec, &value, &options)
    }

    #[rstest]
    #[case('x', Value::I32(0x2e), Some(ScalarType::uint(32)), "0x2e")]
    #[case('d', Value::I32(-2), Some(ScalarType::int(16)), "-2")]
    #[case('d', Value::U32(0xFFFE), Some(ScalarType::int(16)), "-2")]
    #[case('u', Value::I32(-1), Some(ScalarType::uint(8)), "255")]
    #[case('u', Value::I32(-1), None, "4294967295")]
    #[case('d', Value::F64(-3.9), None, "-3")]
    #[case('x', Value::I32(-1), Some(ScalarType::int(16)), "0xffff")]
    #[case('x', Value::U64(u64::MAX), None, "0xffffffffffffffff")]
    #[case('T', Value::U32(255), None, "0xff")]
    #[case('T', Value::F64(2.5), Some(ScalarType::float(32)), "2.500")]
    #[case('T', Value::F64(0.1), None, "0.1")]
    #[case('E', Value::I32(3), None, "3")]
    #[case('%', Value::I32(0), None, "%")]
    fn test_numeric_specifiers(
        #[case] spec: char,
        #[case] value: Value,
        #[case] ty: Option<ScalarType>,
        #[case] expected: &str,
    ) {
        assert_eq!(fmt(spec, value, ty), expected);
    }

    #[test]
    fn test_padded_hex() {
        let options = FormatOptions {
            type_info: Some(ScalarType::uint(16)),
            pad_hex: true,
            ..Default::default()
        };
        assert_eq!(format_value('x', &Value::U32(0x2e), &options), "0x002e");
    }

    #[test]
    fn test_symbol_and_enum_text() {
        let options = FormatOptions {
            symbol: Some("os_idle_thread"),
            enum_text: Some("osThreadReady"),
            ..Default::default()
        };
        assert_eq!(format_value('S', &Value::U32(0x2000_0000), &options), "os_idle_thread");
        assert_eq!(format_value('E', &Value::I32(2), &options), "osThreadReady");
        assert_eq!(
            format_value('C', &Value::U32(0x800), &FormatOptions::default()),
            "0x00000800"
        );
    }

    #[test]
    fn test_text_escapes() {
        assert_eq!(fmt('t', Value::Str("a\tb\nc".into()), None), "a\\tb\\nc");
        assert_eq!(fmt('t', Value::Str("50%% done".into()), None), "50% done");
        assert_eq!(fmt('t', Value::Str("cut\0here".into()), None), "cut");
        assert_eq!(fmt('t', Value::Str("bad % sign".into()), None), "<unescaped '%' in text>");
    }

    #[test]
    fn test_addresses() {
        assert_eq!(fmt('I', Value::U32(0xC0A8_0001), None), "192.168.0.1");
        assert_eq!(fmt('I', Value::Bytes(vec![10, 0, 0, 7]), None), "10.0.0.7");
        assert_eq!(
            fmt('M', Value::U64(0x0000_001A_2B3C_4D5E), None),
            "00-1A-2B-3C-4D-5E"
        );
        let mut bytes = vec![0u8; 16];
        bytes[15] = 1;
        assert_eq!(fmt('J', Value::Bytes(bytes), None), "::1");
    }

    #[test]
    fn test_strings() {
        assert_eq!(fmt('N', Value::Bytes(b"idle\0junk".to_vec()), None), "idle");
        assert_eq!(
            fmt('U', Value::Bytes(vec![b'h', 0, b'i', 0, 0, 0, b'x', 0]), None),
            "hi"
        );
    }

    #[test]
    fn test_unknown_specifier() {
        assert_eq!(fmt('q', Value::I32(5), None), "<%q?>");
        let options = FormatOptions {
            unknown: UnknownSpecifier::Stringify,
            ..Default::default()
        };
        assert_eq!(format_value('q', &Value::I32(5), &options), "5");
    }
}
