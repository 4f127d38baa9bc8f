// Floating-point display with C-like precision

/// Format `f` for a declared float width: `float` and narrower get three
/// decimal places, `double` gets `%g` with six significant digits.
pub fn format_float(f: f64, bits: u32) -> String {
    if bits <= 32 {
        fixed(f, 3)
    } else {
        general(f, 6)
    }
}

fn fixed(f: f64, precision: usize) -> String {
    match special(f) {
        Some(s) => s,
        None => format!("{:.*}", precision, f),
    }
}

/// `%g`: the shorter of fixed and exponent notation, trailing zeros removed
pub fn general(f: f64, precision: usize) -> String {
    if let Some(s) = special(f) {
        return s;
    }
    if f == 0.0 {
        return "0".to_string();
    }

    let precision = precision.max(1);
    // Exponent after rounding to `precision` significant digits
    let sci = format!("{:.*e}", precision - 1, f);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent >= -4 && exponent < precision as i32 {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        strip_zeros(&format!("{:.*}", decimals, f))
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_zeros(mantissa), sign, exponent.abs())
    }
}

fn special(f: f64) -> Option<String> {
    if f.is_nan() {
        Some("nan".to_string())
    } else if f.is_infinite() {
        Some(if f < 0.0 { "-inf" } else { "inf" }.to_string())
    } else {
        None
    }
}

fn strip_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2.5, 32, "2.500")]
    #[case(-0.1251, 32, "-0.125")]
    #[case(1.0 / 3.0, 64, "0.333333")]
    #[case(100.0, 64, "100")]
    #[case(0.0001, 64, "0.0001")]
    #[case(0.00001234, 64, "1.234e-05")]
    #[case(123456789.0, 64, "1.23457e+08")]
    #[case(1e10, 64, "1e+10")]
    #[case(0.0, 64, "0")]
    #[case(f64::NAN, 64, "nan")]
    #[case(f64::NEG_INFINITY, 32, "-inf")]
    fn test_float_formats(#[case] value: f64, #[case] bits: u32, #[case] expected: &str) {
        assert_eq!(format_float(value, bits), expected);
    }
}
