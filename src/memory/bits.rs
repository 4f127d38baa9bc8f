//! Bit-field packing over little-endian byte buffers
//!
//! Bit `n` of a buffer is bit `n % 8` of byte `n / 8`, so a field that
//! straddles a byte boundary continues in the next byte's low bits.

/// Mask with the low `len` bits set
pub fn mask(len: u32) -> u64 {
    if len >= 64 {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

/// Sign-extend the low `len` bits of `value`
pub fn sign_extend(value: u64, len: u32) -> i64 {
    if len == 0 {
        return 0;
    }
    if len >= 64 {
        return value as i64;
    }
    let shift = 64 - len;
    ((value << shift) as i64) >> shift
}

/// Read `len` bits starting at bit `start`. Returns `None` when the field
/// does not lie inside `buf` or is wider than 64 bits.
pub fn extract_bits(buf: &[u8], start: usize, len: usize) -> Option<u64> {
    if len > 64 || start + len > buf.len() * 8 {
        return None;
    }

    let mut value = 0u64;
    for i in 0..len {
        let bit = start + i;
        if buf[bit / 8] >> (bit % 8) & 1 == 1 {
            value |= 1 << i;
        }
    }
    Some(value)
}

/// Write the low `len` bits of `value` at bit `start`, leaving every other
/// bit of `buf` untouched. Returns `false` if the field does not fit.
pub fn inject_bits(buf: &mut [u8], start: usize, len: usize, value: u64) -> bool {
    if len > 64 || start + len > buf.len() * 8 {
        return false;
    }

    for i in 0..len {
        let bit = start + i;
        let byte = &mut buf[bit / 8];
        if value >> i & 1 == 1 {
            *byte |= 1 << (bit % 8);
        } else {
            *byte &= !(1 << (bit % 8));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_straddling_field() {
        let buf = [0b1010_0000, 0b0000_0011];
        // bits 5..10: 1,0,1 from byte 0 then 1,1 from byte 1
        assert_eq!(extract_bits(&buf, 5, 5), Some(0b11101));
        assert_eq!(extract_bits(&buf, 12, 5), None);
    }

    #[test]
    fn test_inject_preserves_neighbours() {
        let mut buf = [0xFF, 0xFF];
        assert!(inject_bits(&mut buf, 4, 6, 0));
        assert_eq!(buf, [0x0F, 0xFC]);
        assert!(!inject_bits(&mut buf, 15, 2, 0));
    }

    #[test]
    fn test_round_trip_every_field() {
        // every start/len inside 1..=8 byte buffers
        for width in 1..=8usize {
            let raw: Vec<u8> = (0..width).map(|i| (0x5A ^ (i as u8).wrapping_mul(37)).rotate_left(i as u32)).collect();
            for start in 0..width * 8 {
                for len in 1..=(width * 8 - start) {
                    let mut buf = raw.clone();
                    let field = extract_bits(&buf, start, len).unwrap();
                    assert!(inject_bits(&mut buf, start, len, field));
                    assert_eq!(buf, raw, "start={} len={}", start, len);
                }
            }
        }
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0b111, 3), -1);
        assert_eq!(sign_extend(0b011, 3), 3);
        assert_eq!(sign_extend(0xFFFF, 16), -1);
        assert_eq!(mask(12), 0xFFF);
    }
}
