//! Network address rendering for `%I`, `%J` and `%M`

use std::fmt::Write;

/// Dotted-decimal IPv4 from four bytes in network order
pub fn ipv4(octets: [u8; 4]) -> String {
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}

/// Colon-hex IPv6 from 16 bytes in network order.
///
/// The single longest run of two or more zero words is collapsed to `::`;
/// on a tie the earliest run wins.
pub fn ipv6(bytes: &[u8; 16]) -> String {
    let words: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    let mut best: Option<(usize, usize)> = None;
    let mut run_start = None;
    for i in 0..=words.len() {
        let zero = i < words.len() && words[i] == 0;
        match (zero, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                let len = i - start;
                if len >= 2 && best.map_or(true, |(s, e)| e - s < len) {
                    best = Some((start, i));
                }
                run_start = None;
            }
            _ => {}
        }
    }

    let join = |ws: &[u16]| {
        ws.iter()
            .map(|w| format!("{:x}", w))
            .collect::<Vec<_>>()
            .join(":")
    };

    match best {
        Some((start, end)) => format!("{}::{}", join(&words[..start]), join(&words[end..])),
        None => join(&words),
    }
}

/// Dash-separated uppercase MAC address
pub fn mac(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push('-');
        }
        let _ = write!(out, "{:02X}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ipv4() {
        assert_eq!(ipv4([192, 168, 0, 1]), "192.168.0.1");
    }

    #[test]
    fn test_ipv6_loopback() {
        let mut bytes = [0u8; 16];
        bytes[15] = 1;
        assert_eq!(ipv6(&bytes), "::1");
    }

    #[test]
    fn test_ipv6_documentation_prefix() {
        let mut bytes = [0u8; 16];
        bytes[..4].copy_from_slice(&[0x20, 0x01, 0x0d, 0xb8]);
        bytes[15] = 0x13;
        assert_eq!(ipv6(&bytes), "2001:db8::13");
    }

    #[test]
    fn test_ipv6_prefers_longest_then_earliest() {
        // 1:0:0:2:0:0:0:3
        let words = [1u16, 0, 0, 2, 0, 0, 0, 3];
        let mut bytes = [0u8; 16];
        for (i, w) in words.iter().enumerate() {
            bytes[i * 2..i * 2 + 2].copy_from_slice(&w.to_be_bytes());
        }
        assert_eq!(ipv6(&bytes), "1:0:0:2::3");

        // 1:0:0:2:0:0:3:4 ties; first run collapses
        let words = [1u16, 0, 0, 2, 0, 0, 3, 4];
        for (i, w) in words.iter().enumerate() {
            bytes[i * 2..i * 2 + 2].copy_from_slice(&w.to_be_bytes());
        }
        assert_eq!(ipv6(&bytes), "1::2:0:0:3:4");
    }

    #[test]
    fn test_ipv6_single_zero_word_is_kept() {
        let words = [1u16, 0, 2, 3, 4, 5, 6, 7];
        let mut bytes = [0u8; 16];
        for (i, w) in words.iter().enumerate() {
            bytes[i * 2..i * 2 + 2].copy_from_slice(&w.to_be_bytes());
        }
        assert_eq!(ipv6(&bytes), "1:0:2:3:4:5:6:7");
        assert_eq!(ipv6(&[0u8; 16]), "::");
    }

    #[test]
    fn test_mac() {
        assert_eq!(mac(&[0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e]), "00-1A-2B-3C-4D-5E");
    }
}
