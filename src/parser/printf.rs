//! Format template scanner
//!
//! A template such as `"Thread %S[tcb.name] stack %d[used]%%"` is split into
//! literal text and format segments `%<spec>[<expression>]`. Bracket matching
//! skips brackets inside string and character literals, so `%t["[x]"]` holds a
//! single expression. An unterminated segment takes the rest of the input and
//! raises a warning instead of failing the whole template.

use super::ast::{Expr, Segment, Span};
use super::parse::{Diagnostic, Parser};

/// True if `text` contains `%%` or a `%<letter>[` format segment
pub fn looks_like_template(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).any(|w| w[0] == '%' && w[1] == '%')
        || chars
            .windows(3)
            .any(|w| w[0] == '%' && w[1].is_ascii_alphabetic() && w[2] == '[')
}

/// Split a template into segments, parsing each embedded expression
pub fn scan(text: &str) -> (Vec<Segment>, Vec<Diagnostic>) {
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut diagnostics = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch != '%' {
            literal.push(ch);
            i += 1;
            continue;
        }

        match (chars.get(i + 1), chars.get(i + 2)) {
            (Some('%'), _) => {
                literal.push('%');
                i += 2;
            }
            (Some(&spec), Some('[')) if spec.is_ascii_alphabetic() => {
                if !literal.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut literal)));
                }

                let open = i + 2;
                let start = open + 1;
                let (end, next) = match matching_bracket(&chars, start) {
                    Some(close) => (close, close + 1),
                    None => {
                        diagnostics.push(Diagnostic::warning(
                            format!("Unterminated '%{}[' segment", spec),
                            Span::new(i as u32, chars.len() as u32),
                        ));
                        (chars.len(), chars.len())
                    }
                };

                let source: String = chars[start..end].iter().collect();
                match parse_segment(&source, start as u32, Span::new(i as u32, next as u32)) {
                    Ok(expr) => segments.push(Segment::Format {
                        spec,
                        expr: Box::new(expr),
                    }),
                    Err(d) => diagnostics.push(d),
                }
                i = next;
            }
            _ => {
                literal.push('%');
                i += 1;
            }
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Text(literal));
    }
    (segments, diagnostics)
}

fn parse_segment(source: &str, offset: u32, segment: Span) -> Result<Expr, Diagnostic> {
    if source.trim().is_empty() {
        return Err(Diagnostic::error("Empty format expression", segment));
    }
    Parser::with_offset(source, offset)?.parse_standalone()
}

/// Index of the `]` closing a bracket whose content starts at `start`
fn matching_bracket(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = start;

    while i < chars.len() {
        let ch = chars[i];
        if let Some(q) = quote {
            if ch == '\\' {
                i += 2;
                continue;
            }
            if ch == q {
                quote = None;
            }
        } else {
            match ch {
                '"' | '\'' => quote = Some(ch),
                '[' => depth += 1,
                ']' if depth == 0 => return Some(i),
                ']' => depth -= 1,
                _ => {}
            }
        }
        i += 1;
    }
    None
}
