//! Lexer (tokenizer) for expression text
//!
//! Converts raw expression text into a flat [`Token`] stream consumed by the
//! parser. Multi-character operators are matched greedily before their
//! single-character prefixes (`<<=` before `<<` before `<`).

use super::ast::Span;
use std::fmt;
use thiserror::Error;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`Span`] so that parse errors can point at the
/// offending characters without a separate token→span table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    IntLiteral(u64, Span),
    FloatLiteral(f64, Span),
    CharLiteral(u8, Span),
    StringLiteral(String, Span),

    // Identifiers
    Ident(String, Span),

    // Arithmetic
    Plus(Span),    // +
    Minus(Span),   // -
    Star(Span),    // *
    Slash(Span),   // /
    Percent(Span), // %

    // Comparison
    EqEq(Span),  // ==
    NotEq(Span), // !=
    Lt(Span),    // <
    Le(Span),    // <=
    Gt(Span),    // >
    Ge(Span),    // >=

    // Logical
    AndAnd(Span), // &&
    OrOr(Span),   // ||
    Bang(Span),   // !

    // Bitwise
    Amp(Span),   // &
    Pipe(Span),  // |
    Caret(Span), // ^
    Tilde(Span), // ~
    LtLt(Span),  // <<
    GtGt(Span),  // >>

    // Assignment
    Eq(Span),        // =
    PlusEq(Span),    // +=
    MinusEq(Span),   // -=
    StarEq(Span),    // *=
    SlashEq(Span),   // /=
    PercentEq(Span), // %=
    AmpEq(Span),     // &=
    PipeEq(Span),    // |=
    CaretEq(Span),   // ^=
    LtLtEq(Span),    // <<=
    GtGtEq(Span),    // >>=

    // Increment/Decrement
    PlusPlus(Span),   // ++
    MinusMinus(Span), // --

    // Member access
    Dot(Span),   // .
    Arrow(Span), // ->

    // Ternary / colon-path
    Question(Span), // ?
    Colon(Span),    // :

    // Punctuation
    LParen(Span),   // (
    RParen(Span),   // )
    LBracket(Span), // [
    RBracket(Span), // ]
    Comma(Span),    // ,

    // End of input
    Eof(Span),
}

impl Token {
    /// Returns the span where this token appears.
    pub fn span(&self) -> Span {
        match self {
            Token::IntLiteral(_, span)
            | Token::FloatLiteral(_, span)
            | Token::CharLiteral(_, span)
            | Token::StringLiteral(_, span)
            | Token::Ident(_, span)
            | Token::Plus(span)
            | Token::Minus(span)
            | Token::Star(span)
            | Token::Slash(span)
            | Token::Percent(span)
            | Token::EqEq(span)
            | Token::NotEq(span)
            | Token::Lt(span)
            | Token::Le(span)
            | Token::Gt(span)
            | Token::Ge(span)
            | Token::AndAnd(span)
            | Token::OrOr(span)
            | Token::Bang(span)
            | Token::Amp(span)
            | Token::Pipe(span)
            | Token::Caret(span)
            | Token::Tilde(span)
            | Token::LtLt(span)
            | Token::GtGt(span)
            | Token::Eq(span)
            | Token::PlusEq(span)
            | Token::MinusEq(span)
            | Token::StarEq(span)
            | Token::SlashEq(span)
            | Token::PercentEq(span)
            | Token::AmpEq(span)
            | Token::PipeEq(span)
            | Token::CaretEq(span)
            | Token::LtLtEq(span)
            | Token::GtGtEq(span)
            | Token::PlusPlus(span)
            | Token::MinusMinus(span)
            | Token::Dot(span)
            | Token::Arrow(span)
            | Token::Question(span)
            | Token::Colon(span)
            | Token::LParen(span)
            | Token::RParen(span)
            | Token::LBracket(span)
            | Token::RBracket(span)
            | Token::Comma(span)
            | Token::Eof(span) => *span,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IntLiteral(n, _) => write!(f, "integer literal {}", n),
            Token::FloatLiteral(n, _) => write!(f, "float literal {}", n),
            Token::CharLiteral(c, _) => {
                if c.is_ascii_graphic() || *c == b' ' {
                    write!(f, "char literal '{}'", *c as char)
                } else {
                    write!(f, "char literal '\\x{:02x}'", c)
                }
            }
            Token::StringLiteral(s, _) => write!(f, "string literal \"{}\"", s),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::Percent(_) => write!(f, "'%'"),
            Token::EqEq(_) => write!(f, "'=='"),
            Token::NotEq(_) => write!(f, "'!='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::AndAnd(_) => write!(f, "'&&'"),
            Token::OrOr(_) => write!(f, "'||'"),
            Token::Bang(_) => write!(f, "'!'"),
            Token::Amp(_) => write!(f, "'&'"),
            Token::Pipe(_) => write!(f, "'|'"),
            Token::Caret(_) => write!(f, "'^'"),
            Token::Tilde(_) => write!(f, "'~'"),
            Token::LtLt(_) => write!(f, "'<<'"),
            Token::GtGt(_) => write!(f, "'>>'"),
            Token::Eq(_) => write!(f, "'='"),
            Token::PlusEq(_) => write!(f, "'+='"),
            Token::MinusEq(_) => write!(f, "'-='"),
            Token::StarEq(_) => write!(f, "'*='"),
            Token::SlashEq(_) => write!(f, "'/='"),
            Token::PercentEq(_) => write!(f, "'%='"),
            Token::AmpEq(_) => write!(f, "'&='"),
            Token::PipeEq(_) => write!(f, "'|='"),
            Token::CaretEq(_) => write!(f, "'^='"),
            Token::LtLtEq(_) => write!(f, "'<<='"),
            Token::GtGtEq(_) => write!(f, "'>>='"),
            Token::PlusPlus(_) => write!(f, "'++'"),
            Token::MinusMinus(_) => write!(f, "'--'"),
            Token::Dot(_) => write!(f, "'.'"),
            Token::Arrow(_) => write!(f, "'->'"),
            Token::Question(_) => write!(f, "'?'"),
            Token::Colon(_) => write!(f, "':'"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Eof(_) => write!(f, "end of input"),
        }
    }
}

/// Lexer error type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {span}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        LexError {
            message: message.into(),
            span,
        }
    }
}

/// Lexer for expression text
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    /// Added to every span (expressions embedded in templates)
    offset: u32,
}

impl Lexer {
    /// Create a new lexer for the given expression string.
    pub fn new(input: &str) -> Self {
        Self::with_offset(input, 0)
    }

    pub fn with_offset(input: &str, offset: u32) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            offset,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::Eof(self.span_from(self.position)));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let ch = self
            .advance()
            .ok_or_else(|| LexError::new("Unexpected end of input", self.span_from(start)))?;

        match ch {
            '"' => self.string_literal(start),
            '\'' => self.char_literal(start),
            '0'..='9' => self.number_literal(start),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.number_literal(start),
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.identifier(start)),

            '+' => Ok(self.operator(start, &[("+", Token::PlusPlus), ("=", Token::PlusEq)], Token::Plus)),
            '-' => Ok(self.operator(
                start,
                &[("-", Token::MinusMinus), ("=", Token::MinusEq), (">", Token::Arrow)],
                Token::Minus,
            )),
            '*' => Ok(self.operator(start, &[("=", Token::StarEq)], Token::Star)),
            '/' => Ok(self.operator(start, &[("=", Token::SlashEq)], Token::Slash)),
            '%' => Ok(self.operator(start, &[("=", Token::PercentEq)], Token::Percent)),
            '=' => Ok(self.operator(start, &[("=", Token::EqEq)], Token::Eq)),
            '!' => Ok(self.operator(start, &[("=", Token::NotEq)], Token::Bang)),
            '<' => Ok(self.operator(
                start,
                &[("<=", Token::LtLtEq), ("<", Token::LtLt), ("=", Token::Le)],
                Token::Lt,
            )),
            '>' => Ok(self.operator(
                start,
                &[(">=", Token::GtGtEq), (">", Token::GtGt), ("=", Token::Ge)],
                Token::Gt,
            )),
            '&' => Ok(self.operator(start, &[("&", Token::AndAnd), ("=", Token::AmpEq)], Token::Amp)),
            '|' => Ok(self.operator(start, &[("|", Token::OrOr), ("=", Token::PipeEq)], Token::Pipe)),
            '^' => Ok(self.operator(start, &[("=", Token::CaretEq)], Token::Caret)),
            '~' => Ok(Token::Tilde(self.span_from(start))),
            '.' => Ok(Token::Dot(self.span_from(start))),
            '?' => Ok(Token::Question(self.span_from(start))),
            ':' => Ok(Token::Colon(self.span_from(start))),
            '(' => Ok(Token::LParen(self.span_from(start))),
            ')' => Ok(Token::RParen(self.span_from(start))),
            '[' => Ok(Token::LBracket(self.span_from(start))),
            ']' => Ok(Token::RBracket(self.span_from(start))),
            ',' => Ok(Token::Comma(self.span_from(start))),

            _ => Err(LexError::new(
                format!("Unexpected character: '{}'", ch),
                self.span_from(start),
            )),
        }
    }

    /// Match the longest suffix from `candidates` (listed longest first),
    /// falling back to the single-character token.
    fn operator(
        &mut self,
        start: usize,
        candidates: &[(&str, fn(Span) -> Token)],
        single: fn(Span) -> Token,
    ) -> Token {
        for (suffix, make) in candidates {
            if self.starts_with(suffix) {
                for _ in 0..suffix.chars().count() {
                    self.advance();
                }
                return make(self.span_from(start));
            }
        }
        single(self.span_from(start))
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_ahead(i) == Some(c))
    }

    /// Parse string literal (opening quote already consumed)
    fn string_literal(&mut self, start: usize) -> Result<Token, LexError> {
        let mut string = String::new();

        while let Some(ch) = self.peek() {
            if ch == '"' {
                self.advance(); // consume closing quote
                return Ok(Token::StringLiteral(string, self.span_from(start)));
            }

            if ch == '\\' {
                self.advance();
                string.push(self.escape_sequence(start)?);
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(LexError::new(
            "Unterminated string literal",
            self.span_from(start),
        ))
    }

    /// Parse character literal (opening quote already consumed)
    fn char_literal(&mut self, start: usize) -> Result<Token, LexError> {
        let ch = self.advance().ok_or_else(|| {
            LexError::new(
                "Unexpected end of input in character literal",
                self.span_from(start),
            )
        })?;

        let value = if ch == '\\' { self.escape_sequence(start)? } else { ch };

        if self.advance() != Some('\'') {
            return Err(LexError::new(
                "Expected closing quote in character literal",
                self.span_from(start),
            ));
        }

        let code = u32::from(value);
        if code > 0xFF {
            return Err(LexError::new(
                format!("Character literal '{}' does not fit in a byte", value),
                self.span_from(start),
            ));
        }

        Ok(Token::CharLiteral(code as u8, self.span_from(start)))
    }

    /// Decode a C-style escape (backslash already consumed)
    fn escape_sequence(&mut self, start: usize) -> Result<char, LexError> {
        let escaped = self.advance().ok_or_else(|| {
            LexError::new("Unexpected end of input in escape sequence", self.span_from(start))
        })?;

        let value = match escaped {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0c}',
            'v' => '\u{0b}',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            '?' => '?',
            'x' => {
                let mut digits = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_hexdigit() && digits.len() < 2 {
                        digits.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                let code = u8::from_str_radix(&digits, 16).map_err(|_| {
                    LexError::new(
                        format!("Invalid hex escape sequence: \\x{}", digits),
                        self.span_from(start),
                    )
                })?;
                char::from(code)
            }
            '0'..='7' => {
                let mut code = escaped.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.advance();
                        }
                        None => break,
                    }
                }
                char::from((code & 0xFF) as u8)
            }
            _ => {
                return Err(LexError::new(
                    format!("Unknown escape sequence: \\{}", escaped),
                    self.span_from(start),
                ));
            }
        };

        Ok(value)
    }

    /// Parse numeric literal: decimal, hex (`0x`), binary (`0b`), octal
    /// (leading `0`), with `_` separators, fractions and exponents.
    fn number_literal(&mut self, start: usize) -> Result<Token, LexError> {
        self.position = start;

        if self.starts_with("0x") || self.starts_with("0X") {
            self.position += 2;
            return self.radix_literal(start, 16);
        }
        if self.starts_with("0b") || self.starts_with("0B") {
            self.position += 2;
            return self.radix_literal(start, 2);
        }

        let mut text = String::new();
        let mut is_float = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
            } else if ch == '_' {
                // digit separator
            } else if ch == '.' && !is_float && self.peek_ahead(1) != Some('.') {
                is_float = true;
                text.push(ch);
            } else if (ch == 'e' || ch == 'E') && self.exponent_follows() {
                is_float = true;
                text.push('e');
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    text.push(sign);
                    self.advance();
                }
                continue;
            } else {
                break;
            }
            self.advance();
        }

        self.skip_suffix(is_float);
        let span = self.span_from(start);

        if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| LexError::new(format!("Invalid float literal: {}", text), span))?;
            return Ok(Token::FloatLiteral(value, span));
        }

        let (digits, radix) = if text.len() > 1 && text.starts_with('0') {
            (&text[1..], 8)
        } else {
            (text.as_str(), 10)
        };
        let value = u64::from_str_radix(digits, radix)
            .map_err(|_| LexError::new(format!("Invalid integer literal: {}", text), span))?;
        Ok(Token::IntLiteral(value, span))
    }

    fn radix_literal(&mut self, start: usize, radix: u32) -> Result<Token, LexError> {
        let mut digits = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) {
                digits.push(ch);
            } else if ch != '_' {
                break;
            }
            self.advance();
        }
        self.skip_suffix(false);
        let span = self.span_from(start);
        let value = u64::from_str_radix(&digits, radix).map_err(|_| {
            LexError::new(format!("Invalid base-{} integer literal", radix), span)
        })?;
        Ok(Token::IntLiteral(value, span))
    }

    fn exponent_follows(&self) -> bool {
        match self.peek_ahead(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('+' | '-') => self.peek_ahead(2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    /// Integer suffixes (`u`, `l`, `ul`, ...) and float `f` are accepted and ignored
    fn skip_suffix(&mut self, is_float: bool) {
        while let Some(ch) = self.peek() {
            let accepted = matches!(ch, 'u' | 'U' | 'l' | 'L') || (is_float && matches!(ch, 'f' | 'F'));
            if !accepted {
                break;
            }
            self.advance();
        }
    }

    /// Parse identifier (first character already consumed)
    fn identifier(&mut self, start: usize) -> Token {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let ident: String = self.input[start..self.position].iter().collect();
        Token::Ident(ident, self.span_from(start))
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied()?;
        self.position += 1;
        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.position as u32).shifted(self.offset)
    }
}
