//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct, diagnostics, and the
//! [`parse`] entry point that turns expression text into a [`ParseResult`].
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and the `parse` pipeline
//! - `expressions`: Parsing expressions with precedence climbing
//! - `printf`: Splitting format templates into text and format segments
//! - `fold`: Constant folding and external-symbol collection
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::memory::value::Value;
use crate::parser::ast::*;
use crate::parser::fold;
use crate::parser::lexer::{LexError, Lexer, Token};
use crate::parser::printf;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A parse problem attached to a character range of the input
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{severity} at {span}: {message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<LexError> for Diagnostic {
    fn from(err: LexError) -> Self {
        Diagnostic::error(err.message, err.span)
    }
}

/// Everything one call to [`parse`] produces
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// `None` whenever an error-severity diagnostic was raised
    pub ast: Option<Expr>,
    pub diagnostics: Vec<Diagnostic>,
    /// Identifiers read from the data model, in first-seen order
    pub external_symbols: Vec<String>,
    pub is_printf: bool,
    /// Folded value of the whole expression, when it is constant
    pub constant: Option<Value>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// First error message, for callers that only report one
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }
}

/// Parse expression text.
///
/// Template mode is used when `force_template` is set or the text looks like
/// a format template (`%x[` or `%%`). Template ASTs are not folded.
pub fn parse(text: &str, force_template: bool) -> ParseResult {
    let is_printf = force_template || printf::looks_like_template(text);
    let mut diagnostics = Vec::new();

    let ast = if is_printf {
        let (segments, scan_diagnostics) = printf::scan(text);
        diagnostics.extend(scan_diagnostics);
        let span = Span::new(0, text.chars().count() as u32);
        Some(Expr::new(ExprKind::Printf(segments), span))
    } else {
        match Parser::new(text).and_then(|mut p| p.parse_standalone()) {
            Ok(expr) => Some(expr),
            Err(d) => {
                diagnostics.push(d);
                None
            }
        }
    };

    let mut ast = if diagnostics.iter().any(Diagnostic::is_error) {
        None
    } else {
        ast
    };

    let external_symbols = ast
        .as_ref()
        .map(fold::external_symbols)
        .unwrap_or_default();

    let mut constant = None;
    if let Some(expr) = ast.as_mut() {
        if !is_printf {
            fold::fold(expr);
            constant = expr.constant.clone();
        }
    }

    ParseResult {
        ast,
        diagnostics,
        external_symbols,
        is_printf,
        constant,
    }
}

/// Recursive descent parser for expressions
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    /// Nesting depth of `?:` consequents; colon paths there must be written
    /// without spaces to be told apart from the `:` of the conditional
    pub(crate) ternary_depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, Diagnostic> {
        Self::with_offset(source, 0)
    }

    /// Parser whose spans are shifted by `offset` characters, for
    /// expressions embedded in a larger text
    pub fn with_offset(source: &str, offset: u32) -> Result<Self, Diagnostic> {
        let mut lexer = Lexer::with_offset(source, offset);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            ternary_depth: 0,
        })
    }

    /// Parse one complete expression; trailing tokens are an error
    pub fn parse_standalone(&mut self) -> Result<Expr, Diagnostic> {
        if self.is_at_end() {
            return Err(Diagnostic::error("Empty expression", self.current_span()));
        }
        let expr = self.parse_expression()?;
        if !self.is_at_end() {
            return Err(Diagnostic::error(
                format!("Unexpected {} after expression", self.peek()),
                self.current_span(),
            ));
        }
        Ok(expr)
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span()
    }

    pub(crate) fn previous_span(&self) -> Span {
        self.previous().span()
    }

    pub(crate) fn expect_token(&mut self, token: &Token, message: &str) -> Result<Span, Diagnostic> {
        if self.check(token) {
            Ok(self.advance().span())
        } else {
            Err(Diagnostic::error(
                format!("{}, found {}", message, self.peek()),
                self.current_span(),
            ))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<(String, Span), Diagnostic> {
        if let Token::Ident(name, span) = self.peek() {
            let found = (name.clone(), *span);
            self.advance();
            Ok(found)
        } else {
            Err(Diagnostic::error(
                format!("Expected identifier, found {}", self.peek()),
                self.current_span(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_constant_expression_folds() {
        let result = parse("1 + 2 * 3", false);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.constant, Some(Value::I32(7)));
        assert_eq!(result.ast.unwrap().constant, Some(Value::I32(7)));
    }

    #[test]
    fn test_assignment_is_not_folded() {
        let result = parse("x = 1", false);
        let ast = result.ast.unwrap();
        assert_eq!(ast.constant, None);
        assert_eq!(result.constant, None);
        assert!(result.external_symbols.is_empty());
    }

    #[test]
    fn test_errors_drop_the_ast() {
        let result = parse("1 +", false);
        assert!(result.ast.is_none());
        assert!(result.has_errors());

        let result = parse("", false);
        assert!(result.ast.is_none());

        let result = parse("a b", false);
        assert_eq!(result.first_error().unwrap().span, Span::new(2, 3));
    }

    #[test]
    fn test_template_detection() {
        assert!(parse("%d[count] items", false).is_printf);
        assert!(parse("100%%", false).is_printf);
        assert!(!parse("a % b", false).is_printf);
        assert!(parse("plain text", true).is_printf);
    }

    #[test]
    fn test_offset_spans() {
        let mut parser = Parser::with_offset("ab", 10).unwrap();
        let expr = parser.parse_standalone().unwrap();
        assert_eq!(expr.span, Span::new(10, 12));
    }
}
