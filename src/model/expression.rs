// Expression attribute of a description node: source text plus its parse

use crate::parser::{parse, ParseResult};
use std::fmt;

/// An expression attribute, parsed once when the description is built.
///
/// Parsing never fails here; an expression with errors keeps its
/// diagnostics and fails when a statement evaluates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub text: String,
    pub parsed: ParseResult,
}

impl Expression {
    pub fn parse(text: &str) -> Self {
        Expression {
            text: text.to_string(),
            parsed: parse(text, false),
        }
    }

    /// Parse in template mode (display names and values)
    pub fn template(text: &str) -> Self {
        Expression {
            text: text.to_string(),
            parsed: parse(text, true),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.parsed.ast.is_some()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
