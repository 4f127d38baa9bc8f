//! Expression parsing implementation
//!
//! This module handles parsing of expressions using precedence climbing
//! for binary operators and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: integers, floats, characters, strings
//! - Identifiers and colon paths (`type:member:enumerator`)
//! - Binary operators: arithmetic, comparison, logical, bitwise
//! - Unary operators: `+`, `-`, `!`, `~`, prefix `++`, `--`
//! - Postfix: `[]`, `.`, `->`, `()`, `++`, `--`
//! - Conditional: `? :` (right-associative)
//! - Assignment: `=` and compound forms (right-associative)
//!
//! # Precedence
//!
//! | Level | Operators        |
//! |-------|------------------|
//! | 1     | `\|\|`           |
//! | 2     | `&&`             |
//! | 3     | `\|`             |
//! | 4     | `^`              |
//! | 5     | `&`              |
//! | 6     | `==` `!=`        |
//! | 7     | `<` `<=` `>` `>=`|
//! | 8     | `<<` `>>`        |
//! | 9     | `+` `-`          |
//! | 10    | `*` `/` `%`      |
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::memory::value::Value;
use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{Diagnostic, Parser};

/// Binary operator and precedence level for a token
fn binary_op(token: &Token) -> Option<(BinOp, u8)> {
    let entry = match token {
        Token::OrOr(_) => (BinOp::Or, 1),
        Token::AndAnd(_) => (BinOp::And, 2),
        Token::Pipe(_) => (BinOp::BitOr, 3),
        Token::Caret(_) => (BinOp::BitXor, 4),
        Token::Amp(_) => (BinOp::BitAnd, 5),
        Token::EqEq(_) => (BinOp::Eq, 6),
        Token::NotEq(_) => (BinOp::Ne, 6),
        Token::Lt(_) => (BinOp::Lt, 7),
        Token::Le(_) => (BinOp::Le, 7),
        Token::Gt(_) => (BinOp::Gt, 7),
        Token::Ge(_) => (BinOp::Ge, 7),
        Token::LtLt(_) => (BinOp::Shl, 8),
        Token::GtGt(_) => (BinOp::Shr, 8),
        Token::Plus(_) => (BinOp::Add, 9),
        Token::Minus(_) => (BinOp::Sub, 9),
        Token::Star(_) => (BinOp::Mul, 10),
        Token::Slash(_) => (BinOp::Div, 10),
        Token::Percent(_) => (BinOp::Mod, 10),
        _ => return None,
    };
    Some(entry)
}

fn assign_op(token: &Token) -> Option<AssignOp> {
    let op = match token {
        Token::Eq(_) => return Some(AssignOp::Assign),
        Token::PlusEq(_) => BinOp::Add,
        Token::MinusEq(_) => BinOp::Sub,
        Token::StarEq(_) => BinOp::Mul,
        Token::SlashEq(_) => BinOp::Div,
        Token::PercentEq(_) => BinOp::Mod,
        Token::AmpEq(_) => BinOp::BitAnd,
        Token::PipeEq(_) => BinOp::BitOr,
        Token::CaretEq(_) => BinOp::BitXor,
        Token::LtLtEq(_) => BinOp::Shl,
        Token::GtGtEq(_) => BinOp::Shr,
        _ => return None,
    };
    Some(AssignOp::Compound(op))
}

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_assignment()
    }

    /// Parse assignment or conditional (right-associative)
    fn parse_assignment(&mut self) -> Result<Expr, Diagnostic> {
        let target = self.parse_conditional()?;

        let Some(op) = assign_op(self.peek()) else {
            return Ok(target);
        };
        let op_span = self.current_span();

        if !target.is_reference() {
            return Err(Diagnostic::error(
                format!("Invalid assignment target: {}", target.describe()),
                target.span.merge(op_span),
            ));
        }
        self.advance();

        let value = self.parse_assignment()?;
        let span = target.span.merge(value.span);
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    /// Parse conditional: test ? consequent : alternate
    fn parse_conditional(&mut self) -> Result<Expr, Diagnostic> {
        let test = self.parse_binary(1)?;

        if !self.match_token(&Token::Question(Span::default())) {
            return Ok(test);
        }

        self.ternary_depth += 1;
        let consequent = self.parse_expression();
        self.ternary_depth -= 1;
        let consequent = consequent?;

        self.expect_token(
            &Token::Colon(Span::default()),
            "Expected ':' in conditional expression",
        )?;
        let alternate = self.parse_conditional()?;

        let span = test.span.merge(alternate.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    /// Precedence climbing over the binary operator table
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_unary()?;

        while let Some((op, prec)) = binary_op(self.peek()) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Parse unary: + - ! ~ and prefix ++ --
    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let start = self.current_span();

        let op = match self.peek() {
            Token::Plus(_) => Some(UnOp::Plus),
            Token::Minus(_) => Some(UnOp::Neg),
            Token::Bang(_) => Some(UnOp::Not),
            Token::Tilde(_) => Some(UnOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        let update = match self.peek() {
            Token::PlusPlus(_) => Some(UpdateOp::Increment),
            Token::MinusMinus(_) => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(op) = update {
            self.advance();
            let target = self.parse_unary()?;
            return self.make_update(op, true, target, start);
        }

        self.parse_postfix()
    }

    fn make_update(&self, op: UpdateOp, prefix: bool, target: Expr, op_span: Span) -> Result<Expr, Diagnostic> {
        let span = target.span.merge(op_span);
        if !target.is_reference() {
            let symbol = if op == UpdateOp::Increment { "++" } else { "--" };
            return Err(Diagnostic::error(
                format!("Invalid operand for '{}': {}", symbol, target.describe()),
                span,
            ));
        }
        Ok(Expr::new(
            ExprKind::Update {
                op,
                prefix,
                target: Box::new(target),
            },
            span,
        ))
    }

    /// Parse postfix: calls, member access, indexing, postfix ++ --
    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek() {
                Token::LParen(_) => {
                    expr = self.parse_call(expr)?;
                }
                Token::Dot(_) | Token::Arrow(_) => {
                    self.advance();
                    let (property, prop_span) = self.expect_identifier()?;
                    let span = expr.span.merge(prop_span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                        span,
                    );
                }
                Token::LBracket(_) => {
                    self.advance();
                    let index = self.parse_nested()?;
                    let close = self.expect_token(
                        &Token::RBracket(Span::default()),
                        "Expected ']' after index",
                    )?;
                    let span = expr.span.merge(close);
                    expr = Expr::new(
                        ExprKind::Index {
                            array: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                Token::PlusPlus(_) | Token::MinusMinus(_) => {
                    let op = if matches!(self.peek(), Token::PlusPlus(_)) {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    };
                    let op_span = self.current_span();
                    self.advance();
                    expr = self.make_update(op, false, expr, op_span)?;
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Parse an expression inside brackets or parentheses, where the
    /// surrounding conditional no longer competes for `:`
    fn parse_nested(&mut self) -> Result<Expr, Diagnostic> {
        let saved = std::mem::take(&mut self.ternary_depth);
        let result = self.parse_expression();
        self.ternary_depth = saved;
        result
    }

    /// Parse a call; the callee must be a plain name
    fn parse_call(&mut self, callee: Expr) -> Result<Expr, Diagnostic> {
        let ExprKind::Identifier(name) = &callee.kind else {
            return Err(Diagnostic::error(
                format!("Expression is not callable: {}", callee.describe()),
                callee.span,
            ));
        };
        let name = name.clone();
        self.advance(); // '('

        let mut args = Vec::new();
        if !self.check(&Token::RParen(Span::default())) {
            loop {
                args.push(self.parse_nested()?);
                if !self.match_token(&Token::Comma(Span::default())) {
                    break;
                }
            }
        }
        let close = self.expect_token(
            &Token::RParen(Span::default()),
            "Expected ')' after arguments",
        )?;
        let span = callee.span.merge(close);

        if let Some(which) = Intrinsic::from_name(&name) {
            if args.len() != which.arity() {
                return Err(Diagnostic::error(
                    format!(
                        "{} expects {} argument(s), got {}",
                        which.name(),
                        which.arity(),
                        args.len()
                    ),
                    span,
                ));
            }
            return Ok(Expr::new(ExprKind::Intrinsic { which, args }, span));
        }

        Ok(Expr::new(ExprKind::Call { callee: name, args }, span))
    }

    /// Parse primary: literals, identifiers, colon paths, parenthesized expressions
    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let span = self.current_span();

        match self.peek().clone() {
            Token::IntLiteral(n, _) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::from_literal(n)), span))
            }
            Token::FloatLiteral(f, _) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::F64(f)), span))
            }
            Token::CharLiteral(c, _) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::I32(c as i32)), span))
            }
            Token::StringLiteral(s, _) => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Value::Str(s)), span))
            }
            Token::Ident(name, _) => {
                self.advance();

                if let Some(path) = self.parse_colon_path(&name, span) {
                    return Ok(path);
                }

                // `__Running` may be written without parentheses
                if Intrinsic::from_name(&name) == Some(Intrinsic::Running)
                    && !self.check(&Token::LParen(Span::default()))
                {
                    return Ok(Expr::new(
                        ExprKind::Intrinsic {
                            which: Intrinsic::Running,
                            args: Vec::new(),
                        },
                        span,
                    ));
                }

                Ok(Expr::new(ExprKind::Identifier(name), span))
            }
            Token::LParen(_) => {
                self.advance();
                let mut inner = self.parse_nested()?;
                let close = self.expect_token(
                    &Token::RParen(Span::default()),
                    "Expected ')' after expression",
                )?;
                inner.span = span.merge(close);
                Ok(inner)
            }
            Token::Eof(_) => Err(Diagnostic::error("Unexpected end of expression", span)),
            other => Err(Diagnostic::error(format!("Unexpected {}", other), span)),
        }
    }

    /// `head:part[:part...]` after an identifier. Inside a conditional's
    /// consequent the parts must touch their colons.
    fn parse_colon_path(&mut self, head: &str, head_span: Span) -> Option<Expr> {
        let mut parts = vec![head.to_string()];
        let mut span = head_span;

        loop {
            let (Token::Colon(colon), Some(Token::Ident(part, part_span))) =
                (self.peek(), self.peek_ahead(1))
            else {
                break;
            };
            let adjacent = span.end == colon.start && colon.end == part_span.start;
            if self.ternary_depth > 0 && !adjacent {
                break;
            }
            parts.push(part.clone());
            span = span.merge(*part_span);
            self.advance();
            self.advance();
        }

        if parts.len() == 1 {
            return None;
        }
        Some(Expr::new(ExprKind::ColonPath(parts), span))
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::parse;

    fn ast(text: &str) -> Expr {
        let result = parse(text, false);
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        result.ast.unwrap()
    }

    fn error(text: &str) -> String {
        let result = parse(text, false);
        assert!(result.ast.is_none());
        result.first_error().unwrap().message.clone()
    }

    #[test]
    fn test_precedence() {
        match ast("a + b * c").kind {
            ExprKind::Binary {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. })),
            other => panic!("Expected addition, got {:?}", other),
        }

        match ast("a || b && c | d").kind {
            ExprKind::Binary { op: BinOp::Or, right, .. } => {
                assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::And, .. }))
            }
            other => panic!("Expected ||, got {:?}", other),
        }

        // left-associative
        match ast("a - b - c").kind {
            ExprKind::Binary { op: BinOp::Sub, left, .. } => {
                assert!(matches!(left.kind, ExprKind::Binary { op: BinOp::Sub, .. }))
            }
            other => panic!("Expected subtraction, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        match ast("a = b += 2").kind {
            ExprKind::Assign { op: AssignOp::Assign, value, .. } => assert!(matches!(
                value.kind,
                ExprKind::Assign {
                    op: AssignOp::Compound(BinOp::Add),
                    ..
                }
            )),
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_targets_are_errors() {
        assert!(error("1 = 2").contains("Invalid assignment target"));
        assert!(error("(a + b) += 1").contains("Invalid assignment target"));
        assert!(error("++3").contains("Invalid operand for '++'"));
        assert!(error("f()--").contains("Invalid operand for '--'"));
    }

    #[test]
    fn test_postfix_chain() {
        match ast("list[i + 1].next->id").kind {
            ExprKind::Member { object, property } => {
                assert_eq!(property, "id");
                match object.kind {
                    ExprKind::Member { object, property } => {
                        assert_eq!(property, "next");
                        assert!(matches!(object.kind, ExprKind::Index { .. }));
                    }
                    other => panic!("Expected member, got {:?}", other),
                }
            }
            other => panic!("Expected member, got {:?}", other),
        }

        assert!(matches!(
            ast("count++").kind,
            ExprKind::Update { prefix: false, op: UpdateOp::Increment, .. }
        ));
        assert!(matches!(
            ast("--count").kind,
            ExprKind::Update { prefix: true, op: UpdateOp::Decrement, .. }
        ));
    }

    #[test]
    fn test_conditional_is_right_associative() {
        match ast("a ? b : c ? d : e").kind {
            ExprKind::Conditional { alternate, .. } => {
                assert!(matches!(alternate.kind, ExprKind::Conditional { .. }))
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_colon_paths() {
        assert_eq!(
            ast("TCB:state:Ready").kind,
            ExprKind::ColonPath(vec!["TCB".into(), "state".into(), "Ready".into()])
        );
        assert_eq!(
            ast("TCB : state").kind,
            ExprKind::ColonPath(vec!["TCB".into(), "state".into()])
        );

        // inside a consequent only the tight form is a path
        match ast("f ? T:m : 0").kind {
            ExprKind::Conditional { consequent, .. } => {
                assert_eq!(consequent.kind, ExprKind::ColonPath(vec!["T".into(), "m".into()]))
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
        match ast("f ? a : b").kind {
            ExprKind::Conditional { consequent, alternate, .. } => {
                assert_eq!(consequent.kind, ExprKind::Identifier("a".into()));
                assert_eq!(alternate.kind, ExprKind::Identifier("b".into()));
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_intrinsics() {
        match ast("__GetRegVal(R0) + __Running").kind {
            ExprKind::Binary { left, right, .. } => {
                assert!(matches!(
                    left.kind,
                    ExprKind::Intrinsic { which: Intrinsic::GetRegVal, .. }
                ));
                assert!(matches!(
                    right.kind,
                    ExprKind::Intrinsic { which: Intrinsic::Running, .. }
                ));
            }
            other => panic!("Expected binary, got {:?}", other),
        }
        assert!(matches!(ast("helper(1, 2)").kind, ExprKind::Call { .. }));
        assert!(error("__size_of(a, b)").contains("expects 1 argument"));
        assert!(error("a.b(1)").contains("not callable"));
    }

    #[test]
    fn test_literals() {
        assert_eq!(ast("'A'").constant, Some(crate::memory::value::Value::I32(65)));
        assert_eq!(
            ast("\"hi\"").kind,
            ExprKind::Literal(crate::memory::value::Value::Str("hi".into()))
        );
        assert_eq!(ast("0xFFFFFFFF").constant, Some(crate::memory::value::Value::U32(u32::MAX)));
    }

    #[test]
    fn test_spans() {
        let expr = ast("ab + cd");
        assert_eq!(expr.span, Span::new(0, 7));
        match expr.kind {
            ExprKind::Binary { right, .. } => assert_eq!(right.span, Span::new(5, 7)),
            other => panic!("Expected binary, got {:?}", other),
        }
    }
}
