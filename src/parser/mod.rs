//! Expression parser
//!
//! This module transforms SCVD expression text into an Abstract Syntax Tree:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parser state, diagnostics and the [`parse()`] entry point
//! - [`expressions`]: Precedence climbing for the expression grammar
//! - [`printf`]: Format template scanning (`"%d[count] items"`)
//! - [`fold`]: Constant folding and external-symbol collection
//! - [`ast`]: AST node definitions
//!
//! # Expression Language
//!
//! - Literals: integers (decimal, hex, binary, octal, `_` separators),
//!   floats, characters, strings with C escapes
//! - Operators: the C set, including compound assignment and `++`/`--`
//! - Postfix: member access `.`, indexing `[ ]`, calls, `type:member:enum`
//! - Intrinsics: `__GetRegVal`, `__FindSymbol`, `__CalcMemUsed`, `__size_of`,
//!   `__Symbol_exists`, `__Offset_of`, `__Running`
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
pub mod expressions;
pub mod fold;
pub mod lexer;
pub mod parse;
pub mod printf;

pub use parse::{parse, Diagnostic, ParseResult, Severity};
