#![allow(clippy::result_large_err)]
//! augur-core: JavaScript front end for the augur completion engine.
//!
//! Turns source text into tokens and a syntax tree with positions on every
//! node. The completion engine in `augur-complete` walks this tree; it
//! never looks at raw text except through the lexer.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`parse()`] -- lex and parse a complete buffer
//! - [`lex()`] -- tokenize a buffer (also used for caret contexts)
//! - [`SyntaxError`] -- the single error type for both stages
//! - [`Position`], [`Span`], [`LineIndex`] -- source locations
//! - AST types: [`Program`], [`Stmt`], [`Expr`], [`Function`], [`Class`]

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{Class, Expr, ExprKind, Function, Program, Stmt, StmtKind};
pub use error::SyntaxError;
pub use lexer::{is_identifier_name, is_reserved_word, Spanned, Token};
pub use span::{LineIndex, Position, Span};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use lexer::lex;
pub use parser::parse;
