//! Recursive-descent JavaScript parser.
//!
//! Produces the [`crate::ast`] tree from the lexer's token stream. Any
//! construct outside the supported subset is a [`SyntaxError`]; callers
//! that need a tree for broken input keep the last good one around.
use crate::ast::{Expr, ExprKind, Ident, Program};
use crate::error::SyntaxError;
use crate::lexer::{self, is_reserved_word, Spanned, Token};
use crate::span::Span;

mod expressions;
mod functions;
mod statements;

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

/// Deepest syntax tree the parser will build. Deeper input is rejected
/// with a `SyntaxError`, so consumers can recurse over any tree it
/// returns.
pub const MAX_NESTING: u32 = 1024;

/// Stack left free before entering a nested construct; below this the
/// parser continues on a freshly allocated segment.
const RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    /// Set while parsing a `for (init; ...)` head, where `in` is not an
    /// operator.
    no_in: bool,
    /// Tree depth of the node being parsed.
    depth: u32,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Parser {
            tokens,
            pos: 0,
            no_in: false,
            depth: 0,
        }
    }

    /// Count one more level of tree depth.
    fn deepen(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.err("nesting too deep"));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `f` one level deeper, growing the stack when it runs low.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        self.deepen()?;
        let result = stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || f(self));
        self.depth -= 1;
        result
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let idx = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    /// Span of the most recently consumed token.
    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            return self.cur().span;
        }
        self.tokens[self.pos - 1].span
    }

    /// Span from `start` through the most recently consumed token.
    fn finish(&self, start: Span) -> Span {
        start.to(self.prev_span())
    }

    fn err(&self, msg: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.cur().span.start_pos, msg)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<Span, SyntaxError> {
        if self.peek() == token {
            Ok(self.advance().span)
        } else {
            Err(self.err(format!("expected {:?}, got {:?}", token, self.peek())))
        }
    }

    fn is_op(&self, op: &str) -> bool {
        self.peek().is_op(op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.is_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_word(&self, w: &str) -> bool {
        self.peek().is_word(w)
    }

    fn eat_word(&mut self, w: &str) -> bool {
        if self.is_word(w) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, w: &str) -> Result<Span, SyntaxError> {
        if self.is_word(w) {
            Ok(self.advance().span)
        } else {
            Err(self.err(format!("expected '{}', got {:?}", w, self.peek())))
        }
    }

    /// A binding or reference name: any word that is not reserved.
    fn take_ident(&mut self) -> Result<Ident, SyntaxError> {
        match self.peek() {
            Token::Word(w) if !is_reserved_word(w) => {
                let name = w.clone();
                let span = self.advance().span;
                Ok(Ident { name, span })
            }
            other => Err(self.err(format!("expected identifier, got {:?}", other))),
        }
    }

    /// A property name after `.`: reserved words are allowed here.
    fn take_property_name(&mut self) -> Result<Ident, SyntaxError> {
        match self.peek() {
            Token::Word(w) => {
                let name = w.clone();
                let span = self.advance().span;
                Ok(Ident { name, span })
            }
            other => Err(self.err(format!("expected property name, got {:?}", other))),
        }
    }

    /// Statement terminator with automatic semicolon insertion.
    fn consume_semicolon(&mut self) -> Result<(), SyntaxError> {
        if self.eat(&Token::Semi) {
            return Ok(());
        }
        if matches!(self.peek(), Token::RBrace | Token::Eof) || self.cur().newline_before {
            return Ok(());
        }
        Err(self.err(format!("expected ';', got {:?}", self.peek())))
    }

    // -- Top level ----------------------------------------------

    fn parse_program(&mut self) -> Result<Program, SyntaxError> {
        let start = self.cur().span;
        let mut body = Vec::new();
        while self.peek() != &Token::Eof {
            body.push(self.parse_statement()?);
        }
        let end = self.cur().span;
        Ok(Program {
            body,
            span: start.to(end),
        })
    }
}

/// Lex and parse a complete source text.
pub fn parse(src: &str) -> Result<Program, SyntaxError> {
    let tokens = lexer::lex(src)?;
    parse_tokens(&tokens)
}

/// Parse an already-lexed token stream (which must end with `Eof`).
pub fn parse_tokens(tokens: &[Spanned]) -> Result<Program, SyntaxError> {
    if tokens.is_empty() {
        return Ok(Program {
            body: Vec::new(),
            span: Span::default(),
        });
    }
    let mut p = Parser::new(tokens);
    p.parse_program()
}

/// Whether an expression can appear on the left of `=`.
fn is_assignment_target(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Ident(_) | ExprKind::Member { .. })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
