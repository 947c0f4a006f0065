use super::{is_assignment_target, Parser};
use crate::ast::{Expr, ExprKind, Literal, MemberProp, PropKey, PropKind, Property};
use crate::error::SyntaxError;
use crate::lexer::{is_reserved_word, Token};

const ASSIGN_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=", "||=",
    "??=",
];

impl<'a> Parser<'a> {
    /// Run `f` with `in` treated as an operator again (inside brackets,
    /// parentheses and nested function bodies).
    pub(super) fn allow_in<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    // -- Sequence and assignment --------------------------------

    pub(super) fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        let first = self.parse_assign()?;
        if self.peek() != &Token::Comma {
            return Ok(first);
        }
        let start = first.span;
        let mut exprs = vec![first];
        while self.eat(&Token::Comma) {
            exprs.push(self.parse_assign()?);
        }
        Ok(Expr {
            kind: ExprKind::Sequence(exprs),
            span: self.finish(start),
        })
    }

    pub(super) fn parse_assign(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::parse_assign_inner)
    }

    fn parse_assign_inner(&mut self) -> Result<Expr, SyntaxError> {
        if self.starts_arrow() {
            return self.parse_arrow();
        }
        let target = self.parse_conditional()?;
        let op = match self.peek() {
            Token::Op(op) if ASSIGN_OPS.contains(op) => *op,
            _ => return Ok(target),
        };
        if !is_assignment_target(&target) {
            return Err(self.err("invalid assignment target"));
        }
        self.advance();
        let value = self.parse_assign()?;
        let span = target.span.to(value.span);
        Ok(Expr {
            kind: ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        })
    }

    /// `x =>` or a parenthesized list whose closing `)` is followed by `=>`.
    fn starts_arrow(&self) -> bool {
        match self.peek() {
            Token::Word(w) => !is_reserved_word(w) && self.peek_at(1) == &Token::Arrow,
            Token::LParen => {
                let mut depth = 0usize;
                for (i, tok) in self.tokens[self.pos..].iter().enumerate() {
                    match tok.token {
                        Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                        Token::RParen | Token::RBracket | Token::RBrace => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                return self.peek_at(i + 1) == &Token::Arrow;
                            }
                        }
                        Token::Eof => return false,
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr, SyntaxError> {
        let test = self.parse_binary(1)?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.allow_in(|p| p.parse_assign())?;
        self.expect(&Token::Colon)?;
        let alternate = self.parse_assign()?;
        let span = test.span.to(alternate.span);
        Ok(Expr {
            kind: ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        })
    }

    // -- Binary operators ---------------------------------------

    fn binary_op(&self) -> Option<(&'static str, u8)> {
        let op = match self.peek() {
            Token::Op(op) => *op,
            Token::Word(w) if w == "instanceof" => "instanceof",
            Token::Word(w) if w == "in" && !self.no_in => "in",
            _ => return None,
        };
        let prec = match op {
            "??" | "||" => 1,
            "&&" => 2,
            "|" => 3,
            "^" => 4,
            "&" => 5,
            "==" | "!=" | "===" | "!==" => 6,
            "<" | ">" | "<=" | ">=" | "instanceof" | "in" => 7,
            "<<" | ">>" | ">>>" => 8,
            "+" | "-" => 9,
            "*" | "/" | "%" => 10,
            "**" => 11,
            _ => return None,
        };
        Some((op, prec))
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let mut left = self.parse_unary()?;
        while let Some((op, prec)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            // each operator wraps `left` one level deeper
            self.deepen()?;
            self.advance();
            // `**` is right-associative
            let next = if op == "**" { prec } else { prec + 1 };
            let right = self.parse_binary(next)?;
            let span = left.span.to(right.span);
            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            };
        }
        self.depth = base;
        Ok(left)
    }

    // -- Unary and update ---------------------------------------

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.cur().span;
        let op = match self.peek() {
            Token::Op(op @ ("!" | "~" | "+" | "-")) => Some(*op),
            Token::Word(w) if w == "typeof" => Some("typeof"),
            Token::Word(w) if w == "void" => Some("void"),
            Token::Word(w) if w == "delete" => Some("delete"),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let arg = self.nested(Self::parse_unary)?;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    arg: Box::new(arg),
                },
                span: self.finish(start),
            });
        }

        let update = match self.peek() {
            Token::Op(op @ ("++" | "--")) => Some(*op),
            _ => None,
        };
        if let Some(op) = update {
            self.advance();
            let arg = self.nested(Self::parse_unary)?;
            if !is_assignment_target(&arg) {
                return Err(self.err("invalid update target"));
            }
            return Ok(Expr {
                kind: ExprKind::Update {
                    op,
                    prefix: true,
                    arg: Box::new(arg),
                },
                span: self.finish(start),
            });
        }

        let expr = self.parse_call_member()?;
        let postfix = match self.peek() {
            Token::Op(op @ ("++" | "--")) if !self.cur().newline_before => Some(*op),
            _ => None,
        };
        match postfix {
            Some(op) => {
                if !is_assignment_target(&expr) {
                    return Err(self.err("invalid update target"));
                }
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Update {
                        op,
                        prefix: false,
                        arg: Box::new(expr),
                    },
                    span: self.finish(start),
                })
            }
            None => Ok(expr),
        }
    }

    // -- Calls and member access --------------------------------

    pub(super) fn parse_call_member(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.cur().span;
        let base = self.depth;
        let mut expr = if self.is_word("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.link_follows() {
                self.deepen()?;
            }
            let kind = match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = self.take_property_name()?;
                    ExprKind::Member {
                        object: Box::new(expr),
                        property: MemberProp::Name(name),
                        optional: false,
                    }
                }
                Token::QuestionDot => {
                    self.advance();
                    match self.peek() {
                        Token::LParen => ExprKind::Call {
                            callee: Box::new(expr),
                            args: self.parse_arguments()?,
                            optional: true,
                        },
                        Token::LBracket => ExprKind::Member {
                            object: Box::new(expr),
                            property: MemberProp::Computed(Box::new(self.parse_computed()?)),
                            optional: true,
                        },
                        _ => ExprKind::Member {
                            object: Box::new(expr),
                            property: MemberProp::Name(self.take_property_name()?),
                            optional: true,
                        },
                    }
                }
                Token::LBracket => ExprKind::Member {
                    object: Box::new(expr),
                    property: MemberProp::Computed(Box::new(self.parse_computed()?)),
                    optional: false,
                },
                Token::LParen => ExprKind::Call {
                    callee: Box::new(expr),
                    args: self.parse_arguments()?,
                    optional: false,
                },
                Token::Template(raw) => {
                    let quasi = Expr {
                        kind: ExprKind::Literal(Literal::Template(raw.clone())),
                        span: self.advance().span,
                    };
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args: vec![quasi],
                        optional: false,
                    }
                }
                _ => break,
            };
            expr = Expr {
                kind,
                span: self.finish(start),
            };
        }
        self.depth = base;
        Ok(expr)
    }

    /// Whether the next token extends a call/member chain.
    fn link_follows(&self) -> bool {
        matches!(
            self.peek(),
            Token::Dot | Token::QuestionDot | Token::LBracket | Token::LParen | Token::Template(_)
        )
    }

    /// `new Callee.path(args)`; the argument list binds to the innermost
    /// `new`, and call expressions are not part of the callee.
    fn parse_new(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect_word("new")?;
        let base = self.depth;
        let mut callee = if self.is_word("new") {
            self.nested(Self::parse_new)?
        } else {
            self.parse_primary()?
        };
        loop {
            let property = match self.peek() {
                Token::Dot => {
                    self.deepen()?;
                    self.advance();
                    MemberProp::Name(self.take_property_name()?)
                }
                Token::LBracket => {
                    self.deepen()?;
                    MemberProp::Computed(Box::new(self.parse_computed()?))
                }
                _ => break,
            };
            callee = Expr {
                span: callee.span.to(self.prev_span()),
                kind: ExprKind::Member {
                    object: Box::new(callee),
                    property,
                    optional: false,
                },
            };
        }
        self.depth = base;
        let args = if self.peek() == &Token::LParen {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr {
            kind: ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            span: self.finish(start),
        })
    }

    fn parse_computed(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(&Token::LBracket)?;
        let expr = self.allow_in(|p| p.parse_expression())?;
        self.expect(&Token::RBracket)?;
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(&Token::LParen)?;
        self.allow_in(|p| {
            let mut args = Vec::new();
            loop {
                if p.eat(&Token::RParen) {
                    break;
                }
                args.push(p.parse_spread_or_assign()?);
                if !p.eat(&Token::Comma) {
                    p.expect(&Token::RParen)?;
                    break;
                }
            }
            Ok(args)
        })
    }

    fn parse_spread_or_assign(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek() != &Token::Ellipsis {
            return self.parse_assign();
        }
        let start = self.advance().span;
        let arg = self.parse_assign()?;
        Ok(Expr {
            kind: ExprKind::Spread(Box::new(arg)),
            span: self.finish(start),
        })
    }

    // -- Primary expressions ------------------------------------

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.cur().span;
        let kind = match self.peek().clone() {
            Token::Word(w) => match w.as_str() {
                "this" => {
                    self.advance();
                    ExprKind::This
                }
                "super" => {
                    self.advance();
                    ExprKind::Super
                }
                "null" => {
                    self.advance();
                    ExprKind::Literal(Literal::Null)
                }
                "true" | "false" => {
                    self.advance();
                    ExprKind::Literal(Literal::Bool(w == "true"))
                }
                "function" => ExprKind::Function(Box::new(self.parse_function(false)?)),
                "class" => ExprKind::Class(Box::new(self.parse_class(false)?)),
                _ => ExprKind::Ident(self.take_ident()?.name),
            },
            Token::Num(n) => {
                self.advance();
                ExprKind::Literal(Literal::Num(n))
            }
            Token::Str(s) => {
                self.advance();
                ExprKind::Literal(Literal::Str(s))
            }
            Token::Template(raw) => {
                self.advance();
                ExprKind::Literal(Literal::Template(raw))
            }
            Token::Regex { pattern, flags } => {
                self.advance();
                ExprKind::Literal(Literal::Regex { pattern, flags })
            }
            Token::LParen => {
                self.advance();
                let inner = self.allow_in(|p| p.parse_expression())?;
                self.expect(&Token::RParen)?;
                return Ok(inner);
            }
            Token::LBracket => self.parse_array()?,
            Token::LBrace => self.parse_object()?,
            other => return Err(self.err(format!("unexpected token {:?}", other))),
        };
        Ok(Expr {
            kind,
            span: self.finish(start),
        })
    }

    fn parse_array(&mut self) -> Result<ExprKind, SyntaxError> {
        self.expect(&Token::LBracket)?;
        self.allow_in(|p| {
            let mut elements = Vec::new();
            loop {
                if p.eat(&Token::RBracket) {
                    break;
                }
                if p.eat(&Token::Comma) {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(p.parse_spread_or_assign()?));
                if !p.eat(&Token::Comma) {
                    p.expect(&Token::RBracket)?;
                    break;
                }
            }
            Ok(ExprKind::Array(elements))
        })
    }

    // -- Object literals ----------------------------------------

    fn parse_object(&mut self) -> Result<ExprKind, SyntaxError> {
        self.expect(&Token::LBrace)?;
        self.allow_in(|p| {
            let mut props = Vec::new();
            loop {
                if p.eat(&Token::RBrace) {
                    break;
                }
                if p.eat(&Token::Ellipsis) {
                    // Spread members contribute no statically known keys.
                    p.parse_assign()?;
                } else {
                    props.push(p.parse_property()?);
                }
                if !p.eat(&Token::Comma) {
                    p.expect(&Token::RBrace)?;
                    break;
                }
            }
            Ok(ExprKind::Object(props))
        })
    }

    fn parse_property(&mut self) -> Result<Property, SyntaxError> {
        let start = self.cur().span;

        let accessor = match self.peek() {
            Token::Word(w) if w == "get" => Some(PropKind::Get),
            Token::Word(w) if w == "set" => Some(PropKind::Set),
            _ => None,
        };
        if let Some(kind) = accessor {
            if !matches!(
                self.peek_at(1),
                Token::Colon | Token::LParen | Token::Comma | Token::RBrace
            ) {
                self.advance();
                let key = self.parse_property_key()?;
                let func = self.parse_method(start)?;
                return Ok(Property {
                    key,
                    value: func,
                    kind,
                    span: self.finish(start),
                });
            }
        }

        // Generator method: `*name() {}`
        let generator = self.eat_op("*");
        let shorthand = match self.peek() {
            Token::Word(w) if !is_reserved_word(w) => Some(w.clone()),
            _ => None,
        };
        let key = self.parse_property_key()?;

        let value = if self.peek() == &Token::LParen {
            self.parse_method(start)?
        } else if generator {
            return Err(self.err("expected '(' after generator method name"));
        } else if self.eat(&Token::Colon) {
            self.parse_assign()?
        } else if let (Some(name), Token::Comma | Token::RBrace) = (shorthand, self.peek()) {
            Expr {
                kind: ExprKind::Ident(name),
                span: self.prev_span(),
            }
        } else {
            return Err(self.err(format!("expected ':' in object literal, got {:?}", self.peek())));
        };

        Ok(Property {
            key,
            value,
            kind: PropKind::Init,
            span: self.finish(start),
        })
    }

    pub(super) fn parse_property_key(&mut self) -> Result<PropKey, SyntaxError> {
        let key = match self.peek().clone() {
            Token::Word(w) => PropKey::Ident(w),
            Token::Str(s) => PropKey::Str(s),
            Token::Num(n) => PropKey::Num(n),
            Token::LBracket => {
                let expr = self.parse_computed()?;
                return Ok(PropKey::Computed(Box::new(expr)));
            }
            other => return Err(self.err(format!("expected property name, got {:?}", other))),
        };
        self.advance();
        Ok(key)
    }
}
