use super::Parser;
use crate::ast::{
    Block, Class, ClassMember, ClassMemberKind, Expr, ExprKind, Function, FunctionBody, Param,
    PropKey,
};
use crate::error::SyntaxError;
use crate::lexer::{is_reserved_word, Token};
use crate::span::Span;

impl<'a> Parser<'a> {
    // -- Functions ----------------------------------------------

    /// `function name(params) { body }`. The name is required for
    /// declarations and optional for expressions.
    pub(super) fn parse_function(&mut self, is_decl: bool) -> Result<Function, SyntaxError> {
        let start = self.expect_word("function")?;
        self.eat_op("*");
        let id = match self.peek() {
            Token::Word(w) if !is_reserved_word(w) => Some(self.take_ident()?),
            _ if is_decl => return Err(self.err("function declaration requires a name")),
            _ => None,
        };
        let params = self.parse_params()?;
        let body = self.parse_function_block()?;
        Ok(Function {
            id,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            span: self.finish(start),
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, SyntaxError> {
        self.expect(&Token::LParen)?;
        self.allow_in(|p| {
            let mut params = Vec::new();
            loop {
                if p.eat(&Token::RParen) {
                    break;
                }
                let rest = p.eat(&Token::Ellipsis);
                let name = p.take_ident()?;
                let default = if !rest && p.eat_op("=") {
                    Some(p.parse_assign()?)
                } else {
                    None
                };
                params.push(Param {
                    name,
                    default,
                    rest,
                });
                if rest || !p.eat(&Token::Comma) {
                    p.expect(&Token::RParen)?;
                    break;
                }
            }
            Ok(params)
        })
    }

    fn parse_function_block(&mut self) -> Result<Block, SyntaxError> {
        self.allow_in(|p| p.parse_block())
    }

    /// Parameter list and body of an object or class method whose key
    /// has already been consumed.
    fn parse_method_function(&mut self, start: Span) -> Result<Function, SyntaxError> {
        let params = self.parse_params()?;
        let body = self.parse_function_block()?;
        Ok(Function {
            id: None,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            span: self.finish(start),
        })
    }

    pub(super) fn parse_method(&mut self, start: Span) -> Result<Expr, SyntaxError> {
        let func = self.parse_method_function(start)?;
        Ok(Expr {
            span: func.span,
            kind: ExprKind::Function(Box::new(func)),
        })
    }

    pub(super) fn parse_arrow(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.cur().span;
        let params = if self.peek() == &Token::LParen {
            self.parse_params()?
        } else {
            vec![Param {
                name: self.take_ident()?,
                default: None,
                rest: false,
            }]
        };
        if self.cur().newline_before {
            return Err(self.err("illegal newline before '=>'"));
        }
        self.expect(&Token::Arrow)?;
        let body = if self.peek() == &Token::LBrace {
            FunctionBody::Block(self.parse_function_block()?)
        } else {
            FunctionBody::Expr(Box::new(self.parse_assign()?))
        };
        let span = self.finish(start);
        Ok(Expr {
            kind: ExprKind::Function(Box::new(Function {
                id: None,
                params,
                body,
                is_arrow: true,
                span,
            })),
            span,
        })
    }

    // -- Classes ------------------------------------------------

    pub(super) fn parse_class(&mut self, is_decl: bool) -> Result<Class, SyntaxError> {
        let start = self.expect_word("class")?;
        let id = match self.peek() {
            Token::Word(w) if !is_reserved_word(w) => Some(self.take_ident()?),
            _ if is_decl => return Err(self.err("class declaration requires a name")),
            _ => None,
        };
        let super_class = if self.eat_word("extends") {
            Some(Box::new(self.parse_call_member()?))
        } else {
            None
        };

        let body_start = self.expect(&Token::LBrace)?;
        let mut members = Vec::new();
        while !self.eat(&Token::RBrace) {
            if self.eat(&Token::Semi) {
                continue;
            }
            if self.peek() == &Token::Eof {
                return Err(self.err("expected '}', got end of input"));
            }
            members.push(self.parse_class_member()?);
        }
        let body_span = self.finish(body_start);

        Ok(Class {
            id,
            super_class,
            members,
            body_span,
            span: self.finish(start),
        })
    }

    /// True when the current word is a modifier (`static`, `get`, `set`)
    /// rather than the member's own name.
    fn is_modifier(&self, word: &str) -> bool {
        self.is_word(word)
            && !matches!(
                self.peek_at(1),
                Token::LParen | Token::Op("=") | Token::Semi | Token::RBrace
            )
    }

    fn parse_class_member(&mut self) -> Result<ClassMember, SyntaxError> {
        let start = self.cur().span;
        let is_static = self.is_modifier("static");
        if is_static {
            self.advance();
        }
        let accessor = if self.is_modifier("get") {
            Some(true)
        } else if self.is_modifier("set") {
            Some(false)
        } else {
            None
        };
        if accessor.is_some() {
            self.advance();
        }
        let generator = self.eat_op("*");
        let key = self.parse_property_key()?;

        let kind = if self.peek() == &Token::LParen {
            let func = self.allow_in(|p| p.parse_method_function(start))?;
            let is_ctor = !is_static
                && matches!(&key, PropKey::Ident(k) | PropKey::Str(k) if k == "constructor");
            match accessor {
                Some(true) => ClassMemberKind::Get(func),
                Some(false) => ClassMemberKind::Set(func),
                None if is_ctor => ClassMemberKind::Constructor(func),
                None => ClassMemberKind::Method(func),
            }
        } else {
            if accessor.is_some() || generator {
                return Err(self.err(format!("expected '(', got {:?}", self.peek())));
            }
            let init = if self.eat_op("=") {
                Some(self.allow_in(|p| p.parse_assign())?)
            } else {
                None
            };
            self.consume_semicolon()?;
            ClassMemberKind::Field(init)
        };

        Ok(ClassMember {
            key,
            is_static,
            kind,
            span: self.finish(start),
        })
    }
}
