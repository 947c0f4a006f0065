use super::Parser;
use crate::ast::{Block, CatchClause, ForInit, Stmt, StmtKind, SwitchCase, VarDeclarator, VarKind};
use crate::error::SyntaxError;
use crate::lexer::{is_reserved_word, Token};

impl<'a> Parser<'a> {
    pub(super) fn parse_statement(&mut self) -> Result<Stmt, SyntaxError> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.cur().span;
        let word = match self.peek() {
            Token::LBrace => {
                let block = self.parse_block()?;
                return Ok(Stmt {
                    span: block.span,
                    kind: StmtKind::Block(block),
                });
            }
            Token::Semi => {
                self.advance();
                return Ok(Stmt {
                    kind: StmtKind::Empty,
                    span: start,
                });
            }
            Token::Word(w) => w.clone(),
            _ => return self.parse_expression_statement(),
        };

        let kind = match word.as_str() {
            "var" | "const" => {
                self.advance();
                let kind = if word == "var" {
                    VarKind::Var
                } else {
                    VarKind::Const
                };
                let decls = self.parse_var_declarators()?;
                self.consume_semicolon()?;
                StmtKind::Var { kind, decls }
            }
            "let" if self.starts_let_declaration() => {
                self.advance();
                let decls = self.parse_var_declarators()?;
                self.consume_semicolon()?;
                StmtKind::Var {
                    kind: VarKind::Let,
                    decls,
                }
            }
            "function" => StmtKind::Function(self.parse_function(true)?),
            "class" => StmtKind::Class(self.parse_class(true)?),
            "return" => {
                self.advance();
                let arg = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                StmtKind::Return(arg)
            }
            "if" => self.parse_if()?,
            "for" => self.parse_for()?,
            "while" => {
                self.advance();
                self.expect(&Token::LParen)?;
                let test = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::While { test, body }
            }
            "do" => {
                self.advance();
                let body = Box::new(self.parse_statement()?);
                self.expect_word("while")?;
                self.expect(&Token::LParen)?;
                let test = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                self.eat(&Token::Semi);
                StmtKind::DoWhile { body, test }
            }
            "switch" => self.parse_switch()?,
            "try" => self.parse_try()?,
            "throw" => {
                self.advance();
                if self.cur().newline_before {
                    return Err(self.err("illegal newline after throw"));
                }
                let arg = self.parse_expression()?;
                self.consume_semicolon()?;
                StmtKind::Throw(arg)
            }
            "break" | "continue" => {
                self.advance();
                let label = match self.peek() {
                    Token::Word(w) if !self.cur().newline_before && !is_reserved_word(w) => {
                        Some(self.take_ident()?.name)
                    }
                    _ => None,
                };
                self.consume_semicolon()?;
                if word == "break" {
                    StmtKind::Break(label)
                } else {
                    StmtKind::Continue(label)
                }
            }
            "debugger" => {
                self.advance();
                self.consume_semicolon()?;
                StmtKind::Debugger
            }
            "import" | "export" => {
                return Err(self.err("module declarations are not supported"));
            }
            w if !is_reserved_word(w) && self.peek_at(1) == &Token::Colon => {
                let label = self.take_ident()?.name;
                self.advance();
                let body = Box::new(self.parse_statement()?);
                StmtKind::Labeled { label, body }
            }
            _ => return self.parse_expression_statement(),
        };

        Ok(Stmt {
            kind,
            span: self.finish(start),
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.cur().span;
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Stmt {
            kind: StmtKind::Expr(expr),
            span: self.finish(start),
        })
    }

    /// `let` is only a declaration keyword when a binding follows it.
    fn starts_let_declaration(&self) -> bool {
        matches!(
            self.peek_at(1),
            Token::Word(_) | Token::LBracket | Token::LBrace
        )
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), Token::Semi | Token::RBrace | Token::Eof) || self.cur().newline_before
    }

    pub(super) fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(&Token::LBrace)?;
        let mut body = Vec::new();
        while self.peek() != &Token::RBrace {
            if self.peek() == &Token::Eof {
                return Err(self.err("expected '}', got end of input"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance();
        Ok(Block {
            body,
            span: self.finish(start),
        })
    }

    pub(super) fn parse_var_declarators(&mut self) -> Result<Vec<VarDeclarator>, SyntaxError> {
        let mut decls = Vec::new();
        loop {
            let id = self.take_ident()?;
            let init = if self.eat_op("=") {
                Some(self.parse_assign()?)
            } else {
                None
            };
            let span = self.finish(id.span);
            decls.push(VarDeclarator { id, init, span });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(decls)
    }

    fn parse_if(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        self.expect(&Token::LParen)?;
        let test = self.parse_expression()?;
        self.expect(&Token::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat_word("else") {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_for(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        self.expect(&Token::LParen)?;

        let init = if self.peek() == &Token::Semi {
            None
        } else {
            let start = self.cur().span;
            let kind = if self.is_word("var") {
                Some(VarKind::Var)
            } else if self.is_word("const") {
                Some(VarKind::Const)
            } else if self.is_word("let") && self.starts_let_declaration() {
                Some(VarKind::Let)
            } else {
                None
            };
            self.no_in = true;
            let init = match kind {
                Some(kind) => {
                    self.advance();
                    self.parse_var_declarators().map(|decls| ForInit::Var {
                        kind,
                        decls,
                        span: self.finish(start),
                    })
                }
                None => self.parse_expression().map(ForInit::Expr),
            };
            self.no_in = false;
            Some(init?)
        };

        if let Some(left) = init.clone() {
            let of = self.is_word("of");
            if of || self.is_word("in") {
                if let ForInit::Var { decls, .. } = &left {
                    if decls.len() != 1 {
                        return Err(self.err("for-in/of head declares more than one binding"));
                    }
                }
                self.advance();
                let right = if of {
                    self.parse_assign()?
                } else {
                    self.parse_expression()?
                };
                self.expect(&Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                return Ok(StmtKind::ForIn {
                    left,
                    right,
                    body,
                    of,
                });
            }
        }

        self.expect(&Token::Semi)?;
        let test = if self.peek() == &Token::Semi {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::Semi)?;
        let update = if self.peek() == &Token::RParen {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_switch(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        self.expect(&Token::LParen)?;
        let discriminant = self.parse_expression()?;
        self.expect(&Token::RParen)?;
        self.expect(&Token::LBrace)?;
        let mut cases = Vec::new();
        while !self.eat(&Token::RBrace) {
            let start = self.cur().span;
            let test = if self.eat_word("case") {
                Some(self.parse_expression()?)
            } else if self.eat_word("default") {
                None
            } else {
                return Err(self.err(format!("expected 'case' or 'default', got {:?}", self.peek())));
            };
            self.expect(&Token::Colon)?;
            let mut body = Vec::new();
            while !(self.is_word("case")
                || self.is_word("default")
                || matches!(self.peek(), Token::RBrace | Token::Eof))
            {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                test,
                body,
                span: self.finish(start),
            });
        }
        Ok(StmtKind::Switch {
            discriminant,
            cases,
        })
    }

    fn parse_try(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        let block = self.parse_block()?;
        let handler = if self.is_word("catch") {
            let start = self.advance().span;
            let param = if self.eat(&Token::LParen) {
                let id = self.take_ident()?;
                self.expect(&Token::RParen)?;
                Some(id)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                param,
                body,
                span: self.finish(start),
            })
        } else {
            None
        };
        let finalizer = if self.eat_word("finally") {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.err("expected 'catch' or 'finally' after try block"));
        }
        Ok(StmtKind::Try {
            block,
            handler,
            finalizer,
        })
    }
}
