//! The parser.
//!
//! A one-token-lookahead recursive-descent implementation of the grammar. The
//! first lexical or syntax error aborts parsing with a single located
//! diagnostic; there is no recovery.

use crate::ast::*;
use crate::errors::{Error, LexicalError, SyntaxError};
use crate::lexer::Lexer;
use crate::token::{LiteralKind, Token, TokenKind};
use crate::types::Type;

pub struct Parser<'a> {
    /// The current token.
    token: Token,
    /// The previous token.
    prev_token: Token,
    lexer: Lexer<'a>,
}

/// Parses IL source text into a [`Program`].
pub fn parse(input: &str) -> Result<Program, Error> {
    Parser::new(input).parse_program()
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Parser<'a> {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token();
        Parser {
            prev_token: token.clone(),
            token,
            lexer,
        }
    }

    fn bump(&mut self) {
        self.prev_token = std::mem::replace(&mut self.token, self.lexer.next_token());
    }

    fn is_eof(&self) -> bool {
        self.token.kind == TokenKind::Eof
    }

    fn syntax_error(&self, error: SyntaxError) -> Error {
        Error::Syntax {
            error,
            location: self.token.start,
        }
    }

    fn lexical_error(&self, error: LexicalError) -> Error {
        Error::Lexical {
            error,
            location: self.token.start,
        }
    }

    /// Surfaces an error embedded in the current token by the lexer, so it is
    /// reported as a lexical problem rather than a confusing syntax one.
    fn lexical_guard(&self) -> Result<(), Error> {
        let error = match &self.token.kind {
            TokenKind::Unknown(c) => LexicalError::IllegalCharacter(*c),
            TokenKind::Literal(LiteralKind::Int(Err(e))) => e.clone(),
            TokenKind::Literal(LiteralKind::Real(Err(e))) => e.clone(),
            TokenKind::Literal(LiteralKind::Str(Err(e))) => e.clone(),
            _ => return Ok(()),
        };
        Err(self.lexical_error(error))
    }

    /// Consumes the current token if it has the expected kind.
    fn eat(&mut self, kind: TokenKind) -> Result<(), Error> {
        if self.token.kind == kind {
            self.bump();
            Ok(())
        } else if self.is_eof() {
            Err(self.syntax_error(SyntaxError::UnexpectedEof))
        } else {
            Err(self.syntax_error(SyntaxError::UnexpectedToken {
                expected: vec![kind],
                found: self.token.kind.clone(),
            }))
        }
    }

    fn eat_ident(&mut self) -> Result<String, Error> {
        match &self.token.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.syntax_error(SyntaxError::ExpectedIdentifier {
                found: self.token.kind.clone(),
            })),
        }
    }

    fn skip_semis(&mut self) {
        while self.token.kind == TokenKind::Semi {
            self.bump();
        }
    }

    fn parse_program(&mut self) -> Result<Program, Error> {
        let mut statements = Vec::new();
        self.skip_semis();
        while !self.is_eof() {
            statements.push(self.parse_stmt(true)?);
            self.skip_semis();
        }
        Ok(Program { statements })
    }

    /// Parses statements up to (not including) a closing `end`, `else` or the
    /// end of input.
    fn parse_stmt_list(&mut self) -> Result<Vec<Stmt>, Error> {
        let mut statements = Vec::new();
        self.skip_semis();
        loop {
            match self.token.kind {
                TokenKind::End | TokenKind::Else | TokenKind::Eof => break,
                _ => {
                    statements.push(self.parse_stmt(false)?);
                    self.skip_semis();
                }
            }
        }
        Ok(statements)
    }

    fn parse_stmt(&mut self, top_level: bool) -> Result<Stmt, Error> {
        self.lexical_guard()?;
        let start = self.token.start;
        let kind = match self.token.kind {
            TokenKind::Var => self.parse_var_decl()?,
            TokenKind::Type => self.parse_type_decl()?,
            TokenKind::Routine => {
                if !top_level {
                    return Err(self.syntax_error(SyntaxError::NestedRoutine));
                }
                self.parse_routine_decl()?
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Print => self.parse_print()?,
            TokenKind::Read => {
                self.bump();
                let variable = self.eat_ident()?;
                StmtKind::Read { variable }
            }
            TokenKind::Return => self.parse_return()?,
            TokenKind::Ident(_) => self.parse_assignment_or_call()?,
            _ => {
                return Err(self.syntax_error(SyntaxError::ExpectedStatement {
                    found: self.token.kind.clone(),
                }))
            }
        };
        Ok(Stmt {
            kind,
            start,
            end: self.prev_token.end,
        })
    }

    fn parse_var_decl(&mut self) -> Result<StmtKind, Error> {
        self.bump();
        let name = self.eat_ident()?;
        self.eat(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        if let Type::Array { .. } = ty {
            // Array declarations take no initializer.
            return Ok(StmtKind::ArrayDecl { name, ty });
        }
        let init = if self.token.kind == TokenKind::Is {
            self.bump();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(StmtKind::VarDecl { name, ty, init })
    }

    fn parse_type_decl(&mut self) -> Result<StmtKind, Error> {
        self.bump();
        let name = self.eat_ident()?;
        self.eat(TokenKind::Is)?;
        let ty = if self.token.kind == TokenKind::Record {
            self.parse_record_type()?
        } else {
            self.parse_type()?
        };
        Ok(StmtKind::TypeDecl { name, ty })
    }

    fn parse_record_type(&mut self) -> Result<Type, Error> {
        self.bump();
        let mut fields = indexmap::IndexMap::new();
        self.skip_semis();
        while self.token.kind == TokenKind::Var {
            self.bump();
            let name = self.eat_ident()?;
            self.eat(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            fields.insert(name, ty);
            self.skip_semis();
        }
        self.eat(TokenKind::End)?;
        Ok(Type::Record(fields))
    }

    fn parse_routine_decl(&mut self) -> Result<StmtKind, Error> {
        self.bump();
        let name = self.eat_ident()?;
        self.eat(TokenKind::OpenParen)?;
        let mut params = Vec::new();
        if self.token.kind != TokenKind::CloseParen {
            loop {
                let name = self.eat_ident()?;
                self.eat(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                params.push(Parameter { name, ty });
                if self.token.kind == TokenKind::Comma {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.eat(TokenKind::CloseParen)?;
        let return_type = if self.token.kind == TokenKind::Colon {
            self.bump();
            Some(self.parse_type()?)
        } else {
            None
        };
        self.eat(TokenKind::Is)?;
        let body = self.parse_stmt_list()?;
        self.eat(TokenKind::End)?;
        Ok(StmtKind::RoutineDecl {
            name,
            params,
            return_type,
            body,
        })
    }

    fn parse_if(&mut self) -> Result<StmtKind, Error> {
        self.bump();
        let condition = Box::new(self.parse_expr()?);
        self.eat(TokenKind::Then)?;
        let then_body = self.parse_stmt_list()?;
        let else_body = if self.token.kind == TokenKind::Else {
            self.bump();
            Some(self.parse_stmt_list()?)
        } else {
            None
        };
        self.eat(TokenKind::End)?;
        Ok(StmtKind::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_while(&mut self) -> Result<StmtKind, Error> {
        self.bump();
        let condition = Box::new(self.parse_expr()?);
        self.eat(TokenKind::Loop)?;
        let body = self.parse_stmt_list()?;
        self.eat(TokenKind::End)?;
        Ok(StmtKind::While { condition, body })
    }

    fn parse_for(&mut self) -> Result<StmtKind, Error> {
        self.bump();
        let variable = self.eat_ident()?;
        self.eat(TokenKind::In)?;
        let reverse = if self.token.kind == TokenKind::Reverse {
            self.bump();
            true
        } else {
            false
        };
        let from = Box::new(self.parse_expr()?);
        self.eat(TokenKind::Range)?;
        let to = Box::new(self.parse_expr()?);
        self.eat(TokenKind::Loop)?;
        let body = self.parse_stmt_list()?;
        self.eat(TokenKind::End)?;
        Ok(StmtKind::For {
            variable,
            reverse,
            from,
            to,
            body,
        })
    }

    fn parse_print(&mut self) -> Result<StmtKind, Error> {
        self.bump();
        self.eat(TokenKind::OpenParen)?;
        let value = Box::new(self.parse_expr()?);
        self.eat(TokenKind::CloseParen)?;
        Ok(StmtKind::Print { value })
    }

    fn parse_return(&mut self) -> Result<StmtKind, Error> {
        self.bump();
        let value = match self.token.kind {
            TokenKind::Semi | TokenKind::End | TokenKind::Else | TokenKind::Eof => None,
            _ => Some(Box::new(self.parse_expr()?)),
        };
        Ok(StmtKind::Return { value })
    }

    fn parse_assignment_or_call(&mut self) -> Result<StmtKind, Error> {
        let name = self.eat_ident()?;
        match self.token.kind {
            TokenKind::OpenParen => {
                let args = self.parse_args()?;
                Ok(StmtKind::RoutineCall { name, args })
            }
            TokenKind::OpenBracket => {
                self.bump();
                let index = Box::new(self.parse_expr()?);
                self.eat(TokenKind::CloseBracket)?;
                self.eat(TokenKind::Assign)?;
                let value = Box::new(self.parse_expr()?);
                Ok(StmtKind::Assignment {
                    target: name,
                    index: Some(index),
                    value,
                })
            }
            TokenKind::Dot => {
                self.bump();
                let field = self.eat_ident()?;
                self.eat(TokenKind::Assign)?;
                let value = Box::new(self.parse_expr()?);
                Ok(StmtKind::Assignment {
                    target: format!("{name}.{field}"),
                    index: None,
                    value,
                })
            }
            TokenKind::Assign => {
                self.bump();
                let value = Box::new(self.parse_expr()?);
                Ok(StmtKind::Assignment {
                    target: name,
                    index: None,
                    value,
                })
            }
            _ => Err(self.syntax_error(SyntaxError::UnexpectedToken {
                expected: vec![
                    TokenKind::Assign,
                    TokenKind::OpenParen,
                    TokenKind::OpenBracket,
                    TokenKind::Dot,
                ],
                found: self.token.kind.clone(),
            })),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, Error> {
        self.eat(TokenKind::OpenParen)?;
        let mut args = Vec::new();
        if self.token.kind != TokenKind::CloseParen {
            loop {
                args.push(self.parse_expr()?);
                if self.token.kind == TokenKind::Comma {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.eat(TokenKind::CloseParen)?;
        Ok(args)
    }

    fn parse_type(&mut self) -> Result<Type, Error> {
        self.lexical_guard()?;
        let ty = match &self.token.kind {
            TokenKind::Integer => Type::Integer,
            TokenKind::Real => Type::Real,
            TokenKind::Boolean => Type::Boolean,
            TokenKind::StringType => Type::Str,
            TokenKind::Void => Type::Void,
            TokenKind::Ident(name) => Type::Named(name.clone()),
            TokenKind::Array => {
                self.bump();
                self.eat(TokenKind::OpenBracket)?;
                let size = self.eat_array_size()?;
                self.eat(TokenKind::CloseBracket)?;
                let element = Box::new(self.parse_type()?);
                return Ok(Type::Array { size, element });
            }
            _ => {
                return Err(self.syntax_error(SyntaxError::ExpectedType {
                    found: self.token.kind.clone(),
                }))
            }
        };
        self.bump();
        Ok(ty)
    }

    fn eat_array_size(&mut self) -> Result<i32, Error> {
        match &self.token.kind {
            TokenKind::Literal(LiteralKind::Int(Ok(size))) => {
                let size = *size;
                self.bump();
                Ok(size)
            }
            TokenKind::Literal(LiteralKind::Int(Err(e))) => Err(self.lexical_error(e.clone())),
            _ => Err(self.syntax_error(SyntaxError::ExpectedArraySize {
                found: self.token.kind.clone(),
            })),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.lexical_guard()?;
        let mut left = self.parse_logic_and()?;
        loop {
            let op = match self.token.kind {
                TokenKind::Or => BinOp::Or,
                TokenKind::Xor => BinOp::Xor,
                _ => break,
            };
            self.bump();
            let right = self.parse_logic_and()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_logic_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_rel()?;
        while self.token.kind == TokenKind::And {
            self.bump();
            let right = self.parse_rel()?;
            left = binary(left, BinOp::And, right);
        }
        Ok(left)
    }

    fn parse_rel(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_sum()?;
        loop {
            let op = match self.token.kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::Ge,
                _ => break,
            };
            self.bump();
            let right = self.parse_sum()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_sum(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.token.kind {
                TokenKind::Add => BinOp::Add,
                TokenKind::Sub => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.parse_term()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.token.kind {
                TokenKind::Mul => BinOp::Mul,
                TokenKind::Div => BinOp::Div,
                TokenKind::Mod => BinOp::Mod,
                _ => break,
            };
            self.bump();
            let right = self.parse_factor()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, Error> {
        let start = self.token.start;
        let op = match self.token.kind {
            TokenKind::Not => UnOp::Not,
            TokenKind::Sub => UnOp::Neg,
            _ => return self.parse_primary(),
        };
        self.bump();
        let operand = self.parse_factor()?;
        Ok(Expr {
            end: operand.end,
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            start,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        self.lexical_guard()?;
        let start = self.token.start;
        let kind = match &self.token.kind {
            TokenKind::Literal(LiteralKind::Int(Ok(value))) => {
                let value = *value;
                self.bump();
                ExprKind::Integer(value)
            }
            TokenKind::Literal(LiteralKind::Real(Ok(value))) => {
                let value = *value;
                self.bump();
                ExprKind::Real(value)
            }
            TokenKind::Literal(LiteralKind::Str(Ok(value))) => {
                let value = value.clone();
                self.bump();
                ExprKind::Str(value)
            }
            TokenKind::True => {
                self.bump();
                ExprKind::Boolean(true)
            }
            TokenKind::False => {
                self.bump();
                ExprKind::Boolean(false)
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.bump();
                match self.token.kind {
                    TokenKind::OpenParen => {
                        let args = self.parse_args()?;
                        ExprKind::Call { name, args }
                    }
                    TokenKind::OpenBracket => {
                        self.bump();
                        let index = Box::new(self.parse_expr()?);
                        self.eat(TokenKind::CloseBracket)?;
                        ExprKind::ArrayAccess { name, index }
                    }
                    TokenKind::Dot => {
                        self.bump();
                        let field = self.eat_ident()?;
                        ExprKind::RecordAccess {
                            record: name,
                            field,
                        }
                    }
                    _ => ExprKind::Var(name),
                }
            }
            TokenKind::OpenParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.eat(TokenKind::CloseParen)?;
                inner.kind
            }
            _ => {
                return Err(self.syntax_error(SyntaxError::ExpectedExpression {
                    found: self.token.kind.clone(),
                }))
            }
        };
        let mut expr = Expr {
            kind,
            start,
            end: self.prev_token.end,
        };
        // Postfix `as` casts bind tightest.
        while self.token.kind == TokenKind::As {
            self.bump();
            let target = self.parse_type()?;
            expr = Expr {
                start,
                end: self.prev_token.end,
                kind: ExprKind::Cast {
                    expr: Box::new(expr),
                    target,
                },
            };
        }
        Ok(expr)
    }
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    Expr {
        start: left.start,
        end: right.end,
        kind: ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    }
}
