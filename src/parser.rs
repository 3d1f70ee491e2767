use thiserror::Error;

use crate::ast::{
    Assign, BasicIf, BinaryOperator, BinaryTail, Expr, For, FunDecl, FunParam, If, Path, RValue,
    Return, Stmt, StmtList, Term, TypeDecl, VarDecl, While,
};
use crate::lexer::{LexError, Lexer, TokenSource};
use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected {expected}, found {found} at line {line}, column {column}")]
pub struct SyntaxError {
    pub expected: String,
    pub found: String,
    pub line: usize,
    pub column: usize,
}

/// Front-end failure: either the scanner or the grammar rejected the input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser with one token of lookahead (two for `new T()`).
pub struct Parser<S> {
    source: S,
    current: Token,
    peeked: Option<Token>,
}

impl<'a> Parser<Lexer<'a>> {
    pub fn new(input: &'a str) -> ParseResult<Self> {
        Self::from_source(Lexer::new(input))
    }
}

impl<S: TokenSource> Parser<S> {
    pub fn from_source(mut source: S) -> ParseResult<Self> {
        let current = source.next_token()?;
        Ok(Self {
            source,
            current,
            peeked: None,
        })
    }

    pub fn parse_program(mut self) -> ParseResult<StmtList> {
        let mut stmts = Vec::new();
        while self.current.kind != TokenKind::Eos {
            let stmt = match self.current.kind {
                TokenKind::Type => Stmt::TypeDecl(self.parse_type_decl()?),
                TokenKind::Fun => Stmt::FunDecl(self.parse_fun_decl()?),
                _ => self.parse_block_stmt()?,
            };
            stmts.push(stmt);
        }
        Ok(StmtList { stmts })
    }

    fn parse_type_decl(&mut self) -> ParseResult<TypeDecl> {
        self.expect(TokenKind::Type, "'type'")?;
        let name = self.expect(TokenKind::Id, "type name")?;
        let mut fields = Vec::new();
        while self.current.kind == TokenKind::Var {
            fields.push(self.parse_var_decl()?);
        }
        self.expect(TokenKind::End, "'end' to close type declaration")?;
        Ok(TypeDecl { name, fields })
    }

    fn parse_fun_decl(&mut self) -> ParseResult<FunDecl> {
        self.expect(TokenKind::Fun, "'fun'")?;
        if !(self.current.kind.is_type_name() || self.current.kind == TokenKind::Nil) {
            return Err(self.error("function return type or 'nil'"));
        }
        let return_type = self.advance()?;
        let name = self.expect(TokenKind::Id, "function name")?;
        self.expect(TokenKind::LParen, "'('")?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        self.expect(TokenKind::End, "'end' to close function")?;
        Ok(FunDecl {
            return_type,
            name,
            params,
            body,
        })
    }

    fn parse_params(&mut self) -> ParseResult<Vec<FunParam>> {
        let mut params = Vec::new();
        if !self.current.kind.is_type_name() {
            return Ok(params);
        }
        loop {
            let param_type = self.advance()?;
            let name = self.expect(TokenKind::Id, "parameter name")?;
            params.push(FunParam { param_type, name });
            if self.current.kind != TokenKind::Comma {
                break;
            }
            self.advance()?;
            if !self.current.kind.is_type_name() {
                return Err(self.error("parameter type"));
            }
        }
        Ok(params)
    }

    /// Block statements up to (not including) the token that closes the block.
    fn parse_block(&mut self) -> ParseResult<StmtList> {
        let mut stmts = Vec::new();
        while starts_block_stmt(self.current.kind) {
            stmts.push(self.parse_block_stmt()?);
        }
        Ok(StmtList { stmts })
    }

    fn parse_block_stmt(&mut self) -> ParseResult<Stmt> {
        match self.current.kind {
            TokenKind::Var => Ok(Stmt::VarDecl(self.parse_var_decl()?)),
            TokenKind::Set => Ok(Stmt::Assign(self.parse_assign()?)),
            TokenKind::If => Ok(Stmt::If(self.parse_if()?)),
            TokenKind::While => Ok(Stmt::While(self.parse_while()?)),
            TokenKind::For => Ok(Stmt::For(self.parse_for()?)),
            TokenKind::Return => Ok(Stmt::Return(self.parse_return()?)),
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    /// `var int x := e`, `var T x := e`, `var x := e` and the postfix
    /// primitive form `var x int := e`.
    fn parse_var_decl(&mut self) -> ParseResult<VarDecl> {
        self.expect(TokenKind::Var, "'var'")?;
        if !self.current.kind.is_type_name() {
            return Err(self.error("variable name or type"));
        }
        let first = self.advance()?;
        let (var_type, name) = if first.kind.is_primitive_type() {
            let name = self.expect(TokenKind::Id, "variable name")?;
            (Some(first), name)
        } else if self.current.kind == TokenKind::Id {
            let name = self.advance()?;
            (Some(first), name)
        } else if self.current.kind.is_primitive_type() {
            let var_type = self.advance()?;
            (Some(var_type), first)
        } else {
            (None, first)
        };
        self.expect(TokenKind::Assign, "':='")?;
        let init = self.parse_expr()?;
        Ok(VarDecl {
            var_type,
            name,
            init,
        })
    }

    fn parse_assign(&mut self) -> ParseResult<Assign> {
        self.expect(TokenKind::Set, "'set'")?;
        let target = self.parse_path()?;
        self.expect(TokenKind::Assign, "':='")?;
        let value = self.parse_expr()?;
        Ok(Assign { target, value })
    }

    fn parse_path(&mut self) -> ParseResult<Path> {
        let mut segments = vec![self.expect(TokenKind::Id, "identifier")?];
        while self.current.kind == TokenKind::Dot {
            self.advance()?;
            segments.push(self.expect(TokenKind::Id, "field name")?);
        }
        Ok(Path { segments })
    }

    fn parse_if(&mut self) -> ParseResult<If> {
        self.expect(TokenKind::If, "'if'")?;
        let if_part = self.parse_conditional_body()?;
        let mut elifs = Vec::new();
        while self.current.kind == TokenKind::Elif {
            self.advance()?;
            elifs.push(self.parse_conditional_body()?);
        }
        let else_body = if self.current.kind == TokenKind::Else {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };
        self.expect(TokenKind::End, "'end' to close if statement")?;
        Ok(If {
            if_part,
            elifs,
            else_body,
        })
    }

    fn parse_conditional_body(&mut self) -> ParseResult<BasicIf> {
        let condition = self.parse_expr()?;
        self.expect(TokenKind::Then, "'then'")?;
        let body = self.parse_block()?;
        Ok(BasicIf { condition, body })
    }

    fn parse_while(&mut self) -> ParseResult<While> {
        self.expect(TokenKind::While, "'while'")?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::Do, "'do'")?;
        let body = self.parse_block()?;
        self.expect(TokenKind::End, "'end' to close while loop")?;
        Ok(While { condition, body })
    }

    fn parse_for(&mut self) -> ParseResult<For> {
        self.expect(TokenKind::For, "'for'")?;
        let var = self.expect(TokenKind::Id, "loop variable")?;
        self.expect(TokenKind::Assign, "':='")?;
        let start = self.parse_expr()?;
        self.expect(TokenKind::To, "'to'")?;
        let end = self.parse_expr()?;
        self.expect(TokenKind::Do, "'do'")?;
        let body = self.parse_block()?;
        self.expect(TokenKind::End, "'end' to close for loop")?;
        Ok(For {
            var,
            start,
            end,
            body,
        })
    }

    fn parse_return(&mut self) -> ParseResult<Return> {
        let keyword = self.expect(TokenKind::Return, "'return'")?;
        let value = if starts_expr(self.current.kind) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Return { keyword, value })
    }

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        // `not` marks the whole following expression; repeating it does not
        // cancel out, so `not not x` is `not x`.
        if self.current.kind == TokenKind::Not {
            self.advance()?;
            let mut expr = self.parse_expr()?;
            expr.negated = true;
            return Ok(expr);
        }

        let first = if self.current.kind == TokenKind::LParen {
            self.advance()?;
            let inner = self.parse_expr()?;
            self.expect(TokenKind::RParen, "')'")?;
            Term::Complex(Box::new(inner))
        } else {
            Term::Simple(self.parse_rvalue()?)
        };

        // Right-recursive on purpose: `a - b - c` is `a - (b - c)`.
        let tail = match BinaryOperator::from_kind(self.current.kind) {
            Some(op) => {
                let op_token = self.advance()?;
                let rest = self.parse_expr()?;
                Some(BinaryTail {
                    op,
                    op_token,
                    rest: Box::new(rest),
                })
            }
            None => None,
        };

        Ok(Expr {
            first,
            tail,
            negated: false,
        })
    }

    fn parse_rvalue(&mut self) -> ParseResult<RValue> {
        match self.current.kind {
            TokenKind::Nil => Ok(RValue::Literal(self.advance()?)),
            TokenKind::New => {
                self.advance()?;
                let type_name = self.expect(TokenKind::Id, "type name after 'new'")?;
                if self.current.kind == TokenKind::LParen
                    && self.peek()?.kind == TokenKind::RParen
                {
                    self.advance()?;
                    self.advance()?;
                }
                Ok(RValue::New(type_name))
            }
            TokenKind::Neg => {
                self.advance()?;
                Ok(RValue::Neg(Box::new(self.parse_expr()?)))
            }
            TokenKind::Id => self.parse_id_or_call(),
            kind if kind.is_literal() => Ok(RValue::Literal(self.advance()?)),
            _ => Err(self.error("expression")),
        }
    }

    fn parse_id_or_call(&mut self) -> ParseResult<RValue> {
        let name = self.expect(TokenKind::Id, "identifier")?;
        if self.current.kind == TokenKind::LParen {
            self.advance()?;
            let mut args = Vec::new();
            if starts_expr(self.current.kind) {
                args.push(self.parse_expr()?);
                while self.current.kind == TokenKind::Comma {
                    self.advance()?;
                    args.push(self.parse_expr()?);
                }
            }
            self.expect(TokenKind::RParen, "')' to close argument list")?;
            return Ok(RValue::Call { name, args });
        }

        let mut segments = vec![name];
        while self.current.kind == TokenKind::Dot {
            self.advance()?;
            segments.push(self.expect(TokenKind::Id, "field name")?);
        }
        Ok(RValue::Path(Path { segments }))
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.current.kind == kind {
            self.advance()
        } else {
            Err(self.error(expected))
        }
    }

    fn advance(&mut self) -> ParseResult<Token> {
        let next = match self.peeked.take() {
            Some(token) => token,
            None => self.source.next_token()?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn peek(&mut self) -> ParseResult<&Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.source.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn error(&self, expected: &str) -> ParseError {
        let found = match self.current.kind {
            TokenKind::Eos => "end of input".to_string(),
            _ => format!("'{}'", self.current.lexeme),
        };
        SyntaxError {
            expected: expected.to_string(),
            found,
            line: self.current.line(),
            column: self.current.column(),
        }
        .into()
    }
}

fn starts_expr(kind: TokenKind) -> bool {
    kind.is_literal()
        || matches!(
            kind,
            TokenKind::Not
                | TokenKind::LParen
                | TokenKind::Nil
                | TokenKind::New
                | TokenKind::Neg
                | TokenKind::Id
        )
}

fn starts_block_stmt(kind: TokenKind) -> bool {
    starts_expr(kind)
        || matches!(
            kind,
            TokenKind::Var
                | TokenKind::Set
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
        )
}

pub fn parse(input: &str) -> ParseResult<StmtList> {
    Parser::new(input)?.parse_program()
}

pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult<StmtList> {
    Parser::from_source(tokens.into_iter())?.parse_program()
}
