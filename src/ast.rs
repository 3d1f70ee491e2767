//! Syntax tree shared by the type checker, the interpreter and the printer.
//!
//! Nodes keep the tokens they were parsed from so later phases can report
//! positions. The tree has no back-edges; every node is owned by its parent.

use crate::token::{Token, TokenKind};

/// An ordered block of statements. Every block opens its own scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StmtList {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl(VarDecl),
    Assign(Assign),
    Return(Return),
    If(If),
    While(While),
    For(For),
    TypeDecl(TypeDecl),
    FunDecl(FunDecl),
    Expr(Expr),
}

/// `var [type] name := init`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub var_type: Option<Token>,
    pub name: Token,
    pub init: Expr,
}

/// `set target := value`
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub target: Path,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub keyword: Token,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicIf {
    pub condition: Expr,
    pub body: StmtList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub if_part: BasicIf,
    pub elifs: Vec<BasicIf>,
    pub else_body: Option<StmtList>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct While {
    pub condition: Expr,
    pub body: StmtList,
}

/// `for var := start to end do body end`; the direction is decided at run
/// time from the bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub var: Token,
    pub start: Expr,
    pub end: Expr,
    pub body: StmtList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: Token,
    pub fields: Vec<VarDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    /// A type name token or the `nil` token.
    pub return_type: Token,
    pub name: Token,
    pub params: Vec<FunParam>,
    pub body: StmtList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunParam {
    pub param_type: Token,
    pub name: Token,
}

/// Right-recursive binary expression: `first [op rest]`.
///
/// `negated` is applied to the final value after the operator has been
/// evaluated, and only changes boolean values.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub first: Term,
    pub tail: Option<BinaryTail>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryTail {
    pub op: BinaryOperator,
    pub op_token: Token,
    pub rest: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Simple(RValue),
    /// A parenthesized sub-expression.
    Complex(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RValue {
    /// Int, double, bool, char or string literal, or `nil`.
    Literal(Token),
    /// `new T`, holding the type name.
    New(Token),
    Call { name: Token, args: Vec<Expr> },
    Path(Path),
    /// `neg expr`
    Neg(Box<Expr>),
}

/// A variable name followed by zero or more field names (`a.b.c`). Used both
/// as an r-value and as an assignment target.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub segments: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOperator {
    pub fn from_kind(kind: TokenKind) -> Option<Self> {
        let op = match kind {
            TokenKind::Plus => Self::Add,
            TokenKind::Minus => Self::Sub,
            TokenKind::Multiply => Self::Mul,
            TokenKind::Divide => Self::Div,
            TokenKind::Modulo => Self::Mod,
            TokenKind::And => Self::And,
            TokenKind::Or => Self::Or,
            TokenKind::Equal => Self::Equal,
            TokenKind::NotEqual => Self::NotEqual,
            TokenKind::Less => Self::Less,
            TokenKind::LessEqual => Self::LessEqual,
            TokenKind::Greater => Self::Greater,
            TokenKind::GreaterEqual => Self::GreaterEqual,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::And => "and",
            Self::Or => "or",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual)
    }

    /// Comparisons, which always produce `bool`.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::LessEqual
                | Self::Greater
                | Self::GreaterEqual
        )
    }
}

impl Expr {
    /// A lone term with no operator.
    pub fn term(first: Term) -> Self {
        Self {
            first,
            tail: None,
            negated: false,
        }
    }

    /// The token the expression starts with, used to position diagnostics.
    pub fn first_token(&self) -> &Token {
        self.first.first_token()
    }
}

impl Term {
    pub fn first_token(&self) -> &Token {
        match self {
            Term::Simple(rvalue) => rvalue.first_token(),
            Term::Complex(expr) => expr.first_token(),
        }
    }
}

impl RValue {
    pub fn first_token(&self) -> &Token {
        match self {
            RValue::Literal(token) | RValue::New(token) => token,
            RValue::Call { name, .. } => name,
            RValue::Path(path) => path.first(),
            RValue::Neg(expr) => expr.first_token(),
        }
    }
}

impl Path {
    pub fn first(&self) -> &Token {
        &self.segments[0]
    }
}
