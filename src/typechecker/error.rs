use thiserror::Error;

use crate::token::Token;

use super::Ty;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeErrorKind {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("'{0}' is a type or function name, not a variable")]
    NotAVariable(String),
    #[error("undefined function '{0}'")]
    UndefinedFunction(String),
    #[error("'{0}' is not a function")]
    NotCallable(String),
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("invalid member access on non-structured type {0}")]
    NotAStruct(Ty),
    #[error("type {ty} has no field '{field}'")]
    UnknownField { ty: Ty, field: String },
    #[error("mismatched types: expected {expected}, found {found}")]
    Mismatch { expected: Ty, found: Ty },
    #[error("cannot infer the type of '{0}' from nil")]
    UntypedNil(String),
    #[error("'{0}' has already been declared")]
    Redeclaration(String),
    #[error("return type mismatch: expected {expected}, found {found}")]
    ReturnMismatch { expected: Ty, found: Ty },
    #[error("condition must be bool, found {0}")]
    NonBoolCondition(Ty),
    #[error("loop bound must be int, found {0}")]
    NonIntBound(Ty),
    #[error("mismatched types in expression: {left} {op} {right}")]
    OperandMismatch { op: String, left: Ty, right: Ty },
    #[error("invalid operator '{op}' for {ty}")]
    InvalidOperator { op: String, ty: Ty },
    #[error("invalid use of modulo on {left} and {right}")]
    InvalidModulo { left: Ty, right: Ty },
    #[error("'neg' requires int or double, found {0}")]
    InvalidNegation(Ty),
    #[error("not enough arguments to '{name}': expected {expected}, found {found}")]
    NotEnoughArguments {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("too many arguments to '{name}': expected {expected}, found {found}")]
    TooManyArguments {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("argument {position} of '{name}' expects {expected}, found {found}")]
    ArgumentMismatch {
        name: String,
        position: usize,
        expected: Ty,
        found: Ty,
    },
}

/// A static error, positioned at the token it was detected on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} at line {line}, column {column}")]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub line: usize,
    pub column: usize,
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, token: &Token) -> Self {
        Self {
            kind,
            line: token.line(),
            column: token.column(),
        }
    }
}

pub type TypeResult<T> = Result<T, TypeError>;
