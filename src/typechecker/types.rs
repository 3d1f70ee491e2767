use std::fmt;

use rustc_hash::FxHashMap;

use crate::token::{Token, TokenKind};

/// Static type of an expression or binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Int,
    Double,
    Bool,
    Char,
    String,
    /// Type of the `nil` literal; compatible with every declared type.
    Nil,
    /// A user-declared record type.
    Named(String),
}

impl Ty {
    /// The type a primitive type keyword names.
    pub fn primitive(kind: TokenKind) -> Option<Self> {
        let ty = match kind {
            TokenKind::IntType => Self::Int,
            TokenKind::DoubleType => Self::Double,
            TokenKind::BoolType => Self::Bool,
            TokenKind::CharType => Self::Char,
            TokenKind::StringType => Self::String,
            _ => return None,
        };
        Some(ty)
    }

    pub fn of_literal(token: &Token) -> Option<Self> {
        let ty = match token.kind {
            TokenKind::IntVal => Self::Int,
            TokenKind::DoubleVal => Self::Double,
            TokenKind::BoolVal => Self::Bool,
            TokenKind::CharVal => Self::Char,
            TokenKind::StringVal => Self::String,
            TokenKind::Nil => Self::Nil,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Double)
    }

    /// Whether a value of type `self` may be stored where `expected` is
    /// required.
    pub fn fits(&self, expected: &Ty) -> bool {
        self.is_nil() || self == expected
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("int"),
            Self::Double => f.write_str("double"),
            Self::Bool => f.write_str("bool"),
            Self::Char => f.write_str("char"),
            Self::String => f.write_str("string"),
            Self::Nil => f.write_str("nil"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Ty>,
    pub ret: Ty,
}

/// What a name means to the checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Var(Ty),
    Struct(FxHashMap<String, Ty>),
    Function(Signature),
}
