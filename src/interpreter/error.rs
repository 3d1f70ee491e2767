use thiserror::Error;

use crate::token::Token;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("index {index} out of bounds for string of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("nil value passed to '{function}'")]
    NilArgument { function: String },
    #[error("invalid argument of type {found} to '{function}'")]
    InvalidArgument {
        function: String,
        found: &'static str,
    },
    #[error("'{0}' is not a valid int")]
    InvalidInteger(String),
    #[error("'{0}' is not a valid double")]
    InvalidDouble(String),
    #[error("integer overflow in '{op}'")]
    IntegerOverflow { op: String },
    #[error("undefined name '{0}'")]
    UndefinedName(String),
    #[error("'{0}' does not hold a value")]
    NotAValue(String),
    #[error("'{0}' is not a function")]
    NotCallable(String),
    #[error("'{0}' is not a type")]
    NotAType(String),
    #[error("object has no field '{0}'")]
    UnknownField(String),
    #[error("nil dereference of '{0}'")]
    NilDereference(String),
    #[error("'{0}' is not an object")]
    NotAnObject(String),
    #[error("operands of '{op}' have incompatible types {left} and {right}")]
    OperandMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },
    #[error("invalid operand of type {found} for '{op}'")]
    InvalidOperand { op: String, found: &'static str },
    #[error("'{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("call depth exceeded {limit}")]
    CallDepthExceeded { limit: usize },
    #[error("program must return an int, got {0}")]
    NonIntegerExit(&'static str),
    #[error("I/O failure: {0}")]
    Io(String),
}

/// A run-time fault, positioned at the token being evaluated when it hit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} at line {line}, column {column}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: usize,
    pub column: usize,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, token: &Token) -> Self {
        Self {
            kind,
            line: token.line(),
            column: token.column(),
        }
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
