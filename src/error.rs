use std::fmt;

use thiserror::Error;

use crate::interpreter::RuntimeError;
use crate::parser::ParseError;
use crate::typechecker::TypeError;

/// The stage that rejected a program. Scanner errors count as syntax errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Syntax,
    Type,
    Runtime,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Syntax => f.write_str("Syntax"),
            Phase::Type => f.write_str("Type"),
            Phase::Runtime => f.write_str("Runtime"),
        }
    }
}

/// Any failure of the parse, check and run pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Parse(#[from] ParseError),
    #[error("Type error: {0}")]
    Type(#[from] TypeError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl Error {
    pub fn phase(&self) -> Phase {
        match self {
            Error::Parse(_) => Phase::Syntax,
            Error::Type(_) => Phase::Type,
            Error::Runtime(_) => Phase::Runtime,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Error::Parse(ParseError::Lex(error)) => error.line(),
            Error::Parse(ParseError::Syntax(error)) => error.line,
            Error::Type(error) => error.line,
            Error::Runtime(error) => error.line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Error::Parse(ParseError::Lex(error)) => error.column(),
            Error::Parse(ParseError::Syntax(error)) => error.column,
            Error::Type(error) => error.column,
            Error::Runtime(error) => error.column,
        }
    }

    /// The description without the phase tag or the position.
    pub fn message(&self) -> String {
        let rendered = match self {
            Error::Parse(error) => error.to_string(),
            Error::Type(error) => error.kind.to_string(),
            Error::Runtime(error) => error.kind.to_string(),
        };
        let position = format!(" at line {}, column {}", self.line(), self.column());
        match rendered.strip_suffix(&position) {
            Some(message) => message.to_string(),
            None => rendered,
        }
    }
}
