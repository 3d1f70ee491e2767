use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected symbol '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("leading zero in '{literal}' at line {line}, column {column}")]
    LeadingZero {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("missing digit in float '{literal}' at line {line}, column {column}")]
    MissingFractionDigit {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("invalid integer literal '{literal}' at line {line}, column {column}")]
    InvalidIntegerLiteral {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("invalid char literal at line {line}, column {column}")]
    InvalidChar { line: usize, column: usize },
    #[error("unterminated string literal at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            Self::UnexpectedCharacter { line, .. }
            | Self::LeadingZero { line, .. }
            | Self::MissingFractionDigit { line, .. }
            | Self::InvalidIntegerLiteral { line, .. }
            | Self::InvalidChar { line, .. }
            | Self::UnterminatedString { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Self::UnexpectedCharacter { column, .. }
            | Self::LeadingZero { column, .. }
            | Self::MissingFractionDigit { column, .. }
            | Self::InvalidIntegerLiteral { column, .. }
            | Self::InvalidChar { column, .. }
            | Self::UnterminatedString { column, .. } => *column,
        }
    }
}

pub type LexResult<T> = Result<T, LexError>;
