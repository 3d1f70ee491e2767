use std::fmt;

/// Source location of a token. `line` and `column` are 1-based and point at
/// the first character; `start`/`end` are byte offsets into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    IntVal,
    DoubleVal,
    BoolVal,
    CharVal,
    StringVal,
    Id,

    // Primitive type names
    IntType,
    DoubleType,
    BoolType,
    CharType,
    StringType,

    // Keywords
    Type,
    Fun,
    Var,
    Set,
    If,
    Then,
    Elif,
    Else,
    While,
    For,
    To,
    Do,
    End,
    Return,
    New,
    Nil,
    Neg,
    Not,
    And,
    Or,

    // Operators
    Plus,         // +
    Minus,        // -
    Multiply,     // *
    Divide,       // /
    Modulo,       // %
    Equal,        // =
    NotEqual,     // !=
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=
    Assign,       // :=

    // Delimiters
    Comma,  // ,
    Dot,    // .
    LParen, // (
    RParen, // )

    Eos,
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "int" => Self::IntType,
            "double" => Self::DoubleType,
            "bool" => Self::BoolType,
            "char" => Self::CharType,
            "string" => Self::StringType,
            "type" => Self::Type,
            "fun" => Self::Fun,
            "var" => Self::Var,
            "set" => Self::Set,
            "if" => Self::If,
            "then" => Self::Then,
            "elif" => Self::Elif,
            "else" => Self::Else,
            "while" => Self::While,
            "for" => Self::For,
            "to" => Self::To,
            "do" => Self::Do,
            "end" => Self::End,
            "return" => Self::Return,
            "new" => Self::New,
            "nil" => Self::Nil,
            "neg" => Self::Neg,
            "not" => Self::Not,
            "and" => Self::And,
            "or" => Self::Or,
            "true" | "false" => Self::BoolVal,
            _ => return None,
        };
        Some(kind)
    }

    /// `int`, `double`, `bool`, `char` or `string`.
    pub fn is_primitive_type(self) -> bool {
        matches!(
            self,
            Self::IntType | Self::DoubleType | Self::BoolType | Self::CharType | Self::StringType
        )
    }

    /// Anything that may name a type in a declaration, including user types.
    pub fn is_type_name(self) -> bool {
        self.is_primitive_type() || self == Self::Id
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::IntVal | Self::DoubleVal | Self::BoolVal | Self::CharVal | Self::StringVal
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::IntVal => "integer literal",
            Self::DoubleVal => "double literal",
            Self::BoolVal => "boolean literal",
            Self::CharVal => "char literal",
            Self::StringVal => "string literal",
            Self::Id => "identifier",
            Self::IntType => "'int'",
            Self::DoubleType => "'double'",
            Self::BoolType => "'bool'",
            Self::CharType => "'char'",
            Self::StringType => "'string'",
            Self::Type => "'type'",
            Self::Fun => "'fun'",
            Self::Var => "'var'",
            Self::Set => "'set'",
            Self::If => "'if'",
            Self::Then => "'then'",
            Self::Elif => "'elif'",
            Self::Else => "'else'",
            Self::While => "'while'",
            Self::For => "'for'",
            Self::To => "'to'",
            Self::Do => "'do'",
            Self::End => "'end'",
            Self::Return => "'return'",
            Self::New => "'new'",
            Self::Nil => "'nil'",
            Self::Neg => "'neg'",
            Self::Not => "'not'",
            Self::And => "'and'",
            Self::Or => "'or'",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Multiply => "'*'",
            Self::Divide => "'/'",
            Self::Modulo => "'%'",
            Self::Equal => "'='",
            Self::NotEqual => "'!='",
            Self::Less => "'<'",
            Self::LessEqual => "'<='",
            Self::Greater => "'>'",
            Self::GreaterEqual => "'>='",
            Self::Assign => "':='",
            Self::Comma => "','",
            Self::Dot => "'.'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::Eos => "end of input",
        };
        f.write_str(text)
    }
}

/// A scanned token. The lexeme of a string or char literal is its content
/// without the surrounding quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }

    pub fn column(&self) -> usize {
        self.span.column
    }
}
