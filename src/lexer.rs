use std::{iter::Peekable, str::CharIndices};

use crate::token::{Span, Token, TokenKind};

mod error;

pub use error::{LexError, LexResult};

/// Pull-based token stream consumed by the parser.
///
/// The stream is terminated by an [`TokenKind::Eos`] token; asking for more
/// tokens after that keeps returning `Eos`.
pub trait TokenSource {
    fn next_token(&mut self) -> LexResult<Token>;
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;
        let Some(&(start, ch)) = self.chars.peek() else {
            let end = self.input.len();
            return Ok(Token::new(
                TokenKind::Eos,
                "",
                Span {
                    start: end,
                    end,
                    line,
                    column,
                },
            ));
        };

        match ch {
            ',' => Ok(self.symbol(TokenKind::Comma, start, line, column)),
            '.' => Ok(self.symbol(TokenKind::Dot, start, line, column)),
            '+' => Ok(self.symbol(TokenKind::Plus, start, line, column)),
            '-' => Ok(self.symbol(TokenKind::Minus, start, line, column)),
            '*' => Ok(self.symbol(TokenKind::Multiply, start, line, column)),
            '/' => Ok(self.symbol(TokenKind::Divide, start, line, column)),
            '%' => Ok(self.symbol(TokenKind::Modulo, start, line, column)),
            '=' => Ok(self.symbol(TokenKind::Equal, start, line, column)),
            '(' => Ok(self.symbol(TokenKind::LParen, start, line, column)),
            ')' => Ok(self.symbol(TokenKind::RParen, start, line, column)),
            '<' => Ok(self.symbol_or_equal(
                TokenKind::Less,
                TokenKind::LessEqual,
                start,
                line,
                column,
            )),
            '>' => Ok(self.symbol_or_equal(
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                start,
                line,
                column,
            )),
            '!' => Ok(self.symbol_or_equal(
                TokenKind::Not,
                TokenKind::NotEqual,
                start,
                line,
                column,
            )),
            ':' => {
                self.advance_char();
                if self.peek_char() == Some('=') {
                    self.advance_char();
                    Ok(self.token_from(TokenKind::Assign, start, line, column))
                } else {
                    Err(LexError::UnexpectedCharacter {
                        character: ':',
                        line,
                        column,
                    })
                }
            }
            '\'' => self.read_char(start, line, column),
            '"' => self.read_string(start, line, column),
            c if c.is_ascii_digit() => self.read_number(start, line, column),
            c if c.is_alphabetic() => Ok(self.read_word(start, line, column)),
            _ => Err(LexError::UnexpectedCharacter {
                character: ch,
                line,
                column,
            }),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance_char();
            } else if c == '#' {
                while let Some(c) = self.peek_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance_char();
                }
            } else {
                break;
            }
        }
    }

    fn symbol(&mut self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token {
        self.advance_char();
        self.token_from(kind, start, line, column)
    }

    fn symbol_or_equal(
        &mut self,
        single: TokenKind,
        with_equal: TokenKind,
        start: usize,
        line: usize,
        column: usize,
    ) -> Token {
        self.advance_char();
        if self.peek_char() == Some('=') {
            self.advance_char();
            self.token_from(with_equal, start, line, column)
        } else {
            self.token_from(single, start, line, column)
        }
    }

    fn read_word(&mut self, start: usize, line: usize, column: usize) -> Token {
        self.advance_char(); // Consume first letter
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let word = &self.input[start..end];
        let kind = TokenKind::keyword(word).unwrap_or(TokenKind::Id);
        self.token_from(kind, start, line, column)
    }

    fn read_number(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token> {
        self.consume_digits();

        let mut kind = TokenKind::IntVal;
        if self.peek_char() == Some('.') {
            kind = TokenKind::DoubleVal;
            self.advance_char();
            if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(LexError::MissingFractionDigit {
                    literal: self.input[start..self.current_index()].to_string(),
                    line,
                    column,
                });
            }
            self.consume_digits();
        }

        if let Some(c) = self.peek_char()
            && (c.is_alphabetic() || c == '_')
        {
            return Err(LexError::UnexpectedCharacter {
                character: c,
                line: self.line,
                column: self.column,
            });
        }

        let literal = &self.input[start..self.current_index()];
        let integer_part = literal.split_once('.').map_or(literal, |(whole, _)| whole);
        if integer_part.len() > 1 && integer_part.starts_with('0') {
            return Err(LexError::LeadingZero {
                literal: literal.to_string(),
                line,
                column,
            });
        }
        if kind == TokenKind::IntVal && literal.parse::<i64>().is_err() {
            return Err(LexError::InvalidIntegerLiteral {
                literal: literal.to_string(),
                line,
                column,
            });
        }

        Ok(self.token_from(kind, start, line, column))
    }

    fn read_char(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token> {
        self.advance_char(); // Consume opening quote
        let value = match self.advance_char() {
            Some((_, c)) if c != '\'' && c != '\n' => c,
            _ => return Err(LexError::InvalidChar { line, column }),
        };
        if self.peek_char() != Some('\'') {
            return Err(LexError::InvalidChar { line, column });
        }
        self.advance_char(); // Consume closing quote
        Ok(Token::new(
            TokenKind::CharVal,
            value.to_string(),
            self.span_from(start, line, column),
        ))
    }

    fn read_string(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token> {
        self.advance_char(); // Consume opening quote
        let content_start = start + 1;
        while let Some(&(idx, c)) = self.chars.peek() {
            if c == '"' {
                let content = &self.input[content_start..idx];
                self.advance_char(); // Consume closing quote
                return Ok(Token::new(
                    TokenKind::StringVal,
                    content,
                    self.span_from(start, line, column),
                ));
            }
            if c == '\n' {
                break;
            }
            self.advance_char();
        }
        Err(LexError::UnterminatedString { line, column })
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance_char();
        }
    }

    fn token_from(&mut self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token {
        let span = self.span_from(start, line, column);
        Token::new(kind, &self.input[span.start..span.end], span)
    }

    fn span_from(&mut self, start: usize, line: usize, column: usize) -> Span {
        Span {
            start,
            end: self.current_index(),
            line,
            column,
        }
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

impl TokenSource for Lexer<'_> {
    fn next_token(&mut self) -> LexResult<Token> {
        Lexer::next_token(self)
    }
}

/// Replays tokens that were scanned up front.
impl TokenSource for std::vec::IntoIter<Token> {
    fn next_token(&mut self) -> LexResult<Token> {
        Ok(self
            .next()
            .unwrap_or_else(|| Token::new(TokenKind::Eos, "", Span::default())))
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eos = token.kind == TokenKind::Eos;
        tokens.push(token);
        if is_eos {
            break;
        }
    }
    Ok(tokens)
}
