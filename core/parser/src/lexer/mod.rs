//! The VibeScript lexer.
//!
//! A single forward pass over the source characters. Tokens carry spans;
//! the parser uses span lines to decide whether an operator continues the
//! previous expression or starts a new statement.

pub mod token;

pub use token::{Keyword, Token, TokenKind};

use crate::error::Error;
use vibe_ast::{Position, Span};

/// Character-level cursor with line/column tracking.
struct Cursor {
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
}

impl Cursor {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.chars.get(self.index).copied()?;
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

/// The lexer. Construct with [`Lexer::new`], consume with
/// [`Lexer::tokenize`].
pub struct Lexer {
    cursor: Cursor,
}

impl Lexer {
    /// Creates a lexer over the given source.
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    /// Lexes the entire source, ending with an [`TokenKind::Eof`] token.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] on malformed literals or unknown characters.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.cursor.position();
            let Some(ch) = self.cursor.peek() else {
                tokens.push(Token::new(TokenKind::Eof, Span::new(start, start)));
                return Ok(tokens);
            };

            let kind = match ch {
                c if c.is_ascii_digit() => self.lex_number()?,
                c if is_ident_start(c) => self.lex_word(),
                '@' => self.lex_variable(start)?,
                '"' | '\'' => self.lex_string(start)?,
                ':' => self.lex_colon(),
                _ => self.lex_operator(start)?,
            };
            let end = self.cursor.position();
            tokens.push(Token::new(kind, Span::new(start, end)));
        }
    }

    /// Skips whitespace (including newlines) and `#` comments.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.cursor.peek() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.cursor.next_char();
                }
                '#' => {
                    while let Some(c) = self.cursor.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.cursor.next_char();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, Error> {
        let start = self.cursor.position();
        let mut digits = String::new();
        let mut is_float = false;

        while let Some(ch) = self.cursor.peek() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.cursor.next_char();
            } else if ch == '_' {
                self.cursor.next_char();
            } else if ch == '.'
                && !is_float
                && self.cursor.peek_at(1).is_some_and(|c| c.is_ascii_digit())
            {
                // A second dot means a range literal, handled above by
                // requiring a digit after the dot.
                is_float = true;
                digits.push(ch);
                self.cursor.next_char();
            } else {
                break;
            }
        }

        if is_float {
            let value: f64 = fast_float2::parse(&digits)
                .map_err(|_| Error::general(format!("invalid float literal `{digits}`"), start))?;
            Ok(TokenKind::Float(value))
        } else {
            let value = digits
                .parse::<i64>()
                .map_err(|_| Error::general(format!("integer literal `{digits}` out of range"), start))?;
            Ok(TokenKind::Int(value))
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let first = self.cursor.peek().unwrap_or_default();
        let mut word = String::new();
        while let Some(ch) = self.cursor.peek() {
            if is_ident_continue(ch) {
                word.push(ch);
                self.cursor.next_char();
            } else {
                break;
            }
        }
        // Method-style names may end in `?` or `!`; `!=` stays an operator.
        if let Some(ch) = self.cursor.peek() {
            if ch == '?' || (ch == '!' && self.cursor.peek_at(1) != Some('=')) {
                word.push(ch);
                self.cursor.next_char();
            }
        }

        if let Some(kw) = Keyword::from_str(&word) {
            TokenKind::Keyword(kw)
        } else if first.is_ascii_uppercase() {
            TokenKind::Constant(word.into())
        } else {
            TokenKind::Identifier(word.into())
        }
    }

    fn lex_variable(&mut self, start: Position) -> Result<TokenKind, Error> {
        self.cursor.next_char();
        let class_var = self.cursor.peek() == Some('@');
        if class_var {
            self.cursor.next_char();
        }
        let mut name = String::new();
        while let Some(ch) = self.cursor.peek() {
            if is_ident_continue(ch) {
                name.push(ch);
                self.cursor.next_char();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(Error::general("expected a name after `@`", start));
        }
        Ok(if class_var {
            TokenKind::ClassVar(name.into())
        } else {
            TokenKind::IVar(name.into())
        })
    }

    fn lex_string(&mut self, start: Position) -> Result<TokenKind, Error> {
        let quote = self.cursor.next_char().unwrap_or('"');
        let mut value = String::new();
        loop {
            let Some(ch) = self.cursor.next_char() else {
                return Err(Error::general("unterminated string literal", start));
            };
            if ch == quote {
                return Ok(TokenKind::StringLit(value.into()));
            }
            if ch == '\\' && quote == '"' {
                let Some(esc) = self.cursor.next_char() else {
                    return Err(Error::general("unterminated string literal", start));
                };
                match esc {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    '\'' => value.push('\''),
                    '0' => value.push('\0'),
                    other => {
                        return Err(Error::general(
                            format!("unknown escape sequence `\\{other}`"),
                            start,
                        ));
                    }
                }
            } else if ch == '\\' && quote == '\'' {
                // Single-quoted strings only escape the quote itself.
                if self.cursor.peek() == Some('\'') {
                    self.cursor.next_char();
                    value.push('\'');
                } else {
                    value.push('\\');
                }
            } else {
                value.push(ch);
            }
        }
    }

    fn lex_colon(&mut self) -> TokenKind {
        self.cursor.next_char();
        // `:name` is a symbol literal when the colon touches a name start.
        if self.cursor.peek().is_some_and(is_ident_start) {
            let mut name = String::new();
            while let Some(ch) = self.cursor.peek() {
                if is_ident_continue(ch) {
                    name.push(ch);
                    self.cursor.next_char();
                } else {
                    break;
                }
            }
            if self.cursor.peek() == Some('?') {
                name.push('?');
                self.cursor.next_char();
            }
            TokenKind::Symbol(name.into())
        } else {
            TokenKind::Colon
        }
    }

    fn lex_operator(&mut self, start: Position) -> Result<TokenKind, Error> {
        let ch = self.cursor.next_char().unwrap_or_default();
        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => {
                if self.cursor.peek() == Some('.') {
                    self.cursor.next_char();
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            '=' => match self.cursor.peek() {
                Some('=') => {
                    self.cursor.next_char();
                    TokenKind::Eq
                }
                Some('>') => {
                    self.cursor.next_char();
                    TokenKind::FatArrow
                }
                _ => TokenKind::Assign,
            },
            '!' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.next_char();
                    TokenKind::NotEq
                } else {
                    TokenKind::Not
                }
            }
            '<' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.next_char();
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.next_char();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.cursor.peek() == Some('&') {
                    self.cursor.next_char();
                    TokenKind::AndAnd
                } else {
                    return Err(Error::general("unexpected character `&`", start));
                }
            }
            '|' => {
                if self.cursor.peek() == Some('|') {
                    self.cursor.next_char();
                    TokenKind::OrOr
                } else {
                    TokenKind::Pipe
                }
            }
            other => {
                return Err(Error::general(format!("unexpected character `{other}`"), start));
            }
        };
        Ok(kind)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .expect("lexing failed")
            .into_iter()
            .map(|t| t.kind().clone())
            .collect()
    }

    #[test]
    fn lexes_words_and_keywords() {
        assert_eq!(
            kinds("def total_price end"),
            vec![
                TokenKind::Keyword(Keyword::Def),
                TokenKind::Identifier("total_price".into()),
                TokenKind::Keyword(Keyword::End),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_predicate_names() {
        assert_eq!(
            kinds("empty? x != y"),
            vec![
                TokenKind::Identifier("empty?".into()),
                TokenKind::Identifier("x".into()),
                TokenKind::NotEq,
                TokenKind::Identifier("y".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_numbers_and_ranges() {
        assert_eq!(
            kinds("1_000 3.25 1..5"),
            vec![
                TokenKind::Int(1000),
                TokenKind::Float(3.25),
                TokenKind::Int(1),
                TokenKind::DotDot,
                TokenKind::Int(5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_symbols_and_labels() {
        assert_eq!(
            kinds(":name name: 1"),
            vec![
                TokenKind::Symbol("name".into()),
                TokenKind::Identifier("name".into()),
                TokenKind::Colon,
                TokenKind::Int(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_ivars_and_class_vars() {
        assert_eq!(
            kinds("@name @@count"),
            vec![
                TokenKind::IVar("name".into()),
                TokenKind::ClassVar("count".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\nb" 'c\d'"#),
            vec![
                TokenKind::StringLit("a\nb".into()),
                TokenKind::StringLit("c\\d".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 # one\n2"),
            vec![TokenKind::Int(1), TokenKind::Int(2), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_errors() {
        assert!(Lexer::new("\"abc").tokenize().is_err());
    }
}
