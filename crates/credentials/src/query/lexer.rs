//! Query tokenizer.

use std::fmt;

use logos::{Lexer, Logos};

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    And,
    Or,
    Not,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::And => "&&",
            Self::Or => "||",
            Self::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuation {
    LParen,
    RParen,
    Comma,
}

impl Punctuation {
    pub fn as_char(self) -> char {
        match self {
            Self::LParen => '(',
            Self::RParen => ')',
            Self::Comma => ',',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Property names, type names and the keywords `instanceof`, `scope` and `in`.
    Identifier(String),
    /// Unescaped string literal value.
    StringLiteral(String),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    Operator(Operator),
    Punctuation(Punctuation),
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::StringLiteral(_) | Self::NumberLiteral(_) | Self::BooleanLiteral(_)
        )
    }
}

/// A token with its raw source text and byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.text)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("malformed number literal")]
    MalformedNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} near byte {offset}")]
pub struct LexError {
    pub offset: usize,
    pub reason: LexErrorKind,
    /// The offending source text.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(error = LexErrorKind)]
enum RawToken {
    #[token("==")]
    Equals,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Bool(bool),
    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*", |lex| lex.slice().to_string())]
    Identifier(String),
    #[token("\"", lex_string_literal)]
    String(String),
}

impl RawToken {
    fn into_kind(self) -> TokenKind {
        match self {
            Self::Equals => TokenKind::Operator(Operator::Equals),
            Self::AndAnd => TokenKind::Operator(Operator::And),
            Self::OrOr => TokenKind::Operator(Operator::Or),
            Self::Bang => TokenKind::Operator(Operator::Not),
            Self::LParen => TokenKind::Punctuation(Punctuation::LParen),
            Self::RParen => TokenKind::Punctuation(Punctuation::RParen),
            Self::Comma => TokenKind::Punctuation(Punctuation::Comma),
            Self::Bool(value) => TokenKind::BooleanLiteral(value),
            Self::Number(value) => TokenKind::NumberLiteral(value),
            Self::Identifier(name) => TokenKind::Identifier(name),
            Self::String(value) => TokenKind::StringLiteral(value),
        }
    }
}

/// Splits a query string into tokens.
///
/// Whitespace, newlines included, only separates tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = RawToken::lexer(input);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let raw = result.map_err(|reason| LexError {
            offset: span.start,
            reason,
            text: input[span.clone()].to_string(),
        })?;

        // `4foo` must not lex as a number followed by an identifier.
        if matches!(raw, RawToken::Number(_)) && input[span.end..].starts_with(continues_number) {
            let rest = &input[span.end..];
            let end = span.end + rest.find(|ch: char| !continues_number(ch)).unwrap_or(rest.len());
            return Err(LexError {
                offset: span.start,
                reason: LexErrorKind::MalformedNumber,
                text: input[span.start..end].to_string(),
            });
        }

        tokens.push(Token {
            kind: raw.into_kind(),
            text: input[span.clone()].to_string(),
            offset: span.start,
        });
    }

    Ok(tokens)
}

fn continues_number(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '$' | '.')
}

fn lex_string_literal(lex: &mut Lexer<RawToken>) -> Result<String, LexErrorKind> {
    let remainder = lex.remainder();
    let mut value = String::new();
    let mut chars = remainder.char_indices();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '"' => {
                lex.bump(index + 1);
                return Ok(value);
            }
            '\r' | '\n' => {
                lex.bump(index);
                return Err(LexErrorKind::UnterminatedString);
            }
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                let unescaped = match escaped {
                    '"' => Some('"'),
                    '\\' => Some('\\'),
                    '/' => Some('/'),
                    't' => Some('\t'),
                    'n' => Some('\n'),
                    'r' => Some('\r'),
                    'b' => Some('\u{8}'),
                    'f' => Some('\u{c}'),
                    'u' => {
                        let digits: String = chars.by_ref().take(4).map(|(_, ch)| ch).collect();
                        if digits.len() == 4 && digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
                            u32::from_str_radix(&digits, 16)
                                .ok()
                                .and_then(char::from_u32)
                        } else {
                            None
                        }
                    }
                    _ => None,
                };
                match unescaped {
                    Some(ch) => value.push(ch),
                    None => {
                        lex.bump(index + 1);
                        return Err(LexErrorKind::InvalidEscape);
                    }
                }
            }
            _ => value.push(ch),
        }
    }

    lex.bump(remainder.len());
    Err(LexErrorKind::UnterminatedString)
}
