use std::fmt;

use thiserror::Error;

use crate::lang::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Number(i64),
    Ident(String),
    Int,
    While,
    If,
    Else,
    Printf,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Bang,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Number(value) => return write!(f, "number {value}"),
            TokenKind::Ident(name) => return write!(f, "identifier '{name}'"),
            TokenKind::Int => "'int'",
            TokenKind::While => "'while'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::Printf => "'printf'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Semicolon => "';'",
            TokenKind::Assign => "'='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Less => "'<'",
            TokenKind::Greater => "'>'",
            TokenKind::LessEq => "'<='",
            TokenKind::GreaterEq => "'>='",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Bang => "'!'",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unexpected character '{ch}'")]
    UnexpectedChar {
        ch: char,
        span_start: usize,
        span_end: usize,
    },
    #[error("integer literal does not fit in 64 bits")]
    InvalidInt { span_start: usize, span_end: usize },
}

impl TokenizeError {
    pub fn span_range(&self) -> (usize, usize) {
        match self {
            TokenizeError::UnexpectedChar {
                span_start,
                span_end,
                ..
            }
            | TokenizeError::InvalidInt {
                span_start,
                span_end,
            } => (*span_start, *span_end),
        }
    }
}

fn keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "int" => TokenKind::Int,
        "while" => TokenKind::While,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "printf" => TokenKind::Printf,
        _ => return None,
    })
}

/// Match an operator or delimiter at the start of `rest`, longest first.
fn punctuator(rest: &str) -> Option<(TokenKind, usize)> {
    let two = match rest.get(..2) {
        Some("<=") => Some(TokenKind::LessEq),
        Some(">=") => Some(TokenKind::GreaterEq),
        Some("==") => Some(TokenKind::EqEq),
        Some("!=") => Some(TokenKind::NotEq),
        Some("&&") => Some(TokenKind::AndAnd),
        Some("||") => Some(TokenKind::OrOr),
        _ => None,
    };
    if let Some(kind) = two {
        return Some((kind, 2));
    }

    let one = match rest.as_bytes().first()? {
        b'(' => TokenKind::LParen,
        b')' => TokenKind::RParen,
        b'{' => TokenKind::LBrace,
        b'}' => TokenKind::RBrace,
        b';' => TokenKind::Semicolon,
        b'=' => TokenKind::Assign,
        b'+' => TokenKind::Plus,
        b'-' => TokenKind::Minus,
        b'*' => TokenKind::Star,
        b'/' => TokenKind::Slash,
        b'<' => TokenKind::Less,
        b'>' => TokenKind::Greater,
        b'!' => TokenKind::Bang,
        _ => return None,
    };
    Some((one, 1))
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        if b.is_ascii_whitespace() {
            idx += 1;
            continue;
        }

        if input[idx..].starts_with("//") {
            idx = input[idx..]
                .find('\n')
                .map(|rel| idx + rel)
                .unwrap_or(bytes.len());
            continue;
        }

        if let Some((kind, len)) = punctuator(&input[idx..]) {
            tokens.push(Token {
                kind,
                span: Span::new(idx, idx + len),
            });
            idx += len;
            continue;
        }

        let start = idx;
        if b.is_ascii_digit() {
            while idx < bytes.len() && bytes[idx].is_ascii_digit() {
                idx += 1;
            }
            let lexeme = &input[start..idx];
            let value = lexeme.parse::<i64>().map_err(|_| TokenizeError::InvalidInt {
                span_start: start,
                span_end: idx,
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                span: Span::new(start, idx),
            });
            continue;
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_') {
                idx += 1;
            }
            let lexeme = &input[start..idx];
            let kind = keyword(lexeme).unwrap_or_else(|| TokenKind::Ident(lexeme.to_string()));
            tokens.push(Token {
                kind,
                span: Span::new(start, idx),
            });
            continue;
        }

        let ch = input[idx..].chars().next().unwrap_or('?');
        return Err(TokenizeError::UnexpectedChar {
            ch,
            span_start: idx,
            span_end: idx + ch.len_utf8(),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(input.len(), input.len()),
    });

    Ok(tokens)
}
