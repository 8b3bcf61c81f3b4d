//! Lexer for the configuration language.

use crate::diag::{Diagnostic, Diagnostics, Span};
use crate::value::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Number(Number),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Assign,
    Comma,
    Dot,
    Newline,
}

impl Token {
    /// Short description used in "expected X, found Y" diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Ident(_) => "identifier",
            Token::Str(_) => "string",
            Token::Number(_) => "number",
            Token::LBrace => "\"{\"",
            Token::RBrace => "\"}\"",
            Token::LBracket => "\"[\"",
            Token::RBracket => "\"]\"",
            Token::LParen => "\"(\"",
            Token::RParen => "\")\"",
            Token::Assign => "\"=\"",
            Token::Comma => "\",\"",
            Token::Dot => "\".\"",
            Token::Newline => "newline",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenize `source`. Unknown characters and unterminated strings are
/// reported as diagnostics; lexing continues so one pass reports as much
/// as possible.
pub fn lex(source: &str) -> (Vec<SpannedToken>, Diagnostics) {
    let mut tokens = Vec::new();
    let mut diags = Diagnostics::new();
    let bytes = source.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let ch = bytes[pos];

        match ch {
            b' ' | b'\t' | b'\r' => {
                pos += 1;
            }
            b'\n' => {
                pos += 1;
                // Collapse runs of blank lines into one separator.
                if !matches!(
                    tokens.last(),
                    Some(SpannedToken {
                        token: Token::Newline,
                        ..
                    }) | None
                ) {
                    tokens.push(SpannedToken {
                        token: Token::Newline,
                        span: Span::new(start, pos),
                    });
                }
            }
            b'#' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            b'{' => push_simple(&mut tokens, Token::LBrace, &mut pos, start),
            b'}' => push_simple(&mut tokens, Token::RBrace, &mut pos, start),
            b'[' => push_simple(&mut tokens, Token::LBracket, &mut pos, start),
            b']' => push_simple(&mut tokens, Token::RBracket, &mut pos, start),
            b'(' => push_simple(&mut tokens, Token::LParen, &mut pos, start),
            b')' => push_simple(&mut tokens, Token::RParen, &mut pos, start),
            b'=' => push_simple(&mut tokens, Token::Assign, &mut pos, start),
            b',' => push_simple(&mut tokens, Token::Comma, &mut pos, start),
            b'.' => push_simple(&mut tokens, Token::Dot, &mut pos, start),
            b'"' => {
                let (token, end) = lex_string(source, pos, &mut diags);
                if let Some(token) = token {
                    tokens.push(SpannedToken {
                        token,
                        span: Span::new(start, end),
                    });
                }
                pos = end;
            }
            b'-' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                let (token, end) = lex_number(source, pos);
                tokens.push(SpannedToken {
                    token,
                    span: Span::new(start, end),
                });
                pos = end;
            }
            _ if ch.is_ascii_digit() => {
                let (token, end) = lex_number(source, pos);
                tokens.push(SpannedToken {
                    token,
                    span: Span::new(start, end),
                });
                pos = end;
            }
            _ if ch.is_ascii_alphabetic() || ch == b'_' => {
                let mut end = pos + 1;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                tokens.push(SpannedToken {
                    token: Token::Ident(source[pos..end].to_string()),
                    span: Span::new(start, end),
                });
                pos = end;
            }
            _ => {
                let end = next_char_boundary(source, pos);
                diags.push(Diagnostic::error(
                    "Invalid character",
                    format!("unexpected character {:?}", &source[pos..end]),
                    Span::new(start, end),
                ));
                pos = end;
            }
        }
    }

    (tokens, diags)
}

fn push_simple(tokens: &mut Vec<SpannedToken>, token: Token, pos: &mut usize, start: usize) {
    *pos += 1;
    tokens.push(SpannedToken {
        token,
        span: Span::new(start, *pos),
    });
}

fn lex_string(source: &str, start: usize, diags: &mut Diagnostics) -> (Option<Token>, usize) {
    let bytes = source.as_bytes();
    let mut out = String::new();
    let mut pos = start + 1;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => return (Some(Token::Str(out)), pos + 1),
            b'\n' => break,
            b'\\' => {
                let escape = bytes.get(pos + 1).copied();
                match escape {
                    Some(b'"') => out.push('"'),
                    Some(b'\\') => out.push('\\'),
                    Some(b'n') => out.push('\n'),
                    Some(b't') => out.push('\t'),
                    Some(b'r') => out.push('\r'),
                    _ => {
                        diags.push(Diagnostic::error(
                            "Invalid escape",
                            format!(
                                "unsupported escape sequence \"\\{}\"",
                                escape.map(|b| b as char).unwrap_or(' ')
                            ),
                            Span::new(pos, (pos + 2).min(bytes.len())),
                        ));
                    }
                }
                pos += 2;
            }
            _ => {
                let end = next_char_boundary(source, pos);
                out.push_str(&source[pos..end]);
                pos = end;
            }
        }
    }

    diags.push(Diagnostic::error(
        "Unterminated string",
        "the string literal is missing its closing quote",
        Span::new(start, pos),
    ));
    (None, pos)
}

fn lex_number(source: &str, start: usize) -> (Token, usize) {
    let bytes = source.as_bytes();
    let mut pos = start;
    if bytes[pos] == b'-' {
        pos += 1;
    }
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }

    let mut is_float = false;
    if pos < bytes.len() && bytes[pos] == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)
    {
        is_float = true;
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }

    let text = &source[start..pos];
    let token = if is_float {
        // Digits-and-dot input always parses.
        Token::Number(Number::Float(text.parse().unwrap_or(0.0)))
    } else {
        match text.parse::<i64>() {
            Ok(n) => Token::Number(Number::Integer(n)),
            Err(_) => Token::Number(Number::Float(text.parse().unwrap_or(0.0))),
        }
    };
    (token, pos)
}

fn next_char_boundary(source: &str, pos: usize) -> usize {
    let mut end = pos + 1;
    while end < source.len() && !source.is_char_boundary(end) {
        end += 1;
    }
    end
}
