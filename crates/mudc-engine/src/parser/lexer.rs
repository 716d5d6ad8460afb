//! Lexer for the mud world-definition language.
//!
//! Built on the logos library: converts source text into a stream of
//! tokens with precise source location information. Raw passthrough
//! lines (`>`-prefixed) survive lexing verbatim so the compiler can
//! forward them to the raw-output channel untouched.

use crate::parser::token::{Span, Token};
use logos::Logos;
use thiserror::Error;

/// Logos-based token enum for lexing.
///
/// Used internally for efficient tokenization and converted to the
/// public `Token` enum afterwards.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    // Whitespace (skip)
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    #[regex(r"/\*", lex_block_comment)]
    BlockComment,

    // Keywords (must come before identifiers)
    #[token("include")]
    Include,

    #[token("define")]
    Define,

    #[token("enddefine")]
    Enddefine,

    #[token("use")]
    Use,

    #[token("and")]
    And,

    #[token("or")]
    Or,

    #[token("xor")]
    Xor,

    // Reference-cast operators. Single capital letters, so they need
    // an explicit priority over the identifier rule.
    #[token("A", priority = 10)]
    CastAvatar,

    #[token("O", priority = 10)]
    CastObject,

    #[token("R", priority = 10)]
    CastRegion,

    // Field types
    #[token("avaid")]
    Avaid,

    #[token("bin15")]
    Bin15,

    #[token("bin31")]
    Bin31,

    #[token("bit")]
    Bit,

    #[token("byte")]
    Byte,

    #[token("character")]
    Character,

    #[token("entity")]
    Entity,

    #[token("fatword")]
    Fatword,

    #[token("objid")]
    Objid,

    #[token("regid")]
    Regid,

    #[token("varstring")]
    Varstring,

    #[token("words")]
    Words,

    // Identifiers (must come after keywords)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),

    // Numbers
    #[regex(r"0x[0-9a-fA-F]+", parse_hex)]
    #[regex(r"0o[0-7]+", parse_octal)]
    #[regex(r"[0-9]+", parse_int)]
    Number(i64),

    // Strings
    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    Str(String),

    // Bit strings: a single-quoted run of 0/1 digits, MSB first
    #[regex(r"'[01]+'", parse_bitstring)]
    BitString((u32, u8)),

    // Raw passthrough lines, only valid at the start of a line
    #[regex(r">[^\n]*", lex_rawline)]
    Rawline(String),

    // Operators
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("!")]
    Bang,

    // Punctuation
    #[token("=")]
    Equal,

    #[token("#")]
    Hash,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,
}

fn lex_block_comment(lex: &mut logos::Lexer<LogosToken>) -> logos::FilterResult<(), ()> {
    // "/*" already consumed, find the matching "*/" (comments do not nest)
    let remainder = lex.remainder();
    if let Some(end) = remainder.find("*/") {
        lex.bump(end + 2);
        logos::FilterResult::Skip
    } else {
        lex.bump(remainder.len());
        logos::FilterResult::Error(())
    }
}

fn lex_rawline(lex: &mut logos::Lexer<LogosToken>) -> Result<String, ()> {
    // Raw lines are whole lines; a `>` after other tokens is not one.
    let start = lex.span().start;
    if start > 0 && lex.source().as_bytes()[start - 1] != b'\n' {
        return Err(());
    }
    Ok(lex.slice()[1..].to_string())
}

fn parse_hex(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    i64::from_str_radix(&lex.slice()[2..], 16).ok()
}

fn parse_octal(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    i64::from_str_radix(&lex.slice()[2..], 8).ok()
}

fn parse_int(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    lex.slice().parse().ok()
}

fn parse_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let s = lex.slice();
    Some(unescape_string(&s[1..s.len() - 1]))
}

fn parse_bitstring(lex: &mut logos::Lexer<LogosToken>) -> Option<(u32, u8)> {
    let s = lex.slice();
    let digits = &s[1..s.len() - 1];
    if digits.len() > 32 {
        return None;
    }
    let bits = u32::from_str_radix(digits, 2).ok()?;
    Some((bits, digits.len() as u8))
}

fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('0') => result.push('\0'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => {
                    // Unknown escape: keep it literally
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character sequence '{text}'")]
    UnexpectedCharacter { text: String, span: Span },

    #[error("bit string '{text}' is wider than 32 bits")]
    BitStringTooWide { text: String, span: Span },

    #[error("number '{text}' does not fit in 64 bits")]
    InvalidNumber { text: String, span: Span },

    #[error("unterminated comment")]
    UnterminatedComment { span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::BitStringTooWide { span, .. }
            | LexError::InvalidNumber { span, .. }
            | LexError::UnterminatedComment { span } => *span,
        }
    }
}

/// Streaming lexer over one source text.
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenize the whole source, appending a final `Eof` token.
    ///
    /// All lexical errors are collected; the token stream is only
    /// returned when the source is lexically clean.
    pub fn tokenize(self) -> Result<Vec<(Token, Span)>, Vec<LexError>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        // Incremental line/column tracking over byte ranges
        let mut line = 1u32;
        let mut column = 1u32;
        let mut cursor = 0usize;
        let mut locate = |start: usize| -> (u32, u32) {
            for c in self.source[cursor..start].chars() {
                if c == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }
            cursor = start;
            (line, column)
        };

        let mut lexer = LogosToken::lexer(self.source);
        while let Some(result) = lexer.next() {
            let range = lexer.span();
            let (line, column) = locate(range.start);
            let span = Span::new(range.start, range.end, line, column);
            let text = lexer.slice();
            match result {
                Ok(tok) => tokens.push((convert(tok), span)),
                Err(()) => {
                    if text.starts_with("/*") {
                        errors.push(LexError::UnterminatedComment { span });
                    } else if text.starts_with('\'') {
                        errors.push(LexError::BitStringTooWide {
                            text: text.to_string(),
                            span,
                        });
                    } else if text.starts_with(|c: char| c.is_ascii_digit()) {
                        errors.push(LexError::InvalidNumber {
                            text: text.to_string(),
                            span,
                        });
                    } else {
                        errors.push(LexError::UnexpectedCharacter {
                            text: text.to_string(),
                            span,
                        });
                    }
                }
            }
        }

        let end = self.source.len();
        let (line, column) = locate(end);
        tokens.push((Token::Eof, Span::new(end, end, line, column)));

        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(errors)
        }
    }
}

fn convert(tok: LogosToken) -> Token {
    match tok {
        LogosToken::Whitespace | LogosToken::BlockComment => unreachable!("skipped by logos"),
        LogosToken::Include => Token::Include,
        LogosToken::Define => Token::Define,
        LogosToken::Enddefine => Token::Enddefine,
        LogosToken::Use => Token::Use,
        LogosToken::And => Token::And,
        LogosToken::Or => Token::Or,
        LogosToken::Xor => Token::Xor,
        LogosToken::CastAvatar => Token::CastAvatar,
        LogosToken::CastObject => Token::CastObject,
        LogosToken::CastRegion => Token::CastRegion,
        LogosToken::Avaid => Token::Avaid,
        LogosToken::Bin15 => Token::Bin15,
        LogosToken::Bin31 => Token::Bin31,
        LogosToken::Bit => Token::Bit,
        LogosToken::Byte => Token::Byte,
        LogosToken::Character => Token::Character,
        LogosToken::Entity => Token::Entity,
        LogosToken::Fatword => Token::Fatword,
        LogosToken::Objid => Token::Objid,
        LogosToken::Regid => Token::Regid,
        LogosToken::Varstring => Token::Varstring,
        LogosToken::Words => Token::Words,
        LogosToken::Name(name) => Token::Name(name),
        LogosToken::Number(n) => Token::Number(n),
        LogosToken::Str(s) => Token::Str(s),
        LogosToken::BitString((bits, width)) => Token::BitString { bits, width },
        LogosToken::Rawline(line) => Token::Rawline(line),
        LogosToken::Plus => Token::Plus,
        LogosToken::Minus => Token::Minus,
        LogosToken::Star => Token::Star,
        LogosToken::Slash => Token::Slash,
        LogosToken::Percent => Token::Percent,
        LogosToken::Bang => Token::Bang,
        LogosToken::Equal => Token::Equal,
        LogosToken::Hash => Token::Hash,
        LogosToken::Colon => Token::Colon,
        LogosToken::Comma => Token::Comma,
        LogosToken::LeftParen => Token::LeftParen,
        LogosToken::RightParen => Token::RightParen,
        LogosToken::LeftBrace => Token::LeftBrace,
        LogosToken::RightBrace => Token::RightBrace,
    }
}
