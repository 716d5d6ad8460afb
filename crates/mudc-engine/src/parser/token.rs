//! Token definitions for the mud world-definition language.
//!
//! This module defines all tokens that can appear in a `.mud` source file:
//! keywords, field-type names, operators, literals, and raw passthrough lines.

use std::fmt;

/// A token in the mud world-definition language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Include,
    Define,
    Enddefine,
    Use,

    // Word-spelled binary operators
    And,
    Or,
    Xor,

    // Reference-cast operators: reinterpret an integer as an avatar,
    // object, or region id respectively.
    CastAvatar,
    CastObject,
    CastRegion,

    // Field types
    Avaid,
    Bin15,
    Bin31,
    Bit,
    Byte,
    Character,
    Entity,
    Fatword,
    Objid,
    Regid,
    Varstring,
    Words,

    // Literals
    Name(String),
    Number(i64),
    Str(String),
    /// A run of bits written `'01011010'`, most significant bit first.
    BitString { bits: u32, width: u8 },
    /// A `>`-prefixed line forwarded verbatim to the raw-output channel.
    Rawline(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    // Punctuation
    Equal,
    Hash,
    Colon,
    Comma,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    // Special
    Eof,
}

/// Source location information for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// A zero-width span for synthesized nodes.
    pub fn dummy() -> Self {
        Self::new(0, 0, 1, 1)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
            column: if self.line <= other.line {
                self.column
            } else {
                other.column
            },
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Include => write!(f, "include"),
            Token::Define => write!(f, "define"),
            Token::Enddefine => write!(f, "enddefine"),
            Token::Use => write!(f, "use"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Xor => write!(f, "xor"),
            Token::CastAvatar => write!(f, "A"),
            Token::CastObject => write!(f, "O"),
            Token::CastRegion => write!(f, "R"),
            Token::Avaid => write!(f, "avaid"),
            Token::Bin15 => write!(f, "bin15"),
            Token::Bin31 => write!(f, "bin31"),
            Token::Bit => write!(f, "bit"),
            Token::Byte => write!(f, "byte"),
            Token::Character => write!(f, "character"),
            Token::Entity => write!(f, "entity"),
            Token::Fatword => write!(f, "fatword"),
            Token::Objid => write!(f, "objid"),
            Token::Regid => write!(f, "regid"),
            Token::Varstring => write!(f, "varstring"),
            Token::Words => write!(f, "words"),
            Token::Name(name) => write!(f, "{}", name),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(_) => write!(f, "\"<string>\""),
            Token::BitString { bits, width } => {
                write!(f, "'{:0width$b}'", bits, width = *width as usize)
            }
            Token::Rawline(_) => write!(f, "<raw line>"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Bang => write!(f, "!"),
            Token::Equal => write!(f, "="),
            Token::Hash => write!(f, "#"),
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

