//! Lexer and parser for the mud world-definition language.
//!
//! The original tooling recognized this language with a generated LALR
//! grammar; here it is a logos lexer plus a hand-written recursive-descent
//! parser producing the typed statement stream consumed by
//! [`crate::compiler`].

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

// Re-exports for convenience
pub use ast::{BinaryOp, Expr, FieldDecl, FieldType, Property, Statement, UnaryOp};
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser};
pub use token::{Span, Token};

/// Lex and parse one source text into its statement list.
pub fn parse_source(source: &str) -> Result<Vec<Statement>, SourceError> {
    let tokens = Lexer::new(source).tokenize().map_err(SourceError::Lex)?;
    Parser::new(tokens)
        .parse_program()
        .map_err(SourceError::Parse)
}

/// A lexical or syntactic failure in one source file.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    Lex(Vec<LexError>),
    Parse(ParseError),
}
