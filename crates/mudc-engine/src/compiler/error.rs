//! Error types for statement execution.
//!
//! Every error is fatal for the statement that triggered it but leaves all
//! previously built state intact; whether compilation stops at the first
//! error or keeps collecting is an [`crate::compiler::ErrorPolicy`] choice.

use crate::parser::Span;
use thiserror::Error;

/// Errors that can occur while executing statements or emitting the image.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    /// A name was declared twice with an incompatible kind
    #[error("duplicate symbol '{name}'")]
    DuplicateSymbol { name: String, span: Span },

    /// An identifier with no binding was evaluated
    #[error("unbound identifier '{name}'")]
    UnboundIdentifier { name: String, span: Span },

    /// An operation was applied to a value of the wrong type
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
        span: Span,
    },

    /// Integer division or modulo by zero
    #[error("division by zero")]
    DivisionByZero { span: Span },

    /// Class ids live in the machine's 8-bit class space
    #[error("class id {id} out of range 0..=255")]
    ClassIdOutOfRange { id: i64, span: Span },

    /// A field-less definition aliased an id nothing is registered under
    #[error("no class registered under id {id} to alias")]
    UnknownBaseClass { id: u8, span: Span },

    /// `use` of a name that is not a class
    #[error("unknown class '{name}'")]
    UnknownClass { name: String, span: Span },

    /// A property named a field the class does not declare
    #[error("class '{class}' has no field '{name}'")]
    UnknownField {
        class: String,
        name: String,
        span: Span,
    },

    /// More values supplied than the field's dimension holds
    #[error("{count} value(s) overflow field '{name}' of dimension {dimension}")]
    FieldOverflow {
        name: String,
        dimension: usize,
        count: usize,
        span: Span,
    },

    /// An explicit object id collided with a live object
    #[error("object id {id} already in use")]
    DuplicateObjectId { id: u8, span: Span },

    /// All 256 object ids are live
    #[error("object id pool exhausted")]
    IdPoolExhausted { span: Span },

    /// Explicit object ids live in the machine's 8-bit noid space
    #[error("object id {id} out of range 0..=255")]
    ObjectIdOutOfRange { id: i64, span: Span },

    /// Field dimensions must evaluate to an integer >= 1
    #[error("field '{name}' has invalid dimension {value}")]
    InvalidDimension {
        name: String,
        value: i64,
        span: Span,
    },

    /// `include` chains deeper than the input stack allows
    #[error("include depth limit ({limit}) exceeded")]
    IncludeDepthExceeded { limit: usize, span: Span },

    /// An included file could not be read
    #[error("cannot read include '{path}': {reason}")]
    IncludeFailed {
        path: String,
        reason: String,
        span: Span,
    },
}

impl CompileError {
    /// Source span the error is anchored to.
    pub fn span(&self) -> Span {
        match self {
            CompileError::DuplicateSymbol { span, .. }
            | CompileError::UnboundIdentifier { span, .. }
            | CompileError::TypeMismatch { span, .. }
            | CompileError::DivisionByZero { span }
            | CompileError::ClassIdOutOfRange { span, .. }
            | CompileError::UnknownBaseClass { span, .. }
            | CompileError::UnknownClass { span, .. }
            | CompileError::UnknownField { span, .. }
            | CompileError::FieldOverflow { span, .. }
            | CompileError::DuplicateObjectId { span, .. }
            | CompileError::IdPoolExhausted { span }
            | CompileError::ObjectIdOutOfRange { span, .. }
            | CompileError::InvalidDimension { span, .. }
            | CompileError::IncludeDepthExceeded { span, .. }
            | CompileError::IncludeFailed { span, .. } => *span,
        }
    }
}
