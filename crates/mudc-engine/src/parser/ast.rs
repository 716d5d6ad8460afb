//! Statement and expression nodes for the mud world-definition language.
//!
//! One `Statement` corresponds to one top-level construct in a source
//! file; the compiler executes them strictly in textual order.

use crate::parser::token::Span;

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Opaque line forwarded verbatim to the raw-output channel.
    Raw { text: String, span: Span },

    /// `Name = expr`: bind a name to an evaluated expression.
    Assignment {
        name: String,
        expr: Expr,
        span: Span,
    },

    /// `include "path"`: push a new source onto the input stack.
    Include { path: String, span: Span },

    /// `define expr "name" [fieldList] enddefine`: register a class.
    ///
    /// A definition without a field list aliases an already-registered
    /// class with the same id.
    Define {
        class_id: Expr,
        name: String,
        fields: Option<Vec<FieldDecl>>,
        span: Span,
    },

    /// `use Class [instance] [= expr] { property* }`: instantiate an object.
    Use {
        class_name: String,
        instance_name: Option<String>,
        id_expr: Option<Expr>,
        properties: Vec<Property>,
        span: Span,
    },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Raw { span, .. }
            | Statement::Assignment { span, .. }
            | Statement::Include { span, .. }
            | Statement::Define { span, .. }
            | Statement::Use { span, .. } => *span,
        }
    }
}

/// One field declaration inside a `define` block.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    /// Element count; `None` means dimension 1.
    pub dimension: Option<Expr>,
    pub field_type: FieldType,
    /// Default values baked into the class prototype.
    pub initializers: Option<Vec<Expr>>,
    /// `#`-prefixed: excluded from listings, layout unchanged.
    pub invisible: bool,
    pub span: Span,
}

/// One field override inside a `use` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub values: Vec<Expr>,
    pub span: Span,
}

/// The binary type of a field. Determines the per-element width and
/// therefore the class layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Character,
    Bin15,
    Bin31,
    Bit,
    Byte,
    Words,
    Regid,
    Objid,
    Avaid,
    Fatword,
    Entity,
    Varstring,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::Character => "character",
            FieldType::Bin15 => "bin15",
            FieldType::Bin31 => "bin31",
            FieldType::Bit => "bit",
            FieldType::Byte => "byte",
            FieldType::Words => "words",
            FieldType::Regid => "regid",
            FieldType::Objid => "objid",
            FieldType::Avaid => "avaid",
            FieldType::Fatword => "fatword",
            FieldType::Entity => "entity",
            FieldType::Varstring => "varstring",
        };
        write!(f, "{}", name)
    }
}

/// A constant expression. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String, Span),
    Number(i64, Span),
    Str(String, Span),
    BitString { bits: u32, width: u8, span: Span },
    Paren(Box<Expr>, Span),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Name(_, span)
            | Expr::Number(_, span)
            | Expr::Str(_, span)
            | Expr::BitString { span, .. }
            | Expr::Paren(_, span)
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Negate,
    /// Bitwise not (the language has no booleans).
    Not,
    /// Reinterpret an integer as an avatar id.
    AsAvatar,
    /// Reinterpret an integer as an object id.
    AsObject,
    /// Reinterpret an integer as a region id.
    AsRegion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        };
        write!(f, "{}", op)
    }
}
