//! Constant-expression evaluator.
//!
//! Reduces an expression tree to a [`Value`] against the symbol table.
//! Evaluation is eager and left-to-right; the language has no boolean
//! operators, so nothing short-circuits.

use crate::compiler::error::CompileError;
use crate::compiler::symbol::{SymbolDef, SymbolTable};
use crate::compiler::value::Value;
use crate::parser::{BinaryOp, Expr, UnaryOp};

/// Which class ids name the special object-number namespaces.
///
/// Object-kind symbols evaluate to the reference type of their namespace,
/// so a region object's name can be written straight into a `regid` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassKinds {
    pub region_class: u8,
    pub avatar_class: u8,
}

impl Default for ClassKinds {
    fn default() -> Self {
        // The fixed memory map reserves class 0 for regions and class 1
        // for avatars.
        Self {
            region_class: 0,
            avatar_class: 1,
        }
    }
}

/// Evaluate `expr` to a value.
pub fn evaluate(
    expr: &Expr,
    symbols: &SymbolTable,
    kinds: ClassKinds,
) -> Result<Value, CompileError> {
    match expr {
        Expr::Number(n, _) => Ok(Value::Int(*n)),
        Expr::Str(s, _) => Ok(Value::Str(s.clone())),
        Expr::BitString { bits, width, .. } => Ok(Value::BitString {
            bits: *bits,
            width: *width,
        }),
        Expr::Paren(inner, _) => evaluate(inner, symbols, kinds),
        Expr::Name(name, span) => {
            let symbol = symbols
                .lookup(name)
                .ok_or_else(|| CompileError::UnboundIdentifier {
                    name: name.clone(),
                    span: *span,
                })?;
            match &symbol.def {
                SymbolDef::Variable(value) => Ok(value.clone()),
                SymbolDef::Macro(body) => evaluate(body, symbols, kinds),
                SymbolDef::Class(id) => Ok(Value::Int(*id as i64)),
                SymbolDef::Object { class, noid } => Ok(if *class == kinds.region_class {
                    Value::Region(*noid as i64)
                } else if *class == kinds.avatar_class {
                    Value::Avatar(*noid as i64)
                } else {
                    Value::Object(*noid as i64)
                }),
                SymbolDef::None => Ok(Value::Undefined),
            }
        }
        Expr::Unary { op, operand, .. } => {
            let value = evaluate(operand, symbols, kinds)?;
            let n = value.as_int().ok_or(CompileError::TypeMismatch {
                expected: "integer",
                actual: value.type_name(),
                span: operand.span(),
            })?;
            Ok(match op {
                UnaryOp::Negate => Value::Int(n.wrapping_neg()),
                UnaryOp::Not => Value::Int(!n),
                UnaryOp::AsAvatar => Value::Avatar(n),
                UnaryOp::AsObject => Value::Object(n),
                UnaryOp::AsRegion => Value::Region(n),
            })
        }
        Expr::Binary { op, lhs, rhs, span } => {
            let left = evaluate(lhs, symbols, kinds)?;
            let right = evaluate(rhs, symbols, kinds)?;
            let a = left.as_int().ok_or(CompileError::TypeMismatch {
                expected: "integer",
                actual: left.type_name(),
                span: lhs.span(),
            })?;
            let b = right.as_int().ok_or(CompileError::TypeMismatch {
                expected: "integer",
                actual: right.type_name(),
                span: rhs.span(),
            })?;
            let result = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => {
                    if b == 0 {
                        return Err(CompileError::DivisionByZero { span: *span });
                    }
                    a.wrapping_div(b)
                }
                BinaryOp::Mod => {
                    if b == 0 {
                        return Err(CompileError::DivisionByZero { span: *span });
                    }
                    a.wrapping_rem(b)
                }
                BinaryOp::And => a & b,
                BinaryOp::Or => a | b,
                BinaryOp::Xor => a ^ b,
            };
            Ok(Value::Int(result))
        }
    }
}
