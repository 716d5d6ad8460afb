//! Runtime values produced by constant-expression evaluation.

/// The result of evaluating a constant expression.
///
/// References carry small integer ids into their respective object-number
/// namespaces, never pointers. Values are immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Int(i64),
    Str(String),
    /// An avatar id (`A n`).
    Avatar(i64),
    /// An object id (`O n`).
    Object(i64),
    /// A region id (`R n`).
    Region(i64),
    /// A bit pattern with an explicit width, MSB first.
    BitString { bits: u32, width: u8 },
}

impl Value {
    /// Human-readable type tag for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Avatar(_) => "avatar reference",
            Value::Object(_) => "object reference",
            Value::Region(_) => "region reference",
            Value::BitString { .. } => "bit string",
        }
    }

    /// The integer payload, if this value has one.
    ///
    /// Bit strings count: their pattern is their integer payload.
    /// References do not; a reference used where arithmetic wants an
    /// integer is a type mismatch, not a silent coercion.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::BitString { bits, .. } => Some(*bits as i64),
            _ => None,
        }
    }

    /// The raw id behind any reference-typed value.
    pub fn reference_id(&self) -> Option<i64> {
        match self {
            Value::Avatar(id) | Value::Object(id) | Value::Region(id) => Some(*id),
            _ => None,
        }
    }
}
