//! Class descriptors and the class table.
//!
//! A class is a named, fixed binary layout of typed fields plus a
//! prototype buffer holding baked-in defaults. Classes are identified by
//! small integer ids (the machine's 8-bit class space) and may be
//! aliased: a field-less definition reuses the layout already registered
//! under the same id.

use crate::compiler::error::CompileError;
use crate::compiler::eval::{evaluate, ClassKinds};
use crate::compiler::layout::{allocate, Field, PendingField};
use crate::compiler::symbol::SymbolTable;
use crate::compiler::value::Value;
use crate::parser::{Expr, FieldDecl, FieldType, Span};
use rustc_hash::FxHashMap;
use std::fmt::Write as _;

/// Number of distinct class ids the target machine can address.
pub const CLASS_LIMIT: usize = 256;

/// A named, fixed binary layout shared by all instances.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    pub id: u8,
    pub name: String,
    /// Total state-vector size in bytes; always the allocator's total.
    pub size: usize,
    pub fields: Vec<Field>,
    /// Default-initialized byte image copied per instantiation.
    pub prototype: Vec<u8>,
}

impl ClassDescriptor {
    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Human-readable layout listing, omitting invisible fields.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "class {} (id {}, size {})", self.name, self.id, self.size);
        for field in self.fields.iter().filter(|f| !f.invisible) {
            let position = match field.bit {
                Some(bit) => format!("{:04x}.{}", field.offset, bit),
                None => format!("{:04x}  ", field.offset),
            };
            let _ = writeln!(
                out,
                "  {}  {}({})  {}",
                position, field.name, field.dimension, field.field_type
            );
        }
        out
    }
}

/// Registry of all defined classes, keyed by id and by name.
#[derive(Debug, Default)]
pub struct ClassTable {
    descriptors: Vec<ClassDescriptor>,
    by_id: FxHashMap<u8, usize>,
    by_name: FxHashMap<String, usize>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical descriptor registered under `id`, if any.
    pub fn by_id(&self, id: u8) -> Option<&ClassDescriptor> {
        self.by_id.get(&id).map(|&idx| &self.descriptors[idx])
    }

    pub fn by_name(&self, name: &str) -> Option<&ClassDescriptor> {
        self.by_name.get(name).map(|&idx| &self.descriptors[idx])
    }

    /// All descriptors in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Register a class under `id`.
    ///
    /// With a field list, evaluates dimensions, lays the fields out, and
    /// bakes the prototype. Without one, aliases the layout already
    /// registered under `id` (`UnknownBaseClass` when there is none).
    /// The newest registration becomes canonical for its id.
    pub fn define(
        &mut self,
        id_value: i64,
        name: &str,
        fields: Option<&[FieldDecl]>,
        symbols: &SymbolTable,
        kinds: ClassKinds,
        span: Span,
    ) -> Result<&ClassDescriptor, CompileError> {
        if !(0..CLASS_LIMIT as i64).contains(&id_value) {
            return Err(CompileError::ClassIdOutOfRange { id: id_value, span });
        }
        let id = id_value as u8;

        let descriptor = match fields {
            Some(decls) => {
                let mut pending = Vec::with_capacity(decls.len());
                for decl in decls {
                    pending.push(PendingField {
                        name: decl.name.clone(),
                        field_type: decl.field_type,
                        dimension: evaluate_dimension(decl, symbols, kinds)?,
                        invisible: decl.invisible,
                    });
                }
                let (fields, size) = allocate(pending);
                let mut prototype = vec![0u8; size];
                for (field, decl) in fields.iter().zip(decls) {
                    if let Some(initializers) = &decl.initializers {
                        write_field_values(&mut prototype, field, initializers, symbols, kinds)?;
                    }
                }
                ClassDescriptor {
                    id,
                    name: name.to_string(),
                    size,
                    fields,
                    prototype,
                }
            }
            None => {
                let base = self
                    .by_id(id)
                    .ok_or(CompileError::UnknownBaseClass { id, span })?;
                ClassDescriptor {
                    id,
                    name: name.to_string(),
                    size: base.size,
                    fields: base.fields.clone(),
                    prototype: base.prototype.clone(),
                }
            }
        };

        let idx = self.descriptors.len();
        self.descriptors.push(descriptor);
        self.by_id.insert(id, idx);
        self.by_name.insert(name.to_string(), idx);
        Ok(&self.descriptors[idx])
    }
}

fn evaluate_dimension(
    decl: &FieldDecl,
    symbols: &SymbolTable,
    kinds: ClassKinds,
) -> Result<usize, CompileError> {
    let Some(expr) = &decl.dimension else {
        return Ok(1);
    };
    let value = evaluate(expr, symbols, kinds)?;
    let n = value.as_int().ok_or(CompileError::TypeMismatch {
        expected: "integer",
        actual: value.type_name(),
        span: expr.span(),
    })?;
    if n < 1 {
        return Err(CompileError::InvalidDimension {
            name: decl.name.clone(),
            value: n,
            span: expr.span(),
        });
    }
    Ok(n as usize)
}

/// Evaluate an expression list and write the values into `state` at the
/// field's position, in order.
///
/// Strings spread across `character`/`varstring` elements one byte per
/// character; every other value consumes one element. Supplying more
/// elements than the field's dimension is a `FieldOverflow`; fewer
/// leaves the remaining elements untouched.
pub(crate) fn write_field_values(
    state: &mut [u8],
    field: &Field,
    values: &[Expr],
    symbols: &SymbolTable,
    kinds: ClassKinds,
) -> Result<(), CompileError> {
    let mut element = 0usize;
    for expr in values {
        let value = evaluate(expr, symbols, kinds)?;
        // checked before the write; strings bound-check their own length
        if element >= field.dimension {
            return Err(CompileError::FieldOverflow {
                name: field.name.clone(),
                dimension: field.dimension,
                count: element + 1,
                span: expr.span(),
            });
        }
        element += write_element(state, field, element, &value, expr.span())?;
    }
    Ok(())
}

/// Write one value at element index `element`, returning how many
/// elements it consumed.
fn write_element(
    state: &mut [u8],
    field: &Field,
    element: usize,
    value: &Value,
    span: Span,
) -> Result<usize, CompileError> {
    // Overflow detection happens after the write is sized, so bounds are
    // checked here first for multi-element strings.
    match field.field_type {
        FieldType::Character | FieldType::Varstring => {
            if let Value::Str(s) = value {
                let bytes = s.as_bytes();
                if element + bytes.len() > field.dimension {
                    return Err(CompileError::FieldOverflow {
                        name: field.name.clone(),
                        dimension: field.dimension,
                        count: element + bytes.len(),
                        span,
                    });
                }
                let start = field.offset + element;
                state[start..start + bytes.len()].copy_from_slice(bytes);
                return Ok(bytes.len());
            }
            let n = expect_int(value, span)?;
            state[field.offset + element] = n as u8;
            Ok(1)
        }
        FieldType::Byte => {
            let n = expect_int(value, span)?;
            state[field.offset + element] = n as u8;
            Ok(1)
        }
        FieldType::Bit => {
            let n = expect_int(value, span)?;
            let bit_index = field.bit.unwrap_or(0) as usize + element;
            let byte = field.offset + bit_index / 8;
            let position = (bit_index % 8) as u8;
            if n & 1 != 0 {
                state[byte] |= 1 << position;
            } else {
                state[byte] &= !(1 << position);
            }
            Ok(1)
        }
        FieldType::Bin15 | FieldType::Words => {
            let n = expect_int(value, span)?;
            put_u16(state, field.offset + element * 2, n as u16);
            Ok(1)
        }
        FieldType::Bin31 | FieldType::Fatword => {
            let n = expect_int(value, span)?;
            put_u32(state, field.offset + element * 4, n as u32);
            Ok(1)
        }
        FieldType::Regid => {
            let n = expect_reference(value, span, "region reference", |v| match v {
                Value::Region(id) => Some(*id),
                _ => None,
            })?;
            put_u16(state, field.offset + element * 2, n as u16);
            Ok(1)
        }
        FieldType::Objid => {
            let n = expect_reference(value, span, "object reference", |v| match v {
                Value::Object(id) => Some(*id),
                _ => None,
            })?;
            put_u16(state, field.offset + element * 2, n as u16);
            Ok(1)
        }
        FieldType::Avaid => {
            let n = expect_reference(value, span, "avatar reference", |v| match v {
                Value::Avatar(id) => Some(*id),
                _ => None,
            })?;
            put_u16(state, field.offset + element * 2, n as u16);
            Ok(1)
        }
        FieldType::Entity => {
            // An entity slot holds any object-number namespace
            let n = match value.reference_id().or_else(|| value.as_int()) {
                Some(n) => n,
                None => {
                    return Err(CompileError::TypeMismatch {
                        expected: "entity reference",
                        actual: value.type_name(),
                        span,
                    })
                }
            };
            put_u16(state, field.offset + element * 2, n as u16);
            Ok(1)
        }
    }
}

fn expect_int(value: &Value, span: Span) -> Result<i64, CompileError> {
    value.as_int().ok_or(CompileError::TypeMismatch {
        expected: "integer",
        actual: value.type_name(),
        span,
    })
}

/// Reference-typed fields take a reference of their own namespace or a
/// bare integer; a reference of the wrong kind is a mismatch, never a
/// silent renumbering.
fn expect_reference(
    value: &Value,
    span: Span,
    expected: &'static str,
    extract: impl Fn(&Value) -> Option<i64>,
) -> Result<i64, CompileError> {
    if let Some(id) = extract(value) {
        return Ok(id);
    }
    match value {
        Value::Int(n) => Ok(*n),
        Value::BitString { bits, .. } => Ok(*bits as i64),
        other => Err(CompileError::TypeMismatch {
            expected,
            actual: other.type_name(),
            span,
        }),
    }
}

fn put_u16(state: &mut [u8], offset: usize, value: u16) {
    state[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(state: &mut [u8], offset: usize, value: u32) {
    state[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::symbol::RedefinePolicy;
    use crate::parser::{parse_source, Statement};

    fn define_from(source: &str) -> ClassTable {
        let mut table = ClassTable::new();
        let symbols = SymbolTable::new(RedefinePolicy::Error);
        for stmt in parse_source(source).expect("parse error") {
            match stmt {
                Statement::Define {
                    class_id,
                    name,
                    fields,
                    span,
                } => {
                    let id = match evaluate(&class_id, &symbols, ClassKinds::default()).unwrap() {
                        Value::Int(n) => n,
                        other => panic!("bad id {:?}", other),
                    };
                    table
                        .define(
                            id,
                            &name,
                            fields.as_deref(),
                            &symbols,
                            ClassKinds::default(),
                            span,
                        )
                        .expect("define failed");
                }
                other => panic!("expected define, got {:?}", other),
            }
        }
        table
    }

    #[test]
    fn prototype_defaults_are_baked_little_endian() {
        let table = define_from(
            r#"define 7 "probe"
                kind : byte = 3
                mass : bin15 = 0x1234
                serial : bin31 = 0x01020304
            enddefine"#,
        );
        let class = table.by_name("probe").unwrap();
        assert_eq!(class.size, 7);
        assert_eq!(class.prototype, vec![3, 0x34, 0x12, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn class_size_matches_allocator_total() {
        let table = define_from(
            r#"define 2 "thing"
                flag : bit
                count : byte
            enddefine"#,
        );
        let class = table.by_name("thing").unwrap();
        assert_eq!(class.size, 2);
        assert_eq!(class.field("count").unwrap().offset, 1);
        assert!(class.prototype.iter().all(|&b| b == 0));
    }

    #[test]
    fn string_initializers_spread_across_character_elements() {
        let table = define_from(
            r#"define 3 "sign"
                text(8) : character = "EXIT"
            enddefine"#,
        );
        let class = table.by_name("sign").unwrap();
        assert_eq!(&class.prototype[..4], b"EXIT");
        assert_eq!(&class.prototype[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn bit_initializers_land_on_their_bit_positions() {
        let table = define_from(
            r#"define 4 "latch"
                a : bit = 1
                b : bit
                c : bit = 1
            enddefine"#,
        );
        let class = table.by_name("latch").unwrap();
        assert_eq!(class.prototype, vec![0b101]);
    }

    #[test]
    fn alias_reuses_layout_of_same_id() {
        let table = define_from(
            r#"define 9 "base"
                v : bin15 = 5
            enddefine
            define 9 "base_alias" enddefine"#,
        );
        let alias = table.by_name("base_alias").unwrap();
        assert_eq!(alias.size, 2);
        assert_eq!(alias.prototype, vec![5, 0]);
        assert_eq!(alias.id, 9);
    }

    #[test]
    fn alias_without_base_fails() {
        let mut table = ClassTable::new();
        let symbols = SymbolTable::new(RedefinePolicy::Error);
        let err = table
            .define(42, "orphan", None, &symbols, ClassKinds::default(), Span::dummy())
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownBaseClass { id: 42, .. }));
    }

    #[test]
    fn class_id_out_of_range_fails() {
        let mut table = ClassTable::new();
        let symbols = SymbolTable::new(RedefinePolicy::Error);
        for bad in [-1i64, 256, 1000] {
            let err = table
                .define(bad, "x", Some(&[]), &symbols, ClassKinds::default(), Span::dummy())
                .unwrap_err();
            assert!(matches!(err, CompileError::ClassIdOutOfRange { .. }));
        }
    }

    #[test]
    fn too_many_initializers_overflow() {
        let mut table = ClassTable::new();
        let symbols = SymbolTable::new(RedefinePolicy::Error);
        let stmts = parse_source(
            r#"define 1 "tiny"
                v(2) : byte = 1, 2, 3
            enddefine"#,
        )
        .unwrap();
        let Statement::Define {
            name, fields, span, ..
        } = &stmts[0]
        else {
            unreachable!()
        };
        let err = table
            .define(
                1,
                name,
                fields.as_deref(),
                &symbols,
                ClassKinds::default(),
                *span,
            )
            .unwrap_err();
        assert!(matches!(err, CompileError::FieldOverflow { .. }));
    }

    #[test]
    fn listing_hides_invisible_fields() {
        let table = define_from(
            r#"define 5 "secretive"
                shown : byte
                #hidden : byte
            enddefine"#,
        );
        let listing = table.by_name("secretive").unwrap().listing();
        assert!(listing.contains("shown"));
        assert!(!listing.contains("hidden"));
    }
}
