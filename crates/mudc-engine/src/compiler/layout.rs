//! Field layout allocation.
//!
//! Assigns byte and bit offsets to an ordered field list. The allocator
//! walks fields in declaration order with a running byte cursor plus a
//! bit cursor (0..8) for `bit`-typed fields; everything else is
//! byte-aligned. Identical input always yields identical offsets.

use crate::parser::FieldType;

impl FieldType {
    /// Per-element width in bytes. `Bit` is the exception handled by the
    /// cursor logic; its nominal unit is one bit.
    pub fn unit_width(&self) -> usize {
        match self {
            FieldType::Character | FieldType::Byte | FieldType::Varstring => 1,
            FieldType::Bin15
            | FieldType::Words
            | FieldType::Regid
            | FieldType::Objid
            | FieldType::Avaid
            | FieldType::Entity => 2,
            FieldType::Bin31 | FieldType::Fatword => 4,
            // handled separately by the bit cursor
            FieldType::Bit => 0,
        }
    }
}

/// A field with its layout decided.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    /// Element count, always >= 1. For `bit` fields this is a bit count.
    pub dimension: usize,
    /// Byte offset within the state vector.
    pub offset: usize,
    /// Starting bit position within the byte at `offset`, for `bit` fields.
    pub bit: Option<u8>,
    /// Excluded from listings; layout is unaffected.
    pub invisible: bool,
}

impl Field {
    /// Bytes this field contributes on its own (ignoring bit packing).
    pub fn byte_footprint(&self) -> usize {
        match self.field_type {
            FieldType::Bit => 0,
            other => other.unit_width() * self.dimension,
        }
    }
}

/// An unplaced field, as handed over by the class builder.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingField {
    pub name: String,
    pub field_type: FieldType,
    pub dimension: usize,
    pub invisible: bool,
}

/// Assign offsets to `fields` in declaration order.
///
/// Returns the placed fields and the total class size in bytes. Bit
/// fields pack contiguously within a byte; the byte cursor advances once
/// eight bits accumulate, and any non-bit field first flushes a
/// partially used byte.
pub fn allocate(fields: Vec<PendingField>) -> (Vec<Field>, usize) {
    let mut placed = Vec::with_capacity(fields.len());
    let mut byte_cursor = 0usize;
    let mut bit_cursor = 0u8;

    for field in fields {
        if field.field_type == FieldType::Bit {
            let offset = byte_cursor;
            let bit = bit_cursor;
            for _ in 0..field.dimension {
                bit_cursor += 1;
                if bit_cursor == 8 {
                    bit_cursor = 0;
                    byte_cursor += 1;
                }
            }
            placed.push(Field {
                name: field.name,
                field_type: field.field_type,
                dimension: field.dimension,
                offset,
                bit: Some(bit),
                invisible: field.invisible,
            });
        } else {
            if bit_cursor != 0 {
                bit_cursor = 0;
                byte_cursor += 1;
            }
            let offset = byte_cursor;
            byte_cursor += field.field_type.unit_width() * field.dimension;
            placed.push(Field {
                name: field.name,
                field_type: field.field_type,
                dimension: field.dimension,
                offset,
                bit: None,
                invisible: field.invisible,
            });
        }
    }

    // A trailing partial byte still occupies storage
    if bit_cursor != 0 {
        byte_cursor += 1;
    }

    (placed, byte_cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(name: &str, field_type: FieldType, dimension: usize) -> PendingField {
        PendingField {
            name: name.to_string(),
            field_type,
            dimension,
            invisible: false,
        }
    }

    #[test]
    fn widths_follow_the_machine_encoding() {
        assert_eq!(FieldType::Character.unit_width(), 1);
        assert_eq!(FieldType::Byte.unit_width(), 1);
        assert_eq!(FieldType::Bin15.unit_width(), 2);
        assert_eq!(FieldType::Bin31.unit_width(), 4);
        assert_eq!(FieldType::Words.unit_width(), 2);
        assert_eq!(FieldType::Regid.unit_width(), 2);
        assert_eq!(FieldType::Objid.unit_width(), 2);
        assert_eq!(FieldType::Avaid.unit_width(), 2);
        assert_eq!(FieldType::Fatword.unit_width(), 4);
        assert_eq!(FieldType::Entity.unit_width(), 2);
        assert_eq!(FieldType::Varstring.unit_width(), 1);
    }

    #[test]
    fn nine_bit_fields_spill_into_a_second_byte() {
        let fields: Vec<_> = (0..9)
            .map(|i| pending(&format!("b{}", i), FieldType::Bit, 1))
            .collect();
        let (placed, size) = allocate(fields);
        let offsets: Vec<_> = placed.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(placed[8].bit, Some(0));
        assert_eq!(size, 2);
    }

    #[test]
    fn non_bit_field_flushes_a_partial_byte() {
        let (placed, size) = allocate(vec![
            pending("flag", FieldType::Bit, 1),
            pending("count", FieldType::Byte, 1),
        ]);
        assert_eq!(placed[0].offset, 0);
        assert_eq!(placed[0].bit, Some(0));
        assert_eq!(placed[1].offset, 1);
        assert_eq!(size, 2);
    }

    #[test]
    fn dimensions_scale_footprints() {
        let (placed, size) = allocate(vec![
            pending("ident", FieldType::Character, 6),
            pending("position", FieldType::Words, 2),
            pending("big", FieldType::Bin31, 1),
        ]);
        assert_eq!(placed[0].offset, 0);
        assert_eq!(placed[1].offset, 6);
        assert_eq!(placed[2].offset, 10);
        assert_eq!(size, 14);
    }

    #[test]
    fn bit_field_with_dimension_consumes_that_many_bits() {
        let (placed, size) = allocate(vec![
            pending("mask", FieldType::Bit, 10),
            pending("tail", FieldType::Bit, 1),
        ]);
        assert_eq!(placed[0].offset, 0);
        assert_eq!(placed[0].bit, Some(0));
        assert_eq!(placed[1].offset, 1);
        assert_eq!(placed[1].bit, Some(2));
        assert_eq!(size, 2);
    }

    #[test]
    fn invisibility_never_changes_layout() {
        let visible = allocate(vec![
            pending("a", FieldType::Byte, 1),
            pending("b", FieldType::Bin15, 1),
        ]);
        let mut fields = vec![
            pending("a", FieldType::Byte, 1),
            pending("b", FieldType::Bin15, 1),
        ];
        fields[0].invisible = true;
        let invisible = allocate(fields);
        assert_eq!(visible.1, invisible.1);
        assert_eq!(
            visible.0.iter().map(|f| f.offset).collect::<Vec<_>>(),
            invisible.0.iter().map(|f| f.offset).collect::<Vec<_>>()
        );
    }

    #[test]
    fn allocation_is_deterministic() {
        let build = || {
            vec![
                pending("a", FieldType::Bit, 3),
                pending("b", FieldType::Character, 4),
                pending("c", FieldType::Bit, 1),
                pending("d", FieldType::Words, 5),
                pending("e", FieldType::Varstring, 12),
            ]
        };
        let first = allocate(build());
        let second = allocate(build());
        assert_eq!(first, second);
    }

    #[test]
    fn offsets_are_monotonically_non_decreasing() {
        let (placed, _) = allocate(vec![
            pending("a", FieldType::Bit, 1),
            pending("b", FieldType::Bit, 1),
            pending("c", FieldType::Byte, 1),
            pending("d", FieldType::Fatword, 1),
            pending("e", FieldType::Bit, 2),
        ]);
        for pair in placed.windows(2) {
            assert!(pair[0].offset <= pair[1].offset);
        }
    }
}
