//! Object instances and the 256-slot object-number pool.
//!
//! Every instantiated object occupies one slot in a fixed pool of object
//! numbers (noids). Deletion frees the slot but parks the instance in a
//! one-deep undelete buffer, so the most recent deletion can be undone.

use crate::compiler::error::CompileError;
use crate::parser::Span;

/// Number of object-number slots the target machine provides.
pub const NOID_LIMIT: usize = 256;

/// One live object: a class reference plus its private state vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInstance {
    pub noid: u8,
    pub class_id: u8,
    /// Instance-name symbol, when the source gave one.
    pub name: Option<String>,
    /// Deep copy of the class prototype, mutated by property overrides.
    pub state: Vec<u8>,
    /// Definition site, kept for later diagnostics.
    pub span: Span,
}

/// The object-number pool. Slot occupancy is liveness.
#[derive(Debug)]
pub struct ObjectTable {
    slots: Vec<Option<ObjectInstance>>,
    /// Holds the most recently deleted instance only.
    undelete_buffer: Option<ObjectInstance>,
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectTable {
    pub fn new() -> Self {
        Self {
            slots: vec![None; NOID_LIMIT],
            undelete_buffer: None,
        }
    }

    /// Pick the object number for a new instance.
    ///
    /// An explicit id claims that exact slot (`ObjectIdOutOfRange` /
    /// `DuplicateObjectId` when it cannot); otherwise the lowest free
    /// slot wins, and a full pool is `IdPoolExhausted`.
    pub fn allocate_noid(
        &self,
        explicit: Option<i64>,
        span: Span,
    ) -> Result<u8, CompileError> {
        match explicit {
            Some(id) => {
                if !(0..NOID_LIMIT as i64).contains(&id) {
                    return Err(CompileError::ObjectIdOutOfRange { id, span });
                }
                if self.slots[id as usize].is_some() {
                    return Err(CompileError::DuplicateObjectId { id: id as u8, span });
                }
                Ok(id as u8)
            }
            None => self
                .slots
                .iter()
                .position(Option::is_none)
                .map(|idx| idx as u8)
                .ok_or(CompileError::IdPoolExhausted { span }),
        }
    }

    /// Occupy the instance's slot. The slot must have come from
    /// `allocate_noid` and still be free.
    pub fn insert(&mut self, instance: ObjectInstance) {
        let slot = &mut self.slots[instance.noid as usize];
        debug_assert!(slot.is_none());
        *slot = Some(instance);
    }

    pub fn get(&self, noid: u8) -> Option<&ObjectInstance> {
        self.slots[noid as usize].as_ref()
    }

    pub fn get_mut(&mut self, noid: u8) -> Option<&mut ObjectInstance> {
        self.slots[noid as usize].as_mut()
    }

    /// Free a slot, parking the instance in the undelete buffer.
    /// A previously buffered instance is discarded. Returns false when
    /// the slot was already free.
    pub fn delete(&mut self, noid: u8) -> bool {
        match self.slots[noid as usize].take() {
            Some(instance) => {
                self.undelete_buffer = Some(instance);
                true
            }
            None => false,
        }
    }

    /// Restore the most recently deleted instance to its old slot.
    /// Returns the restored noid; `None` when the buffer is empty.
    /// `DuplicateObjectId` when the slot has been reused since.
    pub fn undelete(&mut self) -> Result<Option<u8>, CompileError> {
        let Some(instance) = self.undelete_buffer.take() else {
            return Ok(None);
        };
        let noid = instance.noid;
        if self.slots[noid as usize].is_some() {
            self.undelete_buffer = Some(instance);
            return Err(CompileError::DuplicateObjectId {
                id: noid,
                span: Span::dummy(),
            });
        }
        self.slots[noid as usize] = Some(instance);
        Ok(Some(noid))
    }

    /// Live instances in ascending noid order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectInstance> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(noid: u8) -> ObjectInstance {
        ObjectInstance {
            noid,
            class_id: 1,
            name: None,
            state: vec![0; 4],
            span: Span::dummy(),
        }
    }

    #[test]
    fn lowest_free_slot_wins() {
        let mut table = ObjectTable::new();
        for noid in [0u8, 1, 2] {
            let got = table.allocate_noid(None, Span::dummy()).unwrap();
            assert_eq!(got, noid);
            table.insert(instance(got));
        }
        table.delete(1);
        assert_eq!(table.allocate_noid(None, Span::dummy()).unwrap(), 1);
    }

    #[test]
    fn explicit_id_collision_is_rejected() {
        let mut table = ObjectTable::new();
        table.insert(instance(7));
        let err = table.allocate_noid(Some(7), Span::dummy()).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateObjectId { id: 7, .. }));
        assert!(matches!(
            table.allocate_noid(Some(300), Span::dummy()).unwrap_err(),
            CompileError::ObjectIdOutOfRange { .. }
        ));
    }

    #[test]
    fn full_pool_is_exhausted() {
        let mut table = ObjectTable::new();
        for noid in 0..NOID_LIMIT {
            table.insert(instance(noid as u8));
        }
        assert!(matches!(
            table.allocate_noid(None, Span::dummy()).unwrap_err(),
            CompileError::IdPoolExhausted { .. }
        ));
    }

    #[test]
    fn undelete_restores_last_deleted_only() {
        let mut table = ObjectTable::new();
        table.insert(instance(3));
        table.insert(instance(5));
        assert!(table.delete(3));
        assert!(table.delete(5));
        // 3 was displaced from the buffer by 5
        assert_eq!(table.undelete().unwrap(), Some(5));
        assert_eq!(table.undelete().unwrap(), None);
        assert!(table.get(3).is_none());
        assert!(table.get(5).is_some());
    }

    #[test]
    fn undelete_into_reused_slot_fails_and_keeps_buffer() {
        let mut table = ObjectTable::new();
        table.insert(instance(0));
        table.delete(0);
        table.insert(instance(0));
        assert!(matches!(
            table.undelete().unwrap_err(),
            CompileError::DuplicateObjectId { id: 0, .. }
        ));
        table.delete(0);
        // the second delete replaced the buffered instance
        assert_eq!(table.undelete().unwrap(), Some(0));
    }

    #[test]
    fn delete_of_free_slot_is_a_noop() {
        let mut table = ObjectTable::new();
        assert!(!table.delete(9));
        assert_eq!(table.undelete().unwrap(), None);
    }

    #[test]
    fn iteration_is_ascending() {
        let mut table = ObjectTable::new();
        for noid in [200u8, 5, 100] {
            table.insert(instance(noid));
        }
        let order: Vec<u8> = table.iter().map(|o| o.noid).collect();
        assert_eq!(order, vec![5, 100, 200]);
    }
}
