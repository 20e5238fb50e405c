/*!
 * Object Tables
 * Fixed-capacity per-type slot arrays with generation-checked identities
 */

use crate::core::id::{next_serial, ObjectId, ObjectType};
use crate::core::name::ObjectName;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};

/// Lifecycle of one table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    Free,
    /// Allocated by AllocateNew, not yet finalized
    Reserved(ObjectId),
    Active(ObjectId),
    /// Held under EXCLUSIVE for deletion
    Deleting(ObjectId),
}

/// Common record shared by every resource type
#[derive(Debug, Clone)]
pub(crate) struct CommonRecord {
    pub state: SlotState,
    pub name: Option<ObjectName>,
    pub creator: ObjectId,
    pub refcount: u32,
    /// Serial of the most recent allocation of this slot
    pub serial: u32,
}

impl CommonRecord {
    const fn empty() -> Self {
        Self {
            state: SlotState::Free,
            name: None,
            creator: ObjectId::UNDEFINED,
            refcount: 0,
            serial: 0,
        }
    }

    #[inline]
    pub fn active_id(&self) -> Option<ObjectId> {
        match self.state {
            SlotState::Active(id) => Some(id),
            _ => None,
        }
    }

    /// Name is held by any record that is not free
    #[inline]
    pub fn holds_name(&self, name: &str) -> bool {
        !matches!(self.state, SlotState::Free)
            && self.name.as_ref().map_or(false, |n| n.as_str() == name)
    }

    pub fn clear(&mut self) {
        let serial = self.serial;
        *self = Self::empty();
        self.serial = serial;
    }
}

/// Mutable table contents, guarded by the type lock
#[derive(Debug)]
pub(crate) struct TableState {
    pub records: Vec<CommonRecord>,
    pub last_index: usize,
}

impl TableState {
    /// Scan for a free slot starting after the last allocated one
    pub fn find_free(&self) -> Option<usize> {
        let capacity = self.records.len();
        (1..=capacity)
            .map(|offset| (self.last_index + offset) % capacity)
            .find(|&i| self.records[i].state == SlotState::Free)
    }

    pub fn find_name(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.holds_name(name))
    }

    pub fn active_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.active_id().is_some())
            .count()
    }
}

/// One resource type's table
///
/// `published` mirrors each slot's active ID so that long-running consumers
/// (timebase servicing loops) can re-validate identity without the type lock.
/// It is only written while the type lock is held.
pub(crate) struct ObjectTable {
    pub object_type: ObjectType,
    pub state: Mutex<TableState>,
    pub changed: Condvar,
    published: Box<[AtomicU32]>,
}

impl ObjectTable {
    pub fn new(object_type: ObjectType, capacity: usize) -> Self {
        Self {
            object_type,
            state: Mutex::new(TableState {
                records: vec![CommonRecord::empty(); capacity],
                last_index: capacity.saturating_sub(1),
            }),
            changed: Condvar::new(),
            published: (0..capacity).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.published.len()
    }

    #[inline]
    pub fn published(&self, index: usize) -> ObjectId {
        self.published
            .get(index)
            .map_or(ObjectId::UNDEFINED, |slot| {
                ObjectId::from_raw(slot.load(Ordering::Acquire))
            })
    }

    #[inline]
    pub fn publish(&self, index: usize, id: ObjectId) {
        self.published[index].store(id.as_raw(), Ordering::Release);
    }

    /// Reserve `index` for a new object, returning its future ID
    pub fn reserve(
        &self,
        state: &mut TableState,
        index: usize,
        name: Option<ObjectName>,
        creator: ObjectId,
    ) -> ObjectId {
        let record = &mut state.records[index];
        record.serial = next_serial(record.serial);
        let id = ObjectId::encode(self.object_type, index, record.serial);
        record.state = SlotState::Reserved(id);
        record.name = name;
        record.creator = creator;
        record.refcount = 0;
        state.last_index = index;
        self.publish(index, ObjectId::RESERVED);
        id
    }

    pub fn activate(&self, state: &mut TableState, index: usize, id: ObjectId) {
        state.records[index].state = SlotState::Active(id);
        self.publish(index, id);
        self.changed.notify_all();
    }

    pub fn free(&self, state: &mut TableState, index: usize) {
        state.records[index].clear();
        self.publish(index, ObjectId::UNDEFINED);
        self.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_starts_after_last() {
        let table = ObjectTable::new(ObjectType::Queue, 4);
        let mut state = table.state.lock();
        let first = state.find_free().unwrap();
        assert_eq!(first, 0);
        table.reserve(&mut state, first, None, ObjectId::UNDEFINED);
        assert_eq!(state.find_free(), Some(1));
    }

    #[test]
    fn test_find_free_full() {
        let table = ObjectTable::new(ObjectType::Queue, 2);
        let mut state = table.state.lock();
        for i in 0..2 {
            table.reserve(&mut state, i, None, ObjectId::UNDEFINED);
        }
        assert_eq!(state.find_free(), None);
    }

    #[test]
    fn test_reserve_publishes_reserved_marker() {
        let table = ObjectTable::new(ObjectType::Mutex, 2);
        let mut state = table.state.lock();
        let id = table.reserve(&mut state, 1, None, ObjectId::UNDEFINED);
        assert_eq!(table.published(1), ObjectId::RESERVED);
        table.activate(&mut state, 1, id);
        assert_eq!(table.published(1), id);
        table.free(&mut state, 1);
        assert_eq!(table.published(1), ObjectId::UNDEFINED);
    }

    #[test]
    fn test_reuse_bumps_serial() {
        let table = ObjectTable::new(ObjectType::Mutex, 1);
        let mut state = table.state.lock();
        let a = table.reserve(&mut state, 0, None, ObjectId::UNDEFINED);
        table.free(&mut state, 0);
        let b = table.reserve(&mut state, 0, None, ObjectId::UNDEFINED);
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
    }
}
