/*!
 * Object Tokens
 * Lock-scoped handles passed between registry operations
 *
 * A token names one slot (type + index + ID) and carries whatever the
 * acquisition mode holds: the type lock, the registry-wide read lock, or a
 * reference count. Dropping a token without finalizing it undoes whatever
 * transition was in flight, so a failed `?` never leaves a slot stuck.
 */

use super::table::{CommonRecord, ObjectTable, SlotState, TableState};
use crate::core::id::{ObjectId, ObjectType};
use parking_lot::{MutexGuard, RwLockReadGuard};
use serde::{Deserialize, Serialize};

/// Lock discipline requested from `get_by_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Validate and release immediately
    None,
    /// Hold the type lock for the token's lifetime
    Global,
    /// Claim the slot for deletion once no references are outstanding
    Exclusive,
    /// Take a counted reference and release the locks
    Refcount,
}

/// What dropping an unsettled token must undo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pending {
    Nothing,
    AbortCreate,
    AbortDelete,
    ReleaseRef,
}

/// Transient handle to one registry slot
pub struct ObjectToken<'r> {
    pub(crate) table: &'r ObjectTable,
    pub(crate) id: ObjectId,
    pub(crate) mode: LockMode,
    pub(crate) pending: Pending,
    // Field order matters: the type lock is released before the global lock.
    pub(crate) guard: Option<MutexGuard<'r, TableState>>,
    pub(crate) _global: Option<RwLockReadGuard<'r, ()>>,
}

/// A counted reference moved out of a token into a longer-lived record
///
/// Must be handed back through `Registry::release_held` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a held reference pins its object until released"]
pub struct HeldRef {
    pub(crate) id: ObjectId,
}

impl HeldRef {
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl<'r> ObjectToken<'r> {
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.id.index()
    }

    #[inline]
    pub fn object_type(&self) -> ObjectType {
        self.table.object_type
    }

    #[inline]
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Run `f` against the common record, locking briefly if this token does
    /// not already hold the type lock
    pub(crate) fn with_record<R>(&self, f: impl FnOnce(&CommonRecord) -> R) -> R {
        let index = self.index();
        match &self.guard {
            Some(guard) => f(&guard.records[index]),
            None => f(&self.table.state.lock().records[index]),
        }
    }

    /// Move a counted reference into a `HeldRef` without touching the count
    ///
    /// Only meaningful for `Refcount` tokens; other modes yield `None` and the
    /// token is dropped normally.
    pub fn transfer(mut self) -> Option<HeldRef> {
        if self.pending != Pending::ReleaseRef {
            return None;
        }
        self.pending = Pending::Nothing;
        Some(HeldRef { id: self.id })
    }

    /// Give back whatever this token holds without finalizing anything
    #[inline]
    pub fn release(self) {
        drop(self);
    }

    fn settle(&mut self) {
        let index = self.index();
        let pending = std::mem::replace(&mut self.pending, Pending::Nothing);
        match pending {
            Pending::Nothing => {}
            Pending::ReleaseRef => {
                let mut state = self.table.state.lock();
                let record = &mut state.records[index];
                record.refcount = record.refcount.saturating_sub(1);
                self.table.changed.notify_all();
            }
            Pending::AbortCreate => {
                if let Some(state) = self.guard.as_deref_mut() {
                    self.table.free(state, index);
                }
            }
            Pending::AbortDelete => {
                let mut state = self.table.state.lock();
                if state.records[index].state == SlotState::Deleting(self.id) {
                    self.table.activate(&mut state, index, self.id);
                }
            }
        }
    }
}

impl Drop for ObjectToken<'_> {
    fn drop(&mut self) {
        self.settle();
    }
}

impl std::fmt::Debug for ObjectToken<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectToken")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("locked", &self.guard.is_some())
            .finish()
    }
}
