/*!
 * Impl Tables
 * Per-type native state, indexed by the same slot as the registry record
 */

use crate::core::errors::{OsalError, OsalResult};
use crate::idmap::ObjectToken;
use parking_lot::Mutex;
use std::sync::Arc;

/// Parallel table of native objects
///
/// Slots are written only while the caller holds a creating or deleting
/// token for the same index, so a slot never changes under a valid lookup.
/// Entries are reference counted: a blocking operation clones the `Arc` and
/// drops the registry lock before it waits, and a concurrent delete merely
/// detaches the entry.
pub struct ImplTable<T> {
    slots: Box<[Mutex<Option<Arc<T>>>]>,
}

impl<T> ImplTable<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Store native state for a slot being created
    pub fn install(&self, token: &ObjectToken<'_>, native: T) -> OsalResult<Arc<T>> {
        let slot = self.slot(token.index())?;
        let native = Arc::new(native);
        *slot.lock() = Some(Arc::clone(&native));
        Ok(native)
    }

    /// Native state for a validated token
    pub fn get(&self, token: &ObjectToken<'_>) -> OsalResult<Arc<T>> {
        self.slot(token.index())?
            .lock()
            .clone()
            .ok_or(OsalError::InvalidId)
    }

    /// Detach native state from a slot being deleted
    pub fn take(&self, token: &ObjectToken<'_>) -> Option<Arc<T>> {
        self.slots.get(token.index()).and_then(|s| s.lock().take())
    }

    /// Peek by raw index (teardown and diagnostics)
    pub fn get_index(&self, index: usize) -> Option<Arc<T>> {
        self.slots.get(index).and_then(|s| s.lock().clone())
    }

    fn slot(&self, index: usize) -> OsalResult<&Mutex<Option<Arc<T>>>> {
        self.slots.get(index).ok_or(OsalError::InvalidId)
    }
}
