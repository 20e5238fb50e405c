/*!
 * Resource Table Registry
 *
 * The single authority on whether an ID exists and which slot it names.
 *
 * # Architecture
 *
 * One fixed-capacity table per resource type, each behind its own type lock,
 * plus a registry-wide lock that whole-registry operations take exclusively
 * and structural changes (create, delete) take shared. Lock ordering is
 * always registry lock before type lock.
 *
 * Creation is two-phase: `allocate_new` reserves a slot and keeps the type
 * lock held in the returned token while the caller builds the native object;
 * `finalize_new` then publishes the ID or rolls the reservation back.
 * Deletion mirrors this with `get_by_id(Exclusive)` and `finalize_delete`.
 * An EXCLUSIVE token claims its slot by state (Deleting, published as
 * RESERVED) rather than by holding the type lock: timer callbacks run under
 * a timebase lock and may call back into the registry, so no registry lock
 * is ever held while a timebase lock is taken.
 */

mod iter;
mod table;
mod token;

pub use iter::CreatorFilter;
pub use token::{HeldRef, LockMode, ObjectToken};

use crate::core::errors::{OsalError, OsalResult};
use crate::core::id::{ObjectId, ObjectType};
use crate::core::name::ObjectName;
use crate::core::OsalConfig;
use crate::provider::context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use table::{ObjectTable, SlotState};
use token::Pending;
use tracing::trace;

/// Name and ownership common to every object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonInfo {
    pub id: ObjectId,
    pub name: String,
    pub creator: ObjectId,
}

/// The process-wide object registry
pub struct Registry {
    global: RwLock<()>,
    tables: Box<[ObjectTable]>,
    max_name_len: usize,
    object_wait_timeout: Duration,
    initialized: AtomicBool,
}

impl Registry {
    pub fn new(config: &OsalConfig) -> Self {
        let tables = ObjectType::ALL
            .iter()
            .map(|&t| ObjectTable::new(t, config.limits.capacity(t)))
            .collect();
        Self {
            global: RwLock::new(()),
            tables,
            max_name_len: config.max_name_len,
            object_wait_timeout: config.object_wait_timeout,
            initialized: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_initialized(&self, on: bool) {
        self.initialized.store(on, Ordering::Release);
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    #[inline]
    pub fn max_name_len(&self) -> usize {
        self.max_name_len
    }

    fn table(&self, object_type: ObjectType) -> OsalResult<&ObjectTable> {
        // ALL is ordered by tag starting at 1
        match object_type {
            ObjectType::Undefined => Err(OsalError::InvalidId),
            t => self
                .tables
                .get(t.as_raw() as usize - 1)
                .ok_or(OsalError::InvalidId),
        }
    }

    /// Capacity of one type's table
    pub fn capacity(&self, object_type: ObjectType) -> usize {
        self.table(object_type).map_or(0, ObjectTable::capacity)
    }

    // ------------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------------

    /// Reserve a slot for a new object
    ///
    /// The returned token holds the type lock until `finalize_new`, so a
    /// concurrent create of the same name serializes behind it.
    pub fn allocate_new(
        &self,
        object_type: ObjectType,
        name: Option<&str>,
    ) -> OsalResult<ObjectToken<'_>> {
        if !self.is_initialized() {
            return Err(OsalError::NotInitialized);
        }
        let name = name
            .map(|n| ObjectName::checked(n, self.max_name_len))
            .transpose()?;
        let table = self.table(object_type)?;

        let global = self.global.read();
        let mut state = table.state.lock();

        if let Some(n) = &name {
            if state.find_name(n.as_str()).is_some() {
                return Err(OsalError::NameTaken);
            }
        }
        let index = state.find_free().ok_or(OsalError::NoFreeIds)?;
        let id = table.reserve(&mut state, index, name, context::current_id());

        trace!(%id, %object_type, index, "slot reserved");
        Ok(ObjectToken {
            table,
            id,
            mode: LockMode::Exclusive,
            pending: Pending::AbortCreate,
            guard: Some(state),
            _global: Some(global),
        })
    }

    /// Publish a reserved slot, or roll it back if the native create failed
    pub fn finalize_new(
        &self,
        result: OsalResult<()>,
        mut token: ObjectToken<'_>,
    ) -> OsalResult<ObjectId> {
        result?;
        let id = token.id;
        let index = token.index();
        if let Some(state) = token.guard.as_deref_mut() {
            token.table.activate(state, index, id);
        }
        token.pending = Pending::Nothing;
        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Validate `id` as an active object of `object_type` and acquire `mode`
    pub fn get_by_id(
        &self,
        mode: LockMode,
        object_type: ObjectType,
        id: ObjectId,
    ) -> OsalResult<ObjectToken<'_>> {
        if !id.is_defined() || id.object_type() != object_type {
            return Err(OsalError::InvalidId);
        }
        let table = self.table(object_type)?;
        let index = id.index();
        if index >= table.capacity() {
            return Err(OsalError::InvalidId);
        }

        let mut state = table.state.lock();
        if state.records[index].active_id() != Some(id) {
            return Err(OsalError::InvalidId);
        }

        let mut token = ObjectToken {
            table,
            id,
            mode,
            pending: Pending::Nothing,
            guard: None,
            _global: None,
        };

        match mode {
            LockMode::None => {}
            LockMode::Global => token.guard = Some(state),
            LockMode::Refcount => {
                state.records[index].refcount += 1;
                token.pending = Pending::ReleaseRef;
            }
            LockMode::Exclusive => {
                let deadline = Instant::now() + self.object_wait_timeout;
                while state.records[index].refcount > 0 {
                    if table.changed.wait_until(&mut state, deadline).timed_out()
                        && state.records[index].refcount > 0
                    {
                        return Err(OsalError::ObjectInUse);
                    }
                    if state.records[index].active_id() != Some(id) {
                        return Err(OsalError::InvalidId);
                    }
                }
                // The Deleting state is the claim; no lock is kept, so the
                // holder may take a timebase lock without inverting order.
                state.records[index].state = SlotState::Deleting(id);
                table.publish(index, ObjectId::RESERVED);
                token.pending = Pending::AbortDelete;
            }
        }
        Ok(token)
    }

    /// Find an active object by name
    pub fn find_by_name(&self, object_type: ObjectType, name: &str) -> OsalResult<ObjectId> {
        if name.len() > self.max_name_len {
            return Err(OsalError::NameTooLong);
        }
        let table = self.table(object_type)?;
        let state = table.state.lock();
        state
            .records
            .iter()
            .filter(|r| r.holds_name(name))
            .find_map(|r| r.active_id())
            .ok_or(OsalError::NameNotFound)
    }

    /// Lock-free read of the identity currently published for a slot
    ///
    /// Returns `UNDEFINED` for free slots and `RESERVED` for slots mid-create
    /// or mid-delete.
    #[inline]
    pub fn published_id(&self, object_type: ObjectType, index: usize) -> ObjectId {
        self.table(object_type)
            .map_or(ObjectId::UNDEFINED, |t| t.published(index))
    }

    /// True while `id` names an active object
    #[inline]
    pub fn is_active(&self, id: ObjectId) -> bool {
        id.is_defined() && self.published_id(id.object_type(), id.index()) == id
    }

    /// Validated ID to table index conversion
    pub fn convert_to_index(&self, object_type: ObjectType, id: ObjectId) -> OsalResult<usize> {
        self.get_by_id(LockMode::None, object_type, id)
            .map(|token| token.index())
    }

    /// Name and creator of an active object
    pub fn common_info(&self, object_type: ObjectType, id: ObjectId) -> OsalResult<CommonInfo> {
        let token = self.get_by_id(LockMode::Global, object_type, id)?;
        Ok(token.with_record(|r| CommonInfo {
            id,
            name: r.name.as_ref().map(|n| n.to_string()).unwrap_or_default(),
            creator: r.creator,
        }))
    }

    /// Number of active objects of one type
    pub fn active_count(&self, object_type: ObjectType) -> usize {
        self.table(object_type)
            .map_or(0, |t| t.state.lock().active_count())
    }

    // ------------------------------------------------------------------------
    // Deletion and release
    // ------------------------------------------------------------------------

    /// Free an EXCLUSIVE slot, or restore it if the native delete failed
    ///
    /// On success every previously issued ID for the slot is permanently
    /// invalid.
    pub fn finalize_delete(
        &self,
        result: OsalResult<()>,
        mut token: ObjectToken<'_>,
    ) -> OsalResult<()> {
        result?;
        if token.pending != Pending::AbortDelete {
            return Err(OsalError::IncorrectObjState);
        }
        let index = token.index();
        {
            let mut state = token.table.state.lock();
            if state.records[index].state == SlotState::Deleting(token.id) {
                token.table.free(&mut state, index);
            }
        }
        token.pending = Pending::Nothing;
        trace!(id = %token.id, "slot freed");
        Ok(())
    }

    /// Return a reference previously moved out with `ObjectToken::transfer`
    pub fn release_held(&self, held: HeldRef) {
        if let Ok(table) = self.table(held.id.object_type()) {
            let mut state = table.state.lock();
            let record = &mut state.records[held.id.index()];
            record.refcount = record.refcount.saturating_sub(1);
            table.changed.notify_all();
        }
    }

    /// Current reference count of an active object
    pub fn refcount(&self, object_type: ObjectType, id: ObjectId) -> OsalResult<u32> {
        let token = self.get_by_id(LockMode::Global, object_type, id)?;
        Ok(token.with_record(|r| r.refcount))
    }
}
