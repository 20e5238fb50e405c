/*!
 * Object APIs
 *
 * Public per-type operations layered on the registry and the hosted
 * provider. Every type follows the same shape:
 *
 * - create: reserve a slot, build the native object while the slot is
 *   reserved, then publish (or roll back on failure)
 * - operate: validate the ID, clone the native handle and release the
 *   registry before any blocking wait
 * - delete: claim the slot exclusively, tear down native state, free the slot
 */

mod binsem;
mod condvar;
mod countsem;
mod mutex;
mod queue;
mod rwlock;
mod task;

pub use binsem::BinSemInfo;
pub use condvar::CondVarInfo;
pub use countsem::CountSemInfo;
pub use mutex::MutexInfo;
pub use queue::QueueInfo;
pub use rwlock::RwLockInfo;
pub use task::TaskInfo;

use crate::api::Osal;
use crate::core::errors::{OsalError, OsalResult};
use crate::core::id::{ObjectId, ObjectType};
use crate::core::time::Timeout;
use crate::idmap::{LockMode, ObjectToken};
use crate::provider::ImplTable;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

impl Osal {
    /// Two-phase create: `build` runs while the new slot is reserved
    pub(crate) fn create_object<T, B>(
        &self,
        table: &ImplTable<T>,
        object_type: ObjectType,
        name: &str,
        build: B,
    ) -> OsalResult<(ObjectId, Arc<T>)>
    where
        B: FnOnce(&ObjectToken<'_>) -> OsalResult<T>,
    {
        let registry = &self.inner.registry;
        let token = registry.allocate_new(object_type, Some(name))?;
        let built = build(&token).and_then(|native| table.install(&token, native));
        let status = built.as_ref().map(|_| ()).map_err(OsalError::clone);
        let id = registry.finalize_new(status, token)?;
        debug!(%id, %object_type, name, "object created");
        built.map(|native| (id, native))
    }

    /// Native handle for an active object; the registry is not held
    pub(crate) fn lookup<T>(
        &self,
        table: &ImplTable<T>,
        object_type: ObjectType,
        id: ObjectId,
    ) -> OsalResult<Arc<T>> {
        let token = self
            .inner
            .registry
            .get_by_id(LockMode::None, object_type, id)?;
        table.get(&token)
    }

    /// Two-phase delete: `teardown` may veto, leaving the object intact
    pub(crate) fn destroy_object<T, D>(
        &self,
        table: &ImplTable<T>,
        object_type: ObjectType,
        id: ObjectId,
        teardown: D,
    ) -> OsalResult<()>
    where
        D: FnOnce(&T) -> OsalResult<()>,
    {
        let registry = &self.inner.registry;
        let token = registry.get_by_id(LockMode::Exclusive, object_type, id)?;
        let result = table.get(&token).and_then(|native| teardown(&native));
        if result.is_ok() {
            table.take(&token);
        }
        registry.finalize_delete(result, token)?;
        debug!(%id, %object_type, "object deleted");
        Ok(())
    }

    /// Resolve a timeout to a wait bound in system ticks
    #[inline]
    pub(crate) fn wait_bound(&self, timeout: Timeout) -> OsalResult<Option<Duration>> {
        timeout.to_wait(self.inner.config.ticks_per_second)
    }
}
