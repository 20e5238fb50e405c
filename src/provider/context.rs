/*!
 * Execution Context
 * Which OSAL object (task or timebase) the calling thread is running as
 */

use crate::core::id::{ObjectId, ObjectType};
use std::cell::Cell;

thread_local! {
    static CURRENT: Cell<ObjectId> = const { Cell::new(ObjectId::UNDEFINED) };
}

/// ID of the task or timebase the calling thread runs as
///
/// Threads not started by the OSAL report `UNDEFINED`.
#[inline]
pub fn current_id() -> ObjectId {
    CURRENT.with(Cell::get)
}

/// True when called from inside a timebase servicing context, i.e. from a
/// timer callback
#[inline]
pub fn in_timebase_context() -> bool {
    current_id().object_type() == ObjectType::TimeBase
}

/// Bind the calling thread to `id` until the guard drops
pub(crate) fn enter(id: ObjectId) -> ContextGuard {
    let previous = CURRENT.with(|c| c.replace(id));
    ContextGuard { previous }
}

/// Restores the previous context on drop
#[must_use]
pub(crate) struct ContextGuard {
    previous: ObjectId,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT.with(|c| c.set(self.previous));
    }
}
