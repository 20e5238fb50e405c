/*!
 * Provider Traits
 * Contracts the core consumes from a platform implementation
 */

use crate::core::errors::OsalResult;
use crate::core::id::ObjectId;

/// Source of timebase ticks
///
/// A servicing context calls `wait_tick` in a loop. The return value is the
/// elapsed time since the previous call, in the timebase's tick units
/// (microseconds for internally generated ticks). Zero means the wait was
/// interrupted without measurable progress.
#[cfg_attr(test, mockall::automock)]
pub trait TickSource: Send + Sync {
    /// Block until the next tick and report elapsed ticks
    fn wait_tick(&self, timebase_id: ObjectId) -> u32;

    /// Change the nominal start delay and period
    fn configure(&self, start_time: u32, interval_time: u32) -> OsalResult<()>;

    /// Wake any pending `wait_tick` and make later calls return 0
    fn shutdown(&self);

    /// Resolution of this source in microseconds
    fn accuracy_usec(&self) -> u32;

    /// Whether a pending `wait_tick` returns promptly after `shutdown`
    ///
    /// Sources driven by foreign code may not, in which case the servicing
    /// context is detached rather than joined.
    fn interruptible(&self) -> bool {
        true
    }
}

/// Function polled by an externally synchronized timebase
pub type ExternalSync = std::sync::Arc<dyn Fn(ObjectId) -> u32 + Send + Sync>;
