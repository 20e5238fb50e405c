/*!
 * Hosted Provider
 *
 * Native primitives for a hosted (POSIX-like) environment: OSAL tasks are
 * OS threads, semaphores and locks are built from `parking_lot` mutexes and
 * condition variables, queues are `flume` channels, and internal timebase
 * ticks come from the monotonic clock.
 *
 * Blocking operations take `Option<Duration>`: `None` waits forever and
 * `Some(Duration::ZERO)` polls.
 */

mod binsem;
mod condvar;
mod countsem;
mod mutex;
mod queue;
mod rwlock;
mod task;
mod tick;

pub use binsem::NativeBinSem;
pub use condvar::NativeCondVar;
pub use countsem::NativeCountSem;
pub use mutex::NativeMutex;
pub use queue::NativeQueue;
pub use rwlock::NativeRwLock;
pub use task::{NativeTask, TaskEntry};
pub use tick::{ExternalTickSource, IntervalTickSource};

use std::time::{Duration, Instant};

/// Absolute deadline for a relative wait bound
#[inline]
pub(crate) fn deadline(wait: Option<Duration>) -> Option<Instant> {
    wait.map(|d| Instant::now() + d)
}
