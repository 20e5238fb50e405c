/*!
 * System Limits and Constants
 *
 * Centralized location for table capacities, thresholds, and magic numbers.
 * Organized by domain. Runtime-adjustable values live in `OsalConfig` and use
 * these as defaults.
 */

use std::time::Duration;

// =============================================================================
// OBJECT TABLE CAPACITIES
// =============================================================================

pub const DEFAULT_MAX_TASKS: usize = 64;
pub const DEFAULT_MAX_QUEUES: usize = 64;
pub const DEFAULT_MAX_BIN_SEMAPHORES: usize = 32;
pub const DEFAULT_MAX_COUNT_SEMAPHORES: usize = 32;
pub const DEFAULT_MAX_MUTEXES: usize = 32;
pub const DEFAULT_MAX_CONDVARS: usize = 16;
pub const DEFAULT_MAX_RWLOCKS: usize = 16;
pub const DEFAULT_MAX_TIMEBASES: usize = 16;
pub const DEFAULT_MAX_TIMERS: usize = 32;
pub const DEFAULT_MAX_MODULES: usize = 20;
pub const DEFAULT_MAX_OPEN_FILES: usize = 50;
pub const DEFAULT_MAX_OPEN_DIRS: usize = 4;
pub const DEFAULT_MAX_FILE_SYSTEMS: usize = 14;
pub const DEFAULT_MAX_CONSOLES: usize = 1;

// =============================================================================
// NAMES
// =============================================================================

/// Maximum object name length in characters
/// Matches an API name buffer of 20 bytes including the terminator
pub const DEFAULT_MAX_NAME_LEN: usize = 19;

// =============================================================================
// TIME
// =============================================================================

/// Default system tick rate
pub const DEFAULT_TICKS_PER_SECOND: u32 = 100;

/// Upper bound (exclusive) for timer start/interval values in microseconds
/// Leaves headroom for signed arithmetic on wait times
pub const TIMER_MAX_ARG: u32 = u32::MAX / 2;

/// Maximum tick count a millisecond timeout may convert to
pub const MAX_TIMEOUT_TICKS: u64 = i32::MAX as u64;

// =============================================================================
// TIMEBASE SERVICING
// =============================================================================

/// Consecutive zero-tick readings tolerated before the servicing loop backs off
pub const TIMEBASE_SPIN_LIMIT: u32 = 10;

/// Back-off applied once the spin limit is reached
pub const TIMEBASE_SPIN_DELAY: Duration = Duration::from_millis(10);

// =============================================================================
// LIFECYCLE
// =============================================================================

/// How long EXCLUSIVE acquisition waits for outstanding references to drain
pub const DEFAULT_OBJECT_WAIT_TIMEOUT: Duration = Duration::from_millis(500);

/// Passes made by DeleteAllObjects before giving up on stubborn objects
pub const DEFAULT_DELETE_ALL_ATTEMPTS: u32 = 5;

/// Pause between DeleteAllObjects passes
pub const DELETE_ALL_RETRY_DELAY: Duration = Duration::from_millis(5);

// =============================================================================
// QUEUES
// =============================================================================

/// Deepest queue that may be created
pub const DEFAULT_QUEUE_MAX_DEPTH: usize = 1000;

/// Largest message a queue may be configured to carry (64KB)
pub const MAX_QUEUE_MESSAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// TASKS
// =============================================================================

/// Lowest permitted stack size for hosted threads
pub const MIN_TASK_STACK_SIZE: usize = 16 * 1024;
