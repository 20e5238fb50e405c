/*!
 * OSAL Core Library
 * Object registry, timebase engine and hosted primitives behind one API
 */

pub mod api;
pub mod core;
pub mod idmap;
pub mod monitoring;
pub mod objects;
pub mod provider;
pub mod timebase;
pub mod timer;

// Re-exports
pub use api::Osal;
pub use core::{
    status_of, DecodedId, ObjectId, ObjectLimits, ObjectName, ObjectType, OsalConfig, OsalError,
    OsalResult, Timeout, OS_SUCCESS,
};
pub use idmap::{CommonInfo, CreatorFilter, LockMode, Registry};
pub use monitoring::init_tracing;
pub use objects::{
    BinSemInfo, CondVarInfo, CountSemInfo, MutexInfo, QueueInfo, RwLockInfo, TaskInfo,
};
pub use provider::{ExternalSync, TickSource};
pub use timebase::{TimeBaseInfo, TimerCallback};
pub use timer::TimerInfo;
