/*!
 * Core Module
 * Identifiers, errors, limits and configuration shared by every layer
 */

pub mod config;
pub mod errors;
pub mod id;
pub mod limits;
pub mod name;
pub mod time;

// Re-export for convenience
pub use config::{ObjectLimits, OsalConfig};
pub use errors::{status_of, OsalError, OsalResult, OS_SUCCESS};
pub use id::{DecodedId, ObjectId, ObjectType};
pub use name::ObjectName;
pub use time::{milli_to_ticks, ticks_to_duration, Timeout};
