/*!
 * Error Types
 * Centralized OSAL status taxonomy with thiserror, miette and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified OSAL error type with miette diagnostics
///
/// Every core operation returns one of these rather than panicking; callers
/// are expected to propagate it verbatim to the original API caller.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum OsalError {
    #[error("Invalid pointer or missing argument")]
    #[diagnostic(
        code(osal::invalid_pointer),
        help("A required output or input argument was not supplied.")
    )]
    InvalidPointer,

    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(osal::invalid_argument),
        help("An argument was outside its permitted range.")
    )]
    InvalidArgument(String),

    #[error("Invalid size: {0}")]
    #[diagnostic(code(osal::invalid_size))]
    InvalidSize(String),

    #[error("Name too long")]
    #[diagnostic(
        code(osal::name_too_long),
        help("Object names must be shorter than the configured maximum API name length.")
    )]
    NameTooLong,

    #[error("Name already taken")]
    #[diagnostic(
        code(osal::name_taken),
        help("Another active object of the same type already uses this name.")
    )]
    NameTaken,

    #[error("Name not found")]
    #[diagnostic(code(osal::name_not_found))]
    NameNotFound,

    #[error("No free object IDs")]
    #[diagnostic(
        code(osal::no_free_ids),
        help("The table for this object type is full. Delete unused objects or raise the limit.")
    )]
    NoFreeIds,

    #[error("Invalid object ID")]
    #[diagnostic(
        code(osal::invalid_id),
        help("The ID is undefined, of the wrong type, out of range, or refers to a deleted object.")
    )]
    InvalidId,

    #[error("Incorrect object state")]
    #[diagnostic(
        code(osal::incorrect_obj_state),
        help("The operation is not permitted in the current context, e.g. from within a timer callback.")
    )]
    IncorrectObjState,

    #[error("Object in use")]
    #[diagnostic(
        code(osal::object_in_use),
        help("Other objects still hold references to this one. Delete them first.")
    )]
    ObjectInUse,

    #[error("Operation timed out")]
    #[diagnostic(code(osal::timeout))]
    Timeout,

    #[error("Semaphore failure")]
    #[diagnostic(code(osal::sem_failure))]
    SemFailure,

    #[error("Semaphore take timed out")]
    #[diagnostic(code(osal::sem_timeout))]
    SemTimeout,

    #[error("Invalid semaphore value")]
    #[diagnostic(code(osal::invalid_sem_value))]
    InvalidSemValue,

    #[error("Queue empty")]
    #[diagnostic(code(osal::queue_empty))]
    QueueEmpty,

    #[error("Queue full")]
    #[diagnostic(code(osal::queue_full))]
    QueueFull,

    #[error("Queue receive timed out")]
    #[diagnostic(code(osal::queue_timeout))]
    QueueTimeout,

    #[error("Invalid queue message size")]
    #[diagnostic(
        code(osal::queue_invalid_size),
        help("The message does not fit the queue's maximum message size or the receive buffer.")
    )]
    QueueInvalidSize,

    #[error("Invalid timer arguments")]
    #[diagnostic(
        code(osal::timer_invalid_args),
        help("Start and interval must each be below 2^31 and must not both be zero.")
    )]
    TimerInvalidArgs,

    #[error("OSAL not initialized")]
    #[diagnostic(
        code(osal::not_initialized),
        help("Call Osal::init() before creating objects, and do not use a torn-down context.")
    )]
    NotInitialized,

    #[error("Not implemented")]
    #[diagnostic(code(osal::not_implemented))]
    NotImplemented,

    #[error("OS failure: {0}")]
    #[diagnostic(
        code(osal::os_failure),
        help("The underlying native call failed for a reason the abstraction cannot classify.")
    )]
    OsFailure(String),
}

impl OsalError {
    /// Classic numeric OSAL status code for this error
    pub const fn status_code(&self) -> i32 {
        match self {
            OsalError::OsFailure(_) | OsalError::NotInitialized => -1,
            OsalError::InvalidPointer => -2,
            OsalError::Timeout => -4,
            OsalError::SemFailure => -6,
            OsalError::SemTimeout => -7,
            OsalError::QueueEmpty => -8,
            OsalError::QueueFull => -9,
            OsalError::QueueTimeout => -10,
            OsalError::QueueInvalidSize => -11,
            OsalError::NameTooLong => -13,
            OsalError::NoFreeIds => -14,
            OsalError::NameTaken => -15,
            OsalError::InvalidId => -16,
            OsalError::NameNotFound => -17,
            OsalError::InvalidSemValue => -20,
            OsalError::NotImplemented => -28,
            OsalError::TimerInvalidArgs => -29,
            OsalError::ObjectInUse => -33,
            OsalError::IncorrectObjState => -35,
            OsalError::InvalidSize(_) => -40,
            OsalError::InvalidArgument(_) => -42,
        }
    }

    /// True for any of the timeout flavours
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            OsalError::Timeout | OsalError::SemTimeout | OsalError::QueueTimeout
        )
    }
}

/// Status value for successful operations
pub const OS_SUCCESS: i32 = 0;

/// Convert a result into the classic status integer
pub fn status_of<T>(result: &OsalResult<T>) -> i32 {
    match result {
        Ok(_) => OS_SUCCESS,
        Err(e) => e.status_code(),
    }
}

/// Result type for OSAL operations
///
/// # Must Use
/// OSAL operations can fail and must be handled to prevent resource leaks
pub type OsalResult<T> = std::result::Result<T, OsalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = OsalError::OsFailure("pthread_create".into());
        let json = serde_json::to_string(&error).unwrap();
        let deserialized: OsalError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, deserialized);
    }

    #[test]
    fn test_status_codes_are_negative_and_stable() {
        assert_eq!(OsalError::InvalidId.status_code(), -16);
        assert_eq!(OsalError::NameTaken.status_code(), -15);
        assert_eq!(OsalError::NoFreeIds.status_code(), -14);
        assert_eq!(OsalError::TimerInvalidArgs.status_code(), -29);
        assert_eq!(OsalError::IncorrectObjState.status_code(), -35);
    }

    #[test]
    fn test_status_of() {
        let ok: OsalResult<u32> = Ok(3);
        let err: OsalResult<u32> = Err(OsalError::QueueEmpty);
        assert_eq!(status_of(&ok), OS_SUCCESS);
        assert_eq!(status_of(&err), -8);
    }

    #[test]
    fn test_timeout_classification() {
        assert!(OsalError::SemTimeout.is_timeout());
        assert!(OsalError::QueueTimeout.is_timeout());
        assert!(!OsalError::QueueEmpty.is_timeout());
    }

    #[test]
    fn test_display() {
        assert_eq!(OsalError::NameTaken.to_string(), "Name already taken");
    }
}
