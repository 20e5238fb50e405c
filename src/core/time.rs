/*!
 * Time Conversion
 * Millisecond timeouts to native ticks with a single rounding rule
 */

use super::errors::{OsalError, OsalResult};
use super::limits::MAX_TIMEOUT_TICKS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Blocking behavior for take/get style operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "ms")]
pub enum Timeout {
    /// Block until the operation completes
    Pend,
    /// Do not block at all
    Check,
    /// Block for at most this many milliseconds
    Millis(u32),
}

impl Timeout {
    /// Resolve to a wait bound, rounded to whole ticks
    ///
    /// `None` means wait forever.
    pub fn to_wait(self, ticks_per_second: u32) -> OsalResult<Option<Duration>> {
        match self {
            Timeout::Pend => Ok(None),
            Timeout::Check => Ok(Some(Duration::ZERO)),
            Timeout::Millis(ms) => {
                let ticks = milli_to_ticks(ms, ticks_per_second)?;
                Ok(Some(ticks_to_duration(ticks, ticks_per_second)))
            }
        }
    }
}

/// Convert milliseconds to ticks: ceil(ms * ticks_per_second / 1000)
///
/// Results above `i32::MAX` ticks are an error rather than being truncated.
pub fn milli_to_ticks(ms: u32, ticks_per_second: u32) -> OsalResult<u32> {
    let ticks = (u64::from(ms) * u64::from(ticks_per_second) + 999) / 1000;
    if ticks > MAX_TIMEOUT_TICKS {
        return Err(OsalError::InvalidArgument(format!(
            "{}ms is {} ticks, above the {} tick limit",
            ms, ticks, MAX_TIMEOUT_TICKS
        )));
    }
    Ok(ticks as u32)
}

/// Wall-clock span of a tick count
pub fn ticks_to_duration(ticks: u32, ticks_per_second: u32) -> Duration {
    let tps = u64::from(ticks_per_second.max(1));
    Duration::from_micros(u64::from(ticks) * 1_000_000 / tps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_up() {
        assert_eq!(milli_to_ticks(1, 100).unwrap(), 1);
        assert_eq!(milli_to_ticks(10, 100).unwrap(), 1);
        assert_eq!(milli_to_ticks(11, 100).unwrap(), 2);
        assert_eq!(milli_to_ticks(0, 100).unwrap(), 0);
    }

    #[test]
    fn test_overflow_is_error() {
        assert!(milli_to_ticks(u32::MAX, 1_000_000).is_err());
        assert!(milli_to_ticks(u32::MAX, 100).is_ok());
    }

    #[test]
    fn test_to_wait_uses_tick_granularity() {
        let wait = Timeout::Millis(15).to_wait(100).unwrap();
        assert_eq!(wait, Some(Duration::from_millis(20)));
        assert_eq!(Timeout::Pend.to_wait(100).unwrap(), None);
        assert_eq!(Timeout::Check.to_wait(100).unwrap(), Some(Duration::ZERO));
    }
}
