/*!
 * Binary Semaphore
 */

use super::deadline;
use crate::core::errors::{OsalError, OsalResult};
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug)]
struct BinSemState {
    full: bool,
    /// Bumped by flush; waiters that see it change return without taking
    flush_count: u64,
}

/// Binary semaphore with flush support
#[derive(Debug)]
pub struct NativeBinSem {
    state: Mutex<BinSemState>,
    cv: Condvar,
}

impl NativeBinSem {
    pub fn new(initial: bool) -> Self {
        Self {
            state: Mutex::new(BinSemState {
                full: initial,
                flush_count: 0,
            }),
            cv: Condvar::new(),
        }
    }

    pub fn give(&self) {
        self.state.lock().full = true;
        self.cv.notify_one();
    }

    /// Release every task currently pending, leaving the value unchanged
    pub fn flush(&self) {
        self.state.lock().flush_count += 1;
        self.cv.notify_all();
    }

    pub fn take(&self, wait: Option<Duration>) -> OsalResult<()> {
        let deadline = deadline(wait);
        let mut state = self.state.lock();
        let flush_seen = state.flush_count;

        while !state.full {
            if state.flush_count != flush_seen {
                return Ok(());
            }
            match deadline {
                None => self.cv.wait(&mut state),
                Some(at) => {
                    if self.cv.wait_until(&mut state, at).timed_out()
                        && !state.full
                        && state.flush_count == flush_seen
                    {
                        return Err(OsalError::SemTimeout);
                    }
                }
            }
        }
        state.full = false;
        Ok(())
    }

    pub fn value(&self) -> i32 {
        i32::from(self.state.lock().full)
    }
}
