/*!
 * Counting Semaphore
 */

use super::deadline;
use crate::core::errors::{OsalError, OsalResult};
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Largest value a counting semaphore may hold
pub const SEM_VALUE_MAX: u32 = i32::MAX as u32;

#[derive(Debug)]
struct CountSemState {
    count: u32,
    /// Set on delete; pending takers return instead of waiting on
    closed: bool,
}

#[derive(Debug)]
pub struct NativeCountSem {
    state: Mutex<CountSemState>,
    cv: Condvar,
}

impl NativeCountSem {
    pub fn new(initial: u32) -> OsalResult<Self> {
        if initial > SEM_VALUE_MAX {
            return Err(OsalError::InvalidSemValue);
        }
        Ok(Self {
            state: Mutex::new(CountSemState {
                count: initial,
                closed: false,
            }),
            cv: Condvar::new(),
        })
    }

    pub fn give(&self) -> OsalResult<()> {
        let mut state = self.state.lock();
        if state.count >= SEM_VALUE_MAX {
            return Err(OsalError::SemFailure);
        }
        state.count += 1;
        self.cv.notify_one();
        Ok(())
    }

    /// Wake every pending taker; later takes fail with `InvalidId`
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.cv.notify_all();
    }

    pub fn take(&self, wait: Option<Duration>) -> OsalResult<()> {
        let deadline = deadline(wait);
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(OsalError::InvalidId);
            }
            if state.count > 0 {
                break;
            }
            match deadline {
                None => self.cv.wait(&mut state),
                Some(at) => {
                    if self.cv.wait_until(&mut state, at).timed_out()
                        && state.count == 0
                        && !state.closed
                    {
                        return Err(OsalError::SemTimeout);
                    }
                }
            }
        }
        state.count -= 1;
        Ok(())
    }

    pub fn value(&self) -> i32 {
        self.state.lock().count as i32
    }
}
