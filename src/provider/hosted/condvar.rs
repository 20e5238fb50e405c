/*!
 * Condition Variable
 * A condition variable bundled with its own lock, usable across API calls
 */

use super::deadline;
use crate::core::errors::{OsalError, OsalResult};
use parking_lot::{Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

#[derive(Debug, Default)]
struct CondState {
    owner: Option<ThreadId>,
}

#[derive(Debug, Default)]
pub struct NativeCondVar {
    state: Mutex<CondState>,
    lock_cv: Condvar,
    signal_cv: Condvar,
}

impl NativeCondVar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> OsalResult<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner == Some(me) {
            return Err(OsalError::IncorrectObjState);
        }
        while state.owner.is_some() {
            self.lock_cv.wait(&mut state);
        }
        state.owner = Some(me);
        Ok(())
    }

    pub fn unlock(&self) -> OsalResult<()> {
        let mut state = self.state.lock();
        if state.owner != Some(thread::current().id()) {
            return Err(OsalError::IncorrectObjState);
        }
        state.owner = None;
        self.lock_cv.notify_one();
        Ok(())
    }

    pub fn signal(&self) {
        self.signal_cv.notify_one();
    }

    pub fn broadcast(&self) {
        self.signal_cv.notify_all();
    }

    /// Atomically release the lock and wait for a signal, then re-acquire
    ///
    /// As with any condition variable, wakeups may be spurious; callers
    /// re-check their predicate.
    pub fn wait(&self, wait: Option<Duration>) -> OsalResult<()> {
        let me = thread::current().id();
        let deadline = deadline(wait);
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(OsalError::IncorrectObjState);
        }

        state.owner = None;
        self.lock_cv.notify_one();

        let timed_out = match deadline {
            None => {
                self.signal_cv.wait(&mut state);
                false
            }
            Some(at) => self.signal_cv.wait_until(&mut state, at).timed_out(),
        };

        while state.owner.is_some() {
            self.lock_cv.wait(&mut state);
        }
        state.owner = Some(me);

        if timed_out {
            Err(OsalError::Timeout)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_wait_requires_lock() {
        let cv = NativeCondVar::new();
        assert_eq!(cv.wait(Some(Duration::ZERO)), Err(OsalError::IncorrectObjState));
    }

    #[test]
    fn test_timed_wait_reacquires() {
        let cv = NativeCondVar::new();
        cv.lock().unwrap();
        assert_eq!(
            cv.wait(Some(Duration::from_millis(10))),
            Err(OsalError::Timeout)
        );
        cv.unlock().unwrap();
    }

    #[test]
    fn test_signal_wakes_waiter() {
        let cv = Arc::new(NativeCondVar::new());
        let ready = Arc::new(AtomicBool::new(false));

        let waiter = {
            let cv = Arc::clone(&cv);
            let ready = Arc::clone(&ready);
            thread::spawn(move || {
                cv.lock().unwrap();
                while !ready.load(Ordering::SeqCst) {
                    cv.wait(Some(Duration::from_millis(100))).ok();
                }
                cv.unlock().unwrap();
            })
        };

        thread::sleep(Duration::from_millis(20));
        cv.lock().unwrap();
        ready.store(true, Ordering::SeqCst);
        cv.signal();
        cv.unlock().unwrap();
        waiter.join().unwrap();
    }
}
