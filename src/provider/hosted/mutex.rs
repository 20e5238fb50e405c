/*!
 * Recursive Mutex
 * Ownership-checked, recursive mutual exclusion that can span API calls
 */

use crate::core::errors::{OsalError, OsalResult};
use parking_lot::{Condvar, Mutex};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct Ownership {
    owner: Option<ThreadId>,
    depth: u32,
}

#[derive(Debug, Default)]
pub struct NativeMutex {
    state: Mutex<Ownership>,
    cv: Condvar,
}

impl NativeMutex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while matches!(state.owner, Some(owner) if owner != me) {
            self.cv.wait(&mut state);
        }
        state.owner = Some(me);
        state.depth += 1;
    }

    /// Release one level; only the owning thread may give
    pub fn give(&self) -> OsalResult<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(OsalError::SemFailure);
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            self.cv.notify_one();
        }
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_recursive() {
        let m = NativeMutex::new();
        m.take();
        m.take();
        m.give().unwrap();
        assert!(m.is_locked());
        m.give().unwrap();
        assert!(!m.is_locked());
    }

    #[test]
    fn test_give_by_non_owner_fails() {
        let m = Arc::new(NativeMutex::new());
        m.take();
        let other = Arc::clone(&m);
        let result = thread::spawn(move || other.give()).join().unwrap();
        assert_eq!(result, Err(OsalError::SemFailure));
        m.give().unwrap();
    }
}
