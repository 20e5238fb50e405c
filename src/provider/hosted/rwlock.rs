/*!
 * Read-Write Lock
 * Writer-exclusive lock whose acquire and release are separate API calls
 */

use crate::core::errors::{OsalError, OsalResult};
use parking_lot::{Condvar, Mutex};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct RwState {
    readers: u32,
    writer: Option<ThreadId>,
}

#[derive(Debug, Default)]
pub struct NativeRwLock {
    state: Mutex<RwState>,
    cv: Condvar,
}

impl NativeRwLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_lock(&self) {
        let mut state = self.state.lock();
        while state.writer.is_some() {
            self.cv.wait(&mut state);
        }
        state.readers += 1;
    }

    pub fn read_unlock(&self) -> OsalResult<()> {
        let mut state = self.state.lock();
        if state.readers == 0 {
            return Err(OsalError::IncorrectObjState);
        }
        state.readers -= 1;
        if state.readers == 0 {
            self.cv.notify_all();
        }
        Ok(())
    }

    pub fn write_lock(&self) -> OsalResult<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.writer == Some(me) {
            return Err(OsalError::IncorrectObjState);
        }
        while state.writer.is_some() || state.readers > 0 {
            self.cv.wait(&mut state);
        }
        state.writer = Some(me);
        Ok(())
    }

    pub fn write_unlock(&self) -> OsalResult<()> {
        let mut state = self.state.lock();
        if state.writer != Some(thread::current().id()) {
            return Err(OsalError::IncorrectObjState);
        }
        state.writer = None;
        self.cv.notify_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_multiple_readers() {
        let lock = NativeRwLock::new();
        lock.read_lock();
        lock.read_lock();
        lock.read_unlock().unwrap();
        lock.read_unlock().unwrap();
        assert_eq!(lock.read_unlock(), Err(OsalError::IncorrectObjState));
    }

    #[test]
    fn test_writer_waits_for_readers() {
        let lock = Arc::new(NativeRwLock::new());
        lock.read_lock();
        let writer = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                lock.write_lock().unwrap();
                lock.write_unlock().unwrap();
            })
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!writer.is_finished());
        lock.read_unlock().unwrap();
        writer.join().unwrap();
    }
}
