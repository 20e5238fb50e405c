/*!
 * Message Queue
 * Bounded FIFO of byte messages backed by a flume channel
 */

use crate::core::errors::{OsalError, OsalResult};
use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use std::time::Duration;

/// Bounded message queue
///
/// Closing drops the only sender, so every pending `get` wakes with the
/// channel disconnected and reports the queue as gone.
#[derive(Debug)]
pub struct NativeQueue {
    tx: Mutex<Option<Sender<Vec<u8>>>>,
    rx: Receiver<Vec<u8>>,
    depth: usize,
    max_size: usize,
}

impl NativeQueue {
    pub fn new(depth: usize, max_size: usize) -> Self {
        let (tx, rx) = flume::bounded(depth);
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
            depth,
            max_size,
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Enqueue without blocking
    pub fn put(&self, data: &[u8]) -> OsalResult<()> {
        if data.len() > self.max_size {
            return Err(OsalError::QueueInvalidSize);
        }
        let tx = self.tx.lock();
        let tx = tx.as_ref().ok_or(OsalError::InvalidId)?;
        tx.try_send(data.to_vec()).map_err(|e| match e {
            TrySendError::Full(_) => OsalError::QueueFull,
            TrySendError::Disconnected(_) => OsalError::InvalidId,
        })
    }

    /// Refuse further messages and wake every pending reader
    pub fn close(&self) {
        self.tx.lock().take();
    }

    /// Dequeue into `buffer`, returning the message length
    ///
    /// The buffer must be able to hold the queue's largest message.
    pub fn get(&self, buffer: &mut [u8], wait: Option<Duration>) -> OsalResult<usize> {
        if buffer.len() < self.max_size {
            return Err(OsalError::QueueInvalidSize);
        }
        let message = match wait {
            Some(d) if d.is_zero() => self.rx.try_recv().map_err(|e| match e {
                TryRecvError::Empty => OsalError::QueueEmpty,
                TryRecvError::Disconnected => OsalError::InvalidId,
            })?,
            Some(d) => self.rx.recv_timeout(d).map_err(|e| match e {
                RecvTimeoutError::Timeout => OsalError::QueueTimeout,
                RecvTimeoutError::Disconnected => OsalError::InvalidId,
            })?,
            None => self.rx.recv().map_err(|_| OsalError::InvalidId)?,
        };
        buffer[..message.len()].copy_from_slice(&message);
        Ok(message.len())
    }
}
