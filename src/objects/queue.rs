/*!
 * Message Queues
 */

use crate::api::Osal;
use crate::core::errors::{OsalError, OsalResult};
use crate::core::id::{ObjectId, ObjectType};
use crate::core::limits::MAX_QUEUE_MESSAGE_SIZE;
use crate::core::time::Timeout;
use crate::provider::hosted::NativeQueue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub name: String,
    pub creator: ObjectId,
    pub depth: usize,
    pub max_size: usize,
    pub count: usize,
}

impl Osal {
    /// Create a queue holding up to `depth` messages of at most `max_size`
    /// bytes
    pub fn queue_create(&self, name: &str, depth: usize, max_size: usize) -> OsalResult<ObjectId> {
        if depth == 0 || depth > self.inner.config.queue_max_depth {
            return Err(OsalError::QueueInvalidSize);
        }
        if max_size == 0 || max_size > MAX_QUEUE_MESSAGE_SIZE {
            return Err(OsalError::InvalidSize(format!(
                "message size must be in 1..={}, got {}",
                MAX_QUEUE_MESSAGE_SIZE, max_size
            )));
        }
        let shared = &self.inner;
        self.create_object(&shared.queues, ObjectType::Queue, name, |_| {
            Ok(NativeQueue::new(depth, max_size))
        })
        .map(|(id, _)| id)
    }

    /// Delete, waking any task still pending on it with `InvalidId`
    pub fn queue_delete(&self, id: ObjectId) -> OsalResult<()> {
        self.destroy_object(&self.inner.queues, ObjectType::Queue, id, |queue| {
            queue.close();
            Ok(())
        })
    }

    /// Enqueue a copy of `data` without blocking
    pub fn queue_put(&self, id: ObjectId, data: &[u8]) -> OsalResult<()> {
        self.lookup(&self.inner.queues, ObjectType::Queue, id)?
            .put(data)
    }

    /// Dequeue into `buffer`, returning the message length
    ///
    /// `Timeout::Check` yields `QueueEmpty` when nothing is waiting; a bounded
    /// wait that expires yields `QueueTimeout`.
    pub fn queue_get(&self, id: ObjectId, buffer: &mut [u8], timeout: Timeout) -> OsalResult<usize> {
        let wait = self.wait_bound(timeout)?;
        self.lookup(&self.inner.queues, ObjectType::Queue, id)?
            .get(buffer, wait)
    }

    pub fn queue_get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        self.inner.registry.find_by_name(ObjectType::Queue, name)
    }

    pub fn queue_get_info(&self, id: ObjectId) -> OsalResult<QueueInfo> {
        let common = self.inner.registry.common_info(ObjectType::Queue, id)?;
        let queue = self.lookup(&self.inner.queues, ObjectType::Queue, id)?;
        Ok(QueueInfo {
            name: common.name,
            creator: common.creator,
            depth: queue.depth(),
            max_size: queue.max_size(),
            count: queue.len(),
        })
    }
}
