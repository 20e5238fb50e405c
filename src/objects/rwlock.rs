/*!
 * Read-Write Locks
 */

use crate::api::Osal;
use crate::core::errors::OsalResult;
use crate::core::id::{ObjectId, ObjectType};
use crate::provider::hosted::NativeRwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RwLockInfo {
    pub name: String,
    pub creator: ObjectId,
}

impl Osal {
    pub fn rw_lock_create(&self, name: &str) -> OsalResult<ObjectId> {
        let shared = &self.inner;
        self.create_object(&shared.rw_locks, ObjectType::RwLock, name, |_| {
            Ok(NativeRwLock::new())
        })
        .map(|(id, _)| id)
    }

    pub fn rw_lock_delete(&self, id: ObjectId) -> OsalResult<()> {
        self.destroy_object(&self.inner.rw_locks, ObjectType::RwLock, id, |_| Ok(()))
    }

    pub fn rw_lock_read_lock(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.rw_locks, ObjectType::RwLock, id)?
            .read_lock();
        Ok(())
    }

    pub fn rw_lock_read_unlock(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.rw_locks, ObjectType::RwLock, id)?
            .read_unlock()
    }

    pub fn rw_lock_write_lock(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.rw_locks, ObjectType::RwLock, id)?
            .write_lock()
    }

    pub fn rw_lock_write_unlock(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.rw_locks, ObjectType::RwLock, id)?
            .write_unlock()
    }

    pub fn rw_lock_get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        self.inner.registry.find_by_name(ObjectType::RwLock, name)
    }

    pub fn rw_lock_get_info(&self, id: ObjectId) -> OsalResult<RwLockInfo> {
        let common = self.inner.registry.common_info(ObjectType::RwLock, id)?;
        Ok(RwLockInfo {
            name: common.name,
            creator: common.creator,
        })
    }
}
