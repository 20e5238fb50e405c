/*!
 * Mutexes
 * Recursive, owner-checked mutual exclusion
 */

use crate::api::Osal;
use crate::core::errors::OsalResult;
use crate::core::id::{ObjectId, ObjectType};
use crate::provider::hosted::NativeMutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutexInfo {
    pub name: String,
    pub creator: ObjectId,
    pub locked: bool,
}

impl Osal {
    pub fn mutex_create(&self, name: &str) -> OsalResult<ObjectId> {
        let shared = &self.inner;
        self.create_object(&shared.mutexes, ObjectType::Mutex, name, |_| {
            Ok(NativeMutex::new())
        })
        .map(|(id, _)| id)
    }

    pub fn mutex_delete(&self, id: ObjectId) -> OsalResult<()> {
        self.destroy_object(&self.inner.mutexes, ObjectType::Mutex, id, |_| Ok(()))
    }

    /// Acquire, blocking while another task owns it; recursive for the owner
    pub fn mutex_take(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.mutexes, ObjectType::Mutex, id)?
            .take();
        Ok(())
    }

    /// Release one level; `SemFailure` when the caller is not the owner
    pub fn mutex_give(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.mutexes, ObjectType::Mutex, id)?
            .give()
    }

    pub fn mutex_get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        self.inner.registry.find_by_name(ObjectType::Mutex, name)
    }

    pub fn mutex_get_info(&self, id: ObjectId) -> OsalResult<MutexInfo> {
        let common = self.inner.registry.common_info(ObjectType::Mutex, id)?;
        let mutex = self.lookup(&self.inner.mutexes, ObjectType::Mutex, id)?;
        Ok(MutexInfo {
            name: common.name,
            creator: common.creator,
            locked: mutex.is_locked(),
        })
    }
}
