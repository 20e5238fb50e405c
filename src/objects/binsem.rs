/*!
 * Binary Semaphores
 */

use crate::api::Osal;
use crate::core::errors::OsalResult;
use crate::core::id::{ObjectId, ObjectType};
use crate::core::time::Timeout;
use crate::provider::hosted::NativeBinSem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinSemInfo {
    pub name: String,
    pub creator: ObjectId,
    pub value: i32,
}

impl Osal {
    /// Create a binary semaphore; any nonzero initial value means full
    pub fn bin_sem_create(&self, name: &str, initial_value: u32) -> OsalResult<ObjectId> {
        let shared = &self.inner;
        self.create_object(&shared.bin_sems, ObjectType::BinSem, name, |_| {
            Ok(NativeBinSem::new(initial_value > 0))
        })
        .map(|(id, _)| id)
    }

    /// Delete, releasing any task still pending on it
    pub fn bin_sem_delete(&self, id: ObjectId) -> OsalResult<()> {
        self.destroy_object(&self.inner.bin_sems, ObjectType::BinSem, id, |sem| {
            sem.flush();
            Ok(())
        })
    }

    pub fn bin_sem_give(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.bin_sems, ObjectType::BinSem, id)?
            .give();
        Ok(())
    }

    /// Block until the semaphore is available
    pub fn bin_sem_take(&self, id: ObjectId) -> OsalResult<()> {
        let sem = self.lookup(&self.inner.bin_sems, ObjectType::BinSem, id)?;
        sem.take(None)
    }

    /// Take with a bound of `msecs`; `SemTimeout` if it expires
    pub fn bin_sem_timed_wait(&self, id: ObjectId, msecs: u32) -> OsalResult<()> {
        let wait = self.wait_bound(Timeout::Millis(msecs))?;
        let sem = self.lookup(&self.inner.bin_sems, ObjectType::BinSem, id)?;
        sem.take(wait)
    }

    /// Unblock every task pending on the semaphore without changing its value
    pub fn bin_sem_flush(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.bin_sems, ObjectType::BinSem, id)?
            .flush();
        Ok(())
    }

    pub fn bin_sem_get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        self.inner.registry.find_by_name(ObjectType::BinSem, name)
    }

    pub fn bin_sem_get_info(&self, id: ObjectId) -> OsalResult<BinSemInfo> {
        let common = self.inner.registry.common_info(ObjectType::BinSem, id)?;
        let sem = self.lookup(&self.inner.bin_sems, ObjectType::BinSem, id)?;
        Ok(BinSemInfo {
            name: common.name,
            creator: common.creator,
            value: sem.value(),
        })
    }
}
