/*!
 * Counting Semaphores
 */

use crate::api::Osal;
use crate::core::errors::OsalResult;
use crate::core::id::{ObjectId, ObjectType};
use crate::core::time::Timeout;
use crate::provider::hosted::NativeCountSem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSemInfo {
    pub name: String,
    pub creator: ObjectId,
    pub value: i32,
}

impl Osal {
    /// Create a counting semaphore; values above `i32::MAX` are rejected with
    /// `InvalidSemValue`
    pub fn count_sem_create(&self, name: &str, initial_value: u32) -> OsalResult<ObjectId> {
        let shared = &self.inner;
        self.create_object(&shared.count_sems, ObjectType::CountSem, name, |_| {
            NativeCountSem::new(initial_value)
        })
        .map(|(id, _)| id)
    }

    /// Delete, waking any task still pending on it with `InvalidId`
    pub fn count_sem_delete(&self, id: ObjectId) -> OsalResult<()> {
        self.destroy_object(&self.inner.count_sems, ObjectType::CountSem, id, |sem| {
            sem.close();
            Ok(())
        })
    }

    pub fn count_sem_give(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.count_sems, ObjectType::CountSem, id)?
            .give()
    }

    pub fn count_sem_take(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.count_sems, ObjectType::CountSem, id)?
            .take(None)
    }

    pub fn count_sem_timed_wait(&self, id: ObjectId, msecs: u32) -> OsalResult<()> {
        let wait = self.wait_bound(Timeout::Millis(msecs))?;
        self.lookup(&self.inner.count_sems, ObjectType::CountSem, id)?
            .take(wait)
    }

    pub fn count_sem_get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        self.inner.registry.find_by_name(ObjectType::CountSem, name)
    }

    pub fn count_sem_get_info(&self, id: ObjectId) -> OsalResult<CountSemInfo> {
        let common = self.inner.registry.common_info(ObjectType::CountSem, id)?;
        let sem = self.lookup(&self.inner.count_sems, ObjectType::CountSem, id)?;
        Ok(CountSemInfo {
            name: common.name,
            creator: common.creator,
            value: sem.value(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::api::Osal;
    use crate::core::config::{ObjectLimits, OsalConfig};
    use crate::core::errors::OsalError;

    #[test]
    fn test_counts_and_times_out() {
        let osal = Osal::initialize(OsalConfig {
            limits: ObjectLimits::uniform(2),
            ..OsalConfig::default()
        })
        .unwrap();
        let id = osal.count_sem_create("cs", 2).unwrap();
        osal.count_sem_take(id).unwrap();
        osal.count_sem_take(id).unwrap();
        assert_eq!(
            osal.count_sem_timed_wait(id, 10),
            Err(OsalError::SemTimeout)
        );
        osal.count_sem_give(id).unwrap();
        assert_eq!(osal.count_sem_get_info(id).unwrap().value, 1);
        osal.teardown().unwrap();
    }

    #[test]
    fn test_initial_value_out_of_range() {
        let osal = Osal::initialize(OsalConfig::default()).unwrap();
        assert_eq!(
            osal.count_sem_create("cs", u32::MAX),
            Err(OsalError::InvalidSemValue)
        );
        // The failed create left no record behind
        assert!(osal.count_sem_create("cs", 0).is_ok());
        osal.teardown().unwrap();
    }
}
