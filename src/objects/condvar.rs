/*!
 * Condition Variables
 * A condition variable bundled with its own mutex
 */

use crate::api::Osal;
use crate::core::errors::OsalResult;
use crate::core::id::{ObjectId, ObjectType};
use crate::core::time::Timeout;
use crate::provider::hosted::NativeCondVar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondVarInfo {
    pub name: String,
    pub creator: ObjectId,
}

impl Osal {
    pub fn cond_var_create(&self, name: &str) -> OsalResult<ObjectId> {
        let shared = &self.inner;
        self.create_object(&shared.cond_vars, ObjectType::CondVar, name, |_| {
            Ok(NativeCondVar::new())
        })
        .map(|(id, _)| id)
    }

    pub fn cond_var_delete(&self, id: ObjectId) -> OsalResult<()> {
        self.destroy_object(&self.inner.cond_vars, ObjectType::CondVar, id, |_| Ok(()))
    }

    pub fn cond_var_lock(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.cond_vars, ObjectType::CondVar, id)?
            .lock()
    }

    pub fn cond_var_unlock(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.cond_vars, ObjectType::CondVar, id)?
            .unlock()
    }

    pub fn cond_var_signal(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.cond_vars, ObjectType::CondVar, id)?
            .signal();
        Ok(())
    }

    pub fn cond_var_broadcast(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.cond_vars, ObjectType::CondVar, id)?
            .broadcast();
        Ok(())
    }

    /// Wait for a signal; the caller must hold the condition's lock
    pub fn cond_var_wait(&self, id: ObjectId) -> OsalResult<()> {
        self.lookup(&self.inner.cond_vars, ObjectType::CondVar, id)?
            .wait(None)
    }

    /// Wait at most `msecs`; returns `Timeout` with the lock re-acquired
    pub fn cond_var_timed_wait(&self, id: ObjectId, msecs: u32) -> OsalResult<()> {
        let wait = self.wait_bound(Timeout::Millis(msecs))?;
        self.lookup(&self.inner.cond_vars, ObjectType::CondVar, id)?
            .wait(wait)
    }

    pub fn cond_var_get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        self.inner.registry.find_by_name(ObjectType::CondVar, name)
    }

    pub fn cond_var_get_info(&self, id: ObjectId) -> OsalResult<CondVarInfo> {
        let common = self.inner.registry.common_info(ObjectType::CondVar, id)?;
        Ok(CondVarInfo {
            name: common.name,
            creator: common.creator,
        })
    }
}
