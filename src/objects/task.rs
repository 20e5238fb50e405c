/*!
 * Tasks
 * OSAL tasks on native threads
 *
 * A task's record lives from `task_create` until either `task_delete` or
 * its entry returns, whichever comes first. Hosted threads cannot be
 * killed, so deleting another task only detaches its thread: the record and
 * name are released at once and the thread runs on until its entry returns.
 */

use crate::api::Osal;
use crate::core::errors::{OsalError, OsalResult};
use crate::core::id::{ObjectId, ObjectType};
use crate::core::limits::MIN_TASK_STACK_SIZE;
use crate::core::time::Timeout;
use crate::idmap::LockMode;
use crate::provider::context;
use crate::provider::hosted::{NativeTask, TaskEntry};
use serde::{Deserialize, Serialize};
use std::thread;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub name: String,
    pub creator: ObjectId,
    pub stack_size: usize,
    pub priority: u8,
}

impl Osal {
    /// Create and start a task running `entry`
    ///
    /// Stack sizes below the platform minimum are rounded up; zero is
    /// rejected with `InvalidSize`.
    pub fn task_create<F>(
        &self,
        name: &str,
        entry: F,
        stack_size: usize,
        priority: u8,
    ) -> OsalResult<ObjectId>
    where
        F: FnOnce() + Send + 'static,
    {
        if stack_size == 0 {
            return Err(OsalError::InvalidSize("task stack size is zero".into()));
        }
        let stack_size = stack_size.max(MIN_TASK_STACK_SIZE);
        let entry: TaskEntry = Box::new(entry);
        let weak = self.downgrade();
        let shared = &self.inner;

        let (id, task) = self.create_object(&shared.tasks, ObjectType::Task, name, |token| {
            NativeTask::spawn(token.id(), name, stack_size, priority, entry, move |id| {
                if let Some(osal) = Osal::upgrade(&weak) {
                    osal.reap_task(id);
                }
            })
        })?;
        task.start();
        info!(%id, name, stack_size, priority, "task started");
        Ok(id)
    }

    /// Drop the record of a task whose entry returned
    fn reap_task(&self, id: ObjectId) {
        let result = self.destroy_object(&self.inner.tasks, ObjectType::Task, id, |task| {
            task.detach();
            Ok(())
        });
        if result.is_ok() {
            debug!(%id, "task exited");
        }
    }

    /// Delete a task, running its delete handler first
    pub fn task_delete(&self, id: ObjectId) -> OsalResult<()> {
        self.destroy_object(&self.inner.tasks, ObjectType::Task, id, |task| {
            task.run_delete_handler();
            task.detach();
            Ok(())
        })?;
        info!(%id, "task deleted");
        Ok(())
    }

    /// Release the calling task's record ahead of returning from its entry
    ///
    /// The thread itself ends when the entry returns.
    pub fn task_exit(&self) -> OsalResult<()> {
        let id = self.task_get_id();
        if !id.is_defined() {
            return Err(OsalError::IncorrectObjState);
        }
        self.destroy_object(&self.inner.tasks, ObjectType::Task, id, |task| {
            task.detach();
            Ok(())
        })
    }

    /// Sleep for at least `msecs`, rounded up to whole system ticks
    pub fn task_delay(&self, msecs: u32) -> OsalResult<()> {
        match self.wait_bound(Timeout::Millis(msecs))? {
            Some(d) if !d.is_zero() => thread::sleep(d),
            _ => thread::yield_now(),
        }
        Ok(())
    }

    /// ID of the calling task, or `UNDEFINED` outside OSAL tasks
    pub fn task_get_id(&self) -> ObjectId {
        let id = context::current_id();
        if id.object_type() == ObjectType::Task {
            id
        } else {
            ObjectId::UNDEFINED
        }
    }

    pub fn task_set_priority(&self, id: ObjectId, priority: u8) -> OsalResult<()> {
        self.lookup(&self.inner.tasks, ObjectType::Task, id)?
            .set_priority(priority);
        Ok(())
    }

    /// Register a handler run when the calling task is deleted
    pub fn task_install_delete_handler<F>(&self, handler: F) -> OsalResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.task_get_id();
        let shared = &self.inner;
        let token = shared.registry.get_by_id(LockMode::None, ObjectType::Task, id)?;
        shared.tasks.get(&token)?.set_delete_handler(Box::new(handler));
        Ok(())
    }

    pub fn task_get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        self.inner.registry.find_by_name(ObjectType::Task, name)
    }

    pub fn task_get_info(&self, id: ObjectId) -> OsalResult<TaskInfo> {
        let common = self.inner.registry.common_info(ObjectType::Task, id)?;
        let task = self.lookup(&self.inner.tasks, ObjectType::Task, id)?;
        Ok(TaskInfo {
            name: common.name,
            creator: common.creator,
            stack_size: task.stack_size(),
            priority: task.priority(),
        })
    }
}
