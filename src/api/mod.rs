/*!
 * OSAL Context
 *
 * The explicit process-wide context: configuration, the object registry,
 * every per-type native table and the timer-callback arena.
 *
 * # Lifecycle
 *
 * `Osal::new` validates the configuration and builds empty tables;
 * `init` opens the registry for object creation. Both `init` and `teardown`
 * are idempotent. `teardown` deletes every remaining object (retrying a
 * bounded number of times, since some deletes only succeed once dependents
 * are gone) and then closes the registry, after which creates fail with
 * `NotInitialized`.
 *
 * `Osal` is a cheap handle; clones share one context.
 */

use crate::core::config::OsalConfig;
use crate::core::errors::{OsalError, OsalResult};
use crate::core::id::{ObjectId, ObjectType};
use crate::core::limits::DELETE_ALL_RETRY_DELAY;
use crate::idmap::{CreatorFilter, LockMode, Registry};
use crate::provider::hosted::{
    NativeBinSem, NativeCondVar, NativeCountSem, NativeMutex, NativeQueue, NativeRwLock,
    NativeTask,
};
use crate::provider::ImplTable;
use crate::timebase::{CallbackArena, TimeBaseImpl};
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, info, warn};

/// Deletion order for teardown: users of a resource before the resource
const TEARDOWN_ORDER: [ObjectType; 14] = [
    ObjectType::Task,
    ObjectType::TimerCb,
    ObjectType::TimeBase,
    ObjectType::Queue,
    ObjectType::BinSem,
    ObjectType::CountSem,
    ObjectType::Mutex,
    ObjectType::CondVar,
    ObjectType::RwLock,
    ObjectType::Stream,
    ObjectType::Dir,
    ObjectType::Module,
    ObjectType::FileSys,
    ObjectType::Console,
];

/// State shared by every handle to one context
pub(crate) struct OsalShared {
    pub config: OsalConfig,
    pub registry: Arc<Registry>,
    pub tasks: ImplTable<NativeTask>,
    pub queues: ImplTable<NativeQueue>,
    pub bin_sems: ImplTable<NativeBinSem>,
    pub count_sems: ImplTable<NativeCountSem>,
    pub mutexes: ImplTable<NativeMutex>,
    pub cond_vars: ImplTable<NativeCondVar>,
    pub rw_locks: ImplTable<NativeRwLock>,
    pub time_bases: ImplTable<TimeBaseImpl>,
    pub timer_cbs: Arc<CallbackArena>,
}

/// Handle to an OSAL context
#[derive(Clone)]
pub struct Osal {
    pub(crate) inner: Arc<OsalShared>,
}

impl Osal {
    /// Build a context with empty tables; objects cannot be created until
    /// `init`
    pub fn new(config: OsalConfig) -> OsalResult<Self> {
        config.validate()?;
        let limits = &config.limits;
        let shared = OsalShared {
            registry: Arc::new(Registry::new(&config)),
            tasks: ImplTable::new(limits.max_tasks),
            queues: ImplTable::new(limits.max_queues),
            bin_sems: ImplTable::new(limits.max_bin_semaphores),
            count_sems: ImplTable::new(limits.max_count_semaphores),
            mutexes: ImplTable::new(limits.max_mutexes),
            cond_vars: ImplTable::new(limits.max_condvars),
            rw_locks: ImplTable::new(limits.max_rwlocks),
            time_bases: ImplTable::new(limits.max_timebases),
            timer_cbs: Arc::new(CallbackArena::new(limits.max_timers)),
            config,
        };
        Ok(Self {
            inner: Arc::new(shared),
        })
    }

    /// `new` followed by `init`
    pub fn initialize(config: OsalConfig) -> OsalResult<Self> {
        let osal = Self::new(config)?;
        osal.init()?;
        Ok(osal)
    }

    /// Open the registry; a second call is a no-op
    pub fn init(&self) -> OsalResult<()> {
        if self.inner.registry.is_initialized() {
            debug!("OSAL already initialized");
            return Ok(());
        }
        self.inner.registry.set_initialized(true);
        info!(
            ticks_per_second = self.inner.config.ticks_per_second,
            max_name_len = self.inner.config.max_name_len,
            "OSAL initialized"
        );
        Ok(())
    }

    /// Delete all objects and close the registry; a second call is a no-op
    pub fn teardown(&self) -> OsalResult<()> {
        if !self.inner.registry.is_initialized() {
            return Ok(());
        }
        let remaining = self.delete_all_objects();
        self.inner.registry.set_initialized(false);
        if remaining > 0 {
            warn!(remaining, "OSAL teardown left objects behind");
        }
        info!("OSAL shut down");
        Ok(())
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.inner.registry.is_initialized()
    }

    #[inline]
    pub fn config(&self) -> &OsalConfig {
        &self.inner.config
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub(crate) fn downgrade(&self) -> Weak<OsalShared> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<OsalShared>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // ========================================================================
    // Whole-registry operations
    // ========================================================================

    /// Delete every live object, retrying up to the configured number of
    /// passes; returns how many objects could not be deleted
    ///
    /// Individual failures are skipped, not reported.
    pub fn delete_all_objects(&self) -> usize {
        let attempts = self.inner.config.delete_all_attempts.max(1);
        let mut remaining = 0;
        for attempt in 0..attempts {
            remaining = 0;
            for object_type in TEARDOWN_ORDER {
                self.for_each_object_of_type(object_type, CreatorFilter::Any, |id| {
                    if let Err(e) = self.delete_object(id) {
                        debug!(%id, error = %e, attempt, "delete deferred");
                        remaining += 1;
                    }
                });
            }
            if remaining == 0 {
                break;
            }
            thread::sleep(DELETE_ALL_RETRY_DELAY);
        }
        remaining
    }

    /// Delete any object by ID, dispatching on its type
    pub fn delete_object(&self, id: ObjectId) -> OsalResult<()> {
        match id.object_type() {
            ObjectType::Task => self.task_delete(id),
            ObjectType::Queue => self.queue_delete(id),
            ObjectType::BinSem => self.bin_sem_delete(id),
            ObjectType::CountSem => self.count_sem_delete(id),
            ObjectType::Mutex => self.mutex_delete(id),
            ObjectType::CondVar => self.cond_var_delete(id),
            ObjectType::RwLock => self.rw_lock_delete(id),
            ObjectType::TimeBase => self.time_base_delete(id),
            ObjectType::TimerCb => self.timer_delete(id),
            ObjectType::Undefined => Err(OsalError::InvalidId),
            // No native state is kept for these here; drop the record only
            other => {
                let registry = &self.inner.registry;
                let token = registry.get_by_id(LockMode::Exclusive, other, id)?;
                registry.finalize_delete(Ok(()), token)
            }
        }
    }

    /// Invoke `callback` for every live object whose creator matches
    pub fn for_each_object<F>(&self, creator: impl Into<CreatorFilter>, callback: F)
    where
        F: FnMut(ObjectId),
    {
        self.inner.registry.for_each_object(creator.into(), callback);
    }

    /// Invoke `callback` for every live object of one type whose creator
    /// matches
    pub fn for_each_object_of_type<F>(
        &self,
        object_type: ObjectType,
        creator: impl Into<CreatorFilter>,
        callback: F,
    ) where
        F: FnMut(ObjectId),
    {
        self.inner
            .registry
            .for_each_object_of_type(object_type, creator.into(), callback);
    }

    // ========================================================================
    // Identification helpers
    // ========================================================================

    /// Type of an ID, decoded without any table access
    #[inline]
    pub fn identify_object(&self, id: ObjectId) -> ObjectType {
        id.object_type()
    }

    /// Table index of an active object
    pub fn convert_to_array_index(&self, object_type: ObjectType, id: ObjectId) -> OsalResult<usize> {
        self.inner.registry.convert_to_index(object_type, id)
    }

    /// Table index of any ID, without checking that it is active
    #[inline]
    pub fn object_id_to_array_index(&self, id: ObjectId) -> usize {
        id.index()
    }

    /// Name of an active object of any type
    pub fn get_resource_name(&self, id: ObjectId) -> OsalResult<String> {
        let common = self.inner.registry.common_info(id.object_type(), id)?;
        Ok(common.name)
    }
}

impl fmt::Debug for Osal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Osal")
            .field("initialized", &self.is_initialized())
            .field("config", &self.inner.config)
            .finish()
    }
}
