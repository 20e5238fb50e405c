/*!
 * Timebases
 *
 * A timebase is a tick source plus a dedicated servicing thread that walks
 * a ring of timer callbacks on every tick.
 *
 * # Lifecycle
 *
 * `time_base_create` registers the object and starts its servicing thread,
 * which idles until `time_base_set` arms the tick source (internal ticks) or
 * immediately polls the user's sync function (external ticks).
 * `time_base_delete` claims the slot, which the servicing loop notices on its
 * next wake, and stops the tick source. A timebase with timers attached holds
 * references and cannot be deleted until they are gone.
 *
 * # Lock ordering
 *
 * Callbacks run with the timebase lock held and may perform registry
 * lookups, so the timebase lock is never acquired while a registry lock is
 * held.
 */

mod engine;
mod ring;

pub use engine::{process_tick, TimeBaseState};
pub use ring::{CallbackArena, TimerCallback, TimerCbRecord};

use crate::api::Osal;
use crate::core::errors::{OsalError, OsalResult};
use crate::core::id::{ObjectId, ObjectType};
use crate::core::limits::TIMER_MAX_ARG;
use crate::idmap::LockMode;
use crate::provider::hosted::{ExternalTickSource, IntervalTickSource};
use crate::provider::{context, ExternalSync, TickSource};
use engine::Servicer;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Native state of one timebase
///
/// Counters a callback may read about its own timebase are atomics outside
/// the ring lock, which the servicing thread holds while callbacks run.
pub struct TimeBaseImpl {
    pub(crate) state: Arc<Mutex<TimeBaseState>>,
    pub(crate) source: Arc<dyn TickSource>,
    freerun: Arc<AtomicU32>,
    nominal_start_time: AtomicU32,
    nominal_interval_time: AtomicU32,
    external: bool,
    servicing: Mutex<Option<JoinHandle<()>>>,
}

impl TimeBaseImpl {
    fn new(source: Arc<dyn TickSource>, external: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimeBaseState::default())),
            source,
            freerun: Arc::new(AtomicU32::new(0)),
            nominal_start_time: AtomicU32::new(0),
            nominal_interval_time: AtomicU32::new(0),
            external,
            servicing: Mutex::new(None),
        }
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.external
    }

    #[inline]
    pub fn freerun_time(&self) -> u32 {
        self.freerun.load(Ordering::Acquire)
    }

    #[inline]
    pub fn nominal_start_time(&self) -> u32 {
        self.nominal_start_time.load(Ordering::Acquire)
    }

    #[inline]
    pub fn nominal_interval_time(&self) -> u32 {
        self.nominal_interval_time.load(Ordering::Acquire)
    }

    /// Stop ticking and reap the servicing thread
    ///
    /// Sources that cannot be interrupted leave the thread detached; it
    /// exits on its own once the sync function next returns.
    fn stop(&self) {
        self.source.shutdown();
        let handle = self.servicing.lock().take();
        if let Some(handle) = handle {
            if self.source.interruptible() {
                let _ = handle.join();
            }
        }
    }
}

/// Snapshot returned by `time_base_get_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBaseInfo {
    pub name: String,
    pub creator: ObjectId,
    pub nominal_interval_time: u32,
    pub freerun_time: u32,
    pub accuracy: u32,
}

/// Fail fast when called from a servicing context (a timer callback)
#[inline]
pub(crate) fn ensure_not_in_callback() -> OsalResult<()> {
    if context::in_timebase_context() {
        return Err(OsalError::IncorrectObjState);
    }
    Ok(())
}

/// Start and interval must each leave headroom for signed arithmetic
#[inline]
pub(crate) fn check_timer_args(start_time: u32, interval_time: u32) -> OsalResult<()> {
    if start_time >= TIMER_MAX_ARG || interval_time >= TIMER_MAX_ARG {
        return Err(OsalError::TimerInvalidArgs);
    }
    Ok(())
}

impl Osal {
    // ========================================================================
    // Timebase API
    // ========================================================================

    /// Create a timebase driven by internal ticks, or by `external_sync`
    pub fn time_base_create(
        &self,
        name: &str,
        external_sync: Option<ExternalSync>,
    ) -> OsalResult<ObjectId> {
        ensure_not_in_callback()?;
        let shared = &self.inner;
        let accuracy = shared.config.microsec_per_tick();
        let external = external_sync.is_some();

        let token = shared.registry.allocate_new(ObjectType::TimeBase, Some(name))?;
        let source: Arc<dyn TickSource> = match external_sync {
            Some(sync) => Arc::new(ExternalTickSource::new(sync, accuracy)),
            None => Arc::new(IntervalTickSource::new(accuracy)),
        };
        let installed = shared
            .time_bases
            .install(&token, TimeBaseImpl::new(source, external))
            .map(|_| ());
        let id = shared.registry.finalize_new(installed, token)?;

        if let Err(e) = self.start_servicing(id, name) {
            let _ = self.time_base_delete(id);
            return Err(e);
        }
        info!(%id, name, external, "timebase created");
        Ok(id)
    }

    fn start_servicing(&self, id: ObjectId, name: &str) -> OsalResult<()> {
        let shared = &self.inner;
        let token = shared.registry.get_by_id(LockMode::None, ObjectType::TimeBase, id)?;
        let timebase = shared.time_bases.get(&token)?;
        drop(token);

        let servicer = Servicer {
            registry: Arc::clone(&shared.registry),
            arena: Arc::clone(&shared.timer_cbs),
            state: Arc::clone(&timebase.state),
            freerun: Arc::clone(&timebase.freerun),
            source: Arc::clone(&timebase.source),
            timebase_id: id,
        };
        let handle = thread::Builder::new()
            .name(format!("timebase-{}", name))
            .spawn(move || servicer.run())
            .map_err(|e| OsalError::OsFailure(format!("servicing thread spawn failed: {}", e)))?;
        *timebase.servicing.lock() = Some(handle);
        Ok(())
    }

    /// Arm (or re-arm) the tick source: first tick after `start_time`
    /// microseconds, then every `interval_time`
    ///
    /// Zero for both disarms an internal source. External sources keep their
    /// own period; only the nominal values are recorded.
    pub fn time_base_set(
        &self,
        id: ObjectId,
        start_time: u32,
        interval_time: u32,
    ) -> OsalResult<()> {
        ensure_not_in_callback()?;
        check_timer_args(start_time, interval_time)?;
        let shared = &self.inner;
        let token = shared.registry.get_by_id(LockMode::None, ObjectType::TimeBase, id)?;
        let timebase = shared.time_bases.get(&token)?;
        drop(token);

        timebase
            .nominal_start_time
            .store(start_time, Ordering::Release);
        timebase
            .nominal_interval_time
            .store(interval_time, Ordering::Release);
        timebase.source.configure(start_time, interval_time)?;
        debug!(%id, start_time, interval_time, "timebase configured");
        Ok(())
    }

    /// Delete a timebase; fails with `ObjectInUse` while timers reference it
    pub fn time_base_delete(&self, id: ObjectId) -> OsalResult<()> {
        ensure_not_in_callback()?;
        let shared = &self.inner;
        let token = shared
            .registry
            .get_by_id(LockMode::Exclusive, ObjectType::TimeBase, id)?;
        let timebase = shared.time_bases.take(&token);
        shared.registry.finalize_delete(Ok(()), token)?;

        if let Some(timebase) = timebase {
            timebase.stop();
        }
        info!(%id, "timebase deleted");
        Ok(())
    }

    pub fn time_base_get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        self.inner.registry.find_by_name(ObjectType::TimeBase, name)
    }

    pub fn time_base_get_info(&self, id: ObjectId) -> OsalResult<TimeBaseInfo> {
        let shared = &self.inner;
        let common = shared.registry.common_info(ObjectType::TimeBase, id)?;
        let timebase = self.time_base_impl(id)?;
        Ok(TimeBaseInfo {
            name: common.name,
            creator: common.creator,
            nominal_interval_time: timebase.nominal_interval_time(),
            freerun_time: timebase.freerun_time(),
            accuracy: timebase.source.accuracy_usec(),
        })
    }

    /// Free-running tick accumulator; wraps, so compare differences only
    pub fn time_base_get_free_run(&self, id: ObjectId) -> OsalResult<u32> {
        Ok(self.time_base_impl(id)?.freerun_time())
    }

    /// Native state for an active timebase; no registry lock is kept
    pub(crate) fn time_base_impl(&self, id: ObjectId) -> OsalResult<Arc<TimeBaseImpl>> {
        let shared = &self.inner;
        let token = shared.registry.get_by_id(LockMode::None, ObjectType::TimeBase, id)?;
        shared.time_bases.get(&token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ObjectLimits, OsalConfig};
    use std::time::Duration;

    fn osal() -> Osal {
        let config = OsalConfig {
            limits: ObjectLimits::uniform(4),
            ..OsalConfig::default()
        };
        Osal::initialize(config).unwrap()
    }

    #[test]
    fn test_create_lookup_delete() {
        let osal = osal();
        let id = osal.time_base_create("tb", None).unwrap();
        assert_eq!(osal.time_base_get_id_by_name("tb"), Ok(id));

        let info = osal.time_base_get_info(id).unwrap();
        assert_eq!(info.name, "tb");
        assert_eq!(info.nominal_interval_time, 0);
        assert_eq!(info.accuracy, 10_000);

        osal.time_base_delete(id).unwrap();
        assert_eq!(
            osal.time_base_get_info(id).err(),
            Some(OsalError::InvalidId)
        );
        osal.teardown().unwrap();
    }

    #[test]
    fn test_set_rejects_out_of_range() {
        let osal = osal();
        let id = osal.time_base_create("tb", None).unwrap();
        assert_eq!(
            osal.time_base_set(id, TIMER_MAX_ARG, 0),
            Err(OsalError::TimerInvalidArgs)
        );
        assert_eq!(
            osal.time_base_set(id, 0, u32::MAX),
            Err(OsalError::TimerInvalidArgs)
        );
        assert!(osal.time_base_set(id, 1_000, 1_000).is_ok());
        osal.teardown().unwrap();
    }

    #[test]
    fn test_free_run_advances_once_armed() {
        let osal = osal();
        let id = osal.time_base_create("tb", None).unwrap();
        assert_eq!(osal.time_base_get_free_run(id), Ok(0));
        osal.time_base_set(id, 1_000, 1_000).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(osal.time_base_get_free_run(id).unwrap() > 0);
        osal.teardown().unwrap();
    }

    #[test]
    fn test_external_sync_drives_ticks() {
        let osal = osal();
        let polls = Arc::new(AtomicU32::new(0));
        let sync: ExternalSync = {
            let polls = Arc::clone(&polls);
            Arc::new(move |_: ObjectId| {
                polls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(1));
                7
            })
        };
        let id = osal.time_base_create("ext", Some(sync)).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(polls.load(Ordering::SeqCst) > 0);
        assert_eq!(osal.time_base_get_free_run(id).unwrap() % 7, 0);
        osal.time_base_delete(id).unwrap();
        osal.teardown().unwrap();
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let osal = osal();
        osal.time_base_create("tb", None).unwrap();
        assert_eq!(
            osal.time_base_create("tb", None),
            Err(OsalError::NameTaken)
        );
        osal.teardown().unwrap();
    }
}
