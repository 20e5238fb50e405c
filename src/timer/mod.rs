/*!
 * Timers
 * Timer callbacks attached to timebases, and simple self-contained timers
 *
 * `timer_add` links a callback into an existing timebase's ring and holds a
 * reference on that timebase for as long as the timer exists.
 * `timer_create` builds the common case: a private timebase named after the
 * timer, owned by it and deleted with it.
 */

use crate::api::Osal;
use crate::core::errors::{OsalError, OsalResult};
use crate::core::id::{ObjectId, ObjectType};
use crate::idmap::LockMode;
use crate::timebase::{check_timer_args, ensure_not_in_callback, TimerCallback};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Snapshot returned by `timer_get_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerInfo {
    pub name: String,
    pub creator: ObjectId,
    pub start_time: u32,
    pub interval_time: u32,
    pub accuracy: u32,
    pub backlog_resets: u32,
}

impl Osal {
    // ========================================================================
    // Timer API
    // ========================================================================

    /// Attach a new, unarmed timer callback to `timebase_id`
    pub fn timer_add<F>(
        &self,
        name: &str,
        timebase_id: ObjectId,
        callback: F,
    ) -> OsalResult<ObjectId>
    where
        F: Fn(ObjectId) + Send + Sync + 'static,
    {
        self.add_timer_callback(name, timebase_id, Arc::new(callback), false)
    }

    fn add_timer_callback(
        &self,
        name: &str,
        timebase_id: ObjectId,
        callback: TimerCallback,
        dedicated_timebase: bool,
    ) -> OsalResult<ObjectId> {
        ensure_not_in_callback()?;
        let shared = &self.inner;
        let timebase_ref = shared
            .registry
            .get_by_id(LockMode::Refcount, ObjectType::TimeBase, timebase_id)?;
        let timebase = shared.time_bases.get(&timebase_ref)?;

        let token = shared.registry.allocate_new(ObjectType::TimerCb, Some(name))?;
        let index = token.index();
        let held = timebase_ref.transfer().ok_or(OsalError::IncorrectObjState)?;
        shared
            .timer_cbs
            .record(index)
            .reset(index, token.id(), held, callback, dedicated_timebase);
        let id = shared.registry.finalize_new(Ok(()), token)?;

        // Linked only after the registry locks are released. A delete that
        // won the race has already published a different identity.
        {
            let mut ring = timebase.state.lock();
            if shared.registry.is_active(id) {
                shared.timer_cbs.insert_head(&mut ring.first_cb, index);
            }
        }
        debug!(%id, %timebase_id, name, "timer added");
        Ok(id)
    }

    /// Create a timer with its own dedicated timebase
    ///
    /// Returns the timer ID and the clock accuracy in microseconds.
    pub fn timer_create<F>(&self, name: &str, callback: F) -> OsalResult<(ObjectId, u32)>
    where
        F: Fn(ObjectId) + Send + Sync + 'static,
    {
        ensure_not_in_callback()?;
        let timebase_id = self.time_base_create(name, None)?;
        match self.add_timer_callback(name, timebase_id, Arc::new(callback), true) {
            Ok(id) => {
                info!(%id, name, "timer created");
                Ok((id, self.inner.config.microsec_per_tick()))
            }
            Err(e) => {
                let _ = self.time_base_delete(timebase_id);
                Err(e)
            }
        }
    }

    /// Arm a timer: first fire after `start_time` microseconds, then every
    /// `interval_time` (0 for one-shot)
    ///
    /// A zero start fires first after one interval. For a timer with a
    /// dedicated timebase the tick source is reconfigured afterwards; a tick
    /// landing in between sees the new wait time with the old period.
    pub fn timer_set(&self, id: ObjectId, start_time: u32, interval_time: u32) -> OsalResult<()> {
        ensure_not_in_callback()?;
        check_timer_args(start_time, interval_time)?;
        if start_time == 0 && interval_time == 0 {
            return Err(OsalError::TimerInvalidArgs);
        }
        let shared = &self.inner;
        let token = shared
            .registry
            .get_by_id(LockMode::None, ObjectType::TimerCb, id)?;
        let index = token.index();
        drop(token);

        let (timebase_id, dedicated) = {
            let record = shared.timer_cbs.record(index);
            let timebase_id = record.timebase.map(|h| h.id()).ok_or(OsalError::InvalidId)?;
            (timebase_id, record.dedicated_timebase)
        };
        let timebase = shared
            .time_bases
            .get_index(timebase_id.index())
            .ok_or(OsalError::InvalidId)?;

        {
            let _ring = timebase.state.lock();
            if !shared.registry.is_active(id) {
                return Err(OsalError::InvalidId);
            }
            let mut record = shared.timer_cbs.record(index);
            let first = if start_time > 0 { start_time } else { interval_time };
            record.wait_time = i64::from(first);
            record.interval_time = i64::from(interval_time);
        }

        if dedicated {
            self.time_base_set(timebase_id, start_time, interval_time)?;
        }
        debug!(%id, start_time, interval_time, "timer set");
        Ok(())
    }

    /// Delete a timer, and its dedicated timebase if it has one
    ///
    /// Removing the dedicated timebase is best effort: it survives while
    /// other timers still reference it.
    pub fn timer_delete(&self, id: ObjectId) -> OsalResult<()> {
        ensure_not_in_callback()?;
        let shared = &self.inner;
        let token = shared
            .registry
            .get_by_id(LockMode::Exclusive, ObjectType::TimerCb, id)?;
        let index = token.index();

        let (held, dedicated) = {
            let record = shared.timer_cbs.record(index);
            (record.timebase, record.dedicated_timebase)
        };
        let timebase = held.and_then(|h| shared.time_bases.get_index(h.id().index()));
        if let Some(timebase) = &timebase {
            let mut ring = timebase.state.lock();
            shared.timer_cbs.remove(&mut ring.first_cb, index);
        }

        {
            let mut record = shared.timer_cbs.record(index);
            record.callback = None;
            record.timebase = None;
        }
        shared.registry.finalize_delete(Ok(()), token)?;

        if let Some(held) = held {
            shared.registry.release_held(held);
            // The timer is gone; a dedicated timebase another timer was
            // added to stays until that timer is deleted
            if dedicated {
                if let Err(e) = self.time_base_delete(held.id()) {
                    warn!(%id, timebase_id = %held.id(), error = %e, "dedicated timebase kept");
                }
            }
        }
        info!(%id, "timer deleted");
        Ok(())
    }

    pub fn timer_get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        self.inner.registry.find_by_name(ObjectType::TimerCb, name)
    }

    /// Safe to call from a timer callback, including for its own timer
    pub fn timer_get_info(&self, id: ObjectId) -> OsalResult<TimerInfo> {
        let shared = &self.inner;
        let common = shared.registry.common_info(ObjectType::TimerCb, id)?;
        let index = id.index();
        let (timebase_id, wait_time, interval_time, backlog_resets) = {
            let record = shared.timer_cbs.record(index);
            (
                record.timebase.map(|h| h.id()),
                record.wait_time,
                record.interval_time,
                record.backlog_resets,
            )
        };
        let timebase = timebase_id
            .and_then(|tb| shared.time_bases.get_index(tb.index()))
            .ok_or(OsalError::InvalidId)?;
        if !shared.registry.is_active(id) {
            return Err(OsalError::InvalidId);
        }
        Ok(TimerInfo {
            name: common.name,
            creator: common.creator,
            start_time: clamp_u32(wait_time),
            interval_time: clamp_u32(interval_time),
            accuracy: timebase.source.accuracy_usec(),
            backlog_resets,
        })
    }

    /// Ring members of a timebase in callback order
    pub fn time_base_timers(&self, timebase_id: ObjectId) -> OsalResult<Vec<ObjectId>> {
        ensure_not_in_callback()?;
        let shared = &self.inner;
        let timebase = self.time_base_impl(timebase_id)?;
        let members = {
            let ring = timebase.state.lock();
            shared.timer_cbs.walk(ring.first_cb)
        };
        Ok(members
            .into_iter()
            .map(|index| shared.timer_cbs.record(index).timer_id)
            .collect())
    }
}

#[inline]
fn clamp_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ObjectLimits, OsalConfig};
    use crate::core::limits::TIMER_MAX_ARG;
    use pretty_assertions::assert_eq;

    fn osal() -> Osal {
        let config = OsalConfig {
            limits: ObjectLimits::uniform(4),
            ..OsalConfig::default()
        };
        Osal::initialize(config).unwrap()
    }

    #[test]
    fn test_create_reports_tick_accuracy() {
        let osal = osal();
        let (id, accuracy) = osal.timer_create("t", |_| {}).unwrap();
        assert_eq!(accuracy, 10_000);
        assert_eq!(osal.timer_get_id_by_name("t"), Ok(id));
        // The dedicated timebase shares the timer's name
        assert!(osal.time_base_get_id_by_name("t").is_ok());
        osal.teardown().unwrap();
    }

    #[test]
    fn test_set_validation() {
        let osal = osal();
        let (id, _) = osal.timer_create("t", |_| {}).unwrap();
        assert_eq!(osal.timer_set(id, 0, 0), Err(OsalError::TimerInvalidArgs));
        assert_eq!(
            osal.timer_set(id, TIMER_MAX_ARG, 10),
            Err(OsalError::TimerInvalidArgs)
        );
        assert_eq!(
            osal.timer_set(id, 10, TIMER_MAX_ARG),
            Err(OsalError::TimerInvalidArgs)
        );
        assert!(osal.timer_set(id, TIMER_MAX_ARG - 1, 0).is_ok());
        osal.teardown().unwrap();
    }

    #[test]
    fn test_delete_removes_dedicated_timebase() {
        let osal = osal();
        let (id, _) = osal.timer_create("t", |_| {}).unwrap();
        let timebase_id = osal.time_base_get_id_by_name("t").unwrap();
        osal.timer_delete(id).unwrap();
        assert_eq!(osal.timer_get_info(id).err(), Some(OsalError::InvalidId));
        assert_eq!(
            osal.time_base_get_info(timebase_id).err(),
            Some(OsalError::InvalidId)
        );
        osal.teardown().unwrap();
    }

    #[test]
    fn test_add_holds_timebase_reference() {
        let osal = osal();
        let timebase_id = osal.time_base_create("tb", None).unwrap();
        let timer = osal.timer_add("cb", timebase_id, |_| {}).unwrap();
        assert_eq!(
            osal.inner.registry.refcount(ObjectType::TimeBase, timebase_id),
            Ok(1)
        );
        assert_eq!(
            osal.time_base_delete(timebase_id),
            Err(OsalError::ObjectInUse)
        );

        osal.timer_delete(timer).unwrap();
        // Shared timebase survives its timers
        assert_eq!(
            osal.inner.registry.refcount(ObjectType::TimeBase, timebase_id),
            Ok(0)
        );
        osal.time_base_delete(timebase_id).unwrap();
        osal.teardown().unwrap();
    }

    #[test]
    fn test_add_to_unknown_timebase() {
        let osal = osal();
        let bogus = ObjectId::encode(ObjectType::TimeBase, 1, 3);
        assert_eq!(
            osal.timer_add("cb", bogus, |_| {}),
            Err(OsalError::InvalidId)
        );
        osal.teardown().unwrap();
    }

    #[test]
    fn test_ring_tracks_add_and_delete() {
        let osal = osal();
        let timebase_id = osal.time_base_create("tb", None).unwrap();
        let a = osal.timer_add("a", timebase_id, |_| {}).unwrap();
        let b = osal.timer_add("b", timebase_id, |_| {}).unwrap();
        let c = osal.timer_add("c", timebase_id, |_| {}).unwrap();
        assert_eq!(osal.time_base_timers(timebase_id).unwrap(), vec![c, b, a]);

        osal.timer_delete(b).unwrap();
        assert_eq!(osal.time_base_timers(timebase_id).unwrap(), vec![c, a]);
        osal.timer_delete(c).unwrap();
        osal.timer_delete(a).unwrap();
        assert!(osal.time_base_timers(timebase_id).unwrap().is_empty());
        osal.teardown().unwrap();
    }

    #[test]
    fn test_info_reflects_set() {
        let osal = osal();
        let (id, _) = osal.timer_create("t", |_| {}).unwrap();
        osal.timer_set(id, 500_000, 250_000).unwrap();
        let info = osal.timer_get_info(id).unwrap();
        assert_eq!(info.name, "t");
        assert_eq!(info.interval_time, 250_000);
        assert_eq!(info.backlog_resets, 0);
        osal.teardown().unwrap();
    }
}
