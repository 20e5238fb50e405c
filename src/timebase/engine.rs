/*!
 * Timebase Engine
 * Tick processing and the per-timebase servicing loop
 *
 * # Tick processing
 *
 * Each tick subtracts the elapsed time from every ring member's wait time.
 * A member whose wait time reaches zero is reloaded with its interval and
 * fires at most once per pass; when it has fallen more than one interval
 * behind, the backlog is dropped (clamped to minus one interval) and
 * `backlog_resets` counts the loss. One-shot members (interval 0) fire once
 * and then stay expired until re-armed.
 *
 * Callbacks run synchronously on the servicing thread with the timebase lock
 * held. They must be short and must not configure timers or timebases; those
 * calls fail with `IncorrectObjState` from this context.
 */

use super::ring::CallbackArena;
use crate::core::id::{ObjectId, ObjectType};
use crate::core::limits::{TIMEBASE_SPIN_DELAY, TIMEBASE_SPIN_LIMIT};
use crate::idmap::Registry;
use crate::provider::{context, TickSource};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Ring state guarded by the timebase lock
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBaseState {
    /// Head of the callback ring
    pub first_cb: Option<usize>,
}

/// Apply one tick of `tick_time` to a timebase's ring
///
/// Must be called with the timebase lock held (`state` is its guarded
/// contents). Returns the number of callbacks invoked.
pub fn process_tick(arena: &CallbackArena, state: &mut TimeBaseState, tick_time: u32) -> usize {
    let Some(first) = state.first_cb else {
        return 0;
    };

    let tick = i64::from(tick_time);
    let mut fired = 0;
    let mut current = first;
    loop {
        let (due, next) = {
            let mut node = arena.record(current);
            let next = node.next;
            let mut saved = node.wait_time;
            node.wait_time = node.wait_time.saturating_sub(tick);
            let mut due = false;
            while node.wait_time <= 0 {
                let interval = node.interval_time;
                node.wait_time = node.wait_time.saturating_add(interval);

                if interval > 0 && node.wait_time < -interval {
                    node.wait_time = -interval;
                    node.backlog_resets = node.backlog_resets.saturating_add(1);
                }

                if saved > 0 && node.callback.is_some() {
                    due = true;
                }
                saved = node.wait_time;

                if interval <= 0 {
                    break;
                }
            }
            let due = due
                .then(|| node.callback.clone().map(|cb| (cb, node.timer_id)))
                .flatten();
            (due, next)
        };

        // Record lock released; callbacks may query their own timer
        if let Some((callback, timer_id)) = due {
            callback(timer_id);
            fired += 1;
        }

        current = next;
        if current == first {
            break;
        }
    }
    fired
}

/// Consecutive zero-tick detector
#[derive(Debug, Default)]
pub(crate) struct SpinGuard {
    consecutive: u32,
    warned: bool,
}

impl SpinGuard {
    /// Record one tick reading; true if the caller should back off
    pub fn observe(&mut self, timebase_id: ObjectId, tick_time: u32) -> bool {
        if tick_time != 0 {
            self.consecutive = 0;
            return false;
        }
        self.consecutive = self.consecutive.saturating_add(1);
        if self.consecutive < TIMEBASE_SPIN_LIMIT {
            return false;
        }
        if !self.warned {
            self.warned = true;
            warn!(
                %timebase_id,
                readings = self.consecutive,
                "timebase tick source returning zero repeatedly; throttling"
            );
        }
        true
    }
}

/// Everything a servicing context needs, shared with the owning `Osal`
pub(crate) struct Servicer {
    pub registry: Arc<Registry>,
    pub arena: Arc<CallbackArena>,
    pub state: Arc<Mutex<TimeBaseState>>,
    /// Free-running accumulator of every tick delivered (wraps)
    pub freerun: Arc<AtomicU32>,
    pub source: Arc<dyn TickSource>,
    pub timebase_id: ObjectId,
}

impl Servicer {
    /// Whether the registry still publishes this timebase's identity
    #[inline]
    fn still_current(&self) -> bool {
        self.registry
            .published_id(ObjectType::TimeBase, self.timebase_id.index())
            == self.timebase_id
    }

    /// Run until the timebase is deleted
    ///
    /// Identity is re-validated under the timebase lock after every wait, so
    /// a delete that has claimed the slot stops the loop before any further
    /// callback runs.
    pub fn run(self) {
        let _context = context::enter(self.timebase_id);
        let mut spin = SpinGuard::default();
        debug!(timebase_id = %self.timebase_id, "timebase servicing started");

        loop {
            let tick_time = self.source.wait_tick(self.timebase_id);
            {
                let mut state = self.state.lock();
                if !self.still_current() {
                    break;
                }
                self.freerun.fetch_add(tick_time, Ordering::AcqRel);
                process_tick(&self.arena, &mut state, tick_time);
            }
            if spin.observe(self.timebase_id, tick_time) {
                thread::sleep(TIMEBASE_SPIN_DELAY);
            }
        }

        debug!(timebase_id = %self.timebase_id, "timebase servicing stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ObjectLimits, OsalConfig};
    use crate::idmap::{HeldRef, LockMode};
    use crate::provider::MockTickSource;
    use crate::timebase::TimerCallback;

    fn held(index: usize) -> HeldRef {
        HeldRef {
            id: ObjectId::encode(ObjectType::TimeBase, index, 1),
        }
    }

    fn counter() -> (Arc<AtomicU32>, TimerCallback) {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        let callback: TimerCallback = Arc::new(move |_: ObjectId| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    fn arm(
        arena: &CallbackArena,
        state: &mut TimeBaseState,
        index: usize,
        wait: i64,
        interval: i64,
    ) -> Arc<AtomicU32> {
        let (count, callback) = counter();
        let id = ObjectId::encode(ObjectType::TimerCb, index, 1);
        arena.record(index).reset(index, id, held(0), callback, false);
        arena.insert_head(&mut state.first_cb, index);
        let mut node = arena.record(index);
        node.wait_time = wait;
        node.interval_time = interval;
        count
    }

    #[test]
    fn test_empty_ring_is_noop() {
        let arena = CallbackArena::new(2);
        let mut state = TimeBaseState::default();
        assert_eq!(process_tick(&arena, &mut state, 250), 0);
        assert_eq!(state.first_cb, None);
    }

    #[test]
    fn test_periodic_fires_each_interval() {
        let arena = CallbackArena::new(2);
        let mut state = TimeBaseState::default();
        let count = arm(&arena, &mut state, 0, 1_000, 500);

        process_tick(&arena, &mut state, 1_000);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        for _ in 0..4 {
            process_tick(&arena, &mut state, 500);
        }
        assert_eq!(count.load(Ordering::SeqCst), 5);
        assert_eq!(arena.record(0).backlog_resets, 0);
    }

    #[test]
    fn test_huge_tick_clamps_backlog() {
        let arena = CallbackArena::new(2);
        let mut state = TimeBaseState::default();
        let count = arm(&arena, &mut state, 0, 100, 100);

        let fired = process_tick(&arena, &mut state, 100_000);
        assert_eq!(fired, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        let node = arena.record(0);
        assert!(node.backlog_resets >= 1);
        assert!(node.wait_time >= -node.interval_time);
    }

    #[test]
    fn test_one_shot_fires_once() {
        let arena = CallbackArena::new(2);
        let mut state = TimeBaseState::default();
        let count = arm(&arena, &mut state, 0, 300, 0);

        for _ in 0..20 {
            process_tick(&arena, &mut state, 100);
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(arena.record(0).backlog_resets, 0);
    }

    #[test]
    fn test_unarmed_timer_never_fires() {
        let arena = CallbackArena::new(2);
        let mut state = TimeBaseState::default();
        let count = arm(&arena, &mut state, 0, 0, 0);

        for _ in 0..10 {
            process_tick(&arena, &mut state, u32::MAX);
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(arena.record(0).backlog_resets, 0);
    }

    #[test]
    fn test_ring_order_from_head() {
        let arena = CallbackArena::new(3);
        let mut state = TimeBaseState::default();
        let order = Arc::new(Mutex::new(Vec::new()));
        for index in 0..3 {
            let order = Arc::clone(&order);
            let id = ObjectId::encode(ObjectType::TimerCb, index, 1);
            arena.record(index).reset(
                index,
                id,
                held(0),
                Arc::new(move |fired: ObjectId| order.lock().push(fired.index())),
                false,
            );
            arena.insert_head(&mut state.first_cb, index);
            let mut node = arena.record(index);
            node.wait_time = 10;
            node.interval_time = 10;
        }
        process_tick(&arena, &mut state, 10);
        assert_eq!(*order.lock(), vec![2, 1, 0]);
    }

    #[test]
    fn test_spin_guard_threshold_and_reset() {
        let mut guard = SpinGuard::default();
        let id = ObjectId::encode(ObjectType::TimeBase, 0, 1);
        for _ in 1..TIMEBASE_SPIN_LIMIT {
            assert!(!guard.observe(id, 0));
        }
        assert!(guard.observe(id, 0));
        assert!(guard.warned);
        assert!(!guard.observe(id, 5));
        assert!(!guard.observe(id, 0));
    }

    #[test]
    fn test_servicer_runs_until_identity_changes() {
        let config = OsalConfig {
            limits: ObjectLimits::uniform(4),
            ..OsalConfig::default()
        };
        let registry = Arc::new(Registry::new(&config));
        registry.set_initialized(true);
        let token = registry
            .allocate_new(ObjectType::TimeBase, Some("tb"))
            .unwrap();
        let timebase_id = registry.finalize_new(Ok(()), token).unwrap();

        let calls = Arc::new(AtomicU32::new(0));
        let mut source = MockTickSource::new();
        {
            let registry = Arc::clone(&registry);
            let calls = Arc::clone(&calls);
            source.expect_wait_tick().returning(move |id| {
                assert_eq!(context::current_id(), id);
                if calls.fetch_add(1, Ordering::SeqCst) == 3 {
                    let token = registry
                        .get_by_id(LockMode::Exclusive, ObjectType::TimeBase, id)
                        .unwrap();
                    registry.finalize_delete(Ok(()), token).unwrap();
                }
                100
            });
        }

        let freerun = Arc::new(AtomicU32::new(0));
        Servicer {
            registry,
            arena: Arc::new(CallbackArena::new(4)),
            state: Arc::new(Mutex::new(TimeBaseState::default())),
            freerun: Arc::clone(&freerun),
            source: Arc::new(source),
            timebase_id,
        }
        .run();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // The fourth tick arrives after the delete and is discarded
        assert_eq!(freerun.load(Ordering::SeqCst), 300);
        assert_eq!(context::current_id(), ObjectId::UNDEFINED);
    }
}
