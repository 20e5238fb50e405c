/*!
 * Tick Sources
 * Internal (monotonic clock) and external (user sync function) tick sources
 */

use crate::core::errors::OsalResult;
use crate::core::id::ObjectId;
use crate::provider::{ExternalSync, TickSource};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Schedule {
    start_time: u32,
    interval_time: u32,
    /// Next tick; None while unarmed
    next: Option<Instant>,
    /// The next tick is the first after (re)configuration
    first: bool,
    stopped: bool,
}

impl Schedule {
    fn arm(&mut self, now: Instant) {
        let first_delay = if self.start_time > 0 {
            self.start_time
        } else {
            self.interval_time
        };
        self.first = true;
        self.next = (first_delay > 0).then(|| now + micros(first_delay));
    }

    /// Consume a due tick, returning elapsed microseconds
    ///
    /// Missed periods are folded into one reading so a stalled consumer sees
    /// a single large tick instead of a burst.
    fn fire(&mut self, due: Instant, now: Instant) -> u32 {
        let mut elapsed = if self.first {
            if self.start_time > 0 {
                self.start_time
            } else {
                self.interval_time
            }
        } else {
            self.interval_time
        };
        self.first = false;

        if self.interval_time == 0 {
            self.next = None;
            return elapsed;
        }
        let period = micros(self.interval_time);
        let behind = now.saturating_duration_since(due);
        let missed = u32::try_from(behind.as_micros() / period.as_micros().max(1))
            .unwrap_or(u32::MAX);
        elapsed = elapsed.saturating_add(missed.saturating_mul(self.interval_time));
        let next = period
            .checked_mul(missed.saturating_add(1))
            .and_then(|skip| due.checked_add(skip))
            .unwrap_or(now + period);
        self.next = Some(next);
        elapsed
    }
}

#[inline]
fn micros(us: u32) -> Duration {
    Duration::from_micros(u64::from(us))
}

/// Internally generated ticks in microseconds
///
/// Unarmed (start and interval both zero) it blocks until configured or shut
/// down. Reconfiguration restarts the schedule from the moment of the call.
#[derive(Debug, Default)]
pub struct IntervalTickSource {
    schedule: Mutex<Schedule>,
    cv: Condvar,
    accuracy_usec: u32,
}

impl IntervalTickSource {
    pub fn new(accuracy_usec: u32) -> Self {
        Self {
            accuracy_usec,
            ..Self::default()
        }
    }
}

impl TickSource for IntervalTickSource {
    fn wait_tick(&self, _timebase_id: ObjectId) -> u32 {
        let mut schedule = self.schedule.lock();
        loop {
            if schedule.stopped {
                return 0;
            }
            match schedule.next {
                None => self.cv.wait(&mut schedule),
                Some(due) => {
                    let now = Instant::now();
                    if now >= due {
                        return schedule.fire(due, now);
                    }
                    // Woken early means reconfigured or stopped; loop re-reads
                    let _ = self.cv.wait_until(&mut schedule, due);
                }
            }
        }
    }

    fn configure(&self, start_time: u32, interval_time: u32) -> OsalResult<()> {
        let mut schedule = self.schedule.lock();
        schedule.start_time = start_time;
        schedule.interval_time = interval_time;
        schedule.arm(Instant::now());
        self.cv.notify_all();
        Ok(())
    }

    fn shutdown(&self) {
        self.schedule.lock().stopped = true;
        self.cv.notify_all();
    }

    fn accuracy_usec(&self) -> u32 {
        self.accuracy_usec
    }
}

/// Ticks delivered by a caller-supplied synchronization function
///
/// The function blocks until its own notion of a tick and returns the
/// elapsed ticks. It cannot be interrupted, so shutdown only takes effect
/// once the function returns.
pub struct ExternalTickSource {
    sync: ExternalSync,
    stopped: AtomicBool,
    accuracy_usec: u32,
}

impl ExternalTickSource {
    pub fn new(sync: ExternalSync, accuracy_usec: u32) -> Self {
        Self {
            sync,
            stopped: AtomicBool::new(false),
            accuracy_usec,
        }
    }
}

impl TickSource for ExternalTickSource {
    fn wait_tick(&self, timebase_id: ObjectId) -> u32 {
        if self.stopped.load(Ordering::Acquire) {
            return 0;
        }
        (self.sync)(timebase_id)
    }

    fn configure(&self, _start_time: u32, _interval_time: u32) -> OsalResult<()> {
        // Period is owned by the external driver
        Ok(())
    }

    fn shutdown(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    fn accuracy_usec(&self) -> u32 {
        self.accuracy_usec
    }

    fn interruptible(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_first_tick_uses_start_time() {
        let source = IntervalTickSource::new(1);
        source.configure(2_000, 5_000).unwrap();
        let begin = Instant::now();
        assert_eq!(source.wait_tick(ObjectId::UNDEFINED), 2_000);
        assert!(begin.elapsed() >= Duration::from_micros(2_000));
    }

    #[test]
    fn test_missed_periods_fold_into_one_tick() {
        let mut schedule = Schedule {
            start_time: 0,
            interval_time: 1_000,
            ..Schedule::default()
        };
        let t0 = Instant::now();
        schedule.arm(t0);
        let due = schedule.next.unwrap();
        let elapsed = schedule.fire(due, due + Duration::from_micros(3_500));
        assert_eq!(elapsed, 4_000);
        assert_eq!(schedule.next, Some(due + Duration::from_micros(4_000)));
    }

    #[test]
    fn test_long_stall_saturates() {
        let mut schedule = Schedule {
            start_time: 0,
            interval_time: 1_000,
            ..Schedule::default()
        };
        schedule.arm(Instant::now());
        let due = schedule.next.unwrap();
        // Far more missed periods than fit in a u32
        let now = due + Duration::from_secs(10 * 365 * 86_400);
        assert_eq!(schedule.fire(due, now), u32::MAX);
        assert!(schedule.next.unwrap() > due);
    }

    #[test]
    fn test_one_shot_disarms() {
        let mut schedule = Schedule {
            start_time: 500,
            interval_time: 0,
            ..Schedule::default()
        };
        let t0 = Instant::now();
        schedule.arm(t0);
        let due = schedule.next.unwrap();
        assert_eq!(schedule.fire(due, due), 500);
        assert_eq!(schedule.next, None);
    }

    #[test]
    fn test_shutdown_wakes_unarmed_waiter() {
        let source = Arc::new(IntervalTickSource::new(1));
        let waiter = {
            let source = Arc::clone(&source);
            thread::spawn(move || source.wait_tick(ObjectId::UNDEFINED))
        };
        thread::sleep(Duration::from_millis(20));
        source.shutdown();
        assert_eq!(waiter.join().unwrap(), 0);
    }

    #[test]
    fn test_external_source_delegates() {
        let source = ExternalTickSource::new(Arc::new(|_: ObjectId| 42), 1);
        assert_eq!(source.wait_tick(ObjectId::UNDEFINED), 42);
        source.shutdown();
        assert_eq!(source.wait_tick(ObjectId::UNDEFINED), 0);
        assert!(!source.interruptible());
    }
}
