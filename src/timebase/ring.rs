/*!
 * Callback Ring
 * Timer-callback records and the circular index-linked ring per timebase
 *
 * Records live in one arena indexed by the timer-callback table slot. Each
 * timebase owns a ring threaded through `prev`/`next` indices; the head is
 * held in the timebase state, so every ring mutation requires that lock.
 * Record locks are leaf locks: nothing else is acquired while one is held.
 */

use crate::core::id::ObjectId;
use crate::idmap::HeldRef;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;

/// User callback invoked with the firing timer's ID
pub type TimerCallback = Arc<dyn Fn(ObjectId) + Send + Sync>;

/// One timer-callback record
pub struct TimerCbRecord {
    pub timer_id: ObjectId,
    /// Counted reference on the owning timebase
    pub timebase: Option<HeldRef>,
    pub prev: usize,
    pub next: usize,
    /// Member of its timebase ring
    pub linked: bool,
    /// Remaining ticks until the next fire; signed so overruns are visible
    pub wait_time: i64,
    /// Reload value; zero or less means one-shot
    pub interval_time: i64,
    pub backlog_resets: u32,
    pub callback: Option<TimerCallback>,
    /// The timebase was created for this timer and dies with it
    pub dedicated_timebase: bool,
}

impl TimerCbRecord {
    fn empty(index: usize) -> Self {
        Self {
            timer_id: ObjectId::UNDEFINED,
            timebase: None,
            prev: index,
            next: index,
            linked: false,
            wait_time: 0,
            interval_time: 0,
            backlog_resets: 0,
            callback: None,
            dedicated_timebase: false,
        }
    }

    /// Reset to an unarmed record for a new timer
    pub fn reset(
        &mut self,
        index: usize,
        timer_id: ObjectId,
        timebase: HeldRef,
        callback: TimerCallback,
        dedicated_timebase: bool,
    ) {
        *self = Self::empty(index);
        self.timer_id = timer_id;
        self.timebase = Some(timebase);
        self.callback = Some(callback);
        self.dedicated_timebase = dedicated_timebase;
    }
}

impl fmt::Debug for TimerCbRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerCbRecord")
            .field("timer_id", &self.timer_id)
            .field("prev", &self.prev)
            .field("next", &self.next)
            .field("linked", &self.linked)
            .field("wait_time", &self.wait_time)
            .field("interval_time", &self.interval_time)
            .field("backlog_resets", &self.backlog_resets)
            .field("dedicated_timebase", &self.dedicated_timebase)
            .finish()
    }
}

/// Arena of timer-callback records, one per timer table slot
pub struct CallbackArena {
    slots: Box<[Mutex<TimerCbRecord>]>,
}

impl CallbackArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity)
                .map(|i| Mutex::new(TimerCbRecord::empty(i)))
                .collect(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Lock one record
    ///
    /// Panics on an out-of-range index; indices come from validated IDs.
    #[inline]
    pub fn record(&self, index: usize) -> MutexGuard<'_, TimerCbRecord> {
        debug_assert!(
            index < self.slots.len(),
            "timer record {} outside arena of {}",
            index,
            self.slots.len()
        );
        self.slots[index].lock()
    }

    /// Link `index` as the new head of the ring rooted at `head`
    pub fn insert_head(&self, head: &mut Option<usize>, index: usize) {
        match *head {
            None => {
                let mut node = self.record(index);
                node.prev = index;
                node.next = index;
                node.linked = true;
            }
            Some(old_head) => {
                let tail = self.record(old_head).prev;
                {
                    let mut node = self.record(index);
                    node.prev = tail;
                    node.next = old_head;
                    node.linked = true;
                }
                self.record(tail).next = index;
                self.record(old_head).prev = index;
            }
        }
        *head = Some(index);
    }

    /// Unlink `index` from the ring rooted at `head`
    ///
    /// The removed node is left self-referencing.
    pub fn remove(&self, head: &mut Option<usize>, index: usize) {
        let (prev, next) = {
            let node = self.record(index);
            if !node.linked {
                return;
            }
            (node.prev, node.next)
        };

        if next == index {
            *head = None;
        } else {
            self.record(prev).next = next;
            self.record(next).prev = prev;
            if *head == Some(index) {
                *head = Some(next);
            }
        }

        let mut node = self.record(index);
        node.prev = index;
        node.next = index;
        node.linked = false;
    }

    /// Ring members in `next` order starting at `head`
    ///
    /// Bounded by the arena capacity so a corrupted ring cannot spin.
    pub fn walk(&self, head: Option<usize>) -> Vec<usize> {
        let Some(first) = head else {
            return Vec::new();
        };
        let mut members = vec![first];
        let mut current = self.record(first).next;
        while current != first && members.len() < self.capacity() {
            members.push(current);
            current = self.record(current).next;
        }
        members
    }
}

impl fmt::Debug for CallbackArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackArena")
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn assert_circular(arena: &CallbackArena, head: Option<usize>, expected_len: usize) {
        let members = arena.walk(head);
        assert_eq!(members.len(), expected_len);
        assert_eq!(head.is_none(), expected_len == 0);
        for &m in &members {
            let next = arena.record(m).next;
            assert_eq!(arena.record(next).prev, m);
        }
    }

    #[test]
    fn test_single_member_self_links() {
        let arena = CallbackArena::new(4);
        let mut head = None;
        arena.insert_head(&mut head, 2);
        assert_eq!(head, Some(2));
        let node = arena.record(2);
        assert_eq!((node.prev, node.next), (2, 2));
    }

    #[test]
    fn test_insert_at_head_order() {
        let arena = CallbackArena::new(4);
        let mut head = None;
        for i in 0..3 {
            arena.insert_head(&mut head, i);
        }
        assert_eq!(arena.walk(head), vec![2, 1, 0]);
        assert_circular(&arena, head, 3);
    }

    #[test]
    fn test_remove_head_advances() {
        let arena = CallbackArena::new(4);
        let mut head = None;
        arena.insert_head(&mut head, 0);
        arena.insert_head(&mut head, 1);
        arena.remove(&mut head, 1);
        assert_eq!(head, Some(0));
        assert_circular(&arena, head, 1);
    }

    #[test]
    fn test_remove_last_empties_ring() {
        let arena = CallbackArena::new(2);
        let mut head = None;
        arena.insert_head(&mut head, 1);
        arena.remove(&mut head, 1);
        assert_eq!(head, None);
        let node = arena.record(1);
        assert_eq!((node.prev, node.next, node.linked), (1, 1, false));
    }

    #[test]
    fn test_remove_unlinked_is_noop() {
        let arena = CallbackArena::new(2);
        let mut head = None;
        arena.insert_head(&mut head, 0);
        arena.remove(&mut head, 1);
        assert_eq!(head, Some(0));
    }

    proptest! {
        #[test]
        fn prop_ring_stays_circular(ops in proptest::collection::vec((any::<bool>(), 0usize..8), 0..64)) {
            let arena = CallbackArena::new(8);
            let mut head = None;
            let mut live = std::collections::BTreeSet::new();
            for (insert, index) in ops {
                if insert && !live.contains(&index) {
                    arena.insert_head(&mut head, index);
                    live.insert(index);
                } else if !insert && live.contains(&index) {
                    arena.remove(&mut head, index);
                    live.remove(&index);
                }
                let members = arena.walk(head);
                prop_assert_eq!(members.len(), live.len());
                prop_assert_eq!(head.is_none(), live.is_empty());
                if let Some(first) = head {
                    let mut current = first;
                    for _ in 0..live.len() {
                        current = arena.record(current).next;
                    }
                    prop_assert_eq!(current, first);
                }
            }
        }
    }
}
