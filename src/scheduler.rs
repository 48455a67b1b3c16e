/// Deterministic event queue.
///
/// A `BinaryHeap` with reversed `Ord` on `Event` acts as a min-heap keyed
/// by `(due, priority, lane)`. Sequence numbers are strictly increasing, so
/// two runs with the same insertion order dispatch in the same order.
///
/// Killing an entry is lazy: the handle is cleared and the heap entry goes
/// stale. Stale entries are never returned and never counted as pending.

use std::collections::BinaryHeap;

use crate::error::{SimError, SimResult};
use crate::event::{Event, Lane, Priority, ProcessTarget, SeqGen, SeqNo};
use crate::handle::EventHandle;
use crate::time::Tick;

/// Stale entries tolerated before the heap is compacted.
const COMPACT_THRESHOLD: usize = 64;

/// The event queue.
///
/// Owns the heap and the sequence generator. All scheduling goes through
/// this struct so sequence numbers stay monotonic.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Event>,
    seq_gen: SeqGen,
    live: usize,
}

impl Scheduler {
    /// Create a new, empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry due at an absolute tick.
    ///
    /// Fails with [`SimError::HandleAlreadyScheduled`] if `handle` already
    /// has a live entry; the caller must kill it first.
    pub fn schedule(
        &mut self,
        due: Tick,
        priority: Priority,
        fifo: bool,
        target: ProcessTarget,
        handle: Option<&EventHandle>,
    ) -> SimResult<SeqNo> {
        if let Some(due) = handle.and_then(EventHandle::due) {
            return Err(SimError::HandleAlreadyScheduled { due });
        }

        let seq = self.seq_gen.next_seq();
        if let Some(h) = handle {
            h.bind(seq, due);
        }
        self.queue.push(Event {
            due,
            priority,
            lane: Lane::for_insert(seq, fifo),
            target,
            handle: handle.cloned(),
        });
        self.live += 1;
        Ok(seq)
    }

    /// Remove the entry bound to `handle`. No-op if nothing is scheduled.
    pub fn kill(&mut self, handle: &EventHandle) {
        if !handle.is_scheduled() {
            return;
        }
        handle.clear();
        self.live -= 1;

        let stale = self.queue.len() - self.live;
        if stale > COMPACT_THRESHOLD && stale > self.live {
            self.queue.retain(Event::is_live);
        }
    }

    /// Pop the next live entry and unschedule its handle.
    ///
    /// Returns `None` when no live entry remains.
    pub fn pop_next(&mut self) -> Option<Event> {
        while let Some(event) = self.queue.pop() {
            if !event.is_live() {
                continue;
            }
            if let Some(h) = &event.handle {
                h.clear();
            }
            self.live -= 1;
            return Some(event);
        }
        None
    }

    /// Peek at the next live entry without removing it.
    pub fn peek_next(&mut self) -> Option<&Event> {
        while self.queue.peek().is_some_and(|e| !e.is_live()) {
            self.queue.pop();
        }
        self.queue.peek()
    }

    /// Returns `true` if no live entry is pending.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    /// The sequence number the next insertion will receive.
    pub fn next_seq(&self) -> SeqNo {
        self.seq_gen.peek()
    }

    /// Drop every entry, unschedule every live handle and restart the
    /// sequence numbering.
    pub fn clear(&mut self) {
        for event in self.queue.drain() {
            if event.is_live() {
                if let Some(h) = &event.handle {
                    h.clear();
                }
            }
        }
        self.live = 0;
        self.seq_gen = SeqGen::new();
    }

    /// Drain all live entries in dispatch order.
    pub fn drain_ordered(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.live);
        while let Some(e) = self.pop_next() {
            events.push(e);
        }
        events
    }
}

/// Entries still queued when the scheduler goes away can never fire.
impl Drop for Scheduler {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(msg: &str) -> ProcessTarget {
        ProcessTarget::Log(msg.into())
    }

    fn labels(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .map(|e| match &e.target {
                ProcessTarget::Log(m) => m.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_fifo_at_same_tick_and_priority() {
        let mut sched = Scheduler::new();
        sched.schedule(Tick::new(10), 5, true, log("first"), None).unwrap();
        sched.schedule(Tick::new(10), 5, true, log("second"), None).unwrap();
        sched.schedule(Tick::new(10), 5, true, log("third"), None).unwrap();

        assert_eq!(labels(&sched.drain_ordered()), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_priority_then_tick_ordering() {
        let mut sched = Scheduler::new();
        sched.schedule(Tick::new(30), 0, true, log("late"), None).unwrap();
        sched.schedule(Tick::new(10), 10, true, log("update"), None).unwrap();
        sched.schedule(Tick::new(10), 5, true, log("completion"), None).unwrap();

        assert_eq!(
            labels(&sched.drain_ordered()),
            vec!["completion", "update", "late"]
        );
    }

    #[test]
    fn test_lifo_entry_jumps_its_lane() {
        let mut sched = Scheduler::new();
        sched.schedule(Tick::new(1), 5, true, log("a"), None).unwrap();
        sched.schedule(Tick::new(1), 5, false, log("b"), None).unwrap();
        sched.schedule(Tick::new(1), 5, false, log("c"), None).unwrap();

        assert_eq!(labels(&sched.drain_ordered()), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_double_schedule_on_handle_fails() {
        let mut sched = Scheduler::new();
        let h = EventHandle::new();
        sched.schedule(Tick::new(5), 5, true, log("x"), Some(&h)).unwrap();

        let err = sched
            .schedule(Tick::new(6), 5, true, log("y"), Some(&h))
            .unwrap_err();
        assert!(matches!(err, SimError::HandleAlreadyScheduled { due } if due == Tick::new(5)));
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn test_kill_then_reschedule() {
        let mut sched = Scheduler::new();
        let h = EventHandle::new();
        sched.schedule(Tick::new(50), 5, true, log("old"), Some(&h)).unwrap();
        sched.kill(&h);
        assert!(!h.is_scheduled());
        assert!(sched.is_empty());

        sched.schedule(Tick::new(20), 5, true, log("new"), Some(&h)).unwrap();
        assert!(h.is_scheduled());

        let events = sched.drain_ordered();
        assert_eq!(labels(&events), vec!["new"]);
        assert!(!h.is_scheduled());
    }

    #[test]
    fn test_kill_is_idempotent() {
        let mut sched = Scheduler::new();
        let h = EventHandle::new();
        sched.kill(&h);
        sched.schedule(Tick::new(1), 5, true, log("x"), Some(&h)).unwrap();
        sched.kill(&h);
        sched.kill(&h);
        assert_eq!(sched.len(), 0);
        assert!(sched.pop_next().is_none());
    }

    #[test]
    fn test_pop_clears_handle() {
        let mut sched = Scheduler::new();
        let h = EventHandle::new();
        sched.schedule(Tick::new(3), 5, true, log("x"), Some(&h)).unwrap();
        let e = sched.pop_next().unwrap();
        assert_eq!(e.due, Tick::new(3));
        assert!(!h.is_scheduled());
    }

    #[test]
    fn test_peek_skips_stale_entries() {
        let mut sched = Scheduler::new();
        let h = EventHandle::new();
        sched.schedule(Tick::new(1), 5, true, log("dead"), Some(&h)).unwrap();
        sched.schedule(Tick::new(2), 5, true, log("alive"), None).unwrap();
        sched.kill(&h);

        let next = sched.peek_next().unwrap();
        assert_eq!(next.due, Tick::new(2));
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn test_many_kills_compact_the_heap() {
        let mut sched = Scheduler::new();
        let h = EventHandle::new();
        for i in 0..200 {
            sched.schedule(Tick::new(i), 5, true, ProcessTarget::Noop, Some(&h)).unwrap();
            sched.kill(&h);
        }
        assert!(sched.is_empty());
        assert!(sched.queue.len() <= COMPACT_THRESHOLD + 1);
    }

    #[test]
    fn test_clear_unschedules_handles() {
        let mut sched = Scheduler::new();
        let h = EventHandle::new();
        sched.schedule(Tick::new(9), 5, true, log("x"), Some(&h)).unwrap();
        sched.schedule(Tick::new(9), 5, true, log("y"), None).unwrap();
        sched.clear();
        assert!(!h.is_scheduled());
        assert!(sched.is_empty());
        assert!(sched.pop_next().is_none());
        assert_eq!(sched.next_seq(), SeqNo::new(0));
    }

    #[test]
    fn test_drop_unschedules_handles() {
        let h = EventHandle::new();
        let killed = EventHandle::new();
        {
            let mut sched = Scheduler::new();
            sched.schedule(Tick::new(9), 5, true, log("x"), Some(&h)).unwrap();
            sched.schedule(Tick::new(4), 5, true, log("y"), Some(&killed)).unwrap();
            sched.kill(&killed);
            assert!(h.is_scheduled());
        }
        assert!(!h.is_scheduled());
        assert!(!killed.is_scheduled());

        // A fresh queue can bind the same handle again.
        let mut sched = Scheduler::new();
        sched.schedule(Tick::new(1), 5, true, log("z"), Some(&h)).unwrap();
        sched.kill(&h);
        assert!(sched.is_empty());
    }

    #[test]
    fn test_determinism_across_runs() {
        fn build() -> Vec<(u64, Tick, String)> {
            let mut sched = Scheduler::new();
            sched.schedule(Tick::new(5), 5, true, log("a"), None).unwrap();
            sched.schedule(Tick::new(3), 10, true, log("b"), None).unwrap();
            sched.schedule(Tick::new(5), 1, true, log("c"), None).unwrap();
            sched.schedule(Tick::new(1), 5, false, log("d"), None).unwrap();
            sched.schedule(Tick::new(3), 10, true, log("e"), None).unwrap();
            sched
                .drain_ordered()
                .into_iter()
                .map(|e| (e.seq().raw(), e.due, e.target.to_string()))
                .collect()
        }
        assert_eq!(build(), build());
    }
}
