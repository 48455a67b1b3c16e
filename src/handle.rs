//! `EventHandle`: a cancellable reference to one pending queue entry.
//!
//! The entity that declares a handle keeps it for the whole run and reuses
//! it for every occurrence of one recurring action. Only the scheduler
//! changes its state: binding on schedule, clearing on fire and on kill.

use std::cell::Cell;
use std::rc::Rc;

use crate::event::SeqNo;
use crate::time::Tick;

/// Reference cell with two states: unscheduled, or scheduled to one entry.
///
/// Clones share the same cell, so the copy stored in the queue entry and
/// the copy held by the owning entity always agree.
#[derive(Debug, Clone, Default)]
pub struct EventHandle {
    slot: Rc<Cell<Option<(SeqNo, Tick)>>>,
}

impl EventHandle {
    /// Create an unscheduled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live entry is bound to this handle.
    #[inline]
    pub fn is_scheduled(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Sequence number of the live entry.
    #[inline]
    pub fn scheduled_seq(&self) -> Option<SeqNo> {
        self.slot.get().map(|(seq, _)| seq)
    }

    /// Due tick of the live entry.
    #[inline]
    pub fn due(&self) -> Option<Tick> {
        self.slot.get().map(|(_, due)| due)
    }

    pub(crate) fn bind(&self, seq: SeqNo, due: Tick) {
        self.slot.set(Some((seq, due)));
    }

    pub(crate) fn clear(&self) {
        self.slot.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_handle_is_unscheduled() {
        let h = EventHandle::new();
        assert!(!h.is_scheduled());
        assert_eq!(h.scheduled_seq(), None);
        assert_eq!(h.due(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let h = EventHandle::new();
        let queued = h.clone();
        queued.bind(SeqNo::new(7), Tick::new(100));
        assert!(h.is_scheduled());
        assert_eq!(h.scheduled_seq(), Some(SeqNo::new(7)));
        assert_eq!(h.due(), Some(Tick::new(100)));
        h.clear();
        assert!(!queued.is_scheduled());
    }
}
