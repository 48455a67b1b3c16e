/// Scheduled events for the process kernel.
///
/// An `Event` is one entry of the scheduler's queue: a due tick, a
/// priority, an insertion lane, the `ProcessTarget` to run, and the
/// optional `EventHandle` bound to the entry. Entries are ordered by
/// `(due, priority, lane)`, which gives a total, replayable order.

use std::cmp::{Ordering, Reverse};

use crate::device::{DeviceId, Downtime, DowntimeId};
use crate::handle::EventHandle;
use crate::time::Tick;

/// Scheduling priority. Lower values run first within a tick.
pub type Priority = i32;

// ── Sequence numbers ──────────────────────────────────────────────────

/// A strictly increasing insertion sequence number.
///
/// Breaks ties between entries with the same tick and priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SeqNo(u64);

impl SeqNo {
    /// Wrap a raw u64 into a `SeqNo`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        SeqNo(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SeqNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

/// Deterministic sequence-number generator. One per scheduler.
#[derive(Debug, Clone, Default)]
pub struct SeqGen {
    next: u64,
}

impl SeqGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        SeqGen { next: 0 }
    }

    /// Mint the next sequence number.
    pub fn next_seq(&mut self) -> SeqNo {
        let seq = SeqNo(self.next);
        self.next += 1;
        seq
    }

    /// Peek at the next number without consuming it.
    pub fn peek(&self) -> SeqNo {
        SeqNo(self.next)
    }
}

// ── Lane ──────────────────────────────────────────────────────────────

/// Position of an entry among entries with equal tick and priority.
///
/// LIFO entries sort ahead of every FIFO entry, newest first; FIFO entries
/// keep insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    Lifo(Reverse<SeqNo>),
    Fifo(SeqNo),
}

impl Lane {
    /// Build the lane for an insertion.
    pub fn for_insert(seq: SeqNo, fifo: bool) -> Self {
        if fifo {
            Lane::Fifo(seq)
        } else {
            Lane::Lifo(Reverse(seq))
        }
    }

    /// The insertion sequence number behind the lane.
    pub fn seq(self) -> SeqNo {
        match self {
            Lane::Lifo(Reverse(seq)) | Lane::Fifo(seq) => seq,
        }
    }
}

// ── Process Target ────────────────────────────────────────────────────

/// A deferred action bound to an entity.
///
/// Device-directed targets are dispatched by
/// [`DeviceRuntime`](crate::device::DeviceRuntime) to the bound device.
/// `Noop` and `Log` are system markers that no device sees.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcessTarget {
    /// A no-op event used for testing and heartbeats.
    Noop,

    /// A generic trace marker.
    Log(String),

    /// Try to make progress (start or resume a step).
    StartStep { device: DeviceId },

    /// Completion of the in-flight step.
    EndStep { device: DeviceId },

    /// Forced re-evaluation of the device against current conditions.
    UnscheduledUpdate { device: DeviceId },

    /// Debounced request for an unscheduled update.
    PerformUnscheduledUpdate { device: DeviceId },

    /// Abandon the in-flight step as completed and recompute it.
    ResetProcess { device: DeviceId },

    /// Open or close a named threshold on a device.
    SetThreshold {
        device: DeviceId,
        threshold: String,
        open: bool,
    },

    /// A downtime asks to take the device out of service.
    RequestDowntime { device: DeviceId, downtime: Downtime },

    /// An active downtime finishes.
    EndDowntime { device: DeviceId, downtime: DowntimeId },
}

impl ProcessTarget {
    /// The device this target is bound to, if any.
    pub fn device(&self) -> Option<DeviceId> {
        match self {
            ProcessTarget::Noop | ProcessTarget::Log(_) => None,
            ProcessTarget::StartStep { device }
            | ProcessTarget::EndStep { device }
            | ProcessTarget::UnscheduledUpdate { device }
            | ProcessTarget::PerformUnscheduledUpdate { device }
            | ProcessTarget::ResetProcess { device }
            | ProcessTarget::SetThreshold { device, .. }
            | ProcessTarget::RequestDowntime { device, .. }
            | ProcessTarget::EndDowntime { device, .. } => Some(*device),
        }
    }
}

impl std::fmt::Display for ProcessTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessTarget::Noop => write!(f, "Noop"),
            ProcessTarget::Log(msg) => write!(f, "Log({})", msg),
            ProcessTarget::StartStep { device } => write!(f, "StartStep({})", device),
            ProcessTarget::EndStep { device } => write!(f, "EndStep({})", device),
            ProcessTarget::UnscheduledUpdate { device } => {
                write!(f, "UnscheduledUpdate({})", device)
            }
            ProcessTarget::PerformUnscheduledUpdate { device } => {
                write!(f, "PerformUnscheduledUpdate({})", device)
            }
            ProcessTarget::ResetProcess { device } => write!(f, "ResetProcess({})", device),
            ProcessTarget::SetThreshold {
                device,
                threshold,
                open,
            } => {
                let verb = if *open { "open" } else { "close" };
                write!(f, "Threshold({}, {} {})", device, verb, threshold)
            }
            ProcessTarget::RequestDowntime { device, downtime } => {
                write!(f, "RequestDowntime({}, {})", device, downtime.id)
            }
            ProcessTarget::EndDowntime { device, downtime } => {
                write!(f, "EndDowntime({}, {})", device, downtime)
            }
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single queue entry.
#[derive(Debug, Clone)]
pub struct Event {
    /// The tick at which this entry is due.
    pub due: Tick,

    /// Lower runs first within a tick.
    pub priority: Priority,

    /// Position among entries with equal `(due, priority)`.
    pub lane: Lane,

    /// The action to run.
    pub target: ProcessTarget,

    /// The handle bound to this entry, if any.
    pub handle: Option<EventHandle>,
}

impl Event {
    /// The insertion sequence number of this entry.
    #[inline]
    pub fn seq(&self) -> SeqNo {
        self.lane.seq()
    }

    /// Whether this entry is still the live entry of its handle.
    ///
    /// Entries without a handle cannot be killed and are always live.
    pub fn is_live(&self) -> bool {
        match &self.handle {
            Some(handle) => handle.scheduled_seq() == Some(self.seq()),
            None => true,
        }
    }

    fn key(&self) -> (Tick, Priority, Lane) {
        (self.due, self.priority, self.lane)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Event {}

/// Ordering: smallest `(due, priority, lane)` first.
///
/// `BinaryHeap` is a max-heap, so the natural ordering is reversed here.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
