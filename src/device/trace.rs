//! TraceEntry: records every state-machine entry point a device runs.

use crate::time::Tick;

use super::id::DeviceId;
use super::state::DeviceState;

/// The device operation a [`TraceEntry`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TraceOp {
    StartStep,
    EndStep,
    UpdateProgress,
    StopProcessing,
    UnscheduledUpdate,
    PerformUnscheduledUpdate,
    ResetProcess,
    ThresholdChanged,
    PrepareForDowntime,
    StartDowntime,
    EndDowntime,
    /// The visible state label changed to the given value.
    StateChanged(DeviceState),
}

impl std::fmt::Display for TraceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceOp::StateChanged(s) => write!(f, "StateChanged({s})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Snapshot of a device's flags when an entry point ran.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceFlags {
    pub busy: bool,
    pub step_scheduled: bool,
    pub available: bool,
    pub step_completed: bool,
    pub forced_pending: bool,
    pub immediate_pending: bool,
    /// Remaining step duration in seconds.
    pub remaining: f64,
}

/// A record of a single device operation.
///
/// Appended by the device when tracing is enabled and collected by
/// `DeviceRuntime` after each dispatch. Purely diagnostic.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    /// Clock tick at which the operation ran.
    pub time: Tick,
    /// The device that ran it.
    pub device: DeviceId,
    pub op: TraceOp,
    pub flags: TraceFlags,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |on: bool, c: char| if on { c } else { '-' };
        write!(
            f,
            "[T={} {}] {} {}{}{}{}{}{} rem={}",
            self.time.ticks(),
            self.device,
            self.op,
            flag(self.flags.busy, 'B'),
            flag(self.flags.step_scheduled, 'S'),
            flag(self.flags.available, 'A'),
            flag(self.flags.step_completed, 'C'),
            flag(self.flags.forced_pending, 'F'),
            flag(self.flags.immediate_pending, 'I'),
            self.flags.remaining,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_entry_display() {
        let entry = TraceEntry {
            time: Tick::new(4_000_000),
            device: DeviceId::new(1),
            op: TraceOp::StateChanged(DeviceState::Stopped),
            flags: TraceFlags {
                busy: false,
                step_scheduled: false,
                available: false,
                step_completed: false,
                forced_pending: false,
                immediate_pending: true,
                remaining: 6.0,
            },
        };
        assert_eq!(
            entry.to_string(),
            "[T=4000000 D1] StateChanged(Stopped) -----I rem=6"
        );
    }
}
