//! Run configuration.

use crate::error::{SimError, SimResult};
use crate::time::TickResolution;

/// Settings fixed for the duration of one simulation run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct SimConfig {
    /// Clock resolution; the default is one tick per microsecond.
    pub ticks_per_second: f64,

    /// Append a [`TraceEntry`](crate::device::TraceEntry) for every device
    /// state-machine entry point.
    pub trace_devices: bool,

    /// Record every fired event into an [`EventLog`](crate::eventlog::EventLog).
    pub record_events: bool,
}

impl SimConfig {
    /// The tick/seconds conversion for this configuration.
    pub fn resolution(&self) -> TickResolution {
        TickResolution::new(self.ticks_per_second)
    }

    /// Enable the device trace sink.
    pub fn with_device_trace(mut self) -> Self {
        self.trace_devices = true;
        self
    }

    /// Enable the fired-event log.
    pub fn with_event_log(mut self) -> Self {
        self.record_events = true;
        self
    }

    /// Set the clock resolution.
    pub fn with_ticks_per_second(mut self, ticks_per_second: f64) -> Self {
        self.ticks_per_second = ticks_per_second;
        self
    }

    /// Reject values the kernel cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        if !self.ticks_per_second.is_finite() || self.ticks_per_second <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "ticks_per_second must be finite and positive, got {}",
                self.ticks_per_second
            )));
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            ticks_per_second: TickResolution::MICROS.ticks_per_second(),
            trace_devices: false,
            record_events: false,
        }
    }
}
