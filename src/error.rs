//! Structured error types for the process kernel.
//!
//! All fallible public APIs return `Result<T, SimError>`. Numeric failures
//! inside a device are fatal and halt the run; precondition violations are
//! programming errors in the calling component and are propagated rather
//! than ignored.

use crate::device::DeviceId;
use crate::time::Tick;

/// The top-level error type for the process kernel.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    // ── Scheduling errors ─────────────────────────────────

    /// An entry was scheduled on a handle that already has a live entry.
    #[error("event handle is already scheduled at {due}")]
    HandleAlreadyScheduled { due: Tick },

    /// Attempted to schedule an event before the current time.
    #[error("cannot schedule event at {requested} when current time is {current}")]
    NonCausalEvent { requested: Tick, current: Tick },

    /// A simulation time in seconds is negative or not finite.
    #[error("invalid simulation time {0} s")]
    InvalidTime(f64),

    /// The due tick does not fit the clock.
    #[error("tick overflow scheduling {delay} ticks after {now}")]
    TickOverflow { now: Tick, delay: u64 },

    // ── Device errors ─────────────────────────────────────

    /// A computed step duration was NaN or infinite.
    #[error("{device}: {operation}: invalid step duration {duration}")]
    InvalidDuration {
        device: DeviceId,
        operation: &'static str,
        duration: f64,
    },

    /// A computed step duration rounded to a negative tick count.
    #[error("{device}: {operation}: negative step duration {duration}")]
    NegativeDuration {
        device: DeviceId,
        operation: &'static str,
        duration: f64,
    },

    /// A device ID was referenced but is not registered in the runtime.
    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),

    /// Attempted to register a device with an ID that is already in use.
    #[error("device {0} is already registered")]
    DeviceAlreadyRegistered(DeviceId),

    /// A threshold name is not declared on the device.
    #[error("{device}: unknown threshold {name:?}")]
    UnknownThreshold { device: DeviceId, name: String },

    /// A behavior hook failed.
    #[error("{device}: {operation} failed")]
    Behavior {
        device: DeviceId,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    // ── Config errors ─────────────────────────────────────

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_device_not_found() {
        let e = SimError::DeviceNotFound(DeviceId::new(5));
        assert_eq!(e.to_string(), "device D5 not found");
    }

    #[test]
    fn test_error_display_non_causal() {
        let e = SimError::NonCausalEvent {
            requested: Tick::new(3),
            current: Tick::new(10),
        };
        assert!(e.to_string().contains("T=3"));
        assert!(e.to_string().contains("T=10"));
    }

    #[test]
    fn test_error_display_invalid_duration() {
        let e = SimError::InvalidDuration {
            device: DeviceId::new(2),
            operation: "start_step",
            duration: f64::NAN,
        };
        let s = e.to_string();
        assert!(s.contains("D2"));
        assert!(s.contains("start_step"));
        assert!(s.contains("NaN"));
    }

    #[test]
    fn test_behavior_error_keeps_source() {
        let e = SimError::Behavior {
            device: DeviceId::new(1),
            operation: "step_duration",
            source: anyhow::anyhow!("input table exhausted"),
        };
        let source = std::error::Error::source(&e).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("input table exhausted"));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(SimError::InvalidConfig("x".into()));
        assert!(!e.to_string().is_empty());
    }
}
