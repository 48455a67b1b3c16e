//! Externally visible state label and the time spent in each state.

/// The state label a device presents to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceState {
    Idle,
    Working,
    Stopped,
    Maintenance,
    Breakdown,
}

impl DeviceState {
    /// Every label, in report order.
    pub const ALL: [DeviceState; 5] = [
        DeviceState::Idle,
        DeviceState::Working,
        DeviceState::Stopped,
        DeviceState::Maintenance,
        DeviceState::Breakdown,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceState::Idle => "Idle",
            DeviceState::Working => "Working",
            DeviceState::Stopped => "Stopped",
            DeviceState::Maintenance => "Maintenance",
            DeviceState::Breakdown => "Breakdown",
        };
        f.write_str(s)
    }
}

/// Accumulates simulated seconds per [`DeviceState`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateTimes {
    current: DeviceState,
    since: f64,
    totals: [f64; DeviceState::ALL.len()],
}

impl StateTimes {
    /// Start in `Idle` at time zero.
    pub fn new() -> Self {
        StateTimes {
            current: DeviceState::Idle,
            since: 0.0,
            totals: [0.0; DeviceState::ALL.len()],
        }
    }

    /// The present label.
    pub fn current(&self) -> DeviceState {
        self.current
    }

    /// Time at which the present label was entered.
    pub fn since(&self) -> f64 {
        self.since
    }

    /// Switch to `state` at `now`. Returns `false` if already in it.
    pub fn set(&mut self, state: DeviceState, now: f64) -> bool {
        if state == self.current {
            return false;
        }
        self.totals[self.current.index()] += now - self.since;
        self.current = state;
        self.since = now;
        true
    }

    /// Seconds spent in `state` up to `now`, including the open interval.
    pub fn total(&self, state: DeviceState, now: f64) -> f64 {
        let closed = self.totals[state.index()];
        if state == self.current {
            closed + (now - self.since)
        } else {
            closed
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for StateTimes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_closed_and_open_intervals() {
        let mut times = StateTimes::new();
        assert!(times.set(DeviceState::Working, 2.0));
        assert!(!times.set(DeviceState::Working, 3.0));
        assert!(times.set(DeviceState::Stopped, 7.0));

        assert_eq!(times.total(DeviceState::Idle, 10.0), 2.0);
        assert_eq!(times.total(DeviceState::Working, 10.0), 5.0);
        assert_eq!(times.total(DeviceState::Stopped, 10.0), 3.0);
        assert_eq!(times.total(DeviceState::Breakdown, 10.0), 0.0);
        assert_eq!(times.current(), DeviceState::Stopped);
        assert_eq!(times.since(), 7.0);
    }

    #[test]
    fn test_reset() {
        let mut times = StateTimes::new();
        times.set(DeviceState::Maintenance, 1.0);
        times.reset();
        assert_eq!(times, StateTimes::new());
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceState::Maintenance.to_string(), "Maintenance");
    }
}
