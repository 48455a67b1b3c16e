//! Time-integrating accumulator.

/// Running integral of a piecewise-constant input over time.
///
/// Each `update` adds `input * (now - last_update_time)` and re-baselines,
/// so the input passed in must be the value that held since the previous
/// update.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Integrator {
    initial_value: f64,
    value: f64,
    last_update_time: f64,
}

impl Integrator {
    pub fn new(initial_value: f64) -> Self {
        Integrator {
            initial_value,
            value: initial_value,
            last_update_time: 0.0,
        }
    }

    /// Back to the initial value at time zero.
    pub fn early_init(&mut self) {
        self.value = self.initial_value;
        self.last_update_time = 0.0;
    }

    /// Integrate `input` from the last update up to `now` (seconds).
    ///
    /// A `now` earlier than the last update adds nothing and keeps the
    /// baseline.
    pub fn update(&mut self, now: f64, input: f64) {
        if now <= self.last_update_time {
            return;
        }
        self.value += input * (now - self.last_update_time);
        self.last_update_time = now;
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    pub fn last_update_time(&self) -> f64 {
        self.last_update_time
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(0.0)
    }
}
