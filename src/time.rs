/// Simulated time for the process kernel.
///
/// The clock is an integer [`Tick`] counter. Simulation time in seconds is a
/// floating-point view of the same clock, converted through a fixed
/// [`TickResolution`]. Time advances only when the scheduler pops events.

/// A point on the simulation clock, counted in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(u64);

impl Tick {
    /// The zero-point of simulation time.
    pub const ZERO: Tick = Tick(0);

    /// Create a tick from a raw count.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        Tick(ticks)
    }

    /// Return the raw tick count.
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// The tick `delay` ticks after `self`.
    /// Returns `None` on overflow.
    #[inline]
    pub fn plus(self, delay: u64) -> Option<Tick> {
        self.0.checked_add(delay).map(Tick)
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: Tick) -> bool {
        self.0 < other.0
    }

    /// Number of ticks between `other` and `self`.
    /// Returns `None` if `other` is after `self`.
    #[inline]
    pub fn duration_since(self, other: Tick) -> Option<u64> {
        self.0.checked_sub(other.0)
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

// ── Resolution ────────────────────────────────────────────────────────

/// Fixed conversion factor between seconds and ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TickResolution {
    ticks_per_second: f64,
}

impl TickResolution {
    /// One microsecond per tick.
    pub const MICROS: TickResolution = TickResolution {
        ticks_per_second: 1.0e6,
    };

    /// Create a resolution. The factor must be finite and positive;
    /// [`SimConfig::validate`](crate::config::SimConfig::validate) checks this.
    pub fn new(ticks_per_second: f64) -> Self {
        TickResolution { ticks_per_second }
    }

    /// Ticks per simulated second.
    #[inline]
    pub fn ticks_per_second(self) -> f64 {
        self.ticks_per_second
    }

    /// Convert a duration in seconds to the nearest whole number of ticks.
    ///
    /// The result is signed: callers decide how to treat a negative count.
    /// Values beyond the `i64` range saturate.
    #[inline]
    pub fn secs_to_nearest_tick(self, secs: f64) -> i64 {
        (secs * self.ticks_per_second).round() as i64
    }

    /// Convert a tick count to seconds.
    #[inline]
    pub fn ticks_to_secs(self, ticks: u64) -> f64 {
        ticks as f64 / self.ticks_per_second
    }

    /// Seconds at a clock point.
    #[inline]
    pub fn tick_to_secs(self, tick: Tick) -> f64 {
        self.ticks_to_secs(tick.ticks())
    }
}

impl Default for TickResolution {
    fn default() -> Self {
        Self::MICROS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(Tick::ZERO.ticks(), 0);
    }

    #[test]
    fn test_ordering() {
        let t1 = Tick::new(10);
        let t2 = Tick::new(20);
        assert!(t1 < t2);
        assert!(t1.is_before(t2));
        assert!(!t2.is_before(t1));
    }

    #[test]
    fn test_plus_overflow() {
        assert_eq!(Tick::new(100).plus(50), Some(Tick::new(150)));
        assert!(Tick::new(u64::MAX).plus(1).is_none());
    }

    #[test]
    fn test_duration_since() {
        let t1 = Tick::new(10);
        let t2 = Tick::new(30);
        assert_eq!(t2.duration_since(t1), Some(20));
        assert_eq!(t1.duration_since(t2), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Tick::new(42)), "T=42");
    }

    #[test]
    fn test_secs_round_to_nearest_tick() {
        let res = TickResolution::MICROS;
        assert_eq!(res.secs_to_nearest_tick(10.0), 10_000_000);
        assert_eq!(res.secs_to_nearest_tick(1.4e-6), 1);
        assert_eq!(res.secs_to_nearest_tick(1.6e-6), 2);
        // Floating residue left over from subtracting elapsed time.
        assert_eq!(res.secs_to_nearest_tick(-1.0e-12), 0);
        assert_eq!(res.secs_to_nearest_tick(-2.0), -2_000_000);
    }

    #[test]
    fn test_ticks_to_secs() {
        let res = TickResolution::new(1000.0);
        assert_eq!(res.ticks_to_secs(2500), 2.5);
        assert_eq!(res.tick_to_secs(Tick::new(4000)), 4.0);
    }
}
