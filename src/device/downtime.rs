//! Downtime requests: maintenance and breakdowns that take a device out
//! of service.

/// Identifies one downtime activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DowntimeId(u64);

impl DowntimeId {
    #[inline]
    pub fn new(id: u64) -> Self {
        DowntimeId(id)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DowntimeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DT{}", self.0)
    }
}

/// What the downtime represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DowntimeKind {
    Maintenance,
    Breakdown,
}

/// How aggressively the downtime preempts work in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DowntimePolicy {
    /// Wait for the device to go idle on its own.
    Opportunistic,
    /// Admit no new step; let the in-flight step finish.
    Forced,
    /// Interrupt the in-flight step now.
    Immediate,
}

/// A downtime activity requested against a device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Downtime {
    pub id: DowntimeId,
    pub kind: DowntimeKind,
    pub policy: DowntimePolicy,
    /// Time out of service once started, in seconds.
    pub duration: f64,
}

impl Downtime {
    pub fn new(id: DowntimeId, kind: DowntimeKind, policy: DowntimePolicy, duration: f64) -> Self {
        Downtime {
            id,
            kind,
            policy,
            duration,
        }
    }

    pub fn is_opportunistic(&self) -> bool {
        self.policy == DowntimePolicy::Opportunistic
    }

    pub fn is_forced(&self) -> bool {
        self.policy == DowntimePolicy::Forced
    }

    pub fn is_immediate(&self) -> bool {
        self.policy == DowntimePolicy::Immediate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_queries() {
        let make = |policy| Downtime::new(DowntimeId::new(3), DowntimeKind::Breakdown, policy, 1.0);
        let forced = make(DowntimePolicy::Forced);
        assert!(forced.is_forced() && !forced.is_immediate() && !forced.is_opportunistic());
        assert!(make(DowntimePolicy::Immediate).is_immediate());
        assert!(make(DowntimePolicy::Opportunistic).is_opportunistic());
        assert_eq!(forced.id.to_string(), "DT3");
    }
}
