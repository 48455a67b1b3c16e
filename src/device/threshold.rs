//! Capacity-gating thresholds observed by a device.

/// How a closed threshold treats the step in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ClosureKind {
    /// The in-flight step finishes; no new step starts.
    Normal,
    /// The in-flight step pauses and keeps its remaining time.
    Immediate,
    /// The in-flight step ends now and its work is released.
    ImmediateRelease,
}

#[derive(Debug, Clone)]
struct Threshold {
    name: String,
    kind: ClosureKind,
    open: bool,
}

/// The thresholds declared on one device, in declaration order.
///
/// Thresholds start open.
#[derive(Debug, Clone, Default)]
pub struct ThresholdSet {
    entries: Vec<Threshold>,
}

impl ThresholdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a threshold. Re-declaring a name replaces its kind.
    pub fn declare(&mut self, name: impl Into<String>, kind: ClosureKind) {
        let name = name.into();
        match self.entries.iter_mut().find(|t| t.name == name) {
            Some(t) => t.kind = kind,
            None => self.entries.push(Threshold {
                name,
                kind,
                open: true,
            }),
        }
    }

    /// Open or close a threshold.
    ///
    /// Returns `None` for an undeclared name, otherwise whether the state
    /// actually changed.
    pub fn set_open(&mut self, name: &str, open: bool) -> Option<bool> {
        let t = self.entries.iter_mut().find(|t| t.name == name)?;
        let changed = t.open != open;
        t.open = open;
        Some(changed)
    }

    /// Whether the named threshold is open.
    pub fn is_threshold_open(&self, name: &str) -> Option<bool> {
        self.entries.iter().find(|t| t.name == name).map(|t| t.open)
    }

    /// All thresholds open.
    pub fn is_open(&self) -> bool {
        self.entries.iter().all(|t| t.open)
    }

    /// Some closed threshold pauses the step in progress.
    pub fn is_immediate_closure(&self) -> bool {
        self.any_closed(ClosureKind::Immediate)
    }

    /// Some closed threshold releases the step in progress.
    pub fn is_immediate_release_closure(&self) -> bool {
        self.any_closed(ClosureKind::ImmediateRelease)
    }

    fn any_closed(&self, kind: ClosureKind) -> bool {
        self.entries.iter().any(|t| !t.open && t.kind == kind)
    }

    /// Names of the closed thresholds.
    pub fn closed(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|t| !t.open)
            .map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reopen every threshold (start of a run).
    pub fn reset(&mut self) {
        for t in &mut self.entries {
            t.open = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_is_open() {
        let set = ThresholdSet::new();
        assert!(set.is_open());
        assert!(!set.is_immediate_closure());
        assert!(!set.is_immediate_release_closure());
    }

    #[test]
    fn test_closure_kinds() {
        let mut set = ThresholdSet::new();
        set.declare("level", ClosureKind::Normal);
        set.declare("door", ClosureKind::Immediate);
        set.declare("power", ClosureKind::ImmediateRelease);

        assert_eq!(set.set_open("level", false), Some(true));
        assert!(!set.is_open());
        assert!(!set.is_immediate_closure());

        set.set_open("door", false);
        assert!(set.is_immediate_closure());
        assert!(!set.is_immediate_release_closure());

        set.set_open("power", false);
        assert!(set.is_immediate_release_closure());
        assert_eq!(set.closed().collect::<Vec<_>>(), vec!["level", "door", "power"]);

        set.reset();
        assert!(set.is_open());
    }

    #[test]
    fn test_set_open_reports_change() {
        let mut set = ThresholdSet::new();
        set.declare("gate", ClosureKind::Normal);
        assert_eq!(set.set_open("gate", true), Some(false));
        assert_eq!(set.set_open("gate", false), Some(true));
        assert_eq!(set.set_open("gate", false), Some(false));
        assert_eq!(set.set_open("missing", false), None);
        assert_eq!(set.is_threshold_open("gate"), Some(false));
    }

    #[test]
    fn test_redeclare_replaces_kind() {
        let mut set = ThresholdSet::new();
        set.declare("gate", ClosureKind::Normal);
        set.declare("gate", ClosureKind::Immediate);
        set.set_open("gate", false);
        assert_eq!(set.len(), 1);
        assert!(set.is_immediate_closure());
    }
}
