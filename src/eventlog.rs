/// Fired-event log for replay verification.
///
/// Records every dispatched entry in dispatch order and hashes the
/// sequence, so two runs can be compared for bit-identical execution.

use std::io::{self, Write};

use crate::event::{Event, Priority, ProcessTarget, SeqNo};
use crate::time::Tick;

// ── Hash utility ──────────────────────────────────────────────────────

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// Hash a byte slice deterministically (FNV-1a variant).
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

// ── Fired event ───────────────────────────────────────────────────────

/// What the log keeps of a dispatched entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct FiredEvent {
    pub seq: SeqNo,
    pub tick: Tick,
    pub priority: Priority,
    pub target: ProcessTarget,
}

impl From<&Event> for FiredEvent {
    fn from(event: &Event) -> Self {
        FiredEvent {
            seq: event.seq(),
            tick: event.due,
            priority: event.priority,
            target: event.target.clone(),
        }
    }
}

impl std::fmt::Display for FiredEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} p{} {}", self.seq, self.tick, self.priority, self.target)
    }
}

// ── Event Log ─────────────────────────────────────────────────────────

/// Append-only log of fired events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<FiredEvent>,
}

impl EventLog {
    /// Create an empty event log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dispatched entry.
    pub fn record(&mut self, event: &Event) {
        self.events.push(FiredEvent::from(event));
    }

    /// Access the recorded events.
    pub fn events(&self) -> &[FiredEvent] {
        &self.events
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Forget every recorded event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Compute a deterministic hash of the entire log.
    pub fn log_hash(&self) -> u64 {
        let mut h: u64 = 0;
        for event in &self.events {
            h = hash_combine(h, event.seq.raw());
            h = hash_combine(h, event.tick.ticks());
            h = hash_combine(h, event.priority as u64);
            h = hash_combine(h, hash_bytes(event.target.to_string().as_bytes()));
        }
        h
    }

    /// Write the log as one line per event.
    pub fn export<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "# PROCSIM EVENT LOG v1")?;
        writeln!(w, "# events: {}", self.events.len())?;
        for event in &self.events {
            writeln!(w, "{}", event)?;
        }
        Ok(())
    }
}

/// Compare two logs for identical order, ticks, priorities, and targets.
pub fn logs_match(a: &EventLog, b: &EventLog) -> bool {
    a.events == b.events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Lane;

    fn fired(seq: u64, tick: u64, target: ProcessTarget) -> Event {
        Event {
            due: Tick::new(tick),
            priority: 5,
            lane: Lane::for_insert(SeqNo::new(seq), true),
            target,
            handle: None,
        }
    }

    #[test]
    fn test_hash_determinism() {
        assert_eq!(hash_combine(42, 99), hash_combine(42, 99));
        assert_ne!(hash_combine(42, 99), hash_combine(42, 100));
    }

    #[test]
    fn test_log_hash_determinism() {
        let mut log1 = EventLog::new();
        let mut log2 = EventLog::new();
        for i in 0..10 {
            let e = fired(i, i * 5, ProcessTarget::Log(format!("event-{}", i)));
            log1.record(&e);
            log2.record(&e);
        }
        assert_eq!(log1.log_hash(), log2.log_hash());
        assert!(logs_match(&log1, &log2));
    }

    #[test]
    fn test_log_hash_sensitive_to_order() {
        let a = fired(0, 1, ProcessTarget::Log("a".into()));
        let b = fired(1, 1, ProcessTarget::Log("b".into()));

        let mut log1 = EventLog::new();
        log1.record(&a);
        log1.record(&b);
        let mut log2 = EventLog::new();
        log2.record(&b);
        log2.record(&a);

        assert_ne!(log1.log_hash(), log2.log_hash());
        assert!(!logs_match(&log1, &log2));
    }

    #[test]
    fn test_export_lines() {
        let mut log = EventLog::new();
        log.record(&fired(3, 7, ProcessTarget::Noop));
        let mut buf = Vec::new();
        log.export(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("# PROCSIM EVENT LOG v1"));
        assert!(text.contains("E#3 T=7 p5 Noop"));
    }
}
