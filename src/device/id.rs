//! Device ID: a lightweight, ordered, copyable device identifier.

/// A unique identifier for a simulated device.
///
/// A newtype rather than a bare integer so it cannot be confused with
/// ticks or sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceId(u64);

impl DeviceId {
    /// Create a device ID from a raw integer.
    #[inline]
    pub fn new(id: u64) -> Self {
        DeviceId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "D{}", self.0)
    }
}
