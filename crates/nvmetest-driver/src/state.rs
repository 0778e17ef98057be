//! Cached driver-attachment state of the test host

use serde::Serialize;
use std::fmt;

/// A flag that may not have been determined yet
///
/// `Unknown` means nothing has been observed in this session. Callers treat
/// it like the opposite of whatever state they need, so the first test case
/// of a session always performs its transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    True,
    False,
    #[default]
    Unknown,
}

impl TriState {
    /// True unless the flag is known to be false
    pub fn maybe_true(self) -> bool {
        !matches!(self, TriState::False)
    }

    /// True unless the flag is known to be true
    pub fn maybe_false(self) -> bool {
        !matches!(self, TriState::True)
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriState::True => f.write_str("true"),
            TriState::False => f.write_str("false"),
            TriState::Unknown => f.write_str("unknown"),
        }
    }
}

/// What the controller believes about the host for this session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DriverState {
    /// Devices are bound to the kernel NVMe driver
    pub kernel_attached: TriState,

    /// The fabrics target is running and exporting devices
    pub fabrics_up: TriState,
}

impl DriverState {
    /// Fresh state of a new session
    pub fn new() -> Self {
        Self::default()
    }
}
