//! Core type definitions for nvmetest

use crate::labels::{LabelSet, LABEL_FABRICS};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An independent backend configuration dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Backend implementation (e.g. "linux", "spdk")
    Be,
    /// Memory allocator
    Mem,
    /// Admin command interface
    Admin,
    /// Synchronous command interface
    Sync,
    /// Asynchronous command interface
    Async,
    /// Device transport class the configuration applies to
    Label,
}

impl Axis {
    /// All axes in the order a full combination is built
    pub const ALL: [Axis; 6] = [
        Axis::Be,
        Axis::Mem,
        Axis::Admin,
        Axis::Sync,
        Axis::Async,
        Axis::Label,
    ];

    /// Axes used when a caller does not select any
    pub const DEFAULT_OPTIONS: [Axis; 6] = [
        Axis::Be,
        Axis::Mem,
        Axis::Sync,
        Axis::Async,
        Axis::Admin,
        Axis::Label,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Be => "be",
            Axis::Mem => "mem",
            Axis::Admin => "admin",
            Axis::Sync => "sync",
            Axis::Async => "async",
            Axis::Label => "label",
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "be" => Ok(Axis::Be),
            "mem" => Ok(Axis::Mem),
            "admin" => Ok(Axis::Admin),
            "sync" => Ok(Axis::Sync),
            "async" => Ok(Axis::Async),
            "label" => Ok(Axis::Label),
            _ => Err(format!("Unknown axis: {}", s)),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axes order by name so that sorted configurations read alphabetically
impl PartialOrd for Axis {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Axis {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// One concrete backend choice: a mapping from axes to values
///
/// Entries keep their insertion order, which is the order they are rendered
/// in. Equality and ordering ignore insertion order and compare the entries
/// sorted by axis name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(Axis, String)>", into = "Vec<(Axis, String)>")]
pub struct BackendConfig {
    entries: Vec<(Axis, String)>,
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of an axis; an existing entry keeps its position
    pub fn set(&mut self, axis: Axis, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(a, _)| *a == axis) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((axis, value)),
        }
    }

    /// Builder-style set
    pub fn with(mut self, axis: Axis, value: impl Into<String>) -> Self {
        self.set(axis, value);
        self
    }

    pub fn get(&self, axis: Axis) -> Option<&str> {
        self.entries
            .iter()
            .find(|(a, _)| *a == axis)
            .map(|(_, v)| v.as_str())
    }

    /// The transport label of this configuration
    pub fn label(&self) -> Option<&str> {
        self.get(Axis::Label)
    }

    pub fn contains(&self, axis: Axis) -> bool {
        self.get(axis).is_some()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &str)> {
        self.entries.iter().map(|(a, v)| (*a, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the given axes, preserving insertion order
    pub fn project(&self, axes: &[Axis]) -> BackendConfig {
        BackendConfig {
            entries: self
                .entries
                .iter()
                .filter(|(a, _)| axes.contains(a))
                .cloned()
                .collect(),
        }
    }

    /// Entries sorted by axis name; the canonical comparison key
    pub fn sorted_entries(&self) -> Vec<(Axis, &str)> {
        let mut entries: Vec<(Axis, &str)> = self.iter().collect();
        entries.sort();
        entries
    }
}

impl PartialEq for BackendConfig {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_entries() == other.sorted_entries()
    }
}

impl Eq for BackendConfig {}

impl PartialOrd for BackendConfig {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BackendConfig {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sorted_entries().cmp(&other.sorted_entries())
    }
}

impl From<Vec<(Axis, String)>> for BackendConfig {
    fn from(entries: Vec<(Axis, String)>) -> Self {
        let mut config = BackendConfig::new();
        for (axis, value) in entries {
            config.set(axis, value);
        }
        config
    }
}

impl From<BackendConfig> for Vec<(Axis, String)> {
    fn from(config: BackendConfig) -> Self {
        config.entries
    }
}

/// Renders as `key=value` pairs joined by commas
impl fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(a, v)| format!("{}={}", a, v)).collect();
        f.write_str(&parts.join(","))
    }
}

/// Which driver a device must be attached to for a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverAttachment {
    /// Kernel-managed NVMe driver
    #[default]
    Kernel,
    /// Detached from the kernel (vfio-pci / uio) for userspace drivers
    Userspace,
}

impl fmt::Display for DriverAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverAttachment::Kernel => f.write_str("kernel"),
            DriverAttachment::Userspace => f.write_str("userspace"),
        }
    }
}

/// A device under test as described in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device URI, e.g. "/dev/nvme0n1" or "0000:01:00.0"
    pub uri: String,

    /// Namespace identifier
    pub nsid: u32,

    /// Labels describing the device
    #[serde(default)]
    pub labels: LabelSet,

    /// Required driver attachment
    #[serde(default)]
    pub driver_attachment: DriverAttachment,
}

impl Device {
    pub fn new(uri: impl Into<String>, nsid: u32) -> Self {
        Self {
            uri: uri.into(),
            nsid,
            labels: LabelSet::new(),
            driver_attachment: DriverAttachment::default(),
        }
    }

    pub fn with_labels(mut self, labels: impl Into<LabelSet>) -> Self {
        self.labels = labels.into();
        self
    }

    pub fn with_attachment(mut self, attachment: DriverAttachment) -> Self {
        self.driver_attachment = attachment;
        self
    }

    pub fn needs_kernel(&self) -> bool {
        self.driver_attachment == DriverAttachment::Kernel
    }

    pub fn needs_fabrics(&self) -> bool {
        self.labels.contains(LABEL_FABRICS)
    }
}

/// Remote NVMe-over-fabrics target description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricsSpec {
    /// Address the target listens on
    pub ip: String,

    /// Port the target listens on
    pub port: u16,

    /// Prefix for subsystem NQNs; the 1-based subsystem index is appended
    pub subnqn_prefix: String,

    /// PCIe addresses of local controllers to export, in export order
    pub pcie_ids: Vec<String>,
}
