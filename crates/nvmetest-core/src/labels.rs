//! Label sets for devices and test requirements
//!
//! Labels classify a device's transport class (e.g. "bdev", "cdev", "pcie",
//! "fabrics", "file") or the environment it lives in. A test states the
//! labels it requires and a device qualifies when its own labels contain
//! every one of them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label names for device transport classes
pub const LABEL_BDEV: &str = "bdev";
pub const LABEL_CDEV: &str = "cdev";
pub const LABEL_PCIE: &str = "pcie";
pub const LABEL_FABRICS: &str = "fabrics";
pub const LABEL_FILE: &str = "file";

/// Transport labels considered when a test does not target files
pub const TRANSPORT_LABELS: [&str; 4] = [LABEL_BDEV, LABEL_CDEV, LABEL_PCIE, LABEL_FABRICS];

/// A set of labels that remembers insertion order
///
/// Membership is set-like (duplicates are dropped), but iteration and
/// display follow the order labels were added so that messages built from
/// a label set read the same on every run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    /// Create an empty label set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a label, ignoring duplicates
    pub fn insert(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.contains(&label) {
            self.0.push(label);
        }
    }

    /// Builder-style insert
    pub fn with(mut self, label: impl Into<String>) -> Self {
        self.insert(label);
        self
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    /// True when every label of `required` is also in `self`
    pub fn is_superset_of(&self, required: &LabelSet) -> bool {
        required.iter().all(|label| self.contains(label))
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for LabelSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_superset_of(other)
    }
}

impl Eq for LabelSet {}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = LabelSet::new();
        for label in iter {
            set.insert(label);
        }
        set
    }
}

impl<S: Into<String>> Extend<S> for LabelSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for label in iter {
            self.insert(label);
        }
    }
}

impl From<Vec<String>> for LabelSet {
    fn from(labels: Vec<String>) -> Self {
        labels.into_iter().collect()
    }
}

impl From<LabelSet> for Vec<String> {
    fn from(set: LabelSet) -> Self {
        set.0
    }
}

impl From<&[&str]> for LabelSet {
    fn from(labels: &[&str]) -> Self {
        labels.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for LabelSet {
    fn from(labels: [&str; N]) -> Self {
        labels.into_iter().collect()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
