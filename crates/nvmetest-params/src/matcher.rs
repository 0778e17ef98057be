//! Lookup of configured devices by required labels

use nvmetest_core::{Device, LabelSet};
use tracing::debug;

/// Finds devices whose labels cover a test's requirements
///
/// A correctly written configuration has at most one device per label
/// requirement. When several qualify, the first in configuration order is
/// returned and the others are only reported in the debug log.
#[derive(Debug, Clone, Copy)]
pub struct DeviceMatcher<'a> {
    devices: &'a [Device],
}

impl<'a> DeviceMatcher<'a> {
    pub fn new(devices: &'a [Device]) -> Self {
        Self { devices }
    }

    /// First device whose labels are a superset of `required`
    pub fn find(&self, required: &LabelSet) -> Option<&'a Device> {
        let mut candidates = self
            .devices
            .iter()
            .filter(|device| device.labels.is_superset_of(required));

        let found = candidates.next()?;
        let ignored: Vec<&str> = candidates.map(|d| d.uri.as_str()).collect();
        if !ignored.is_empty() {
            debug!(
                "Labels {} match several devices, using {} and ignoring {:?}",
                required, found.uri, ignored
            );
        }

        Some(found)
    }

    /// Every device whose labels are a superset of `required`
    pub fn find_all(&self, required: &LabelSet) -> Vec<&'a Device> {
        self.devices
            .iter()
            .filter(|device| device.labels.is_superset_of(required))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvmetest_dev::{bdev_device, cdev_device, pcie_device, sample_config};

    #[test]
    fn test_superset_match() {
        let devices = vec![bdev_device(), cdev_device(), pcie_device()];
        let matcher = DeviceMatcher::new(&devices);

        let found = matcher.find(&LabelSet::from(["cdev"])).unwrap();
        assert_eq!(found.uri, "/dev/ng0n1");

        let found = matcher.find(&LabelSet::from(["nvm", "pcie"])).unwrap();
        assert_eq!(found.uri, "0000:03:00.0");

        assert!(matcher.find(&LabelSet::from(["bdev", "pcie"])).is_none());
        assert!(matcher.find(&LabelSet::from(["zns"])).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let devices = vec![bdev_device(), cdev_device()];
        let matcher = DeviceMatcher::new(&devices);

        // Both carry "dev" and "nvm"
        let required = LabelSet::from(["dev", "nvm"]);
        assert_eq!(matcher.find(&required).unwrap().uri, "/dev/nvme0n1");
        assert_eq!(matcher.find_all(&required).len(), 2);
    }

    #[test]
    fn test_result_is_always_a_superset() {
        let config = sample_config();
        let matcher = DeviceMatcher::new(&config.devices);
        let queries = [
            LabelSet::new(),
            LabelSet::from(["dev"]),
            LabelSet::from(["file"]),
            LabelSet::from(["fabrics", "nvm"]),
            LabelSet::from(["scc", "cdev"]),
            LabelSet::from(["scc", "fabrics"]),
        ];

        for required in &queries {
            match matcher.find(required) {
                Some(device) => assert!(device.labels.is_superset_of(required)),
                None => assert!(matcher.find_all(required).is_empty()),
            }
        }
    }

    #[test]
    fn test_no_devices() {
        let matcher = DeviceMatcher::new(&[]);
        assert!(matcher.find(&LabelSet::new()).is_none());
    }
}
