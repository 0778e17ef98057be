//! Configuration schema for nvmetest
//!
//! The configuration describes the devices available on a test host, the
//! optional fabrics target, the location of the xNVMe source tree and the
//! operating system of the host. It is read from a TOML, YAML or JSON file
//! with `NVMETEST__` prefixed environment overrides.

use crate::{Device, Error, FabricsSpec, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Platform used when the configuration names none or an unknown one
pub const DEFAULT_PLATFORM: &str = "linux";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    /// Devices available for testing, in preference order
    #[serde(default)]
    pub devices: Vec<Device>,

    /// Fabrics target, when the host exports devices over NVMe-oF
    #[serde(default)]
    pub fabrics: Option<FabricsSpec>,

    /// xNVMe source tree, needed to build and run the fabrics target
    #[serde(default)]
    pub xnvme: Option<XnvmeConfig>,

    /// Host operating system
    #[serde(default)]
    pub os: OsConfig,

    /// Replacement for the built-in backend combination table, keyed by
    /// platform; each entry maps axis names to value lists
    #[serde(default)]
    pub combinations: Option<BTreeMap<String, Vec<BTreeMap<String, Vec<String>>>>>,
}

/// xNVMe-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XnvmeConfig {
    pub repository: RepositoryConfig,
}

/// Location of a source repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub path: PathBuf,
}

/// Operating system description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsConfig {
    /// OS name, e.g. "linux", "debian", "freebsd"
    #[serde(default)]
    pub name: Option<String>,
}

impl TestConfig {
    /// Load configuration from a file, applying environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let builder = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(
                ::config::Environment::with_prefix("NVMETEST")
                    .separator("__")
                    .try_parsing(true),
            );

        let parsed: Self = builder.build()?.try_deserialize()?;
        parsed.validate()?;

        tracing::debug!(
            "Loaded configuration from {} with {} devices",
            path.display(),
            parsed.devices.len()
        );
        Ok(parsed)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let parsed: Self = serde_yaml::from_str(content)?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.uri.trim().is_empty() {
                return Err(Error::config("Device with empty uri"));
            }
            if !seen.insert((device.uri.as_str(), device.nsid)) {
                return Err(Error::config(format!(
                    "Duplicate device: {} nsid {}",
                    device.uri, device.nsid
                )));
            }
        }

        if let Some(fabrics) = &self.fabrics {
            if fabrics.pcie_ids.is_empty() {
                tracing::warn!("Fabrics section lists no pcie_ids; the target will expose nothing");
            }
        }

        Ok(())
    }

    /// The platform used to select backend combinations
    pub fn platform(&self) -> String {
        normalize_platform(self.os.name.as_deref())
    }

    /// Fabrics section, or `ConfigurationMissing`
    pub fn require_fabrics(&self) -> Result<&FabricsSpec> {
        self.fabrics.as_ref().ok_or_else(|| Error::missing("fabrics"))
    }

    /// xNVMe repository path, or `ConfigurationMissing`
    pub fn require_repository(&self) -> Result<&Path> {
        self.xnvme
            .as_ref()
            .map(|x| x.repository.path.as_path())
            .ok_or_else(|| Error::missing("xnvme.repository"))
    }

    /// Find a configured device by uri and, when given, namespace id
    ///
    /// Without `nsid` the first namespace configured under `uri` is returned.
    pub fn device(&self, uri: &str, nsid: Option<u32>) -> Option<&Device> {
        self.devices
            .iter()
            .find(|d| d.uri == uri && nsid.map_or(true, |n| d.nsid == n))
    }
}

/// Map an OS name onto the platform key of the combination table
pub fn normalize_platform(os_name: Option<&str>) -> String {
    match os_name.map(str::to_lowercase) {
        None => DEFAULT_PLATFORM.to_string(),
        Some(name) if name == "debian" => "linux".to_string(),
        Some(name) => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DriverAttachment;
    use std::io::Write;

    const SAMPLE: &str = r#"
os:
  name: debian
devices:
  - uri: /dev/nvme0n1
    nsid: 1
    labels: [dev, bdev, nvm]
  - uri: "0000:03:00.0"
    nsid: 1
    labels: [dev, pcie, nvm]
    driver_attachment: userspace
fabrics:
  ip: 10.0.0.1
  port: 4420
  subnqn_prefix: "nqn.2022-06.io.xnvme:ctrlnode"
  pcie_ids: ["0000:03:00.0"]
xnvme:
  repository:
    path: /root/git/xnvme
"#;

    #[test]
    fn test_parse_sample() {
        let config = TestConfig::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].driver_attachment, DriverAttachment::Kernel);
        assert_eq!(config.devices[1].driver_attachment, DriverAttachment::Userspace);
        assert_eq!(config.platform(), "linux");
        assert_eq!(config.require_fabrics().unwrap().port, 4420);
        assert_eq!(
            config.require_repository().unwrap(),
            Path::new("/root/git/xnvme")
        );
        assert!(config.device("/dev/nvme0n1", None).is_some());
        assert!(config.device("/dev/nvme0n1", Some(1)).is_some());
        assert!(config.device("/dev/nvme0n1", Some(2)).is_none());
    }

    #[test]
    fn test_missing_sections() {
        let config = TestConfig::default();
        assert!(matches!(
            config.require_fabrics(),
            Err(Error::ConfigurationMissing(_))
        ));
        assert!(matches!(
            config.require_repository(),
            Err(Error::ConfigurationMissing(_))
        ));
        assert_eq!(config.platform(), DEFAULT_PLATFORM);
    }

    #[test]
    fn test_normalize_platform() {
        assert_eq!(normalize_platform(Some("debian")), "linux");
        assert_eq!(normalize_platform(Some("Debian")), "linux");
        assert_eq!(normalize_platform(Some("DEBIAN")), "linux");
        assert_eq!(normalize_platform(Some("FreeBSD")), "freebsd");
        assert_eq!(normalize_platform(None), "linux");
    }

    #[test]
    fn test_validation() {
        let namespaces = r#"
devices:
  - {uri: /dev/nvme0n1, nsid: 1, labels: [bdev, nvm]}
  - {uri: /dev/nvme0n1, nsid: 2, labels: [bdev, zns]}
"#;
        let config = TestConfig::from_yaml_str(namespaces).unwrap();
        assert_eq!(config.device("/dev/nvme0n1", Some(2)).unwrap().nsid, 2);
        assert_eq!(config.device("/dev/nvme0n1", None).unwrap().nsid, 1);

        let duplicate = r#"
devices:
  - {uri: /dev/nvme0n1, nsid: 1, labels: [bdev]}
  - {uri: /dev/nvme0n1, nsid: 1, labels: [zns]}
"#;
        assert!(matches!(
            TestConfig::from_yaml_str(duplicate),
            Err(Error::InvalidConfiguration(_))
        ));

        let empty_fabrics = r#"
fabrics: {ip: 10.0.0.1, port: 4420, subnqn_prefix: nqn, pcie_ids: []}
"#;
        let config = TestConfig::from_yaml_str(empty_fabrics).unwrap();
        assert!(config.require_fabrics().unwrap().pcie_ids.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = TestConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[1].labels.to_string(), "[dev, pcie, nvm]");
    }

    #[test]
    fn test_load_missing_file() {
        let result = TestConfig::load_from_file("/nonexistent/nvmetest.toml");
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }
}
