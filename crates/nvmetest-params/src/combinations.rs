//! Backend axis tables and their Cartesian product
//!
//! Each platform lists one or more axis tables. A table states, for every
//! axis, the values that are valid together; the full set of backend
//! configurations of a platform is the concatenation of the Cartesian
//! products of its tables.

use nvmetest_core::{Axis, BackendConfig, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Platform whose tables are used for unknown platforms
pub const FALLBACK_PLATFORM: &str = "linux";

/// Allowed values for every axis, valid in any combination with each other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisTable {
    pub be: Vec<String>,
    pub mem: Vec<String>,
    pub admin: Vec<String>,
    pub sync: Vec<String>,
    pub r#async: Vec<String>,
    pub label: Vec<String>,
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl AxisTable {
    pub fn new(
        be: &[&str],
        mem: &[&str],
        admin: &[&str],
        sync: &[&str],
        r#async: &[&str],
        label: &[&str],
    ) -> Self {
        Self {
            be: owned(be),
            mem: owned(mem),
            admin: owned(admin),
            sync: owned(sync),
            r#async: owned(r#async),
            label: owned(label),
        }
    }

    /// Values of one axis
    pub fn values(&self, axis: Axis) -> &[String] {
        match axis {
            Axis::Be => &self.be,
            Axis::Mem => &self.mem,
            Axis::Admin => &self.admin,
            Axis::Sync => &self.sync,
            Axis::Async => &self.r#async,
            Axis::Label => &self.label,
        }
    }

    /// Number of combinations this table produces
    pub fn size(&self) -> usize {
        Axis::ALL.iter().map(|axis| self.values(*axis).len()).product()
    }

    /// Lazily enumerate every combination, label varying fastest
    pub fn combinations(&self) -> impl Iterator<Item = BackendConfig> + '_ {
        self.be.iter().flat_map(move |be| {
            self.mem.iter().flat_map(move |mem| {
                self.admin.iter().flat_map(move |admin| {
                    self.sync.iter().flat_map(move |sync| {
                        self.r#async.iter().flat_map(move |aio| {
                            self.label.iter().map(move |label| {
                                BackendConfig::new()
                                    .with(Axis::Be, be.as_str())
                                    .with(Axis::Mem, mem.as_str())
                                    .with(Axis::Admin, admin.as_str())
                                    .with(Axis::Sync, sync.as_str())
                                    .with(Axis::Async, aio.as_str())
                                    .with(Axis::Label, label.as_str())
                            })
                        })
                    })
                })
            })
        })
    }

    fn from_map(platform: &str, map: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        for key in map.keys() {
            key.parse::<Axis>()
                .map_err(|e| Error::config(format!("combinations.{}: {}", platform, e)))?;
        }

        let take = |axis: Axis| -> Result<Vec<String>> {
            map.get(axis.as_str()).cloned().ok_or_else(|| {
                Error::config(format!(
                    "combinations.{}: axis '{}' is missing",
                    platform, axis
                ))
            })
        };

        Ok(Self {
            be: take(Axis::Be)?,
            mem: take(Axis::Mem)?,
            admin: take(Axis::Admin)?,
            sync: take(Axis::Sync)?,
            r#async: take(Axis::Async)?,
            label: take(Axis::Label)?,
        })
    }
}

/// Axis tables for every known platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationTable {
    platforms: BTreeMap<String, Vec<AxisTable>>,
}

impl CombinationTable {
    pub fn new(platforms: BTreeMap<String, Vec<AxisTable>>) -> Self {
        Self { platforms }
    }

    /// Build a table from the `combinations` section of a configuration
    pub fn from_config(
        section: &BTreeMap<String, Vec<BTreeMap<String, Vec<String>>>>,
    ) -> Result<Self> {
        let mut platforms = BTreeMap::new();
        for (platform, tables) in section {
            let tables = tables
                .iter()
                .map(|map| AxisTable::from_map(platform, map))
                .collect::<Result<Vec<_>>>()?;
            platforms.insert(platform.to_lowercase(), tables);
        }

        if !platforms.contains_key(FALLBACK_PLATFORM) {
            return Err(Error::config(format!(
                "combinations must define the '{}' platform",
                FALLBACK_PLATFORM
            )));
        }

        Ok(Self { platforms })
    }

    /// The built-in table of backend combinations
    pub fn builtin() -> Self {
        let spdk = AxisTable::new(
            &["spdk"],
            &["spdk"],
            &["nvme"],
            &["nvme"],
            &["nvme"],
            &["pcie", "fabrics"],
        );

        let mut platforms = BTreeMap::new();
        platforms.insert(
            "linux".to_string(),
            vec![
                AxisTable::new(
                    &["linux"],
                    &["posix"],
                    &["block"],
                    &["psync", "block"],
                    &["emu", "posix", "thrpool", "libaio", "io_uring"],
                    &["bdev"],
                ),
                AxisTable::new(
                    &["linux"],
                    &["posix"],
                    &["nvme"],
                    &["nvme"],
                    &["emu", "posix", "thrpool", "io_uring_cmd"],
                    &["cdev"],
                ),
                spdk.clone(),
                AxisTable::new(
                    &["vfio"],
                    &["vfio"],
                    &["nvme"],
                    &["nvme"],
                    &["nvme"],
                    &["pcie"],
                ),
                AxisTable::new(
                    &["linux"],
                    &["posix"],
                    &["file"],
                    &["psync"],
                    &["emu", "posix", "thrpool", "libaio", "io_uring"],
                    &["file"],
                ),
            ],
        );
        platforms.insert(
            "freebsd".to_string(),
            vec![
                AxisTable::new(
                    &["fbsd"],
                    &["posix"],
                    &["nvme"],
                    &["nvme"],
                    &["emu", "posix", "thrpool", "kqueue"],
                    &["cdev"],
                ),
                spdk,
                AxisTable::new(
                    &["fbsd"],
                    &["posix"],
                    &["file"],
                    &["psync"],
                    &["emu", "posix", "thrpool"],
                    &["file"],
                ),
            ],
        );
        platforms.insert(
            "windows".to_string(),
            vec![
                AxisTable::new(
                    &["windows"],
                    &["windows"],
                    &["nvme", "block"],
                    &["nvme"],
                    &["iocp", "iocp_th", "io_ring", "emu", "thrpool"],
                    &["bdev"],
                ),
                AxisTable::new(
                    &["windows"],
                    &["windows"],
                    &["file"],
                    &["file"],
                    &["iocp", "iocp_th", "emu", "thrpool"],
                    &["file"],
                ),
            ],
        );
        platforms.insert(
            "macos".to_string(),
            vec![
                AxisTable::new(
                    &["macos"],
                    &["posix"],
                    &["macos"],
                    &["macos"],
                    &["emu", "posix", "thrpool"],
                    &["cdev"],
                ),
                AxisTable::new(
                    &["macos"],
                    &["posix"],
                    &["file"],
                    &["psync"],
                    &["emu", "posix", "thrpool"],
                    &["file"],
                ),
            ],
        );

        Self { platforms }
    }

    /// Tables of a platform, falling back to the default platform
    pub fn tables(&self, platform: &str) -> &[AxisTable] {
        if let Some(tables) = self.platforms.get(platform) {
            return tables;
        }

        debug!(
            "No combinations for platform '{}', using '{}'",
            platform, FALLBACK_PLATFORM
        );
        self.platforms
            .get(FALLBACK_PLATFORM)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every full-axis combination of a platform, lazily
    pub fn combinations<'a>(
        &'a self,
        platform: &str,
    ) -> impl Iterator<Item = BackendConfig> + 'a {
        self.tables(platform)
            .iter()
            .flat_map(|table| table.combinations())
    }
}

impl Default for CombinationTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> AxisTable {
        AxisTable::new(
            &["linux"],
            &["posix"],
            &["block"],
            &["psync", "block"],
            &["emu", "posix"],
            &["bdev", "cdev"],
        )
    }

    #[test]
    fn test_product_size_and_order() {
        let table = small_table();
        let all: Vec<BackendConfig> = table.combinations().collect();

        assert_eq!(all.len(), table.size());
        assert_eq!(all.len(), 8);

        // Label varies fastest, sync slowest among the multi-valued axes
        assert_eq!(
            all[0].to_string(),
            "be=linux,mem=posix,admin=block,sync=psync,async=emu,label=bdev"
        );
        assert_eq!(all[1].get(Axis::Label), Some("cdev"));
        assert_eq!(all[2].get(Axis::Async), Some("posix"));
        assert_eq!(all[4].get(Axis::Sync), Some("block"));
    }

    #[test]
    fn test_every_combination_has_all_axes() {
        let table = CombinationTable::builtin();
        for platform in ["linux", "freebsd", "windows", "macos"] {
            for config in table.combinations(platform) {
                assert_eq!(config.len(), Axis::ALL.len());
                for axis in Axis::ALL {
                    assert!(config.contains(axis));
                }
            }
        }
    }

    #[test]
    fn test_unknown_platform_falls_back() {
        let table = CombinationTable::builtin();
        let fallback: Vec<_> = table.combinations("plan9").collect();
        let linux: Vec<_> = table.combinations("linux").collect();
        assert!(!linux.is_empty());
        assert_eq!(fallback, linux);
    }

    #[test]
    fn test_combinations_concatenate_tables() {
        let table = CombinationTable::builtin();
        let expected: usize = table.tables("linux").iter().map(AxisTable::size).sum();
        assert_eq!(table.combinations("linux").count(), expected);
    }

    #[test]
    fn test_from_config() {
        let mut axes = BTreeMap::new();
        for axis in Axis::ALL {
            axes.insert(axis.as_str().to_string(), vec![format!("{}-value", axis)]);
        }
        let mut section = BTreeMap::new();
        section.insert("Linux".to_string(), vec![axes.clone()]);

        let table = CombinationTable::from_config(&section).unwrap();
        let all: Vec<_> = table.combinations("linux").collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get(Axis::Async), Some("async-value"));

        // Missing axis
        let mut partial = axes.clone();
        partial.remove("mem");
        section.insert("linux".to_string(), vec![partial]);
        assert!(CombinationTable::from_config(&section).is_err());

        // Unknown axis
        let mut bogus = axes;
        bogus.insert("colour".to_string(), vec!["red".to_string()]);
        let mut section = BTreeMap::new();
        section.insert("linux".to_string(), vec![bogus]);
        assert!(CombinationTable::from_config(&section).is_err());
    }

    #[test]
    fn test_from_config_requires_fallback_platform() {
        let mut axes = BTreeMap::new();
        for axis in Axis::ALL {
            axes.insert(axis.as_str().to_string(), vec!["x".to_string()]);
        }
        let mut section = BTreeMap::new();
        section.insert("freebsd".to_string(), vec![axes]);
        assert!(CombinationTable::from_config(&section).is_err());
    }
}
