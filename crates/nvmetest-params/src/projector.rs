//! Projection of full-axis combinations onto the axes a test varies over

use crate::combinations::CombinationTable;
use nvmetest_core::{Axis, BackendConfig};
use std::collections::BTreeSet;
use tracing::debug;

/// Project combinations onto `options`, deduplicated and sorted
///
/// `label` is always kept, whether or not `options` names it, since device
/// matching depends on it. When `only_labels` is non-empty, combinations
/// with any other label are dropped before projecting. The result is sorted
/// by the (axis, value) pairs of each configuration taken in axis-name order,
/// so identical inputs always give identical output.
pub fn project<I, S>(combinations: I, options: &[Axis], only_labels: &[S]) -> Vec<BackendConfig>
where
    I: IntoIterator<Item = BackendConfig>,
    S: AsRef<str>,
{
    let mut keep: Vec<Axis> = options.to_vec();
    if !keep.contains(&Axis::Label) {
        keep.push(Axis::Label);
    }

    let label_allowed = |config: &BackendConfig| {
        only_labels.is_empty()
            || config
                .label()
                .is_some_and(|label| only_labels.iter().any(|l| l.as_ref() == label))
    };

    let projected: BTreeSet<BackendConfig> = combinations
        .into_iter()
        .filter(|config| label_allowed(config))
        .map(|config| config.project(&keep))
        .collect();

    projected.into_iter().collect()
}

/// Backend configurations of a platform, projected onto `options`
///
/// `None` selects every axis.
pub fn backend_configs<S: AsRef<str>>(
    table: &CombinationTable,
    platform: &str,
    options: Option<&[Axis]>,
    only_labels: &[S],
) -> Vec<BackendConfig> {
    let options = options.unwrap_or(&Axis::DEFAULT_OPTIONS);
    let configs = project(table.combinations(platform), options, only_labels);

    debug!(
        "{} backend configurations for platform '{}' over {:?}",
        configs.len(),
        platform,
        options
    );
    configs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinations::AxisTable;
    use std::collections::HashSet;

    const NO_LABELS: &[&str] = &[];

    fn full(be: &str, mem: &str, sync: &str, label: &str) -> BackendConfig {
        BackendConfig::new()
            .with(Axis::Be, be)
            .with(Axis::Mem, mem)
            .with(Axis::Admin, "nvme")
            .with(Axis::Sync, sync)
            .with(Axis::Async, "emu")
            .with(Axis::Label, label)
    }

    #[test]
    fn test_collapses_combinations_differing_in_dropped_axis() {
        let configs = project(
            vec![
                full("linux", "posix", "psync", "bdev"),
                full("linux", "posix", "block", "bdev"),
            ],
            &[Axis::Be, Axis::Mem],
            NO_LABELS,
        );

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].to_string(), "be=linux,mem=posix,label=bdev");
    }

    #[test]
    fn test_label_always_kept() {
        let configs = project(
            vec![full("spdk", "spdk", "nvme", "pcie")],
            &[Axis::Be],
            NO_LABELS,
        );
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].label(), Some("pcie"));
        assert!(!configs[0].contains(Axis::Mem));
    }

    #[test]
    fn test_only_labels_filters() {
        let configs = project(
            vec![
                full("linux", "posix", "psync", "bdev"),
                full("linux", "posix", "psync", "file"),
                full("spdk", "spdk", "nvme", "pcie"),
            ],
            &[Axis::Be],
            &["file", "pcie"],
        );
        let labels: Vec<_> = configs.iter().filter_map(|c| c.label()).collect();
        assert_eq!(labels, vec!["file", "pcie"]);
    }

    #[test]
    fn test_sorted_by_axis_name_pairs() {
        let configs = project(
            vec![
                full("spdk", "spdk", "nvme", "pcie"),
                full("linux", "posix", "psync", "bdev"),
                full("linux", "posix", "psync", "file"),
            ],
            &[Axis::Be, Axis::Sync],
            NO_LABELS,
        );
        // Pairs compare as (be, label, sync) once sorted by axis name
        let rendered: Vec<String> = configs.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "be=linux,sync=psync,label=bdev",
                "be=linux,sync=psync,label=file",
                "be=spdk,sync=nvme,label=pcie",
            ]
        );
    }

    #[test]
    fn test_deterministic_and_unique_for_all_platforms() {
        let table = CombinationTable::builtin();
        let option_sets: Vec<Vec<Axis>> = vec![
            vec![],
            vec![Axis::Be],
            vec![Axis::Be, Axis::Mem],
            vec![Axis::Admin, Axis::Async],
            vec![Axis::Sync, Axis::Label],
            Axis::DEFAULT_OPTIONS.to_vec(),
        ];

        for platform in ["linux", "freebsd", "windows", "macos", "unknown"] {
            for options in &option_sets {
                let first = backend_configs(&table, platform, Some(options.as_slice()), NO_LABELS);
                let second = backend_configs(&table, platform, Some(options.as_slice()), NO_LABELS);

                let first_rendered: Vec<String> = first.iter().map(|c| c.to_string()).collect();
                let second_rendered: Vec<String> =
                    second.iter().map(|c| c.to_string()).collect();
                assert_eq!(first_rendered, second_rendered);

                let unique: HashSet<&String> = first_rendered.iter().collect();
                assert_eq!(unique.len(), first.len());

                assert!(first.windows(2).all(|w| w[0] < w[1]));
                assert!(first.iter().all(|c| c.contains(Axis::Label)));
            }
        }
    }

    #[test]
    fn test_file_only_yields_file_label() {
        let table = CombinationTable::builtin();
        for platform in ["linux", "freebsd", "windows", "macos"] {
            let configs = backend_configs(&table, platform, None, &["file"]);
            assert!(!configs.is_empty());
            assert!(configs.iter().all(|c| c.label() == Some("file")));
        }
    }

    #[test]
    fn test_default_options_keep_every_axis() {
        let table = CombinationTable::new(
            [(
                "linux".to_string(),
                vec![AxisTable::new(
                    &["linux"],
                    &["posix"],
                    &["block"],
                    &["psync"],
                    &["emu", "posix"],
                    &["bdev"],
                )],
            )]
            .into_iter()
            .collect(),
        );

        let configs = backend_configs(&table, "linux", None, NO_LABELS);
        assert_eq!(configs.len(), 2);
        assert!(configs.iter().all(|c| c.len() == Axis::ALL.len()));
        // Projection keeps the order the axes were built in
        assert_eq!(
            configs[0].to_string(),
            "be=linux,mem=posix,admin=block,sync=psync,async=emu,label=bdev"
        );
    }
}
