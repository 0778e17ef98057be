//! Command-line rendering of a device and backend configuration

use nvmetest_core::{Axis, BackendConfig, Device};

/// Render the CLI arguments selecting `device` with `config`
///
/// Produces `<uri> --dev-nsid <nsid>` for the device, followed by
/// `--<axis> <value>` for every axis except `label`, in the configuration's
/// own order.
pub fn format_cli_args(device: Option<&Device>, config: &BackendConfig) -> String {
    let mut args = Vec::with_capacity(config.len() + 2);

    if let Some(device) = device {
        args.push(device.uri.clone());
        args.push(format!("--dev-nsid {}", device.nsid));
    }

    args.extend(
        config
            .iter()
            .filter(|(axis, _)| *axis != Axis::Label)
            .map(|(axis, value)| format!("--{} {}", axis, value)),
    );

    args.join(" ")
}
