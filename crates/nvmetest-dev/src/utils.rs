//! Utility functions for development and testing

use nvmetest_core::{Device, DriverAttachment, FabricsSpec, RepositoryConfig, TestConfig, XnvmeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Setup test logging with appropriate levels
pub fn setup_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "nvmetest_dev=debug,nvmetest_core=debug,nvmetest_params=debug,nvmetest_driver=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// A block device attached to the kernel NVMe driver
pub fn bdev_device() -> Device {
    Device::new("/dev/nvme0n1", 1).with_labels(["dev", "bdev", "nvm", "scc"])
}

/// The character device of the same controller
pub fn cdev_device() -> Device {
    Device::new("/dev/ng0n1", 1).with_labels(["dev", "cdev", "nvm", "scc"])
}

/// A controller detached from the kernel for userspace drivers
pub fn pcie_device() -> Device {
    Device::new("0000:03:00.0", 1)
        .with_labels(["dev", "pcie", "nvm", "scc"])
        .with_attachment(DriverAttachment::Userspace)
}

/// A controller exported through the fabrics target
pub fn fabrics_device() -> Device {
    Device::new("10.0.0.1:4420", 1)
        .with_labels(["dev", "fabrics", "nvm"])
        .with_attachment(DriverAttachment::Userspace)
}

/// A regular file used by file-backed tests
pub fn file_device() -> Device {
    Device::new("/tmp/xnvme-testfile.bin", 1).with_labels(["file"])
}

/// Fabrics target matching [`fabrics_device`]
pub fn sample_fabrics() -> FabricsSpec {
    FabricsSpec {
        ip: "10.0.0.1".to_string(),
        port: 4420,
        subnqn_prefix: "nqn.2022-06.io.xnvme:ctrlnode".to_string(),
        pcie_ids: vec!["0000:03:00.0".to_string()],
    }
}

/// A test host with one device per transport class
pub fn sample_config() -> TestConfig {
    TestConfig {
        devices: vec![
            bdev_device(),
            cdev_device(),
            pcie_device(),
            fabrics_device(),
            file_device(),
        ],
        fabrics: Some(sample_fabrics()),
        xnvme: Some(XnvmeConfig {
            repository: RepositoryConfig {
                path: "/root/git/xnvme".into(),
            },
        }),
        ..TestConfig::default()
    }
}
