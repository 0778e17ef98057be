//! # nvmetest-core
//!
//! Core types, traits, and utilities for nvmetest - device selection and
//! driver-attachment control for hardware-in-the-loop NVMe testing.
//!
//! This crate provides the foundational data structures and interfaces that are
//! shared across all other nvmetest components. It includes:
//!
//! - Label sets and the superset matching rule
//! - Backend axes, backend configurations, devices and fabrics targets
//! - The command execution trait used to reach the test host
//! - Configuration schema and loading
//! - Error handling types and utilities

pub mod config;
pub mod error;
pub mod labels;
pub mod traits;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::{normalize_platform, OsConfig, RepositoryConfig, TestConfig, XnvmeConfig};
pub use error::{Error, ErrorContext, Result};
pub use labels::LabelSet;
pub use traits::{CommandExecutor, CommandOutput};
pub use types::{Axis, BackendConfig, Device, DriverAttachment, FabricsSpec};
