pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::StackLayout;

pub use adapters::{DockerCli, HttpConsoleProbe, LocalPortProbe, LocalStorage};
pub use crate::core::provisioner::Provisioner;
pub use domain::model::{ProvisionSummary, ProvisioningConfig, RawConfig};
pub use utils::error::{ProvisionError, Result};
