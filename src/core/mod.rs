pub mod cleanup;
pub mod lifecycle;
pub mod manifest;
pub mod port_resolver;
pub mod provisioner;
pub mod readiness;
pub mod validator;

pub use crate::domain::model::{ProvisionSummary, ProvisioningConfig, RawConfig};
pub use crate::domain::ports::{ConsoleProbe, ContainerRuntime, PortProbe, Storage};
pub use crate::utils::error::Result;
