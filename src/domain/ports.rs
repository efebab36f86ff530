use crate::domain::model::{RemoveOutcome, ResourceKind};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

/// Working directory that holds the generated files.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    /// Writes are all-or-nothing: readers see either the old file or the new one.
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Returns `false` when there was nothing to remove.
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
    fn full_path(&self, path: &str) -> PathBuf;
}

/// The external container runtime. Resources are addressed by name only.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// Fails with an environment error when the runtime or its compose
    /// support cannot be reached.
    async fn check_available(&self) -> Result<()>;

    /// Removing something that does not exist is reported as
    /// [`RemoveOutcome::NotFound`], not as an error.
    async fn remove(&self, kind: ResourceKind, name: &str) -> Result<RemoveOutcome>;

    async fn prune_volumes(&self) -> Result<()>;

    /// Brings every service in the manifest up in the background.
    async fn bring_up(&self, project: &str, manifest: &Path) -> Result<()>;

    /// Runs a one-off probe command inside a container; `true` when it exits cleanly.
    async fn probe_health(&self, container: &str, command: &[String]) -> Result<bool>;
}

pub trait PortProbe: Send + Sync {
    fn is_in_use(&self, port: u16) -> bool;
}

#[async_trait]
pub trait ConsoleProbe: Send + Sync {
    /// `true` when anything answered, whatever the status code.
    async fn responds(&self, url: &Url) -> bool;
}
