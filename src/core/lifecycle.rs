use crate::config::StackLayout;
use crate::domain::ports::ContainerRuntime;
use crate::utils::error::{ProvisionError, Result};
use std::path::Path;

/// Drives the external runtime. Dependency ordering between the services
/// is declared in the manifest and left to the runtime.
pub struct Lifecycle<'a, R: ContainerRuntime + ?Sized> {
    runtime: &'a R,
    layout: &'a StackLayout,
}

impl<'a, R: ContainerRuntime + ?Sized> Lifecycle<'a, R> {
    pub fn new(runtime: &'a R, layout: &'a StackLayout) -> Self {
        Self { runtime, layout }
    }

    pub async fn ensure_environment(&self) -> Result<()> {
        tracing::debug!("Checking container runtime: {}", self.runtime.name());
        self.runtime.check_available().await?;
        tracing::info!("🐳 Container runtime '{}' is available", self.runtime.name());
        Ok(())
    }

    pub async fn bring_up(&self, manifest: &Path) -> Result<()> {
        tracing::info!(
            "🚀 Starting services '{}' and '{}' (project {})",
            self.layout.database.service,
            self.layout.console.service,
            self.layout.project.name
        );

        self.runtime
            .bring_up(&self.layout.project.name, manifest)
            .await
            .map_err(|e| match e {
                ProvisionError::Orchestration { .. } => e,
                // 啟動後的任何失敗都可能留下部分資源，一律歸為 orchestration
                other => ProvisionError::orchestration(other.to_string()),
            })?;

        tracing::info!("✅ Services started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryRuntime, RuntimeCall};
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_unavailable_runtime_is_environment_error() {
        let runtime = InMemoryRuntime::new().unavailable();
        let layout = StackLayout::default();

        let err = Lifecycle::new(&runtime, &layout)
            .ensure_environment()
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Environment { .. }));
    }

    #[tokio::test]
    async fn test_bring_up_failure_is_orchestration_error() {
        let runtime = InMemoryRuntime::new().failing_bring_up("image pull denied");
        let layout = StackLayout::default();
        let manifest = PathBuf::from("/nonexistent/docker-compose.yml");

        let err = Lifecycle::new(&runtime, &layout)
            .bring_up(&manifest)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Orchestration { .. }));
        assert_eq!(
            runtime.calls().await,
            vec![RuntimeCall::BringUp("pg-stack".to_string(), manifest)]
        );
    }
}
