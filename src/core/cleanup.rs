use crate::config::StackLayout;
use crate::domain::model::{CleanupReport, CleanupWarning, RemoveOutcome, ResourceKind};
use crate::domain::ports::{ContainerRuntime, Storage};

/// Best-effort teardown of everything the workflow manages. Safe to call
/// when nothing exists; failures end up as warnings in the report.
pub struct CleanupController<'a, R: ContainerRuntime + ?Sized, S: Storage> {
    runtime: &'a R,
    storage: &'a S,
    layout: &'a StackLayout,
}

impl<'a, R: ContainerRuntime + ?Sized, S: Storage> CleanupController<'a, R, S> {
    pub fn new(runtime: &'a R, storage: &'a S, layout: &'a StackLayout) -> Self {
        Self {
            runtime,
            storage,
            layout,
        }
    }

    /// Containers, volumes, dangling volumes, the network and the generated files.
    pub async fn cleanup_all(&self) -> CleanupReport {
        tracing::info!("🧹 Removing managed containers, volumes and network");
        let mut report = CleanupReport::default();

        let resources = [
            (ResourceKind::Container, &self.layout.console.container),
            (ResourceKind::Container, &self.layout.database.container),
            (ResourceKind::Volume, &self.layout.console.volume),
            (ResourceKind::Volume, &self.layout.database.volume),
        ];
        for (kind, name) in resources {
            self.remove_resource(kind, name, &mut report).await;
        }

        if let Err(e) = self.runtime.prune_volumes().await {
            record_warning(&mut report, "dangling volumes", e.to_string());
        }

        self.remove_resource(ResourceKind::Network, &self.layout.network.name, &mut report)
            .await;

        self.remove_artifacts(&mut report).await;
        report
    }

    /// Only the generated files. Running services are left alone.
    pub async fn cleanup_artifacts(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        self.remove_artifacts(&mut report).await;
        report
    }

    async fn remove_resource(&self, kind: ResourceKind, name: &str, report: &mut CleanupReport) {
        match self.runtime.remove(kind, name).await {
            Ok(RemoveOutcome::Removed) => {
                tracing::debug!("Removed {} {}", kind, name);
                report.removed.push(format!("{} {}", kind, name));
            }
            Ok(RemoveOutcome::NotFound) => {}
            Err(e) => record_warning(report, &format!("{} {}", kind, name), e.to_string()),
        }
    }

    async fn remove_artifacts(&self, report: &mut CleanupReport) {
        for file in [&self.layout.files.manifest, &self.layout.files.registration] {
            match self.storage.remove_file(file).await {
                Ok(true) => {
                    tracing::debug!("Removed {}", file);
                    report.removed.push(format!("file {}", file));
                }
                Ok(false) => {}
                Err(e) => record_warning(report, &format!("file {}", file), e.to_string()),
            }
        }
    }
}

fn record_warning(report: &mut CleanupReport, resource: &str, message: String) {
    tracing::warn!("⚠️ Cleanup of {} failed: {}", resource, message);
    report.warnings.push(CleanupWarning {
        resource: resource.to_string(),
        message,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRuntime;
    use crate::adapters::storage::LocalStorage;
    use tempfile::TempDir;

    fn seeded_runtime(layout: &StackLayout) -> InMemoryRuntime {
        InMemoryRuntime::new()
            .with_existing(ResourceKind::Container, &layout.database.container)
            .with_existing(ResourceKind::Container, &layout.console.container)
            .with_existing(ResourceKind::Volume, &layout.database.volume)
            .with_existing(ResourceKind::Volume, &layout.console.volume)
            .with_existing(ResourceKind::Network, &layout.network.name)
    }

    #[tokio::test]
    async fn test_cleanup_twice_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StackLayout::default();
        let storage = LocalStorage::new(temp_dir.path());
        std::fs::write(temp_dir.path().join("docker-compose.yml"), "services: {}").unwrap();
        std::fs::write(temp_dir.path().join("servers.json"), "{}").unwrap();
        let runtime = seeded_runtime(&layout).with_dangling_volume("0a1b2c");

        let controller = CleanupController::new(&runtime, &storage, &layout);

        let first = controller.cleanup_all().await;
        assert!(first.is_clean());
        assert_eq!(first.removed.len(), 7);

        let second = controller.cleanup_all().await;
        assert!(second.is_clean());
        assert!(second.removed.is_empty());

        assert!(runtime.is_empty().await);
        assert!(!temp_dir.path().join("docker-compose.yml").exists());
        assert!(!temp_dir.path().join("servers.json").exists());
    }

    #[tokio::test]
    async fn test_stuck_resource_becomes_warning() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StackLayout::default();
        let storage = LocalStorage::new(temp_dir.path());
        let runtime = seeded_runtime(&layout).with_stuck(&layout.network.name);

        let report = CleanupController::new(&runtime, &storage, &layout)
            .cleanup_all()
            .await;

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].resource, "network pg_network");
        // 其他資源仍然被清除
        assert!(runtime.containers().await.is_empty());
        assert!(runtime.volumes().await.is_empty());
        assert_eq!(runtime.networks().await, vec!["pg_network".to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_artifacts_leaves_services_running() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StackLayout::default();
        let storage = LocalStorage::new(temp_dir.path());
        std::fs::write(temp_dir.path().join("servers.json"), "{}").unwrap();
        let runtime = seeded_runtime(&layout);

        let report = CleanupController::new(&runtime, &storage, &layout)
            .cleanup_artifacts()
            .await;

        assert_eq!(report.removed, vec!["file servers.json".to_string()]);
        assert!(runtime.calls().await.is_empty());
        assert_eq!(runtime.containers().await.len(), 2);
    }
}
