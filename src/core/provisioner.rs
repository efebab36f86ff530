use crate::config::StackLayout;
use crate::core::cleanup::CleanupController;
use crate::core::lifecycle::Lifecycle;
use crate::core::readiness::ReadinessGate;
use crate::core::{manifest, port_resolver, validator};
use crate::domain::model::{
    CleanupReport, ProvisionSummary, ProvisioningConfig, RawConfig, RenderedArtifacts,
};
use crate::domain::ports::{ConsoleProbe, ContainerRuntime, PortProbe, Storage};
use crate::utils::error::{ProvisionError, Result};
use std::future::Future;
use url::Url;

/// Runs the whole workflow: environment check, validation, port resolution,
/// pre-run cleanup, generation, bring-up, readiness, files-only cleanup.
/// Every failure after validation funnels through one full rollback.
pub struct Provisioner<R, S, P, C>
where
    R: ContainerRuntime,
    S: Storage,
    P: PortProbe,
    C: ConsoleProbe,
{
    runtime: R,
    storage: S,
    port_probe: P,
    console_probe: C,
    layout: StackLayout,
}

impl<R, S, P, C> Provisioner<R, S, P, C>
where
    R: ContainerRuntime,
    S: Storage,
    P: PortProbe,
    C: ConsoleProbe,
{
    pub fn new(runtime: R, storage: S, port_probe: P, console_probe: C, layout: StackLayout) -> Self {
        Self {
            runtime,
            storage,
            port_probe,
            console_probe,
            layout,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn layout(&self) -> &StackLayout {
        &self.layout
    }

    /// Validation and port resolution. Touches nothing outside the process
    /// apart from the read-only port probe.
    pub fn prepare(&self, raw: &RawConfig) -> Result<ProvisioningConfig> {
        let config = validator::validate(raw)?;
        tracing::debug!("Validated configuration for user '{}'", config.db_user);
        port_resolver::resolve_ports(&self.port_probe, &config)
    }

    pub fn render(&self, config: &ProvisioningConfig) -> Result<RenderedArtifacts> {
        manifest::render(config, &self.layout)
    }

    pub fn console_url(&self, config: &ProvisioningConfig) -> Result<Url> {
        let raw = format!("http://{}:{}/", self.layout.console.host, config.admin_port);
        Url::parse(&raw).map_err(|e| ProvisionError::config(format!("invalid console URL {}: {}", raw, e)))
    }

    pub async fn run(&self, raw: &RawConfig) -> Result<ProvisionSummary> {
        self.run_until(raw, std::future::pending()).await
    }

    /// Like [`Provisioner::run`], but `shutdown` completing (e.g. Ctrl-C)
    /// aborts provisioning and triggers the rollback.
    pub async fn run_until<F>(&self, raw: &RawConfig, shutdown: F) -> Result<ProvisionSummary>
    where
        F: Future<Output = ()>,
    {
        Lifecycle::new(&self.runtime, &self.layout)
            .ensure_environment()
            .await?;

        let config = self.prepare(raw)?;
        let url = self.console_url(&config)?;
        tracing::info!(
            "🔧 Using ports {} (PostgreSQL) and {} (pgAdmin)",
            config.db_port,
            config.admin_port
        );

        let outcome = tokio::select! {
            result = self.provision(&config, &url) => result,
            _ = shutdown => Err(ProvisionError::Interrupted),
        };

        match outcome {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::error!("❌ Provisioning failed: {}", e);
                if e.requires_rollback() {
                    self.rollback().await;
                }
                Err(e)
            }
        }
    }

    /// Full teardown after a failure.
    pub async fn rollback(&self) -> CleanupReport {
        tracing::warn!("↩️ Rolling back");
        let report = self.cleanup().cleanup_all().await;
        if !report.is_clean() {
            tracing::warn!(
                "⚠️ Rollback finished with {} warning(s); some resources may remain",
                report.warnings.len()
            );
        }
        report
    }

    fn cleanup(&self) -> CleanupController<'_, R, S> {
        CleanupController::new(&self.runtime, &self.storage, &self.layout)
    }

    async fn provision(&self, config: &ProvisioningConfig, url: &Url) -> Result<ProvisionSummary> {
        if config.skip_cleanup {
            tracing::info!("⏭️ Skipping pre-run cleanup");
        } else {
            self.cleanup().cleanup_all().await;
        }

        let artifacts = self.render(config)?;
        let paths = manifest::write_artifacts(&self.storage, &self.layout, &artifacts).await?;

        let lifecycle = Lifecycle::new(&self.runtime, &self.layout);
        lifecycle.bring_up(&paths.manifest).await?;

        let gate = ReadinessGate::new(&self.runtime, &self.console_probe, &self.layout.readiness);
        let probe = manifest::database_probe_command(config, &self.layout);
        gate.wait_for_database(&self.layout.database.container, &probe)
            .await?;
        gate.wait_for_console(&self.layout.console.service, url)
            .await?;

        // 服務保持運行，只移除產生的檔案
        self.cleanup().cleanup_artifacts().await;

        Ok(ProvisionSummary {
            host: "localhost".to_string(),
            db_port: config.db_port,
            db_user: config.db_user.clone(),
            db_password: config.db_password.clone(),
            db_container: self.layout.database.container.clone(),
            admin_port: config.admin_port,
            admin_url: url.to_string(),
            admin_email: config.admin_email.clone(),
            admin_password: config.admin_password.clone(),
            admin_container: self.layout.console.container.clone(),
            completed_at: chrono::Utc::now(),
        })
    }
}
