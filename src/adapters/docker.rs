//! Container runtime adapter that shells out to the `docker` CLI (or any
//! CLI with the same surface, e.g. `podman`) and its `compose` plugin.

use crate::domain::model::{RemoveOutcome, ResourceKind};
use crate::domain::ports::ContainerRuntime;
use crate::utils::error::{ProvisionError, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn exec<I, A>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProvisionError::environment(format!("'{}' is not installed or not on PATH", self.program))
            } else {
                ProvisionError::environment(format!("failed to run '{}': {}", self.program, e))
            }
        })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

fn remove_args(kind: ResourceKind, name: &str) -> Vec<&str> {
    match kind {
        ResourceKind::Container => vec!["rm", "-f", "-v", name],
        ResourceKind::Volume => vec!["volume", "rm", "-f", name],
        ResourceKind::Network => vec!["network", "rm", name],
    }
}

fn is_not_found(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("no such") || lower.contains("not found")
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    fn name(&self) -> &str {
        &self.program
    }

    async fn check_available(&self) -> Result<()> {
        let info = self.exec(["info", "--format", "{{.ServerVersion}}"]).await?;
        if !info.success {
            return Err(ProvisionError::environment(format!(
                "'{}' daemon is not reachable: {}",
                self.program, info.stderr
            )));
        }
        tracing::debug!("{} server version {}", self.program, info.stdout);

        let compose = self.exec(["compose", "version"]).await?;
        if !compose.success {
            return Err(ProvisionError::environment(format!(
                "'{} compose' is not available: {}",
                self.program, compose.stderr
            )));
        }
        Ok(())
    }

    async fn remove(&self, kind: ResourceKind, name: &str) -> Result<RemoveOutcome> {
        let output = self.exec(remove_args(kind, name)).await?;
        if output.success {
            // 成功時會印出被刪除的名稱；`-f` 遇到不存在的資源時回傳成功但沒有輸出
            if output.stdout.is_empty() {
                return Ok(RemoveOutcome::NotFound);
            }
            return Ok(RemoveOutcome::Removed);
        }
        if is_not_found(&output.stderr) {
            return Ok(RemoveOutcome::NotFound);
        }
        Err(ProvisionError::orchestration(format!(
            "removing {} {}: {}",
            kind, name, output.stderr
        )))
    }

    async fn prune_volumes(&self) -> Result<()> {
        let output = self.exec(["volume", "prune", "-f"]).await?;
        if !output.success {
            return Err(ProvisionError::orchestration(format!(
                "pruning volumes: {}",
                output.stderr
            )));
        }
        Ok(())
    }

    async fn bring_up(&self, project: &str, manifest: &Path) -> Result<()> {
        let mut args: Vec<&OsStr> = vec![OsStr::new("compose"), OsStr::new("-f")];
        args.push(manifest.as_os_str());
        args.extend(["-p", project, "up", "-d"].map(OsStr::new));

        let output = self.exec(args).await?;
        if !output.success {
            return Err(ProvisionError::orchestration(if output.stderr.is_empty() {
                output.stdout
            } else {
                output.stderr
            }));
        }
        Ok(())
    }

    async fn probe_health(&self, container: &str, command: &[String]) -> Result<bool> {
        let mut args = vec!["exec".to_string(), container.to_string()];
        args.extend(command.iter().cloned());
        let output = self.exec(&args).await?;
        if !output.success {
            tracing::debug!("Probe in {} failed: {}", container, output.stderr);
        }
        Ok(output.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_args() {
        assert_eq!(
            remove_args(ResourceKind::Container, "pgadmin"),
            vec!["rm", "-f", "-v", "pgadmin"]
        );
        assert_eq!(
            remove_args(ResourceKind::Volume, "postgres_data"),
            vec!["volume", "rm", "-f", "postgres_data"]
        );
        assert_eq!(
            remove_args(ResourceKind::Network, "pg_network"),
            vec!["network", "rm", "pg_network"]
        );
    }

    #[test]
    fn test_not_found_detection() {
        assert!(is_not_found("Error response from daemon: No such container: pgadmin"));
        assert!(is_not_found("Error response from daemon: network pg_network not found"));
        assert!(!is_not_found("Error response from daemon: remove pg_network: network has active endpoints"));
    }

    #[tokio::test]
    async fn test_missing_program_is_environment_error() {
        let runtime = DockerCli::new("pg-stack-definitely-missing-runtime");
        let err = runtime.check_available().await.unwrap_err();
        assert!(matches!(err, ProvisionError::Environment { .. }));
    }
}
