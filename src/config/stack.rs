//! Fixed topology of the managed stack: names, images, internal ports and
//! the readiness policy. Everything here has a default and can be
//! overridden from a TOML file (see [`crate::config::toml_config`]).

use crate::utils::error::{ProvisionError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackLayout {
    pub project: ProjectSettings,
    pub database: DatabaseSettings,
    pub console: ConsoleSettings,
    pub network: NetworkSettings,
    pub files: FileSettings,
    pub runtime: RuntimeSettings,
    pub readiness: ReadinessPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    pub name: String,
    pub restart_policy: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            name: "pg-stack".to_string(),
            restart_policy: "unless-stopped".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub service: String,
    pub container: String,
    pub image: String,
    pub volume: String,
    pub data_dir: String,
    pub internal_port: u16,
    pub maintenance_db: String,
    pub health: HealthSettings,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            service: "postgres".to_string(),
            container: "postgres_db".to_string(),
            image: "postgres:16".to_string(),
            volume: "postgres_data".to_string(),
            data_dir: "/var/lib/postgresql/data".to_string(),
            internal_port: 5432,
            maintenance_db: "postgres".to_string(),
            health: HealthSettings::default(),
        }
    }
}

/// Health probe declared in the manifest for the database service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval: "10s".to_string(),
            timeout: "5s".to_string(),
            retries: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub service: String,
    pub container: String,
    pub image: String,
    pub volume: String,
    pub data_dir: String,
    pub internal_port: u16,
    pub servers_mount: String,
    pub host: String,
    pub server_name: String,
    pub server_group: String,
    pub ssl_mode: String,
    pub connect_timeout: u32,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            service: "pgadmin".to_string(),
            container: "pgadmin".to_string(),
            image: "dpage/pgadmin4:latest".to_string(),
            volume: "pgadmin_data".to_string(),
            data_dir: "/var/lib/pgadmin".to_string(),
            internal_port: 80,
            servers_mount: "/pgadmin4/servers.json".to_string(),
            host: "localhost".to_string(),
            server_name: "Local PostgreSQL".to_string(),
            server_group: "Servers".to_string(),
            ssl_mode: "prefer".to_string(),
            connect_timeout: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub name: String,
    pub driver: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            name: "pg_network".to_string(),
            driver: "bridge".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub manifest: String,
    pub registration: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            manifest: "docker-compose.yml".to_string(),
            registration: "servers.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub program: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessPolicy {
    pub attempts: u32,
    pub interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval_ms: 1000,
            request_timeout_ms: 2000,
        }
    }
}

impl ReadinessPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Validate for StackLayout {
    fn validate(&self) -> Result<()> {
        let names = [
            ("project.name", &self.project.name),
            ("database.service", &self.database.service),
            ("database.container", &self.database.container),
            ("database.image", &self.database.image),
            ("database.volume", &self.database.volume),
            ("console.service", &self.console.service),
            ("console.container", &self.console.container),
            ("console.image", &self.console.image),
            ("console.volume", &self.console.volume),
            ("network.name", &self.network.name),
            ("runtime.program", &self.runtime.program),
        ];
        for (field, value) in names {
            validate_non_empty_string(field, value)?;
        }

        validate_path("files.manifest", &self.files.manifest)?;
        validate_path("files.registration", &self.files.registration)?;

        if self.database.service == self.console.service {
            return Err(ProvisionError::config(
                "database.service and console.service must differ",
            ));
        }
        if self.files.manifest == self.files.registration {
            return Err(ProvisionError::config(
                "files.manifest and files.registration must differ",
            ));
        }
        if self.readiness.attempts == 0 {
            return Err(ProvisionError::config("readiness.attempts must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        let layout = StackLayout::default();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.readiness.attempts, 30);
        assert_eq!(layout.readiness.interval(), Duration::from_secs(1));
        assert_eq!(layout.database.internal_port, 5432);
    }

    #[test]
    fn test_rejects_duplicate_service_names() {
        let mut layout = StackLayout::default();
        layout.console.service = layout.database.service.clone();
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let mut layout = StackLayout::default();
        layout.readiness.attempts = 0;
        assert!(layout.validate().is_err());
    }
}
