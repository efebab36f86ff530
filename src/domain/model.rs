use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_DB_USER: &str = "postgres";
pub const DEFAULT_DB_PASSWORD: &str = "postgres";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "pgadmin123";
pub const DEFAULT_ADMIN_PORT: u16 = 5050;

/// 使用者輸入（尚未驗證），埠號保留原始字串
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawConfig {
    pub db_user: String,
    pub db_password: String,
    pub db_port: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_port: String,
    pub skip_cleanup: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            db_user: DEFAULT_DB_USER.to_string(),
            db_password: DEFAULT_DB_PASSWORD.to_string(),
            db_port: DEFAULT_DB_PORT.to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            admin_port: DEFAULT_ADMIN_PORT.to_string(),
            skip_cleanup: false,
        }
    }
}

/// Validated provisioning settings. Only constructed by the validator; port
/// resolution produces a new value through [`ProvisioningConfig::with_ports`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningConfig {
    pub db_user: String,
    pub db_password: String,
    pub db_port: u16,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_port: u16,
    pub skip_cleanup: bool,
}

impl ProvisioningConfig {
    pub fn with_ports(&self, db_port: u16, admin_port: u16) -> Self {
        Self {
            db_port,
            admin_port,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthcheckSpec {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
}

/// One managed service as it will appear in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub image: String,
    pub container_name: String,
    pub environment: BTreeMap<String, String>,
    pub published_port: u16,
    pub internal_port: u16,
    pub volume_name: String,
    pub volume_target: String,
    pub extra_mounts: Vec<String>,
    pub network_name: String,
    pub restart_policy: String,
    pub depends_on: Vec<String>,
    pub healthcheck: Option<HealthcheckSpec>,
}

/// A saved pgAdmin server entry pointing at the database over the private network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRegistration {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "MaintenanceDB")]
    pub maintenance_db: String,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "SSLMode")]
    pub ssl_mode: String,
    #[serde(rename = "ConnectTimeout")]
    pub connect_timeout: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifacts {
    pub manifest: String,
    pub registration: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Container,
    Volume,
    Network,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Container => "container",
            ResourceKind::Volume => "volume",
            ResourceKind::Network => "network",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// A teardown step that failed. Logged and reported, never escalated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub resource: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<String>,
    pub warnings: Vec<CleanupWarning>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionSummary {
    pub host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_container: String,
    pub admin_port: u16,
    pub admin_url: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_container: String,
    pub completed_at: DateTime<Utc>,
}

impl fmt::Display for ProvisionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PostgreSQL")?;
        writeln!(f, "  Host:      {}", self.host)?;
        writeln!(f, "  Port:      {}", self.db_port)?;
        writeln!(f, "  User:      {}", self.db_user)?;
        writeln!(f, "  Password:  {}", self.db_password)?;
        writeln!(f, "  Container: {}", self.db_container)?;
        writeln!(f, "pgAdmin")?;
        writeln!(f, "  URL:       {}", self.admin_url)?;
        writeln!(f, "  Port:      {}", self.admin_port)?;
        writeln!(f, "  Email:     {}", self.admin_email)?;
        writeln!(f, "  Password:  {}", self.admin_password)?;
        writeln!(f, "  Container: {}", self.admin_container)?;
        write!(f, "Ready at {}", self.completed_at.to_rfc3339())
    }
}
