//! Renders the two generated artifacts: the compose manifest describing
//! both managed services, and the pgAdmin `servers.json` that pre-registers
//! the database.

use crate::config::StackLayout;
use crate::domain::model::{
    ConnectionRegistration, HealthcheckSpec, ProvisioningConfig, RenderedArtifacts,
    ServiceDescriptor,
};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// Compose file types

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ComposeFile {
    pub services: BTreeMap<String, ComposeService>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, ComposeVolume>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, ComposeNetwork>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ComposeService {
    pub image: String,
    pub container_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub restart: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<ComposeHealthcheck>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComposeHealthcheck {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ComposeVolume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ComposeNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationFile {
    #[serde(rename = "Servers")]
    pub servers: BTreeMap<String, ConnectionRegistration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub manifest: PathBuf,
    pub registration: PathBuf,
}

/// Command run inside the database container to check readiness. Used both
/// for the manifest healthcheck and for the readiness gate.
pub fn database_probe_command(config: &ProvisioningConfig, layout: &StackLayout) -> Vec<String> {
    vec![
        "pg_isready".to_string(),
        "-U".to_string(),
        config.db_user.clone(),
        "-d".to_string(),
        layout.database.maintenance_db.clone(),
    ]
}

pub fn describe_services(
    config: &ProvisioningConfig,
    layout: &StackLayout,
) -> [ServiceDescriptor; 2] {
    let db = &layout.database;
    let console = &layout.console;

    let mut db_env = BTreeMap::new();
    db_env.insert("POSTGRES_USER".to_string(), config.db_user.clone());
    db_env.insert("POSTGRES_PASSWORD".to_string(), config.db_password.clone());
    db_env.insert("POSTGRES_DB".to_string(), db.maintenance_db.clone());

    let mut health_test = vec!["CMD".to_string()];
    health_test.extend(database_probe_command(config, layout));

    let database = ServiceDescriptor {
        name: db.service.clone(),
        image: db.image.clone(),
        container_name: db.container.clone(),
        environment: db_env,
        published_port: config.db_port,
        internal_port: db.internal_port,
        volume_name: db.volume.clone(),
        volume_target: db.data_dir.clone(),
        extra_mounts: Vec::new(),
        network_name: layout.network.name.clone(),
        restart_policy: layout.project.restart_policy.clone(),
        depends_on: Vec::new(),
        healthcheck: Some(HealthcheckSpec {
            test: health_test,
            interval: db.health.interval.clone(),
            timeout: db.health.timeout.clone(),
            retries: db.health.retries,
        }),
    };

    let mut console_env = BTreeMap::new();
    console_env.insert("PGADMIN_DEFAULT_EMAIL".to_string(), config.admin_email.clone());
    console_env.insert(
        "PGADMIN_DEFAULT_PASSWORD".to_string(),
        config.admin_password.clone(),
    );
    console_env.insert("PGADMIN_CONFIG_SERVER_MODE".to_string(), "False".to_string());
    console_env.insert(
        "PGADMIN_CONFIG_MASTER_PASSWORD_REQUIRED".to_string(),
        "False".to_string(),
    );

    let admin = ServiceDescriptor {
        name: console.service.clone(),
        image: console.image.clone(),
        container_name: console.container.clone(),
        environment: console_env,
        published_port: config.admin_port,
        internal_port: console.internal_port,
        volume_name: console.volume.clone(),
        volume_target: console.data_dir.clone(),
        extra_mounts: vec![format!(
            "./{}:{}:ro",
            layout.files.registration, console.servers_mount
        )],
        network_name: layout.network.name.clone(),
        restart_policy: layout.project.restart_policy.clone(),
        depends_on: vec![db.service.clone()],
        healthcheck: None,
    };

    [database, admin]
}

/// The saved server always targets the container name and the internal
/// port; the published port is only for clients on the host.
pub fn registration_for(config: &ProvisioningConfig, layout: &StackLayout) -> ConnectionRegistration {
    ConnectionRegistration {
        name: layout.console.server_name.clone(),
        group: layout.console.server_group.clone(),
        host: layout.database.container.clone(),
        port: layout.database.internal_port,
        maintenance_db: layout.database.maintenance_db.clone(),
        username: config.db_user.clone(),
        password: config.db_password.clone(),
        ssl_mode: layout.console.ssl_mode.clone(),
        connect_timeout: layout.console.connect_timeout,
    }
}

// compose 會對 `$` 做變數展開，值中的 `$` 需要寫成 `$$`
fn escape_interpolation(value: &str) -> String {
    value.replace('$', "$$")
}

fn to_compose_service(descriptor: &ServiceDescriptor) -> ComposeService {
    let mut volumes = vec![format!(
        "{}:{}",
        descriptor.volume_name, descriptor.volume_target
    )];
    volumes.extend(descriptor.extra_mounts.iter().cloned());

    ComposeService {
        image: descriptor.image.clone(),
        container_name: descriptor.container_name.clone(),
        environment: descriptor
            .environment
            .iter()
            .map(|(key, value)| format!("{}={}", key, escape_interpolation(value)))
            .collect(),
        volumes,
        ports: vec![format!(
            "{}:{}",
            descriptor.published_port, descriptor.internal_port
        )],
        networks: vec![descriptor.network_name.clone()],
        depends_on: descriptor.depends_on.clone(),
        restart: descriptor.restart_policy.clone(),
        healthcheck: descriptor.healthcheck.as_ref().map(|h| ComposeHealthcheck {
            test: h.test.iter().map(String::as_str).map(escape_interpolation).collect(),
            interval: h.interval.clone(),
            timeout: h.timeout.clone(),
            retries: h.retries,
        }),
    }
}

pub fn render_manifest(config: &ProvisioningConfig, layout: &StackLayout) -> Result<String> {
    let mut compose = ComposeFile::default();

    for descriptor in describe_services(config, layout) {
        // 明確指定 volume 名稱，避免被加上 project 前綴，清理時才能以名稱刪除
        compose.volumes.insert(
            descriptor.volume_name.clone(),
            ComposeVolume {
                name: Some(descriptor.volume_name.clone()),
            },
        );
        compose
            .services
            .insert(descriptor.name.clone(), to_compose_service(&descriptor));
    }

    compose.networks.insert(
        layout.network.name.clone(),
        ComposeNetwork {
            name: Some(layout.network.name.clone()),
            driver: Some(layout.network.driver.clone()),
        },
    );

    Ok(serde_yaml_ng::to_string(&compose)?)
}

pub fn render_registration(config: &ProvisioningConfig, layout: &StackLayout) -> Result<String> {
    let mut servers = BTreeMap::new();
    servers.insert("1".to_string(), registration_for(config, layout));
    let file = RegistrationFile { servers };
    Ok(serde_json::to_string_pretty(&file)?)
}

pub fn render(config: &ProvisioningConfig, layout: &StackLayout) -> Result<RenderedArtifacts> {
    Ok(RenderedArtifacts {
        manifest: render_manifest(config, layout)?,
        registration: render_registration(config, layout)?,
    })
}

/// Writes both artifacts. If the second write fails the first file is
/// removed again so the pair never exists half-written.
pub async fn write_artifacts<S: Storage>(
    storage: &S,
    layout: &StackLayout,
    artifacts: &RenderedArtifacts,
) -> Result<ArtifactPaths> {
    storage
        .write_file(&layout.files.registration, artifacts.registration.as_bytes())
        .await?;

    if let Err(e) = storage
        .write_file(&layout.files.manifest, artifacts.manifest.as_bytes())
        .await
    {
        if let Err(remove_err) = storage.remove_file(&layout.files.registration).await {
            tracing::warn!(
                "⚠️ Could not remove {} after failed write: {}",
                layout.files.registration,
                remove_err
            );
        }
        return Err(e);
    }

    let paths = ArtifactPaths {
        manifest: storage.full_path(&layout.files.manifest),
        registration: storage.full_path(&layout.files.registration),
    };
    tracing::info!("📝 Generated {}", paths.manifest.display());
    tracing::info!("📝 Generated {}", paths.registration.display());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use crate::core::validator::validate;
    use crate::domain::model::RawConfig;
    use tempfile::TempDir;

    fn config() -> ProvisioningConfig {
        validate(&RawConfig::default()).unwrap()
    }

    #[test]
    fn test_manifest_declares_both_managed_services() {
        let layout = StackLayout::default();
        let text = render_manifest(&config(), &layout).unwrap();

        let parsed: ComposeFile = serde_yaml_ng::from_str(&text).unwrap();
        let names: Vec<&str> = parsed.services.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["pgadmin", "postgres"]);

        let db = &parsed.services["postgres"];
        assert_eq!(db.image, "postgres:16");
        assert_eq!(db.container_name, "postgres_db");
        assert_eq!(db.ports, vec!["5432:5432"]);
        assert_eq!(db.networks, vec!["pg_network"]);
        assert_eq!(db.restart, "unless-stopped");
        assert!(db.volumes.contains(&"postgres_data:/var/lib/postgresql/data".to_string()));
        assert!(db.environment.contains(&"POSTGRES_USER=postgres".to_string()));

        let health = db.healthcheck.as_ref().unwrap();
        assert_eq!(health.test[0], "CMD");
        assert!(health.test.contains(&"pg_isready".to_string()));
        assert_eq!(health.interval, "10s");
        assert_eq!(health.timeout, "5s");
        assert_eq!(health.retries, 5);

        let console = &parsed.services["pgadmin"];
        assert_eq!(console.ports, vec!["5050:80"]);
        assert_eq!(console.depends_on, vec!["postgres"]);
        assert!(console.healthcheck.is_none());
        assert!(console
            .volumes
            .contains(&"./servers.json:/pgadmin4/servers.json:ro".to_string()));

        assert_eq!(parsed.volumes["postgres_data"].name.as_deref(), Some("postgres_data"));
        assert_eq!(parsed.networks["pg_network"].driver.as_deref(), Some("bridge"));
    }

    #[test]
    fn test_registration_uses_internal_port_and_container_host() {
        let layout = StackLayout::default();
        let remapped = config().with_ports(5440, 5060);

        let text = render_registration(&remapped, &layout).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let server = &json["Servers"]["1"];

        assert_eq!(server["Host"], "postgres_db");
        assert_eq!(server["Port"], 5432);
        assert_eq!(server["MaintenanceDB"], "postgres");
        assert_eq!(server["Username"], "postgres");
        assert_eq!(server["SSLMode"], "prefer");
        assert_eq!(server["ConnectTimeout"], 10);

        // 外部埠只出現在 manifest 的 port mapping
        let manifest: ComposeFile =
            serde_yaml_ng::from_str(&render_manifest(&remapped, &layout).unwrap()).unwrap();
        assert_eq!(manifest.services["postgres"].ports, vec!["5440:5432"]);
    }

    #[test]
    fn test_healthcheck_user_is_escaped() {
        let layout = StackLayout::default();
        let config = ProvisioningConfig {
            db_user: "app$user".to_string(),
            ..config()
        };

        let parsed: ComposeFile =
            serde_yaml_ng::from_str(&render_manifest(&config, &layout).unwrap()).unwrap();
        let health = parsed.services["postgres"].healthcheck.as_ref().unwrap();
        assert!(health.test.contains(&"app$$user".to_string()));
        assert_eq!(health.test[0], "CMD");
    }

    #[test]
    fn test_dollar_signs_are_escaped() {
        let layout = StackLayout::default();
        let config = ProvisioningConfig {
            db_password: "pa$$word1".to_string(),
            ..config()
        };

        let parsed: ComposeFile =
            serde_yaml_ng::from_str(&render_manifest(&config, &layout).unwrap()).unwrap();
        assert!(parsed.services["postgres"]
            .environment
            .contains(&"POSTGRES_PASSWORD=pa$$$$word1".to_string()));

        // servers.json 不經過 compose，保持原值
        let registration = render_registration(&config, &layout).unwrap();
        assert!(registration.contains("\"pa$$word1\""));
    }

    #[tokio::test]
    async fn test_write_artifacts_overwrites_existing_files() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StackLayout::default();
        std::fs::write(temp_dir.path().join("docker-compose.yml"), "stale").unwrap();

        let storage = LocalStorage::new(temp_dir.path());
        let artifacts = render(&config(), &layout).unwrap();
        let paths = write_artifacts(&storage, &layout, &artifacts).await.unwrap();

        assert_eq!(paths.manifest, temp_dir.path().join("docker-compose.yml"));
        let manifest = std::fs::read_to_string(&paths.manifest).unwrap();
        assert_eq!(manifest, artifacts.manifest);
        let registration = storage.read_file("servers.json").await.unwrap();
        assert_eq!(registration, artifacts.registration.as_bytes());
    }

    #[tokio::test]
    async fn test_failed_second_write_leaves_no_files() {
        let temp_dir = TempDir::new().unwrap();
        let layout = StackLayout::default();
        // manifest 路徑被目錄佔用，rename 必定失敗
        std::fs::create_dir(temp_dir.path().join("docker-compose.yml")).unwrap();

        let storage = LocalStorage::new(temp_dir.path());
        let artifacts = render(&config(), &layout).unwrap();
        assert!(write_artifacts(&storage, &layout, &artifacts).await.is_err());

        assert!(!temp_dir.path().join("servers.json").exists());
    }
}
