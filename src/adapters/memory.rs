//! In-memory stand-ins for the runtime, the port table and the console,
//! used by the workflow tests.

use crate::core::manifest::ComposeFile;
use crate::domain::model::{RemoveOutcome, ResourceKind};
use crate::domain::ports::{ConsoleProbe, ContainerRuntime, PortProbe};
use crate::utils::error::{ProvisionError, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    CheckAvailable,
    Remove(ResourceKind, String),
    PruneVolumes,
    BringUp(String, PathBuf),
    ProbeHealth(String),
}

#[derive(Debug, Default)]
struct RuntimeState {
    calls: Vec<RuntimeCall>,
    containers: BTreeSet<String>,
    volumes: BTreeSet<String>,
    dangling_volumes: BTreeSet<String>,
    networks: BTreeSet<String>,
    probes: u32,
}

impl RuntimeState {
    fn set_for(&mut self, kind: ResourceKind) -> &mut BTreeSet<String> {
        match kind {
            ResourceKind::Container => &mut self.containers,
            ResourceKind::Volume => &mut self.volumes,
            ResourceKind::Network => &mut self.networks,
        }
    }
}

/// Records every call and keeps track of the resources a manifest would
/// have created.
#[derive(Debug)]
pub struct InMemoryRuntime {
    state: Mutex<RuntimeState>,
    available: bool,
    bring_up_error: Option<String>,
    // None: 永遠不會健康
    healthy_after: Option<u32>,
    stuck: HashSet<String>,
}

impl Default for InMemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RuntimeState::default()),
            available: true,
            bring_up_error: None,
            healthy_after: Some(1),
            stuck: HashSet::new(),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Bring-up creates the network and volumes, then fails.
    pub fn failing_bring_up(mut self, message: impl Into<String>) -> Self {
        self.bring_up_error = Some(message.into());
        self
    }

    pub fn healthy_after(mut self, probes: u32) -> Self {
        self.healthy_after = Some(probes);
        self
    }

    pub fn never_healthy(mut self) -> Self {
        self.healthy_after = None;
        self
    }

    /// Removal of `name` always fails.
    pub fn with_stuck(mut self, name: &str) -> Self {
        self.stuck.insert(name.to_string());
        self
    }

    pub fn with_existing(mut self, kind: ResourceKind, name: &str) -> Self {
        self.state.get_mut().set_for(kind).insert(name.to_string());
        self
    }

    pub fn with_dangling_volume(mut self, name: &str) -> Self {
        self.state.get_mut().dangling_volumes.insert(name.to_string());
        self
    }

    pub async fn calls(&self) -> Vec<RuntimeCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn containers(&self) -> Vec<String> {
        self.state.lock().await.containers.iter().cloned().collect()
    }

    pub async fn volumes(&self) -> Vec<String> {
        self.state.lock().await.volumes.iter().cloned().collect()
    }

    pub async fn networks(&self) -> Vec<String> {
        self.state.lock().await.networks.iter().cloned().collect()
    }

    /// No containers, volumes (named or dangling) or networks left.
    pub async fn is_empty(&self) -> bool {
        let state = self.state.lock().await;
        state.containers.is_empty()
            && state.volumes.is_empty()
            && state.dangling_volumes.is_empty()
            && state.networks.is_empty()
    }
}

#[async_trait]
impl ContainerRuntime for InMemoryRuntime {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn check_available(&self) -> Result<()> {
        self.state.lock().await.calls.push(RuntimeCall::CheckAvailable);
        if self.available {
            Ok(())
        } else {
            Err(ProvisionError::environment("in-memory runtime is switched off"))
        }
    }

    async fn remove(&self, kind: ResourceKind, name: &str) -> Result<RemoveOutcome> {
        let mut state = self.state.lock().await;
        state.calls.push(RuntimeCall::Remove(kind, name.to_string()));
        if self.stuck.contains(name) {
            return Err(ProvisionError::orchestration(format!(
                "{} {} is still in use",
                kind, name
            )));
        }
        if state.set_for(kind).remove(name) {
            Ok(RemoveOutcome::Removed)
        } else {
            Ok(RemoveOutcome::NotFound)
        }
    }

    async fn prune_volumes(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(RuntimeCall::PruneVolumes);
        state.dangling_volumes.clear();
        Ok(())
    }

    async fn bring_up(&self, project: &str, manifest: &Path) -> Result<()> {
        let compose = match tokio::fs::read_to_string(manifest).await {
            Ok(text) => Some(serde_yaml_ng::from_str::<ComposeFile>(&text)?),
            Err(_) => None,
        };

        let mut state = self.state.lock().await;
        state
            .calls
            .push(RuntimeCall::BringUp(project.to_string(), manifest.to_path_buf()));

        let Some(compose) = compose else {
            return Err(ProvisionError::orchestration(format!(
                "cannot read manifest {}",
                manifest.display()
            )));
        };

        for (key, network) in &compose.networks {
            let name = network.name.clone().unwrap_or_else(|| key.clone());
            state.networks.insert(name);
        }
        for (key, volume) in &compose.volumes {
            let name = volume.name.clone().unwrap_or_else(|| key.clone());
            state.volumes.insert(name);
        }

        if let Some(message) = &self.bring_up_error {
            return Err(ProvisionError::orchestration(message.clone()));
        }

        for service in compose.services.values() {
            state.containers.insert(service.container_name.clone());
        }
        Ok(())
    }

    async fn probe_health(&self, container: &str, _command: &[String]) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.calls.push(RuntimeCall::ProbeHealth(container.to_string()));
        if !state.containers.contains(container) {
            return Err(ProvisionError::orchestration(format!(
                "no such container: {}",
                container
            )));
        }
        state.probes += 1;
        Ok(self.healthy_after.is_some_and(|n| state.probes >= n))
    }
}

/// Port table with a fixed set of occupied ports.
#[derive(Debug, Clone, Default)]
pub struct FixedPortProbe {
    busy: BTreeSet<u16>,
}

impl FixedPortProbe {
    pub fn new(busy: impl IntoIterator<Item = u16>) -> Self {
        Self {
            busy: busy.into_iter().collect(),
        }
    }
}

impl PortProbe for FixedPortProbe {
    fn is_in_use(&self, port: u16) -> bool {
        self.busy.contains(&port)
    }
}

/// Console that answers from the given attempt on, or never.
#[derive(Debug, Default)]
pub struct ScriptedConsoleProbe {
    respond_from: Option<u32>,
    attempts: AtomicU32,
}

impl ScriptedConsoleProbe {
    pub fn always() -> Self {
        Self::responding_after(1)
    }

    pub fn never() -> Self {
        Self {
            respond_from: None,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn responding_after(attempt: u32) -> Self {
        Self {
            respond_from: Some(attempt),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsoleProbe for ScriptedConsoleProbe {
    async fn responds(&self, _url: &Url) -> bool {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.respond_from.is_some_and(|from| attempt >= from)
    }
}
