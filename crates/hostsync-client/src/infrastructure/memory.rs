//! In-memory backend bridge.
//!
//! A complete, self-contained implementation of
//! [`BackendBridge`] holding its state in process memory.  Integration tests
//! and the demo binary run against it; the shipping application replaces it
//! with the adapter for the real privileged backend.
//!
//! Two fidelity points matter here:
//!
//! - **Legacy wire shapes.**  Raw records are rendered with the mixed key
//!   casings real backend versions produced (`is_active`, `ID`/`Timestamp`,
//!   `{"Time": …}` wrappers), so everything downstream exercises the
//!   normalizer the way production traffic does.
//! - **Push vocabulary.**  Mutations emit the same notifications the real
//!   backend emits (`config-list-changed`, `backup-created`, …), so
//!   push-driven reload wiring can be tested end to end.  Remote fetching is
//!   simulated from a seeded url→body table instead of real HTTP.
//!
//! Notifications are emitted after the state lock is released, so a handler
//! that immediately calls back into the bridge cannot deadlock.

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use hostsync_core::domain::projections;
use hostsync_core::{Backup, ConfigSource, Configuration, FetchStatus, RemoteSource, UpdateFrequency};

use crate::application::bridge::{BackendBridge, BackendError, PushCallback};

/// Platform-neutral default hosts content used by `RestoreDefaultHosts`.
const DEFAULT_HOSTS: &str = "127.0.0.1 localhost\n::1 localhost\n";

#[derive(Default)]
struct BackendState {
    configs: Vec<Configuration>,
    backups: Vec<Backup>,
    sources: Vec<RemoteSource>,
    system_hosts: String,
    admin_required: bool,
    /// url → body table standing in for the network.
    remote_bodies: HashMap<String, String>,
}

/// In-process [`BackendBridge`] implementation.
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    push: StdMutex<HashMap<String, PushCallback>>,
    /// Bridge methods scripted to fail on their next call (test hook).
    fail_next: StdMutex<HashSet<&'static str>>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BackendState {
                system_hosts: DEFAULT_HOSTS.to_string(),
                ..BackendState::default()
            }),
            push: StdMutex::new(HashMap::new()),
            fail_next: StdMutex::new(HashSet::new()),
        }
    }

    // ── Test/demo hooks ──────────────────────────────────────────────────────

    /// Registers a body served for `url` by the simulated network.
    pub async fn seed_remote_body(&self, url: &str, body: &str) {
        self.state
            .lock()
            .await
            .remote_bodies
            .insert(url.to_string(), body.to_string());
    }

    /// The current simulated system hosts file.
    pub async fn system_hosts(&self) -> String {
        self.state.lock().await.system_hosts.clone()
    }

    /// Makes the named capability query report elevation as (un)satisfied.
    pub async fn set_admin_required(&self, required: bool) {
        self.state.lock().await.admin_required = required;
    }

    /// Scripts the named bridge method to fail on its next invocation.
    pub fn fail_next(&self, method: &'static str) {
        self.fail_next.lock().unwrap().insert(method);
    }

    /// Delivers a push notification to the registered handler, exactly as a
    /// backend-initiated event (e.g. an external hosts-file edit) would.
    pub fn emit(&self, event: &str, payload: Value) {
        let callback = self.push.lock().unwrap().get(event).cloned();
        if let Some(callback) = callback {
            debug!(event, "delivering push notification");
            callback(&payload);
        }
    }

    fn emit_all(&self, events: Vec<(&'static str, Value)>) {
        for (event, payload) in events {
            self.emit(event, payload);
        }
    }

    fn take_failure(&self, method: &'static str) -> Result<(), BackendError> {
        if self.fail_next.lock().unwrap().remove(method) {
            Err(BackendError::new(format!("{method}: injected failure")))
        } else {
            Ok(())
        }
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    /// Snapshots the current hosts file into an automatic backup.
    /// Returns the event announcing it.
    fn auto_backup(state: &mut BackendState, description: &str) -> (&'static str, Value) {
        let backup = make_backup(&state.system_hosts, description, true, &[]);
        let id = backup.id.clone();
        state.backups.push(backup);
        ("backup-created", json!(id))
    }

    /// Resolves the body for a source: cached content first, then the
    /// simulated network.  Mutates the source's status accordingly.
    fn fetch_body_for(
        state: &mut BackendState,
        index: usize,
    ) -> Result<String, BackendError> {
        let url = state.sources[index].url.clone();
        match state.remote_bodies.get(&url).cloned() {
            Some(body) => {
                let source = &mut state.sources[index];
                source.status = FetchStatus::Success;
                source.last_content = body.clone();
                source.last_updated_at = Some(Utc::now());
                Ok(body)
            }
            None => {
                state.sources[index].status = FetchStatus::Failed;
                Err(BackendError::new(format!(
                    "failed to fetch {url}: host unreachable"
                )))
            }
        }
    }
}

// ── Raw record rendering (legacy wire shapes) ─────────────────────────────────

fn config_to_raw(c: &Configuration) -> Value {
    // Key spellings as the original backend's JSON tags emitted them:
    // snake_case flags, a wrapped updated_at.
    json!({
        "id": c.id,
        "name": c.name,
        "description": c.description,
        "content": c.content,
        "is_active": c.is_active,
        "source": c.source.as_str(),
        "remoteUrl": c.remote_url,
        "created_at": c.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        "updated_at": {"Time": c.updated_at.map(|t| t.to_rfc3339()).unwrap_or_default()},
    })
}

fn backup_to_raw(b: &Backup) -> Value {
    // An older serializer capitalised every key.
    json!({
        "ID": b.id,
        "Timestamp": b.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default(),
        "IsAutomatic": b.is_automatic,
        "Description": b.description,
        "Tags": b.tags,
        "Size": b.size,
        "Content": b.content,
        "Hash": b.hash,
    })
}

fn source_to_raw(s: &RemoteSource) -> Value {
    json!({
        "id": s.id,
        "name": s.name,
        "url": s.url,
        "updateFreq": s.update_freq.as_str(),
        "lastUpdatedAt": s.last_updated_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        "lastContent": s.last_content,
        "status": s.status.as_str(),
    })
}

fn make_backup(content: &str, description: &str, automatic: bool, tags: &[String]) -> Backup {
    Backup {
        id: Uuid::new_v4().to_string(),
        timestamp: Some(Utc::now()),
        is_automatic: automatic,
        description: description.to_string(),
        tags: tags.to_vec(),
        size: content.len() as u64,
        content: content.to_string(),
        hash: Some(content_hash(content)),
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn require_non_blank(value: &str, what: &str) -> Result<(), BackendError> {
    if value.trim().is_empty() {
        Err(BackendError::new(format!("{what} must not be empty")))
    } else {
        Ok(())
    }
}

// ── Bridge implementation ─────────────────────────────────────────────────────

#[async_trait]
impl BackendBridge for InMemoryBackend {
    // ── Configurations ───────────────────────────────────────────────────────

    async fn get_all_configs(&self) -> Result<Value, BackendError> {
        self.take_failure("GetAllConfigs")?;
        let state = self.state.lock().await;
        Ok(Value::Array(state.configs.iter().map(config_to_raw).collect()))
    }

    async fn create_config(
        &self,
        name: &str,
        description: &str,
        content: &str,
    ) -> Result<Value, BackendError> {
        self.take_failure("CreateConfig")?;
        require_non_blank(name, "configuration name")?;

        let (raw, events) = {
            let mut state = self.state.lock().await;
            if state.configs.iter().any(|c| c.name == name) {
                return Err(BackendError::new(format!(
                    "configuration name already exists: {name}"
                )));
            }
            let now = Utc::now();
            let config = Configuration {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                description: description.to_string(),
                content: content.to_string(),
                is_active: false,
                source: ConfigSource::Local,
                remote_url: None,
                created_at: Some(now),
                updated_at: Some(now),
            };
            let raw = config_to_raw(&config);
            state.configs.push(config);
            (raw, vec![("config-list-changed", Value::Null)])
        };
        self.emit_all(events);
        Ok(raw)
    }

    async fn update_config(
        &self,
        id: &str,
        name: &str,
        description: &str,
        content: &str,
    ) -> Result<Value, BackendError> {
        self.take_failure("UpdateConfig")?;
        require_non_blank(name, "configuration name")?;

        let raw = {
            let mut state = self.state.lock().await;
            let config = state
                .configs
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| BackendError::new(format!("configuration not found: {id}")))?;
            config.name = name.to_string();
            config.description = description.to_string();
            config.content = content.to_string();
            config.updated_at = Some(Utc::now());
            config_to_raw(config)
        };
        self.emit("config-list-changed", Value::Null);
        Ok(raw)
    }

    async fn delete_config(&self, id: &str) -> Result<(), BackendError> {
        self.take_failure("DeleteConfig")?;
        {
            let mut state = self.state.lock().await;
            let before = state.configs.len();
            state.configs.retain(|c| c.id != id);
            if state.configs.len() == before {
                return Err(BackendError::new(format!("configuration not found: {id}")));
            }
        }
        self.emit("config-list-changed", Value::Null);
        Ok(())
    }

    async fn apply_config(&self, id: &str) -> Result<(), BackendError> {
        self.take_failure("ApplyConfig")?;
        let events = {
            let mut state = self.state.lock().await;
            let content = state
                .configs
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.content.clone())
                .ok_or_else(|| BackendError::new(format!("configuration not found: {id}")))?;

            let backup_event =
                Self::auto_backup(&mut state, "Automatic backup before applying configuration");
            state.system_hosts = content;
            let now = Utc::now();
            for config in &mut state.configs {
                config.is_active = config.id == id;
                if config.is_active {
                    config.updated_at = Some(now);
                }
            }
            vec![
                backup_event,
                ("config-applied", json!(id)),
                ("config-list-changed", Value::Null),
                ("system-hosts-updated", Value::Null),
            ]
        };
        self.emit_all(events);
        Ok(())
    }

    async fn get_system_hosts_path(&self) -> Result<String, BackendError> {
        self.take_failure("GetSystemHostsPath")?;
        Ok("/etc/hosts".to_string())
    }

    async fn read_system_hosts(&self) -> Result<String, BackendError> {
        self.take_failure("ReadSystemHosts")?;
        Ok(self.state.lock().await.system_hosts.clone())
    }

    async fn write_system_hosts(&self, content: &str) -> Result<(), BackendError> {
        self.take_failure("WriteSystemHosts")?;
        let events = {
            let mut state = self.state.lock().await;
            let backup_event =
                Self::auto_backup(&mut state, "Automatic backup before manual hosts write");
            state.system_hosts = content.to_string();
            vec![backup_event, ("system-hosts-updated", Value::Null)]
        };
        self.emit_all(events);
        Ok(())
    }

    async fn validate_hosts_content(&self, content: &str) -> Result<(), BackendError> {
        self.take_failure("ValidateHostsContent")?;
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let address = fields.next().unwrap_or_default();
            if fields.next().is_none() {
                return Err(BackendError::new(format!(
                    "invalid hosts entry on line {}: missing hostname",
                    number + 1
                )));
            }
            if !address
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == '.' || c == ':')
            {
                return Err(BackendError::new(format!(
                    "invalid hosts entry on line {}: bad address {address:?}",
                    number + 1
                )));
            }
        }
        Ok(())
    }

    async fn is_admin_required(&self) -> Result<bool, BackendError> {
        self.take_failure("IsAdminRequired")?;
        Ok(self.state.lock().await.admin_required)
    }

    async fn restore_default_hosts(&self) -> Result<(), BackendError> {
        self.take_failure("RestoreDefaultHosts")?;
        let events = {
            let mut state = self.state.lock().await;
            let backup_event =
                Self::auto_backup(&mut state, "Automatic backup before restoring defaults");
            state.system_hosts = DEFAULT_HOSTS.to_string();
            for config in &mut state.configs {
                config.is_active = false;
            }
            vec![
                backup_event,
                ("config-list-changed", Value::Null),
                ("system-hosts-updated", Value::Null),
            ]
        };
        self.emit_all(events);
        Ok(())
    }

    async fn flush_dns_cache(&self) -> Result<(), BackendError> {
        self.take_failure("FlushDNSCache")?;
        Ok(())
    }

    // ── Backups ──────────────────────────────────────────────────────────────

    async fn get_all_backups(&self) -> Result<Value, BackendError> {
        self.take_failure("GetAllBackups")?;
        let state = self.state.lock().await;
        Ok(Value::Array(state.backups.iter().map(backup_to_raw).collect()))
    }

    async fn get_backup_stats(&self) -> Result<Value, BackendError> {
        self.take_failure("GetBackupStats")?;
        let state = self.state.lock().await;
        let stats = projections::backup_stats(&state.backups);
        Ok(serde_json::to_value(stats).expect("stats serialize"))
    }

    async fn create_manual_backup(
        &self,
        description: &str,
        tags: &[String],
    ) -> Result<Value, BackendError> {
        self.take_failure("CreateManualBackup")?;
        let (raw, id) = {
            let mut state = self.state.lock().await;
            let backup = make_backup(&state.system_hosts, description, false, tags);
            let raw = backup_to_raw(&backup);
            let id = backup.id.clone();
            state.backups.push(backup);
            (raw, id)
        };
        self.emit("backup-created", json!(id));
        Ok(raw)
    }

    async fn create_manual_backup_with_content(
        &self,
        description: &str,
        content: &str,
        tags: &[String],
    ) -> Result<Value, BackendError> {
        self.take_failure("CreateManualBackupWithContent")?;
        let (raw, id) = {
            let mut state = self.state.lock().await;
            let backup = make_backup(content, description, false, tags);
            let raw = backup_to_raw(&backup);
            let id = backup.id.clone();
            state.backups.push(backup);
            (raw, id)
        };
        self.emit("backup-created", json!(id));
        Ok(raw)
    }

    async fn restore_from_backup(&self, id: &str) -> Result<(), BackendError> {
        self.take_failure("RestoreFromBackup")?;
        let events = {
            let mut state = self.state.lock().await;
            let content = state
                .backups
                .iter()
                .find(|b| b.id == id)
                .map(|b| b.content.clone())
                .ok_or_else(|| BackendError::new(format!("backup not found: {id}")))?;

            let backup_event = Self::auto_backup(&mut state, "Automatic backup before restore");
            state.system_hosts = content;
            vec![
                backup_event,
                ("backup-restored", json!(id)),
                ("system-hosts-updated", Value::Null),
            ]
        };
        self.emit_all(events);
        Ok(())
    }

    async fn delete_backup(&self, id: &str) -> Result<(), BackendError> {
        self.take_failure("DeleteBackup")?;
        {
            let mut state = self.state.lock().await;
            let before = state.backups.len();
            state.backups.retain(|b| b.id != id);
            if state.backups.len() == before {
                return Err(BackendError::new(format!("backup not found: {id}")));
            }
        }
        self.emit("backup-deleted", json!(id));
        Ok(())
    }

    async fn update_backup_tags(&self, id: &str, tags: &[String]) -> Result<(), BackendError> {
        self.take_failure("UpdateBackupTags")?;
        {
            let mut state = self.state.lock().await;
            let backup = state
                .backups
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| BackendError::new(format!("backup not found: {id}")))?;
            backup.tags = tags.to_vec();
        }
        self.emit("backup-updated", json!(id));
        Ok(())
    }

    async fn update_backup_description(
        &self,
        id: &str,
        description: &str,
    ) -> Result<(), BackendError> {
        self.take_failure("UpdateBackupDescription")?;
        {
            let mut state = self.state.lock().await;
            let backup = state
                .backups
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| BackendError::new(format!("backup not found: {id}")))?;
            backup.description = description.to_string();
        }
        self.emit("backup-updated", json!(id));
        Ok(())
    }

    // ── Remote sources ───────────────────────────────────────────────────────

    async fn get_all_remote_sources(&self) -> Result<Value, BackendError> {
        self.take_failure("GetAllRemoteSources")?;
        let state = self.state.lock().await;
        Ok(Value::Array(state.sources.iter().map(source_to_raw).collect()))
    }

    async fn add_remote_source(
        &self,
        name: &str,
        url: &str,
        update_freq: UpdateFrequency,
    ) -> Result<Value, BackendError> {
        self.take_failure("AddRemoteSource")?;
        require_non_blank(name, "remote source name")?;
        require_non_blank(url, "remote source URL")?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(BackendError::new(
                "remote source URL must start with http:// or https://",
            ));
        }

        let raw = {
            let mut state = self.state.lock().await;
            let source = RemoteSource {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                url: url.to_string(),
                update_freq,
                last_updated_at: None,
                last_content: String::new(),
                status: FetchStatus::Pending,
            };
            let raw = source_to_raw(&source);
            state.sources.push(source);
            raw
        };
        self.emit("remote-source-list-changed", Value::Null);
        Ok(raw)
    }

    async fn update_remote_source(
        &self,
        id: &str,
        name: &str,
        url: &str,
        update_freq: UpdateFrequency,
    ) -> Result<Value, BackendError> {
        self.take_failure("UpdateRemoteSource")?;
        require_non_blank(name, "remote source name")?;
        require_non_blank(url, "remote source URL")?;

        let raw = {
            let mut state = self.state.lock().await;
            let source = state
                .sources
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| BackendError::new(format!("remote source not found: {id}")))?;
            source.name = name.to_string();
            source.url = url.to_string();
            source.update_freq = update_freq;
            source_to_raw(source)
        };
        self.emit("remote-source-list-changed", Value::Null);
        Ok(raw)
    }

    async fn delete_remote_source(&self, id: &str) -> Result<(), BackendError> {
        self.take_failure("DeleteRemoteSource")?;
        {
            let mut state = self.state.lock().await;
            let before = state.sources.len();
            state.sources.retain(|s| s.id != id);
            if state.sources.len() == before {
                return Err(BackendError::new(format!("remote source not found: {id}")));
            }
        }
        self.emit("remote-source-list-changed", Value::Null);
        Ok(())
    }

    async fn fetch_remote_hosts(&self, id: &str) -> Result<String, BackendError> {
        self.take_failure("FetchRemoteHosts")?;

        // Phase 1: mark the fetch in flight.
        {
            let mut state = self.state.lock().await;
            let index = state
                .sources
                .iter()
                .position(|s| s.id == id)
                .ok_or_else(|| BackendError::new(format!("remote source not found: {id}")))?;
            state.sources[index].status = FetchStatus::Pending;
        }
        self.emit("remote-source-status-changed", json!(id));

        // Phase 2: "network" round trip.  The source is re-resolved because
        // another caller may have deleted it between the two lock scopes.
        let outcome = {
            let mut state = self.state.lock().await;
            match state.sources.iter().position(|s| s.id == id) {
                Some(index) => Self::fetch_body_for(&mut state, index),
                None => Err(BackendError::new(format!("remote source not found: {id}"))),
            }
        };
        self.emit("remote-source-status-changed", json!(id));
        outcome
    }

    async fn create_config_from_remote(&self, id: &str) -> Result<Value, BackendError> {
        self.take_failure("CreateConfigFromRemote")?;
        let raw = {
            let mut state = self.state.lock().await;
            let index = state
                .sources
                .iter()
                .position(|s| s.id == id)
                .ok_or_else(|| BackendError::new(format!("remote source not found: {id}")))?;

            let body = if state.sources[index].last_content.is_empty() {
                Self::fetch_body_for(&mut state, index)?
            } else {
                state.sources[index].last_content.clone()
            };

            let source = &state.sources[index];
            let now = Utc::now();
            let config = Configuration {
                id: Uuid::new_v4().to_string(),
                name: source.name.clone(),
                description: format!("Imported from {}", source.url),
                content: body,
                is_active: false,
                source: ConfigSource::Remote,
                remote_url: Some(source.url.clone()),
                created_at: Some(now),
                updated_at: Some(now),
            };
            let raw = config_to_raw(&config);
            state.configs.push(config);
            raw
        };
        self.emit("config-list-changed", Value::Null);
        Ok(raw)
    }

    async fn update_all_remote_sources(&self) -> Result<(), BackendError> {
        self.take_failure("UpdateAllRemoteSources")?;
        {
            let mut state = self.state.lock().await;
            // Individual fetch failures only mark the source failed; the
            // sweep itself still succeeds.
            for index in 0..state.sources.len() {
                let _ = Self::fetch_body_for(&mut state, index);
            }
        }
        self.emit("remote-source-list-changed", Value::Null);
        Ok(())
    }

    async fn apply_remote_to_system(&self, id: &str) -> Result<(), BackendError> {
        self.take_failure("ApplyRemoteToSystem")?;
        let events = {
            let mut state = self.state.lock().await;
            let index = state
                .sources
                .iter()
                .position(|s| s.id == id)
                .ok_or_else(|| BackendError::new(format!("remote source not found: {id}")))?;

            let body = if state.sources[index].last_content.is_empty() {
                Self::fetch_body_for(&mut state, index)?
            } else {
                state.sources[index].last_content.clone()
            };

            let backup_event =
                Self::auto_backup(&mut state, "Automatic backup before applying remote source");
            state.system_hosts = body;
            vec![backup_event, ("system-hosts-updated", Value::Null)]
        };
        self.emit_all(events);
        Ok(())
    }

    // ── Push notifications ───────────────────────────────────────────────────

    fn subscribe_push(&self, event: &str, callback: PushCallback) {
        self.push
            .lock()
            .unwrap()
            .insert(event.to_string(), callback);
    }

    fn unsubscribe_push(&self, event: &str) {
        self.push.lock().unwrap().remove(event);
    }
}
