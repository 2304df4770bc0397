//! Sync orchestrator: pull / push / test against the configured remote.
//!
//! Operations share no state besides the [`ConfigStore`]. Nothing is retried
//! here; the first error is returned as is.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;

use crate::codec;
use crate::config::{self, SYNC_KEY};
use crate::error::{SyncError, SyncResult};
use crate::providers::{RemoteConnector, RemoteStore};
use crate::settings::{self, SyncSettings};
use crate::store::ConfigStore;

/// Result of a successful pull.
#[derive(Debug, Clone, PartialEq)]
pub struct PullOutcome {
    pub config: Value,
    pub last_sync_at: String,
}

pub struct SyncService {
    store: Arc<dyn ConfigStore>,
    connector: Arc<dyn RemoteConnector>,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn commit_message(timestamp: &str) -> String {
    format!("chore: update chrome-home-plugin config ({timestamp})")
}

fn changed_keys(before: &Value, after: &Value) -> usize {
    match (before.as_object(), after.as_object()) {
        (Some(before), Some(after)) => after
            .iter()
            .filter(|(key, value)| before.get(*key) != Some(*value))
            .count(),
        _ => 0,
    }
}

fn sync_section(config: &Value) -> &Value {
    config.get(SYNC_KEY).unwrap_or(&Value::Null)
}

impl SyncService {
    pub fn new(store: Arc<dyn ConfigStore>, connector: Arc<dyn RemoteConnector>) -> Self {
        Self { store, connector }
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// Current config overlaid on the defaults.
    pub fn read_config(&self) -> SyncResult<Value> {
        Ok(config::with_defaults(self.store.load_config()?.as_ref()))
    }

    /// First-run initialisation: persist the defaults merged with whatever is stored.
    pub fn ensure_initialized(&self) -> SyncResult<Value> {
        let config = self.read_config()?;
        self.store.save_config(&config)?;
        Ok(config)
    }

    /// Merge `patch` into the stored config and return the result.
    pub fn set_config(&self, patch: &Value) -> SyncResult<Value> {
        let current = self.read_config()?;
        let next = config::apply_patch(&current, patch);
        self.store.save_config(&next)?;
        Ok(next)
    }

    /// Normalized sync settings of the stored config.
    pub fn sync_settings(&self) -> SyncResult<SyncSettings> {
        Ok(settings::normalize(sync_section(&self.read_config()?)))
    }

    pub fn last_sync_at(&self) -> SyncResult<Option<String>> {
        self.store.last_sync_at()
    }

    /// Replace the local config with the remote one (remote wins over defaults).
    pub async fn pull(&self) -> SyncResult<PullOutcome> {
        let local = self.read_config()?;
        let settings = settings::validate(sync_section(&local))?;
        let remote = self.connector.connect(&settings);

        let merged = fetch_remote_config(remote.as_ref()).await?;
        self.store.save_config(&merged)?;
        let last_sync_at = self.record_sync()?;

        log::info!("[Sync] Pulled config from {}", settings.provider);
        Ok(PullOutcome {
            config: merged,
            last_sync_at,
        })
    }

    /// Pull, merge local edits over the remote, persist, then write the remote.
    ///
    /// A missing remote file is not an error here: the first push creates it.
    /// If the write fails after the merge was persisted, the local config keeps
    /// the merged state.
    pub async fn push(&self) -> SyncResult<String> {
        let local = self.read_config()?;
        let settings = settings::validate(sync_section(&local))?;
        let remote = self.connector.connect(&settings);

        let payload = match fetch_remote_config(remote.as_ref()).await {
            Ok(remote_config) => {
                let merged = config::deep_merge(&remote_config, &local);
                log::debug!(
                    "[Sync] {} top-level keys differ from remote after merge",
                    changed_keys(&remote_config, &merged)
                );
                self.store.save_config(&merged)?;
                merged
            }
            Err(e) if e.is_remote_missing() => {
                log::info!("[Sync] Remote config not found, creating it ({e})");
                local
            }
            Err(e) => return Err(e),
        };

        // sha 必须来自本次操作里的 GET
        let existing = match remote.get_file().await {
            Ok(file) => file,
            Err(e) if e.is_remote_missing() => None,
            Err(e) => return Err(e),
        };

        let text = codec::config_to_text(&payload)?;
        let timestamp = now_iso();
        remote
            .put_file(&text, &commit_message(&timestamp), existing.as_ref())
            .await?;
        let last_sync_at = self.record_sync()?;

        log::info!(
            "[Sync] Pushed config to {} ({})",
            settings.provider,
            if existing.is_some() { "update" } else { "create" }
        );
        Ok(last_sync_at)
    }

    /// Validate settings and probe the remote. Writes nothing.
    pub async fn test(&self) -> SyncResult<()> {
        let local = self.read_config()?;
        let settings = settings::validate(sync_section(&local))?;
        self.connector.connect(&settings).check_exists().await?;
        log::info!("[Sync] Remote check passed for {}", settings.provider);
        Ok(())
    }

    fn record_sync(&self) -> SyncResult<String> {
        let timestamp = now_iso();
        self.store.set_last_sync_at(&timestamp)?;
        Ok(timestamp)
    }
}

/// GET, decode, parse and overlay the remote config on the defaults.
async fn fetch_remote_config(remote: &dyn RemoteStore) -> SyncResult<Value> {
    let file = remote
        .get_file()
        .await?
        .ok_or(SyncError::RemoteFileMissing)?;
    let remote_config = codec::parse_json(&file.text()?)?;
    if !remote_config.is_object() {
        return Err(SyncError::Decode(
            "remote config is not a JSON object".into(),
        ));
    }
    Ok(config::with_defaults(Some(&remote_config)))
}
