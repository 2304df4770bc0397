//! 启动时同步：满足自动同步条件时先拉取再推送
//!
//! Runs through the same message contract as the UI so a startup sync
//! behaves exactly like a user clicking pull and then push.

use serde_json::json;

use crate::commands::CommandHandler;
use crate::settings::SyncSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStage {
    Pull,
    Push,
}

impl StartupStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartupStage::Pull => "pull",
            StartupStage::Push => "push",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Auto push is off or the remote is not configured.
    Skipped,
    Failed { stage: StartupStage, error: String },
    Completed { last_sync_at: Option<String> },
}

pub fn is_auto_sync_ready(sync: &SyncSettings) -> bool {
    sync.can_auto_push()
}

pub async fn run_startup_sync(handler: &CommandHandler) -> StartupOutcome {
    let sync = match handler.service().sync_settings() {
        Ok(sync) => sync,
        Err(e) => {
            log::warn!("[Startup] Cannot read sync settings: {e}");
            return StartupOutcome::Skipped;
        }
    };
    if !is_auto_sync_ready(&sync) {
        log::debug!("[Startup] Auto sync not configured, skipping");
        return StartupOutcome::Skipped;
    }

    log::info!("[Startup] Syncing with {}", sync.provider);
    let pulled = handler
        .handle_message(&json!({ "type": "pullRemote" }))
        .await;
    if !pulled.ok {
        let error = pulled.error.unwrap_or_else(|| "startup pull failed".into());
        log::warn!("[Startup] Pull failed: {error}");
        return StartupOutcome::Failed {
            stage: StartupStage::Pull,
            error,
        };
    }

    let pushed = handler
        .handle_message(&json!({ "type": "pushRemote" }))
        .await;
    if !pushed.ok {
        let error = pushed.error.unwrap_or_else(|| "startup push failed".into());
        log::warn!("[Startup] Push failed: {error}");
        return StartupOutcome::Failed {
            stage: StartupStage::Push,
            error,
        };
    }

    StartupOutcome::Completed {
        last_sync_at: pushed.last_sync_at.or(pulled.last_sync_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(auto_push: bool, git_url: &str, token: &str) -> SyncSettings {
        SyncSettings {
            git_url: git_url.into(),
            token: token.into(),
            auto_push,
            ..Default::default()
        }
    }

    #[test]
    fn ready_requires_flag_url_and_token() {
        assert!(is_auto_sync_ready(&settings(true, "https://github.com/o/r", "t")));
        assert!(!is_auto_sync_ready(&settings(false, "https://github.com/o/r", "t")));
        assert!(!is_auto_sync_ready(&settings(true, "", "t")));
        assert!(!is_auto_sync_ready(&settings(true, "https://github.com/o/r", "")));
    }
}
