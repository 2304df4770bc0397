use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MissingField, SyncError, SyncResult};
use crate::remote::{parse_remote, ProviderKind, RemoteLocation};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_SYNC_PATH: &str = "chrome-home-plugin/config.json";

/// 同步设置（保存在应用配置的 `sync` 字段中）
///
/// `gitUrl` 是 provider 身份的唯一来源；`provider` / `owner` / `repo` / `gistId`
/// 都是从它派生出来的。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    pub git_url: String,
    pub token: String,
    pub auto_push: bool,
    pub provider: ProviderKind,
    pub owner: String,
    pub repo: String,
    pub gist_id: String,
    pub branch: String,
    pub path: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            git_url: String::new(),
            token: String::new(),
            auto_push: false,
            provider: ProviderKind::GitHub,
            owner: String::new(),
            repo: String::new(),
            gist_id: String::new(),
            branch: DEFAULT_BRANCH.to_string(),
            path: DEFAULT_SYNC_PATH.to_string(),
        }
    }
}

impl SyncSettings {
    /// Auto push needs an enabled flag plus a remote and a credential.
    pub fn can_auto_push(&self) -> bool {
        self.auto_push && !self.git_url.is_empty() && !self.token.is_empty()
    }

    /// Token with everything but the last four characters hidden.
    pub fn masked_token(&self) -> String {
        let count = self.token.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.token.chars().skip(count - 4).collect();
        format!("{}{tail}", "*".repeat(count - 4))
    }
}

fn raw_str(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn non_empty_or(value: String, fallback: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        fallback()
    } else {
        value
    }
}

/// Normalize a raw (partial or legacy) `sync` object. Never fails.
///
/// `provider` follows `gitUrl` whenever the URL parses. Identity fields keep
/// explicit raw values and fall back to the ones derived from `gitUrl`.
pub fn normalize(raw: &Value) -> SyncSettings {
    let git_url = raw_str(raw, "gitUrl");
    let parsed = parse_remote(&git_url).ok();

    let provider = parsed
        .as_ref()
        .map(RemoteLocation::provider)
        .or_else(|| ProviderKind::from_tag(&raw_str(raw, "provider")))
        .unwrap_or_default();

    let (owner, repo, gist_id) = if provider.is_repository() {
        let (derived_owner, derived_repo) = match &parsed {
            Some(RemoteLocation::Repository { owner, repo, .. }) => (owner.clone(), repo.clone()),
            _ => (String::new(), String::new()),
        };
        (
            non_empty_or(raw_str(raw, "owner"), || derived_owner),
            non_empty_or(raw_str(raw, "repo"), || derived_repo),
            String::new(),
        )
    } else {
        let derived_gist = match &parsed {
            Some(RemoteLocation::GiteeGist { gist_id }) => gist_id.clone(),
            _ => String::new(),
        };
        (
            String::new(),
            String::new(),
            non_empty_or(raw_str(raw, "gistId"), || derived_gist),
        )
    };

    SyncSettings {
        git_url,
        token: raw_str(raw, "token"),
        auto_push: raw.get("autoPush").and_then(Value::as_bool).unwrap_or(false),
        provider,
        owner,
        repo,
        gist_id,
        branch: non_empty_or(raw_str(raw, "branch"), || DEFAULT_BRANCH.to_string()),
        path: non_empty_or(raw_str(raw, "path"), || DEFAULT_SYNC_PATH.to_string()),
    }
}

/// Normalize and check that the settings are usable for a network call.
///
/// The returned copy is fully normalized; `raw` is never touched.
pub fn validate(raw: &Value) -> SyncResult<SyncSettings> {
    let settings = normalize(raw);

    if settings.git_url.is_empty() {
        return Err(SyncError::MissingField(MissingField::GitUrl));
    }
    parse_remote(&settings.git_url)?;

    if settings.provider.is_repository() {
        let required = [
            (MissingField::Owner, &settings.owner),
            (MissingField::Repo, &settings.repo),
            (MissingField::Branch, &settings.branch),
            (MissingField::Path, &settings.path),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(SyncError::MissingField(*field));
        }
    } else if settings.gist_id.is_empty() {
        return Err(SyncError::MissingField(MissingField::GistId));
    }

    if settings.token.is_empty() {
        return Err(SyncError::MissingField(MissingField::Token));
    }
    Ok(settings)
}
