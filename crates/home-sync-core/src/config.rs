//! Application config blob: defaults, deep merge and patch application.
//!
//! Everything outside `sync` belongs to the new tab page UI and is carried
//! through untouched.

use serde_json::{json, Map, Value};

use crate::settings::{self, DEFAULT_BRANCH, DEFAULT_SYNC_PATH};

/// Key of the synced blob holding the whole config.
pub const STORAGE_KEY: &str = "chromeHomeConfig";

/// Key of the local-only last sync timestamp.
pub const LAST_SYNC_AT_KEY: &str = "chromeHomeLastSyncAt";

/// Section of the config holding [`settings::SyncSettings`].
pub const SYNC_KEY: &str = "sync";

/// Identity fields derived from `gitUrl`.
const DERIVED_SYNC_FIELDS: [&str; 4] = ["provider", "owner", "repo", "gistId"];

pub fn default_config() -> Value {
    json!({
        "engines": [
            { "name": "GOOGLE", "baseUrl": "https://www.google.com/search?q=" },
            { "name": "BING", "baseUrl": "https://www.bing.com/search?q=" },
            { "name": "DuckDuckGo", "baseUrl": "https://duckduckgo.com/?q=" },
            { "name": "GitHub Search", "baseUrl": "https://github.com/search?q=" },
            { "name": "BAIDU", "baseUrl": "https://www.baidu.com/s?wd=" }
        ],
        "selectedEngines": ["GOOGLE", "BING", "BAIDU"],
        "rememberSelections": false,
        "popupTipDismissed": false,
        "searchHistory": [],
        "cards": [],
        "sync": {
            "gitUrl": "",
            "token": "",
            "autoPush": false,
            "provider": "github",
            "owner": "",
            "repo": "",
            "gistId": "",
            "branch": DEFAULT_BRANCH,
            "path": DEFAULT_SYNC_PATH
        }
    })
}

/// Recursively merge `patch` onto `base`.
///
/// Objects merge key by key only when both sides are objects; arrays and
/// scalars in `patch` replace the base value. A non-object patch leaves
/// `base` unchanged.
pub fn deep_merge(base: &Value, patch: &Value) -> Value {
    let Value::Object(patch_map) = patch else {
        return base.clone();
    };
    let mut out = match base {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    for (key, value) in patch_map {
        let merged = match (out.get(key), value) {
            (Some(existing @ Value::Object(_)), Value::Object(_)) => deep_merge(existing, value),
            _ => value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    Value::Object(out)
}

/// Stored blob overlaid on the defaults, as the UI sees it.
pub fn with_defaults(stored: Option<&Value>) -> Value {
    match stored {
        Some(stored) => deep_merge(&default_config(), stored),
        None => default_config(),
    }
}

/// Apply a `setConfig` patch to the current config.
///
/// When the patch points `sync.gitUrl` somewhere new without also naming the
/// identity fields, the old derived identity is dropped so it gets
/// re-derived from the new URL. The sync section is stored normalized.
pub fn apply_patch(current: &Value, patch: &Value) -> Value {
    let mut base = current.clone();

    let patch_sync = patch.get(SYNC_KEY).and_then(Value::as_object);
    let current_git_url = current
        .get(SYNC_KEY)
        .and_then(|s| s.get("gitUrl"))
        .and_then(Value::as_str)
        .unwrap_or("");
    if let (Some(patch_sync), Some(Value::Object(base_sync))) =
        (patch_sync, base.get_mut(SYNC_KEY))
    {
        let url_changed = patch_sync
            .get("gitUrl")
            .and_then(Value::as_str)
            .is_some_and(|url| url.trim() != current_git_url.trim());
        if url_changed {
            for field in DERIVED_SYNC_FIELDS {
                if !patch_sync.contains_key(field) {
                    base_sync.remove(field);
                }
            }
        }
    }

    let mut merged = deep_merge(&base, patch);
    normalize_sync_section(&mut merged);
    merged
}

/// Rewrite `config.sync` in normalized form. Leaves non-object configs alone.
pub fn normalize_sync_section(config: &mut Value) {
    let Value::Object(map) = config else {
        return;
    };
    let raw = map.get(SYNC_KEY).cloned().unwrap_or(Value::Null);
    let normalized = settings::normalize(&raw);
    match serde_json::to_value(&normalized) {
        Ok(value) => {
            map.insert(SYNC_KEY.to_string(), value);
        }
        Err(e) => log::warn!("[Store] Failed to serialize sync settings: {e}"),
    }
}
