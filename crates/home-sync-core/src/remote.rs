//! Git remote locator
//!
//! 把用户输入的远端地址（SSH / HTTPS / Gitee 代码片段）解析成结构化的 provider 描述。
//! 纯函数，不做任何 I/O。

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

/// `https://gitee.com/<user>/codes/<id>`
static GITEE_CODES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://gitee\.com/[^/]+/codes/([^/?#]+)(?:[/?#]|$)")
        .expect("valid gitee codes regex")
});

/// `user@host:owner/repo.git`
static SCP_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^@\s/]+)@([^:/\s]+):/?(.+)$").expect("valid scp regex"));

/// 远端存储类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "gitee")]
    Gitee,
    #[serde(rename = "gitee_gist")]
    GiteeGist,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Gitee => "gitee",
            Self::GiteeGist => "gitee_gist",
        }
    }

    /// Lenient parse of a stored provider tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "github" => Some(Self::GitHub),
            "gitee" => Some(Self::Gitee),
            "gitee_gist" => Some(Self::GiteeGist),
            _ => None,
        }
    }

    /// Contents-API providers address a file inside a repository branch.
    pub fn is_repository(&self) -> bool {
        matches!(self, Self::GitHub | Self::Gitee)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed identity of a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLocation {
    Repository {
        provider: ProviderKind,
        owner: String,
        repo: String,
    },
    GiteeGist {
        gist_id: String,
    },
}

impl RemoteLocation {
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::Repository { provider, .. } => *provider,
            Self::GiteeGist { .. } => ProviderKind::GiteeGist,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteParseError {
    #[error("git remote is empty")]
    Empty,

    #[error("git remote is not a valid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported host: {0} (only github.com and gitee.com are supported)")]
    UnsupportedHost(String),

    #[error("git remote is missing owner/repo")]
    MissingOwnerRepo,
}

/// Parse a user-supplied git remote.
///
/// Accepted shapes:
/// - `https://gitee.com/<user>/codes/<id>` → Gitee Gist
/// - `git@github.com:owner/repo.git` (SCP style)
/// - `https://github.com/owner/repo(.git)` / `ssh://git@gitee.com/owner/repo.git`
pub fn parse_remote(raw: &str) -> Result<RemoteLocation, RemoteParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RemoteParseError::Empty);
    }

    if let Some(caps) = GITEE_CODES_RE.captures(raw) {
        return Ok(RemoteLocation::GiteeGist {
            gist_id: caps[1].to_string(),
        });
    }

    let url_text = match SCP_LIKE_RE.captures(raw) {
        // `scheme://` 形式不走 SCP 分支
        Some(caps) if !raw.contains("://") => {
            format!("ssh://{}@{}/{}", &caps[1], &caps[2], &caps[3])
        }
        _ => raw.to_string(),
    };

    let url = Url::parse(&url_text).map_err(|e| RemoteParseError::InvalidUrl(e.to_string()))?;
    let host = url
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| RemoteParseError::InvalidUrl(format!("no host in {raw}")))?;

    let provider = if host.contains("gitee.com") {
        ProviderKind::Gitee
    } else if host.contains("github.com") {
        ProviderKind::GitHub
    } else {
        return Err(RemoteParseError::UnsupportedHost(host));
    };

    let path = url.path().trim_start_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) => Ok(RemoteLocation::Repository {
            provider,
            owner: owner.to_string(),
            repo: repo.strip_suffix(".git").unwrap_or(repo).to_string(),
        }),
        _ => Err(RemoteParseError::MissingOwnerRepo),
    }
}
