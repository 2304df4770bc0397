use std::fmt;

use crate::remote::{ProviderKind, RemoteParseError};

/// Sync settings field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    GitUrl,
    GistId,
    Owner,
    Repo,
    Branch,
    Path,
    Token,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitUrl => "gitUrl",
            Self::GistId => "gistId",
            Self::Owner => "owner",
            Self::Repo => "repo",
            Self::Branch => "branch",
            Self::Path => "path",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    // Validation
    #[error("sync settings missing: {0}")]
    MissingField(MissingField),

    #[error(transparent)]
    InvalidRemote(#[from] RemoteParseError),

    // Not-found sentinels
    #[error("remote file does not exist, push once first")]
    RemoteFileMissing,

    #[error("gist {gist_id} does not contain {file_name}, push once first")]
    GistFileMissing { gist_id: String, file_name: String },

    #[error("{0} not found")]
    ProbeNotFound(String),

    // Provider
    #[error("{provider} request failed: HTTP {status}")]
    Provider { provider: ProviderKind, status: u16 },

    #[error("{provider}: cannot determine sha for update, check token permissions")]
    MissingSha { provider: ProviderKind },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("network error: {0}")]
    Network(String),

    // Local persistence
    #[error("IO error: {0}")]
    Io(String),

    #[error("config store error: {0}")]
    Store(String),
}

impl SyncError {
    /// The remote has not been written yet. Push treats this as "nothing to merge".
    pub fn is_remote_missing(&self) -> bool {
        matches!(self, Self::RemoteFileMissing | Self::GistFileMissing { .. })
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        // 不带 URL，避免 access_token 出现在错误信息里
        SyncError::Network(err.without_url().to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
