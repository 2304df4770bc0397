//! Provider adapters.
//!
//! One [`RemoteStore`] per provider, chosen once from the normalized
//! [`SyncSettings`] by a [`RemoteConnector`]. Callers never look at provider
//! response shapes; adapters hand back a [`RemoteFile`] whose concurrency
//! token has already been extracted.

mod gitee;
mod gitee_gist;
mod github;

pub use gitee::GiteeContents;
pub use gitee_gist::{GiteeGist, GIST_FILE_NAME};
pub use github::GitHubContents;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use url::Url;

use crate::codec;
use crate::error::{SyncError, SyncResult};
use crate::http_client;
use crate::remote::ProviderKind;
use crate::settings::SyncSettings;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const GITEE_API_BASE: &str = "https://gitee.com/api/v5";

/// How [`RemoteFile::content`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    /// Contents APIs.
    Base64,
    /// Gist file bodies.
    Raw,
}

/// One fetched (or just written) remote file. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: String,
    pub encoding: ContentEncoding,
    /// Concurrency token of this version, when the provider has one.
    pub sha: Option<String>,
}

impl RemoteFile {
    pub fn text(&self) -> SyncResult<String> {
        match self.encoding {
            ContentEncoding::Base64 => codec::decode_text(&self.content),
            ContentEncoding::Raw => Ok(self.content.clone()),
        }
    }
}

/// Capability shared by every provider.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Fetch the config file. `Ok(None)` means it has not been created yet.
    async fn get_file(&self) -> SyncResult<Option<RemoteFile>>;

    /// Write `text` (JSON) to the config file.
    ///
    /// `prior` must come from a [`get_file`](Self::get_file) issued in the
    /// same operation; `None` means "create".
    async fn put_file(
        &self,
        text: &str,
        message: &str,
        prior: Option<&RemoteFile>,
    ) -> SyncResult<RemoteFile>;

    /// Existence probe used by the connection test. A 404 is an error here.
    async fn check_exists(&self) -> SyncResult<()>;
}

/// Builds the adapter for a set of validated settings.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, settings: &SyncSettings) -> Box<dyn RemoteStore>;
}

/// API roots; overridable for mirrors and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub github: String,
    pub gitee: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            github: GITHUB_API_BASE.to_string(),
            gitee: GITEE_API_BASE.to_string(),
        }
    }
}

/// Connector backed by the real REST APIs.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    endpoints: ApiEndpoints,
    /// Falls back to the shared client when unset.
    client: Option<reqwest::Client>,
}

impl HttpConnector {
    pub fn new(endpoints: ApiEndpoints) -> Self {
        Self {
            endpoints,
            client: None,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }
}

impl RemoteConnector for HttpConnector {
    fn connect(&self, settings: &SyncSettings) -> Box<dyn RemoteStore> {
        let client = self.client.clone().unwrap_or_else(http_client::get);
        match settings.provider {
            ProviderKind::GitHub => Box::new(GitHubContents::new(
                client,
                &self.endpoints.github,
                settings,
            )),
            ProviderKind::Gitee => {
                Box::new(GiteeContents::new(client, &self.endpoints.gitee, settings))
            }
            ProviderKind::GiteeGist => {
                Box::new(GiteeGist::new(client, &self.endpoints.gitee, settings))
            }
        }
    }
}

/// `base` + percent-encoded segments. Segments containing `/` are split.
pub(crate) fn api_url(base: &str, segments: &[&str]) -> SyncResult<Url> {
    let mut url = Url::parse(base.trim())
        .map_err(|e| SyncError::Network(format!("invalid API base {base}: {e}")))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| SyncError::Network(format!("API base cannot take a path: {base}")))?;
        path.pop_if_empty();
        for segment in segments {
            for part in segment.split('/').filter(|s| !s.is_empty()) {
                path.push(part);
            }
        }
    }
    Ok(url)
}

/// Map a non-success status to [`SyncError::Provider`].
pub(crate) async fn ensure_success(
    provider: ProviderKind,
    response: Response,
) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    log::debug!(
        "[{provider}] HTTP {} body={}",
        status.as_u16(),
        body.chars().take(200).collect::<String>()
    );
    Err(SyncError::Provider {
        provider,
        status: status.as_u16(),
    })
}

pub(crate) fn is_not_found(response: &Response) -> bool {
    response.status() == StatusCode::NOT_FOUND
}

pub(crate) async fn read_json(response: Response) -> SyncResult<serde_json::Value> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    codec::parse_json(&body)
}
