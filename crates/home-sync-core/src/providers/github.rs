use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::{
    api_url, ensure_success, is_not_found, read_json, ContentEncoding, RemoteFile, RemoteStore,
};
use crate::codec;
use crate::error::{SyncError, SyncResult};
use crate::remote::ProviderKind;
use crate::settings::SyncSettings;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// GitHub contents API (`/repos/{owner}/{repo}/contents/{path}`).
pub struct GitHubContents {
    client: Client,
    base: String,
    owner: String,
    repo: String,
    branch: String,
    path: String,
    token: String,
}

impl GitHubContents {
    pub fn new(client: Client, base: &str, settings: &SyncSettings) -> Self {
        Self {
            client,
            base: base.to_string(),
            owner: settings.owner.clone(),
            repo: settings.repo.clone(),
            branch: settings.branch.clone(),
            path: settings.path.clone(),
            token: settings.token.clone(),
        }
    }

    fn contents_url(&self) -> SyncResult<Url> {
        api_url(
            &self.base,
            &["repos", &self.owner, &self.repo, "contents", &self.path],
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        if self.token.is_empty() {
            return request;
        }
        request.header(AUTHORIZATION, format!("token {}", self.token))
    }

    async fn probe(&self, url: Url, what: String) -> SyncResult<()> {
        let response = self.authorized(self.client.get(url)).send().await?;
        if is_not_found(&response) {
            return Err(SyncError::ProbeNotFound(what));
        }
        ensure_success(ProviderKind::GitHub, response).await?;
        Ok(())
    }
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl RemoteStore for GitHubContents {
    fn provider(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    async fn get_file(&self) -> SyncResult<Option<RemoteFile>> {
        let mut url = self.contents_url()?;
        url.query_pairs_mut().append_pair("ref", &self.branch);
        log::debug!("[GitHub] GET {url}");

        let response = self.authorized(self.client.get(url)).send().await?;
        if is_not_found(&response) {
            return Ok(None);
        }
        let body = read_json(ensure_success(ProviderKind::GitHub, response).await?).await?;
        if !body.is_object() {
            return Err(SyncError::Decode(format!(
                "{} is not a file on GitHub",
                self.path
            )));
        }

        Ok(Some(RemoteFile {
            content: string_at(&body, "/content").unwrap_or_default(),
            encoding: ContentEncoding::Base64,
            sha: string_at(&body, "/sha"),
        }))
    }

    async fn put_file(
        &self,
        text: &str,
        message: &str,
        prior: Option<&RemoteFile>,
    ) -> SyncResult<RemoteFile> {
        let url = self.contents_url()?;
        let content = codec::normalize_base64(&codec::encode_text(text));
        let request = PutContentsRequest {
            message,
            content: content.clone(),
            branch: &self.branch,
            sha: prior.and_then(|f| f.sha.as_deref()),
        };
        log::debug!(
            "[GitHub] PUT {url} ({})",
            if request.sha.is_some() { "update" } else { "create" }
        );

        let response = self
            .authorized(self.client.put(url))
            .json(&request)
            .send()
            .await?;
        let body = read_json(ensure_success(ProviderKind::GitHub, response).await?).await?;

        Ok(RemoteFile {
            content,
            encoding: ContentEncoding::Base64,
            sha: string_at(&body, "/content/sha"),
        })
    }

    async fn check_exists(&self) -> SyncResult<()> {
        let repo_url = api_url(&self.base, &["repos", &self.owner, &self.repo])?;
        self.probe(repo_url, format!("repository {}/{}", self.owner, self.repo))
            .await?;

        let branch_url = api_url(
            &self.base,
            &["repos", &self.owner, &self.repo, "branches", &self.branch],
        )?;
        self.probe(branch_url, format!("branch {}", self.branch))
            .await
    }
}
