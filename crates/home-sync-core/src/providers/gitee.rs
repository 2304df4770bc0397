use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::{
    api_url, ensure_success, is_not_found, read_json, ContentEncoding, RemoteFile, RemoteStore,
};
use crate::codec;
use crate::error::{SyncError, SyncResult};
use crate::http_client::mask_url;
use crate::remote::ProviderKind;
use crate::settings::SyncSettings;

/// Gitee v5 contents API. The token travels as `access_token`
/// (query string on reads, form field on writes).
pub struct GiteeContents {
    client: Client,
    base: String,
    owner: String,
    repo: String,
    branch: String,
    path: String,
    token: String,
}

/// Where Gitee puts the file sha depends on the endpoint and version:
/// top-level `sha`, then `commit.sha`, then `content.sha`.
pub(crate) fn extract_concurrency_token(body: &Value) -> Option<String> {
    ["/sha", "/commit/sha", "/content/sha"]
        .iter()
        .find_map(|pointer| {
            body.pointer(pointer)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .map(str::to_string)
}

impl GiteeContents {
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

    fn with_token(&self, mut url: Url) -> Url {
        url.query_pairs_mut()
            .append_pair("access_token", &self.token);
        url
    }

    async fn probe(&self, url: Url, what: String) -> SyncResult<()> {
        let url = self.with_token(url);
        log::debug!("[Gitee] probe {}", mask_url(&url));
        let response = self.client.get(url).send().await?;
        if is_not_found(&response) {
            return Err(SyncError::ProbeNotFound(what));
        }
        ensure_success(ProviderKind::Gitee, response).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for GiteeContents {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Gitee
    }

    async fn get_file(&self) -> SyncResult<Option<RemoteFile>> {
        let mut url = self.contents_url()?;
        url.query_pairs_mut().append_pair("ref", &self.branch);
        let url = self.with_token(url);
        log::debug!("[Gitee] GET {}", mask_url(&url));

        let response = self.client.get(url).send().await?;
        if is_not_found(&response) {
            return Ok(None);
        }
        let body = read_json(ensure_success(ProviderKind::Gitee, response).await?).await?;

        // 文件不存在时 Gitee 可能返回 200 + 空数组
        match &body {
            Value::Null => return Ok(None),
            Value::Array(items) if items.is_empty() => return Ok(None),
            Value::Object(_) => {}
            _ => {
                return Err(SyncError::Decode(format!(
                    "{} is not a file on Gitee",
                    self.path
                )))
            }
        }

        Ok(Some(RemoteFile {
            content: body
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            encoding: ContentEncoding::Base64,
            sha: extract_concurrency_token(&body),
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

        let mut form = vec![
            ("access_token", self.token.clone()),
            ("message", message.to_string()),
            ("content", content.clone()),
            ("branch", self.branch.clone()),
        ];

        // 已存在的文件必须带 sha 更新，否则可能覆盖别人的提交
        let request = match prior {
            Some(existing) => {
                let sha = existing.sha.clone().ok_or(SyncError::MissingSha {
                    provider: ProviderKind::Gitee,
                })?;
                form.push(("sha", sha));
                log::debug!("[Gitee] PUT {url} (update)");
                self.client.put(url)
            }
            None => {
                // v5 的 PUT 要求 sha，新建文件只能用 POST
                log::debug!("[Gitee] POST {url} (create)");
                self.client.post(url)
            }
        };

        let response = request.form(&form).send().await?;
        let body = read_json(ensure_success(ProviderKind::Gitee, response).await?).await?;

        Ok(RemoteFile {
            content,
            encoding: ContentEncoding::Base64,
            sha: extract_concurrency_token(&body),
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
