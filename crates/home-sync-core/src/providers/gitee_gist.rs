use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use super::{
    api_url, ensure_success, is_not_found, read_json, ContentEncoding, RemoteFile, RemoteStore,
};
use crate::error::{SyncError, SyncResult};
use crate::http_client::mask_url;
use crate::remote::ProviderKind;
use crate::settings::SyncSettings;

/// File inside the gist that holds the config.
pub const GIST_FILE_NAME: &str = "config.json";

/// Gitee 代码片段（`/gists/{id}`）
///
/// 没有 sha 之类的并发控制，写入是 last-write-wins。
pub struct GiteeGist {
    client: Client,
    base: String,
    gist_id: String,
    token: String,
}

impl GiteeGist {
    pub fn new(client: Client, base: &str, settings: &SyncSettings) -> Self {
        Self {
            client,
            base: base.to_string(),
            gist_id: settings.gist_id.clone(),
            token: settings.token.clone(),
        }
    }

    fn gist_url(&self) -> SyncResult<Url> {
        let mut url = api_url(&self.base, &["gists", &self.gist_id])?;
        url.query_pairs_mut()
            .append_pair("access_token", &self.token);
        Ok(url)
    }

    /// `Ok(None)` on 404 or an empty body.
    async fn fetch_gist(&self) -> SyncResult<Option<Value>> {
        let url = self.gist_url()?;
        log::debug!("[GiteeGist] GET {}", mask_url(&url));
        let response = self.client.get(url).send().await?;
        if is_not_found(&response) {
            return Ok(None);
        }
        let body = read_json(ensure_success(ProviderKind::GiteeGist, response).await?).await?;
        Ok((!body.is_null()).then_some(body))
    }
}

#[async_trait]
impl RemoteStore for GiteeGist {
    fn provider(&self) -> ProviderKind {
        ProviderKind::GiteeGist
    }

    async fn get_file(&self) -> SyncResult<Option<RemoteFile>> {
        let Some(gist) = self.fetch_gist().await? else {
            return Ok(None);
        };
        let content = gist
            .get("files")
            .and_then(|files| files.get(GIST_FILE_NAME))
            .and_then(|file| file.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::GistFileMissing {
                gist_id: self.gist_id.clone(),
                file_name: GIST_FILE_NAME.to_string(),
            })?;

        Ok(Some(RemoteFile {
            content: content.to_string(),
            encoding: ContentEncoding::Raw,
            sha: None,
        }))
    }

    async fn put_file(
        &self,
        text: &str,
        _message: &str,
        _prior: Option<&RemoteFile>,
    ) -> SyncResult<RemoteFile> {
        let url = self.gist_url()?;
        log::debug!("[GiteeGist] PATCH {}", mask_url(&url));
        let body = json!({
            "files": {
                GIST_FILE_NAME: { "content": text }
            }
        });
        let response = self.client.patch(url).json(&body).send().await?;
        ensure_success(ProviderKind::GiteeGist, response).await?;

        Ok(RemoteFile {
            content: text.to_string(),
            encoding: ContentEncoding::Raw,
            sha: None,
        })
    }

    async fn check_exists(&self) -> SyncResult<()> {
        match self.fetch_gist().await? {
            Some(_) => Ok(()),
            None => Err(SyncError::ProbeNotFound(format!("gist {}", self.gist_id))),
        }
    }
}
