#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use home_sync_core::codec;
use home_sync_core::{
    ApiEndpoints, ConfigStore, ContentEncoding, HttpConnector, MemoryConfigStore, ProviderKind,
    RemoteConnector, RemoteFile, RemoteStore, SyncError, SyncResult, SyncService, SyncSettings,
};

// ---------------------------------------------------------------------------
// In-memory remote
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PutRecord {
    pub text: String,
    pub message: String,
    pub prior_sha: Option<String>,
}

#[derive(Debug, Default)]
pub struct RemoteState {
    pub text: Option<String>,
    pub revision: u64,
    pub gets: usize,
    pub puts: Vec<PutRecord>,
    pub connects: Vec<SyncSettings>,
    pub fail_get: Option<u16>,
    pub fail_put: Option<u16>,
}

impl RemoteState {
    fn sha(&self) -> String {
        format!("sha-{}", self.revision)
    }
}

/// Contents-API-like remote: every write bumps the sha and a write must name
/// the current sha unless the file does not exist yet.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    pub state: Arc<Mutex<RemoteState>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &Value) -> Self {
        let remote = Self::new();
        {
            let mut state = remote.lock();
            state.text = Some(serde_json::to_string_pretty(config).expect("serialize"));
            state.revision = 1;
        }
        remote
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, RemoteState> {
        self.state.lock().expect("remote state")
    }

    pub fn stored_config(&self) -> Option<Value> {
        self.lock()
            .text
            .as_deref()
            .map(|t| serde_json::from_str(t).expect("stored text is JSON"))
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn provider(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    async fn get_file(&self) -> SyncResult<Option<RemoteFile>> {
        let mut state = self.lock();
        state.gets += 1;
        if let Some(status) = state.fail_get {
            return Err(SyncError::Provider {
                provider: ProviderKind::GitHub,
                status,
            });
        }
        Ok(state.text.as_deref().map(|text| RemoteFile {
            // wrapped like GitHub does
            content: wrap_base64(&codec::encode_text(text)),
            encoding: ContentEncoding::Base64,
            sha: Some(state.sha()),
        }))
    }

    async fn put_file(
        &self,
        text: &str,
        message: &str,
        prior: Option<&RemoteFile>,
    ) -> SyncResult<RemoteFile> {
        let mut state = self.lock();
        let prior_sha = prior.and_then(|f| f.sha.clone());
        state.puts.push(PutRecord {
            text: text.to_string(),
            message: message.to_string(),
            prior_sha: prior_sha.clone(),
        });
        if let Some(status) = state.fail_put {
            return Err(SyncError::Provider {
                provider: ProviderKind::GitHub,
                status,
            });
        }
        let expected = state.text.is_some().then(|| state.sha());
        if prior_sha != expected {
            return Err(SyncError::Provider {
                provider: ProviderKind::GitHub,
                status: 409,
            });
        }
        state.text = Some(text.to_string());
        state.revision += 1;
        Ok(RemoteFile {
            content: codec::encode_text(text),
            encoding: ContentEncoding::Base64,
            sha: Some(state.sha()),
        })
    }

    async fn check_exists(&self) -> SyncResult<()> {
        Ok(())
    }
}

impl RemoteConnector for MemoryRemote {
    fn connect(&self, settings: &SyncSettings) -> Box<dyn RemoteStore> {
        self.lock().connects.push(settings.clone());
        Box::new(self.clone())
    }
}

fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn github_sync() -> Value {
    json!({
        "sync": {
            "gitUrl": "https://github.com/octo/home.git",
            "token": "ghp_test",
            "branch": "main",
            "path": "chrome-home-plugin/config.json"
        }
    })
}

pub fn service_with(store: Arc<dyn ConfigStore>, connector: Arc<dyn RemoteConnector>) -> SyncService {
    SyncService::new(store, connector)
}

/// Service over a fresh in-memory store seeded through `setConfig`.
pub fn seeded_service(patch: &Value, connector: Arc<dyn RemoteConnector>) -> SyncService {
    let service = service_with(Arc::new(MemoryConfigStore::new()), connector);
    service.set_config(patch).expect("seed config");
    service
}

// ---------------------------------------------------------------------------
// HTTP stub server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn query_pair(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn form_field(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

type Responder = dyn Fn(&Recorded) -> (u16, Value) + Send + Sync;

struct Stub {
    requests: Mutex<Vec<Recorded>>,
    respond: Box<Responder>,
}

pub struct StubServer {
    pub base: String,
    stub: Arc<Stub>,
}

impl StubServer {
    pub fn requests(&self) -> Vec<Recorded> {
        self.stub.requests.lock().expect("requests").clone()
    }

    /// Connector pointing both providers at this server.
    pub fn connector(&self) -> Arc<dyn RemoteConnector> {
        let endpoints = ApiEndpoints {
            github: self.base.clone(),
            gitee: format!("{}/api/v5", self.base),
        };
        Arc::new(HttpConnector::new(endpoints).with_client(reqwest::Client::new()))
    }
}

async fn record(
    State(stub): State<Arc<Stub>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let request = Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        authorization: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    let (status, reply) = (stub.respond)(&request);
    stub.requests.lock().expect("requests").push(request);
    let body = if reply.is_null() { String::new() } else { reply.to_string() };
    (
        StatusCode::from_u16(status).expect("status"),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
}

/// Serve `respond` on an ephemeral local port.
pub async fn stub_server(
    respond: impl Fn(&Recorded) -> (u16, Value) + Send + Sync + 'static,
) -> StubServer {
    let stub = Arc::new(Stub {
        requests: Mutex::new(Vec::new()),
        respond: Box::new(respond),
    });
    let app = Router::new().fallback(record).with_state(stub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    StubServer {
        base: format!("http://{addr}"),
        stub,
    }
}

pub fn b64(text: &str) -> String {
    codec::encode_text(text)
}
