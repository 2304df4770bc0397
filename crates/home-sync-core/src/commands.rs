//! Message contract with the UI layer: `{type, ...} -> {ok, data?|error?}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::auto_push::AutoPushScheduler;
use crate::error::SyncResult;
use crate::sync::SyncService;

pub const UNKNOWN_MESSAGE_TYPE: &str = "unknown message type";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    GetConfig,
    SetConfig {
        #[serde(default)]
        data: Value,
    },
    PullRemote,
    PushRemote,
    TestRemote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            ok: true,
            data: None,
            error: None,
            last_sync_at: None,
        }
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            ..Self::ok()
        }
    }

    fn synced_at(mut self, last_sync_at: String) -> Self {
        self.last_sync_at = Some(last_sync_at);
        self
    }
}

/// Dispatches UI requests onto the [`SyncService`].
///
/// When a scheduler is attached, every successful `setConfig` notifies it.
pub struct CommandHandler {
    service: Arc<SyncService>,
    auto_push: Option<AutoPushScheduler>,
}

impl CommandHandler {
    pub fn new(service: Arc<SyncService>) -> Self {
        Self {
            service,
            auto_push: None,
        }
    }

    pub fn with_auto_push(mut self, scheduler: AutoPushScheduler) -> Self {
        self.auto_push = Some(scheduler);
        self
    }

    pub fn service(&self) -> &Arc<SyncService> {
        &self.service
    }

    /// Raw JSON entry point. Never fails; errors travel in the response.
    pub async fn handle_message(&self, message: &Value) -> Response {
        match Request::deserialize(message) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                log::debug!("[Commands] Rejected message: {e}");
                Response::error(UNKNOWN_MESSAGE_TYPE)
            }
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => Response::error(e.to_string()),
        }
    }

    async fn dispatch(&self, request: Request) -> SyncResult<Response> {
        Ok(match request {
            Request::GetConfig => Response::with_data(self.service.read_config()?),
            Request::SetConfig { data } => {
                let next = self.service.set_config(&data)?;
                if let Some(scheduler) = &self.auto_push {
                    scheduler.notify_changed();
                }
                Response::with_data(next)
            }
            Request::PullRemote => {
                let outcome = self.service.pull().await?;
                Response::with_data(outcome.config).synced_at(outcome.last_sync_at)
            }
            Request::PushRemote => Response::ok().synced_at(self.service.push().await?),
            Request::TestRemote => {
                self.service.test().await?;
                Response::ok()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{RemoteConnector, RemoteStore};
    use crate::settings::SyncSettings;
    use crate::store::MemoryConfigStore;
    use serde_json::json;

    /// Any remote access here means validation let a bad config through.
    struct UnreachableConnector;

    impl RemoteConnector for UnreachableConnector {
        fn connect(&self, settings: &SyncSettings) -> Box<dyn RemoteStore> {
            panic!("remote reached with unvalidated settings: {settings:?}")
        }
    }

    fn handler() -> CommandHandler {
        let service = SyncService::new(
            Arc::new(MemoryConfigStore::new()),
            Arc::new(UnreachableConnector),
        );
        CommandHandler::new(Arc::new(service))
    }

    #[tokio::test]
    async fn get_config_returns_defaults() {
        let response = handler().handle_message(&json!({ "type": "getConfig" })).await;
        assert!(response.ok);
        let data = response.data.unwrap();
        assert_eq!(data["sync"]["branch"], "main");
        assert!(data["engines"].is_array());
    }

    #[tokio::test]
    async fn set_config_merges_and_echoes() {
        let handler = handler();
        let response = handler
            .handle_message(&json!({
                "type": "setConfig",
                "data": { "rememberSelections": false, "sync": { "token": "t" } }
            }))
            .await;
        assert!(response.ok);
        let data = response.data.unwrap();
        assert_eq!(data["rememberSelections"], false);
        assert_eq!(data["sync"]["token"], "t");
        assert_eq!(data["sync"]["branch"], "main");

        let again = handler.handle_message(&json!({ "type": "getConfig" })).await;
        assert_eq!(again.data.unwrap(), data);
    }

    #[tokio::test]
    async fn unknown_type_is_rejected() {
        let handler = handler();
        for message in [json!({ "type": "openTabs" }), json!({}), json!("pushRemote")] {
            let response = handler.handle_message(&message).await;
            assert_eq!(response, Response::error(UNKNOWN_MESSAGE_TYPE));
        }
    }

    #[tokio::test]
    async fn remote_commands_fail_validation_before_any_io() {
        let handler = handler();
        for kind in ["pullRemote", "pushRemote", "testRemote"] {
            let response = handler.handle_message(&json!({ "type": kind })).await;
            assert!(!response.ok, "{kind}");
            assert_eq!(
                response.error.as_deref(),
                Some("sync settings missing: gitUrl"),
                "{kind}"
            );
        }
    }

    #[tokio::test]
    async fn missing_token_is_named() {
        let handler = handler();
        handler
            .handle_message(&json!({
                "type": "setConfig",
                "data": { "sync": { "gitUrl": "https://github.com/octo/home" } }
            }))
            .await;
        let response = handler.handle_message(&json!({ "type": "pushRemote" })).await;
        assert_eq!(response.error.as_deref(), Some("sync settings missing: token"));
    }

    #[test]
    fn response_serializes_camel_case_without_empty_fields() {
        let value = serde_json::to_value(Response::ok().synced_at("2026-10-16T08:00:00.000Z".into()))
            .unwrap();
        assert_eq!(
            value,
            json!({ "ok": true, "lastSyncAt": "2026-10-16T08:00:00.000Z" })
        );
    }
}
