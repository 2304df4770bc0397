//! Remote configuration sync for the chrome-home new tab page.
//!
//! The whole page config lives in a [`ConfigStore`]; its `sync` section names
//! a remote (GitHub / Gitee repository file or a Gitee code snippet) that
//! [`SyncService`] pulls from and pushes to. UI surfaces talk to it through
//! [`CommandHandler`] and get debounced pushes from [`AutoPushScheduler`].

pub mod auto_push;
pub mod codec;
pub mod commands;
pub mod config;
mod error;
pub mod http_client;
pub mod import_export;
pub mod providers;
pub mod remote;
pub mod settings;
pub mod startup;
pub mod store;
pub mod sync;

pub use auto_push::{AutoPushScheduler, AutoPushStatus, PushTarget, AUTO_PUSH_DEBOUNCE};
pub use commands::{CommandHandler, Request, Response, UNKNOWN_MESSAGE_TYPE};
pub use error::{MissingField, SyncError, SyncResult};
pub use providers::{
    ApiEndpoints, ContentEncoding, HttpConnector, RemoteConnector, RemoteFile, RemoteStore,
};
pub use remote::{parse_remote, ProviderKind, RemoteLocation, RemoteParseError};
pub use settings::SyncSettings;
pub use startup::{is_auto_sync_ready, run_startup_sync, StartupOutcome, StartupStage};
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore, CONFIG_DIR_ENV};
pub use sync::{PullOutcome, SyncService};
