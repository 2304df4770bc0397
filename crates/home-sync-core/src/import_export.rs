//! Local backup of the whole config as a JSON document.

use serde_json::Value;

use crate::codec;
use crate::error::{SyncError, SyncResult};
use crate::sync::SyncService;

/// Current config (defaults applied) as pretty JSON.
pub fn export_config(service: &SyncService) -> SyncResult<String> {
    codec::config_to_text(&service.read_config()?)
}

/// Apply an exported document through the regular `setConfig` path.
pub fn import_config(service: &SyncService, text: &str) -> SyncResult<Value> {
    let patch = codec::parse_json(text)?;
    if !patch.is_object() {
        return Err(SyncError::Decode("imported config is not a JSON object".into()));
    }
    let next = service.set_config(&patch)?;
    log::info!("[Import] Config imported");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{HttpConnector, RemoteConnector};
    use crate::store::{ConfigStore, MemoryConfigStore};
    use serde_json::json;
    use std::sync::Arc;

    fn service_with(store: Arc<dyn ConfigStore>) -> SyncService {
        let connector: Arc<dyn RemoteConnector> = Arc::new(HttpConnector::default());
        SyncService::new(store, connector)
    }

    #[test]
    fn export_then_import_into_fresh_store() {
        let source = service_with(Arc::new(MemoryConfigStore::new()));
        source
            .set_config(&json!({ "cards": [{ "title": "常用", "links": [] }] }))
            .unwrap();
        let text = export_config(&source).unwrap();
        assert!(text.contains("\n  \"cards\""));

        let target = service_with(Arc::new(MemoryConfigStore::new()));
        let imported = import_config(&target, &text).unwrap();
        assert_eq!(imported, source.read_config().unwrap());
    }

    #[test]
    fn import_rejects_non_objects() {
        let service = service_with(Arc::new(MemoryConfigStore::new()));
        assert!(matches!(
            import_config(&service, "[1]"),
            Err(SyncError::Decode(_))
        ));
        assert!(matches!(
            import_config(&service, "{oops"),
            Err(SyncError::Decode(_))
        ));
        assert!(service.store().load_config().unwrap().is_none());
    }
}
