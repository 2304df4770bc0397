//! Remote payload codec: UTF-8 JSON ⇄ base64.

use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine};
use serde_json::Value;

use crate::error::{SyncError, SyncResult};

/// Contents APIs reject wrapped base64.
pub fn normalize_base64(encoded: &str) -> String {
    encoded.chars().filter(|c| !matches!(c, '\n' | '\r')).collect()
}

/// Pretty-printed JSON text pushed to the remote.
pub fn config_to_text(config: &Value) -> SyncResult<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

pub fn encode_text(text: &str) -> String {
    Base64Engine.encode(text.as_bytes())
}

pub fn decode_text(encoded: &str) -> SyncResult<String> {
    let bytes = Base64Engine
        .decode(normalize_base64(encoded).trim())
        .map_err(|e| SyncError::Decode(format!("invalid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| SyncError::Decode(format!("invalid UTF-8: {e}")))
}

pub fn parse_json(text: &str) -> SyncResult<Value> {
    serde_json::from_str(text).map_err(|e| SyncError::Decode(format!("invalid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_wrapped_lines() {
        assert_eq!(normalize_base64("YWJj\nZGVm\r\n"), "YWJjZGVm");
    }

    #[test]
    fn decodes_provider_wrapped_base64_with_cjk() {
        let config = json!({ "cards": [{ "title": "常用网站" }] });
        let text = config_to_text(&config).unwrap();
        let encoded = encode_text(&text);
        let wrapped: String = encoded
            .as_bytes()
            .chunks(60)
            .map(|c| format!("{}\n", String::from_utf8_lossy(c)))
            .collect();
        let decoded = parse_json(&decode_text(&wrapped).unwrap()).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(matches!(decode_text("@@@"), Err(SyncError::Decode(_))));
        // valid base64, invalid UTF-8
        assert!(matches!(decode_text("/w=="), Err(SyncError::Decode(_))));
        assert!(matches!(parse_json("{not json"), Err(SyncError::Decode(_))));
    }
}
