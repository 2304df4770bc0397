//! 共享 HTTP 客户端
//!
//! 所有 provider adapter 共用同一个 reqwest 客户端（连接池复用）。
//! 不设置整体请求超时，只限制建连时间。

use once_cell::sync::OnceCell;
use reqwest::Client;
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 15;
const USER_AGENT: &str = concat!("chrome-home-sync/", env!("CARGO_PKG_VERSION"));

static GLOBAL_CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared client, built on first use.
pub fn get() -> Client {
    GLOBAL_CLIENT.get_or_init(build_client).clone()
}

fn build_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("[Http] Failed to build configured client, using defaults: {e}");
            Client::new()
        })
}

/// Hide `access_token` query values before a URL reaches the log.
pub fn mask_url(url: &url::Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "access_token") {
        return url.to_string();
    }
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "access_token" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_url_hides_access_token_only() {
        let url =
            url::Url::parse("https://gitee.com/api/v5/gists/abc?access_token=secret&ref=main")
                .unwrap();
        let masked = mask_url(&url);
        assert!(!masked.contains("secret"));
        assert!(masked.contains("access_token=***") || masked.contains("access_token=%2A%2A%2A"));
        assert!(masked.contains("ref=main"));
    }

    #[test]
    fn mask_url_passes_plain_urls_through() {
        let url = url::Url::parse("https://api.github.com/repos/o/r").unwrap();
        assert_eq!(mask_url(&url), "https://api.github.com/repos/o/r");
    }
}
