use reqwest::Client;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Shared outbound client. Each upstream call is a single attempt; the
/// timeouts only bound how long that attempt may hang.
pub fn build_client() -> Client {
    let timeout = env_secs("HTTP_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);
    let connect = env_secs("HTTP_CONNECT_TIMEOUT_SECS").unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
    Client::builder()
        .timeout(Duration::from_secs(timeout))
        .connect_timeout(Duration::from_secs(connect))
        .user_agent(concat!("crosslist-api/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn env_secs(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}
