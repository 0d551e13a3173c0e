use crate::config::ClientConfig;
use crate::transport::TransportError;
use crate::Result;
use keyring::Entry;
use reqwest::Proxy;
use std::env;
use std::time::Duration;

const KEYRING_SERVICE: &str = "quizgen";

/// Build the shared `reqwest` client used by every attempt.
///
/// The connection pool lives inside the returned client, so one instance can be cloned
/// across concurrent invocations.
pub fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs.max(1)))
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Some(Duration::from_secs(90)));

    if let Some(proxy_url) = &config.proxy_url {
        if let Ok(proxy) = Proxy::all(proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    let client = builder
        .build()
        .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;
    Ok(client)
}

/// Resolve an API key for `provider`: OS keyring first, then `{PROVIDER}_API_KEY`.
pub fn resolve_api_key(provider: &str) -> Option<String> {
    if let Ok(entry) = Entry::new(KEYRING_SERVICE, provider) {
        if let Ok(key) = entry.get_password() {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
    }

    let env_var = format!("{}_API_KEY", provider.to_uppercase());
    env::var(env_var).ok().filter(|k| !k.trim().is_empty())
}
