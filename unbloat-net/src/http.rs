// unbloat-net/src/http.rs
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use tracing::{debug, error};
use unbloat_common::config::Config;
use unbloat_common::error::{Result, UnbloatError};

const CONNECT_TIMEOUT_CAP: Duration = Duration::from_secs(10);
const USER_AGENT_STRING: &str = "unbloat debloater (Rust)";

/// Client shared by both catalog reads. `timeout` bounds each whole request.
pub fn build_http_client(config: &Config) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, */*"));
    if let Some(token) = &config.github_api_token {
        debug!("Adding GitHub API token to request headers.");
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut val) => {
                val.set_sensitive(true);
                headers.insert(AUTHORIZATION, val);
            }
            Err(e) => {
                error!("Failed to parse GitHub API token into header value: {}", e);
            }
        }
    }

    Client::builder()
        .timeout(config.http_timeout)
        .connect_timeout(config.http_timeout.min(CONNECT_TIMEOUT_CAP))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| UnbloatError::Config(format!("Failed to build HTTP client: {e}")))
}

/// GETs `url` and returns the body, mapping every transport problem,
/// non-success status and empty body to `Unreachable`.
pub async fn get_body(client: &Client, url: &str) -> Result<Vec<u8>> {
    debug!("Fetching {}", url);
    let unreachable = |reason: String| UnbloatError::Unreachable {
        url: url.to_string(),
        reason,
    };

    let response = client.get(url).send().await.map_err(|e| {
        error!("HTTP request failed for {}: {}", url, e);
        unreachable(describe(&e))
    })?;

    let status = response.status();
    if !status.is_success() {
        debug!("HTTP request to {} returned non-success status: {}", url, status);
        return Err(unreachable(format!("HTTP status {status}")));
    }

    let body = response.bytes().await.map_err(|e| {
        error!("Failed to read response body from {}: {}", url, e);
        unreachable(describe(&e))
    })?;
    if body.iter().all(u8::is_ascii_whitespace) {
        error!("Response body for {} was empty.", url);
        return Err(unreachable("empty response body".to_string()));
    }
    Ok(body.to_vec())
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}
