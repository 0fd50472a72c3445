use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use kingscribe_core::config::BackendConfig;
use kingscribe_core::{BackendResult, CommandEnvelope};

/// How much of a failed response body is kept for diagnostics.
const DIAGNOSTIC_BODY_LIMIT: usize = 256;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("backend response was not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("backend request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("backend endpoint is not configured")]
    Unconfigured,
}

/// One POST per call, no retries, no circuit breaking. Callers interpret the
/// decoded `status` field; the client only classifies transport faults.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn send(&self, command: &str, data: Value) -> Result<BackendResult, BackendError>;
}

pub struct HttpBackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(BackendError::Request)?;

        Ok(Self { http, base_url: config.base_url.clone() })
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn send(&self, command: &str, data: Value) -> Result<BackendResult, BackendError> {
        if self.base_url.trim().is_empty() {
            return Err(BackendError::Unconfigured);
        }

        let envelope = CommandEnvelope::new(command, data);
        let response = self
            .http
            .post(&self.base_url)
            .json(&envelope)
            .send()
            .await
            .map_err(BackendError::Request)?;

        let status = response.status();
        let body = response.text().await.map_err(BackendError::Request)?;

        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let value: Value = serde_json::from_str(&body).map_err(BackendError::Parse)?;
        Ok(BackendResult::from_value(value))
    }
}

/// Acknowledges every command without a network. Used when no backend is
/// wired up yet and by tests that only care about the command plumbing.
#[derive(Default)]
pub struct NoopBackendClient;

#[async_trait]
impl BackendClient for NoopBackendClient {
    async fn send(&self, command: &str, _data: Value) -> Result<BackendResult, BackendError> {
        Ok(BackendResult::from_value(json!({
            "status": "success",
            "message": format!("command `{command}` acknowledged (no backend configured)"),
        })))
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= DIAGNOSTIC_BODY_LIMIT {
        return body.to_owned();
    }

    let mut cut = DIAGNOSTIC_BODY_LIMIT;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}… ({} bytes total)", &body[..cut], body.len())
}

#[cfg(test)]
mod tests {
    use kingscribe_core::config::BackendConfig;
    use kingscribe_core::ResultStatus;
    use serde_json::json;

    use super::{truncate_body, BackendClient, BackendError, HttpBackendClient, NoopBackendClient};

    #[tokio::test]
    async fn unconfigured_endpoint_is_classified_before_any_request() {
        let client =
            HttpBackendClient::new(&BackendConfig { base_url: String::new(), timeout_secs: 30 })
                .expect("client");

        let error = client
            .send("get_my_stats", json!({"userId": "1"}))
            .await
            .expect_err("no endpoint configured");
        assert!(matches!(error, BackendError::Unconfigured));
    }

    #[tokio::test]
    async fn noop_client_acknowledges_commands() {
        let client = NoopBackendClient;
        let result = client
            .send("get_leaderboard", json!({"userId": "1", "top": 10}))
            .await
            .expect("noop send");

        assert_eq!(result.status, ResultStatus::Success);
        assert!(result.message.contains("get_leaderboard"));
    }

    #[test]
    fn short_bodies_are_kept_verbatim() {
        assert_eq!(truncate_body("upstream sad"), "upstream sad");
    }

    #[test]
    fn long_bodies_are_truncated_with_a_size_note() {
        let body = "x".repeat(1000);
        let truncated = truncate_body(&body);

        assert!(truncated.len() < body.len());
        assert!(truncated.contains("1000 bytes total"));
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let body = "é".repeat(300);
        let truncated = truncate_body(&body);
        assert!(truncated.contains("bytes total"));
    }

    #[test]
    fn http_failure_display_carries_status_and_body() {
        let error = BackendError::Http { status: 502, body: "bad gateway".to_owned() };
        let rendered = error.to_string();

        assert!(rendered.contains("502"));
        assert!(rendered.contains("bad gateway"));
    }
}
