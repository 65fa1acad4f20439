//! Azure Resource Manager REST client.
//!
//! A thin wrapper over `reqwest` that adds the bearer token, follows
//! `nextLink` pagination and retries throttled requests.

use crate::error::AzureError;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Hard stop for pagination loops.
const MAX_PAGES: usize = 1000;

/// Longest we wait between retries.
const MAX_BACKOFF_SECS: u64 = 60;

/// One page of an ARM list response.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

/// Settings for [`ArmClient`].
#[derive(Debug, Clone)]
pub struct ArmClientConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub retries: usize,
}

impl From<&crate::config::AzureConfig> for ArmClientConfig {
    fn from(config: &crate::config::AzureConfig) -> Self {
        Self {
            endpoint: config.management_endpoint.trim_end_matches('/').to_string(),
            timeout_seconds: config.timeout_seconds,
            retries: config.retries,
        }
    }
}

/// Authenticated client for `management.azure.com`.
#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    config: ArmClientConfig,
    token: String,
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("config", &self.config)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ArmClient {
    /// Create a client that sends `token` as a bearer credential.
    pub fn new(config: ArmClientConfig, token: String) -> Result<Self, AzureError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("azcir/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| AzureError::Request {
                url: config.endpoint.clone(),
                source,
            })?;

        Ok(Self {
            http,
            config,
            token,
        })
    }

    /// Build an absolute URL for an ARM path such as `/subscriptions`.
    pub fn url(&self, path: &str, api_version: &str) -> String {
        build_url(&self.config.endpoint, path, api_version)
    }

    /// GET a single JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AzureError> {
        let body = self.send(Method::GET, url, None).await?;
        decode(url, &body)
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, AzureError> {
        let response = self.send(Method::POST, url, Some(body)).await?;
        decode(url, &response)
    }

    /// GET every page of a list endpoint and concatenate the values.
    pub async fn get_paged<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, AzureError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        let mut pages = 0;

        while let Some(current) = next.take() {
            let page: Page<T> = self.get_json(&current).await?;
            items.extend(page.value);
            pages += 1;

            next = page
                .next_link
                .filter(|link| !link.is_empty() && *link != current);

            if pages >= MAX_PAGES && next.is_some() {
                warn!("Stopping pagination of {} after {} pages", url, pages);
                break;
            }
        }

        debug!("Fetched {} items in {} page(s) from {}", items.len(), pages, url);
        Ok(items)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String, AzureError> {
        let mut attempt = 0;

        loop {
            let mut request = self
                .http
                .request(method.clone(), url)
                .bearer_auth(&self.token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|source| AzureError::Request {
                url: url.to_string(),
                source,
            })?;

            let status = response.status();
            if status.is_success() {
                return response.text().await.map_err(|source| AzureError::Request {
                    url: url.to_string(),
                    source,
                });
            }

            if is_retryable(status) && attempt < self.config.retries {
                attempt += 1;
                let delay = retry_delay(
                    response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                    attempt,
                );
                warn!(
                    "Azure returned {} for {}; retry {}/{} in {}s",
                    status,
                    url,
                    attempt,
                    self.config.retries,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(AzureError::Api {
                status: status.as_u16(),
                url: url.to_string(),
                body: summarize_error_body(&body),
            });
        }
    }
}

fn build_url(endpoint: &str, path: &str, api_version: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!(
        "{}/{}{}api-version={}",
        endpoint.trim_end_matches('/'),
        path.trim_start_matches('/'),
        separator,
        api_version
    )
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, AzureError> {
    serde_json::from_str(body).map_err(|source| AzureError::Decode {
        url: url.to_string(),
        source,
    })
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before retry `attempt` (1-based), honouring a numeric `Retry-After`.
fn retry_delay(retry_after: Option<&str>, attempt: usize) -> Duration {
    let secs = retry_after
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or_else(|| 1u64 << attempt.min(6));
    Duration::from_secs(secs.min(MAX_BACKOFF_SECS))
}

/// Pull `error.code: error.message` out of an ARM error body when present.
fn summarize_error_body(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        #[serde(default)]
        code: String,
        #[serde(default)]
        message: String,
    }

    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!("{}: {}", envelope.error.code, envelope.error.message),
        Err(_) => body.chars().take(300).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::fake_arm::FakeArm;

    #[test]
    fn test_build_url() {
        assert_eq!(
            build_url("https://management.azure.com/", "/subscriptions", "2022-12-01"),
            "https://management.azure.com/subscriptions?api-version=2022-12-01"
        );
        assert_eq!(
            build_url(
                "https://management.azure.com",
                "subscriptions/abc/shares?$expand=stats",
                "2023-01-01"
            ),
            "https://management.azure.com/subscriptions/abc/shares?$expand=stats&api-version=2023-01-01"
        );
    }

    #[test]
    fn test_page_decoding() {
        let body = r#"{"value": [1, 2, 3], "nextLink": "https://next"}"#;
        let page: Page<u32> = decode("u", body).unwrap();
        assert_eq!(page.value, vec![1, 2, 3]);
        assert_eq!(page.next_link.as_deref(), Some("https://next"));

        let page: Page<u32> = decode("u", "{}").unwrap();
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }

    #[test]
    fn test_decode_error_names_url() {
        let err = decode::<Page<u32>>("https://x", "not json").unwrap_err();
        assert!(err.to_string().contains("https://x"));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::FORBIDDEN));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_retry_delay() {
        assert_eq!(retry_delay(Some("5"), 1), Duration::from_secs(5));
        assert_eq!(retry_delay(None, 1), Duration::from_secs(2));
        assert_eq!(retry_delay(None, 3), Duration::from_secs(8));
        assert_eq!(retry_delay(Some("600"), 1), Duration::from_secs(MAX_BACKOFF_SECS));
        assert_eq!(retry_delay(Some("soon"), 2), Duration::from_secs(4));
    }

    #[test]
    fn test_summarize_error_body() {
        let body = r#"{"error": {"code": "AuthorizationFailed", "message": "no access"}}"#;
        assert_eq!(summarize_error_body(body), "AuthorizationFailed: no access");
        assert_eq!(summarize_error_body("plain"), "plain");
    }

    #[tokio::test]
    async fn test_get_paged_follows_next_link_until_it_repeats() {
        let server = FakeArm::start().await;
        let page2 = format!("{}/items?page=2", server.base());
        server
            .route(
                "GET",
                "page=2",
                200,
                &format!(r#"{{"value": [3], "nextLink": "{}"}}"#, page2),
            )
            .route(
                "GET",
                "/items",
                200,
                &format!(r#"{{"value": [1, 2], "nextLink": "{}"}}"#, page2),
            );

        let client = server.client(0);
        let items: Vec<u32> = client.get_paged(&client.url("/items", "v1")).await.unwrap();

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(server.count("/items"), 2);
    }

    #[tokio::test]
    async fn test_throttled_request_is_retried() {
        let server = FakeArm::start().await;
        server
            .route("GET", "/throttled", 429, r#"{"error": {"code": "TooManyRequests", "message": "slow down"}}"#)
            .route("GET", "/throttled", 200, r#"{"ok": true}"#);

        let client = server.client(2);
        let value: serde_json::Value = client
            .get_json(&client.url("/throttled", "v1"))
            .await
            .unwrap();

        assert_eq!(value["ok"], true);
        assert_eq!(server.count("/throttled"), 2);
    }

    #[tokio::test]
    async fn test_server_errors_give_up_after_retries() {
        let server = FakeArm::start().await;
        server.route("POST", "/query", 503, "unavailable");

        let client = server.client(1);
        let err = client
            .post_json::<serde_json::Value>(&client.url("/query", "v1"), &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, AzureError::Api { status: 503, .. }));
        assert_eq!(server.count("POST /query"), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = FakeArm::start().await;
        server.route(
            "GET",
            "/forbidden",
            403,
            r#"{"error": {"code": "AuthorizationFailed", "message": "no access"}}"#,
        );

        let client = server.client(3);
        let err = client
            .get_json::<serde_json::Value>(&client.url("/forbidden", "v1"))
            .await
            .unwrap_err();

        match err {
            AzureError::Api { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body, "AuthorizationFailed: no access");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(server.count("/forbidden"), 1);
    }

    #[test]
    fn test_client_url_uses_endpoint() {
        let client = ArmClient::new(
            ArmClientConfig {
                endpoint: "https://example.test".to_string(),
                timeout_seconds: 5,
                retries: 0,
            },
            "token".to_string(),
        )
        .unwrap();
        assert_eq!(
            client.url("/subscriptions", "2022-12-01"),
            "https://example.test/subscriptions?api-version=2022-12-01"
        );
    }
}
