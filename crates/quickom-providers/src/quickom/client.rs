//! Low-level HTTP transport for the Quickom API.
//!
//! Handles the `Authorization` header, error classification, transport
//! retries, page walking and the report call budget. Endpoint semantics
//! live in [`super::provider`].

use std::sync::Mutex;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::QuickomConfig;
use crate::budget::CallBudget;
use crate::error::{ProviderError, ProviderResult};
use crate::schema::ErrorBody;

pub(crate) const PROVIDER_NAME: &str = "quickom";

/// Items gathered by a page walk.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub items: Vec<Value>,
    /// False when the walk stopped on the page limit or the call budget.
    pub complete: bool,
}

/// Whether `path` targets a report endpoint.
fn is_report_path(path: &str) -> bool {
    path.split('/').any(|segment| segment == "report")
}

/// Decodes a JSON value into a typed response.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> ProviderResult<T> {
    serde_json::from_value(value).map_err(|e| {
        ProviderError::invalid_response(format!("unexpected response shape: {}", e))
            .with_provider(PROVIDER_NAME)
            .with_source(e)
    })
}

/// Decodes every element of a listing.
pub(crate) fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> ProviderResult<Vec<T>> {
    items.into_iter().map(decode).collect()
}

/// Quickom API client.
#[derive(Debug)]
pub struct QuickomClient {
    http_client: reqwest::Client,
    config: QuickomConfig,
    budget: CallBudget,
    last_report_call: Mutex<Option<Instant>>,
}

impl QuickomClient {
    /// Creates a client drawing report calls from `budget`.
    pub fn new(config: QuickomConfig, budget: CallBudget) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            config,
            budget,
            last_report_call: Mutex::new(None),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &QuickomConfig {
        &self.config
    }

    /// Returns the report call budget.
    pub fn budget(&self) -> &CallBudget {
        &self.budget
    }

    /// Issues a GET with query parameters.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> ProviderResult<Value> {
        self.make_call(Method::GET, path, query, None).await
    }

    /// Issues a POST with a JSON body.
    pub async fn post(&self, path: &str, body: Value) -> ProviderResult<Value> {
        self.make_call(Method::POST, path, &[], Some(body)).await
    }

    /// Issues one call. Report paths are paced and drawn from the budget.
    pub async fn make_call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> ProviderResult<Value> {
        if is_report_path(path) && !self.acquire_report_slot().await {
            return Err(ProviderError::rate_limited("report call budget exhausted")
                .with_provider(PROVIDER_NAME));
        }
        self.execute(method, path, query, body.as_ref()).await
    }

    /// Fetches every page of a listing and concatenates `result_key`.
    ///
    /// A report listing stops early, with what it has, once the budget runs
    /// out. Use [`Self::list_pages`] when a truncated listing must be told
    /// apart from a complete one.
    pub async fn list_paginated(
        &self,
        path: &str,
        query: &[(&str, String)],
        result_key: &str,
    ) -> ProviderResult<Vec<Value>> {
        Ok(self.list_pages(path, query, result_key).await?.items)
    }

    /// Walks a listing page by page.
    ///
    /// `page_count` is re-read from each page, so a collection that grows
    /// while it is walked is followed until the counter catches up.
    pub async fn list_pages(
        &self,
        path: &str,
        query: &[(&str, String)],
        result_key: &str,
    ) -> ProviderResult<Listing> {
        let report = is_report_path(path);
        let mut aggregated = Vec::new();
        let mut page: u64 = 1;
        let mut page_count: u64 = 1;
        let mut complete = true;

        while page <= page_count {
            if page > u64::from(self.config.max_pages) {
                warn!(path, max_pages = self.config.max_pages, "page limit reached, stopping");
                complete = false;
                break;
            }
            if report && !self.acquire_report_slot().await {
                warn!(path, page, "report call budget exhausted, returning partial results");
                complete = false;
                break;
            }

            let mut params = query.to_vec();
            params.push(("page_size", self.config.page_size.to_string()));
            params.push(("page_number", page.to_string()));

            let body = self.execute(Method::GET, path, &params, None).await?;
            let items = body
                .get(result_key)
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ProviderError::invalid_response(format!(
                        "missing '{}' array in {} page {}",
                        result_key, path, page
                    ))
                    .with_provider(PROVIDER_NAME)
                })?;
            aggregated.extend(items.iter().cloned());

            page_count = body.get("page_count").and_then(Value::as_u64).unwrap_or(0);
            page += 1;
        }

        debug!(path, items = aggregated.len(), pages = page - 1, complete, "listing done");
        Ok(Listing {
            items: aggregated,
            complete,
        })
    }

    /// Waits out the report pause, then takes one call from the budget.
    async fn acquire_report_slot(&self) -> bool {
        let wait = {
            let last = self.last_report_call.lock().unwrap_or_else(|e| e.into_inner());
            last.map(|at| self.config.report_pause.saturating_sub(at.elapsed()))
        };
        if let Some(wait) = wait
            && !wait.is_zero()
        {
            tokio::time::sleep(wait).await;
        }

        if !self.budget.try_acquire() {
            return false;
        }
        *self.last_report_call.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        true
    }

    /// Sends with retries on transport failures.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> ProviderResult<Value> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.send_once(method.clone(), path, query, body).await {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(path, attempt, delay_ms = delay.as_millis() as u64, error = %e, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << (attempt.saturating_sub(1)).min(6);
        self.config
            .retry_backoff
            .saturating_mul(factor)
            .min(Duration::from_secs(30))
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> ProviderResult<Value> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::authentication("API key is not configured")
                    .with_provider(PROVIDER_NAME)
            })?;

        let url = self
            .config
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| {
                ProviderError::bad_request(format!("invalid endpoint '{}': {}", path, e))
                    .with_provider(PROVIDER_NAME)
            })?;

        let mut request = self
            .http_client
            .request(method.clone(), url)
            .header(AUTHORIZATION, api_key);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            let err = if e.is_builder() {
                ProviderError::configuration(format!("invalid request: {}", e))
            } else if e.is_timeout() {
                ProviderError::network("request timeout")
            } else if e.is_connect() {
                ProviderError::network(format!("connection failed: {}", e))
            } else {
                ProviderError::network(format!("request failed: {}", e))
            };
            err.with_provider(PROVIDER_NAME).with_source(e)
        })?;

        let status = response.status().as_u16();
        debug!(%method, path, status, "provider call");

        let text = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response body: {}", e))
                .with_provider(PROVIDER_NAME)
                .with_source(e)
        })?;

        if status >= 400 {
            let error_body = serde_json::from_str::<ErrorBody>(&text).ok();
            return Err(
                ProviderError::from_response(status, error_body.as_ref()).with_provider(PROVIDER_NAME)
            );
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            ProviderError::invalid_response(format!("response is not JSON: {}", e))
                .with_provider(PROVIDER_NAME)
                .with_source(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ProviderErrorCode;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, budget: CallBudget) -> QuickomClient {
        let config = QuickomConfig::new(server.uri())
            .unwrap()
            .with_api_key("secret-key")
            .with_report_pause(Duration::from_millis(20))
            .with_retries(3, Duration::from_millis(1));
        QuickomClient::new(config, budget).unwrap()
    }

    #[test]
    fn report_paths() {
        assert!(is_report_path("report/users/abc/meetings"));
        assert!(is_report_path("/report/webinars/1"));
        assert!(!is_report_path("users/reporter/meetings"));
        assert!(!is_report_path("meetings/1"));
    }

    #[tokio::test]
    async fn sends_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meetings/42"))
            .and(header("Authorization", "secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, CallBudget::default());
        let body = client.get("meetings/42", &[]).await.unwrap();
        assert_eq!(body["id"], 42);
    }

    #[tokio::test]
    async fn missing_key_fails_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = QuickomConfig::new(server.uri()).unwrap();
        let client = QuickomClient::new(config, CallBudget::default()).unwrap();
        let err = client.post("api/account/qrcode/create", json!({})).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
    }

    #[tokio::test]
    async fn error_body_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meetings/9"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 3001,
                "message": "Meeting 9 is not found or has expired."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, CallBudget::default());
        let err = client.get("meetings/9", &[]).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.message(), "Meeting 9 is not found or has expired.");
    }

    #[tokio::test]
    async fn server_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, CallBudget::default());
        let err = client.get("users", &[]).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert_eq!(err.message(), "HTTP Status 503");
    }

    #[tokio::test]
    async fn non_json_success_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, CallBudget::default());
        let err = client.get("users/1", &[]).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn timeouts_are_retried_then_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(3)
            .mount(&server)
            .await;

        let config = QuickomConfig::new(server.uri())
            .unwrap()
            .with_api_key("k")
            .with_timeout(Duration::from_millis(50))
            .with_retries(3, Duration::from_millis(1));
        let client = QuickomClient::new(config, CallBudget::default()).unwrap();

        let err = client.get("users", &[]).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
    }

    #[tokio::test]
    async fn pagination_follows_growing_collection() {
        let server = MockServer::start().await;
        let size = Arc::new(AtomicUsize::new(5));
        let counter = size.clone();

        Mock::given(method("GET"))
            .and(path("/users/u1/meetings"))
            .and(query_param("page_size", "2"))
            .respond_with(move |req: &wiremock::Request| {
                let page: usize = req
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "page_number")
                    .and_then(|(_, v)| v.parse().ok())
                    .unwrap_or(1);
                // One meeting is added after every page served.
                let total = counter.fetch_add(1, Ordering::SeqCst);
                let page_count = total.div_ceil(2);
                let items: Vec<_> = ((page - 1) * 2..(page * 2).min(total))
                    .map(|i| json!({"id": i}))
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({
                    "page_count": page_count,
                    "page_number": page,
                    "meetings": items,
                }))
            })
            .mount(&server)
            .await;

        let config = QuickomConfig::new(server.uri())
            .unwrap()
            .with_api_key("k")
            .with_page_size(2);
        let client = QuickomClient::new(config, CallBudget::default()).unwrap();

        let items = client
            .list_paginated("users/u1/meetings", &[], "meetings")
            .await
            .unwrap();

        // Final page was served while 8 meetings existed.
        assert_eq!(items.len(), 8);
        assert_eq!(items.last().unwrap()["id"], 7);
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn pagination_stops_at_page_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page_count": 1000,
                "users": [{"id": "x"}],
            })))
            .mount(&server)
            .await;

        let config = QuickomConfig::new(server.uri())
            .unwrap()
            .with_api_key("k")
            .with_max_pages(3);
        let client = QuickomClient::new(config, CallBudget::default()).unwrap();

        let items = client.list_paginated("users", &[], "users").await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn missing_result_key_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"page_count": 1})))
            .mount(&server)
            .await;

        let client = client_for(&server, CallBudget::default());
        let err = client.list_paginated("users", &[], "users").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn report_budget_exhaustion_returns_partial() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report/users/u1/meetings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page_count": 5,
                "meetings": [{"uuid": "a"}, {"uuid": "b"}],
            })))
            .expect(2)
            .mount(&server)
            .await;

        let budget = CallBudget::new(2);
        let client = client_for(&server, budget.clone());

        let items = client
            .list_paginated("report/users/u1/meetings", &[], "meetings")
            .await
            .unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(budget.remaining(), 0);

        let err = client.get("report/webinars/1", &[]).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::RateLimited);
    }

    #[tokio::test]
    async fn truncated_listing_is_flagged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report/meetings/abc/participants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page_count": 3,
                "participants": [{"id": "p"}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, CallBudget::new(1));
        let listing = client
            .list_pages("report/meetings/abc/participants", &[], "participants")
            .await
            .unwrap();
        assert_eq!(listing.items.len(), 1);
        assert!(!listing.complete);

        let client = client_for(&server, CallBudget::new(0));
        let listing = client
            .list_pages("report/meetings/abc/participants", &[], "participants")
            .await
            .unwrap();
        assert!(listing.items.is_empty());
        assert!(!listing.complete);
    }

    #[tokio::test]
    async fn report_calls_are_paced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page_count": 3,
                "participants": [],
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, CallBudget::new(10));
        let started = std::time::Instant::now();
        client
            .list_paginated("report/meetings/abc/participants", &[], "participants")
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn non_report_listing_ignores_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page_count": 1,
                "users": [{"id": "a"}],
            })))
            .mount(&server)
            .await;

        let budget = CallBudget::new(0);
        let client = client_for(&server, budget);
        let items = client.list_paginated("users", &[], "users").await.unwrap();
        assert_eq!(items.len(), 1);
    }
}
