//! Quickom client configuration.

use std::time::Duration;
use url::Url;

/// Configuration for the Quickom client.
#[derive(Debug, Clone)]
pub struct QuickomConfig {
    /// API root, e.g. `https://conference-api-prod.quickom.com/`.
    pub base_url: Url,

    /// Account API key, sent verbatim in the `Authorization` header.
    pub api_key: Option<String>,

    /// Request timeout.
    pub timeout: Duration,

    /// Records per page for list endpoints.
    pub page_size: u32,

    /// Hard stop for a single paginated listing.
    pub max_pages: u32,

    /// Pause between two report endpoint calls.
    pub report_pause: Duration,

    /// Attempts per request for transport failures.
    pub max_retries: u32,

    /// First retry delay; doubles on each attempt.
    pub retry_backoff: Duration,

    /// Timezone sent when a record carries none.
    pub timezone: String,

    /// User agent string.
    pub user_agent: String,
}

impl QuickomConfig {
    /// Production API root.
    pub const DEFAULT_BASE_URL: &'static str = "https://conference-api-prod.quickom.com/";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Maximum records the provider returns per call.
    pub const DEFAULT_PAGE_SIZE: u32 = 300;

    /// Default page cap for one listing.
    pub const DEFAULT_MAX_PAGES: u32 = 1000;

    /// Default attempts for transport failures.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Creates a configuration against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let mut parsed = Url::parse(base_url.as_ref())?;
        // Url::join drops the last segment unless the path ends with '/'.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            base_url: parsed,
            api_key: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            page_size: Self::DEFAULT_PAGE_SIZE,
            max_pages: Self::DEFAULT_MAX_PAGES,
            report_pause: Duration::from_secs(1),
            max_retries: Self::DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(500),
            timezone: "UTC".to_string(),
            user_agent: format!("quickom-sync/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Configuration against the production API.
    pub fn production() -> Result<Self, url::ParseError> {
        Self::new(Self::DEFAULT_BASE_URL)
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the page cap.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Sets the pause between report calls.
    pub fn with_report_pause(mut self, pause: Duration) -> Self {
        self.report_pause = pause;
        self
    }

    /// Sets the retry policy.
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_backoff = backoff;
        self
    }

    /// Sets the fallback timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Returns true if an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}
