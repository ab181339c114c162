//! Error types for provider operations.
//!
//! Every client operation returns a typed [`ProviderError`]. The
//! [`ProviderErrorCode::NotFound`] class marks a meeting (or user) the
//! provider no longer knows about; callers that treat absence as success
//! match on the code rather than on message text.

use std::fmt;
use thiserror::Error;

use crate::schema::ErrorBody;

/// Upstream codes meaning the meeting is gone or expired.
const MEETING_GONE_CODES: &[i64] = &[3000, 3001];

/// Upstream code for an unknown user.
const USER_NOT_FOUND_CODE: i64 = 1001;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Missing or rejected API key.
    AuthenticationFailed,
    /// The key lacks permission for the resource.
    AuthorizationFailed,
    /// Connection failure, timeout, DNS resolution.
    NetworkError,
    /// Too many requests, or the local report budget is spent.
    RateLimited,
    /// 5xx from the provider.
    ServerError,
    /// Body could not be parsed.
    InvalidResponse,
    /// The meeting or user does not exist or has expired.
    NotFound,
    /// Any other 4xx, or a request that cannot be built.
    BadRequest,
    /// Missing or invalid configuration.
    ConfigurationError,
    /// Unexpected internal state.
    InternalError,
}

impl ProviderErrorCode {
    /// Only transport failures are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError)
    }

    /// Returns a stable name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while talking to the provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// HTTP status, when the failure came from a response.
    status: Option<u16>,
    /// Numeric error code from the response body.
    upstream_code: Option<i64>,
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            upstream_code: None,
            provider: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Classifies a failed HTTP response.
    ///
    /// The upstream message comes from `message`, `error` or
    /// `error_description`, falling back to the bare status.
    pub fn from_response(status: u16, body: Option<&ErrorBody>) -> Self {
        let upstream_code = body.and_then(|b| b.code);
        let message = body
            .and_then(ErrorBody::message)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP Status {}", status));

        let gone = upstream_code
            .is_some_and(|c| MEETING_GONE_CODES.contains(&c) || c == USER_NOT_FOUND_CODE);

        let code = match status {
            _ if gone => ProviderErrorCode::NotFound,
            401 => ProviderErrorCode::AuthenticationFailed,
            403 => ProviderErrorCode::AuthorizationFailed,
            404 => ProviderErrorCode::NotFound,
            429 => ProviderErrorCode::RateLimited,
            400..=499 => ProviderErrorCode::BadRequest,
            _ => ProviderErrorCode::ServerError,
        };

        let mut err = Self::new(code, message);
        err.status = Some(status);
        err.upstream_code = upstream_code;
        err
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the upstream error code, if any.
    pub fn upstream_code(&self) -> Option<i64> {
        self.upstream_code
    }

    /// Returns the provider name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Whether the provider reported the resource as gone.
    pub fn is_not_found(&self) -> bool {
        self.code == ProviderErrorCode::NotFound
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Copies code, message and response details into a new error.
    ///
    /// The boxed source is not cloneable and is dropped.
    pub fn detached(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            status: self.status,
            upstream_code: self.upstream_code,
            provider: self.provider.clone(),
            source: None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(code) = self.upstream_code {
            write!(f, " (code {})", code)?;
        }
        Ok(())
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
