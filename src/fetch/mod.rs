//! Generation service access
//!
//! This module groups the two fetchers that talk to the remote generation
//! API, one for quiz content and one for per-question illustrations,
//! together with the shared HTTP client and the failure taxonomy both
//! report through. The
//! service is consumed as an opaque request/response boundary: no
//! caching, no retries, every retry is a user-initiated re-entry.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::constants::{fetch, quiz};

pub mod content;
pub mod illustration;

pub use content::ContentFetcher;
pub use illustration::{Illustration, IllustrationFetcher};

/// A classified failure of a generation request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The service generated fewer questions than a session requires
    #[error(
        "the service generated only {received} questions, but {required} are required; try again"
    )]
    InsufficientContent {
        /// Number of questions actually received
        received: usize,
        /// Number of questions a session requires
        required: usize,
    },

    /// Generated questions did not chunk into the expected set shape
    ///
    /// Defensive classification; unreachable after the truncation step
    /// unless the chunking invariants themselves are broken.
    #[error(
        "generated questions could not be arranged into {} sets of {}",
        quiz::SETS_PER_TOPIC,
        quiz::QUESTIONS_PER_SET
    )]
    InternalShape,

    /// The response was not valid JSON of the requested schema
    #[error("the service response was not in the expected format: {0}")]
    InvalidResponseFormat(String),

    /// The credential was rejected as invalid or expired
    ///
    /// Distinguished so the caller can discard the stored credential and
    /// force re-entry.
    #[error("the credential is invalid or has expired; please verify it")]
    InvalidCredential,

    /// The service's usage quota has been exhausted
    #[error("the service quota has been exceeded; please try again later")]
    QuotaExceeded,

    /// Any other transport or service failure
    #[error("generation request failed: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Whether this failure means the credential must be re-entered
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, Self::InvalidCredential)
    }

    /// Whether this failure is quota exhaustion
    ///
    /// Quota failures on the illustration path get a distinct "limit
    /// reached" affordance instead of a generic error.
    pub fn is_quota_exhaustion(&self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }

    /// Classifies a non-success HTTP status from the service
    pub(crate) fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Self::InvalidCredential
            }
            StatusCode::TOO_MANY_REQUESTS => Self::QuotaExceeded,
            other => Self::Unknown(format!("the service responded with HTTP {other}")),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

/// Rejects empty credentials locally, before any request is issued
pub(crate) fn ensure_credential(credential: &str) -> Result<&str, FetchError> {
    let trimmed = credential.trim();
    if trimmed.is_empty() {
        Err(FetchError::InvalidCredential)
    } else {
        Ok(trimmed)
    }
}

/// Shared HTTP client for the generation service
///
/// Wraps a [`reqwest::Client`] with the service base URL; the URL can be
/// overridden for self-hosted gateways.
#[derive(Debug, Clone)]
pub struct GenerativeClient {
    http: Client,
    base_url: String,
}

impl Default for GenerativeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerativeClient {
    /// Creates a client against the default service URL
    pub fn new() -> Self {
        Self::with_base_url(fetch::DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom service URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Builds the full endpoint URL for a model operation
    pub(crate) fn endpoint(&self, model: &str, operation: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:{operation}",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Posts a JSON request and decodes a JSON response
    ///
    /// Non-success statuses are classified through
    /// [`FetchError::from_status`]; a response envelope that fails to
    /// decode is reported as [`FetchError::InvalidResponseFormat`].
    pub(crate) async fn post_json<B, R>(
        &self,
        url: &str,
        credential: &str,
        body: &B,
    ) -> Result<R, FetchError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", credential)
            .json(body)
            .timeout(Duration::from_secs(fetch::REQUEST_TIMEOUT_SECONDS))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let classified = FetchError::from_status(status);
            tracing::error!(%status, error = %classified, "generation request rejected");
            return Err(classified);
        }

        response
            .json()
            .await
            .map_err(|error| FetchError::InvalidResponseFormat(error.to_string()))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            FetchError::from_status(StatusCode::BAD_REQUEST),
            FetchError::InvalidCredential
        );
        assert_eq!(
            FetchError::from_status(StatusCode::UNAUTHORIZED),
            FetchError::InvalidCredential
        );
        assert_eq!(
            FetchError::from_status(StatusCode::FORBIDDEN),
            FetchError::InvalidCredential
        );
        assert_eq!(
            FetchError::from_status(StatusCode::TOO_MANY_REQUESTS),
            FetchError::QuotaExceeded
        );
        assert!(matches!(
            FetchError::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            FetchError::Unknown(_)
        ));
    }

    #[test]
    fn test_ensure_credential() {
        assert_eq!(ensure_credential("  key  "), Ok("key"));
        assert_eq!(ensure_credential(""), Err(FetchError::InvalidCredential));
        assert_eq!(
            ensure_credential("   "),
            Err(FetchError::InvalidCredential)
        );
    }

    #[test]
    fn test_failure_class_predicates() {
        assert!(FetchError::InvalidCredential.is_credential_rejection());
        assert!(FetchError::QuotaExceeded.is_quota_exhaustion());
        assert!(!FetchError::QuotaExceeded.is_credential_rejection());
        assert!(!FetchError::InternalShape.is_quota_exhaustion());
    }

    #[test]
    fn test_endpoint_building() {
        let client = GenerativeClient::with_base_url("https://example.test/");
        assert_eq!(
            client.endpoint("some-model", "generateContent"),
            "https://example.test/v1beta/models/some-model:generateContent"
        );
    }

    #[test]
    fn test_insufficient_content_message_states_shortfall() {
        let error = FetchError::InsufficientContent {
            received: 7,
            required: 10,
        };
        let message = error.to_string();
        assert!(message.contains('7'));
        assert!(message.contains("10"));
    }
}
