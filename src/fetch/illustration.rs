//! Per-question illustration fetching
//!
//! Requests exactly one image for a question's image prompt. The call is
//! best-effort relative to quiz progression: it is issued fresh each time
//! a question becomes current, never cached, never retried, and its
//! failure must never block the surrounding question flow; the session
//! degrades the image slot instead.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::constants::fetch;

use super::{FetchError, GenerativeClient, ensure_credential};

/// One generated illustration, decoded and ready for inline display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Illustration {
    bytes: Vec<u8>,
    mime: String,
}

impl Illustration {
    /// The raw image bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The image mime type
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Encodes the image as a `data:` URL suitable for inline display
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }
}

/// Fetches one illustration per question from the generation service
#[derive(Debug, Clone, Default)]
pub struct IllustrationFetcher {
    client: GenerativeClient,
}

#[derive(Debug, Serialize)]
struct GenerateImageRequest {
    instances: Vec<ImageInstance>,
    parameters: ImageParameters,
}

#[derive(Debug, Serialize)]
struct ImageInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct ImageParameters {
    #[serde(rename = "sampleCount")]
    sample_count: u32,
    #[serde(rename = "aspectRatio")]
    aspect_ratio: &'static str,
    #[serde(rename = "outputMimeType")]
    output_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateImageResponse {
    #[serde(default)]
    predictions: Vec<ImagePrediction>,
}

#[derive(Debug, Deserialize)]
struct ImagePrediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: String,
}

impl IllustrationFetcher {
    /// Creates a fetcher against the default service URL
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher sharing an existing client
    pub fn with_client(client: GenerativeClient) -> Self {
        Self { client }
    }

    /// Requests exactly one image for the given prompt
    ///
    /// # Errors
    ///
    /// * [`FetchError::QuotaExceeded`]: image quota exhausted; shown as
    ///   a distinct "limit reached" placeholder
    /// * [`FetchError::InvalidCredential`]: empty or rejected credential
    /// * [`FetchError::InvalidResponseFormat`]: undecodable payload
    /// * [`FetchError::Unknown`]: no image generated, or any other
    ///   transport/service failure
    pub async fn fetch(&self, prompt: &str, credential: &str) -> Result<Illustration, FetchError> {
        let credential = ensure_credential(credential)?;
        let url = self.client.endpoint(fetch::IMAGE_MODEL, "predict");
        let request = GenerateImageRequest {
            instances: vec![ImageInstance {
                prompt: prompt.to_string(),
            }],
            parameters: ImageParameters {
                sample_count: 1,
                aspect_ratio: fetch::IMAGE_ASPECT_RATIO,
                output_mime_type: fetch::IMAGE_MIME_TYPE,
            },
        };

        tracing::debug!(prompt, "requesting illustration");

        let response: GenerateImageResponse =
            self.client.post_json(&url, credential, &request).await?;

        let prediction = response
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Unknown("the service generated no image".to_string()))?;

        decode_payload(&prediction.bytes_base64_encoded)
    }
}

/// Decodes a base64 image payload into an [`Illustration`]
pub(crate) fn decode_payload(payload: &str) -> Result<Illustration, FetchError> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|error| FetchError::InvalidResponseFormat(error.to_string()))?;
    Ok(Illustration {
        bytes,
        mime: fetch::IMAGE_MIME_TYPE.to_string(),
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload() {
        let payload = BASE64.encode(b"jpeg bytes");
        let illustration = decode_payload(&payload).unwrap();
        assert_eq!(illustration.bytes(), b"jpeg bytes");
        assert_eq!(illustration.mime(), fetch::IMAGE_MIME_TYPE);
    }

    #[test]
    fn test_decode_payload_rejects_invalid_base64() {
        let error = decode_payload("not base64 at all!!!").unwrap_err();
        assert!(matches!(error, FetchError::InvalidResponseFormat(_)));
    }

    #[test]
    fn test_data_url_round_trip() {
        let payload = BASE64.encode(b"\xff\xd8\xff");
        let illustration = decode_payload(&payload).unwrap();
        let url = illustration.data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let encoded = url.rsplit(',').next().unwrap();
        assert_eq!(BASE64.decode(encoded).unwrap(), b"\xff\xd8\xff");
    }

    #[tokio::test]
    async fn test_empty_credential_rejected_without_request() {
        let fetcher = IllustrationFetcher::new();
        let error = fetcher.fetch("a red fox", "").await.unwrap_err();
        assert_eq!(error, FetchError::InvalidCredential);
    }
}
