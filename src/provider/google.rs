//! Networked translator backed by the public Google translate endpoint.
//!
//! Sends `GET <endpoint>?client=gtx&sl=<src>&tl=<dst>&dt=t&q=<text>` and
//! expects a JSON array of arrays: the first element of the response is a
//! list of segments, each segment's first element is a translated piece.
//! The pieces are concatenated in order.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::GoogleConfig;
use crate::provider::translator::{ProviderError, Translator};

/// HTTP client for the `translate_a/single` endpoint.
pub struct GoogleTranslator {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleTranslator {
    /// Build a translator from config.
    ///
    /// A default client is used if the builder fails.
    pub fn from_config(config: &GoogleConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, text: &str, src: &str, dst: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("client", self.config.client.as_str()),
                ("sl", src),
                ("tl", dst),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        join_segments(&json)
    }
}

/// Concatenate the translated pieces of a `translate_a/single` response.
///
/// ```
/// use lingua_relay::provider::google::join_segments;
///
/// let body = serde_json::json!([[["Bonjour. ", "Hello. "], ["Au revoir", "Bye"]], null, "en"]);
/// assert_eq!(join_segments(&body).unwrap(), "Bonjour. Au revoir");
/// ```
pub fn join_segments(json: &Value) -> Result<String, ProviderError> {
    let segments = json
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Parse("missing segment list".into()))?;

    let mut out = String::new();
    for segment in segments {
        let piece = segment
            .get(0)
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Parse(format!("malformed segment: {segment}")))?;
        out.push_str(piece);
    }

    if out.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
