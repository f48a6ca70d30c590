//! Core `Translator` / `Judge` traits and the shared `ProviderError`.
//!
//! Every backend (networked service, local model, command-line judge)
//! implements [`Translator`]; the judge additionally implements [`Judge`].
//! Errors are typed here but never escape the arbitration engine; it turns
//! every `Err(_)` into an absent result for the group being translated.

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// Errors that can occur inside a single translator call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The call did not complete within its timeout.
    #[error("translator timed out")]
    Timeout,

    /// The service answered with a non-success status code.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The response body did not have the expected shape.
    #[error("failed to parse translator response: {0}")]
    Parse(String),

    /// The backend answered but produced no usable text.
    #[error("translator returned an empty response")]
    EmptyResponse,

    /// The judge was asked to arbitrate without any valid candidate.
    #[error("no valid candidates to arbitrate")]
    NoCandidates,

    /// The judge process could not be started or talked to.
    #[error("failed to run judge process: {0}")]
    Spawn(String),

    /// A local model could not be fetched or loaded.
    #[error("failed to load model {pair}: {reason}")]
    ModelLoad { pair: String, reason: String },

    /// The local model failed while generating.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Translator / Judge traits
// ---------------------------------------------------------------------------

/// Uniform translation capability.
///
/// Implementors must be `Send + Sync` so the engine can hold them behind
/// `Arc<dyn Translator>` and call them from spawned tasks. Language codes are
/// short identifiers (`"en"`, `"ar"`, `"ur"`) passed through unchanged.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Stable short name used in logs and fallback outcomes.
    fn name(&self) -> &str;

    async fn translate(&self, text: &str, src: &str, dst: &str) -> Result<String, ProviderError>;
}

/// Selects the best of several candidate translations.
#[async_trait]
pub trait Judge: Send + Sync {
    fn name(&self) -> &str;

    /// Pick (or refine) a translation of `text` among `candidates`.
    ///
    /// Implementations return [`ProviderError::NoCandidates`] without doing
    /// any work when no candidate survives [`valid_candidates`].
    async fn arbitrate(
        &self,
        text: &str,
        src: &str,
        dst: &str,
        candidates: &[String],
    ) -> Result<String, ProviderError>;
}

// ---------------------------------------------------------------------------
// Candidate filtering
// ---------------------------------------------------------------------------

/// Lower-cased text with all whitespace runs collapsed to single spaces.
///
/// ```
/// use lingua_relay::provider::normalize;
///
/// assert_eq!(normalize("  Hello \n  World "), "hello world");
/// ```
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `true` when `candidate` is empty or merely echoes `source`.
///
/// An echo means the upstream translator silently gave up, so it is a soft
/// failure rather than a translation.
pub fn is_degenerate(source: &str, candidate: &str) -> bool {
    let candidate = normalize(candidate);
    candidate.is_empty() || candidate == normalize(source)
}

/// Keep the non-degenerate candidates, preserving their order.
pub fn valid_candidates<'a, I>(source: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter(|c| !is_degenerate(source, c))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
