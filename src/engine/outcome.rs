//! Per-provider results and the per-group arbitration outcome.

use std::fmt;

/// Why a translator contributed nothing for a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsentReason {
    /// The call exceeded the per-provider timeout and was abandoned.
    Timeout,
    /// The backend reported an error.
    Failed(String),
    /// The backend echoed the source text back (modulo case/whitespace).
    Degenerate,
    /// The task running the call panicked.
    Panicked,
}

impl fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbsentReason::Timeout => write!(f, "timed out"),
            AbsentReason::Failed(msg) => write!(f, "failed: {msg}"),
            AbsentReason::Degenerate => write!(f, "returned the source unchanged"),
            AbsentReason::Panicked => write!(f, "task panicked"),
        }
    }
}

/// One translator's outcome for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResult {
    Translated(String),
    Absent(AbsentReason),
}

impl ProviderResult {
    pub fn as_translation(&self) -> Option<&str> {
        match self {
            ProviderResult::Translated(text) => Some(text),
            ProviderResult::Absent(_) => None,
        }
    }
}

/// A translator's result labelled with the translator's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedResult {
    pub provider: String,
    pub result: ProviderResult,
}

/// Final decision for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationOutcome {
    /// The judge picked (or produced) this text.
    Judged(String),
    /// The judge was unavailable or failed; the highest-priority valid
    /// translation was used.
    Fallback { provider: String, text: String },
    /// No translator produced a usable result.
    Failed,
}

impl ArbitrationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ArbitrationOutcome::Failed)
    }

    /// The text to place in the output, `failure_marker` for failures.
    pub fn text<'a>(&'a self, failure_marker: &'a str) -> &'a str {
        match self {
            ArbitrationOutcome::Judged(text) => text,
            ArbitrationOutcome::Fallback { text, .. } => text,
            ArbitrationOutcome::Failed => failure_marker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_renders_marker() {
        assert_eq!(ArbitrationOutcome::Failed.text("X"), "X");
        assert!(ArbitrationOutcome::Failed.is_failure());
    }

    #[test]
    fn chosen_text_ignores_marker() {
        let judged = ArbitrationOutcome::Judged("Bonjour".into());
        let fallback = ArbitrationOutcome::Fallback {
            provider: "google".into(),
            text: "Salut".into(),
        };
        assert_eq!(judged.text("X"), "Bonjour");
        assert_eq!(fallback.text("X"), "Salut");
        assert!(!fallback.is_failure());
    }

    #[test]
    fn absent_reason_display() {
        assert_eq!(AbsentReason::Timeout.to_string(), "timed out");
        assert_eq!(
            AbsentReason::Failed("HTTP 500".into()).to_string(),
            "failed: HTTP 500"
        );
    }
}
