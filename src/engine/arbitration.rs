//! Fan-out / fan-in arbitration for a single chunk group.
//!
//! # Flow
//!
//! ```text
//! group text
//!   ├─ tokio::spawn(google.translate)  ─┐  each bounded by
//!   ├─ tokio::spawn(marian.translate)  ─┤  provider_timeout
//!   │                                   ▼
//!   │              await every JoinHandle (no polling loop)
//!   │                                   │
//!   │              drop absent + echoed results
//!   │                                   │
//!   │        none left? ──yes──▶ Failed (judge not called)
//!   │                                   │ no
//!   │              judge.arbitrate, bounded by judge_timeout
//!   │                 ├─ Ok  ─▶ Judged
//!   │                 └─ Err ─▶ Fallback (first valid, priority order)
//! ```
//!
//! A translator that blows its timeout is abandoned: its future is dropped
//! (blocking work it started may still finish in the background, but the
//! result is never read).

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::outcome::{AbsentReason, ArbitrationOutcome, NamedResult, ProviderResult};
use crate::provider::{is_degenerate, Translator, TranslatorRegistry};

/// Runs one group through every translator and the judge.
pub struct ArbitrationEngine {
    registry: Arc<TranslatorRegistry>,
    provider_timeout: Duration,
    judge_timeout: Duration,
}

impl ArbitrationEngine {
    pub fn new(
        registry: Arc<TranslatorRegistry>,
        provider_timeout: Duration,
        judge_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            provider_timeout,
            judge_timeout,
        }
    }

    /// Produce the outcome for one translation unit.
    pub async fn arbitrate(&self, text: &str, src: &str, dst: &str) -> ArbitrationOutcome {
        let started = Instant::now();
        let results = self.fan_out(text, src, dst).await;

        let candidates: Vec<(&str, &str)> = results
            .iter()
            .filter_map(|r| {
                r.result
                    .as_translation()
                    .map(|t| (r.provider.as_str(), t))
            })
            .collect();

        log::debug!(
            "engine: {} of {} translator(s) usable after {:?}",
            candidates.len(),
            results.len(),
            started.elapsed()
        );

        let Some(&(first_provider, first_text)) = candidates.first() else {
            return ArbitrationOutcome::Failed;
        };

        let texts: Vec<String> = candidates.iter().map(|(_, t)| t.to_string()).collect();
        if let Some(answer) = self.judge(text, src, dst, texts).await {
            return ArbitrationOutcome::Judged(answer);
        }

        ArbitrationOutcome::Fallback {
            provider: first_provider.to_string(),
            text: first_text.to_string(),
        }
    }

    /// Call every translator concurrently; results come back in priority
    /// order regardless of completion order.
    pub async fn fan_out(&self, text: &str, src: &str, dst: &str) -> Vec<NamedResult> {
        let handles: Vec<_> = self
            .registry
            .translators()
            .iter()
            .map(|translator| {
                let name = translator.name().to_string();
                let handle = tokio::spawn(call_translator(
                    Arc::clone(translator),
                    text.to_string(),
                    src.to_string(),
                    dst.to_string(),
                    self.provider_timeout,
                ));
                (name, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (provider, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("engine: {provider} task ended abnormally: {e}");
                    ProviderResult::Absent(AbsentReason::Panicked)
                }
            };
            results.push(NamedResult { provider, result });
        }
        results
    }

    /// Ask the judge to choose; `None` when there is no judge or it fails.
    async fn judge(&self, text: &str, src: &str, dst: &str, candidates: Vec<String>) -> Option<String> {
        let judge = Arc::clone(self.registry.judge()?);
        let name = judge.name().to_string();
        let (text, src, dst) = (text.to_string(), src.to_string(), dst.to_string());
        let timeout = self.judge_timeout;

        let handle = tokio::spawn(async move {
            tokio::time::timeout(timeout, judge.arbitrate(&text, &src, &dst, &candidates)).await
        });

        match handle.await {
            Ok(Ok(Ok(answer))) if !answer.trim().is_empty() => Some(answer),
            Ok(Ok(Ok(_))) => {
                log::warn!("engine: judge {name} returned a blank answer");
                None
            }
            Ok(Ok(Err(e))) => {
                log::warn!("engine: judge {name} failed: {e}");
                None
            }
            Ok(Err(_)) => {
                log::warn!("engine: judge {name} timed out after {timeout:?}");
                None
            }
            Err(e) => {
                log::warn!("engine: judge {name} task ended abnormally: {e}");
                None
            }
        }
    }
}

/// One bounded translator call, with every failure folded into `Absent`.
async fn call_translator(
    translator: Arc<dyn Translator>,
    text: String,
    src: String,
    dst: String,
    timeout: Duration,
) -> ProviderResult {
    let name = translator.name();

    match tokio::time::timeout(timeout, translator.translate(&text, &src, &dst)).await {
        Ok(Ok(translated)) if is_degenerate(&text, &translated) => {
            log::debug!("engine: {name} returned the source unchanged");
            ProviderResult::Absent(AbsentReason::Degenerate)
        }
        Ok(Ok(translated)) => ProviderResult::Translated(translated),
        Ok(Err(e)) => {
            log::warn!("engine: {name} failed: {e}");
            ProviderResult::Absent(AbsentReason::Failed(e.to_string()))
        }
        Err(_) => {
            log::warn!("engine: {name} timed out after {timeout:?}");
            ProviderResult::Absent(AbsentReason::Timeout)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
