//! Top-level `translate` entry point: chunk, arbitrate each group in order,
//! and stream the cumulative output to the sink.

use std::sync::Arc;
use std::time::Instant;

use crate::chunker::{Chunker, TranslatedGroup};
use crate::config::{ChunkMode, EngineConfig};
use crate::engine::arbitration::ArbitrationEngine;
use crate::provider::TranslatorRegistry;
use crate::request::TranslationRequest;
use crate::sink::IncrementalSink;

/// Translates whole texts group by group.
pub struct TranslationManager {
    engine: ArbitrationEngine,
    chunker: Chunker,
    failure_marker: String,
}

impl TranslationManager {
    pub fn new(engine: ArbitrationEngine, chunker: Chunker, failure_marker: impl Into<String>) -> Self {
        Self {
            engine,
            chunker,
            failure_marker: failure_marker.into(),
        }
    }

    pub fn from_config(registry: Arc<TranslatorRegistry>, config: &EngineConfig) -> Self {
        Self::new(
            ArbitrationEngine::new(registry, config.provider_timeout(), config.judge_timeout()),
            Chunker::from_config(config),
            config.failure_marker.clone(),
        )
    }

    /// Same manager with a different chunking mode.
    pub fn with_mode(mut self, mode: ChunkMode) -> Self {
        self.chunker = Chunker::new(
            mode,
            self.chunker.sentences_per_group(),
            self.chunker.units_per_group(),
        );
        self
    }

    pub fn failure_marker(&self) -> &str {
        &self.failure_marker
    }

    /// Translate `text` from `src` to `dst`.
    ///
    /// Always returns text: groups nobody could translate are replaced by the
    /// failure marker in place. When `src == dst` the input comes back
    /// untouched and no translator (or sink) is called.
    pub async fn translate(
        &self,
        text: &str,
        src: &str,
        dst: &str,
        sink: Option<&dyn IncrementalSink>,
    ) -> String {
        if src == dst {
            return text.to_string();
        }

        let groups = self.chunker.split(text);
        let mut done: Vec<TranslatedGroup> = Vec::with_capacity(groups.len());
        let started = Instant::now();

        for group in &groups {
            let group_started = Instant::now();
            let outcome = self.engine.arbitrate(&group.text, src, dst).await;

            if outcome.is_failure() {
                log::warn!(
                    "engine: group {} of {} has no valid translation",
                    group.index + 1,
                    groups.len()
                );
            }
            log::debug!(
                "engine: group {} of {} done in {:?}",
                group.index + 1,
                groups.len(),
                group_started.elapsed()
            );

            done.push(group.translated(outcome.text(&self.failure_marker)));

            if let Some(sink) = sink {
                sink.on_chunk_done(&self.chunker.join(&done));
            }
        }

        if !groups.is_empty() {
            log::info!(
                "engine: translated {} group(s) {src}->{dst} in {:?}",
                groups.len(),
                started.elapsed()
            );
        }

        self.chunker.join(&done)
    }

    /// Translate a prepared request, streaming into its sink.
    pub async fn run(&self, request: &TranslationRequest) -> String {
        self.translate(request.text(), request.src(), request.dst(), request.sink())
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
