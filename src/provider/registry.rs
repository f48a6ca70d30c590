//! The fixed set of translators the engine fans out to, plus the judge.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::provider::google::GoogleTranslator;
use crate::provider::judge::LlamaJudge;
use crate::provider::marian::MarianTranslator;
use crate::provider::model::MarianLoader;
use crate::provider::translator::{Judge, Translator};

/// Translators in priority order plus an optional judge.
///
/// Priority order decides the fallback pick when the judge fails: the first
/// non-degenerate translation wins.
pub struct TranslatorRegistry {
    translators: Vec<Arc<dyn Translator>>,
    judge: Option<Arc<dyn Judge>>,
}

impl TranslatorRegistry {
    pub fn new(translators: Vec<Arc<dyn Translator>>, judge: Option<Arc<dyn Judge>>) -> Self {
        Self { translators, judge }
    }

    /// Build the production registry: Google first, Marian second, the
    /// command-line judge last. Disabled backends are left out.
    ///
    /// Configured Marian pairs are preloaded here, so this blocks; call it
    /// from a blocking context.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut translators: Vec<Arc<dyn Translator>> = Vec::new();

        if config.google.enabled {
            translators.push(Arc::new(GoogleTranslator::from_config(&config.google)));
        }

        if config.marian.enabled {
            let loader = Arc::new(MarianLoader::from_config(&config.marian));
            let marian = MarianTranslator::new(loader);
            marian.preload(&config.marian.preload_pairs);
            translators.push(Arc::new(marian));
        }

        let judge: Option<Arc<dyn Judge>> = if config.judge.enabled {
            Some(Arc::new(LlamaJudge::from_config(&config.judge)))
        } else {
            None
        };

        log::info!(
            "registry: {} translator(s), judge {}",
            translators.len(),
            if judge.is_some() { "enabled" } else { "disabled" }
        );

        Self { translators, judge }
    }

    pub fn translators(&self) -> &[Arc<dyn Translator>] {
        &self.translators
    }

    pub fn judge(&self) -> Option<&Arc<dyn Judge>> {
        self.judge.as_ref()
    }
}
