//! Application context: the one place that owns configuration, the lazily
//! built translator registry, the session guard, and language selection.
//!
//! # Architecture
//!
//! ```text
//! AppContext (Arc, created once in main)
//!   ├─ config       AppConfig
//!   ├─ manager      OnceCell<TranslationManager>  ← registry built on first
//!   │                                               use (spawn_blocking)
//!   ├─ session      SessionGuard                  ← current request token
//!   └─ languages    LanguageState                 ← pair + SessionEvent bus
//!
//! submit(text, sink)
//!   ├─ session.begin()        → token N is current
//!   ├─ guard(sink, N)
//!   └─ tokio::spawn(translate) → TranslationHandle
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::engine::TranslationManager;
use crate::provider::TranslatorRegistry;
use crate::request::TranslationRequest;
use crate::session::{LanguageState, SessionGuard, SessionToken};
use crate::sink::IncrementalSink;

pub struct AppContext {
    config: AppConfig,
    manager: OnceCell<Arc<TranslationManager>>,
    session: SessionGuard,
    languages: LanguageState,
}

impl AppContext {
    /// Context whose translators are built from `config` on first use.
    pub fn new(config: AppConfig) -> Self {
        Self::with_manager(config, OnceCell::new())
    }

    /// Context using an already built registry.
    pub fn with_registry(config: AppConfig, registry: Arc<TranslatorRegistry>) -> Self {
        let manager = TranslationManager::from_config(registry, &config.engine);
        Self::with_manager(config, OnceCell::new_with(Some(Arc::new(manager))))
    }

    fn with_manager(config: AppConfig, manager: OnceCell<Arc<TranslationManager>>) -> Self {
        let languages = LanguageState::new(config.languages.clone());
        Self {
            config,
            manager,
            session: SessionGuard::new(),
            languages,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    pub fn languages(&self) -> &LanguageState {
        &self.languages
    }

    /// The translation manager, building the registry on first call.
    ///
    /// Registry construction may download and load models, so it runs on
    /// the blocking pool.
    pub async fn manager(&self) -> Result<Arc<TranslationManager>> {
        self.manager
            .get_or_try_init(|| async {
                log::info!("app: building translator registry");
                let config = self.config.clone();
                let registry = tokio::task::spawn_blocking(move || TranslatorRegistry::from_config(&config))
                    .await
                    .context("translator registry construction panicked")?;
                Ok::<_, anyhow::Error>(Arc::new(TranslationManager::from_config(
                    Arc::new(registry),
                    &self.config.engine,
                )))
            })
            .await
            .cloned()
    }

    /// Translate `text` directly, outside the session guard.
    ///
    /// Same-language requests return the input without building the
    /// registry.
    pub async fn translate(
        &self,
        text: &str,
        src: &str,
        dst: &str,
        sink: Option<&dyn IncrementalSink>,
    ) -> Result<String> {
        if src == dst {
            return Ok(text.to_string());
        }
        Ok(self.manager().await?.translate(text, src, dst, sink).await)
    }

    /// Translate a prepared request.
    pub async fn run(&self, request: &TranslationRequest) -> Result<String> {
        if request.src() == request.dst() {
            return Ok(request.text().to_string());
        }
        Ok(self.manager().await?.run(request).await)
    }

    /// Start a background translation of `text` with the currently selected
    /// languages. Its token becomes current before this returns, so partial
    /// results of any earlier submission are dropped from here on.
    pub fn submit(
        self: &Arc<Self>,
        text: impl Into<String>,
        sink: Option<Arc<dyn IncrementalSink>>,
    ) -> TranslationHandle {
        let token = self.session.begin();
        let (src, dst) = self.languages.current();

        let mut request = TranslationRequest::new(text, src, dst, token);
        if let Some(sink) = sink {
            request = request.with_sink(Arc::new(self.session.guard(token, sink)));
        }
        log::debug!("app: submitted {request:?}");

        let ctx = Arc::clone(self);
        let task = tokio::spawn(async move { ctx.run(&request).await });

        TranslationHandle {
            token,
            session: self.session.clone(),
            task,
        }
    }
}

/// A background translation started by [`AppContext::submit`].
pub struct TranslationHandle {
    token: SessionToken,
    session: SessionGuard,
    task: JoinHandle<Result<String>>,
}

impl TranslationHandle {
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// True once a newer request has started.
    pub fn is_stale(&self) -> bool {
        !self.session.is_current(self.token)
    }

    /// Wait for the final text. Stale requests still complete.
    pub async fn wait(self) -> Result<String> {
        self.task.await.context("translation task panicked")?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderError, Translator};
    use crate::sink::ChannelSink;
    use async_trait::async_trait;

    struct Reversing;

    #[async_trait]
    impl Translator for Reversing {
        fn name(&self) -> &str {
            "reversing"
        }

        async fn translate(&self, text: &str, _s: &str, _d: &str) -> Result<String, ProviderError> {
            Ok(text.chars().rev().collect())
        }
    }

    fn context() -> Arc<AppContext> {
        let mut config = AppConfig::default();
        config.languages.to = "ur".into();
        let registry = TranslatorRegistry::new(vec![Arc::new(Reversing)], None);
        Arc::new(AppContext::with_registry(config, Arc::new(registry)))
    }

    #[tokio::test]
    async fn same_language_does_not_build_registry() {
        // Every backend enabled: building would try the network and models.
        let ctx = AppContext::new(AppConfig::default());
        let out = ctx.translate("Hello.", "en", "en", None).await.unwrap();
        assert_eq!(out, "Hello.");
        assert!(ctx.manager.get().is_none());
    }

    #[tokio::test]
    async fn submit_uses_selected_languages() {
        let ctx = context();
        let (sink, mut rx) = ChannelSink::new();

        let handle = ctx.submit("abc.", Some(Arc::new(sink)));
        assert!(!handle.is_stale());

        assert_eq!(handle.wait().await.unwrap(), ".cba");
        assert_eq!(rx.recv().await.as_deref(), Some(".cba"));
    }

    #[tokio::test]
    async fn newer_submission_makes_older_stale() {
        let ctx = context();
        let first = ctx.submit("one.", None);
        let second = ctx.submit("two.", None);

        assert!(first.is_stale());
        assert!(!second.is_stale());
        // Superseded work still finishes.
        assert_eq!(first.wait().await.unwrap(), ".eno");
        assert_eq!(second.wait().await.unwrap(), ".owt");
    }

    #[tokio::test]
    async fn same_language_submission_returns_input() {
        let ctx = context();
        ctx.languages().set_languages("ur", "ur");
        let handle = ctx.submit("as is.", None);
        assert_eq!(handle.wait().await.unwrap(), "as is.");
    }
}
