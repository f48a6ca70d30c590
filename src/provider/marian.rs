//! Local-model translator with a per-language-pair model cache.
//!
//! [`MarianTranslator`] asks a [`ModelLoader`] for a [`Seq2SeqModel`] the
//! first time a `(src, dst)` pair is used and keeps it for the lifetime of
//! the process. Loading and generation are blocking, so both run on
//! `tokio::task::spawn_blocking`.
//!
//! The cache tolerates concurrent first use of the same pair: loads happen
//! outside the lock and the first model inserted wins, so the worst case is
//! a redundant load whose result is dropped.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::provider::translator::{ProviderError, Translator};

// ---------------------------------------------------------------------------
// Model traits
// ---------------------------------------------------------------------------

/// A loaded sequence-to-sequence model for one language pair.
pub trait Seq2SeqModel: Send + Sync {
    /// Translate `text`. Blocking; called from the blocking thread pool.
    fn generate(&self, text: &str) -> Result<String, ProviderError>;
}

/// Fetches and loads models on demand.
pub trait ModelLoader: Send + Sync {
    /// Load the model translating `src` into `dst`. Blocking.
    fn load(&self, src: &str, dst: &str) -> Result<Arc<dyn Seq2SeqModel>, ProviderError>;
}

type ModelCache = HashMap<(String, String), Arc<dyn Seq2SeqModel>>;

// ---------------------------------------------------------------------------
// MarianTranslator
// ---------------------------------------------------------------------------

/// In-process translator backed by lazily loaded per-pair models.
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct MarianTranslator {
    loader: Arc<dyn ModelLoader>,
    models: Arc<RwLock<ModelCache>>,
}

impl MarianTranslator {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            models: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Eagerly load `pairs`, logging (not returning) failures.
    ///
    /// Identity pairs are skipped. Blocking.
    pub fn preload(&self, pairs: &[(String, String)]) {
        for (src, dst) in pairs {
            if src == dst {
                continue;
            }
            if let Err(e) = self.model_for(src, dst) {
                log::warn!("marian: preload of {src}-{dst} failed: {e}");
            }
        }
    }

    /// Number of cached language pairs.
    pub fn cached_pairs(&self) -> usize {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Return the cached model for the pair, loading it on a miss. Blocking.
    pub fn model_for(&self, src: &str, dst: &str) -> Result<Arc<dyn Seq2SeqModel>, ProviderError> {
        let key = (src.to_string(), dst.to_string());

        if let Some(model) = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(model));
        }

        log::info!("marian: loading model {src}-{dst}");
        let loaded = self.loader.load(src, dst)?;

        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        let model = models.entry(key).or_insert(loaded);
        Ok(Arc::clone(model))
    }
}

#[async_trait]
impl Translator for MarianTranslator {
    fn name(&self) -> &str {
        "marian"
    }

    async fn translate(&self, text: &str, src: &str, dst: &str) -> Result<String, ProviderError> {
        if src == dst {
            return Ok(text.to_string());
        }

        let this = self.clone();
        let (text, src, dst) = (text.to_string(), src.to_string(), dst.to_string());

        tokio::task::spawn_blocking(move || {
            let model = this.model_for(&src, &dst)?;
            model.generate(&text)
        })
        .await
        .map_err(|e| ProviderError::Inference(format!("model task failed: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Model that upper-cases its input and tags it with the pair.
    struct UpperModel(String);

    impl Seq2SeqModel for UpperModel {
        fn generate(&self, text: &str) -> Result<String, ProviderError> {
            Ok(format!("[{}] {}", self.0, text.to_uppercase()))
        }
    }

    /// Loader that counts loads and optionally refuses some pairs.
    struct CountingLoader {
        loads: AtomicUsize,
        delay: Duration,
        refuse: Option<(&'static str, &'static str)>,
    }

    impl CountingLoader {
        fn new() -> Self {
            Self {
                loads: AtomicUsize::new(0),
                delay: Duration::ZERO,
                refuse: None,
            }
        }
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, src: &str, dst: &str) -> Result<Arc<dyn Seq2SeqModel>, ProviderError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            if self.refuse == Some((src, dst)) {
                return Err(ProviderError::ModelLoad {
                    pair: format!("{src}-{dst}"),
                    reason: "not published".into(),
                });
            }
            Ok(Arc::new(UpperModel(format!("{src}-{dst}"))))
        }
    }

    #[tokio::test]
    async fn identity_pair_returns_input_without_loading() {
        let loader = Arc::new(CountingLoader::new());
        let marian = MarianTranslator::new(loader.clone());

        let out = marian.translate("hello", "en", "en").await.unwrap();
        assert_eq!(out, "hello");
        assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_is_loaded_once_per_pair() {
        let loader = Arc::new(CountingLoader::new());
        let marian = MarianTranslator::new(loader.clone());

        let a = marian.translate("hi", "en", "ur").await.unwrap();
        let b = marian.translate("bye", "en", "ur").await.unwrap();
        let c = marian.translate("hi", "ur", "en").await.unwrap();

        assert_eq!(a, "[en-ur] HI");
        assert_eq!(b, "[en-ur] BYE");
        assert_eq!(c, "[ur-en] HI");
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert_eq!(marian.cached_pairs(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_use_leaves_one_cached_model() {
        let loader = Arc::new(CountingLoader {
            delay: Duration::from_millis(50),
            ..CountingLoader::new()
        });
        let marian = MarianTranslator::new(loader.clone());

        let mut handles = Vec::new();
        for i in 0..8 {
            let m = marian.clone();
            handles.push(tokio::spawn(async move {
                m.translate(&format!("t{i}"), "en", "ar").await
            }));
        }
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.await.unwrap().unwrap(), format!("[en-ar] T{i}"));
        }

        let loads = loader.loads.load(Ordering::SeqCst);
        assert!((1..=8).contains(&loads));
        assert_eq!(marian.cached_pairs(), 1);
    }

    #[tokio::test]
    async fn load_failure_is_an_error_and_not_cached() {
        let loader = Arc::new(CountingLoader {
            refuse: Some(("en", "xx")),
            ..CountingLoader::new()
        });
        let marian = MarianTranslator::new(loader.clone());

        let err = marian.translate("hi", "en", "xx").await.unwrap_err();
        assert!(matches!(err, ProviderError::ModelLoad { .. }));
        assert_eq!(marian.cached_pairs(), 0);

        // A later call retries the load.
        let _ = marian.translate("hi", "en", "xx").await;
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn preload_skips_identity_and_survives_failures() {
        let loader = Arc::new(CountingLoader {
            refuse: Some(("ur", "en")),
            ..CountingLoader::new()
        });
        let marian = MarianTranslator::new(loader.clone());

        marian.preload(&[
            ("en".into(), "ur".into()),
            ("ur".into(), "en".into()),
            ("en".into(), "en".into()),
        ]);

        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert_eq!(marian.cached_pairs(), 1);
    }
}
