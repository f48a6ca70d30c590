//! Debounced translate-as-you-type session.
//!
//! # Flow
//!
//! ```text
//! LiveInput::TextChanged ──▶ remember text, (re)arm debounce timer
//! debounce elapsed       ──▶ translate, unless blank or already translated
//! LiveInput::TranslateNow ─▶ translate immediately, even if unchanged
//! LanguageChanged        ──▶ translate the current text for the new pair
//! PageReset              ──▶ forget everything, silence in-flight requests
//! ```
//!
//! Each translation goes through [`AppContext::submit`], so a newer request
//! always silences an older one still running.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::app::AppContext;
use crate::session::events::SessionEvent;
use crate::sink::IncrementalSink;

/// Input from the page that owns the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveInput {
    /// The edited text changed.
    TextChanged(String),
    /// Explicit request to translate right away.
    TranslateNow,
}

/// What was last sent for translation: trimmed text plus the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Submitted {
    text: String,
    from: String,
    to: String,
}

/// State of one live text page.
pub struct LiveSession {
    ctx: Arc<AppContext>,
    sink: Arc<dyn IncrementalSink>,
    debounce: Duration,
    text: String,
    last: Option<Submitted>,
    deadline: Option<Instant>,
}

impl LiveSession {
    pub fn new(ctx: Arc<AppContext>, sink: Arc<dyn IncrementalSink>) -> Self {
        let debounce = Duration::from_millis(ctx.config().live.debounce_ms);
        Self {
            ctx,
            sink,
            debounce,
            text: String::new(),
            last: None,
            deadline: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Run the session on its own task. Dropping the returned sender ends it.
    pub fn spawn(self) -> (mpsc::Sender<LiveInput>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(self.run(rx));
        (tx, handle)
    }

    /// Drive the session until `inputs` is closed.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<LiveInput>) {
        let mut events = self.ctx.languages().subscribe();

        loop {
            // A disabled branch still evaluates its future, so give it a
            // deadline that is never awaited.
            let deadline = self.deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                input = inputs.recv() => match input {
                    Some(LiveInput::TextChanged(text)) => {
                        self.text = text;
                        self.deadline = Some(Instant::now() + self.debounce);
                    }
                    Some(LiveInput::TranslateNow) => {
                        self.deadline = None;
                        self.translate(true);
                    }
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(SessionEvent::LanguageChanged { .. }) => self.translate(false),
                    Ok(SessionEvent::PageReset) => self.reset(),
                    Err(RecvError::Lagged(n)) => {
                        log::warn!("live: missed {n} session event(s)");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = sleep_until(deadline), if self.deadline.is_some() => {
                    self.deadline = None;
                    self.translate(false);
                }
            }
        }

        log::debug!("live: session closed");
    }

    fn translate(&mut self, force: bool) {
        let text = self.text.trim();
        if text.is_empty() {
            return;
        }

        let (from, to) = self.ctx.languages().current();
        let submitted = Submitted {
            text: text.to_string(),
            from,
            to,
        };
        if !force && self.last.as_ref() == Some(&submitted) {
            log::trace!("live: text unchanged, skipping");
            return;
        }

        log::debug!(
            "live: translating {} char(s) {}->{}",
            submitted.text.chars().count(),
            submitted.from,
            submitted.to
        );

        let handle = self
            .ctx
            .submit(submitted.text.clone(), Some(Arc::clone(&self.sink)));
        // The final text also covers same-language requests, which stream
        // nothing.
        let last_write = self.ctx.session().guard(handle.token(), Arc::clone(&self.sink));
        tokio::spawn(async move {
            match handle.wait().await {
                Ok(text) => last_write.on_chunk_done(&text),
                Err(e) => log::warn!("live: translation failed: {e:#}"),
            }
        });

        self.last = Some(submitted);
    }

    fn reset(&mut self) {
        self.text.clear();
        self.last = None;
        self.deadline = None;
        self.ctx.session().invalidate();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::provider::{ProviderError, Translator, TranslatorRegistry};
    use crate::sink::ChannelSink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tags its input with the destination code.
    struct Tagging {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Translator for Tagging {
        fn name(&self) -> &str {
            "tagging"
        }

        async fn translate(&self, text: &str, _s: &str, dst: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{dst}:{text}"))
        }
    }

    fn context(calls: Arc<AtomicUsize>) -> Arc<AppContext> {
        let mut config = AppConfig::default();
        config.languages.to = "fr".into();
        let registry = TranslatorRegistry::new(vec![Arc::new(Tagging { calls })], None);
        Arc::new(AppContext::with_registry(config, Arc::new(registry)))
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn typing_is_debounced() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = context(calls.clone());
        let (sink, mut rx) = ChannelSink::new();
        let (tx, _task) = LiveSession::new(ctx, Arc::new(sink))
            .with_debounce(Duration::from_millis(50))
            .spawn();

        tx.send(LiveInput::TextChanged("He".into())).await.unwrap();
        tx.send(LiveInput::TextChanged("Hello.".into())).await.unwrap();

        assert_eq!(next(&mut rx).await.as_deref(), Some("fr:Hello."));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_and_unchanged_text_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = context(calls.clone());
        let (sink, mut rx) = ChannelSink::new();
        let (tx, _task) = LiveSession::new(ctx, Arc::new(sink))
            .with_debounce(Duration::from_millis(20))
            .spawn();

        tx.send(LiveInput::TextChanged("   ".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tx.send(LiveInput::TextChanged("Hi.".into())).await.unwrap();
        assert_eq!(next(&mut rx).await.as_deref(), Some("fr:Hi."));
        // Partial and final writes carry the same text.
        assert_eq!(next(&mut rx).await.as_deref(), Some("fr:Hi."));

        tx.send(LiveInput::TextChanged(" Hi. ".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn language_change_retranslates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = context(calls.clone());
        let (sink, mut rx) = ChannelSink::new();
        let (tx, _task) = LiveSession::new(Arc::clone(&ctx), Arc::new(sink))
            .with_debounce(Duration::from_millis(20))
            .spawn();

        tx.send(LiveInput::TextChanged("Hi.".into())).await.unwrap();
        assert_eq!(next(&mut rx).await.as_deref(), Some("fr:Hi."));

        ctx.languages().set_languages("en", "ur");

        let mut seen = Vec::new();
        while let Some(partial) = next(&mut rx).await {
            seen.push(partial);
            if seen.last().map(String::as_str) == Some("ur:Hi.") {
                break;
            }
        }
        assert_eq!(seen.last().map(String::as_str), Some("ur:Hi."));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn translate_now_ignores_debounce() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = context(calls.clone());
        let (sink, mut rx) = ChannelSink::new();
        let (tx, _task) = LiveSession::new(ctx, Arc::new(sink))
            .with_debounce(Duration::from_secs(60))
            .spawn();

        tx.send(LiveInput::TextChanged("Now.".into())).await.unwrap();
        tx.send(LiveInput::TranslateNow).await.unwrap();

        assert_eq!(next(&mut rx).await.as_deref(), Some("fr:Now."));
    }

    #[tokio::test]
    async fn page_reset_cancels_pending_translation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = context(calls.clone());
        let (sink, mut rx) = ChannelSink::new();
        let (tx, _task) = LiveSession::new(Arc::clone(&ctx), Arc::new(sink))
            .with_debounce(Duration::from_millis(100))
            .spawn();

        tx.send(LiveInput::TextChanged("Gone.".into())).await.unwrap();
        // Let the session pick up the text before resetting.
        tokio::time::sleep(Duration::from_millis(20)).await;
        ctx.languages().reset_page();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }
}
