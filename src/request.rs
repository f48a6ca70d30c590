//! The immutable description of one translation action.

use std::fmt;
use std::sync::Arc;

use crate::session::SessionToken;
use crate::sink::IncrementalSink;

/// One user-initiated translation. Never mutated after construction.
#[derive(Clone)]
pub struct TranslationRequest {
    text: String,
    src: String,
    dst: String,
    sink: Option<Arc<dyn IncrementalSink>>,
    token: SessionToken,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
        token: SessionToken,
    ) -> Self {
        Self {
            text: text.into(),
            src: src.into(),
            dst: dst.into(),
            sink: None,
            token,
        }
    }

    /// Attach the sink that receives partial output.
    pub fn with_sink(mut self, sink: Arc<dyn IncrementalSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn dst(&self) -> &str {
        &self.dst
    }

    pub fn sink(&self) -> Option<&dyn IncrementalSink> {
        self.sink.as_deref()
    }
}

impl fmt::Debug for TranslationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationRequest")
            .field("token", &self.token)
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("text_len", &self.text.len())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
