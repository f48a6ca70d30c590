//! Translation backends.
//!
//! This module provides:
//! * [`Translator`] / [`Judge`] — async traits every backend implements.
//! * [`GoogleTranslator`] — networked client for the public Google endpoint.
//! * [`MarianTranslator`] — in-process opus-mt models, cached per pair.
//! * [`LlamaJudge`] — command-line LLM that picks among candidates.
//! * [`TranslatorRegistry`] — the fixed, priority-ordered set the engine uses.
//! * [`ProviderError`] — error variants for a single backend call.

pub mod google;
pub mod judge;
pub mod marian;
pub mod model;
pub mod prompt;
pub mod registry;
pub mod translator;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use google::GoogleTranslator;
pub use judge::LlamaJudge;
pub use marian::{MarianTranslator, ModelLoader, Seq2SeqModel};
pub use model::{MarianLoader, MarianModel};
pub use registry::TranslatorRegistry;
pub use translator::{is_degenerate, normalize, valid_candidates, Judge, ProviderError, Translator};
