//! Arbitration engine: per-group provider fan-out, judging, and ordered
//! streaming of the joined output.
//!
//! # Architecture
//!
//! ```text
//! TranslationManager::translate(text, src, dst, sink)
//!        │
//!        ├─ src == dst → return text (no provider calls)
//!        │
//!        ├─ Chunker::split → [group 0, group 1, ...]
//!        │
//!        └─ for each group, in order
//!              ├─ ArbitrationEngine::arbitrate   (concurrent fan-out + judge)
//!              ├─ append outcome (or failure marker)
//!              └─ sink.on_chunk_done(join(done so far))
//! ```

pub mod arbitration;
pub mod manager;
pub mod outcome;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use arbitration::ArbitrationEngine;
pub use manager::TranslationManager;
pub use outcome::{AbsentReason, ArbitrationOutcome, NamedResult, ProviderResult};
