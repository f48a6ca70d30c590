//! Request identity, shared language selection, and the live text session.

pub mod events;
pub mod guard;
pub mod live;

pub use events::{LanguageState, SessionEvent};
pub use guard::{GuardedSink, SessionGuard, SessionToken};
pub use live::{LiveInput, LiveSession};
