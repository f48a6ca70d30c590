//! Request identity: only the most recently started request may write.
//!
//! ```text
//! begin() → token 1 ─┐
//!                    │  GuardedSink(1).on_chunk_done  → forwarded
//! begin() → token 2 ─┤
//!                    │  GuardedSink(1).on_chunk_done  → dropped
//!                    └  GuardedSink(2).on_chunk_done  → forwarded
//! ```
//!
//! The token check and the forward happen under the same lock that
//! [`SessionGuard::begin`] takes, so once `begin` returns no write tagged
//! with an older token can be observed. The check travels with the write:
//! a queueing sink such as [`CallbackSink`](crate::sink::CallbackSink)
//! performs it when the write is delivered, not when it is queued.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::sink::{DeliveryGate, IncrementalSink};

/// Identity of one request. Tokens only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl SessionToken {
    /// The token current before any request has started.
    pub fn initial() -> Self {
        Self(0)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Holds the process-wide current token.
#[derive(Debug, Clone, Default)]
pub struct SessionGuard {
    current: Arc<Mutex<u64>>,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request; its token becomes current immediately.
    pub fn begin(&self) -> SessionToken {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current += 1;
        log::trace!("session: request #{} is now current", *current);
        SessionToken(*current)
    }

    pub fn current(&self) -> SessionToken {
        SessionToken(*self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_current(&self, token: SessionToken) -> bool {
        self.current() == token
    }

    /// Make every outstanding token stale without starting a request.
    pub fn invalidate(&self) {
        self.begin();
    }

    /// Wrap `inner` so it only receives writes while `token` is current.
    pub fn guard(&self, token: SessionToken, inner: Arc<dyn IncrementalSink>) -> GuardedSink {
        GuardedSink {
            gate: Arc::new(TokenGate {
                token,
                current: Arc::clone(&self.current),
            }),
            inner,
        }
    }
}

/// Lets a write through only while its token is current.
struct TokenGate {
    token: SessionToken,
    current: Arc<Mutex<u64>>,
}

impl DeliveryGate for TokenGate {
    fn pass(&self, deliver: &mut dyn FnMut()) -> bool {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == self.token.0 {
            deliver();
            true
        } else {
            log::trace!(
                "session: dropping partial from stale request {} (current #{})",
                self.token,
                *current
            );
            false
        }
    }
}

/// Sink that silently drops writes from superseded requests.
pub struct GuardedSink {
    gate: Arc<TokenGate>,
    inner: Arc<dyn IncrementalSink>,
}

impl IncrementalSink for GuardedSink {
    fn on_chunk_done(&self, partial: &str) {
        let gate: Arc<dyn DeliveryGate> = self.gate.clone();
        self.inner.on_gated_chunk_done(partial, gate);
    }
}
