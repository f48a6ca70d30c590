//! Multi-provider translation orchestrator.
//!
//! Text is cut into sentence groups ([`chunker`]); each group is sent to
//! every configured translator at once, a judge picks among the usable
//! answers ([`engine`]), and the growing output is streamed to a
//! [`sink::IncrementalSink`]. The [`session`] guard keeps superseded
//! requests from writing over newer ones.

pub mod app;
pub mod chunker;
pub mod config;
pub mod engine;
pub mod provider;
pub mod request;
pub mod session;
pub mod sink;
