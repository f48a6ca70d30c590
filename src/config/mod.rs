//! Configuration module for lingua-relay.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the engine and
//! each translator backend, `AppPaths` for cross-platform data directories,
//! and TOML persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, ChunkMode, EngineConfig, GoogleConfig, JudgeConfig, LanguageConfig, LanguageEntry,
    LiveConfig, MarianConfig,
};
