//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ChunkMode
// ---------------------------------------------------------------------------

/// Selects how input text is cut into translation groups.
///
/// | Variant   | Grouping                                         | Output separator        |
/// |-----------|--------------------------------------------------|-------------------------|
/// | Paragraph | sentences grouped inside their own paragraph     | `" "` / `"\n\n"`        |
/// | Flat      | sentences packed into units, units into groups   | `"\n\n"` between groups |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMode {
    /// Groups never cross a blank-line paragraph boundary.
    Paragraph,
    /// Quick page-level batching; groups may span paragraphs.
    Flat,
}

impl Default for ChunkMode {
    fn default() -> Self {
        Self::Paragraph
    }
}

// ---------------------------------------------------------------------------
// LanguageConfig
// ---------------------------------------------------------------------------

/// A selectable language: display label plus the short code sent to
/// translators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub label: String,
    pub code: String,
}

impl LanguageEntry {
    fn new(label: &str, code: &str) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
        }
    }
}

/// Language selector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Source language code selected at startup.
    pub from: String,
    /// Destination language code selected at startup.
    pub to: String,
    /// Languages offered to the user, in display order.
    pub catalog: Vec<LanguageEntry>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            from: "en".into(),
            to: "en".into(),
            catalog: vec![
                LanguageEntry::new("English", "en"),
                LanguageEntry::new("Arabic", "ar"),
                LanguageEntry::new("Urdu", "ur"),
            ],
        }
    }
}

impl LanguageConfig {
    /// Resolve a display label to its code, falling back to `"en"` for
    /// labels that are not in the catalog.
    pub fn code_for_label(&self, label: &str) -> &str {
        self.catalog
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.code.as_str())
            .unwrap_or("en")
    }

    /// Reverse lookup used when a pair is set programmatically.
    pub fn label_for_code(&self, code: &str) -> Option<&str> {
        self.catalog
            .iter()
            .find(|e| e.code == code)
            .map(|e| e.label.as_str())
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Arbitration engine and chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound for each individual translator call.
    pub provider_timeout_secs: u64,
    /// Upper bound for the judge pass, independent of the translators.
    pub judge_timeout_secs: u64,
    /// Text written in place of a group no translator could handle.
    pub failure_marker: String,
    /// Chunking mode used by the caller-facing `translate` entry point.
    pub chunk_mode: ChunkMode,
    /// Sentences per group (paragraph mode) or per unit (flat mode).
    pub sentences_per_group: usize,
    /// Units packed into one group in flat mode.
    pub units_per_group: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: 30,
            judge_timeout_secs: 60,
            failure_marker: "\u{274c} Translation failed for chunk.".into(),
            chunk_mode: ChunkMode::default(),
            sentences_per_group: 3,
            units_per_group: 2,
        }
    }
}

impl EngineConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// GoogleConfig
// ---------------------------------------------------------------------------

/// Settings for the public Google translate endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub enabled: bool,
    /// Full URL of the `translate_a/single` endpoint.
    pub endpoint: String,
    /// Value of the `client` query parameter.
    pub client: String,
    /// HTTP-level timeout; the engine applies its own per-call bound too.
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://translate.googleapis.com/translate_a/single".into(),
            client: "gtx".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// MarianConfig
// ---------------------------------------------------------------------------

/// Settings for the in-process Marian (opus-mt) translator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarianConfig {
    pub enabled: bool,
    /// Upstream opus-mt repository; `{src}` and `{dst}` are substituted.
    /// Its last path component names the local model directory.
    pub repo_template: String,
    /// Hub repository publishing candle-ready files (`model.safetensors`,
    /// `tokenizer-source.json`, `tokenizer-target.json`, `config.json`) for
    /// a pair. Upstream opus-mt repositories ship SentencePiece files only,
    /// so without this a pair must be converted into the models directory.
    #[serde(default)]
    pub hub_repo_template: Option<String>,
    /// Overrides [`AppPaths::models_dir`] when set.
    pub models_dir: Option<PathBuf>,
    /// Language pairs loaded eagerly when the registry is built.
    pub preload_pairs: Vec<(String, String)>,
}

impl Default for MarianConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repo_template: "Helsinki-NLP/opus-mt-{src}-{dst}".into(),
            hub_repo_template: None,
            models_dir: None,
            preload_pairs: vec![("en".into(), "ur".into()), ("ur".into(), "en".into())],
        }
    }
}

impl MarianConfig {
    /// Hub repository for one language pair.
    ///
    /// ```
    /// use lingua_relay::config::MarianConfig;
    ///
    /// let cfg = MarianConfig::default();
    /// assert_eq!(cfg.repo_for("en", "ur"), "Helsinki-NLP/opus-mt-en-ur");
    /// ```
    pub fn repo_for(&self, src: &str, dst: &str) -> String {
        self.repo_template
            .replace("{src}", src)
            .replace("{dst}", dst)
    }

    /// Repository to download candle-ready files from, if one is set.
    pub fn hub_repo_for(&self, src: &str, dst: &str) -> Option<String> {
        self.hub_repo_template
            .as_ref()
            .map(|t| t.replace("{src}", src).replace("{dst}", dst))
    }

    /// Effective local models directory.
    pub fn resolved_models_dir(&self) -> PathBuf {
        self.models_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().models_dir)
    }
}

// ---------------------------------------------------------------------------
// JudgeConfig
// ---------------------------------------------------------------------------

/// Settings for the command-line language model used as the judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub enabled: bool,
    /// Executable to spawn.
    pub program: String,
    /// Arguments passed to `program`; the prompt is written to stdin.
    pub args: Vec<String>,
    /// Process timeout; the child is killed when it elapses.
    pub timeout_secs: u64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "ollama".into(),
            args: vec!["run".into(), "llama3".into()],
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// LiveConfig
// ---------------------------------------------------------------------------

/// Settings for the live (type-as-you-go) text session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Quiet period after the last edit before a translation starts.
    pub debounce_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self { debounce_ms: 2_000 }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// Every section falls back to its defaults when absent from the file.
///
/// ```rust,no_run
/// use lingua_relay::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub languages: LanguageConfig,
    pub engine: EngineConfig,
    pub google: GoogleConfig,
    pub marian: MarianConfig,
    pub judge: JudgeConfig,
    pub live: LiveConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.languages.from, loaded.languages.from);
        assert_eq!(original.languages.catalog, loaded.languages.catalog);
        assert_eq!(
            original.engine.provider_timeout_secs,
            loaded.engine.provider_timeout_secs
        );
        assert_eq!(original.engine.failure_marker, loaded.engine.failure_marker);
        assert_eq!(original.engine.chunk_mode, loaded.engine.chunk_mode);
        assert_eq!(original.google.endpoint, loaded.google.endpoint);
        assert_eq!(original.marian.preload_pairs, loaded.marian.preload_pairs);
        assert_eq!(original.judge.args, loaded.judge.args);
        assert_eq!(original.live.debounce_ms, loaded.live.debounce_ms);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.judge.program, "ollama");
        assert_eq!(config.engine.sentences_per_group, 3);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.languages.from, "en");
        assert_eq!(cfg.languages.to, "en");
        assert_eq!(cfg.engine.provider_timeout_secs, 30);
        assert_eq!(cfg.engine.judge_timeout_secs, 60);
        assert_eq!(cfg.engine.units_per_group, 2);
        assert_eq!(cfg.engine.chunk_mode, ChunkMode::Paragraph);
        assert_eq!(cfg.google.client, "gtx");
        assert_eq!(cfg.judge.args, vec!["run", "llama3"]);
        assert_eq!(cfg.judge.timeout_secs, 60);
        assert_eq!(cfg.live.debounce_ms, 2_000);
        assert!(cfg.engine.failure_marker.starts_with('\u{274c}'));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[engine]\nprovider_timeout_secs = 5\njudge_timeout_secs = 9\n\
             failure_marker = \"x\"\nchunk_mode = \"flat\"\n\
             sentences_per_group = 3\nunits_per_group = 2\n",
        )
        .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.engine.provider_timeout_secs, 5);
        assert_eq!(cfg.engine.chunk_mode, ChunkMode::Flat);
        assert_eq!(cfg.google.client, "gtx");
        assert_eq!(cfg.languages.catalog.len(), 3);
    }

    #[test]
    fn catalog_lookup_falls_back_to_english() {
        let langs = LanguageConfig::default();
        assert_eq!(langs.code_for_label("Urdu"), "ur");
        assert_eq!(langs.code_for_label("Klingon"), "en");
        assert_eq!(langs.label_for_code("ar"), Some("Arabic"));
        assert_eq!(langs.label_for_code("xx"), None);
    }

    #[test]
    fn repo_template_substitution() {
        let mut cfg = MarianConfig::default();
        cfg.repo_template = "local/{dst}-from-{src}".into();
        assert_eq!(cfg.repo_for("ar", "en"), "local/en-from-ar");
        assert_eq!(cfg.hub_repo_for("ar", "en"), None);

        cfg.hub_repo_template = Some("me/candle-opus-mt-{src}-{dst}".into());
        assert_eq!(
            cfg.hub_repo_for("ar", "en").as_deref(),
            Some("me/candle-opus-mt-ar-en")
        );
    }
}
