//! Command-line entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] (`--config` path, or the platform default; defaults
//!    on first run) and apply command-line overrides.
//! 3. Create the [`tokio`] runtime.
//! 4. Build the [`AppContext`] and select the language pair.
//! 5. Submit the text; partial output goes to stderr with `--progress`,
//!    the final text to stdout.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use lingua_relay::{
    app::AppContext,
    config::{AppConfig, AppPaths, ChunkMode},
    sink::{CallbackSink, IncrementalSink},
};

#[derive(Parser, Debug)]
#[command(name = "lingua-relay")]
#[command(about = "Translate text through several providers and a judge", long_about = None)]
struct Args {
    /// Text to translate (read from stdin when omitted)
    #[arg(value_name = "TEXT")]
    text: Vec<String>,

    /// Source language, as a code (en) or a catalog label (English)
    #[arg(long)]
    from: Option<String>,

    /// Destination language, as a code (ur) or a catalog label (Urdu)
    #[arg(long)]
    to: Option<String>,

    /// How the text is cut into translation units
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Settings file (default: platform config dir)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print each partial result to stderr as groups complete
    #[arg(long)]
    progress: bool,

    /// Skip the judge and use the first valid translation
    #[arg(long)]
    no_judge: bool,

    /// Write the effective settings to the settings file, then exit
    #[arg(long)]
    init_config: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Paragraph,
    Flat,
}

impl From<Mode> for ChunkMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Paragraph => ChunkMode::Paragraph,
            Mode::Flat => ChunkMode::Flat,
        }
    }
}

fn load_config(args: &Args) -> AppConfig {
    let loaded = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e:#}); using defaults");
        AppConfig::default()
    });

    if let Some(mode) = args.mode {
        config.engine.chunk_mode = mode.into();
    }
    if args.no_judge {
        config.judge.enabled = false;
    }
    config
}

/// Accept either a catalog label or a raw code; codes pass through as-is.
fn resolve_language(config: &AppConfig, value: &str) -> String {
    config
        .languages
        .catalog
        .iter()
        .find(|e| e.label.eq_ignore_ascii_case(value))
        .map_or_else(|| value.to_string(), |e| e.code.clone())
}

fn read_input(args: &Args) -> anyhow::Result<String> {
    if !args.text.is_empty() {
        return Ok(args.text.join(" "));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read text from stdin")?;
    Ok(text)
}

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // 2. Configuration
    let config = load_config(&args);

    if args.init_config {
        let path = args
            .config
            .clone()
            .unwrap_or_else(|| AppPaths::new().settings_file);
        config.save_to(&path)?;
        println!("{}", path.display());
        return Ok(());
    }

    let from = args
        .from
        .as_deref()
        .map(|v| resolve_language(&config, v))
        .unwrap_or_else(|| config.languages.from.clone());
    let to = args
        .to
        .as_deref()
        .map(|v| resolve_language(&config, v))
        .unwrap_or_else(|| config.languages.to.clone());

    let text = read_input(&args)?;

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Context
    let ctx = Arc::new(AppContext::new(config));
    ctx.languages().set_languages(&from, &to);
    let catalog = &ctx.config().languages;
    log::info!(
        "lingua-relay translating {} -> {}",
        catalog.label_for_code(&from).unwrap_or(&from),
        catalog.label_for_code(&to).unwrap_or(&to)
    );

    let progress = if args.progress {
        let sink = CallbackSink::spawn(|partial| eprintln!("{partial}\n"))
            .context("failed to start progress thread")?;
        Some(Arc::new(sink))
    } else {
        None
    };
    let sink = progress
        .clone()
        .map(|sink| sink as Arc<dyn IncrementalSink>);

    // 5. Translate
    let translated = rt.block_on(async move { ctx.submit(text, sink).wait().await })?;
    if let Some(progress) = &progress {
        // Partials still queued on the progress thread go out first.
        progress.flush();
    }
    println!("{translated}");

    Ok(())
}
