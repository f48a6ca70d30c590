//! Marian (opus-mt) sequence-to-sequence models run in-process with candle.
//!
//! [`MarianLoader`] resolves a pair's files in this order:
//!
//! 1. `<models_dir>/<repo name>/`, where the repo name is the last component
//!    of [`MarianConfig::repo_template`] (`opus-mt-en-ur`). All four files
//!    must be present; a partial directory is an error, not a fallback.
//! 2. [`MarianConfig::hub_repo_template`], when set: a hub repository that
//!    publishes the same four files.
//!
//! Upstream `Helsinki-NLP/opus-mt-*` repositories only ship SentencePiece
//! models and PyTorch weights, so they are never downloaded from directly.
//! Without a local conversion or a hub repository the load fails with a
//! [`ProviderError::ModelLoad`] saying what to provide.
//!
//! | File                     | Content                                |
//! |--------------------------|----------------------------------------|
//! | `config.json`            | transformers `MarianConfig`            |
//! | `model.safetensors`      | weights                                |
//! | `tokenizer-source.json`  | `tokenizers` encoder for the source    |
//! | `tokenizer-target.json`  | `tokenizers` decoder for the target    |
//!
//! Decoding is greedy (arg-max) with a hard cap on generated tokens.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::marian;
use tokenizers::Tokenizer;

use crate::config::MarianConfig;
use crate::provider::marian::{ModelLoader, Seq2SeqModel};
use crate::provider::translator::ProviderError;

const CONFIG_FILE: &str = "config.json";
const WEIGHTS_FILE: &str = "model.safetensors";
const SOURCE_TOKENIZER_FILE: &str = "tokenizer-source.json";
const TARGET_TOKENIZER_FILE: &str = "tokenizer-target.json";

const MODEL_FILES: [&str; 4] = [
    CONFIG_FILE,
    WEIGHTS_FILE,
    SOURCE_TOKENIZER_FILE,
    TARGET_TOKENIZER_FILE,
];

/// Upper bound on generated tokens per call.
const MAX_DECODE_TOKENS: usize = 512;

// ---------------------------------------------------------------------------
// MarianLoader
// ---------------------------------------------------------------------------

/// Where a pair's model files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ModelSource {
    Local(PathBuf),
    Hub(String),
}

/// Resolves and loads Marian models for language pairs.
pub struct MarianLoader {
    config: MarianConfig,
    models_dir: PathBuf,
    device: Device,
}

impl MarianLoader {
    /// CPU loader built from config.
    pub fn from_config(config: &MarianConfig) -> Self {
        Self {
            config: config.clone(),
            models_dir: config.resolved_models_dir(),
            device: Device::Cpu,
        }
    }

    /// Local directory for a pair, named after the upstream repository.
    fn local_dir(&self, src: &str, dst: &str) -> PathBuf {
        let repo = self.config.repo_for(src, dst);
        let name = repo.rsplit('/').next().unwrap_or(&repo);
        self.models_dir.join(name)
    }

    /// Decide where the pair's files come from without touching the network.
    fn locate(&self, src: &str, dst: &str) -> Result<ModelSource, String> {
        let dir = self.local_dir(src, dst);
        let missing: Vec<&str> = MODEL_FILES
            .iter()
            .copied()
            .filter(|file| !dir.join(file).exists())
            .collect();

        if missing.is_empty() {
            return Ok(ModelSource::Local(dir));
        }
        if missing.len() < MODEL_FILES.len() {
            return Err(format!(
                "incomplete model in {}: missing {}",
                dir.display(),
                missing.join(", ")
            ));
        }

        match self.config.hub_repo_for(src, dst) {
            Some(repo) => Ok(ModelSource::Hub(repo)),
            None => Err(format!(
                "no converted model in {}; convert {} for candle ({}) or set marian.hub_repo_template",
                dir.display(),
                self.config.repo_for(src, dst),
                MODEL_FILES.join(", ")
            )),
        }
    }

    /// Paths of the four model files, from disk or downloaded from the hub.
    fn resolve_files(&self, src: &str, dst: &str) -> Result<ModelFiles, String> {
        let repo = match self.locate(src, dst)? {
            ModelSource::Local(dir) => {
                log::debug!("marian: using local model dir {}", dir.display());
                return Ok(ModelFiles::in_dir(&dir));
            }
            ModelSource::Hub(repo) => repo,
        };

        use hf_hub::{api::sync::Api, Repo, RepoType};

        log::info!("marian: fetching {repo} from the hub");
        let api = Api::new().map_err(|e| e.to_string())?;
        let hub = api.repo(Repo::new(repo.clone(), RepoType::Model));
        let get = |file: &str| {
            hub.get(file)
                .map_err(|e| format!("failed to download {file} from {repo}: {e}"))
        };

        Ok(ModelFiles {
            config: get(CONFIG_FILE)?,
            weights: get(WEIGHTS_FILE)?,
            source_tokenizer: get(SOURCE_TOKENIZER_FILE)?,
            target_tokenizer: get(TARGET_TOKENIZER_FILE)?,
        })
    }

    fn load_files(&self, files: &ModelFiles) -> Result<MarianModel, String> {
        let config_data = std::fs::read_to_string(&files.config)
            .map_err(|e| format!("failed to read config: {e}"))?;
        let config: marian::Config = serde_json::from_str(&config_data)
            .map_err(|e| format!("failed to parse config: {e}"))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.as_path()], DType::F32, &self.device)
                .map_err(|e| format!("failed to load weights: {e}"))?
        };
        let model = marian::MTModel::new(&config, vb)
            .map_err(|e| format!("failed to build model: {e}"))?;

        let source_tokenizer = Tokenizer::from_file(&files.source_tokenizer)
            .map_err(|e| format!("failed to load source tokenizer: {e}"))?;
        let target_tokenizer = Tokenizer::from_file(&files.target_tokenizer)
            .map_err(|e| format!("failed to load target tokenizer: {e}"))?;

        Ok(MarianModel {
            model: Mutex::new(model),
            config,
            source_tokenizer,
            target_tokenizer,
            device: self.device.clone(),
        })
    }
}

impl ModelLoader for MarianLoader {
    fn load(&self, src: &str, dst: &str) -> Result<Arc<dyn Seq2SeqModel>, ProviderError> {
        let repo = self.config.repo_for(src, dst);
        let model_load = |reason: String| ProviderError::ModelLoad {
            pair: repo.clone(),
            reason,
        };

        let files = self.resolve_files(src, dst).map_err(model_load)?;
        let model = self.load_files(&files).map_err(model_load)?;
        log::info!("marian: loaded {repo}");
        Ok(Arc::new(model))
    }
}

struct ModelFiles {
    config: PathBuf,
    weights: PathBuf,
    source_tokenizer: PathBuf,
    target_tokenizer: PathBuf,
}

impl ModelFiles {
    fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join(CONFIG_FILE),
            weights: dir.join(WEIGHTS_FILE),
            source_tokenizer: dir.join(SOURCE_TOKENIZER_FILE),
            target_tokenizer: dir.join(TARGET_TOKENIZER_FILE),
        }
    }
}

// ---------------------------------------------------------------------------
// MarianModel
// ---------------------------------------------------------------------------

/// One loaded language pair.
///
/// The decoder keeps a KV cache, so generation takes the model lock for the
/// duration of a call.
pub struct MarianModel {
    model: Mutex<marian::MTModel>,
    config: marian::Config,
    source_tokenizer: Tokenizer,
    target_tokenizer: Tokenizer,
    device: Device,
}

impl MarianModel {
    fn decode_ids(&self, model: &mut marian::MTModel, mut input: Vec<u32>) -> candle_core::Result<Vec<u32>> {
        input.push(self.config.eos_token_id);
        let input = Tensor::new(input.as_slice(), &self.device)?.unsqueeze(0)?;
        let encoder_xs = model.encoder().forward(&input, 0)?;

        let mut logits_processor = LogitsProcessor::new(0, None, None);
        let mut token_ids = vec![self.config.decoder_start_token_id];

        for index in 0..MAX_DECODE_TOKENS {
            let context_size = if index >= 1 { 1 } else { token_ids.len() };
            let start_pos = token_ids.len().saturating_sub(context_size);
            let input_ids = Tensor::new(&token_ids[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = model.decode(&input_ids, &encoder_xs, start_pos)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let token = logits_processor.sample(&logits)?;
            if token == self.config.eos_token_id || token == self.config.forced_eos_token_id {
                break;
            }
            token_ids.push(token);
        }

        Ok(token_ids.split_off(1))
    }
}

impl Seq2SeqModel for MarianModel {
    fn generate(&self, text: &str) -> Result<String, ProviderError> {
        let encoding = self
            .source_tokenizer
            .encode(text, true)
            .map_err(|e| ProviderError::Inference(e.to_string()))?;
        let input = encoding.get_ids().to_vec();

        let mut model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
        let decoded = self.decode_ids(&mut model, input);
        model.reset_kv_cache();
        drop(model);

        let ids = decoded.map_err(|e| ProviderError::Inference(e.to_string()))?;
        let text = self
            .target_tokenizer
            .decode(&ids, true)
            .map_err(|e| ProviderError::Inference(e.to_string()))?;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
