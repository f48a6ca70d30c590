//! Judge backed by a command-line language model (`ollama run llama3`).
//!
//! The prompt is written to the child's stdin; the first line of its stdout
//! is the answer. The child is killed when the process timeout elapses.
//! When selecting among candidates, an answer that contains one of the
//! candidates verbatim is replaced by that candidate, so a chatty model
//! that wraps or repeats its choice still yields the canonical string.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::JudgeConfig;
use crate::provider::prompt::{direct_prompt, selection_prompt};
use crate::provider::translator::{valid_candidates, Judge, ProviderError, Translator};

/// Command-line LLM judge.
pub struct LlamaJudge {
    config: JudgeConfig,
}

impl LlamaJudge {
    pub fn from_config(config: &JudgeConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Run the model once and return the first line of its output.
    async fn ask(&self, prompt: String) -> Result<String, ProviderError> {
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProviderError::Spawn(format!("{}: {e}", self.config.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // Feed stdin from its own task so a child that writes before
            // reading everything cannot deadlock against us.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    log::debug!("judge: writing prompt failed: {e}");
                }
            });
        }

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(|e| ProviderError::Spawn(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[async_trait]
impl Judge for LlamaJudge {
    fn name(&self) -> &str {
        "llama"
    }

    async fn arbitrate(
        &self,
        text: &str,
        src: &str,
        dst: &str,
        candidates: &[String],
    ) -> Result<String, ProviderError> {
        let candidates = valid_candidates(text, candidates.iter().map(String::as_str));
        if candidates.is_empty() {
            return Err(ProviderError::NoCandidates);
        }

        let response = self.ask(selection_prompt(text, src, dst, &candidates)).await?;
        Ok(canonical_choice(&response, &candidates))
    }
}

#[async_trait]
impl Translator for LlamaJudge {
    fn name(&self) -> &str {
        "llama"
    }

    async fn translate(&self, text: &str, src: &str, dst: &str) -> Result<String, ProviderError> {
        self.ask(direct_prompt(text, src, dst)).await
    }
}

/// The first candidate contained in `response`, else `response` itself.
///
/// ```
/// use lingua_relay::provider::judge::canonical_choice;
///
/// let candidates = vec!["Bonjour".to_string(), "Salut".to_string()];
/// assert_eq!(canonical_choice("2. Salut", &candidates), "Salut");
/// assert_eq!(canonical_choice("Coucou", &candidates), "Coucou");
/// ```
pub fn canonical_choice(response: &str, candidates: &[String]) -> String {
    candidates
        .iter()
        .map(|c| c.trim())
        .find(|c| !c.is_empty() && response.contains(c))
        .unwrap_or(response)
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_judge(script: &str, timeout_secs: u64) -> LlamaJudge {
        LlamaJudge::from_config(&JudgeConfig {
            enabled: true,
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            timeout_secs,
        })
    }

    #[tokio::test]
    async fn zero_candidates_fail_without_spawning() {
        // A program that cannot exist: spawning it would be a Spawn error.
        let judge = LlamaJudge::from_config(&JudgeConfig {
            program: "/nonexistent/judge-binary".into(),
            ..JudgeConfig::default()
        });

        let err = judge.arbitrate("Hello", "en", "fr", &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::NoCandidates));
    }

    #[tokio::test]
    async fn echo_candidates_count_as_zero() {
        let judge = shell_judge("echo Bonjour", 5);
        let err = judge
            .arbitrate("Hello", "en", "fr", &["hello ".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NoCandidates));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let judge = LlamaJudge::from_config(&JudgeConfig {
            program: "/nonexistent/judge-binary".into(),
            ..JudgeConfig::default()
        });
        let err = judge.translate("Hello", "en", "fr").await.unwrap_err();
        assert!(matches!(err, ProviderError::Spawn(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn first_output_line_is_the_answer() {
        let judge = shell_judge("cat > /dev/null; printf 'Bonjour\\nexplanation\\n'", 5);
        let out = judge.translate("Hello", "en", "fr").await.unwrap();
        assert_eq!(out, "Bonjour");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn prompt_is_written_to_stdin() {
        // `head -n 1` echoes the first prompt line back.
        let judge = shell_judge("head -n 1", 5);
        let out = judge.translate("Hello", "en", "ur").await.unwrap();
        assert_eq!(out, "Translate from en to ur.");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn paraphrased_choice_maps_to_candidate() {
        let judge = shell_judge("cat > /dev/null; echo 'The best one is: Salut !'", 5);
        let candidates = vec!["Bonjour".to_string(), " Salut ".to_string()];
        let out = judge.arbitrate("Hello", "en", "fr", &candidates).await.unwrap();
        assert_eq!(out, "Salut");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_output_is_empty_response() {
        let judge = shell_judge("cat > /dev/null", 5);
        let err = judge.translate("Hello", "en", "fr").await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_process_times_out() {
        let judge = shell_judge("sleep 5; echo late", 1);
        let err = judge.translate("Hello", "en", "fr").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout));
    }
}
