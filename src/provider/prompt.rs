//! Prompts fed to the command-line judge model.
//!
//! Both layouts are fixed external contracts: existing model setups and
//! compatibility tests depend on them byte for byte.

/// Candidate-selection prompt listing numbered candidates.
///
/// ```
/// use lingua_relay::provider::prompt::selection_prompt;
///
/// let p = selection_prompt("Hello", "en", "fr", &["Bonjour".to_string()]);
/// assert!(p.contains("Candidates:\n1. Bonjour\n"));
/// ```
pub fn selection_prompt(text: &str, src: &str, dst: &str, candidates: &[String]) -> String {
    let mut prompt = format!(
        "You are an expert in language translation. You are given a phrase in {src}, \
         and multiple translations to {dst}. Choose the most accurate and natural translation.\n\n\
         Original: {text}\n\n\
         Candidates:\n"
    );
    for (i, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, candidate));
    }
    prompt.push_str("\nOnly output the best translation without any explanation.");
    prompt
}

/// Direct translation prompt used when the judge translates on its own.
pub fn direct_prompt(text: &str, src: &str, dst: &str) -> String {
    format!(
        "Translate from {src} to {dst}.\n\
         ONLY output the translated text.\n\
         Here is the text:\n\"{text}\"\n\
         Translation:"
    )
}
