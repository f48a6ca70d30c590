//! Sentence-aware text chunking and ordered reassembly.
//!
//! [`Chunker::split`] turns arbitrary text into an ordered list of
//! [`ChunkGroup`]s; [`Chunker::join`] stitches translated groups back
//! together with the separators of the same [`ChunkMode`].
//!
//! ```text
//! Paragraph mode                       Flat mode
//! ──────────────                       ─────────
//! "A. B. C. D.\n\nE."                  "A. B. C. D. E. F. G."
//!   ├─ group 0 (p0): "A. B. C."          ├─ group 0: "A. B. C.\nD. E. F."
//!   ├─ group 1 (p0): "D."                └─ group 1: "G."
//!   └─ group 2 (p1): "E."
//! join: " " inside a paragraph,        join: "\n\n" between groups
//!       "\n\n" between paragraphs
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{ChunkMode, EngineConfig};

/// Blank-line paragraph boundary.
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t\r]*\n\s*").expect("valid paragraph regex"));

/// Sentence end followed by any whitespace (paragraph mode).
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"));

/// Sentence end followed by spaces only (flat mode keeps line breaks inside
/// a sentence).
static SENTENCE_END_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?] +").expect("valid sentence regex"));

// ---------------------------------------------------------------------------
// ChunkGroup
// ---------------------------------------------------------------------------

/// One translation unit: a bounded batch of consecutive sentences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkGroup {
    /// Position in the overall sequence, starting at 0.
    pub index: usize,
    /// Paragraph the group belongs to (always 0 in flat mode).
    pub paragraph: usize,
    /// The sentences, in reading order.
    pub sentences: Vec<String>,
    /// Text sent to the translators.
    pub text: String,
}

/// A group's translated text, tagged with its paragraph for reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedGroup {
    pub paragraph: usize,
    pub text: String,
}

impl ChunkGroup {
    /// Pair this group's position with its translation.
    pub fn translated(&self, text: impl Into<String>) -> TranslatedGroup {
        TranslatedGroup {
            paragraph: self.paragraph,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chunker
// ---------------------------------------------------------------------------

/// Splits text into [`ChunkGroup`]s and joins translations back together.
#[derive(Debug, Clone)]
pub struct Chunker {
    mode: ChunkMode,
    sentences_per_group: usize,
    units_per_group: usize,
}

impl Chunker {
    /// Chunker with explicit batch sizes. Sizes of zero are treated as one.
    pub fn new(mode: ChunkMode, sentences_per_group: usize, units_per_group: usize) -> Self {
        Self {
            mode,
            sentences_per_group: sentences_per_group.max(1),
            units_per_group: units_per_group.max(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.chunk_mode,
            config.sentences_per_group,
            config.units_per_group,
        )
    }

    pub fn sentences_per_group(&self) -> usize {
        self.sentences_per_group
    }

    pub fn units_per_group(&self) -> usize {
        self.units_per_group
    }

    /// Split `text` into ordered groups. Empty input yields no groups.
    pub fn split(&self, text: &str) -> Vec<ChunkGroup> {
        match self.mode {
            ChunkMode::Paragraph => self.split_paragraphs(text),
            ChunkMode::Flat => self.split_flat(text),
        }
    }

    /// Concatenate translated groups with this mode's separators.
    pub fn join(&self, groups: &[TranslatedGroup]) -> String {
        let mut out = String::new();
        let mut previous: Option<usize> = None;

        for group in groups {
            if let Some(paragraph) = previous {
                let same_paragraph = paragraph == group.paragraph;
                out.push_str(match self.mode {
                    ChunkMode::Paragraph if same_paragraph => " ",
                    _ => "\n\n",
                });
            }
            out.push_str(&group.text);
            previous = Some(group.paragraph);
        }
        out
    }

    fn split_paragraphs(&self, text: &str) -> Vec<ChunkGroup> {
        let mut groups = Vec::new();
        let mut paragraph = 0;

        for para in PARAGRAPH_BREAK.split(text) {
            let sentences = split_sentences(para, &SENTENCE_END);
            if sentences.is_empty() {
                continue;
            }
            for batch in sentences.chunks(self.sentences_per_group) {
                groups.push(ChunkGroup {
                    index: groups.len(),
                    paragraph,
                    text: batch.join(" "),
                    sentences: batch.to_vec(),
                });
            }
            paragraph += 1;
        }
        groups
    }

    fn split_flat(&self, text: &str) -> Vec<ChunkGroup> {
        let sentences = split_sentences(text, &SENTENCE_END_SPACES);
        let per_group = self.sentences_per_group * self.units_per_group;

        sentences
            .chunks(per_group)
            .enumerate()
            .map(|(index, batch)| {
                let units: Vec<String> = batch
                    .chunks(self.sentences_per_group)
                    .map(|unit| unit.join(" "))
                    .collect();
                ChunkGroup {
                    index,
                    paragraph: 0,
                    text: units.join("\n"),
                    sentences: batch.to_vec(),
                }
            })
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Cut `text` after every sentence-ending punctuation mark matched by
/// `boundary`, dropping blank fragments.
fn split_sentences(text: &str, boundary: &Regex) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    let mut push = |fragment: &str| {
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            sentences.push(fragment.to_string());
        }
    };

    for m in boundary.find_iter(text) {
        // The punctuation mark is ASCII, so `m.start() + 1` is a char boundary.
        push(&text[start..m.start() + 1]);
        start = m.end();
    }
    push(&text[start..]);

    sentences
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
