//! Segment splitting: divide one structural section into retrieval-sized
//! pieces.
//!
//! Two interchangeable strategies live behind the [`SegmentSplitter`]
//! variant type, selected once at construction:
//!
//! * [`SizeSplitter`] — greedy character windows with boundary-aware breaks
//!   and overlap. No dependencies, deterministic, the default.
//! * [`SemanticSplitter`] — embeds sentences via an externally supplied
//!   [`Embedder`] and breaks only where the topic shifts, so chunk length
//!   follows content instead of a byte budget.
//!
//! Both strategies degrade instead of erroring: when the semantic splitter
//! cannot embed (too few sentences, backend failure) the section travels
//! through as a single segment. Text is never dropped.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::config::ChunkStrategy;

/// Error surfaced by an [`Embedder`] implementation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EmbedError(pub String);

/// Externally supplied embedding function, one vector per input text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// The segment-splitting strategy chosen at construction time.
pub enum SegmentSplitter {
    Size(SizeSplitter),
    Semantic(SemanticSplitter),
}

impl SegmentSplitter {
    /// The strategy tag recorded in chunk metadata.
    pub fn strategy(&self) -> ChunkStrategy {
        match self {
            SegmentSplitter::Size(_) => ChunkStrategy::Size,
            SegmentSplitter::Semantic(_) => ChunkStrategy::Semantic,
        }
    }

    /// Split one section's text into ordered segments.
    pub async fn split(&self, text: &str) -> Vec<String> {
        match self {
            SegmentSplitter::Size(s) => s.split(text),
            SegmentSplitter::Semantic(s) => s.split(text).await,
        }
    }
}

// ── Size-bounded strategy ────────────────────────────────────────────────

/// Greedy size-bounded splitter with boundary-aware breaks and overlap.
///
/// Accumulates up to `chunk_size` characters per segment, breaking at the
/// last paragraph boundary inside the window, else the last line break,
/// else the last sentence end, else the last word gap — a hard mid-word cut
/// happens only when a single unbroken token exceeds the whole budget.
/// Consecutive segments overlap by `chunk_overlap` characters so context
/// that straddles a cut is retrievable from either side.
pub struct SizeSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SizeSplitter {
    /// `chunk_overlap` is clamped below `chunk_size` so every step makes
    /// progress.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if text.chars().count() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut segments = Vec::new();
        let mut start = 0usize;
        while start < text.len() {
            let hard_end = advance_chars(text, start, self.chunk_size);
            let end = if hard_end >= text.len() {
                text.len()
            } else {
                best_break(text, start, hard_end)
            };

            let piece = text[start..end].trim();
            if !piece.is_empty() {
                segments.push(piece.to_string());
            }
            if end >= text.len() {
                break;
            }

            let next = retreat_chars(text, end, self.chunk_overlap);
            // Overlap must not push the cursor backwards past the segment we
            // just emitted, or the loop would stall.
            start = if next > start { next } else { end };
        }
        segments
    }
}

/// Byte index `n` chars past `from`, clamped to the end of `s`.
fn advance_chars(s: &str, from: usize, n: usize) -> usize {
    s[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(s.len())
}

/// Byte index `n` chars before `from`.
fn retreat_chars(s: &str, from: usize, n: usize) -> usize {
    let mut idx = from;
    for (i, _) in s[..from].char_indices().rev().take(n) {
        idx = i;
    }
    idx
}

/// Best break position in `(start, limit]`, by boundary priority:
/// paragraph, then line, then sentence, then word. Falls back to the hard
/// limit when the window contains no boundary at all.
fn best_break(text: &str, start: usize, limit: usize) -> usize {
    let window = &text[start..limit];

    for sep in ["\n\n", "\n"] {
        if let Some(pos) = window.rfind(sep) {
            if pos > 0 {
                return start + pos + sep.len();
            }
        }
    }
    for sep in [". ", "! ", "? "] {
        if let Some(pos) = window.rfind(sep) {
            if pos > 0 {
                return start + pos + sep.len();
            }
        }
    }
    if let Some(pos) = window.rfind(' ') {
        if pos > 0 {
            return start + pos + 1;
        }
    }
    limit
}

// ── Topic-bounded strategy ───────────────────────────────────────────────

/// Splits where adjacent-sentence semantic similarity drops.
///
/// Sentences are embedded in one batch; the splitter computes the cosine
/// distance between each adjacent pair and breaks wherever the distance
/// exceeds the given percentile of the section's own distance distribution,
/// so the threshold adapts to how homogeneous the text is.
pub struct SemanticSplitter {
    embedder: Arc<dyn Embedder>,
    breakpoint_percentile: f64,
}

impl SemanticSplitter {
    pub fn new(embedder: Arc<dyn Embedder>, breakpoint_percentile: f64) -> Self {
        Self {
            embedder,
            breakpoint_percentile: breakpoint_percentile.clamp(f64::EPSILON, 100.0),
        }
    }

    pub async fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let sentences = split_sentences(text);
        if sentences.len() < 2 {
            return vec![text.to_string()];
        }

        let refs: Vec<&str> = sentences.iter().map(String::as_str).collect();
        let embeddings = match self.embedder.embed(&refs).await {
            Ok(e) if e.len() == sentences.len() => e,
            Ok(e) => {
                warn!(
                    expected = sentences.len(),
                    got = e.len(),
                    "embedder returned wrong count, keeping section whole"
                );
                return vec![text.to_string()];
            }
            Err(e) => {
                warn!(error = %e, "embedding failed, keeping section whole");
                return vec![text.to_string()];
            }
        };

        let distances: Vec<f64> = embeddings
            .windows(2)
            .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]) as f64)
            .collect();
        let threshold = percentile(&distances, self.breakpoint_percentile);

        let mut segments = Vec::new();
        let mut group: Vec<&str> = vec![&sentences[0]];
        for (i, sentence) in sentences.iter().enumerate().skip(1) {
            if distances[i - 1] > threshold {
                segments.push(group.join(" "));
                group = Vec::new();
            }
            group.push(sentence);
        }
        segments.push(group.join(" "));
        segments
    }
}

static RE_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?\n]+(?:[.!?]+|\n|$)").unwrap());

/// Split text into sentences on terminal punctuation and line breaks.
fn split_sentences(text: &str) -> Vec<String> {
    RE_SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Nearest-rank percentile of `values`; `p` in (0, 100].
fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── SizeSplitter ─────────────────────────────────────────────────────

    #[test]
    fn short_text_is_one_segment() {
        let splitter = SizeSplitter::new(1000, 200);
        assert_eq!(splitter.split("short"), vec!["short"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(SizeSplitter::new(1000, 200).split("  \n ").is_empty());
    }

    #[test]
    fn segments_respect_the_size_bound() {
        let word = "lorem ipsum dolor sit amet ";
        let text = word.repeat(100);
        let splitter = SizeSplitter::new(1000, 200);
        let segments = splitter.split(&text);
        assert!(segments.len() > 1);
        for seg in &segments {
            assert!(
                seg.chars().count() <= 1000,
                "segment of {} chars exceeds bound",
                seg.chars().count()
            );
        }
    }

    #[test]
    fn consecutive_segments_overlap() {
        let text = "alpha beta gamma delta ".repeat(50);
        let splitter = SizeSplitter::new(200, 50);
        let segments = splitter.split(&text);
        assert!(segments.len() > 1);
        for pair in segments.windows(2) {
            let tail: String = pair[0].chars().rev().take(20).collect::<String>()
                .chars().rev().collect();
            assert!(
                pair[1].contains(tail.trim()),
                "expected overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn breaks_prefer_paragraph_boundaries() {
        let para = "x".repeat(400);
        let text = format!("{para}\n\n{para}\n\n{para}");
        let splitter = SizeSplitter::new(1000, 0);
        let segments = splitter.split(&text);
        assert_eq!(segments.len(), 2);
        // Two whole paragraphs fit the first window; the cut lands on the
        // paragraph boundary, not at the 1000-char mark.
        assert_eq!(segments[0].chars().count(), 802);
        assert_eq!(segments[1], "x".repeat(400));
    }

    #[test]
    fn never_splits_mid_word_when_a_boundary_exists() {
        let text = "aaaa bbbb cccc dddd eeee ffff gggg hhhh";
        let splitter = SizeSplitter::new(10, 0);
        for seg in splitter.split(text) {
            assert!(
                seg.split_whitespace().all(|w| "abcdefgh".contains(&w[..1])
                    && w.chars().count() == 4),
                "mid-word split in {seg:?}"
            );
        }
    }

    #[test]
    fn oversized_atomic_token_is_hard_split() {
        let text = "a".repeat(2500);
        let splitter = SizeSplitter::new(1000, 0);
        let segments = splitter.split(&text);
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.chars().count() <= 1000));
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "héllo wörld æøå ".repeat(40);
        let splitter = SizeSplitter::new(100, 20);
        let segments = splitter.split(&text);
        assert!(segments.len() > 1);
        assert!(segments.iter().all(|s| s.chars().count() <= 100));
    }

    // ── SemanticSplitter ─────────────────────────────────────────────────

    /// Embeds "apple …" sentences on one axis and everything else on an
    /// orthogonal one, so the topic boundary is unambiguous.
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("apple") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Err(EmbedError("backend down".into()))
        }
    }

    #[tokio::test]
    async fn splits_at_the_topic_shift() {
        let text = "apple pie is sweet. apple cider too. rust has lifetimes. rust has traits.";
        let splitter = SemanticSplitter::new(Arc::new(AxisEmbedder), 60.0);
        let segments = splitter.split(text).await;
        assert_eq!(segments.len(), 2);
        assert!(segments[0].contains("cider"));
        assert!(segments[1].starts_with("rust"));
    }

    #[tokio::test]
    async fn embedder_failure_keeps_section_whole() {
        let text = "one sentence. another sentence.";
        let splitter = SemanticSplitter::new(Arc::new(FailingEmbedder), 95.0);
        assert_eq!(splitter.split(text).await, vec![text.to_string()]);
    }

    #[tokio::test]
    async fn single_sentence_is_one_segment() {
        let splitter = SemanticSplitter::new(Arc::new(AxisEmbedder), 95.0);
        assert_eq!(
            splitter.split("just one sentence").await,
            vec!["just one sentence".to_string()]
        );
    }

    // ── helpers ──────────────────────────────────────────────────────────

    #[test]
    fn sentence_splitting_keeps_punctuation() {
        let s = split_sentences("First one. Second one! Third?");
        assert_eq!(s, vec!["First one.", "Second one!", "Third?"]);
    }

    #[test]
    fn percentile_nearest_rank() {
        let values = vec![0.1, 0.2, 0.3, 0.4];
        assert!((percentile(&values, 50.0) - 0.2).abs() < 1e-9);
        assert!((percentile(&values, 100.0) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
