//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and three implementations:
//!
//! - [`SentenceChunker`] — packs sentences into chunks with token overlap
//! - [`ParagraphChunker`] — packs paragraphs, falling back to sentences for
//!   paragraphs that exceed the chunk size
//! - [`RecursiveChunker`] — splits hierarchically by paragraphs, sentences,
//!   words, then characters
//!
//! Chunk sizes and overlaps are measured in estimated tokens
//! (see [`estimate_tokens`]). Every produced chunk respects the size budget,
//! and consecutive chunks share at most `chunk_overlap` tokens of content.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::{ChunkConfig, ChunkStrategy};
use crate::document::{Chunk, SourceDocument};

/// Approximate characters per token (tuned for a German/English mix).
pub const CHARS_PER_TOKEN: f32 = 3.5;

/// Estimate the token count of a text at ~3.5 characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() as f32 / CHARS_PER_TOKEN).ceil() as usize
}

/// Character budget corresponding to a token budget.
///
/// Chosen so that any text within the character budget estimates to at most
/// the token budget.
fn char_budget(tokens: usize) -> usize {
    (tokens as f32 * CHARS_PER_TOKEN).floor() as usize
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and token counts but no
/// embeddings. Embeddings are attached later by the evaluator. Chunking is
/// deterministic: the same document and configuration always produce the
/// same chunks, in document order, with 0-based `chunk_index`.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty or whitespace-only
    /// text. Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &SourceDocument) -> Vec<Chunk>;
}

/// Construct the chunker matching a [`ChunkConfig`]'s strategy.
pub fn chunker_for(config: &ChunkConfig) -> Box<dyn Chunker> {
    match config.strategy {
        ChunkStrategy::Sentence => {
            Box::new(SentenceChunker::new(config.chunk_size, config.chunk_overlap))
        }
        ChunkStrategy::Paragraph => {
            Box::new(ParagraphChunker::new(config.chunk_size, config.chunk_overlap))
        }
        ChunkStrategy::Recursive => {
            Box::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        }
    }
}

// ── Sentence splitting ─────────────────────────────────────────────

fn boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+\s+").expect("static regex"))
}

fn abbreviation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:z\.B|d\.h|u\.a|o\.ä|v\.a|i\.d\.R|s\.o|s\.u|bzgl|bzw|ca|vgl|ggf|evtl|usw|etc|inkl|exkl|Nr|Dr|Prof|Mr|Mrs|Ms|St|Abs|Art|Bd|Kap|Fig|Abb|Tab|S|Aufl)$",
        )
        .expect("static regex")
    })
}

fn decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d\.$").expect("static regex"))
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("static regex"))
}

/// Split text into sentences, preserving meaningful boundaries.
///
/// Handles abbreviations (z.B., d.h., Dr., Nr., etc.) and decimal numbers,
/// where a period does not end a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut last = 0;

    let push_part = |current: &mut String, part: &str, sentences: &mut Vec<String>| {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(part.trim_end());

        let stripped = current.trim_end_matches(['.', '!', '?']);
        let ends_with_abbrev = abbreviation_re().is_match(stripped);
        let ends_with_decimal = decimal_re().is_match(current);

        // Abbreviations and decimals accumulate with the next part
        if !ends_with_abbrev && !ends_with_decimal {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    };

    for m in boundary_re().find_iter(text) {
        push_part(&mut current, &text[last..m.end()], &mut sentences);
        last = m.end();
    }

    let remainder = &text[last..];
    if !remainder.trim().is_empty() {
        push_part(&mut current, remainder, &mut sentences);
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// Split text on blank-line paragraph boundaries.
fn split_paragraphs(text: &str) -> Vec<String> {
    paragraph_re()
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Packing helpers ────────────────────────────────────────────────

/// Split a unit that exceeds the character budget into fitting pieces,
/// first by words, then by raw characters for words longer than the budget.
fn split_to_fit(text: &str, budget: usize) -> Vec<String> {
    if char_len(text) <= budget {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = char_len(word);
        if word_len > budget {
            if current_len > 0 {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            out.extend(split_chars(word, budget));
            continue;
        }
        let added = if current_len == 0 { word_len } else { current_len + 1 + word_len };
        if added > budget {
            out.push(std::mem::take(&mut current));
            current = word.to_string();
            current_len = word_len;
        } else {
            if current_len > 0 {
                current.push(' ');
            }
            current.push_str(word);
            current_len = added;
        }
    }

    if current_len > 0 {
        out.push(current);
    }
    out
}

/// Split text into fixed-size character pieces (UTF-8 safe).
fn split_chars(text: &str, budget: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(budget.max(1)).map(|piece| piece.iter().collect()).collect()
}

/// The last `max_chars` characters of a text (UTF-8 safe).
fn char_suffix(text: &str, max_chars: usize) -> String {
    let len = char_len(text);
    if len <= max_chars {
        return text.to_string();
    }
    text.chars().skip(len - max_chars).collect()
}

/// Greedily pack units (sentences or paragraphs) into chunks within the
/// character budget, carrying trailing units of at most `overlap_budget`
/// characters into the next chunk.
///
/// Units longer than `size_budget` must be pre-split by the caller.
fn pack_units(
    units: &[String],
    size_budget: usize,
    overlap_budget: usize,
    joiner: &str,
) -> Vec<String> {
    let unit_lens: Vec<usize> = units.iter().map(|u| char_len(u)).collect();
    let joiner_len = char_len(joiner);

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut current_len = 0;
    let mut i = 0;

    while i < units.len() {
        let unit_len = unit_lens[i];
        let added = if current_len == 0 { unit_len } else { current_len + joiner_len + unit_len };

        if added <= size_budget || current_len == 0 {
            current_len = added;
            i += 1;
            continue;
        }

        // Window full — emit units[start..i], then walk back whole units
        // whose total stays within the overlap budget.
        chunks.push(units[start..i].join(joiner));

        let mut new_start = i;
        let mut carried = 0;
        for j in (start + 1..i).rev() {
            let width = if carried == 0 { unit_lens[j] } else { unit_lens[j] + joiner_len };
            if carried + width > overlap_budget {
                break;
            }
            carried += width;
            new_start = j;
        }

        let with_unit = if carried == 0 { unit_len } else { carried + joiner_len + unit_len };
        if new_start == i || with_unit > size_budget {
            start = i;
            current_len = 0;
        } else {
            start = new_start;
            current_len = carried;
        }
    }

    if start < units.len() && current_len > 0 {
        chunks.push(units[start..].join(joiner));
    }

    chunks
}

/// Materialize chunk texts into [`Chunk`]s with 0-based indices.
fn build_chunks(document: &SourceDocument, pieces: Vec<String>) -> Vec<Chunk> {
    pieces
        .into_iter()
        .filter_map(|piece| {
            let trimmed = piece.trim();
            if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
        })
        .enumerate()
        .map(|(i, text)| Chunk {
            id: format!("{}_{i}", document.id),
            document_id: document.id.clone(),
            chunk_index: i,
            token_count: estimate_tokens(&text),
            text,
            source_title: document.title.clone(),
            embedding: Vec::new(),
        })
        .collect()
}

// ── Strategy: sentence-boundary-aware ──────────────────────────────

/// Packs sentences into chunks of at most `chunk_size` tokens, re-including
/// the trailing `chunk_overlap` tokens of the previous chunk at the start of
/// the next.
///
/// Sentences longer than the chunk size are split by words (then characters)
/// before packing, so the size invariant holds for any input.
///
/// # Example
///
/// ```rust,ignore
/// use embeval_rag::SentenceChunker;
///
/// let chunker = SentenceChunker::new(300, 60);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of tokens per chunk
    /// * `chunk_overlap` — number of overlapping tokens between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, document: &SourceDocument) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let budget = char_budget(self.chunk_size);
        let overlap = char_budget(self.chunk_overlap);

        let units: Vec<String> = split_sentences(&document.text)
            .iter()
            .flat_map(|s| split_to_fit(s, budget))
            .collect();

        build_chunks(document, pack_units(&units, budget, overlap, " "))
    }
}

// ── Strategy: paragraph-based ──────────────────────────────────────

/// Packs blank-line-delimited paragraphs into chunks of at most `chunk_size`
/// tokens, with the same overlap-carry rule as [`SentenceChunker`].
///
/// Paragraphs longer than the chunk size are split by sentences (then words)
/// before packing.
#[derive(Debug, Clone)]
pub struct ParagraphChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ParagraphChunker {
    /// Create a new `ParagraphChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of tokens per chunk
    /// * `chunk_overlap` — number of overlapping tokens between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, document: &SourceDocument) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let budget = char_budget(self.chunk_size);
        let overlap = char_budget(self.chunk_overlap);

        let mut units = Vec::new();
        for paragraph in split_paragraphs(&document.text) {
            if char_len(&paragraph) <= budget {
                units.push(paragraph);
            } else {
                // Oversized paragraph: fall back to sentence units
                for sentence in split_sentences(&paragraph) {
                    units.extend(split_to_fit(&sentence, budget));
                }
            }
        }

        build_chunks(document, pack_units(&units, budget, overlap, "\n\n"))
    }
}

// ── Strategy: recursive separator splitting ────────────────────────

/// Splits text hierarchically: paragraphs → sentences → words → characters.
///
/// First splits by paragraph separators (`\n\n`). Segments that still exceed
/// the chunk size are split by sentence boundaries (`. `, `! `, `? `), then
/// by word boundaries, then by raw characters. Segments are merged back into
/// chunks within the size budget, carrying a character suffix of at most
/// `chunk_overlap` tokens into the next chunk.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of tokens per chunk
    /// * `chunk_overlap` — number of overlapping tokens between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

/// Recursively split text using hierarchical separators until every segment
/// fits the character budget. Exhausting the separator list falls back to a
/// raw character split.
fn recursive_split(text: &str, separators: &[&str], budget: usize) -> Vec<String> {
    if char_len(text) <= budget {
        return vec![text.to_string()];
    }
    if separators.is_empty() {
        return split_chars(text, budget);
    }

    let separator = separators[0];
    let remaining = &separators[1..];

    let mut out = Vec::new();
    for part in split_keeping_separator(text, separator) {
        if char_len(part) > budget {
            out.extend(recursive_split(part, remaining, budget));
        } else {
            out.push(part.to_string());
        }
    }
    out
}

/// Split text at a separator while keeping the separator attached to the
/// preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &SourceDocument) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let budget = char_budget(self.chunk_size);
        let overlap = char_budget(self.chunk_overlap);

        let separators = ["\n\n", ". ", "! ", "? ", " "];
        let segments = recursive_split(&document.text, &separators, budget);

        // Merge segments into chunks, carrying a character suffix as overlap
        let mut pieces = Vec::new();
        let mut current = String::new();
        for segment in segments {
            if char_len(&current) + char_len(&segment) > budget && !current.trim().is_empty() {
                pieces.push(current.trim().to_string());
                let carry = char_suffix(&current, overlap);
                current =
                    if char_len(&carry) + char_len(&segment) > budget { String::new() } else { carry };
            }
            current.push_str(&segment);
        }
        if !current.trim().is_empty() {
            pieces.push(current.trim().to_string());
        }

        build_chunks(document, pieces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> SourceDocument {
        SourceDocument { id: "doc_1".to_string(), title: "Test".to_string(), text: text.to_string() }
    }

    fn sample_text() -> String {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!(
                "Sentence number {i} talks about retrieval quality in some detail. \
                 It adds a second clause for variety! Does it also ask a question? \
                 Yes, z.B. this one keeps going.\n\n"
            ));
        }
        text
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        for strategy in ChunkStrategy::ALL {
            let config = ChunkConfig { chunk_size: 100, chunk_overlap: 10, strategy };
            assert!(chunker_for(&config).chunk(&doc("   \n  ")).is_empty());
        }
    }

    #[test]
    fn all_strategies_respect_token_budget() {
        let text = sample_text();
        for strategy in ChunkStrategy::ALL {
            for (size, overlap) in [(50, 0), (100, 20), (300, 60)] {
                let config = ChunkConfig { chunk_size: size, chunk_overlap: overlap, strategy };
                let chunks = chunker_for(&config).chunk(&doc(&text));
                assert!(!chunks.is_empty(), "{strategy} produced no chunks");
                for chunk in &chunks {
                    assert!(
                        chunk.token_count <= size,
                        "{strategy} chunk {} has {} tokens > {size}",
                        chunk.chunk_index,
                        chunk.token_count,
                    );
                    assert_eq!(chunk.token_count, estimate_tokens(&chunk.text));
                }
            }
        }
    }

    #[test]
    fn chunk_indices_follow_document_order() {
        let config =
            ChunkConfig { chunk_size: 60, chunk_overlap: 10, strategy: ChunkStrategy::Sentence };
        let chunks = chunker_for(&config).chunk(&doc(&sample_text()));
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.id, format!("doc_1_{i}"));
            assert_eq!(chunk.source_title, "Test");
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = sample_text();
        for strategy in ChunkStrategy::ALL {
            let config = ChunkConfig { chunk_size: 120, chunk_overlap: 30, strategy };
            let a = chunker_for(&config).chunk(&doc(&text));
            let b = chunker_for(&config).chunk(&doc(&text));
            assert_eq!(a, b);
        }
    }

    /// Longest suffix of `prev` (in chars) that is also a prefix of `next`.
    fn shared_span_chars(prev: &str, next: &str) -> usize {
        let prev_chars: Vec<char> = prev.chars().collect();
        let next_chars: Vec<char> = next.chars().collect();
        for n in (1..=prev_chars.len().min(next_chars.len())).rev() {
            if prev_chars[prev_chars.len() - n..] == next_chars[..n] {
                return n;
            }
        }
        0
    }

    #[test]
    fn consecutive_sentence_chunks_share_at_most_overlap_tokens() {
        let config =
            ChunkConfig { chunk_size: 80, chunk_overlap: 20, strategy: ChunkStrategy::Sentence };
        let chunks = chunker_for(&config).chunk(&doc(&sample_text()));
        assert!(chunks.len() > 2);

        for window in chunks.windows(2) {
            let shared = shared_span_chars(&window[0].text, &window[1].text);
            let shared_text: String = window[1].text.chars().take(shared).collect();
            assert!(
                estimate_tokens(&shared_text) <= config.chunk_overlap,
                "shared span of {} tokens exceeds overlap {}",
                estimate_tokens(&shared_text),
                config.chunk_overlap,
            );
        }
    }

    #[test]
    fn zero_overlap_produces_disjoint_sentence_chunks() {
        let config =
            ChunkConfig { chunk_size: 60, chunk_overlap: 0, strategy: ChunkStrategy::Sentence };
        let chunks = chunker_for(&config).chunk(&doc(&sample_text()));
        assert!(chunks.len() > 2);
        for window in chunks.windows(2) {
            assert_eq!(shared_span_chars(&window[0].text, &window[1].text), 0);
        }
    }

    #[test]
    fn abbreviations_do_not_split_sentences() {
        let sentences = split_sentences("Das gilt z.B. für Dr. Müller. Ein neuer Satz beginnt.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("z.B. für Dr. Müller"));
    }

    #[test]
    fn decimal_numbers_do_not_split_sentences() {
        let sentences = split_sentences("Der Wert beträgt 3. 5 Prozent mehr. Und weiter geht es.");
        assert!(sentences[0].contains("3. 5 Prozent"));
    }

    #[test]
    fn oversized_paragraph_falls_back_to_sentences() {
        let long_paragraph = (0..30)
            .map(|i| format!("Satz {i} hat ein paar Wörter."))
            .collect::<Vec<_>>()
            .join(" ");
        let config =
            ChunkConfig { chunk_size: 40, chunk_overlap: 0, strategy: ChunkStrategy::Paragraph };
        let chunks = chunker_for(&config).chunk(&doc(&long_paragraph));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.token_count <= 40);
        }
    }

    #[test]
    fn recursive_splits_unbroken_text_by_characters() {
        let unbroken = "x".repeat(2000);
        let config =
            ChunkConfig { chunk_size: 50, chunk_overlap: 0, strategy: ChunkStrategy::Recursive };
        let chunks = chunker_for(&config).chunk(&doc(&unbroken));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.token_count <= 50);
        }
    }

    #[test]
    fn umlauts_survive_character_splitting() {
        let text = "Größenordnungsmäßig überdurchschnittlich ".repeat(100);
        let config =
            ChunkConfig { chunk_size: 30, chunk_overlap: 5, strategy: ChunkStrategy::Recursive };
        let chunks = chunker_for(&config).chunk(&doc(&text));
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
            assert!(chunk.token_count <= 30);
            assert!(chunk.text.chars().all(|c| c.is_alphabetic() || c.is_whitespace()));
        }
    }
}
