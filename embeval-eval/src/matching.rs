//! Ground-truth remapping: resolve a phrase's expected content snippet to
//! the best-matching chunk of the configuration under test.
//!
//! Chunk boundaries move whenever the chunking configuration changes, so
//! expected chunks cannot be stored by id across configurations. Instead
//! each phrase carries its expected *content*, and this module scores every
//! chunk against it: full containment, partial containment, or word-overlap
//! ratio.

use embeval_rag::Chunk;

/// Minimum match score for a phrase to count as mapped.
pub const MIN_MATCH_SCORE: f32 = 0.3;

/// The best-matching chunk for an expected content snippet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkMatch {
    /// Index into the candidate chunk slice.
    pub index: usize,
    /// Match score in `[0, 1]`.
    pub score: f32,
}

fn normalize(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find the best matching chunk for an expected content snippet.
///
/// A chunk that fully contains the snippet scores 1.0 (first such chunk
/// wins). A chunk fully contained *in* the snippet scores by length ratio.
/// Otherwise the score is the fraction of shared words. Returns `None` when
/// the snippet is empty, the candidate set is empty, or nothing scores
/// above zero.
pub fn find_best_chunk_match(expected_content: &str, chunks: &[Chunk]) -> Option<ChunkMatch> {
    let normalized_expected = normalize(expected_content);
    if normalized_expected.is_empty() || chunks.is_empty() {
        return None;
    }

    let expected_words: std::collections::HashSet<&str> =
        normalized_expected.split(' ').collect();

    let mut best: Option<ChunkMatch> = None;

    for (index, chunk) in chunks.iter().enumerate() {
        let normalized_chunk = normalize(&chunk.text);
        if normalized_chunk.is_empty() {
            continue;
        }

        let score = if normalized_chunk.contains(&normalized_expected) {
            1.0
        } else if normalized_expected.contains(&normalized_chunk) {
            normalized_chunk.chars().count() as f32 / normalized_expected.chars().count() as f32
        } else {
            let chunk_words: Vec<&str> = normalized_chunk.split(' ').collect();
            let overlap = chunk_words.iter().filter(|w| expected_words.contains(**w)).count();
            overlap as f32 / expected_words.len().max(chunk_words.len()) as f32
        };

        let improves = match best {
            None => score > 0.0,
            Some(current) => score > current.score,
        };
        if improves {
            best = Some(ChunkMatch { index, score });
            if score >= 1.0 {
                break;
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            id: format!("doc_1_{index}"),
            document_id: "doc_1".to_string(),
            chunk_index: index,
            text: text.to_string(),
            token_count: 10,
            source_title: "Test".to_string(),
            embedding: Vec::new(),
        }
    }

    #[test]
    fn containment_scores_full_match() {
        let chunks = vec![
            chunk(0, "Unrelated text about something else entirely."),
            chunk(1, "The quick brown fox jumps over the lazy dog near the river."),
        ];
        let m = find_best_chunk_match("quick brown fox jumps", &chunks).unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn containment_ignores_case_and_whitespace() {
        let chunks = vec![chunk(0, "Der  Dativ ist dem\nGenitiv sein Tod.")];
        let m = find_best_chunk_match("der dativ ist dem genitiv", &chunks).unwrap();
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn word_overlap_scores_partial_match() {
        let chunks = vec![
            chunk(0, "alpha beta gamma delta"),
            chunk(1, "completely different words here"),
        ];
        let m = find_best_chunk_match("alpha beta epsilon zeta", &chunks).unwrap();
        assert_eq!(m.index, 0);
        assert!(m.score > 0.0 && m.score < 1.0);
    }

    #[test]
    fn empty_inputs_return_none() {
        assert!(find_best_chunk_match("", &[chunk(0, "text")]).is_none());
        assert!(find_best_chunk_match("snippet", &[]).is_none());
    }

    #[test]
    fn disjoint_text_scores_below_threshold() {
        let chunks = vec![chunk(0, "alpha beta gamma delta epsilon zeta eta theta")];
        let m = find_best_chunk_match("one two three four five six seven", &chunks);
        assert!(m.is_none() || m.unwrap().score < MIN_MATCH_SCORE);
    }
}
