//! Chunking configuration: strategy selection and size/overlap validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// The splitting policy used to break a document into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Split on sentence boundaries, then pack sentences into chunks.
    Sentence,
    /// Split on blank-line paragraph boundaries, falling back to sentences
    /// for paragraphs that exceed the chunk size.
    Paragraph,
    /// Recursively split on a priority list of separators
    /// (paragraph, sentence, word, character).
    Recursive,
}

impl ChunkStrategy {
    /// All strategies, in their canonical declaration order.
    pub const ALL: [ChunkStrategy; 3] =
        [ChunkStrategy::Sentence, ChunkStrategy::Paragraph, ChunkStrategy::Recursive];

    /// The canonical lowercase name used on the wire and in query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStrategy::Sentence => "sentence",
            ChunkStrategy::Paragraph => "paragraph",
            ChunkStrategy::Recursive => "recursive",
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "sentence" => Ok(ChunkStrategy::Sentence),
            "paragraph" => Ok(ChunkStrategy::Paragraph),
            "recursive" => Ok(ChunkStrategy::Recursive),
            other => Err(RagError::ConfigError(format!("unknown chunk strategy '{other}'"))),
        }
    }
}

/// One point in the chunking configuration space.
///
/// Identifies a chunking run by `(chunk_size, chunk_overlap, strategy)`.
/// The invariant `chunk_overlap < chunk_size` is enforced by
/// [`ChunkConfigBuilder::build`]; overlap at or above the chunk size would
/// produce degenerate or non-terminating chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkConfig {
    /// Maximum chunk size in tokens.
    pub chunk_size: usize,
    /// Number of overlapping tokens carried between consecutive chunks.
    pub chunk_overlap: usize,
    /// The splitting policy.
    pub strategy: ChunkStrategy,
}

impl ChunkConfig {
    /// Create a new builder for constructing a validated [`ChunkConfig`].
    pub fn builder() -> ChunkConfigBuilder {
        ChunkConfigBuilder::default()
    }

    /// A short human-readable label, e.g. `300t / 60o / sentence`.
    pub fn label(&self) -> String {
        format!("{}t / {}o / {}", self.chunk_size, self.chunk_overlap, self.strategy)
    }
}

/// Builder for constructing a validated [`ChunkConfig`].
#[derive(Debug, Clone)]
pub struct ChunkConfigBuilder {
    chunk_size: usize,
    chunk_overlap: usize,
    strategy: ChunkStrategy,
}

impl Default for ChunkConfigBuilder {
    fn default() -> Self {
        Self { chunk_size: 300, chunk_overlap: 60, strategy: ChunkStrategy::Sentence }
    }
}

impl ChunkConfigBuilder {
    /// Set the maximum chunk size in tokens.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in tokens.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }

    /// Set the splitting strategy.
    pub fn strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Build the [`ChunkConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    pub fn build(self) -> Result<ChunkConfig> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(ChunkConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            strategy: self.strategy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_overlap_at_or_above_size() {
        assert!(ChunkConfig::builder().chunk_size(100).chunk_overlap(100).build().is_err());
        assert!(ChunkConfig::builder().chunk_size(100).chunk_overlap(150).build().is_err());
        assert!(ChunkConfig::builder().chunk_size(100).chunk_overlap(99).build().is_ok());
    }

    #[test]
    fn builder_rejects_zero_size() {
        assert!(ChunkConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
    }

    #[test]
    fn strategy_round_trips_through_str() {
        for strategy in ChunkStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<ChunkStrategy>().unwrap(), strategy);
        }
        assert!("semantic".parse::<ChunkStrategy>().is_err());
    }
}
