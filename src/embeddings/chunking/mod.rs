
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Separators tried in order, coarsest first. The empty separator splits into characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Represents a chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    /// The chunk text
    pub content: String,
    /// Position of this chunk within the document
    pub chunk_index: usize,
    /// Length in characters (Unicode scalar values)
    pub char_count: usize,
}

/// How the cleaned document is turned into retrieval units
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Fixed-size overlapping windows over the whole text
    #[default]
    Plain,
    /// One chunk per extracted question/answer pair
    QaPairs,
}

/// Configuration for content chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Maximum number of characters carried over from the previous chunk
    pub chunk_overlap: usize,
    pub strategy: ChunkStrategy,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            strategy: ChunkStrategy::Plain,
        }
    }
}

/// Recursive character splitter.
///
/// Text is split on the first separator that occurs in it; pieces that are still
/// too long are split again with the remaining separators. Small pieces are then
/// merged back into chunks of at most `chunk_size` characters, each chunk starting
/// with a tail of at most `chunk_overlap` characters from the previous one.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    #[inline]
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    /// Split text into trimmed, non-empty chunks
    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        let mut separator = separators.last().map_or("", String::as_str);
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut good_splits: Vec<String> = Vec::new();
        for split in split_keeping_separator(text, separator) {
            if char_len(&split) < self.chunk_size {
                good_splits.push(split);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&std::mem::take(&mut good_splits)));
            }

            if remaining.is_empty() {
                let trimmed = split.trim();
                if !trimmed.is_empty() {
                    final_chunks.push(trimmed.to_string());
                }
            } else {
                final_chunks.extend(self.split_recursive(&split, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }

        final_chunks
    }

    /// Merge small splits into chunks, keeping a trailing window as overlap
    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for split in splits {
            let len = char_len(split);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, self.chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(doc) = join_trimmed(&current) {
                        docs.push(doc);
                    }

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        let Some(front) = current.pop_front() else {
                            break;
                        };
                        total -= char_len(front);
                    }
                }
            }

            current.push_back(split);
            total += len;
        }

        if let Some(doc) = join_trimmed(&current) {
            docs.push(doc);
        }

        docs
    }
}

/// Chunk cleaned document text into embedding-ready pieces
#[inline]
pub fn chunk_content(text: &str, config: &ChunkingConfig) -> Vec<ContentChunk> {
    let chunks = into_content_chunks(TextSplitter::new(config).split_text(text));

    debug!(
        "Split {} characters into {} chunks (avg {} chars)",
        char_len(text),
        chunks.len(),
        chunks.iter().map(|c| c.char_count).sum::<usize>() / chunks.len().max(1)
    );

    chunks
}

/// Number each text as a chunk in order
#[inline]
pub fn into_content_chunks(texts: Vec<String>) -> Vec<ContentChunk> {
    texts
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| ContentChunk {
            char_count: char_len(&content),
            content,
            chunk_index,
        })
        .collect()
}

/// Length in Unicode scalar values, the unit chunk sizes are measured in
#[inline]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split on `separator`, re-attaching it to the start of every piece after the first
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = text.split(separator);
    let mut splits = Vec::new();
    if let Some(first) = pieces.next() {
        splits.push(first.to_string());
    }
    splits.extend(pieces.map(|piece| format!("{separator}{piece}")));
    splits.retain(|s| !s.is_empty());
    splits
}

fn join_trimmed(parts: &VecDeque<&str>) -> Option<String> {
    let joined = parts.iter().copied().collect::<String>();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
