//! Text chunking module
//!
//! Splits text on blank-line paragraphs and packs them into chunks under a
//! character budget.

use crate::config::KnowledgeConfig;
use sha2::{Digest, Sha256};
use tracing::debug;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub max_chars: usize,
    /// Chunks shorter than this are dropped after packing
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: 1000, min_chars: 50 }
    }
}

impl From<&KnowledgeConfig> for ChunkingConfig {
    fn from(config: &KnowledgeConfig) -> Self {
        Self { max_chars: config.max_chars, min_chars: config.min_chars }
    }
}

/// A text chunk with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Index of this chunk in the document, contiguous from 0
    pub index: i32,
    pub content: String,
    /// Length of `content` in characters
    pub char_count: usize,
    /// Hex sha256 of `content`
    pub content_hash: String,
}

/// Split text into chunks for embedding
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let max_chars = config.max_chars.max(1);
    let normalized = text.replace("\r\n", "\n");

    let mut packed: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for paragraph in paragraphs(&normalized) {
        for piece in split_long(paragraph, max_chars) {
            let piece_chars = piece.chars().count();
            let needed = if buffer.is_empty() {
                piece_chars
            } else {
                buffer_chars + PARAGRAPH_SEPARATOR.len() + piece_chars
            };

            if needed <= max_chars {
                if !buffer.is_empty() {
                    buffer.push_str(PARAGRAPH_SEPARATOR);
                }
                buffer.push_str(piece);
                buffer_chars = needed;
            } else {
                packed.push(std::mem::take(&mut buffer));
                buffer.push_str(piece);
                buffer_chars = piece_chars;
            }
        }
    }

    if !buffer.is_empty() {
        packed.push(buffer);
    }

    let chunks: Vec<TextChunk> = packed
        .into_iter()
        .map(|content| (content.chars().count(), content))
        .filter(|(char_count, _)| *char_count >= config.min_chars)
        .enumerate()
        .map(|(index, (char_count, content))| TextChunk {
            index: index as i32,
            content_hash: content_hash(&content),
            char_count,
            content,
        })
        .collect();

    debug!(
        input_chars = normalized.chars().count(),
        chunk_count = chunks.len(),
        max_chars = max_chars,
        "Text chunked"
    );

    chunks
}

/// Hex sha256 of a chunk's text
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Trimmed, non-empty paragraphs separated by blank lines
fn paragraphs(text: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0usize;
    let mut offset = 0usize;

    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                result.push(text[s..end].trim());
            }
        } else {
            if start.is_none() {
                start = Some(offset);
            }
            end = offset + line.len();
        }
        offset += line.len();
    }

    if let Some(s) = start {
        result.push(text[s..end].trim());
    }

    result.retain(|p| !p.is_empty());
    result
}

/// Hard-split a paragraph into pieces of at most `max_chars` characters,
/// preferring the last whitespace inside the budget
fn split_long(paragraph: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = paragraph;

    while rest.chars().count() > max_chars {
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        let boundary_is_space = rest[limit..].starts_with(char::is_whitespace);
        let cut = if boundary_is_space {
            limit
        } else {
            rest[..limit]
                .char_indices()
                .rev()
                .find(|(_, c)| c.is_whitespace())
                .map(|(i, _)| i)
                .filter(|&i| i > 0)
                .unwrap_or(limit)
        };

        pieces.push(rest[..cut].trim_end());
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(n: usize) -> String {
        format!("Paragraph {} talks about building reliable software in Rust.", n)
    }

    #[test]
    fn test_packs_paragraphs_under_budget() {
        let text = (0..40).map(sentence).collect::<Vec<_>>().join("\n\n");
        let config = ChunkingConfig::default();

        let chunks = chunk_text(&text, &config);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.char_count <= config.max_chars);
            assert!(chunk.char_count >= config.min_chars);
            assert_eq!(chunk.char_count, chunk.content.chars().count());
        }
        assert!(chunks[0].content.contains("\n\n"));
    }

    #[test]
    fn test_drops_short_fragments_and_reindexes() {
        let long = "A".repeat(60);
        let text = format!("tiny\n\n{}\n\n\n\nalso tiny", long);
        let config = ChunkingConfig { max_chars: 64, min_chars: 50 };

        let chunks = chunk_text(&text, &config);

        // Neither fragment fits beside the long paragraph, so both stand alone.
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].content, long);
    }

    #[test]
    fn test_indices_contiguous() {
        let text = (0..30).map(sentence).collect::<Vec<_>>().join("\n \n");
        let chunks = chunk_text(&text, &ChunkingConfig { max_chars: 150, min_chars: 10 });

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i as i32);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = (0..25).map(sentence).collect::<Vec<_>>().join("\r\n\r\n");
        let config = ChunkingConfig::default();
        assert_eq!(chunk_text(&text, &config), chunk_text(&text, &config));
    }

    #[test]
    fn test_crlf_and_whitespace_lines_split_paragraphs() {
        let text = "first line\r\nsame paragraph\r\n   \r\nsecond paragraph";
        assert_eq!(
            paragraphs(&text.replace("\r\n", "\n")),
            vec!["first line\nsame paragraph", "second paragraph"]
        );
    }

    #[test]
    fn test_long_paragraph_splits_at_whitespace() {
        let text = "word ".repeat(300);
        let chunks = chunk_text(&text, &ChunkingConfig { max_chars: 1000, min_chars: 1 });

        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.char_count <= 1000);
            assert!(!chunk.content.starts_with(' '));
            assert!(!chunk.content.ends_with(' '));
            assert!(chunk.content.split(' ').all(|w| w == "word"));
        }
    }

    #[test]
    fn test_unbroken_paragraph_splits_at_budget() {
        let text = "x".repeat(250);
        let chunks = chunk_text(&text, &ChunkingConfig { max_chars: 100, min_chars: 1 });

        let sizes: Vec<usize> = chunks.iter().map(|c| c.char_count).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn test_budget_counts_chars_not_bytes() {
        let text = "é".repeat(120);
        let chunks = chunk_text(&text, &ChunkingConfig { max_chars: 100, min_chars: 1 });

        assert_eq!(chunks[0].char_count, 100);
        assert_eq!(chunks[1].char_count, 20);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", &ChunkingConfig::default()).is_empty());
        assert!(chunk_text("\n\n  \n", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn test_content_hash() {
        let chunks = chunk_text(&sentence(1), &ChunkingConfig { max_chars: 1000, min_chars: 1 });
        assert_eq!(chunks[0].content_hash, content_hash(&sentence(1)));
        assert_eq!(chunks[0].content_hash.len(), 64);
    }
}
