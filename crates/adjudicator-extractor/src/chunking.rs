//! Text chunking strategies for extracted documents

use crate::config::ChunkStrategy;
use adjudicator_domain::TextChunk;

/// Chunks text according to the specified strategy
///
/// Sizes are counted in characters, never bytes, so a chunk boundary never
/// splits a UTF-8 sequence. Whitespace-only pieces are dropped and the
/// remaining chunks are numbered densely from zero in source order.
pub struct TextChunker {
    strategy: ChunkStrategy,
    max_chunk_size: usize,
}

impl TextChunker {
    /// Create a new text chunker
    pub fn new(strategy: ChunkStrategy, max_chunk_size: usize) -> Self {
        Self {
            strategy,
            max_chunk_size: max_chunk_size.max(1),
        }
    }

    /// Chunk the given text
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let pieces = match self.strategy {
            ChunkStrategy::FixedLength => split_at_char_limit(text, self.max_chunk_size)
                .into_iter()
                .map(str::to_string)
                .collect(),
            ChunkStrategy::ByParagraph => self.chunk_by_paragraph(text),
        };

        pieces
            .into_iter()
            .filter(|piece| !piece.trim().is_empty())
            .enumerate()
            .map(|(index, piece)| TextChunk::new(index, piece))
            .collect()
    }

    /// Chunk by paragraphs (blank-line separated)
    fn chunk_by_paragraph(&self, text: &str) -> Vec<String> {
        let mut paragraphs = Vec::new();
        let mut current = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    paragraphs.push(current.join("\n"));
                    current.clear();
                }
            } else {
                current.push(line.trim_end());
            }
        }
        if !current.is_empty() {
            paragraphs.push(current.join("\n"));
        }

        self.combine_until_limit(paragraphs)
    }

    /// Combine paragraphs until they reach the size limit
    fn combine_until_limit(&self, paragraphs: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for paragraph in paragraphs {
            let paragraph_len = paragraph.chars().count();
            let separator = if current.is_empty() { 0 } else { 2 };

            if current_len + separator + paragraph_len > self.max_chunk_size {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }

                // A single paragraph over the limit is split hard
                if paragraph_len > self.max_chunk_size {
                    chunks.extend(
                        split_at_char_limit(&paragraph, self.max_chunk_size)
                            .into_iter()
                            .map(str::to_string),
                    );
                    continue;
                }
            }

            if !current.is_empty() {
                current.push_str("\n\n");
                current_len += 2;
            }
            current.push_str(&paragraph);
            current_len += paragraph_len;
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

/// Split text into consecutive windows of at most `limit` characters
fn split_at_char_limit(text: &str, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == limit {
            pieces.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}
