//! Fixed-size document chunking with proper Unicode support

/// Splits extracted document text into contiguous, non-overlapping passages.
/// All size calculations are based on **character count**, not byte count,
/// so multi-byte text (CJK, emoji, etc.) is never cut inside a character.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    /// Passage size in characters (not bytes)
    chunk_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { chunk_chars: 500 }
    }
}

impl Chunker {
    /// Create a new chunker producing passages of `chunk_chars` characters
    pub fn new(chunk_chars: usize) -> Self {
        Self {
            chunk_chars: chunk_chars.max(1),
        }
    }

    pub fn chunk_chars(&self) -> usize {
        self.chunk_chars
    }

    /// Chunk text into passages in document order; the last one may be shorter
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::with_capacity(text.len() / self.chunk_chars + 1);
        let mut start = 0;
        let mut count = 0;

        for (byte_idx, _) in text.char_indices() {
            if count == self.chunk_chars {
                chunks.push(text[start..byte_idx].to_string());
                start = byte_idx;
                count = 0;
            }
            count += 1;
        }

        if count > 0 {
            chunks.push(text[start..].to_string());
        }

        chunks
    }
}
