//! # Text splitting
//!
//! Fixed-window character splitter used by the ingestion pipeline.
//!
//! Documents are cut into chunks of at most `chunk_size` characters where
//! consecutive chunks share exactly `chunk_overlap` trailing/leading
//! characters, except at the document boundary where the final chunk may be
//! shorter. Each chunk records the **character offset** of its first
//! character in the source text, so retrieval results can be located later.
//!
//! For a text of `L` characters the number of produced chunks is `1` when
//! `L <= chunk_size`, otherwise `ceil((L - chunk_overlap) / (chunk_size -
//! chunk_overlap))`.

/// Maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Characters shared between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A contiguous piece of a source document.
///
/// Immutable once produced; ownership is handed to the remote index on upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// The chunk's text, at most `chunk_size` characters.
    pub text: String,
    /// Character offset of the chunk's first character in the source text.
    pub start_index: usize,
}

/// Sliding-window splitter with a fixed overlap.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl TextSplitter {
    /// Create a splitter with the given window size and overlap.
    ///
    /// # Panics
    /// Panics if `chunk_overlap >= chunk_size`; the window would never advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        assert!(
            chunk_overlap < chunk_size,
            "chunk_overlap must be smaller than chunk_size"
        );
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split `text` into overlapping chunks tagged with their start offsets.
    ///
    /// Offsets and lengths are counted in characters, not bytes, so multi-byte
    /// input never splits inside a code point. An empty input produces no
    /// chunks; callers that must reject empty documents do so before splitting.
    pub fn split(&self, text: &str) -> Vec<DocumentChunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let stride = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = usize::min(start + self.chunk_size, chars.len());
            chunks.push(DocumentChunk {
                text: chars[start..end].iter().collect(),
                start_index: start,
            });
            if end == chars.len() {
                break;
            }
            start += stride;
        }

        chunks
    }
}
