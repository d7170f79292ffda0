/// Splits long documents into overlapping chunks sized in approximate tokens
/// (one token per four characters).
#[derive(Debug, Clone, Copy)]
pub struct DocumentChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

impl DocumentChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn num_tokens(text: &str) -> usize {
        text.chars().count() / 4
    }

    /// Chunk a document. Breaks prefer whitespace in the back half of a
    /// window; an empty document yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if Self::num_tokens(trimmed) <= self.chunk_size {
            return vec![trimmed.to_string()];
        }

        let chars: Vec<char> = trimmed.chars().collect();
        let window = self.chunk_size * 4;
        let overlap = self.chunk_overlap * 4;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let mut end = (start + window).min(chars.len());
            if end < chars.len() {
                let floor = start + window / 2;
                if let Some(pos) = (floor..end).rev().find(|&i| chars[i].is_whitespace()) {
                    end = pos;
                }
            }

            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if end >= chars.len() {
                break;
            }

            let next = end.saturating_sub(overlap);
            start = if next > start { next } else { end };
        }

        chunks
    }
}
