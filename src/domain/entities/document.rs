use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Text of one loaded source unit (a PDF page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
    /// Position of the chunk within its document.
    pub index: usize,
    /// Character offset of the chunk's first character in the document.
    pub start: usize,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

const SEPARATORS: [&[char]; 3] = [&['\n', '\n'], &['\n'], &[' ']];

/// Splits documents into overlapping character windows.
///
/// Every chunk is a contiguous span of at most `chunk_size` characters. The
/// next chunk starts `chunk_overlap` characters before the previous one ended,
/// so adjacent chunks share exactly `chunk_overlap` characters. Cut points
/// prefer a paragraph break, then a line break, then a space.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, DomainError> {
        if chunk_size == 0 {
            return Err(DomainError::split("chunk size must be greater than zero"));
        }
        if chunk_overlap >= chunk_size {
            return Err(DomainError::split(format!(
                "chunk overlap ({chunk_overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = document.text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = if start + self.chunk_size >= len {
                len
            } else {
                self.cut_point(&chars, start)
            };

            chunks.push(Chunk {
                text: chars[start..end].iter().collect(),
                source: document.source.clone(),
                page: document.page,
                index: chunks.len(),
                start,
            });

            if end == len {
                break;
            }
            // cut_point never returns a cut at or before start + overlap
            start = end - self.chunk_overlap;
        }

        chunks
    }

    pub fn split_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.split(doc)).collect()
    }

    fn cut_point(&self, chars: &[char], start: usize) -> usize {
        let limit = start + self.chunk_size;
        let floor = start + self.chunk_overlap;

        for separator in SEPARATORS {
            let found = (floor + 1..=limit).rev().find(|&cut| {
                cut >= separator.len() && chars[cut - separator.len()..cut] == *separator
            });
            if let Some(cut) = found {
                return cut;
            }
        }

        limit
    }
}
