//! Separator-based text splitter.
//!
//! Text is cut on a literal separator and the pieces are greedily packed back
//! together into chunks of at most `chunk_size` characters, with up to
//! `chunk_overlap` characters of trailing pieces repeated at the start of the
//! next chunk.

use serde::{Deserialize, Serialize};

use super::loader::PageDocument;
use crate::core::config::RagConfig;
use crate::core::errors::ApiError;

/// A chunk of a page, ready to be embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub source: String,
    pub page: u32,
    /// Position of the chunk within its page.
    pub chunk_index: usize,
}

#[derive(Debug, Clone)]
pub struct CharacterTextSplitter {
    separator: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl CharacterTextSplitter {
    pub fn new(
        separator: impl Into<String>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, ApiError> {
        if chunk_overlap > chunk_size {
            return Err(ApiError::BadRequest(format!(
                "Got a larger chunk overlap ({}) than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            separator: separator.into(),
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &RagConfig) -> Result<Self, ApiError> {
        Self::new(config.separator.clone(), config.chunk_size, config.chunk_overlap)
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let splits: Vec<&str> = if self.separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(self.separator.as_str())
                .filter(|piece| !piece.is_empty())
                .collect()
        };
        self.merge_splits(&splits)
    }

    pub fn split_documents(&self, documents: &[PageDocument]) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        for document in documents {
            for (chunk_index, text) in self.split_text(&document.page_content).into_iter().enumerate()
            {
                chunks.push(TextChunk {
                    text,
                    source: document.source.clone(),
                    page: document.page,
                    chunk_index,
                });
            }
        }
        chunks
    }

    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let separator_len = char_len(&self.separator);
        let mut docs = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(split);
            let joiner = if current.is_empty() { 0 } else { separator_len };

            if total + len + joiner > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }
                if !current.is_empty() {
                    if let Some(doc) = self.join(&current) {
                        docs.push(doc);
                    }
                    // Drop leading pieces until what is left fits as overlap and leaves room.
                    while total > self.chunk_overlap
                        || (total > 0
                            && total
                                + len
                                + if current.is_empty() { 0 } else { separator_len }
                                > self.chunk_size)
                    {
                        let removed = char_len(current[0])
                            + if current.len() > 1 { separator_len } else { 0 };
                        total -= removed;
                        current.remove(0);
                    }
                }
            }

            current.push(split);
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        if let Some(doc) = self.join(&current) {
            docs.push(doc);
        }
        docs
    }

    fn join(&self, pieces: &[&str]) -> Option<String> {
        let text = pieces.join(&self.separator);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(separator: &str, size: usize, overlap: usize) -> CharacterTextSplitter {
        CharacterTextSplitter::new(separator, size, overlap).unwrap()
    }

    #[test]
    fn rejects_overlap_larger_than_size() {
        assert!(CharacterTextSplitter::new(" ", 5, 10).is_err());
    }

    #[test]
    fn packs_words_with_overlap() {
        let chunks = splitter(" ", 7, 3).split_text("foo bar baz 123");
        assert_eq!(chunks, vec!["foo bar", "bar baz", "baz 123"]);
    }

    #[test]
    fn without_overlap_pieces_are_not_repeated() {
        let chunks = splitter(" ", 3, 0).split_text("foo bar baz a a");
        assert_eq!(chunks, vec!["foo", "bar", "baz", "a a"]);
    }

    #[test]
    fn empty_pieces_are_dropped() {
        let chunks = splitter(" ", 2, 0).split_text("a  b");
        assert_eq!(chunks, vec!["a", "b"]);
    }

    #[test]
    fn oversized_piece_is_kept_whole() {
        let chunks = splitter("\n\n", 10, 0).split_text("short\n\nthis paragraph is far too long\n\nend");
        assert_eq!(chunks, vec!["short", "this paragraph is far too long", "end"]);
    }

    #[test]
    fn paragraphs_fit_in_one_chunk() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird.";
        let chunks = splitter("\n\n", 500, 50).split_text(text);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn empty_separator_splits_into_characters() {
        let chunks = splitter("", 2, 0).split_text("abcde");
        assert_eq!(chunks, vec!["ab", "cd", "e"]);
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let chunks = splitter(" ", 5, 0).split_text("éééé ààààà");
        assert_eq!(chunks, vec!["éééé", "ààààà"]);
    }

    #[test]
    fn whitespace_only_text_yields_nothing() {
        assert!(splitter("\n\n", 10, 0).split_text("  \n\n \n\n").is_empty());
    }

    #[test]
    fn split_documents_keeps_page_metadata() {
        let docs = vec![
            PageDocument {
                page_content: "alpha beta".to_string(),
                source: "a.pdf".to_string(),
                page: 0,
            },
            PageDocument {
                page_content: "gamma".to_string(),
                source: "a.pdf".to_string(),
                page: 1,
            },
        ];
        let chunks = splitter(" ", 5, 0).split_documents(&docs);

        assert_eq!(chunks.len(), 3);
        assert_eq!((chunks[0].text.as_str(), chunks[0].page, chunks[0].chunk_index), ("alpha", 0, 0));
        assert_eq!((chunks[1].text.as_str(), chunks[1].page, chunks[1].chunk_index), ("beta", 0, 1));
        assert_eq!((chunks[2].text.as_str(), chunks[2].page, chunks[2].chunk_index), ("gamma", 1, 0));
        assert!(chunks.iter().all(|c| c.source == "a.pdf"));
    }
}
