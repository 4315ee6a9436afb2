//! Text chunking for the retrieval pipeline.
//!
//! Splits normalized documents into overlapping fixed-size segments. Chunking
//! is what makes a long document searchable: each segment gets its own
//! embedding, so retrieval can select the handful of passages relevant to a
//! question instead of the whole text.

use super::types::{Chunk, Document};
use crate::config::ConfigError;

/// Splits documents into overlapping chunks.
///
/// Each document is windowed independently; text is never merged across
/// document boundaries. The window is `chunk_size` bytes long and advances
/// by `chunk_size - overlap`, snapping to UTF-8 character boundaries so
/// multi-byte characters are never split. The final window is truncated to
/// the remaining text (never padded) and dropped entirely if truncation
/// leaves it empty. A document no longer than `chunk_size` yields exactly
/// one chunk.
///
/// Chunk ids are sequential across the whole call, and every chunk inherits
/// its source document's metadata.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if `chunk_size` is zero or `overlap`
/// is not smaller than `chunk_size`, before any document is touched.
pub fn split(
    documents: &[Document],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ConfigError> {
    if chunk_size == 0 {
        return Err(ConfigError::Invalid(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(ConfigError::Invalid(format!(
            "chunk_overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }

    let mut chunks = Vec::new();
    let mut next_id = 0;

    for document in documents {
        for text in chunk_text(&document.text, chunk_size, overlap) {
            chunks.push(Chunk::new(next_id, text, document.metadata.clone()));
            next_id += 1;
        }
    }

    Ok(chunks)
}

/// Walks a window of `chunk_size` over `text`, advancing by
/// `chunk_size - overlap`, snapping both edges to char boundaries.
fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }

    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());

        // Find the nearest character boundary at or before 'end'
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }

        let chunk = &text[start..end];
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end == text.len() {
            break;
        }

        let step = chunk_size - overlap;
        start += step;

        // Adjust start to the nearest char boundary
        while start < text.len() && !text.is_char_boundary(start) {
            start += 1;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new(text).with_metadata("source", "test")
    }

    #[test]
    fn test_short_text_yields_one_chunk() {
        let chunks = split(&[doc("Hello")], 10, 2).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello");
    }

    #[test]
    fn test_windows_overlap() {
        let chunks = split(&[doc("0123456789ABCDEF")], 10, 2).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "0123456789");
        assert_eq!(chunks[1].text, "89ABCDEF");
    }

    #[test]
    fn test_chunk_count_matches_window_arithmetic() {
        // ceil((L - O) / (S - O)) windows for L > S
        let text = "x".repeat(95);
        let chunks = split(&[doc(&text)], 30, 5).unwrap();
        assert_eq!(chunks.len(), (95usize - 5).div_ceil(30 - 5));
        assert!(chunks.iter().all(|c| c.text.len() <= 30));
    }

    #[test]
    fn test_overlap_stripped_concatenation_reconstructs_text() {
        let text = "The quick brown fox jumps over the lazy dog again and again.";
        let overlap = 4;
        let chunks = split(&[doc(text)], 15, overlap).unwrap();

        let mut rebuilt = chunks[0].text.clone();
        for chunk in &chunks[1..] {
            rebuilt.push_str(&chunk.text[overlap..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_final_window_truncated_never_padded() {
        let chunks = split(&[doc("0123456789AB")], 10, 0).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "AB");
    }

    #[test]
    fn test_documents_are_not_merged() {
        let docs = vec![doc("first document"), doc("second document")];
        let chunks = split(&docs, 100, 0).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "first document");
        assert_eq!(chunks[1].text, "second document");
    }

    #[test]
    fn test_ids_sequential_across_documents() {
        let docs = vec![doc("0123456789ABCDEF"), doc("short")];
        let chunks = split(&docs, 10, 2).unwrap();

        let ids: Vec<usize> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_chunks_inherit_document_metadata() {
        let document = Document::new("0123456789ABCDEF").with_metadata("source", "a.txt");
        let chunks = split(&[document], 10, 2).unwrap();

        assert!(chunks
            .iter()
            .all(|c| c.metadata.get("source").map(String::as_str) == Some("a.txt")));
    }

    #[test]
    fn test_empty_document_yields_no_chunks() {
        let chunks = split(&[doc("")], 10, 2).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_multibyte_text_respects_char_boundaries() {
        let text = "héllo wörld çafé ünïcode tèxt hère";
        let chunks = split(&[doc(text)], 10, 3).unwrap();

        // Every chunk must be valid UTF-8 cut on char boundaries; the
        // slicing itself would panic otherwise.
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| !c.text.is_empty()));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = split(&[doc("text")], 0, 0).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_overlap_not_smaller_than_chunk_size_rejected() {
        let err = split(&[doc("text")], 10, 12).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = split(&[doc("text")], 10, 10).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
