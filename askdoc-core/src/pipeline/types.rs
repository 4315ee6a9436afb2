use std::collections::HashMap;

/// A normalized document produced by a loader.
///
/// Documents are the input to the chunking stage. Each document carries the
/// full text of one loaded unit (a web page, a PDF, a file, or raw text)
/// plus metadata identifying where it came from. Documents are immutable
/// once created; the core never inspects the source kind again after
/// loading.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A bounded contiguous slice of a document's text, the unit of embedding
/// and retrieval.
///
/// Chunks receive a sequential id unique within one pipeline build and
/// inherit the metadata of the document they were cut from. The embedding
/// is attached once by the embedding stage and the chunk is treated as
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: usize,
    pub text: String,
    pub metadata: HashMap<String, String>,
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(id: usize, text: impl Into<String>, metadata: HashMap<String, String>) -> Self {
        Self {
            id,
            text: text.into(),
            metadata,
            embedding: None,
        }
    }
}

/// A retrieved chunk together with its similarity score.
///
/// Returned by index queries, ordered by descending score. Scores come from
/// cosine similarity, so they range from -1.0 (opposite) to 1.0 (identical);
/// in practice text embeddings land between 0.0 and 1.0. Equal scores are
/// ordered by ascending chunk id so retrieval is fully deterministic.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub score: f32,
}
