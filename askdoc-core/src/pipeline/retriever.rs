//! Question-driven retrieval over the vector index.

use super::embedder::{Embedder, Result};
use super::index::VectorIndex;
use super::types::RetrievalResult;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Selects the chunks most relevant to a question.
///
/// Embeds the question through the same backend that embedded the chunks,
/// then delegates ranking to [`VectorIndex::query`]. Embedding failures
/// propagate unchanged; a question that cannot be embedded makes retrieval
/// meaningless, so there is no local recovery.
#[derive(Clone)]
pub struct Retriever {
    embedder: Embedder,
}

impl Retriever {
    pub fn new(embedder: Embedder) -> Self {
        Self { embedder }
    }

    /// Returns the top `k` chunks for `question`, best match first.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        question: &str,
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<RetrievalResult>> {
        debug!("embedding question for retrieval");
        let query_embedding = self.embedder.embed(question, cancel).await?;

        let results = index.query(&query_embedding, k);
        debug!("retrieved {} of {} chunks", results.len(), index.count());
        Ok(results)
    }
}
