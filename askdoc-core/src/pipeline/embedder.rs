//! Embedding generation for chunks and questions.
//!
//! Wraps the backend capability with the run-level concerns the pipeline
//! needs: a per-call timeout, a bounded worker pool for embedding many
//! chunks against a network backend, and cancellation.

use super::types::Chunk;
use crate::provider::{Provider, ProviderError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Errors that can occur during embedding generation.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The backend API returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The call did not complete within the configured timeout.
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend returned no embedding for the input.
    ///
    /// Surfaced as an error rather than substituted with a zero vector: a
    /// zero vector would silently corrupt similarity ranking.
    #[error("backend returned no embedding")]
    Empty,

    /// The run was cancelled while embeddings were in flight.
    #[error("embedding cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Generates vector embeddings through the backend capability.
///
/// The embedder is `Clone` and cheap to share; the backend lives behind an
/// `Arc`. Every call runs under the configured timeout and observes the
/// run's cancellation token.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
    workers: usize,
}

impl Embedder {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        timeout: Duration,
        workers: usize,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout,
            workers: workers.max(1),
        }
    }

    /// Generates an embedding for a single text.
    ///
    /// # Errors
    ///
    /// Fails with [`EmbeddingError::Cancelled`] if the token fires first,
    /// [`EmbeddingError::Timeout`] on timeout, and never falls back to a
    /// default vector on backend failure.
    pub async fn embed(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<f32>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EmbeddingError::Cancelled),
            result = self.embed_with_timeout(text) => result,
        }
    }

    /// Embeds a batch of chunks through a bounded worker pool.
    ///
    /// Chunk embeddings are independent of each other, so up to `workers`
    /// requests run concurrently to hide backend latency. Results come back
    /// in the chunks' original order. On the first failure the remaining
    /// in-flight calls are cancelled and the error is returned; the caller
    /// gets either every embedding or none.
    pub async fn embed_chunks(
        &self,
        chunks: Vec<Chunk>,
        cancel: &CancellationToken,
    ) -> Result<Vec<(Chunk, Vec<f32>)>> {
        info!("Embedding {} chunks ({} workers)", chunks.len(), self.workers);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let batch_cancel = cancel.child_token();
        let mut handles = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let embedder = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = batch_cancel.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| EmbeddingError::Cancelled)?;
                debug!(chunk = chunk.id, "embedding chunk");
                let embedding = embedder.embed(&chunk.text, &cancel).await?;
                Ok::<_, EmbeddingError>((chunk, embedding))
            }));
        }

        let mut embedded = Vec::with_capacity(handles.len());
        let mut failure = None;

        for handle in handles {
            let result = handle.await.unwrap_or(Err(EmbeddingError::Cancelled));
            match result {
                Ok(pair) => embedded.push(pair),
                Err(err) => {
                    if failure.is_none() {
                        // One signal aborts everything still outstanding.
                        batch_cancel.cancel();
                        failure = Some(err);
                    }
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(embedded),
        }
    }

    async fn embed_with_timeout(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.provider.embed(text, &self.model);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => {
                let embedding = result?;
                if embedding.is_empty() {
                    return Err(EmbeddingError::Empty);
                }
                Ok(embedding)
            }
            Err(_) => Err(EmbeddingError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::{stub_embedding, StubProvider};
    use std::collections::HashMap;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(id, text)| Chunk::new(id, *text, HashMap::new()))
            .collect()
    }

    fn embedder(provider: StubProvider) -> Embedder {
        Embedder::new(
            Arc::new(provider),
            "stub-model",
            Duration::from_secs(5),
            2,
        )
    }

    #[tokio::test]
    async fn test_embed_chunks_preserves_order() {
        let embedder = embedder(StubProvider::new());
        let cancel = CancellationToken::new();

        let input = chunks(&["alpha", "beta", "gamma"]);
        let embedded = embedder.embed_chunks(input, &cancel).await.unwrap();

        assert_eq!(embedded.len(), 3);
        for (i, (chunk, embedding)) in embedded.iter().enumerate() {
            assert_eq!(chunk.id, i);
            assert_eq!(embedding, &stub_embedding(&chunk.text));
        }
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_not_defaulted() {
        let embedder = embedder(StubProvider::failing_embeddings_after(0));
        let cancel = CancellationToken::new();

        let err = embedder
            .embed_chunks(chunks(&["alpha"]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Provider(_)));
    }

    #[tokio::test]
    async fn test_failure_after_first_call_fails_whole_batch() {
        let embedder = embedder(StubProvider::failing_embeddings_after(1));
        let cancel = CancellationToken::new();

        let result = embedder
            .embed_chunks(chunks(&["alpha", "beta", "gamma"]), &cancel)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_embedding() {
        let embedder = embedder(StubProvider::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = embedder.embed("alpha", &cancel).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Cancelled));
    }
}
