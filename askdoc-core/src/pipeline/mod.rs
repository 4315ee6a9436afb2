//! The question-answering pipeline.
//!
//! This module sequences the whole run: load a source into documents, split
//! them into chunks, embed and index the chunks, retrieve the subset
//! relevant to the question, and compose a grounded answer.
//!
//! # Architecture
//!
//! - [`chunker`]: fixed-size overlapping text segmentation
//! - [`Embedder`]: text-to-vector capability with timeout and cancellation
//! - [`VectorIndex`]: in-memory cosine-similarity index
//! - [`Retriever`]: question embedding + top-k selection
//! - [`AnswerComposer`]: grounded prompt assembly + generation
//! - [`Pipeline`]: the state machine driving one run end to end
//!
//! # How a run proceeds
//!
//! ```text
//! Start → Loaded → Chunked → Indexed → Retrieved → Answered → Done
//!                                                               ↑
//!    any component failure ───────────────────────→ Failed (terminal)
//! ```
//!
//! Each transition invokes exactly one component with fields already in the
//! [`PipelineState`], writes the result back, and advances. Errors are never
//! retried here and never downgraded to a default answer; they surface as
//! [`PipelineError`] with the originating cause intact.

pub mod chunker;
mod composer;
mod embedder;
mod index;
mod retriever;
pub mod types;

pub use composer::{AnswerComposer, GenerationError};
pub use embedder::{Embedder, EmbeddingError};
pub use index::{IndexError, VectorIndex};
pub use retriever::Retriever;
pub use types::{Chunk, Document, RetrievalResult};

use crate::config::{Config, ConfigError};
use crate::loader::{self, LoadError, Source};
use crate::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Errors that abort a pipeline run.
///
/// Each variant carries the originating component error unmodified; the
/// orchestrator adds nothing and hides nothing.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to load source: {0}")]
    Load(#[from] LoadError),

    #[error("embedding failed: {0}")]
    Embedding(EmbeddingError),

    #[error("vector index rejected a chunk: {0}")]
    Index(#[from] IndexError),

    #[error("answer generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("run cancelled")]
    Cancelled,
}

impl From<EmbeddingError> for PipelineError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Embedding(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// The stages of one run.
///
/// `Done` is the only successful terminal stage; `Failed` is terminal and
/// reachable from every other stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Loaded,
    Chunked,
    Indexed,
    Retrieved,
    Answered,
    Done,
    Failed,
}

/// Mutable state threaded through one run.
///
/// Exactly one instance exists per run, owned by the [`Pipeline`]; each
/// stage reads the fields earlier stages wrote and fills in its own. Nothing
/// is shared across runs.
#[derive(Debug)]
pub struct PipelineState {
    pub stage: Stage,
    pub source: Source,
    pub question: String,
    pub max_answer_length: Option<usize>,
    pub documents: Vec<Document>,
    pub chunks: Vec<Chunk>,
    pub index: VectorIndex,
    pub retrieved: Vec<RetrievalResult>,
    pub answer: String,
}

impl PipelineState {
    fn new(source: Source, question: impl Into<String>, max_answer_length: Option<usize>) -> Self {
        Self {
            stage: Stage::Start,
            source,
            question: question.into(),
            max_answer_length,
            documents: Vec::new(),
            chunks: Vec::new(),
            index: VectorIndex::new(),
            retrieved: Vec::new(),
            answer: String::new(),
        }
    }
}

/// Drives one question-answering run end to end.
///
/// The pipeline validates its configuration up front, owns the run's
/// cancellation token, and walks the stage machine until `Done` or
/// `Failed`. Every run builds its own [`PipelineState`] and
/// [`VectorIndex`], so separate runs share nothing.
///
/// # Example
///
/// ```no_run
/// use askdoc_core::{Config, OpenAiProvider, Pipeline, Source};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), askdoc_core::PipelineError> {
/// let config = Config::load_or_default();
/// let provider = Arc::new(OpenAiProvider::new(
///     &config.llm.base_url,
///     &config.llm.api_key,
/// ));
/// let pipeline = Pipeline::new(config, provider)?;
///
/// let answer = pipeline
///     .run(
///         Source::DirectText("Paris is the capital of France.".into()),
///         "What is the capital of France?",
///         None,
///     )
///     .await?;
/// println!("{answer}");
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    config: Config,
    embedder: Embedder,
    retriever: Retriever,
    composer: AnswerComposer,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline from a validated configuration and a backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the chunking or search parameters are
    /// invalid; nothing runs with a bad configuration.
    pub fn new(config: Config, provider: Arc<dyn Provider>) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let embedder = Embedder::new(
            Arc::clone(&provider),
            config.embedding.model.clone(),
            Duration::from_secs(config.embedding.timeout_secs),
            config.embedding.workers,
        );
        let retriever = Retriever::new(embedder.clone());
        let composer = AnswerComposer::new(
            provider,
            config.llm.model.clone(),
            config.llm.max_tokens,
            Duration::from_secs(config.llm.timeout_secs),
        );

        Ok(Self {
            config,
            embedder,
            retriever,
            composer,
            cancel: CancellationToken::new(),
        })
    }

    /// Returns a token that cancels this pipeline's in-flight work.
    ///
    /// Cancelling aborts the run at its current stage; outstanding
    /// embedding calls observe the same token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the pipeline and returns the final answer.
    pub async fn run(
        &self,
        source: Source,
        question: &str,
        max_answer_length: Option<usize>,
    ) -> Result<String> {
        self.execute(source, question, max_answer_length)
            .await
            .map(|state| state.answer)
    }

    /// Runs the pipeline and returns the full terminal state.
    ///
    /// Useful when the caller wants to inspect the chunks or the retrieval
    /// ranking alongside the answer.
    pub async fn execute(
        &self,
        source: Source,
        question: &str,
        max_answer_length: Option<usize>,
    ) -> Result<PipelineState> {
        let mut state = PipelineState::new(source, question, max_answer_length);

        loop {
            if self.cancel.is_cancelled() {
                state.stage = Stage::Failed;
                return Err(PipelineError::Cancelled);
            }

            match self.step(&mut state).await {
                Ok(Stage::Done) => {
                    state.stage = Stage::Done;
                    info!("pipeline done");
                    return Ok(state);
                }
                Ok(stage) => {
                    debug!(?stage, "pipeline advanced");
                    state.stage = stage;
                }
                Err(err) => {
                    state.stage = Stage::Failed;
                    return Err(err);
                }
            }
        }
    }

    /// Executes the exit action of the current stage and returns the next.
    async fn step(&self, state: &mut PipelineState) -> Result<Stage> {
        match state.stage {
            Stage::Start => {
                state.documents = loader::load(&state.source).await?;
                info!("loaded {} document(s)", state.documents.len());
                Ok(Stage::Loaded)
            }
            Stage::Loaded => {
                state.chunks = chunker::split(
                    &state.documents,
                    self.config.pipeline.chunk_size,
                    self.config.pipeline.chunk_overlap,
                )?;
                info!("split into {} chunk(s)", state.chunks.len());
                Ok(Stage::Chunked)
            }
            Stage::Chunked => {
                let embedded = self
                    .embedder
                    .embed_chunks(state.chunks.clone(), &self.cancel)
                    .await?;
                for (chunk, embedding) in embedded {
                    state.index.insert(chunk, embedding)?;
                }
                info!("indexed {} chunk(s)", state.index.count());
                Ok(Stage::Indexed)
            }
            Stage::Indexed => {
                state.retrieved = self
                    .retriever
                    .retrieve(
                        &state.index,
                        &state.question,
                        self.config.pipeline.top_k,
                        &self.cancel,
                    )
                    .await?;
                info!("retrieved {} chunk(s)", state.retrieved.len());
                Ok(Stage::Retrieved)
            }
            Stage::Retrieved => {
                state.answer = self
                    .composer
                    .compose(&state.retrieved, &state.question, state.max_answer_length)
                    .await?;
                Ok(Stage::Answered)
            }
            Stage::Answered => Ok(Stage::Done),
            Stage::Done | Stage::Failed => unreachable!("terminal stage stepped"),
        }
    }
}
