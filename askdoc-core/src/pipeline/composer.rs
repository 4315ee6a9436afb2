//! Grounded answer composition.
//!
//! Turns retrieved chunks and a question into a prompt whose answer is
//! constrained to the retrieved evidence, then invokes the generation
//! backend. The grounding discipline lives in the prompt: the model is told
//! to answer only from the supplied context and to say so explicitly when
//! the context does not address the question.

use super::types::RetrievalResult;
use crate::provider::{GenerateRequest, Provider, ProviderError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while generating the answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The backend API returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The call did not complete within the configured timeout.
    #[error("generation request timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, GenerationError>;

/// Separates chunks in the assembled context so adjacent chunk texts can
/// never merge into one token stream.
const CONTEXT_DELIMITER: &str = "\n\n";

/// Composes a grounded answer from retrieved chunks.
///
/// Generation always runs at temperature 0.0: the answer should be a
/// deterministic, factual readout of the context, not a creative writing
/// exercise. Backend failures surface as [`GenerationError`]; the composer
/// never substitutes an answer of its own.
#[derive(Clone)]
pub struct AnswerComposer {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl AnswerComposer {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        max_tokens: Option<u32>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
            timeout,
        }
    }

    /// Generates the final answer for `question` from `retrieved`.
    ///
    /// The retrieved chunks are used in the order given (highest relevance
    /// first). An empty retrieval set still issues the prompt with an empty
    /// context; the instructed behavior is then to state that the document
    /// contains no relevant information, which comes back as a normal
    /// answer, not an error.
    pub async fn compose(
        &self,
        retrieved: &[RetrievalResult],
        question: &str,
        max_answer_length: Option<usize>,
    ) -> Result<String> {
        let prompt = build_prompt(retrieved, question, max_answer_length);
        debug!("composed prompt of {} chars", prompt.len());

        let request = GenerateRequest::new(&self.model, prompt)
            .with_temperature(0.0)
            .with_max_tokens(self.max_tokens);

        let call = self.provider.generate(request);
        let answer = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result?,
            Err(_) => return Err(GenerationError::Timeout(self.timeout)),
        };

        Ok(answer.trim().to_string())
    }
}

/// Builds the grounding prompt from context chunks and the question.
fn build_prompt(
    retrieved: &[RetrievalResult],
    question: &str,
    max_answer_length: Option<usize>,
) -> String {
    let context = retrieved
        .iter()
        .map(|result| result.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER);

    let length_instruction = match max_answer_length {
        Some(sentences) => format!("Answer in no more than {sentences} sentences."),
        None => String::new(),
    };

    format!(
        "Use ONLY the following relevant context to answer the question.\n\
         If the context does not contain enough information to answer the question, \
         say \"I don't have enough information in the provided document to answer this question.\"\n\
         Do not use any external knowledge or make assumptions beyond what is stated in the context.\n\
         Keep the answer concise and factual.\n\n\
         Relevant Context: {context}\n\n\
         Question: {question}\n\n\
         {length_instruction}"
    )
}
