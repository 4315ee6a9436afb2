//! LLM backend abstraction layer.
//!
//! This module defines a common interface for the embedding and generation
//! backends behind the pipeline, plus the OpenAI-compatible HTTP
//! implementation used in production.

mod openai;
mod types;

// Re-export common types
pub use types::{GenerateRequest, Provider, ProviderError, Result};

// Re-export provider implementations
pub use openai::OpenAiProvider;

#[cfg(test)]
pub(crate) mod stub {
    //! Deterministic in-process backend for tests.

    use super::types::{GenerateRequest, Provider, ProviderError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const REFUSAL: &str =
        "I don't have enough information in the provided document to answer this question.";

    /// A provider whose embeddings are a pure function of the input text and
    /// whose answers obey the grounding instructions: it answers with the
    /// context sentence matching the question, or refuses when the context
    /// does not address it.
    pub(crate) struct StubProvider {
        /// Number of successful embed calls before the backend starts failing.
        pub(crate) embed_failures_after: Option<usize>,
        /// When set, generation always fails.
        pub(crate) generation_fails: bool,
        embed_calls: AtomicUsize,
    }

    impl StubProvider {
        pub(crate) fn new() -> Self {
            Self {
                embed_failures_after: None,
                generation_fails: false,
                embed_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing_embeddings_after(calls: usize) -> Self {
            Self {
                embed_failures_after: Some(calls),
                ..Self::new()
            }
        }

        pub(crate) fn failing_generation() -> Self {
            Self {
                generation_fails: true,
                ..Self::new()
            }
        }
    }

    /// Bucket byte frequencies into a small fixed-dimension vector. Texts
    /// sharing words land near each other, which is all the tests need.
    pub(crate) fn stub_embedding(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; 8];
        for byte in text.bytes() {
            vector[(byte as usize) % 8] += 1.0;
        }
        vector
    }

    fn context_of(prompt: &str) -> &str {
        let start = prompt.find("Relevant Context:").map(|i| i + "Relevant Context:".len());
        let end = prompt.rfind("Question:");
        match (start, end) {
            (Some(start), Some(end)) if start <= end => &prompt[start..end],
            _ => "",
        }
    }

    fn question_of(prompt: &str) -> &str {
        prompt
            .rfind("Question:")
            .map(|i| &prompt[i + "Question:".len()..])
            .unwrap_or("")
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn generate(&self, request: GenerateRequest) -> Result<String> {
            if self.generation_fails {
                return Err(ProviderError::Api("503: backend unavailable".to_string()));
            }

            let context = context_of(&request.prompt);
            let question = question_of(&request.prompt).to_lowercase();

            // Answer with the context sentence containing a substantive
            // question word, or refuse. Mirrors an obedient grounded model.
            let matched = context
                .split_inclusive('.')
                .find(|sentence| {
                    let sentence = sentence.to_lowercase();
                    question
                        .split(|c: char| !c.is_alphanumeric())
                        .filter(|word| word.len() >= 6)
                        .any(|word| sentence.contains(word))
                })
                .map(|sentence| sentence.trim().to_string());

            Ok(matched.unwrap_or_else(|| REFUSAL.to_string()))
        }

        async fn embed(&self, text: &str, _model: &str) -> Result<Vec<f32>> {
            let call = self.embed_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(limit) = self.embed_failures_after {
                if call >= limit {
                    return Err(ProviderError::Api("429: quota exceeded".to_string()));
                }
            }
            Ok(stub_embedding(text))
        }
    }
}
