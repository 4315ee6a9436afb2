//! askdoc - grounded question answering over a single document
//!
//! This is the convenience wrapper crate that re-exports the askdoc pipeline
//! for library users.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! askdoc = "0.1"
//! ```

// Re-export the core pipeline
pub use askdoc_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use askdoc_core::{
        Chunk, Config, Document, OpenAiProvider, Pipeline, PipelineError, Provider,
        RetrievalResult, Source, VectorIndex,
    };
}
