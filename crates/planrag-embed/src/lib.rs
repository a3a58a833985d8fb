//! planrag-embed
//!
//! Embedding backends and the lazily-initialized provider that shares one
//! backend across every caller in the process.

pub mod fake;
pub mod model;
pub mod provider;

pub use fake::FakeEmbedder;
pub use model::BgeM3Embedder;
pub use planrag_core::traits::Embedder;
pub use provider::{backend_for, get_default_embedder, EmbeddingProvider};
