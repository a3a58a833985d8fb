//! In-memory vector side of retrieval: cosine scoring and the per-document
//! index cache that holds passages and their lazily computed vectors.

pub mod cache;
pub mod similarity;

pub use cache::{DocumentIndex, DocumentIndexCache};
pub use similarity::{cosine_similarity, rank_by_similarity, SIMILARITY_EPSILON};
