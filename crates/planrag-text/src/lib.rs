//! planrag-text
//!
//! Lexical fallback ranking used when no embedding backend is available.
//! Pure and synchronous: identical input always yields identical output.

pub mod keyword;

pub use keyword::{keyword_rank, keyword_scores, query_terms};
