//! Per-document index cache keyed by document id.
//!
//! Entries are built once from the chunk builder and then live for the rest
//! of the process. Nothing here notices when the underlying plan changes;
//! owners that edit a plan may call `invalidate`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use planrag_core::error::{Error, Result};
use planrag_core::types::{DocumentId, Vector};
use planrag_core::Passage;
use planrag_embed::EmbeddingProvider;

use crate::similarity::rank_by_similarity;

pub struct DocumentIndex {
    document_id: DocumentId,
    passages: Vec<Passage>,
    content_hash: String,
    vectors: tokio::sync::Mutex<Vec<Option<Vector>>>,
}

impl DocumentIndex {
    pub fn new(document_id: impl Into<DocumentId>, passages: Vec<Passage>) -> Self {
        let content_hash = hash_passages(&passages);
        let slots = vec![None; passages.len()];
        Self { document_id: document_id.into(), passages, content_hash, vectors: tokio::sync::Mutex::new(slots) }
    }

    pub fn document_id(&self) -> &str { &self.document_id }
    pub fn passages(&self) -> &[Passage] { &self.passages }
    pub fn is_empty(&self) -> bool { self.passages.is_empty() }

    /// blake3 digest of passage tags and texts at build time.
    pub fn content_hash(&self) -> &str { &self.content_hash }

    /// Number of passages that already have a vector.
    pub async fn embedded_count(&self) -> usize {
        self.vectors.lock().await.iter().filter(|v| v.is_some()).count()
    }

    /// Embed every passage that has no vector yet.
    ///
    /// Holding the slot lock across the embedding calls means concurrent
    /// callers for one document wait for, then reuse, a single set of
    /// vectors. Vectors stored before a failure are kept.
    pub async fn ensure_vectors(&self, provider: &EmbeddingProvider) -> Result<()> {
        let mut slots = self.vectors.lock().await;
        let mut expected_dim = slots.iter().flatten().map(Vec::len).next();
        let mut computed = 0usize;
        for (slot, passage) in slots.iter_mut().zip(&self.passages) {
            if slot.is_some() {
                continue;
            }
            let vector = provider.embed(&passage.text).await?;
            ensure_finite(&vector, "passage")?;
            match expected_dim {
                Some(dim) if dim != vector.len() => {
                    return Err(Error::DimensionMismatch { expected: dim, got: vector.len() });
                }
                _ => expected_dim = Some(vector.len()),
            }
            *slot = Some(vector);
            computed += 1;
        }
        if computed > 0 {
            tracing::debug!(document_id = %self.document_id, computed, "Embedded passages");
        }
        Ok(())
    }

    /// Passage indices ranked by cosine similarity to `query`.
    ///
    /// Fails if any passage is still missing a vector or dimensions disagree.
    pub async fn rank(&self, query: &[f32]) -> Result<Vec<(usize, f32)>> {
        let slots = self.vectors.lock().await;
        let vectors: Vec<&Vector> = slots
            .iter()
            .map(Option::as_ref)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::Embedding(format!("document {} has unembedded passages", self.document_id)))?;
        ensure_finite(query, "query")?;
        if let Some(mismatch) = vectors.iter().find(|v| v.len() != query.len()) {
            return Err(Error::DimensionMismatch { expected: mismatch.len(), got: query.len() });
        }
        Ok(rank_by_similarity(query, &vectors))
    }
}

/// NaN or infinite components would make every similarity score NaN.
fn ensure_finite(vector: &[f32], what: &str) -> Result<()> {
    if vector.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(Error::Embedding(format!("{what} vector has non-finite components")))
    }
}

fn hash_passages(passages: &[Passage]) -> String {
    let mut hasher = blake3::Hasher::new();
    for p in passages {
        hasher.update(p.source_tag.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(p.text.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

#[derive(Default)]
pub struct DocumentIndexCache {
    entries: Mutex<HashMap<DocumentId, Arc<DocumentIndex>>>,
}

impl DocumentIndexCache {
    pub fn new() -> Self { Self::default() }

    /// Return the entry for `document_id`, building it with `build` on first
    /// request. Later calls return the same `Arc` and never call `build`.
    pub fn get_or_create<F>(&self, document_id: &str, build: F) -> Arc<DocumentIndex>
    where
        F: FnOnce() -> Vec<Passage>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(document_id) {
            return Arc::clone(entry);
        }
        let entry = Arc::new(DocumentIndex::new(document_id, build()));
        tracing::debug!(
            document_id,
            passages = entry.passages().len(),
            content_hash = %entry.content_hash(),
            "Built document index"
        );
        entries.insert(document_id.to_string(), Arc::clone(&entry));
        entry
    }

    /// Drop the entry for `document_id`. Returns whether one existed.
    pub fn invalidate(&self, document_id: &str) -> bool {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(document_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
