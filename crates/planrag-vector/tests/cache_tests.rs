use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use planrag_core::error::Error;
use planrag_core::{Passage, SourceTag};
use planrag_embed::{Embedder, EmbeddingProvider, FakeEmbedder};
use planrag_vector::DocumentIndexCache;

struct CountingEmbedder {
    inner: FakeEmbedder,
    calls: AtomicUsize,
}

impl Embedder for CountingEmbedder {
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }
}

/// Returns vectors whose length grows with each call.
struct ShiftingDimEmbedder {
    calls: AtomicUsize,
}

impl Embedder for ShiftingDimEmbedder {
    fn dim(&self) -> usize { 0 }
    fn max_len(&self) -> usize { 64 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0; 2 + self.calls.fetch_add(1, Ordering::SeqCst)]).collect())
    }
}

fn passages() -> Vec<Passage> {
    vec![
        Passage::new("Outcome: more homes", SourceTag::Outcome),
        Passage::new("SEA scoping status: Drafted", SourceTag::EnvironmentalAssessment),
        Passage::new("Site North Quay", SourceTag::Site),
    ]
}

fn counting() -> Arc<CountingEmbedder> {
    Arc::new(CountingEmbedder { inner: FakeEmbedder::new(32), calls: AtomicUsize::new(0) })
}

#[test]
fn same_id_returns_same_entry_and_builds_once() {
    let cache = DocumentIndexCache::new();
    let builds = AtomicUsize::new(0);
    let build = || {
        builds.fetch_add(1, Ordering::SeqCst);
        passages()
    };
    let a = cache.get_or_create("plan-1", build);
    let b = cache.get_or_create("plan-1", || {
        builds.fetch_add(1, Ordering::SeqCst);
        Vec::new()
    });
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(b.passages().len(), 3);
    assert_eq!(a.content_hash().len(), 64);
}

#[test]
fn different_ids_do_not_share_entries() {
    let cache = DocumentIndexCache::new();
    let a = cache.get_or_create("plan-a", passages);
    let b = cache.get_or_create("plan-b", || passages()[..1].to_vec());
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(b.passages().len(), 1);
    assert_ne!(a.content_hash(), b.content_hash());
    assert_eq!(cache.len(), 2);
}

#[test]
fn invalidate_drops_entry() {
    let cache = DocumentIndexCache::new();
    let first = cache.get_or_create("plan-1", passages);
    assert!(cache.invalidate("plan-1"));
    assert!(!cache.invalidate("plan-1"));
    let rebuilt = cache.get_or_create("plan-1", Vec::new);
    assert!(!Arc::ptr_eq(&first, &rebuilt));
    assert!(rebuilt.is_empty());
}

#[tokio::test]
async fn vectors_are_computed_once() {
    let embedder = counting();
    let provider = EmbeddingProvider::from_embedder(embedder.clone());
    let cache = DocumentIndexCache::new();
    let entry = cache.get_or_create("plan-1", passages);

    entry.ensure_vectors(&provider).await.expect("first");
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    entry.ensure_vectors(&provider).await.expect("second");
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    assert_eq!(entry.embedded_count().await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_set_of_vectors() {
    let embedder = counting();
    let provider = Arc::new(EmbeddingProvider::from_embedder(embedder.clone()));
    let cache = Arc::new(DocumentIndexCache::new());

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let provider = Arc::clone(&provider);
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let entry = cache.get_or_create("plan-1", passages);
                entry.ensure_vectors(&provider).await
            })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.expect("task").expect("ensure_vectors");
    }
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn rank_orders_by_similarity() {
    let fake = Arc::new(FakeEmbedder::new(64));
    let provider = EmbeddingProvider::from_embedder(fake.clone());
    let entry = DocumentIndexCache::new().get_or_create("plan-1", passages);
    entry.ensure_vectors(&provider).await.expect("vectors");

    let query = fake.embed_text("SEA scoping status: Drafted");
    let ranked = entry.rank(&query).await.expect("rank");
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0].0, 1);
    assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
}

#[tokio::test]
async fn rank_requires_vectors() {
    let entry = DocumentIndexCache::new().get_or_create("plan-1", passages);
    assert!(matches!(entry.rank(&[1.0; 32]).await, Err(Error::Embedding(_))));
}

#[tokio::test]
async fn dimension_mismatch_is_reported() {
    let provider = EmbeddingProvider::from_embedder(Arc::new(ShiftingDimEmbedder { calls: AtomicUsize::new(0) }));
    let entry = DocumentIndexCache::new().get_or_create("plan-1", passages);
    let err = entry.ensure_vectors(&provider).await.expect_err("mismatch");
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, got: 3 }));
    assert_eq!(entry.embedded_count().await, 1, "vectors stored before the failure are kept");
}

#[tokio::test]
async fn query_of_wrong_dimension_is_rejected() {
    let provider = EmbeddingProvider::from_embedder(Arc::new(FakeEmbedder::new(32)));
    let entry = DocumentIndexCache::new().get_or_create("plan-1", passages);
    entry.ensure_vectors(&provider).await.expect("vectors");
    assert!(matches!(entry.rank(&[1.0; 16]).await, Err(Error::DimensionMismatch { expected: 32, got: 16 })));
}

/// Emits a NaN component for passages mentioning "Site".
struct NanEmbedder;

impl Embedder for NanEmbedder {
    fn dim(&self) -> usize { 2 }
    fn max_len(&self) -> usize { 64 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| if t.contains("Site") { vec![f32::NAN, 1.0] } else { vec![1.0, 0.5] }).collect())
    }
}

#[tokio::test]
async fn non_finite_passage_vectors_are_rejected() {
    let provider = EmbeddingProvider::from_embedder(Arc::new(NanEmbedder));
    let entry = DocumentIndexCache::new().get_or_create("plan-1", passages);
    assert!(matches!(entry.ensure_vectors(&provider).await, Err(Error::Embedding(_))));
    assert_eq!(entry.embedded_count().await, 2, "finite vectors before the bad one are kept");
}

#[tokio::test]
async fn non_finite_query_is_rejected() {
    let provider = EmbeddingProvider::from_embedder(Arc::new(FakeEmbedder::new(4)));
    let entry = DocumentIndexCache::new().get_or_create("plan-1", passages);
    entry.ensure_vectors(&provider).await.expect("vectors");
    assert!(matches!(entry.rank(&[f32::INFINITY, 0.0, 0.0, 0.0]).await, Err(Error::Embedding(_))));
}

#[test]
fn entry_remembers_its_document_id() {
    let cache = DocumentIndexCache::new();
    assert_eq!(cache.get_or_create("plan-7", passages).document_id(), "plan-7");
}
