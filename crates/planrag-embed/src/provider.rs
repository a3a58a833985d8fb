//! Process-wide, lazily-initialized embedding provider.
//!
//! The backend is built at most once per provider. Concurrent first callers
//! await the same in-flight initialization. A failed initialization is
//! remembered for the life of the provider and never retried; callers see the
//! provider as unavailable and fall back to keyword ranking.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use planrag_core::config::{Config, EmbeddingSettings};
use planrag_core::error::{Error, Result};
use planrag_core::traits::Embedder;
use tokio::sync::OnceCell;

use crate::fake::FakeEmbedder;
use crate::model::BgeM3Embedder;

type InitFn = dyn Fn() -> anyhow::Result<Arc<dyn Embedder>> + Send + Sync;

pub struct EmbeddingProvider {
    init: Arc<InitFn>,
    backend: OnceCell<Option<Arc<dyn Embedder>>>,
    init_attempts: AtomicUsize,
}

impl EmbeddingProvider {
    /// Wrap a blocking backend constructor. Nothing runs until the first `get`.
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Embedder>> + Send + Sync + 'static,
    {
        Self { init: Arc::new(init), backend: OnceCell::new(), init_attempts: AtomicUsize::new(0) }
    }

    pub fn from_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self::new(move || Ok(Arc::clone(&embedder)))
    }

    /// The provider used by the process-wide retriever. Its backend is chosen
    /// from configuration on first use.
    pub fn global() -> Arc<EmbeddingProvider> {
        static GLOBAL: OnceLock<Arc<EmbeddingProvider>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(EmbeddingProvider::new(get_default_embedder))))
    }

    /// The shared backend, or `None` if initialization failed.
    pub async fn get(&self) -> Option<Arc<dyn Embedder>> {
        self.backend.get_or_init(|| self.initialize()).await.clone()
    }

    async fn initialize(&self) -> Option<Arc<dyn Embedder>> {
        self.init_attempts.fetch_add(1, Ordering::SeqCst);
        let init = Arc::clone(&self.init);
        match tokio::task::spawn_blocking(move || (init.as_ref())()).await {
            Ok(Ok(embedder)) => {
                tracing::info!(dim = embedder.dim(), "Embedding backend ready");
                Some(embedder)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Embedding backend unavailable, using keyword fallback");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Embedding backend initialization aborted, using keyword fallback");
                None
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.initialized()
    }

    /// How many times the backend constructor has run (0 or 1).
    pub fn init_attempts(&self) -> usize {
        self.init_attempts.load(Ordering::SeqCst)
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("backend returned no vector".into()))
    }

    /// Embed on the blocking pool. No caching happens at this level.
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let embedder = self.get().await.ok_or(Error::EmbeddingUnavailable)?;
        let expected = texts.len();
        let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?
            .map_err(|e| Error::Embedding(e.to_string()))?;
        if vectors.len() != expected {
            return Err(Error::Embedding(format!("backend returned {} vectors for {} texts", vectors.len(), expected)));
        }
        Ok(vectors)
    }
}

/// Pick the backend for `settings`: the fake embedder when requested,
/// otherwise the local BGE-M3 model.
pub fn backend_for(settings: &EmbeddingSettings) -> anyhow::Result<Arc<dyn Embedder>> {
    if settings.use_fake {
        tracing::info!(dim = settings.fake_dim, "Using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.fake_dim)));
    }
    Ok(Arc::new(BgeM3Embedder::load(settings)?))
}

/// Load configuration and build the configured backend.
///
/// Respects `APP_USE_FAKE_EMBEDDINGS=1` and `APP_MODEL_DIR`.
pub fn get_default_embedder() -> anyhow::Result<Arc<dyn Embedder>> {
    let settings = Config::load()?.embedding()?;
    backend_for(&settings)
}
