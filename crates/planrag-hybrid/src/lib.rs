//! planrag-hybrid
//!
//! Answers "which passages of this plan are relevant to this question".
//! Ranks by embedding similarity when the embedding backend is available and
//! by keyword overlap otherwise. Retrieval never fails: every embedding
//! problem degrades to the keyword ranking.

use std::sync::{Arc, OnceLock};

use planrag_core::config::{Config, DEFAULT_TOP_K};
use planrag_core::error::{Error, Result};
use planrag_core::{build_passages, Passage, PlanSnapshot, PolicySet};
use planrag_embed::EmbeddingProvider;
use planrag_text::keyword_rank;
use planrag_vector::{DocumentIndex, DocumentIndexCache};

/// Which ranking produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMode {
    Semantic,
    Keyword,
}

#[derive(Debug, Clone)]
pub struct Retrieval {
    pub passages: Vec<Passage>,
    pub mode: RankingMode,
}

pub struct Retriever {
    provider: Arc<EmbeddingProvider>,
    cache: DocumentIndexCache,
    default_top_k: usize,
}

impl Retriever {
    pub fn new(provider: Arc<EmbeddingProvider>) -> Self {
        Self { provider, cache: DocumentIndexCache::new(), default_top_k: DEFAULT_TOP_K }
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k.max(1);
        self
    }

    /// Process-wide retriever bound to [`EmbeddingProvider::global`].
    pub fn global() -> &'static Retriever {
        static GLOBAL: OnceLock<Retriever> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let top_k = match Config::load().and_then(|c| c.retrieval()) {
                Ok(settings) => settings.default_top_k,
                Err(e) => {
                    tracing::warn!(error = %e, "Falling back to default retrieval settings");
                    DEFAULT_TOP_K
                }
            };
            Retriever::new(EmbeddingProvider::global()).with_default_top_k(top_k)
        })
    }

    pub fn cache(&self) -> &DocumentIndexCache { &self.cache }

    /// Drop the cached index for a plan so the next query rebuilds it.
    pub fn invalidate(&self, document_id: &str) -> bool {
        self.cache.invalidate(document_id)
    }

    /// Top `top_k` passages of `plan` for `query` (default top-k when `None`).
    pub async fn retrieve(&self, query: &str, plan: &PlanSnapshot, policies: Option<&PolicySet>, top_k: Option<usize>) -> Vec<Passage> {
        self.retrieve_detailed(query, plan, policies, top_k).await.passages
    }

    pub async fn retrieve_detailed(
        &self,
        query: &str,
        plan: &PlanSnapshot,
        policies: Option<&PolicySet>,
        top_k: Option<usize>,
    ) -> Retrieval {
        let top_k = top_k.unwrap_or(self.default_top_k).max(1);
        let index = self.cache.get_or_create(&plan.id, || build_passages(plan, policies));
        if index.is_empty() {
            return Retrieval { passages: Vec::new(), mode: RankingMode::Keyword };
        }

        let (mut passages, mode) = if query.trim().is_empty() {
            (keyword_rank(query, index.passages()), RankingMode::Keyword)
        } else {
            match self.semantic_rank(query, &index).await {
                Ok(ranked) => (ranked, RankingMode::Semantic),
                Err(Error::EmbeddingUnavailable) => (keyword_rank(query, index.passages()), RankingMode::Keyword),
                Err(e) => {
                    tracing::warn!(document_id = %plan.id, error = %e, "Embedding failed, using keyword fallback");
                    (keyword_rank(query, index.passages()), RankingMode::Keyword)
                }
            }
        };
        passages.truncate(top_k);
        tracing::debug!(document_id = %plan.id, ?mode, returned = passages.len(), "Retrieved passages");
        Retrieval { passages, mode }
    }

    async fn semantic_rank(&self, query: &str, index: &DocumentIndex) -> Result<Vec<Passage>> {
        if self.provider.get().await.is_none() {
            return Err(Error::EmbeddingUnavailable);
        }
        index.ensure_vectors(&self.provider).await?;
        let query_vector = self.provider.embed(query).await?;
        let ranked = index.rank(&query_vector).await?;
        Ok(ranked.into_iter().map(|(i, _)| index.passages()[i].clone()).collect())
    }
}

/// Retrieve with the process-wide retriever.
pub async fn retrieve(query: &str, plan: &PlanSnapshot, policies: Option<&PolicySet>, top_k: Option<usize>) -> Vec<Passage> {
    Retriever::global().retrieve(query, plan, policies, top_k).await
}
