/// A synchronous text embedding backend.
///
/// Implementations are expected to be expensive to construct and cheap to
/// share; the async provider runs calls on the blocking pool.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
