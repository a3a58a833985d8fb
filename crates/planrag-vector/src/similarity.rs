pub const SIMILARITY_EPSILON: f32 = 1e-8;

/// `a·b / (|a|·|b| + ε)`. Degenerate (zero) vectors score 0 instead of NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b + SIMILARITY_EPSILON)
}

/// `(index, score)` pairs ordered by descending similarity to `query`.
/// Equal scores keep their original order. `total_cmp` keeps the sort total
/// even for NaN scores; callers reject non-finite vectors before ranking.
pub fn rank_by_similarity<V: AsRef<[f32]>>(query: &[f32], vectors: &[V]) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, cosine_similarity(query, v.as_ref())))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}
