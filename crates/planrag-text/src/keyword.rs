use planrag_core::Passage;

/// Lowercased query words longer than three characters, in query order.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

/// Per-passage count of query terms found as substrings of the passage text.
pub fn keyword_scores(query: &str, passages: &[Passage]) -> Vec<usize> {
    let terms = query_terms(query);
    passages
        .iter()
        .map(|p| {
            let text = p.text.to_lowercase();
            terms.iter().filter(|t| text.contains(t.as_str())).count()
        })
        .collect()
}

/// Rank passages by keyword overlap, highest first.
///
/// Equal scores keep their input order.
pub fn keyword_rank(query: &str, passages: &[Passage]) -> Vec<Passage> {
    let scores = keyword_scores(query, passages);
    let mut order: Vec<usize> = (0..passages.len()).collect();
    order.sort_by(|&a, &b| scores[b].cmp(&scores[a]));
    order.into_iter().map(|i| passages[i].clone()).collect()
}
