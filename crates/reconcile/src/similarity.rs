use std::collections::HashSet;

/// Lower-cased whitespace tokens longer than three characters. Shorter
/// words ("di", "per", "srl") are mostly noise in bank descriptions.
pub fn significant_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

/// Share of common words over the larger of the two sets, as a percentage.
pub fn word_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let common = a.intersection(b).count();
    common as f64 / a.len().max(b.len()) as f64 * 100.0
}

/// Word-overlap similarity of two free-text descriptions in [0, 100].
/// Order-insensitive and symmetric.
pub fn semantic_similarity(a: &str, b: &str) -> f64 {
    word_overlap(&significant_words(a), &significant_words(b))
}
