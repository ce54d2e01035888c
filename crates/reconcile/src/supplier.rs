use std::collections::HashSet;

/// Lower-case and drop everything that is not a letter or digit, so
/// "A.C.M.E. S.r.l." and "acme srl" compare equal.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Similarity of two organisation names in [0, 100].
///
/// Containment of one normalised name in the other is a full match.
/// Otherwise the score is the share of common words longer than two
/// characters over the larger word set. A name that normalises to nothing
/// is contained in every name.
pub fn fuzzy_supplier_match(a: &str, b: &str) -> f64 {
    let na = normalize_name(a);
    let nb = normalize_name(b);
    if na.contains(&nb) || nb.contains(&na) {
        return 100.0;
    }

    let words_a: HashSet<String> = a.to_lowercase().split_whitespace().map(str::to_string).collect();
    let words_b: HashSet<String> = b.to_lowercase().split_whitespace().map(str::to_string).collect();

    let common = words_a
        .intersection(&words_b)
        .filter(|w| w.chars().count() > 2)
        .count();
    if common == 0 {
        return 0.0;
    }
    common as f64 / words_a.len().max(words_b.len()) as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_punctuation() {
        assert_eq!(normalize_name("A.C.M.E. S.r.l."), "acmesrl");
    }

    #[test]
    fn containment_is_full_match_either_way() {
        assert_eq!(fuzzy_supplier_match("ACME", "Acme S.r.l."), 100.0);
        assert_eq!(fuzzy_supplier_match("Acme S.r.l.", "ACME"), 100.0);
        assert_eq!(fuzzy_supplier_match("Rossi & Figli", "ROSSI FIGLI SNC"), 100.0);
    }

    #[test]
    fn word_overlap_when_not_contained() {
        // {edilizia, verdi, spa} vs {verdi, costruzioni, spa}: "verdi" and "spa" are common
        let s = fuzzy_supplier_match("Edilizia Verdi SpA", "Verdi Costruzioni SpA");
        assert!((s - 200.0 / 3.0).abs() < 1e-9, "score was {s}");
    }

    #[test]
    fn short_common_words_do_not_count() {
        // only "di" in common, which is too short
        assert_eq!(fuzzy_supplier_match("Studio di Marco", "Bar di Luca"), 0.0);
    }

    #[test]
    fn unrelated_names() {
        assert_eq!(fuzzy_supplier_match("Telecom Italia", "Enel Energia"), 0.0);
    }

    #[test]
    fn punctuation_only_name_is_contained() {
        assert_eq!(fuzzy_supplier_match("...", "Acme"), 100.0);
        assert_eq!(fuzzy_supplier_match("Acme", "---"), 100.0);
        assert_eq!(fuzzy_supplier_match("", ""), 100.0);
    }
}
