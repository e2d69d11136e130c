// src/similarity.rs
//! Title similarity used by the merge stage.

use std::collections::HashSet;

/// Similarity of two titles in `[0, 1]`.
///
/// Equal (after lowercase + trim) → 1.0; one contains the other → 0.9;
/// otherwise the Dice coefficient over unique whitespace-separated words.
pub fn similarity(a: &str, b: &str) -> f64 {
    let sa = a.trim().to_lowercase();
    let sb = b.trim().to_lowercase();
    if sa == sb {
        return 1.0;
    }
    if sa.contains(sb.as_str()) || sb.contains(sa.as_str()) {
        return 0.9;
    }

    let words_a: HashSet<&str> = sa.split_whitespace().collect();
    let words_b: HashSet<&str> = sb.split_whitespace().collect();
    let total = words_a.len() + words_b.len();
    if total == 0 {
        return 0.0;
    }
    let shared = words_a.intersection(&words_b).count();
    (2 * shared) as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_after_case_and_trim() {
        assert_eq!(similarity("  Apple Earnings ", "apple earnings"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn containment_scores_point_nine() {
        assert_eq!(
            similarity(
                "Apple posts record Q3 earnings",
                "Apple posts record Q3 earnings."
            ),
            0.9
        );
        // Empty string is a substring of everything.
        assert_eq!(similarity("", "anything"), 0.9);
    }

    #[test]
    fn dice_over_unique_words() {
        // {a, b, c} vs {b, c, d}: 2*2 / 6
        let s = similarity("a b c", "b c d");
        assert!((s - 4.0 / 6.0).abs() < 1e-9, "got {s}");
        // duplicates collapse: {x, y} vs {x, z}
        let s = similarity("x x y", "x z");
        assert!((s - 0.5).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn disjoint_titles_score_zero() {
        assert_eq!(similarity("markets rally", "storm warning"), 0.0);
    }

    #[test]
    fn whitespace_only_inputs_do_not_produce_nan() {
        let s = similarity(" \t ", "\n");
        assert!(s.is_finite());
    }
}
