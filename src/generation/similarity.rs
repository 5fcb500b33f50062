use std::collections::HashSet;

/// Ranking strategy for "this existing case looks like what you are about
/// to create". Scores must fall in [0, 1].
pub trait Similarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f32;
}

/// Jaccard index over lowercased alphanumeric token sets. Cheap,
/// deterministic, and good enough to surface near-duplicates for review.
pub struct TokenOverlap;

impl Similarity for TokenOverlap {
    fn score(&self, a: &str, b: &str) -> f32 {
        let ta = tokens(a);
        let tb = tokens(b);
        if ta.is_empty() || tb.is_empty() {
            return 0.0;
        }
        let intersection = ta.intersection(&tb).count() as f32;
        let union = ta.union(&tb).count() as f32;
        intersection / union
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_scores_one() {
        let s = TokenOverlap.score("user can log in", "user can log in");
        assert!((s - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_disjoint_text_scores_zero() {
        assert_eq!(TokenOverlap.score("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        assert_eq!(TokenOverlap.score("", "anything"), 0.0);
    }

    #[test]
    fn test_partial_overlap_in_bounds() {
        let s = TokenOverlap.score("user login page", "user login form");
        assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn test_tokenization_ignores_punctuation_and_case() {
        let s = TokenOverlap.score("User, can log-in!", "user can log in");
        assert!((s - 1.0).abs() < f32::EPSILON);
    }
}
