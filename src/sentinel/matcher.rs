//! Edit-distance matching of candidate names against the reference list.

use crate::model::{MatchResult, ReferenceList};
use crate::traits::ReferenceError;

/// Default maximum edit distance that counts as a typosquat.
pub const DEFAULT_THRESHOLD: usize = 1;

/// Levenshtein distance over `char`s (insertions, deletions, substitutions).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Like [`levenshtein`], but gives up with `None` once the distance is known
/// to exceed `max_distance`.
pub fn bounded_levenshtein(a: &str, b: &str, max_distance: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > max_distance {
        return None;
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        let mut row_min = current[0];

        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
            row_min = row_min.min(current[j + 1]);
        }

        // Row minima never decrease, so the final distance is at least this.
        if row_min > max_distance {
            return None;
        }

        std::mem::swap(&mut previous, &mut current);
    }

    let distance = previous[b.len()];
    (distance <= max_distance).then_some(distance)
}

/// Returns the first reference, in list order, with `0 < distance <= threshold`.
///
/// An exact match is the popular package itself and is never reported. The
/// scan stops at the first qualifying reference even if a later one is closer.
pub fn find_match(candidate: &str, references: &[String], threshold: usize) -> Option<MatchResult> {
    references.iter().find_map(|reference| {
        match bounded_levenshtein(candidate, reference, threshold) {
            Some(distance) if distance > 0 => Some(MatchResult {
                candidate: candidate.to_string(),
                matched_reference: reference.clone(),
                distance,
            }),
            _ => None,
        }
    })
}

/// A [`ReferenceList`] paired with a fixed threshold.
#[derive(Debug, Clone)]
pub struct SimilarityMatcher {
    references: ReferenceList,
    threshold: usize,
}

impl SimilarityMatcher {
    pub fn new(references: ReferenceList, threshold: usize) -> Result<Self, ReferenceError> {
        if threshold == 0 {
            return Err(ReferenceError::ZeroThreshold);
        }
        Ok(Self {
            references,
            threshold,
        })
    }

    pub fn find_match(&self, candidate: &str) -> Option<MatchResult> {
        find_match(candidate, self.references.as_slice(), self.threshold)
    }

    pub fn references(&self) -> &ReferenceList {
        &self.references
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self {
            references: ReferenceList::popular_npm(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("react", "react"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        // A transposition costs two edits.
        assert_eq!(levenshtein("raect", "react"), 2);
    }

    #[test]
    fn test_single_substitution_is_distance_one() {
        let base = "webpack";
        for (i, _) in base.char_indices() {
            let mut mutated: Vec<char> = base.chars().collect();
            mutated[i] = if mutated[i] == 'z' { 'y' } else { 'z' };
            let mutated: String = mutated.into_iter().collect();
            assert_eq!(levenshtein(base, &mutated), 1, "{mutated}");
            assert_eq!(bounded_levenshtein(base, &mutated, 1), Some(1));
        }
    }

    #[test]
    fn test_bounded_agrees_with_full_distance() {
        let pairs = [
            ("lodash", "lodahs"),
            ("express", "expresss"),
            ("vue", "view"),
            ("axios", "axois"),
            ("", "a"),
            ("next-auth", "nextauth"),
        ];
        for (a, b) in pairs {
            let full = levenshtein(a, b);
            for max in 0..4 {
                let expected = (full <= max).then_some(full);
                assert_eq!(bounded_levenshtein(a, b, max), expected, "{a} vs {b} max {max}");
            }
        }
    }

    #[test]
    fn test_reference_examples() {
        let references = refs(&["react", "express"]);

        assert_eq!(find_match("raect", &references, 1), None);

        let reakt = find_match("reakt", &references, 1).unwrap();
        assert_eq!(reakt.matched_reference, "react");
        assert_eq!(reakt.distance, 1);

        let expres = find_match("expres", &references, 1).unwrap();
        assert_eq!(expres.matched_reference, "express");
        assert_eq!(expres.distance, 1);
    }

    #[test]
    fn test_exact_match_never_reported() {
        let matcher = SimilarityMatcher::default();
        for name in matcher.references().as_slice() {
            assert_eq!(matcher.find_match(name), None, "{name}");
        }
    }

    #[test]
    fn test_first_match_wins_over_closer_match() {
        // "abcd" is 2 away from "abxy" and 1 away from "abc"; list order decides.
        let references = refs(&["abxy", "abc"]);
        let found = find_match("abcd", &references, 2).unwrap();
        assert_eq!(found.matched_reference, "abxy");
        assert_eq!(found.distance, 2);
    }

    #[test]
    fn test_exact_match_does_not_stop_scan() {
        // "vue" is an exact match for itself but one edit from "vues".
        let references = refs(&["vue", "vues"]);
        let found = find_match("vue", &references, 1).unwrap();
        assert_eq!(found.matched_reference, "vues");
    }

    #[test]
    fn test_zero_threshold_rejected() {
        assert_eq!(
            SimilarityMatcher::new(ReferenceList::popular_npm(), 0).unwrap_err(),
            ReferenceError::ZeroThreshold
        );
    }

    #[test]
    fn test_default_matcher_flags_typos() {
        let matcher = SimilarityMatcher::default();
        assert_eq!(matcher.threshold(), 1);

        let found = matcher.find_match("lodahs");
        assert_eq!(found, None);

        let found = matcher.find_match("expresss").unwrap();
        assert_eq!(found.matched_reference, "express");
        assert_eq!(found.candidate, "expresss");

        assert_eq!(matcher.find_match("completely-unrelated-name"), None);
    }
}
