//! Selection of human-labelled pictures by consensus class, for dataset export.
//!
//! Positive: the consensus label is `true`.
//! Negative: the label is `false` *and* at least one explicit "no" vote
//! exists. A picture nobody has reviewed also has a `false` label, but it must
//! never be exported as a negative example.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;
use crate::consensus::VoteTally;
use crate::retrieval::Annotated;

/// Default cap on pictures per class in an export.
pub const DEFAULT_EXPORT_LIMIT: i64 = 100;

/// Which side of the binary split a picture is exported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureClass {
    #[serde(alias = "true")]
    Positive,
    #[serde(alias = "false")]
    Negative,
}

impl PictureClass {
    pub fn from_wanted(want_positive: bool) -> Self {
        if want_positive {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    /// Whether a tally places a picture in this class.
    pub fn contains(&self, tally: &VoteTally) -> bool {
        match self {
            Self::Positive => tally.label,
            Self::Negative => !tally.label && tally.no_count > 0,
        }
    }

    /// Directory suffix used in exported archives.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Positive => "true",
            Self::Negative => "false",
        }
    }
}

impl fmt::Display for PictureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        })
    }
}

/// Convert a raw limit into a cap; `<= 0` means unbounded.
pub fn effective_limit(limit: i64) -> Option<usize> {
    if limit <= 0 {
        None
    } else {
        Some(usize::try_from(limit).unwrap_or(usize::MAX))
    }
}

/// Pick pictures in the requested class for `attribute`.
///
/// Qualifying pictures are shuffled before the cap is applied, so a capped
/// result is a uniform sample rather than the first N by position. An empty
/// result is a normal outcome.
pub fn select_by_class<'a, T, R>(
    population: &'a [T],
    attribute: Attribute,
    want_positive: bool,
    limit: i64,
    rng: &mut R,
) -> Vec<&'a T>
where
    T: Annotated,
    R: Rng + ?Sized,
{
    let class = PictureClass::from_wanted(want_positive);
    let mut selected: Vec<&T> = population
        .iter()
        .filter(|item| class.contains(item.annotation().tally(attribute)))
        .collect();

    selected.shuffle(rng);
    if let Some(cap) = effective_limit(limit) {
        selected.truncate(cap);
    }
    selected
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::AnnotationState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Debug)]
    struct Pic {
        id: i64,
        state: AnnotationState,
    }

    impl Annotated for Pic {
        fn annotation(&self) -> AnnotationState {
            self.state
        }
    }

    fn food(id: i64, yes: i64, no: i64) -> Pic {
        Pic {
            id,
            state: AnnotationState {
                food: VoteTally::from_counts(yes, no),
                ..Default::default()
            },
        }
    }

    fn ids(selected: &[&Pic]) -> Vec<i64> {
        let mut ids: Vec<i64> = selected.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn positive_class_requires_label() {
        let mut rng = StdRng::seed_from_u64(1);
        let population = vec![food(1, 2, 1), food(2, 1, 1), food(3, 0, 0), food(4, 1, 0)];
        let selected = select_by_class(&population, Attribute::Food, true, -1, &mut rng);
        assert_eq!(ids(&selected), vec![1, 4]);
    }

    #[test]
    fn negative_class_excludes_unreviewed() {
        let mut rng = StdRng::seed_from_u64(2);
        let population = vec![
            food(1, 0, 0), // never reviewed
            food(2, 0, 1),
            food(3, 2, 2), // tie with explicit no votes
            food(4, 3, 1), // positive
        ];
        let selected = select_by_class(&population, Attribute::Food, false, 0, &mut rng);
        assert_eq!(ids(&selected), vec![2, 3]);
    }

    #[test]
    fn non_positive_limit_returns_everything() {
        let mut rng = StdRng::seed_from_u64(3);
        let population: Vec<Pic> = (0..10).map(|i| food(i, 1, 0)).collect();
        assert_eq!(select_by_class(&population, Attribute::Food, true, -1, &mut rng).len(), 10);
        assert_eq!(select_by_class(&population, Attribute::Food, true, 0, &mut rng).len(), 10);
    }

    #[test]
    fn limit_caps_result() {
        let mut rng = StdRng::seed_from_u64(4);
        let population: Vec<Pic> = (0..10).map(|i| food(i, 1, 0)).collect();
        let selected = select_by_class(&population, Attribute::Food, true, 3, &mut rng);
        assert_eq!(selected.len(), 3);
        let mut unique = ids(&selected);
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn limit_larger_than_population_returns_all() {
        let mut rng = StdRng::seed_from_u64(5);
        let population: Vec<Pic> = (0..4).map(|i| food(i, 0, 2)).collect();
        assert_eq!(select_by_class(&population, Attribute::Food, false, 100, &mut rng).len(), 4);
    }

    #[test]
    fn capped_sample_has_no_positional_bias() {
        let mut rng = StdRng::seed_from_u64(6);
        let population: Vec<Pic> = (0..10).map(|i| food(i, 1, 0)).collect();
        let mut hits = [0usize; 10];
        for _ in 0..1000 {
            for pic in select_by_class(&population, Attribute::Food, true, 3, &mut rng) {
                hits[pic.id as usize] += 1;
            }
        }
        // Expected 300 each.
        for (id, count) in hits.iter().enumerate() {
            assert!(*count > 200, "picture {id} sampled only {count} times");
        }
    }

    #[test]
    fn empty_class_is_not_an_error() {
        let mut rng = StdRng::seed_from_u64(7);
        let population = vec![food(1, 0, 0)];
        assert!(select_by_class(&population, Attribute::Food, true, 5, &mut rng).is_empty());
        assert!(select_by_class(&population, Attribute::Food, false, 5, &mut rng).is_empty());
    }

    #[test]
    fn effective_limit_treats_non_positive_as_unbounded() {
        assert_eq!(effective_limit(-1), None);
        assert_eq!(effective_limit(0), None);
        assert_eq!(effective_limit(3), Some(3));
    }

    #[test]
    fn class_accepts_boolean_names() {
        let parsed: PictureClass = serde_json::from_str("\"true\"").unwrap();
        assert_eq!(parsed, PictureClass::Positive);
        let parsed: PictureClass = serde_json::from_str("\"negative\"").unwrap();
        assert_eq!(parsed, PictureClass::Negative);
    }

    #[test]
    fn class_suffixes() {
        assert_eq!(PictureClass::Positive.suffix(), "true");
        assert_eq!(PictureClass::Negative.suffix(), "false");
    }
}
