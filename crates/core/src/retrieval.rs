//! Uniform random retrieval of a single picture for annotation.
//!
//! The population is a snapshot handed in by the caller (usually a
//! pre-filtered query result). Sampling happens here rather than in the
//! database so every qualifying picture has exactly the same chance of being
//! drawn regardless of insertion order or id.

use std::fmt;
use std::str::FromStr;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;
use crate::consensus::{AnnotationState, VoteTally};
use crate::error::CoreError;

/// Anything that carries an [`AnnotationState`] and can be selected on it.
pub trait Annotated {
    fn annotation(&self) -> AnnotationState;
}

impl Annotated for AnnotationState {
    fn annotation(&self) -> AnnotationState {
        *self
    }
}

impl<T: Annotated> Annotated for &T {
    fn annotation(&self) -> AnnotationState {
        (*self).annotation()
    }
}

/// Filter policy for random retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum RetrievalLimit {
    /// Every picture qualifies.
    None,
    /// No votes at all for the attribute.
    #[default]
    #[serde(rename = "no_annotation")]
    Unannotated,
    /// At least one vote for the attribute.
    #[serde(rename = "human_annotated")]
    Annotated,
}

const VALID_LIMIT_STRINGS: &[&str] = &["none", "no_annotation", "human_annotated"];

impl RetrievalLimit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Unannotated => "no_annotation",
            Self::Annotated => "human_annotated",
        }
    }

    /// Whether a tally passes this policy.
    pub fn admits(&self, tally: &VoteTally) -> bool {
        match self {
            Self::None => true,
            Self::Unannotated => tally.yes_count == 0 && tally.no_count == 0,
            Self::Annotated => tally.is_annotated(),
        }
    }
}

impl fmt::Display for RetrievalLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalLimit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "no_annotation" | "unannotated" => Ok(Self::Unannotated),
            "human_annotated" | "annotated" => Ok(Self::Annotated),
            _ => Err(CoreError::Validation(format!(
                "Invalid retrieval limit '{s}'. Must be one of: {}",
                VALID_LIMIT_STRINGS.join(", ")
            ))),
        }
    }
}

impl TryFrom<String> for RetrievalLimit {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Draw one picture uniformly from those passing `limit` for `attribute`.
///
/// `None` means nothing qualifies; that is a normal outcome, not an error.
/// Pure read: calling it repeatedly has no side effects.
pub fn select_random<'a, T, R>(
    population: &'a [T],
    attribute: Attribute,
    limit: RetrievalLimit,
    rng: &mut R,
) -> Option<&'a T>
where
    T: Annotated,
    R: Rng + ?Sized,
{
    let qualifying: Vec<&T> = population
        .iter()
        .filter(|item| limit.admits(item.annotation().tally(attribute)))
        .collect();
    qualifying.choose(rng).copied()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
