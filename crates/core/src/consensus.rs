//! Vote aggregation into a consensus label per attribute.
//!
//! Every picture carries an [`AnnotationState`]: one [`VoteTally`] per
//! [`Attribute`]. Votes only ever add to a counter, and the label is always
//! recomputed from the totals, so the final state is independent of the order
//! votes arrive in.
//!
//! Functions here are pure (`current state + votes -> new state`). Making the
//! read-modify-write atomic is the storage layer's job.

use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Tallies
// ---------------------------------------------------------------------------

/// Accumulated yes/no votes for one attribute and the label derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub yes_count: i64,
    pub no_count: i64,
    /// Always `yes_count > no_count`. Ties (including 0/0) are `false`.
    pub label: bool,
}

impl VoteTally {
    /// Build a tally from raw counters, deriving the label.
    pub fn from_counts(yes_count: i64, no_count: i64) -> Self {
        Self {
            yes_count,
            no_count,
            label: majority(yes_count, no_count),
        }
    }

    /// At least one human vote in either direction.
    pub fn is_annotated(&self) -> bool {
        self.yes_count > 0 || self.no_count > 0
    }

    /// Counter for the given direction.
    pub fn count(&self, direction: VoteDirection) -> i64 {
        match direction {
            VoteDirection::Yes => self.yes_count,
            VoteDirection::No => self.no_count,
        }
    }
}

/// Strict majority. A tie is not evidence of presence.
fn majority(yes_count: i64, no_count: i64) -> bool {
    yes_count > no_count
}

/// Votes for every tracked attribute of one picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnnotationState {
    pub water: VoteTally,
    pub food: VoteTally,
    pub cat: VoteTally,
}

impl AnnotationState {
    pub fn tally(&self, attribute: Attribute) -> &VoteTally {
        match attribute {
            Attribute::Water => &self.water,
            Attribute::Food => &self.food,
            Attribute::Cat => &self.cat,
        }
    }

    fn tally_mut(&mut self, attribute: Attribute) -> &mut VoteTally {
        match attribute {
            Attribute::Water => &mut self.water,
            Attribute::Food => &mut self.food,
            Attribute::Cat => &mut self.cat,
        }
    }
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Yes,
    No,
}

/// A (possibly batched) human judgment on one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub attribute: Attribute,
    pub direction: VoteDirection,
    pub increment: i64,
}

impl Vote {
    /// A single vote (increment of one).
    pub fn single(attribute: Attribute, direction: VoteDirection) -> Self {
        Self {
            attribute,
            direction,
            increment: 1,
        }
    }
}

fn validate_increment(vote: &Vote) -> Result<(), CoreError> {
    if vote.increment < 0 {
        return Err(CoreError::InvalidVote(format!(
            "{} {} increment must be non-negative, got {}",
            vote.attribute,
            match vote.direction {
                VoteDirection::Yes => "yes",
                VoteDirection::No => "no",
            },
            vote.increment
        )));
    }
    Ok(())
}

/// Add `increment` votes in `direction` for `attribute` and recompute its label.
///
/// Returns the new state; `state` is untouched. A negative increment is
/// rejected with [`CoreError::InvalidVote`].
pub fn apply_vote(
    state: &AnnotationState,
    attribute: Attribute,
    direction: VoteDirection,
    increment: i64,
) -> Result<AnnotationState, CoreError> {
    apply_votes(
        state,
        &[Vote {
            attribute,
            direction,
            increment,
        }],
    )
}

/// Apply a batch of votes all-or-nothing.
///
/// Every increment is validated before any counter changes, so an invalid
/// entry anywhere in the batch leaves the result unproduced.
pub fn apply_votes(state: &AnnotationState, votes: &[Vote]) -> Result<AnnotationState, CoreError> {
    for vote in votes {
        validate_increment(vote)?;
    }

    let mut next = *state;
    for vote in votes {
        let tally = next.tally_mut(vote.attribute);
        let counter = match vote.direction {
            VoteDirection::Yes => &mut tally.yes_count,
            VoteDirection::No => &mut tally.no_count,
        };
        *counter = counter.checked_add(vote.increment).ok_or_else(|| {
            CoreError::InvalidVote(format!("{} vote counter overflow", vote.attribute))
        })?;
        tally.label = majority(tally.yes_count, tally.no_count);
    }
    Ok(next)
}

// ---------------------------------------------------------------------------
// Batched update request
// ---------------------------------------------------------------------------

/// Per-counter increments as submitted by an annotation client.
///
/// Missing fields count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteBatch {
    pub human_water_yes: i64,
    pub human_water_no: i64,
    pub human_food_yes: i64,
    pub human_food_no: i64,
    pub human_cat_yes: i64,
    pub human_cat_no: i64,
}

impl VoteBatch {
    /// Expand into individual votes, skipping zero increments.
    pub fn votes(&self) -> Vec<Vote> {
        [
            (Attribute::Water, VoteDirection::Yes, self.human_water_yes),
            (Attribute::Water, VoteDirection::No, self.human_water_no),
            (Attribute::Food, VoteDirection::Yes, self.human_food_yes),
            (Attribute::Food, VoteDirection::No, self.human_food_no),
            (Attribute::Cat, VoteDirection::Yes, self.human_cat_yes),
            (Attribute::Cat, VoteDirection::No, self.human_cat_no),
        ]
        .into_iter()
        .filter(|(_, _, increment)| *increment != 0)
        .map(|(attribute, direction, increment)| Vote {
            attribute,
            direction,
            increment,
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.votes().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
