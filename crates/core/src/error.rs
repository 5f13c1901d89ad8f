use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// A request value outside its accepted set.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A vote that would decrease a counter. Votes are append-only.
    #[error("Invalid vote: {0}")]
    InvalidVote(String),
}
