//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod picture_repo;

pub use picture_repo::{PictureRepo, VoteUpdateError};
