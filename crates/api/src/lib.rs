//! Waterbowl API server library.
//!
//! Exposes config, state, error handling, the router and its handlers so
//! integration tests and the binary entrypoint share the same building blocks.

pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
