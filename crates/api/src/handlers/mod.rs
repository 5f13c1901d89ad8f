pub mod dataset;
pub mod picture;
