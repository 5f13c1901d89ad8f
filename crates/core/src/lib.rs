//! Domain logic for the water bowl annotation service.
//!
//! Pure building blocks with no database or HTTP dependencies: vote
//! consensus, random retrieval, class selection for export, dataset archive
//! packaging and region cropping. Callers pass in data loaded by the
//! repository layer.

pub mod attribute;
pub mod consensus;
pub mod crop;
pub mod error;
pub mod packaging;
pub mod retrieval;
pub mod selection;
pub mod types;
