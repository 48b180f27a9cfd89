//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - fuel and region identifiers (`FuelType`, `RegionCode`)
//! - the canonical tagged price series (`PriceSeries`)
//! - energy-content conversion factors (`ConversionTable`)
//! - the static state table (`geo`)

pub mod conversion;
pub mod geo;
pub mod types;

pub use conversion::*;
pub use types::*;
