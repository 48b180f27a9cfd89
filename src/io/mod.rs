//! Input/output helpers.
//!
//! - saved payload ingest for offline conversion (`ingest`)
//! - CSV exports (`export`)
//! - series JSON read/write (`series`)

pub mod export;
pub mod ingest;
pub mod series;

pub use export::*;
pub use ingest::*;
pub use series::*;
