//! Upstream data: EIA energy prices, Census ACS lookups, and the
//! normalize → convert steps that turn EIA payloads into per-BTU series.

pub mod census;
pub mod convert;
pub mod eia;
pub mod normalize;

pub use census::{CensusClient, CensusConfig};
pub use convert::{Conversion, price_per_btu};
pub use eia::{EiaClient, EiaConfig, EnergyRequest, EnergySource, fetch_payload};
pub use normalize::{MonthlyRow, RawPayload, normalize};
