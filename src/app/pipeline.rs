//! Shared "price pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! EIA fetch -> (weekly aggregation) -> normalize -> convert to $/MMBtu
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::data::{EnergySource, fetch_payload, normalize, price_per_btu};
use crate::domain::{ConversionTable, FuelType, PriceSeries, RegionCode};
use crate::error::AppError;

/// Monthly price per MMBtu for `fuel` in `region` over `[start, end)`.
///
/// This is the single entry point front-ends should call. Any failure
/// (HTTP, payload shape, missing conversion factor) aborts the whole call;
/// no partial series is returned.
pub fn monthly_price_per_btu<S: EnergySource + ?Sized>(
    source: &S,
    table: &ConversionTable,
    fuel: FuelType,
    region: &RegionCode,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, AppError> {
    let payload = fetch_payload(source, fuel, region, start, end)?;
    let series = normalize(&payload, fuel, region)?;
    let series = price_per_btu(series, table)?.into_converted()?;
    log::info!("{fuel} {region}: {} monthly points", series.len());
    Ok(series)
}

/// Same as `monthly_price_per_btu`, with the fuel given by name.
///
/// Names outside the four supported fuels fail before any request is made.
pub fn monthly_price_per_btu_by_name<S: EnergySource + ?Sized>(
    source: &S,
    table: &ConversionTable,
    fuel: &str,
    region: &RegionCode,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, AppError> {
    let fuel: FuelType = fuel.parse()?;
    monthly_price_per_btu(source, table, fuel, region, start, end)
}

/// Per-fuel results of a multi-fuel fetch.
#[derive(Debug, Clone)]
pub struct FuelComparison {
    pub region: RegionCode,
    pub series: Vec<PriceSeries>,
    pub failures: Vec<(FuelType, AppError)>,
}

/// Fetch every fuel for `region`, one independent pipeline run per fuel.
///
/// Runs are spread over the rayon pool; each builds and owns its series.
/// Results keep `FuelType::ALL` order.
pub fn compare_fuels<S: EnergySource + Sync + ?Sized>(
    source: &S,
    table: &ConversionTable,
    region: &RegionCode,
    start: NaiveDate,
    end: NaiveDate,
) -> FuelComparison {
    let results: Vec<(FuelType, Result<PriceSeries, AppError>)> = FuelType::ALL
        .par_iter()
        .map(|&fuel| (fuel, monthly_price_per_btu(source, table, fuel, region, start, end)))
        .collect();

    let mut series = Vec::new();
    let mut failures = Vec::new();
    for (fuel, result) in results {
        match result {
            Ok(s) => series.push(s),
            Err(err) => {
                log::warn!("{fuel} {region}: {err}");
                failures.push((fuel, err));
            }
        }
    }

    FuelComparison {
        region: region.clone(),
        series,
        failures,
    }
}
