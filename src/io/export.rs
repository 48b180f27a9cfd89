//! Export series and Census tables to CSV.
//!
//! Series go one row per (series, period), so several fuels can share a file
//! and be pivoted in a spreadsheet.

use std::path::Path;

use serde::Serialize;

use crate::data::census::CensusTable;
use crate::domain::PriceSeries;
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    period: &'a str,
    fuel: &'a str,
    region: &'a str,
    unit: &'a str,
    price: f64,
}

/// Write every point of every series to a CSV file.
pub fn write_series_csv(path: &Path, series: &[PriceSeries]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for s in series {
        for p in s.points() {
            writer
                .serialize(ExportRow {
                    period: &p.period,
                    fuel: s.fuel.key(),
                    region: s.region.as_str(),
                    unit: s.unit_label(),
                    price: p.price,
                })
                .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write a Census table as-is; missing cells become empty fields.
pub fn write_census_table_csv(path: &Path, table: &CensusTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writer
        .write_record(&table.header)
        .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
