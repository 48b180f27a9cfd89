//! Read/write series JSON files.
//!
//! A series file is the flat canonical mapping:
//!
//! ```json
//! { "2022-01": 41.03, "2022-02": 43.96, "type": "electricity", "state": "NY" }
//! ```
//!
//! `type` and `state` are reserved keys; every other key is a period label.
//! Files written here always hold $/MMBtu prices.

use std::fs::File;
use std::path::Path;

use serde_json::{Map, Value};

use crate::domain::{FuelType, PriceBasis, PriceSeries, RegionCode, period_key};
use crate::error::AppError;

pub const TYPE_KEY: &str = "type";
pub const REGION_KEY: &str = "state";

/// Flatten a series into the canonical mapping.
pub fn series_to_json(series: &PriceSeries) -> Value {
    let mut map = Map::new();
    for p in series.points() {
        map.insert(p.period.clone(), Value::from(p.price));
    }
    map.insert(TYPE_KEY.to_string(), Value::String(series.fuel.key().to_string()));
    map.insert(REGION_KEY.to_string(), Value::String(series.region.to_string()));
    Value::Object(map)
}

/// Rebuild a series from the canonical mapping.
///
/// Periods are ordered by (year, month); labels that are not periods are rejected.
pub fn series_from_json(value: &Value) -> Result<PriceSeries, AppError> {
    let map = value
        .as_object()
        .ok_or_else(|| AppError::shape("Series JSON must be an object."))?;

    let fuel = map
        .get(TYPE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::shape(format!("Series JSON is missing `{TYPE_KEY}`.")))?
        .parse::<FuelType>()?;
    let region = map
        .get(REGION_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::shape(format!("Series JSON is missing `{REGION_KEY}`.")))?;
    let region = RegionCode::parse(region)?;

    let mut points = Vec::new();
    for (label, v) in map {
        if label == TYPE_KEY || label == REGION_KEY {
            continue;
        }
        let key = period_key(label)
            .ok_or_else(|| AppError::shape(format!("Series JSON key '{label}' is not a period.")))?;
        let price = v
            .as_f64()
            .ok_or_else(|| AppError::shape(format!("Series JSON value for '{label}' is not a number.")))?;
        points.push((key, label.clone(), price));
    }
    points.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut series = PriceSeries::new(fuel, region);
    series.basis = PriceBasis::PerMmbtu;
    for (_, label, price) in points {
        series.insert(label, price);
    }
    Ok(series)
}

/// Write a series JSON file.
pub fn write_series_json(path: &Path, series: &PriceSeries) -> Result<(), AppError> {
    if series.basis != PriceBasis::PerMmbtu {
        return Err(AppError::unsupported("Only $/MMBtu series can be written to a series file."));
    }
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create series JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &series_to_json(series))
        .map_err(|e| AppError::io(format!("Failed to write series JSON: {e}")))?;
    Ok(())
}

/// Read a series JSON file.
pub fn read_series_json(path: &Path) -> Result<PriceSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open series JSON '{}': {e}", path.display())))?;
    let value: Value =
        serde_json::from_reader(file).map_err(|e| AppError::shape(format!("Invalid series JSON: {e}")))?;
    series_from_json(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn propane() -> PriceSeries {
        let mut s = PriceSeries::new(FuelType::Propane, RegionCode::parse("NY").unwrap());
        s.insert("2022-1", 30.5);
        s.insert("2022-2", 31.25);
        s.insert("2022-10", 33.0);
        s.basis = PriceBasis::PerMmbtu;
        s
    }

    #[test]
    fn tags_use_reserved_keys() {
        let v = series_to_json(&propane());
        assert_eq!(v[TYPE_KEY], json!("propane"));
        assert_eq!(v[REGION_KEY], json!("NY"));
        assert_eq!(v["2022-10"], json!(33.0));
    }

    #[test]
    fn file_round_trip_keeps_period_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("propane.json");
        let series = propane();
        write_series_json(&path, &series).unwrap();
        let back = read_series_json(&path).unwrap();
        assert_eq!(back, series);
    }

    #[test]
    fn native_series_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = propane();
        s.basis = PriceBasis::Native;
        assert!(write_series_json(&dir.path().join("x.json"), &s).is_err());
    }

    #[test]
    fn non_period_keys_are_rejected() {
        let v = json!({ "2022-01": 1.0, "note": 2.0, "type": "electricity", "state": "NY" });
        assert!(series_from_json(&v).is_err());
    }
}
