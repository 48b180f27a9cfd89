//! Raw EIA payload → canonical `PriceSeries`.
//!
//! Two shapes reach this module:
//! - `Flat`: the `response.data` records of a monthly endpoint, each with a
//!   `period` and either a `value` or a `price` field
//! - `Monthly`: year/month/average rows produced by weekly aggregation
//!
//! The shape is resolved once, when the payload is classified.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{FuelType, PriceSeries, RegionCode};
use crate::error::AppError;

/// Decimal places kept on aggregated monthly averages.
const MONTHLY_PRICE_DECIMALS: i32 = 3;

/// Field names that may carry the price on a flat record, in lookup order.
const VALUE_FIELDS: [&str; 2] = ["value", "price"];

/// One aggregated month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub year: i32,
    pub month: u32,
    pub monthly_avg_price: f64,
}

/// The two payload shapes the normalizer understands.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Flat(Vec<Map<String, Value>>),
    Monthly(Vec<MonthlyRow>),
}

impl RawPayload {
    /// Classify an arbitrary JSON document.
    ///
    /// - object with a `response.data` array → `Flat`
    /// - array of `{year, month, monthly_avg_price}` objects → `Monthly`
    pub fn from_json(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(mut root) => {
                let data = root
                    .get_mut("response")
                    .and_then(|r| r.get_mut("data"))
                    .map(Value::take);
                match data {
                    Some(Value::Array(items)) => flat_records(items).map(RawPayload::Flat),
                    _ => Err(AppError::shape(
                        "Unsupported payload shape: object without a `response.data` array.",
                    )),
                }
            }
            Value::Array(items) => {
                let rows: Vec<MonthlyRow> = serde_json::from_value(Value::Array(items)).map_err(|e| {
                    AppError::shape(format!("Unsupported payload shape: rows are not year/month/price: {e}"))
                })?;
                Ok(RawPayload::Monthly(rows))
            }
            other => Err(AppError::shape(format!(
                "Unsupported payload shape: {}",
                json_kind(&other)
            ))),
        }
    }
}

fn flat_records(items: Vec<Value>) -> Result<Vec<Map<String, Value>>, AppError> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(AppError::shape(format!(
                "Record {idx} in `response.data` is {}, expected an object.",
                json_kind(&other)
            ))),
        })
        .collect()
}

/// Build the canonical series for `fuel` in `region` from a raw payload.
pub fn normalize(payload: &RawPayload, fuel: FuelType, region: &RegionCode) -> Result<PriceSeries, AppError> {
    match payload {
        RawPayload::Flat(records) => normalize_flat(records, fuel, region),
        RawPayload::Monthly(rows) => Ok(normalize_monthly(rows, fuel, region)),
    }
}

fn normalize_flat(records: &[Map<String, Value>], fuel: FuelType, region: &RegionCode) -> Result<PriceSeries, AppError> {
    let mut series = PriceSeries::new(fuel, region.clone());
    let Some(first) = records.first() else {
        return Ok(series);
    };

    // The price field differs per endpoint; the first record decides for all.
    let field = value_field(first)
        .ok_or_else(|| AppError::shape("First record has neither a `value` nor a `price` field."))?;

    for (idx, record) in records.iter().enumerate() {
        let period = record
            .get("period")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::shape(format!("Record {idx} is missing a `period` string.")))?;
        let raw = record
            .get(field)
            .ok_or_else(|| AppError::shape(format!("Record {idx} ({period}) is missing `{field}`.")))?;
        match json_number(raw) {
            Ok(Some(price)) => series.insert(period, price),
            Ok(None) => log::debug!("{fuel} {region} {period}: no {field} reported, skipping"),
            Err(kind) => {
                return Err(AppError::shape(format!(
                    "Record {idx} ({period}) has a non-numeric `{field}`: {kind}"
                )));
            }
        }
    }

    Ok(series)
}

fn normalize_monthly(rows: &[MonthlyRow], fuel: FuelType, region: &RegionCode) -> PriceSeries {
    let mut series = PriceSeries::new(fuel, region.clone());
    for row in rows {
        series.insert(
            format!("{}-{}", row.year, row.month),
            round_to(row.monthly_avg_price, MONTHLY_PRICE_DECIMALS),
        );
    }
    series
}

/// Round half to even to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// The price field of a record: `value` if present, else `price`.
pub(crate) fn value_field(record: &Map<String, Value>) -> Option<&'static str> {
    VALUE_FIELDS.iter().copied().find(|f| record.contains_key(*f))
}

/// Read a JSON number or numeric string. `null` is "not reported".
///
/// Strings such as `"NaN"` or `"inf"` parse as floats but are not prices.
pub(crate) fn json_number(value: &Value) -> Result<Option<f64>, String> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("{n}"))?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| format!("\"{s}\""))?,
        other => return Err(json_kind(other).to_string()),
    };
    if parsed.is_finite() {
        Ok(Some(parsed))
    } else {
        Err(format!("non-finite {parsed}"))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn ny() -> RegionCode {
        RegionCode::parse("NY").unwrap()
    }

    fn as_pairs(series: &PriceSeries) -> Vec<(String, f64)> {
        series.points().iter().map(|p| (p.period.clone(), p.price)).collect()
    }

    #[test]
    fn flat_value_field_round_trips() {
        let payload = RawPayload::from_json(json!({
            "response": { "data": [
                { "period": "2022-01", "duoarea": "SNY", "process": "PRS", "value": 13.86 },
                { "period": "2022-02", "duoarea": "SNY", "process": "PRS", "value": "14.1" },
            ]}
        }))
        .unwrap();

        let series = normalize(&payload, FuelType::NaturalGas, &ny()).unwrap();
        assert_eq!(series.fuel, FuelType::NaturalGas);
        assert_eq!(series.region.as_str(), "NY");
        assert_eq!(
            as_pairs(&series),
            vec![("2022-01".to_string(), 13.86), ("2022-02".to_string(), 14.1)]
        );
    }

    #[test]
    fn flat_price_field_round_trips() {
        let payload = RawPayload::from_json(json!({
            "response": { "data": [
                { "period": "2022-01", "stateid": "NY", "sectorid": "RES", "price": 21.0 },
                { "period": "2022-02", "stateid": "NY", "sectorid": "RES", "price": 22.37 },
            ]}
        }))
        .unwrap();

        let series = normalize(&payload, FuelType::Electricity, &ny()).unwrap();
        assert_eq!(
            as_pairs(&series),
            vec![("2022-01".to_string(), 21.0), ("2022-02".to_string(), 22.37)]
        );
    }

    #[test]
    fn field_is_chosen_from_first_record_only() {
        // Second record carries both; the first decided on `price`.
        let payload = RawPayload::from_json(json!({
            "response": { "data": [
                { "period": "2022-01", "price": 1.0 },
                { "period": "2022-02", "price": 2.0, "value": 99.0 },
            ]}
        }))
        .unwrap();
        let series = normalize(&payload, FuelType::Electricity, &ny()).unwrap();
        assert_eq!(series.get("2022-02"), Some(2.0));
    }

    #[test]
    fn null_values_are_skipped() {
        let payload = RawPayload::from_json(json!({
            "response": { "data": [
                { "period": "2022-01", "value": null },
                { "period": "2022-02", "value": 3.0 },
            ]}
        }))
        .unwrap();
        let series = normalize(&payload, FuelType::NaturalGas, &ny()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.get("2022-02"), Some(3.0));
    }

    #[test]
    fn empty_data_gives_empty_series() {
        let payload = RawPayload::from_json(json!({ "response": { "data": [] } })).unwrap();
        let series = normalize(&payload, FuelType::NaturalGas, &ny()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn monthly_rows_are_labelled_and_rounded() {
        let payload = RawPayload::from_json(json!([
            { "year": 2022, "month": 1, "monthly_avg_price": 1.23456 },
            { "year": 2022, "month": 2, "monthly_avg_price": 2.0 },
        ]))
        .unwrap();
        let series = normalize(&payload, FuelType::Propane, &ny()).unwrap();
        assert_eq!(
            as_pairs(&series),
            vec![("2022-1".to_string(), 1.235), ("2022-2".to_string(), 2.0)]
        );
        assert_eq!(series.fuel, FuelType::Propane);
        assert_eq!(series.region.as_str(), "NY");
    }

    #[test]
    fn unrecognized_shapes_fail() {
        for bad in [
            json!("hello"),
            json!(42),
            json!({ "data": [] }),
            json!([{ "period": "2022-01", "value": 1.0 }]),
            json!({ "response": { "data": [1, 2] } }),
        ] {
            let err = RawPayload::from_json(bad.clone()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Shape, "expected shape error for {bad}");
        }
    }

    #[test]
    fn record_without_value_or_price_fails() {
        let payload = RawPayload::from_json(json!({
            "response": { "data": [ { "period": "2022-01", "cost": 1.0 } ] }
        }))
        .unwrap();
        let err = normalize(&payload, FuelType::NaturalGas, &ny()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn non_numeric_value_fails() {
        let payload = RawPayload::from_json(json!({
            "response": { "data": [ { "period": "2022-01", "value": "n/a" } ] }
        }))
        .unwrap();
        assert!(normalize(&payload, FuelType::NaturalGas, &ny()).is_err());
    }

    #[test]
    fn round_to_three_places() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(2.0, 3), 2.0);
        assert_eq!(round_to(3.525, 3), 3.525);
        // mean(3.0, 3.125) sits exactly on a half.
        assert_eq!(round_to(3.0625, 3), 3.062);
    }

    #[test]
    fn non_finite_strings_are_rejected() {
        for bad in ["NaN", "inf", "-inf", "infinity"] {
            let payload = RawPayload::from_json(json!({
                "response": { "data": [ { "period": "2022-01", "value": bad } ] }
            }))
            .unwrap();
            let err = normalize(&payload, FuelType::NaturalGas, &ny()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Shape, "{bad}");
        }
    }

    #[test]
    fn half_way_monthly_average_rounds_to_even() {
        let payload = RawPayload::from_json(json!([
            { "year": 2022, "month": 10, "monthly_avg_price": 3.0625 },
        ]))
        .unwrap();
        let series = normalize(&payload, FuelType::Propane, &ny()).unwrap();
        assert_eq!(series.get("2022-10"), Some(3.062));
    }
}
