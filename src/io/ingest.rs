//! Load saved EIA payloads for offline conversion.
//!
//! Accepted inputs:
//! - `.json`: a raw API body (`{"response": {"data": [...]}}`) or an array of
//!   `{year, month, monthly_avg_price}` rows
//! - `.csv`: either `period` + `value`/`price` columns (as downloaded from the
//!   EIA browser) or `year,month,monthly_avg_price` columns
//!
//! CSV files are turned into the equivalent JSON document so both go through
//! the same payload classification.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use serde_json::{Map, Value, json};

use crate::error::AppError;

/// Read a saved payload as a JSON document.
pub fn load_payload_file(path: &Path) -> Result<Value, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => read_json(path),
        "csv" => read_csv(path),
        other => Err(AppError::unsupported(format!(
            "Unsupported payload file extension '.{other}' (expected .json or .csv)."
        ))),
    }
}

fn read_json(path: &Path) -> Result<Value, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open payload '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::shape(format!("Invalid payload JSON '{}': {e}", path.display())))
}

fn read_csv(path: &Path) -> Result<Value, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open payload CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::shape(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: header line, 1-based numbering.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::shape(format!("CSV parse error on line {line}: {e}")))?;
        records.push(record);
    }

    if let (Some(&y), Some(&m), Some(&p)) = (
        header_map.get("year"),
        header_map.get("month"),
        header_map.get("monthly_avg_price"),
    ) {
        let mut rows = Vec::with_capacity(records.len());
        for (idx, rec) in records.iter().enumerate() {
            let line = idx + 2;
            rows.push(json!({
                "year": parse_cell::<i32>(rec, y, "year", line)?,
                "month": parse_cell::<u32>(rec, m, "month", line)?,
                "monthly_avg_price": parse_cell::<f64>(rec, p, "monthly_avg_price", line)?,
            }));
        }
        return Ok(Value::Array(rows));
    }

    let Some(&period_col) = header_map.get("period") else {
        return Err(AppError::shape(
            "CSV has neither `period` nor `year`/`month`/`monthly_avg_price` columns.",
        ));
    };
    let (field, value_col) = ["value", "price"]
        .iter()
        .find_map(|f| header_map.get(*f).map(|&c| (*f, c)))
        .ok_or_else(|| AppError::shape("CSV has a `period` column but no `value` or `price` column."))?;

    let mut data = Vec::with_capacity(records.len());
    for rec in &records {
        let mut obj = Map::new();
        obj.insert("period".to_string(), Value::String(rec.get(period_col).unwrap_or("").to_string()));
        // Blank cells are "not reported", like `null` in the API body.
        let cell = rec.get(value_col).unwrap_or("");
        let value = if cell.is_empty() {
            Value::Null
        } else {
            Value::String(cell.to_string())
        };
        obj.insert(field.to_string(), value);
        data.push(Value::Object(obj));
    }

    Ok(json!({ "response": { "data": data } }))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_cell<T: std::str::FromStr>(rec: &StringRecord, col: usize, name: &str, line: usize) -> Result<T, AppError> {
    let raw = rec.get(col).unwrap_or("");
    raw.parse::<T>()
        .map_err(|_| AppError::shape(format!("Line {line}: invalid {name} '{raw}'.")))
}
