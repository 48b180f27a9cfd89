//! EIA v2 API integration for retail energy prices.
//!
//! Monthly fuels (electricity, natural gas) come back as flat records and go
//! straight to the normalizer. Propane and heating oil are only published
//! weekly, and only through the heating season (Oct–Mar), so their rows are
//! averaged per calendar month here before normalization.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use reqwest::blocking::Client;
use serde_json::{Map, Value};

use crate::data::normalize::{MonthlyRow, RawPayload, json_number, value_field};
use crate::domain::{Frequency, FuelType, ProductCode, RegionCode};
use crate::error::AppError;

pub const BASE_URL: &str = "https://api.eia.gov/v2";
pub const API_KEY_VAR: &str = "EIA_API_KEY";
pub const TIMEOUT_VAR: &str = "EIA_TIMEOUT_SECS";

/// Connection settings for the EIA client.
#[derive(Debug, Clone)]
pub struct EiaConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Option<Duration>,
}

impl EiaConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: None,
        }
    }

    /// Read `EIA_API_KEY` (after loading `.env`).
    ///
    /// A missing key is not fatal; requests will be rejected upstream.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let api_key = std::env::var(API_KEY_VAR).unwrap_or_else(|_| {
            log::warn!(
                "{API_KEY_VAR} is not set; EIA requests will fail. Request a key at https://www.eia.gov/opendata/register.php"
            );
            String::new()
        });
        let config = Self::new(api_key);
        match parse_timeout(std::env::var(TIMEOUT_VAR).ok().as_deref()) {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Whole seconds from `EIA_TIMEOUT_SECS`; unset, zero or garbage means no timeout.
fn parse_timeout(raw: Option<&str>) -> Option<Duration> {
    let raw = raw?.trim();
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            log::warn!("{TIMEOUT_VAR}='{raw}' is not a whole number of seconds; ignoring");
            None
        }
    }
}

/// A fully specified EIA data request, minus the API key.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyRequest {
    pub fuel: FuelType,
    pub path: &'static str,
    pub frequency: Frequency,
    pub params: Vec<(String, String)>,
}

impl EnergyRequest {
    /// Build the request for `fuel` in `region`.
    ///
    /// `start` is inclusive and `end` exclusive (EIA semantics); both are
    /// formatted to the endpoint's granularity and otherwise passed through.
    pub fn for_fuel(fuel: FuelType, region: &RegionCode, start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if end < start {
            return Err(AppError::unsupported(format!(
                "End date {end} is before start date {start}."
            )));
        }
        let req = match fuel {
            FuelType::Electricity => electricity_request(region, start, end),
            FuelType::NaturalGas => natural_gas_request(region, start, end),
            FuelType::HeatingOil => weekly_petroleum_request(fuel, ProductCode::HeatingOil, region, start, end),
            FuelType::Propane => weekly_petroleum_request(fuel, ProductCode::Propane, region, start, end),
        };
        Ok(req)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

// ¢/kWh, residential sector.
fn electricity_request(region: &RegionCode, start: NaiveDate, end: NaiveDate) -> EnergyRequest {
    let mut params = vec![
        param("data[]", "price"),
        param("facets[sectorid][]", "RES"),
        param("facets[stateid][]", region.as_str()),
        param("frequency", Frequency::Monthly.as_str()),
        param("start", &month_label(start)),
        param("end", &month_label(end)),
    ];
    params.extend(sort_params());
    EnergyRequest {
        fuel: FuelType::Electricity,
        path: "electricity/retail-sales/data",
        frequency: Frequency::Monthly,
        params,
    }
}

// $/Mcf, residential price process.
fn natural_gas_request(region: &RegionCode, start: NaiveDate, end: NaiveDate) -> EnergyRequest {
    let mut params = vec![
        param("frequency", Frequency::Monthly.as_str()),
        param("data[0]", "value"),
        param("facets[duoarea][]", &format!("S{region}")),
        param("facets[process][]", "PRS"),
        param("start", &month_label(start)),
        param("end", &month_label(end)),
    ];
    params.extend(sort_params());
    EnergyRequest {
        fuel: FuelType::NaturalGas,
        path: "natural-gas/pri/sum/data",
        frequency: Frequency::Monthly,
        params,
    }
}

// $/gal, weekly heating fuels survey. Only participating states report.
fn weekly_petroleum_request(
    fuel: FuelType,
    product: ProductCode,
    region: &RegionCode,
    start: NaiveDate,
    end: NaiveDate,
) -> EnergyRequest {
    let mut params = vec![
        param("frequency", Frequency::Weekly.as_str()),
        param("data[0]", "value"),
        param("facets[duoarea][]", &format!("S{region}")),
        param("facets[product][]", product.code()),
        param("start", &start.format("%Y-%m-%d").to_string()),
        param("end", &end.format("%Y-%m-%d").to_string()),
    ];
    params.extend(sort_params());
    EnergyRequest {
        fuel,
        path: "petroleum/pri/wfr/data",
        frequency: Frequency::Weekly,
        params,
    }
}

fn sort_params() -> [(String, String); 2] {
    [
        param("sort[0][column]", "period"),
        param("sort[0][direction]", "asc"),
    ]
}

fn param(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn month_label(date: NaiveDate) -> String {
    format!("{}-{:02}", date.year(), date.month())
}

/// Anything that can answer an `EnergyRequest` with the raw JSON body.
pub trait EnergySource {
    fn fetch_json(&self, request: &EnergyRequest) -> Result<Value, AppError>;
}

pub struct EiaClient {
    client: Client,
    config: EiaConfig,
}

impl EiaClient {
    pub fn new(config: EiaConfig) -> Result<Self, AppError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, AppError> {
        Self::new(EiaConfig::from_env())
    }

    fn url(&self, request: &EnergyRequest) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), request.path)
    }
}

impl EnergySource for EiaClient {
    fn fetch_json(&self, request: &EnergyRequest) -> Result<Value, AppError> {
        let url = self.url(request);
        log::info!("GET {url} ({} {})", request.fuel, request.frequency.as_str());

        let resp = self
            .client
            .get(&url)
            .query(&request.params)
            .query(&[("api_key", self.config.api_key.as_str())])
            .send()
            .map_err(|e| AppError::transport(format!("EIA request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::http_status(
                status.as_u16(),
                format!("EIA request for {} failed with status {status}.", request.fuel),
            ));
        }

        resp.json()
            .map_err(|e| AppError::shape(format!("Failed to parse EIA response: {e}")))
    }
}

/// Fetch the raw payload for `fuel`: flat records for monthly fuels, monthly
/// averages for weekly ones.
pub fn fetch_payload<S: EnergySource + ?Sized>(
    source: &S,
    fuel: FuelType,
    region: &RegionCode,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<RawPayload, AppError> {
    let request = EnergyRequest::for_fuel(fuel, region, start, end)?;
    let body = source.fetch_json(&request)?;
    payload_from_body(request.frequency, body)
}

/// Shape a response body for the normalizer.
///
/// Weekly records are averaged per month; a body that already holds monthly
/// rows (e.g. a saved, pre-aggregated file) is passed through.
pub fn payload_from_body(frequency: Frequency, body: Value) -> Result<RawPayload, AppError> {
    let payload = RawPayload::from_json(body)?;
    match (frequency, payload) {
        (Frequency::Weekly, RawPayload::Flat(records)) => {
            let weekly = weekly_observations(&records)?;
            Ok(RawPayload::Monthly(aggregate_weekly(&weekly)?))
        }
        (_, payload) => Ok(payload),
    }
}

/// One weekly survey observation.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyObservation {
    pub period: String,
    pub value: f64,
}

fn weekly_observations(records: &[Map<String, Value>]) -> Result<Vec<WeeklyObservation>, AppError> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let field = value_field(first).ok_or_else(|| {
        AppError::shape("First weekly record has neither a `value` nor a `price` field.")
    })?;

    let mut out = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let period = record
            .get("period")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::shape(format!("Weekly record {idx} is missing a `period` string.")))?;
        let raw = record
            .get(field)
            .ok_or_else(|| AppError::shape(format!("Weekly record {idx} ({period}) is missing `{field}`.")))?;
        match json_number(raw) {
            Ok(Some(value)) => out.push(WeeklyObservation {
                period: period.to_string(),
                value,
            }),
            Ok(None) => log::debug!("weekly {period}: no {field} reported, skipping"),
            Err(kind) => {
                return Err(AppError::shape(format!(
                    "Weekly record {idx} ({period}) has a non-numeric `{field}`: {kind}"
                )));
            }
        }
    }
    Ok(out)
}

/// Group weekly observations by calendar month and average them.
///
/// Output is sorted by (year, month) ascending.
pub fn aggregate_weekly(rows: &[WeeklyObservation]) -> Result<Vec<MonthlyRow>, AppError> {
    let mut buckets: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
    for row in rows {
        let date = NaiveDate::parse_from_str(row.period.trim(), "%Y-%m-%d")
            .map_err(|e| AppError::shape(format!("Invalid weekly period '{}': {e}", row.period)))?;
        let entry = buckets.entry((date.year(), date.month())).or_insert((0.0, 0));
        entry.0 += row.value;
        entry.1 += 1;
    }

    Ok(buckets
        .into_iter()
        .map(|((year, month), (sum, n))| MonthlyRow {
            year,
            month,
            monthly_avg_price: sum / n as f64,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn ny() -> RegionCode {
        RegionCode::parse("NY").unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn obs(period: &str, value: f64) -> WeeklyObservation {
        WeeklyObservation {
            period: period.to_string(),
            value,
        }
    }

    #[test]
    fn timeout_parses_whole_seconds() {
        assert_eq!(parse_timeout(Some("30")), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout(Some(" 5 ")), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout(Some("0")), None);
        assert_eq!(parse_timeout(Some("soon")), None);
        assert_eq!(parse_timeout(None), None);
    }

    #[test]
    fn config_timeout_is_optional() {
        let config = EiaConfig::new("key");
        assert_eq!(config.timeout, None);
        assert_eq!(config.with_timeout(Duration::from_secs(9)).timeout, Some(Duration::from_secs(9)));
    }

    #[test]
    fn electricity_request_is_monthly_residential() {
        let req = EnergyRequest::for_fuel(FuelType::Electricity, &ny(), d(2022, 1, 1), d(2023, 1, 1)).unwrap();
        assert_eq!(req.path, "electricity/retail-sales/data");
        assert_eq!(req.frequency, Frequency::Monthly);
        assert_eq!(req.param("data[]"), Some("price"));
        assert_eq!(req.param("facets[sectorid][]"), Some("RES"));
        assert_eq!(req.param("facets[stateid][]"), Some("NY"));
        assert_eq!(req.param("frequency"), Some("monthly"));
        assert_eq!(req.param("start"), Some("2022-01"));
        assert_eq!(req.param("end"), Some("2023-01"));
        assert_eq!(req.param("sort[0][column]"), Some("period"));
        assert_eq!(req.param("sort[0][direction]"), Some("asc"));
    }

    #[test]
    fn natural_gas_request_uses_duoarea() {
        let req = EnergyRequest::for_fuel(FuelType::NaturalGas, &ny(), d(2022, 3, 15), d(2022, 11, 2)).unwrap();
        assert_eq!(req.path, "natural-gas/pri/sum/data");
        assert_eq!(req.param("data[0]"), Some("value"));
        assert_eq!(req.param("facets[duoarea][]"), Some("SNY"));
        assert_eq!(req.param("facets[process][]"), Some("PRS"));
        assert_eq!(req.param("start"), Some("2022-03"));
        assert_eq!(req.param("end"), Some("2022-11"));
    }

    #[test]
    fn weekly_requests_use_full_dates_and_product_codes() {
        let oil = EnergyRequest::for_fuel(FuelType::HeatingOil, &ny(), d(2022, 1, 1), d(2023, 1, 1)).unwrap();
        assert_eq!(oil.path, "petroleum/pri/wfr/data");
        assert_eq!(oil.frequency, Frequency::Weekly);
        assert_eq!(oil.param("frequency"), Some("weekly"));
        assert_eq!(oil.param("facets[product][]"), Some("EPD2F"));
        assert_eq!(oil.param("start"), Some("2022-01-01"));
        assert_eq!(oil.param("end"), Some("2023-01-01"));

        let propane = EnergyRequest::for_fuel(FuelType::Propane, &ny(), d(2022, 1, 1), d(2023, 1, 1)).unwrap();
        assert_eq!(propane.param("facets[product][]"), Some("EPLLPA"));
        assert_eq!(propane.param("facets[duoarea][]"), Some("SNY"));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = EnergyRequest::for_fuel(FuelType::Propane, &ny(), d(2023, 1, 1), d(2022, 1, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn weekly_rows_average_per_month() {
        let rows = vec![
            obs("2022-10-03", 3.50),
            obs("2022-10-10", 3.60),
            obs("2022-10-17", 3.55),
            obs("2022-10-24", 3.45),
        ];
        let monthly = aggregate_weekly(&rows).unwrap();
        assert_eq!(monthly.len(), 1);
        assert_eq!((monthly[0].year, monthly[0].month), (2022, 10));
        assert!((monthly[0].monthly_avg_price - 3.525).abs() < 1e-12);
    }

    #[test]
    fn weekly_months_are_sorted_ascending() {
        let rows = vec![
            obs("2023-01-09", 4.0),
            obs("2022-12-05", 3.0),
            obs("2022-11-28", 2.0),
            obs("2022-12-12", 5.0),
            obs("2023-01-02", 6.0),
        ];
        let monthly = aggregate_weekly(&rows).unwrap();
        let keys: Vec<(i32, u32)> = monthly.iter().map(|r| (r.year, r.month)).collect();
        assert_eq!(keys, vec![(2022, 11), (2022, 12), (2023, 1)]);
        assert_eq!(monthly[1].monthly_avg_price, 4.0);
        assert_eq!(monthly[2].monthly_avg_price, 5.0);
    }

    #[test]
    fn bad_weekly_period_is_a_shape_error() {
        let err = aggregate_weekly(&[obs("2022-10", 1.0)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    struct Canned(Value);

    impl EnergySource for Canned {
        fn fetch_json(&self, _request: &EnergyRequest) -> Result<Value, AppError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn weekly_fetch_returns_monthly_payload() {
        let source = Canned(json!({
            "response": { "data": [
                { "period": "2022-10-03", "product": "EPD2F", "value": "3.50" },
                { "period": "2022-10-10", "product": "EPD2F", "value": 3.60 },
                { "period": "2022-10-17", "product": "EPD2F", "value": null },
                { "period": "2022-11-07", "product": "EPD2F", "value": 4.0 },
            ]}
        }));
        let payload = fetch_payload(&source, FuelType::HeatingOil, &ny(), d(2022, 10, 1), d(2022, 12, 1)).unwrap();
        match payload {
            RawPayload::Monthly(rows) => {
                assert_eq!(rows.len(), 2);
                assert!((rows[0].monthly_avg_price - 3.55).abs() < 1e-12);
                assert_eq!((rows[1].year, rows[1].month), (2022, 11));
            }
            RawPayload::Flat(_) => panic!("expected monthly rows"),
        }
    }

    #[test]
    fn weekly_price_field_is_detected_like_flat_records() {
        let source = Canned(json!({
            "response": { "data": [
                { "period": "2022-10-03", "product": "EPLLPA", "price": 3.5 },
                { "period": "2022-10-10", "product": "EPLLPA", "price": "3.7" },
            ]}
        }));
        let payload = fetch_payload(&source, FuelType::Propane, &ny(), d(2022, 10, 1), d(2022, 11, 1)).unwrap();
        let RawPayload::Monthly(rows) = payload else {
            panic!("expected monthly rows");
        };
        assert_eq!(rows.len(), 1);
        assert!((rows[0].monthly_avg_price - 3.6).abs() < 1e-12);
    }

    #[test]
    fn weekly_record_without_price_field_is_a_shape_error() {
        let no_field = Canned(json!({
            "response": { "data": [ { "period": "2022-10-03", "cost": 3.5 } ] }
        }));
        let err = fetch_payload(&no_field, FuelType::Propane, &ny(), d(2022, 10, 1), d(2022, 11, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);

        // Later records must carry the field the first one chose.
        let missing_later = Canned(json!({
            "response": { "data": [
                { "period": "2022-10-03", "value": 3.5 },
                { "period": "2022-10-10", "price": 3.6 },
            ]}
        }));
        let err =
            fetch_payload(&missing_later, FuelType::HeatingOil, &ny(), d(2022, 10, 1), d(2022, 11, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn weekly_non_finite_price_is_a_shape_error() {
        let source = Canned(json!({
            "response": { "data": [ { "period": "2022-10-03", "value": "NaN" } ] }
        }));
        let err = fetch_payload(&source, FuelType::HeatingOil, &ny(), d(2022, 10, 1), d(2022, 11, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn monthly_fetch_returns_flat_payload() {
        let source = Canned(json!({
            "response": { "data": [ { "period": "2022-01", "price": 21.0 } ] }
        }));
        let payload = fetch_payload(&source, FuelType::Electricity, &ny(), d(2022, 1, 1), d(2022, 2, 1)).unwrap();
        assert!(matches!(payload, RawPayload::Flat(ref r) if r.len() == 1));
    }
}
