//! Census ACS 5-year lookups by ZIP code tabulation area (ZCTA).
//!
//! ACS responses are JSON arrays of arrays; the first row names the columns.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::domain::geo::State;
use crate::error::AppError;

pub const BASE_URL: &str = "https://api.census.gov/data";
pub const API_KEY_VAR: &str = "CENSUS_API_KEY";

/// Profile year used for race makeup lookups.
const RACE_PROFILE_YEAR: u16 = 2021;

/// DP05 estimates: white, black, american indian/alaska native, asian,
/// native hawaiian/pacific islander, some other race.
const RACE_VARIABLES: [&str; 6] = [
    "DP05_0064E",
    "DP05_0065E",
    "DP05_0066E",
    "DP05_0067E",
    "DP05_0068E",
    "DP05_0069E",
];

/// S1901: median household income, all households.
const MEDIAN_INCOME_VARIABLE: &str = "S1901_C01_012E";

const ZCTA_GEOGRAPHY: &str = "zip code tabulation area";

/// Longest column name kept in group exports (GIS tools reject 80+).
const MAX_COLUMN_NAME: usize = 80;

/// Shortenings applied, in order, to CamelCased group labels.
///
/// `NotHispanicOrLatino` must run before `HispanicOrLatino`.
const LABEL_ABBREVIATIONS: [(&str, &str); 19] = [
    ("PercentMarginOfError", "PME"),
    ("Estimate", "EST"),
    ("Percent", "PCT"),
    ("MarginOfError", "MOE"),
    ("AnnotationOf", "ann"),
    ("AmericanIndian", "_A_"),
    ("BlackOrAfricanAmerica", "_B_"),
    ("PacificIslanderIncludingNativeHawaiian", "_P_"),
    ("Asian", "_S_"),
    ("White", "_W_"),
    ("Unknown", "_O_"),
    ("NotHispanicOrLatino", "_N_"),
    ("HispanicOrLatino", "_H_"),
    ("TotalPopulation", "TPOP"),
    ("OrMore", "plus"),
    ("AndOver", "plus"),
    ("One", "1"),
    ("Two", "2"),
    ("Three", "3"),
];

/// ACS 5-year table families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcsSurvey {
    /// Data profiles (`DP..` tables), queried per state.
    Profile,
    /// Subject tables (`S..` tables), queried nationwide.
    Subject,
}

impl AcsSurvey {
    /// Infer the family from a table id such as `DP05` or `S1901`.
    pub fn for_table(table: &str) -> Result<Self, AppError> {
        let upper = table.trim().to_ascii_uppercase();
        if upper.starts_with("DP") {
            Ok(AcsSurvey::Profile)
        } else if upper.starts_with('S') {
            Ok(AcsSurvey::Subject)
        } else {
            Err(AppError::unsupported(format!(
                "Unsupported ACS table '{table}' (expected a DP.. profile or S.. subject table)."
            )))
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            AcsSurvey::Profile => "profile",
            AcsSurvey::Subject => "subject",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CensusConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Option<Duration>,
}

impl CensusConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: Some(Duration::from_secs(15)),
        }
    }

    /// Read `CENSUS_API_KEY` (after loading `.env`). A missing key is logged, not fatal.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let api_key = std::env::var(API_KEY_VAR).unwrap_or_else(|_| {
            log::warn!(
                "{API_KEY_VAR} is not set; Census requests may be rejected. Request a key at https://api.census.gov/data/key_signup.html"
            );
            String::new()
        });
        Self::new(api_key)
    }
}

/// A header row plus data rows, as returned by the ACS API.
#[derive(Debug, Clone, PartialEq)]
pub struct CensusTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl CensusTable {
    pub fn from_json(value: Value) -> Result<Self, AppError> {
        let Value::Array(rows) = value else {
            return Err(AppError::shape("Census response is not an array of rows."));
        };
        let mut rows = rows.into_iter();
        let header = match rows.next() {
            Some(Value::Array(cells)) => cells
                .into_iter()
                .map(|c| match c {
                    Value::String(s) => Ok(s),
                    other => Err(AppError::shape(format!("Census header cell is not a string: {other}"))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(AppError::shape("Census response has no header row.")),
        };

        let mut out = Vec::new();
        for (idx, row) in rows.enumerate() {
            let Value::Array(cells) = row else {
                return Err(AppError::shape(format!("Census row {idx} is not an array.")));
            };
            if cells.len() != header.len() {
                return Err(AppError::shape(format!(
                    "Census row {idx} has {} cells, header has {}.",
                    cells.len(),
                    header.len()
                )));
            }
            out.push(cells.into_iter().map(cell_text).collect());
        }

        Ok(Self { header, rows: out })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Cell text for `name` in data row `row`.
    pub fn get(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column(name)?;
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Numeric estimate for `name` in data row `row`.
    ///
    /// ACS encodes "not available" as large negative sentinels (e.g.
    /// `-666666666`); those come back as `None`.
    pub fn estimate(&self, row: usize, name: &str) -> Option<f64> {
        let v = self.get(row, name)?.trim().parse::<f64>().ok()?;
        if v.is_finite() && v >= 0.0 { Some(v) } else { None }
    }

    /// Keep the labelled columns of a group export.
    ///
    /// Drops `NAME`, annotation columns (`ann..`) and any column still named
    /// after the table (variables the group metadata did not label), then
    /// renames the geography columns to `ZCTA` / `STATE_FIPS`.
    pub fn select_group_columns(self, table: &str) -> Self {
        let table = table.to_ascii_lowercase();
        let keep: Vec<usize> = self
            .header
            .iter()
            .enumerate()
            .filter(|(_, h)| {
                let lower = h.to_ascii_lowercase();
                h.as_str() != "NAME" && !lower.starts_with("ann") && !lower.contains(&table)
            })
            .map(|(idx, _)| idx)
            .collect();

        let header = keep
            .iter()
            .map(|&idx| match self.header[idx].as_str() {
                ZCTA_GEOGRAPHY => "ZCTA".to_string(),
                "state" => "STATE_FIPS".to_string(),
                other => other.to_string(),
            })
            .collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| keep.iter().map(|&idx| row.get(idx).cloned().flatten()).collect())
            .collect();

        Self { header, rows }
    }
}

/// Variable id → label, from an ACS `groups/{table}.json` document.
pub fn group_labels(value: &Value) -> Result<HashMap<String, String>, AppError> {
    let variables = value
        .get("variables")
        .and_then(Value::as_object)
        .ok_or_else(|| AppError::shape("ACS group metadata has no `variables` object."))?;
    Ok(variables
        .iter()
        .filter_map(|(name, meta)| {
            let label = meta.get("label")?.as_str()?;
            Some((name.clone(), label.to_string()))
        })
        .collect())
}

/// Turn an ACS label like `Estimate!!RACE!!Total population` into a short
/// CamelCase column name (`ESTRaceTPOP`), at most 80 characters.
pub fn short_column_name(label: &str) -> String {
    let joined = label.replace("!!", " ");
    let mut name: String = joined.split_whitespace().map(capitalize).collect();
    for (long, short) in LABEL_ABBREVIATIONS {
        name = name.replace(long, short);
    }
    name.chars().take(MAX_COLUMN_NAME).collect()
}

/// Replace variable ids in `headers` with their short labels.
///
/// Headers without metadata (geography columns, annotations) are left alone,
/// as is any header whose short name already appears earlier in the row.
pub fn translate_group_headers(headers: &mut [String], labels: &HashMap<String, String>) {
    for idx in 0..headers.len() {
        let Some(label) = labels.get(&headers[idx]) else {
            continue;
        };
        let name = short_column_name(label);
        if !headers[..idx].contains(&name) {
            headers[idx] = name;
        }
    }
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Race makeup estimates (population counts) for one ZCTA.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceMakeup {
    pub zcta: String,
    pub white: Option<f64>,
    pub black: Option<f64>,
    pub american_indian: Option<f64>,
    pub asian: Option<f64>,
    pub pacific_islander: Option<f64>,
    pub other: Option<f64>,
}

impl RaceMakeup {
    fn from_table(table: &CensusTable, zcta: &str) -> Option<Self> {
        if table.rows.is_empty() {
            return None;
        }
        Some(Self {
            zcta: table.get(0, ZCTA_GEOGRAPHY).unwrap_or(zcta).to_string(),
            white: table.estimate(0, RACE_VARIABLES[0]),
            black: table.estimate(0, RACE_VARIABLES[1]),
            american_indian: table.estimate(0, RACE_VARIABLES[2]),
            asian: table.estimate(0, RACE_VARIABLES[3]),
            pacific_islander: table.estimate(0, RACE_VARIABLES[4]),
            other: table.estimate(0, RACE_VARIABLES[5]),
        })
    }

    /// `(label, estimate)` pairs in table order.
    pub fn entries(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("White", self.white),
            ("Black or African American", self.black),
            ("American Indian and Alaska Native", self.american_indian),
            ("Asian", self.asian),
            ("Native Hawaiian and Other Pacific Islander", self.pacific_islander),
            ("Some other race", self.other),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MedianIncome {
    pub zcta: String,
    pub name: Option<String>,
    pub year: u16,
    pub dollars: Option<f64>,
}

pub struct CensusClient {
    client: Client,
    config: CensusConfig,
}

impl CensusClient {
    pub fn new(config: CensusConfig) -> Result<Self, AppError> {
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
        Self::new(CensusConfig::from_env())
    }

    pub fn race_makeup_by_zcta(&self, zcta: &str) -> Result<Option<RaceMakeup>, AppError> {
        let get = RACE_VARIABLES.join(",");
        let path = format!("{RACE_PROFILE_YEAR}/acs/acs5/profile");
        let Some(table) = self.fetch_table(&path, &get, &format!("{ZCTA_GEOGRAPHY}:{zcta}"), None)? else {
            return Ok(None);
        };
        Ok(RaceMakeup::from_table(&table, zcta))
    }

    pub fn median_income_by_zcta(&self, zcta: &str, year: u16) -> Result<Option<MedianIncome>, AppError> {
        let get = format!("NAME,{MEDIAN_INCOME_VARIABLE}");
        let path = format!("{year}/acs/acs5/subject");
        let Some(table) = self.fetch_table(&path, &get, &format!("{ZCTA_GEOGRAPHY}:{zcta}"), None)? else {
            return Ok(None);
        };
        if table.rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(MedianIncome {
            zcta: zcta.to_string(),
            name: table.get(0, "NAME").map(str::to_string),
            year,
            dollars: table.estimate(0, MEDIAN_INCOME_VARIABLE),
        }))
    }

    /// Every variable of `table` for every ZCTA, with labelled columns.
    ///
    /// Profile tables are fetched for the ZCTAs of `state`; subject tables
    /// nationwide. `Ok(None)` when the API does not know the table or year.
    pub fn group_table(&self, table: &str, year: u16, state: Option<&State>) -> Result<Option<CensusTable>, AppError> {
        let survey = AcsSurvey::for_table(table)?;
        let within = match (survey, state) {
            (AcsSurvey::Profile, Some(state)) => Some(format!("state:{}", state.fips)),
            (AcsSurvey::Profile, None) => {
                return Err(AppError::unsupported(format!(
                    "Profile table {table} is fetched per state; pass a state."
                )));
            }
            (AcsSurvey::Subject, _) => None,
        };

        let Some(labels) = self.group_labels(survey, table, year)? else {
            return Ok(None);
        };

        let path = format!("{year}/acs/acs5/{}", survey.path());
        let get = format!("group({table})");
        let for_geo = format!("{ZCTA_GEOGRAPHY}:*");
        let Some(mut data) = self.fetch_table(&path, &get, &for_geo, within.as_deref())? else {
            return Ok(None);
        };

        translate_group_headers(&mut data.header, &labels);
        let data = data.select_group_columns(table);
        log::info!(
            "ACS {table} ({year}): {} ZCTAs, {} columns",
            data.rows.len(),
            data.header.len()
        );
        Ok(Some(data))
    }

    fn group_labels(&self, survey: AcsSurvey, table: &str, year: u16) -> Result<Option<HashMap<String, String>>, AppError> {
        let url = format!(
            "{}/{year}/acs/acs5/{}/groups/{table}.json",
            self.config.base_url.trim_end_matches('/'),
            survey.path()
        );
        log::info!("GET {url}");
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AppError::transport(format!("Census request failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
            log::info!("No ACS group metadata for {table} ({year}): status {status}");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::http_status(
                status.as_u16(),
                format!("Census group metadata request failed with status {status}."),
            ));
        }

        let body: Value = resp
            .json()
            .map_err(|e| AppError::shape(format!("Failed to parse ACS group metadata: {e}")))?;
        group_labels(&body).map(Some)
    }

    /// `Ok(None)` when the API answers 400 (unknown variable or geography).
    fn fetch_table(&self, path: &str, get: &str, for_geo: &str, within: Option<&str>) -> Result<Option<CensusTable>, AppError> {
        let url = format!("{}/{path}", self.config.base_url.trim_end_matches('/'));
        log::info!("GET {url} get={get} for={for_geo}");

        let mut req = self.client.get(&url).query(&[("get", get), ("for", for_geo)]);
        if let Some(within) = within {
            req = req.query(&[("in", within)]);
        }
        if !self.config.api_key.is_empty() {
            req = req.query(&[("key", self.config.api_key.as_str())]);
        }
        let resp = req
            .send()
            .map_err(|e| AppError::transport(format!("Census request failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST {
            let body = resp.text().unwrap_or_default();
            log::info!("Census rejected request: {}", body.trim());
            return Ok(None);
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::http_status(
                status.as_u16(),
                format!("Census request failed with status {status}."),
            ));
        }

        let body: Value = resp
            .json()
            .map_err(|e| AppError::shape(format!("Failed to parse Census response: {e}")))?;
        CensusTable::from_json(body).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_maps_header_to_cells() {
        let table = CensusTable::from_json(json!([
            ["NAME", "S1901_C01_012E", "zip code tabulation area"],
            ["ZCTA5 02138", "112000", "02138"],
        ]))
        .unwrap();
        assert_eq!(table.get(0, "NAME"), Some("ZCTA5 02138"));
        assert_eq!(table.estimate(0, MEDIAN_INCOME_VARIABLE), Some(112000.0));
        assert_eq!(table.get(0, "missing"), None);
        assert_eq!(table.get(1, "NAME"), None);
    }

    #[test]
    fn sentinels_and_nulls_are_missing() {
        let table = CensusTable::from_json(json!([
            ["A", "B", "C"],
            ["-666666666", null, "12.5"],
        ]))
        .unwrap();
        assert_eq!(table.estimate(0, "A"), None);
        assert_eq!(table.estimate(0, "B"), None);
        assert_eq!(table.estimate(0, "C"), Some(12.5));
    }

    #[test]
    fn race_makeup_reads_profile_columns() {
        let mut header: Vec<Value> = RACE_VARIABLES.iter().map(|v| json!(v)).collect();
        header.push(json!(ZCTA_GEOGRAPHY));
        let table = CensusTable::from_json(json!([
            header,
            ["1000", "200", "10", "300", "5", "-888888888", "22066"],
        ]))
        .unwrap();

        let makeup = RaceMakeup::from_table(&table, "22066").unwrap();
        assert_eq!(makeup.zcta, "22066");
        assert_eq!(makeup.white, Some(1000.0));
        assert_eq!(makeup.asian, Some(300.0));
        assert_eq!(makeup.other, None);
        assert_eq!(makeup.entries()[1], ("Black or African American", Some(200.0)));
    }

    fn dp05_metadata() -> Value {
        json!({ "variables": {
            "DP05_0001E": { "label": "Estimate!!SEX AND AGE!!Total population", "group": "DP05" },
            "DP05_0037PE": { "label": "Percent!!RACE!!Total population!!One race!!White", "group": "DP05" },
            "DP05_0071E": {
                "label": "Estimate!!HISPANIC OR LATINO AND RACE!!Total population!!Not Hispanic or Latino",
                "group": "DP05"
            },
            "DP05_0001EA": { "label": "Annotation of Estimate!!SEX AND AGE!!Total population", "group": "DP05" },
            "DP05_0002E": { "label": "Estimate!!SEX AND AGE!!Total population", "group": "DP05" },
            "for": { "label": "Census API FIPS 'for' clause" }
        }})
    }

    #[test]
    fn labels_become_short_camel_case_names() {
        assert_eq!(short_column_name("Estimate!!SEX AND AGE!!Total population"), "ESTSexAndAgeTPOP");
        assert_eq!(
            short_column_name("Percent!!RACE!!Total population!!One race!!White"),
            "PCTRaceTPOP1Race_W_"
        );
        assert_eq!(
            short_column_name("Estimate!!HISPANIC OR LATINO AND RACE!!Total population!!Not Hispanic or Latino"),
            "EST_H_AndRaceTPOP_N_"
        );
        assert_eq!(
            short_column_name("Annotation of Estimate!!SEX AND AGE!!Total population"),
            "annESTSexAndAgeTPOP"
        );
        let long = "Estimate!!".to_string() + &"word ".repeat(40);
        assert_eq!(short_column_name(&long).chars().count(), MAX_COLUMN_NAME);
    }

    #[test]
    fn group_headers_are_translated_and_selected() {
        let labels = group_labels(&dp05_metadata()).unwrap();
        assert_eq!(labels.len(), 6);

        let mut table = CensusTable::from_json(json!([
            ["GEO_ID", "NAME", "DP05_0001E", "DP05_0001EA", "DP05_0002E", "DP05_0037PE", "DP05_0099E", "state", "zip code tabulation area"],
            ["860Z200US10001", "ZCTA5 10001", "27004", null, "13000", "55.1", "7", "36", "10001"],
        ]))
        .unwrap();
        translate_group_headers(&mut table.header, &labels);
        assert_eq!(table.header[2], "ESTSexAndAgeTPOP");
        assert_eq!(table.header[3], "annESTSexAndAgeTPOP");
        // Same short name as column 2, so the variable id stays.
        assert_eq!(table.header[4], "DP05_0002E");
        assert_eq!(table.header[6], "DP05_0099E");

        let selected = table.select_group_columns("DP05");
        assert_eq!(
            selected.header,
            vec!["GEO_ID", "ESTSexAndAgeTPOP", "PCTRaceTPOP1Race_W_", "STATE_FIPS", "ZCTA"]
        );
        assert_eq!(
            selected.rows[0],
            vec![
                Some("860Z200US10001".to_string()),
                Some("27004".to_string()),
                Some("55.1".to_string()),
                Some("36".to_string()),
                Some("10001".to_string()),
            ]
        );
    }

    #[test]
    fn survey_is_inferred_from_table_id() {
        assert_eq!(AcsSurvey::for_table("DP05").unwrap(), AcsSurvey::Profile);
        assert_eq!(AcsSurvey::for_table("s1901").unwrap(), AcsSurvey::Subject);
        assert!(AcsSurvey::for_table("B01001").is_err());
    }

    #[test]
    fn metadata_without_variables_fails() {
        assert!(group_labels(&json!({ "groups": [] })).is_err());
    }

    #[test]
    fn malformed_tables_fail() {
        assert!(CensusTable::from_json(json!({ "error": "x" })).is_err());
        assert!(CensusTable::from_json(json!([])).is_err());
        assert!(CensusTable::from_json(json!([["A", "B"], ["1"]])).is_err());
    }
}
