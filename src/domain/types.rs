//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - carried through the fetch → normalize → convert pipeline
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::geo;
use crate::error::AppError;

/// Fuels with a published EIA retail price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Propane,
    #[value(alias = "ng", alias = "gas")]
    NaturalGas,
    #[value(alias = "elec")]
    Electricity,
    #[value(alias = "oil")]
    HeatingOil,
}

impl FuelType {
    pub const ALL: [FuelType; 4] = [
        FuelType::Propane,
        FuelType::NaturalGas,
        FuelType::Electricity,
        FuelType::HeatingOil,
    ];

    /// Stable machine key (also the serialized form).
    pub fn key(self) -> &'static str {
        match self {
            FuelType::Propane => "propane",
            FuelType::NaturalGas => "natural_gas",
            FuelType::Electricity => "electricity",
            FuelType::HeatingOil => "heating_oil",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FuelType::Propane => "Propane",
            FuelType::NaturalGas => "Natural gas",
            FuelType::Electricity => "Electricity",
            FuelType::HeatingOil => "Heating oil",
        }
    }

    /// Unit the upstream API quotes prices in.
    pub fn native_unit(self) -> &'static str {
        match self {
            FuelType::Propane | FuelType::HeatingOil => "$/gal",
            FuelType::NaturalGas => "$/Mcf",
            FuelType::Electricity => "¢/kWh",
        }
    }

    /// Upstream reporting resolution.
    pub fn frequency(self) -> Frequency {
        match self {
            FuelType::NaturalGas | FuelType::Electricity => Frequency::Monthly,
            FuelType::Propane | FuelType::HeatingOil => Frequency::Weekly,
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FuelType {
    type Err = AppError;

    /// Accepts the machine key, the kebab-case CLI name, or a short alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('-', "_");
        match norm.as_str() {
            "propane" => Ok(FuelType::Propane),
            "natural_gas" | "ng" | "gas" => Ok(FuelType::NaturalGas),
            "electricity" | "elec" => Ok(FuelType::Electricity),
            "heating_oil" | "oil" => Ok(FuelType::HeatingOil),
            _ => Err(AppError::unsupported(format!("Unsupported energy type: {s}"))),
        }
    }
}

/// Petroleum product codes used as the `product` facet on EIA petroleum endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductCode {
    Propane,
    HeatingOil,
}

impl ProductCode {
    pub fn code(self) -> &'static str {
        match self {
            ProductCode::Propane => "EPLLPA",
            ProductCode::HeatingOil => "EPD2F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Weekly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Monthly => "monthly",
            Frequency::Weekly => "weekly",
        }
    }
}

/// A 2-character state postal code, validated against the static state table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionCode(String);

impl RegionCode {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let code = raw.trim().to_ascii_uppercase();
        if geo::state_by_code(&code).is_none() {
            return Err(AppError::unsupported(format!("Unknown region code '{raw}'.")));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RegionCode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RegionCode {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegionCode> for String {
    fn from(value: RegionCode) -> Self {
        value.0
    }
}

/// Whether a series still carries upstream unit prices or has been converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    /// Upstream unit (see `FuelType::native_unit`).
    Native,
    /// Dollars per million BTU.
    PerMmbtu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub period: String,
    pub price: f64,
}

/// The canonical period → price mapping, tagged with fuel and region.
///
/// Period labels keep the form the source used (`2022-01` from monthly
/// endpoints, `2022-1` from aggregated weekly data); use `period_key` to
/// compare them across fuels. Insertion order is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub fuel: FuelType,
    pub region: RegionCode,
    pub basis: PriceBasis,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(fuel: FuelType, region: RegionCode) -> Self {
        Self {
            fuel,
            region,
            basis: PriceBasis::Native,
            points: Vec::new(),
        }
    }

    /// Insert or replace the price for `period`.
    pub fn insert(&mut self, period: impl Into<String>, price: f64) {
        let period = period.into();
        match self.points.iter_mut().find(|p| p.period == period) {
            Some(existing) => existing.price = price,
            None => self.points.push(PricePoint { period, price }),
        }
    }

    pub fn get(&self, period: &str) -> Option<f64> {
        self.points.iter().find(|p| p.period == period).map(|p| p.price)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn periods(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|p| p.period.as_str())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Apply `f` to every price, keeping labels and tags.
    pub(crate) fn map_prices(&mut self, f: impl Fn(f64) -> f64) {
        for p in &mut self.points {
            p.price = f(p.price);
        }
    }

    pub fn unit_label(&self) -> &'static str {
        match self.basis {
            PriceBasis::Native => self.fuel.native_unit(),
            PriceBasis::PerMmbtu => "$/MMBtu",
        }
    }

    /// Min / max / mean over finite prices.
    pub fn stats(&self) -> Option<SeriesStats> {
        let values: Vec<f64> = self.points.iter().map(|p| p.price).filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some(SeriesStats {
            n: values.len(),
            min,
            max,
            mean,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Parse a `YYYY-M` / `YYYY-MM` period label into `(year, month)`.
pub fn period_key(label: &str) -> Option<(i32, u32)> {
    let (year, month) = label.split_once('-')?;
    let year = year.trim().parse::<i32>().ok()?;
    let month = month.trim().parse::<u32>().ok()?;
    if (1..=12).contains(&month) {
        Some((year, month))
    } else {
        None
    }
}
