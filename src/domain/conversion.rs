//! Energy-content conversion factors.
//!
//! All factors are expressed in million BTU (MMBtu) per native unit, so a
//! native price divided by the factor gives dollars per MMBtu. Sources:
//! EIA "units and calculators" and the EnergyStar thermal conversions table.

use std::collections::HashMap;

use crate::domain::FuelType;

pub const NO1_OIL_MMBTU_PER_GAL: f64 = 0.135;
pub const NO2_OIL_MMBTU_PER_GAL: f64 = 0.140;
pub const NO4_OIL_MMBTU_PER_GAL: f64 = 0.146;
pub const NO5_OIL_MMBTU_PER_GAL: f64 = 0.1445;
pub const NO6_OIL_MMBTU_PER_GAL: f64 = 0.150;
pub const HEATING_OIL_MMBTU_PER_GAL: f64 = 0.1385;
pub const ELECTRICITY_MMBTU_PER_KWH: f64 = 0.003_412_14;
/// Per thousand cubic feet.
pub const NG_MMBTU_PER_MCF: f64 = 1.036;
pub const NG_MMBTU_PER_THERM: f64 = 0.1;
pub const PROPANE_MMBTU_PER_GAL: f64 = 0.091_452;
pub const WOOD_MMBTU_PER_CORD: f64 = 20.0;

pub const CENTS_IN_DOLLAR: f64 = 100.0;

/// Currency unit of an upstream price quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceQuote {
    Dollars,
    Cents,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionFactor {
    pub mmbtu_per_unit: f64,
    pub quote: PriceQuote,
}

impl ConversionFactor {
    pub const fn dollars(mmbtu_per_unit: f64) -> Self {
        Self {
            mmbtu_per_unit,
            quote: PriceQuote::Dollars,
        }
    }

    pub const fn cents(mmbtu_per_unit: f64) -> Self {
        Self {
            mmbtu_per_unit,
            quote: PriceQuote::Cents,
        }
    }

    /// Value a native price is divided by to yield $/MMBtu.
    ///
    /// Cent quotes carry the cents→dollars adjustment here, so callers never
    /// touch the price itself. Factors are MMBtu per unit, so a cent quote
    /// multiplies the factor by 100. Dividing it by 100 instead would
    /// inflate ¢/kWh prices by 10^4.
    pub fn divisor(self) -> f64 {
        match self.quote {
            PriceQuote::Dollars => self.mmbtu_per_unit,
            PriceQuote::Cents => self.mmbtu_per_unit * CENTS_IN_DOLLAR,
        }
    }
}

/// The factor each fuel's EIA series needs.
pub fn standard_factor(fuel: FuelType) -> ConversionFactor {
    match fuel {
        FuelType::Propane => ConversionFactor::dollars(PROPANE_MMBTU_PER_GAL),
        FuelType::NaturalGas => ConversionFactor::dollars(NG_MMBTU_PER_MCF),
        FuelType::Electricity => ConversionFactor::cents(ELECTRICITY_MMBTU_PER_KWH),
        FuelType::HeatingOil => ConversionFactor::dollars(HEATING_OIL_MMBTU_PER_GAL),
    }
}

/// Registry of factors used by the converter.
///
/// `standard()` covers every fuel. Partial or overridden tables are allowed
/// (e.g. natural gas quoted per therm); a lookup miss is reported to the
/// caller instead of falling back to a factor of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTable {
    factors: HashMap<FuelType, ConversionFactor>,
}

impl ConversionTable {
    pub fn standard() -> Self {
        let factors = FuelType::ALL
            .iter()
            .map(|&fuel| (fuel, standard_factor(fuel)))
            .collect();
        Self { factors }
    }

    pub fn empty() -> Self {
        Self {
            factors: HashMap::new(),
        }
    }

    pub fn with(mut self, fuel: FuelType, factor: ConversionFactor) -> Self {
        self.factors.insert(fuel, factor);
        self
    }

    pub fn without(mut self, fuel: FuelType) -> Self {
        self.factors.remove(&fuel);
        self
    }

    pub fn factor(&self, fuel: FuelType) -> Option<ConversionFactor> {
        self.factors.get(&fuel).copied()
    }
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_covers_every_fuel() {
        let table = ConversionTable::standard();
        for fuel in FuelType::ALL {
            assert!(table.factor(fuel).is_some(), "missing factor for {fuel}");
        }
    }

    #[test]
    fn electricity_divisor_includes_cents_adjustment() {
        let f = standard_factor(FuelType::Electricity);
        assert_eq!(f.quote, PriceQuote::Cents);
        assert!((f.divisor() - 0.341214).abs() < 1e-12);
    }

    #[test]
    fn dollar_quotes_use_raw_energy_content() {
        assert_eq!(standard_factor(FuelType::NaturalGas).divisor(), 1.036);
        assert_eq!(standard_factor(FuelType::Propane).divisor(), 0.091452);
        assert_eq!(standard_factor(FuelType::HeatingOil).divisor(), 0.1385);
    }

    #[test]
    fn partial_table_reports_missing_fuel() {
        let table = ConversionTable::standard().without(FuelType::Propane);
        assert!(table.factor(FuelType::Propane).is_none());

        let therms = ConversionTable::empty()
            .with(FuelType::NaturalGas, ConversionFactor::dollars(NG_MMBTU_PER_THERM));
        assert_eq!(therms.factor(FuelType::NaturalGas).map(|f| f.divisor()), Some(0.1));
        assert!(therms.factor(FuelType::Electricity).is_none());
    }
}
