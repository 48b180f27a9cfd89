//! Native unit price → dollars per million BTU.

use crate::domain::{ConversionTable, PriceBasis, PriceSeries};
use crate::error::AppError;

/// Result of a conversion attempt.
///
/// A fuel missing from the registry is not silently divided by 1: the series
/// comes back untouched in `Unconverted`, still on its native basis.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Converted(PriceSeries),
    Unconverted(PriceSeries),
}

impl Conversion {
    pub fn is_converted(&self) -> bool {
        matches!(self, Conversion::Converted(_))
    }

    /// The converted series, or an unsupported-input error.
    pub fn into_converted(self) -> Result<PriceSeries, AppError> {
        match self {
            Conversion::Converted(series) => Ok(series),
            Conversion::Unconverted(series) => Err(AppError::unsupported(format!(
                "No BTU conversion factor registered for {}; prices left in {}.",
                series.fuel.display_name(),
                series.fuel.native_unit()
            ))),
        }
    }
}

/// Divide every price in `series` by its fuel's factor from `table`.
///
/// Tags and period labels are untouched.
pub fn price_per_btu(mut series: PriceSeries, table: &ConversionTable) -> Result<Conversion, AppError> {
    if series.basis == PriceBasis::PerMmbtu {
        return Err(AppError::unsupported(format!(
            "{} series for {} is already priced per MMBtu.",
            series.fuel.display_name(),
            series.region
        )));
    }

    let Some(factor) = table.factor(series.fuel) else {
        log::warn!(
            "no conversion factor for {}; {} series left unconverted",
            series.fuel,
            series.region
        );
        return Ok(Conversion::Unconverted(series));
    };

    let divisor = factor.divisor();
    if !(divisor.is_finite() && divisor > 0.0) {
        return Err(AppError::unsupported(format!(
            "Invalid conversion factor {divisor} for {}.",
            series.fuel
        )));
    }

    series.map_prices(|price| price / divisor);
    series.basis = PriceBasis::PerMmbtu;
    log::debug!(
        "converted {} {} series ({} points, divisor {divisor})",
        series.fuel,
        series.region,
        series.len()
    );
    Ok(Conversion::Converted(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConversionFactor, FuelType, RegionCode};
    use crate::error::ErrorKind;

    fn series(fuel: FuelType, points: &[(&str, f64)]) -> PriceSeries {
        let mut s = PriceSeries::new(fuel, RegionCode::parse("NY").unwrap());
        for (period, price) in points {
            s.insert(*period, *price);
        }
        s
    }

    #[test]
    fn natural_gas_known_value() {
        let input = series(FuelType::NaturalGas, &[("2022-1", 13.86)]);
        let out = price_per_btu(input, &ConversionTable::standard())
            .unwrap()
            .into_converted()
            .unwrap();

        let v = out.get("2022-1").unwrap();
        assert!((v - 13.3784).abs() < 1e-4, "got {v}");
        assert_eq!(out.basis, PriceBasis::PerMmbtu);
        assert_eq!(out.fuel, FuelType::NaturalGas);
        assert_eq!(out.region.as_str(), "NY");
    }

    #[test]
    fn electricity_cents_become_dollars_per_mmbtu() {
        // 14¢/kWh = $0.14 / 0.00341214 MMBtu ≈ $41.03/MMBtu
        let input = series(FuelType::Electricity, &[("2022-01", 14.0)]);
        let out = price_per_btu(input, &ConversionTable::standard())
            .unwrap()
            .into_converted()
            .unwrap();
        let v = out.get("2022-01").unwrap();
        assert!((v - 41.0300).abs() < 1e-3, "got {v}");
    }

    #[test]
    fn key_set_is_preserved() {
        let input = series(FuelType::Propane, &[("2022-1", 2.5), ("2022-2", 2.75), ("2022-3", 2.6)]);
        let before: Vec<String> = input.periods().map(str::to_string).collect();
        let out = price_per_btu(input, &ConversionTable::standard())
            .unwrap()
            .into_converted()
            .unwrap();
        let after: Vec<String> = out.periods().map(str::to_string).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let a = series(FuelType::HeatingOil, &[("2022-10", 3.525), ("2022-11", 3.9)]);
        let b = series(FuelType::HeatingOil, &[("2022-10", 3.525), ("2022-11", 3.9)]);
        let table = ConversionTable::standard();
        assert_eq!(price_per_btu(a, &table).unwrap(), price_per_btu(b, &table).unwrap());
    }

    #[test]
    fn unregistered_fuel_is_reported_not_divided_by_one() {
        let table = ConversionTable::standard().without(FuelType::Propane);
        let input = series(FuelType::Propane, &[("2022-1", 2.5)]);

        let outcome = price_per_btu(input.clone(), &table).unwrap();
        assert!(!outcome.is_converted());
        match &outcome {
            Conversion::Unconverted(s) => {
                assert_eq!(s, &input);
                assert_eq!(s.basis, PriceBasis::Native);
            }
            Conversion::Converted(_) => panic!("expected unconverted"),
        }

        let err = outcome.into_converted().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn double_conversion_is_rejected() {
        let table = ConversionTable::standard();
        let once = price_per_btu(series(FuelType::NaturalGas, &[("2022-1", 13.86)]), &table)
            .unwrap()
            .into_converted()
            .unwrap();
        assert!(price_per_btu(once, &table).is_err());
    }

    #[test]
    fn zero_factor_is_rejected() {
        let table = ConversionTable::standard().with(FuelType::NaturalGas, ConversionFactor::dollars(0.0));
        assert!(price_per_btu(series(FuelType::NaturalGas, &[("2022-1", 1.0)]), &table).is_err());
    }
}
