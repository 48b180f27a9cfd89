//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::app::pipeline::FuelComparison;
use crate::data::census::{MedianIncome, RaceMakeup};
use crate::domain::{FuelType, PriceSeries, geo};
use crate::report::{Comparison, cheapest_counts};

/// Header block for a single series.
pub fn format_series_summary(series: &PriceSeries) -> String {
    let mut out = String::new();

    out.push_str("=== btu - energy price per BTU ===\n");
    out.push_str(&format!(
        "Fuel: {} (quoted in {})\n",
        series.fuel.display_name(),
        series.fuel.native_unit()
    ));
    out.push_str(&format!("Region: {}\n", region_label(series.region.as_str())));
    match series.stats() {
        Some(stats) => out.push_str(&format!(
            "Months: n={} | min={:.3} max={:.3} mean={:.3} {}\n",
            stats.n,
            stats.min,
            stats.max,
            stats.mean,
            series.unit_label()
        )),
        None => out.push_str("Months: n=0 (no data reported for this range)\n"),
    }
    out.push('\n');

    out
}

/// Period/price table for a single series.
pub fn format_series_table(series: &PriceSeries) -> String {
    let mut out = String::new();
    let unit = series.unit_label();
    out.push_str(format!("{:<10} {:>12}\n", "period", unit).trim_end());
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<12}\n", "", "").trim_end());
    out.push('\n');

    for p in series.points() {
        out.push_str(format!("{:<10} {:>12.3}\n", truncate(&p.period, 10), p.price).trim_end());
        out.push('\n');
    }

    out
}

/// Month-by-fuel table with the cheapest fuel marked `*`.
pub fn format_comparison(comparison: &Comparison) -> String {
    let mut out = String::new();

    let mut header = format!("{:<8}", "month");
    let mut rule = format!("{:-<8}", "");
    for fuel in &comparison.fuels {
        header.push_str(&format!(" {:>13}", short_name(*fuel)));
        rule.push_str(&format!(" {:-<13}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    for row in &comparison.rows {
        let mut line = format!("{:<8}", format!("{}-{:02}", row.year, row.month));
        for (fuel, price) in comparison.fuels.iter().zip(&row.prices) {
            let mark = if row.cheapest == Some(*fuel) { "*" } else { " " };
            let cell = match price {
                Some(v) => format!("{v:.3}{mark}"),
                None => format!("-{mark}"),
            };
            line.push_str(&format!(" {cell:>13}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    if !comparison.rows.is_empty() {
        out.push_str("\nCheapest ($/MMBtu) by month count:\n");
        for (fuel, n) in cheapest_counts(comparison) {
            out.push_str(&format!("- {:<12} {n}\n", fuel.display_name()));
        }
    }

    out
}

/// Fuels that could not be fetched or converted.
pub fn format_failures(result: &FuelComparison) -> String {
    let mut out = String::new();
    for (fuel, err) in &result.failures {
        out.push_str(&format!("! {}: {err}\n", fuel.display_name()));
    }
    out
}

pub fn format_race_makeup(makeup: &RaceMakeup) -> String {
    let mut out = String::new();
    out.push_str(&format!("Race makeup (ACS 5-year estimates), ZCTA {}\n", makeup.zcta));
    let total: f64 = makeup.entries().iter().filter_map(|(_, v)| *v).sum();
    for (label, value) in makeup.entries() {
        let line = match value {
            Some(v) if total > 0.0 => format!("{label:<44} {v:>10.0} {:>6.1}%", 100.0 * v / total),
            Some(v) => format!("{label:<44} {v:>10.0}"),
            None => format!("{label:<44} {:>10}", "n/a"),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

pub fn format_median_income(income: &MedianIncome) -> String {
    let place = income.name.as_deref().unwrap_or(&income.zcta);
    match income.dollars {
        Some(v) => format!("Median household income {} ({}): ${v:.0}\n", place, income.year),
        None => format!("Median household income {} ({}): n/a\n", place, income.year),
    }
}

fn region_label(code: &str) -> String {
    match geo::state_by_code(code) {
        Some(state) => format!("{} ({code})", state.name),
        None => code.to_string(),
    }
}

fn short_name(fuel: FuelType) -> &'static str {
    match fuel {
        FuelType::Propane => "propane",
        FuelType::NaturalGas => "natural gas",
        FuelType::Electricity => "electricity",
        FuelType::HeatingOil => "heating oil",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PriceBasis, RegionCode};
    use crate::report::compare_series;

    fn series(fuel: FuelType, points: &[(&str, f64)]) -> PriceSeries {
        let mut s = PriceSeries::new(fuel, RegionCode::parse("NY").unwrap());
        for (period, price) in points {
            s.insert(*period, *price);
        }
        s.basis = PriceBasis::PerMmbtu;
        s
    }

    #[test]
    fn series_table_snapshot() {
        let s = series(FuelType::NaturalGas, &[("2022-01", 13.378), ("2022-02", 14.0)]);
        let expected = concat!(
            "period          $/MMBtu\n",
            "---------- ------------\n",
            "2022-01          13.378\n",
            "2022-02          14.000\n",
        );
        assert_eq!(format_series_table(&s), expected);
    }

    #[test]
    fn summary_names_state_and_unit() {
        let s = series(FuelType::Electricity, &[("2022-01", 60.0), ("2022-02", 62.0)]);
        let txt = format_series_summary(&s);
        assert!(txt.contains("Fuel: Electricity (quoted in ¢/kWh)"));
        assert!(txt.contains("Region: New York (NY)"));
        assert!(txt.contains("mean=61.000 $/MMBtu"));
    }

    #[test]
    fn comparison_marks_cheapest() {
        let ng = series(FuelType::NaturalGas, &[("2022-01", 13.0)]);
        let oil = series(FuelType::HeatingOil, &[("2022-1", 30.0)]);
        let txt = format_comparison(&compare_series(&[ng, oil]));
        let row = txt.lines().nth(2).unwrap();
        assert!(row.starts_with("2022-01"));
        assert!(row.contains("13.000*"));
        assert!(row.contains("30.000"));
        assert!(!row.contains("30.000*"));
    }

    #[test]
    fn race_makeup_shows_shares() {
        let makeup = RaceMakeup {
            zcta: "22066".to_string(),
            white: Some(750.0),
            black: Some(250.0),
            american_indian: None,
            asian: Some(0.0),
            pacific_islander: Some(0.0),
            other: Some(0.0),
        };
        let txt = format_race_makeup(&makeup);
        assert!(txt.contains("75.0%"));
        assert!(txt.contains("n/a"));
    }
}
