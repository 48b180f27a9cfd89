//! Reporting utilities: cross-fuel comparison and formatted terminal output.

use std::collections::BTreeMap;

use crate::domain::{FuelType, PriceSeries, period_key};

pub mod format;

pub use format::*;

/// One calendar month across several fuels.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub year: i32,
    pub month: u32,
    /// Price per fuel, in `Comparison::fuels` order.
    pub prices: Vec<Option<f64>>,
    /// Lowest-priced fuel reported for this month.
    pub cheapest: Option<FuelType>,
}

/// Month-aligned view of several per-MMBtu series.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub fuels: Vec<FuelType>,
    pub rows: Vec<ComparisonRow>,
}

/// Align series on (year, month).
///
/// Labels from monthly endpoints (`2022-01`) and aggregated weekly data
/// (`2022-1`) land on the same row. Unparseable labels are ignored.
pub fn compare_series(series: &[PriceSeries]) -> Comparison {
    let fuels: Vec<FuelType> = series.iter().map(|s| s.fuel).collect();
    let mut months: BTreeMap<(i32, u32), Vec<Option<f64>>> = BTreeMap::new();

    for (idx, s) in series.iter().enumerate() {
        for p in s.points() {
            let Some(key) = period_key(&p.period) else {
                log::debug!("{} {}: ignoring period label '{}'", s.fuel, s.region, p.period);
                continue;
            };
            let row = months.entry(key).or_insert_with(|| vec![None; series.len()]);
            row[idx] = Some(p.price);
        }
    }

    let rows = months
        .into_iter()
        .map(|((year, month), prices)| {
            let cheapest = prices
                .iter()
                .enumerate()
                .filter_map(|(i, p)| p.filter(|v| v.is_finite()).map(|v| (i, v)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| fuels[i]);
            ComparisonRow {
                year,
                month,
                prices,
                cheapest,
            }
        })
        .collect();

    Comparison { fuels, rows }
}

/// How often each fuel was the cheapest, most frequent first.
pub fn cheapest_counts(comparison: &Comparison) -> Vec<(FuelType, usize)> {
    let mut counts: Vec<(FuelType, usize)> = comparison
        .fuels
        .iter()
        .map(|&fuel| {
            let n = comparison.rows.iter().filter(|r| r.cheapest == Some(fuel)).count();
            (fuel, n)
        })
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
