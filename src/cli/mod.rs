//! Command-line parsing for the EIA energy price tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fetch/normalize/convert code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::FuelType;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "btu", version, about = "Residential energy prices per MMBtu (EIA + Census)")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one fuel for one state and print its monthly price per MMBtu.
    Price(PriceArgs),
    /// Fetch all four fuels for one state and print them side by side.
    Compare(CompareArgs),
    /// Normalize and convert a saved EIA payload (JSON or CSV) offline.
    Convert(ConvertArgs),
    /// Plot a previously exported series JSON.
    Plot(PlotArgs),
    /// Census ACS lookups by ZIP code tabulation area.
    Census(CensusArgs),
    /// Launch the interactive dashboard.
    Tui(TuiArgs),
}

/// Options for a single-fuel fetch.
#[derive(Debug, Args, Clone)]
pub struct PriceArgs {
    /// Fuel to fetch.
    #[arg(short = 'f', long, value_enum)]
    pub fuel: FuelType,

    /// Two-letter state postal code.
    #[arg(short = 's', long, default_value = "NY")]
    pub state: String,

    /// First day of the range (inclusive), YYYY-MM-DD.
    #[arg(long, default_value = "2022-01-01")]
    pub start: NaiveDate,

    /// End of the range (exclusive), YYYY-MM-DD.
    #[arg(long, default_value = "2023-01-01")]
    pub end: NaiveDate,

    /// Render an ASCII plot below the table.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the converted series to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the converted series to JSON (readable by `btu plot`).
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

/// Options for the all-fuel comparison.
#[derive(Debug, Args, Clone)]
pub struct CompareArgs {
    /// Two-letter state postal code.
    #[arg(short = 's', long, default_value = "NY")]
    pub state: String,

    /// First day of the range (inclusive), YYYY-MM-DD.
    #[arg(long, default_value = "2022-01-01")]
    pub start: NaiveDate,

    /// End of the range (exclusive), YYYY-MM-DD.
    #[arg(long, default_value = "2023-01-01")]
    pub end: NaiveDate,

    /// Render an ASCII plot of every fuel.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export every converted series to one CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

/// Options for offline conversion.
#[derive(Debug, Args, Clone)]
pub struct ConvertArgs {
    /// Saved EIA response body (.json) or period/value table (.csv).
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: PathBuf,

    /// Fuel the payload belongs to.
    #[arg(short = 'f', long, value_enum)]
    pub fuel: FuelType,

    /// Two-letter state postal code to tag the series with.
    #[arg(short = 's', long, default_value = "NY")]
    pub state: String,

    /// Write the converted series to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

/// Options for plotting a saved series.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Series JSON file(s) produced by `--export-json`.
    #[arg(long = "series", value_name = "JSON", required = true)]
    pub series: Vec<PathBuf>,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args)]
pub struct CensusArgs {
    #[command(subcommand)]
    pub query: CensusQuery,
}

#[derive(Debug, Subcommand)]
pub enum CensusQuery {
    /// Race makeup (ACS 5-year profile, 2021).
    Race {
        /// ZIP code tabulation area, e.g. 22066.
        #[arg(long)]
        zcta: String,
    },
    /// Median household income (ACS 5-year subject table).
    Income {
        /// ZIP code tabulation area, e.g. 22066.
        #[arg(long)]
        zcta: String,

        /// Survey year.
        #[arg(long, default_value_t = 2021)]
        year: u16,
    },
    /// Every variable of an ACS 5-year table for every ZCTA, written to CSV.
    Group(GroupArgs),
}

/// Options for an ACS group-table export.
#[derive(Debug, Args, Clone)]
pub struct GroupArgs {
    /// Table id: a data profile (`DP05`) or a subject table (`S1901`).
    #[arg(short = 't', long)]
    pub table: String,

    /// Survey year.
    #[arg(long, default_value_t = 2019)]
    pub year: u16,

    /// State postal code; required for profile tables.
    #[arg(short = 's', long)]
    pub state: Option<String>,

    /// Output CSV (default `acs5-<survey>-group-<table>-zcta[-state-<fips>].csv`).
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

/// Options for the dashboard.
#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    /// Initial state postal code.
    #[arg(short = 's', long, default_value = "NY")]
    pub state: String,

    /// Initial fuel (all fuels when omitted).
    #[arg(short = 'f', long, value_enum)]
    pub fuel: Option<FuelType>,

    /// First year shown.
    #[arg(long, default_value_t = 2022)]
    pub start_year: i32,

    /// Last year shown (inclusive).
    #[arg(long, default_value_t = 2022)]
    pub end_year: i32,
}
