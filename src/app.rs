//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - fetches EIA / Census data
//! - converts prices to $/MMBtu
//! - prints reports/plots
//! - writes optional exports

use std::path::{Path, PathBuf};

use clap::Parser;
use log::LevelFilter;

use crate::cli::{CensusArgs, CensusQuery, Command, CompareArgs, ConvertArgs, GroupArgs, PlotArgs, PriceArgs};
use crate::data::census::AcsSurvey;
use crate::data::eia::payload_from_body;
use crate::data::{CensusClient, EiaClient, normalize, price_per_btu};
use crate::domain::geo::{State, state_by_code};
use crate::domain::{ConversionTable, PriceSeries, RegionCode};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `btu` binary.
pub fn run() -> Result<(), AppError> {
    // We want `btu` and `btu -s MA` to behave like `btu tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let is_tui = matches!(cli.command, Command::Tui(_));
    init_logging(cli.verbose, is_tui);

    match cli.command {
        Command::Price(args) => handle_price(args),
        Command::Compare(args) => handle_compare(args),
        Command::Convert(args) => handle_convert(args),
        Command::Plot(args) => handle_plot(args),
        Command::Census(args) => handle_census(args),
        Command::Tui(args) => crate::tui::run(args),
    }
}

/// Log to stderr, filtered by `RUST_LOG` when set, else by `-v`.
///
/// The dashboard owns the terminal, so it stays silent unless `RUST_LOG` asks
/// otherwise.
fn init_logging(verbose: u8, is_tui: bool) {
    let level = match (is_tui, verbose) {
        (true, _) => LevelFilter::Off,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, _) => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

fn handle_price(args: PriceArgs) -> Result<(), AppError> {
    let region = RegionCode::parse(&args.state)?;
    let eia = EiaClient::from_env()?;
    let table = ConversionTable::standard();

    let series = pipeline::monthly_price_per_btu(&eia, &table, args.fuel, &region, args.start, args.end)?;

    print!("{}", crate::report::format_series_summary(&series));
    println!("{}", crate::report::format_series_table(&series));

    if args.plot {
        println!(
            "{}",
            crate::plot::render_ascii_plot(std::slice::from_ref(&series), args.width, args.height)
        );
    }

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::write_series_csv(path, std::slice::from_ref(&series))?;
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &args.export_json {
        crate::io::write_series_json(path, &series)?;
        log::info!("wrote {}", path.display());
    }

    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let region = RegionCode::parse(&args.state)?;
    if args.end < args.start {
        return Err(AppError::unsupported(format!(
            "End date {} is before start date {}.",
            args.end, args.start
        )));
    }
    let eia = EiaClient::from_env()?;
    let table = ConversionTable::standard();

    let result = pipeline::compare_fuels(&eia, &table, &region, args.start, args.end);

    println!("=== btu - fuel comparison for {region} ===");
    println!("{}", crate::report::format_comparison(&crate::report::compare_series(&result.series)));
    eprint!("{}", crate::report::format_failures(&result));

    if args.plot && !result.series.is_empty() {
        println!("{}", crate::plot::render_ascii_plot(&result.series, args.width, args.height));
    }
    if let Some(path) = &args.export {
        crate::io::write_series_csv(path, &result.series)?;
        log::info!("wrote {}", path.display());
    }

    if result.series.is_empty() {
        if let Some((_, err)) = result.failures.into_iter().next() {
            return Err(err);
        }
    }
    Ok(())
}

fn handle_convert(args: ConvertArgs) -> Result<(), AppError> {
    let region = RegionCode::parse(&args.state)?;
    let series = convert_file(&args.input, &args, &region)?;

    print!("{}", crate::report::format_series_summary(&series));
    println!("{}", crate::report::format_series_table(&series));

    if let Some(path) = &args.export_json {
        crate::io::write_series_json(path, &series)?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

/// Offline run of the normalize -> convert steps on a saved payload.
fn convert_file(path: &Path, args: &ConvertArgs, region: &RegionCode) -> Result<PriceSeries, AppError> {
    let body = crate::io::load_payload_file(path)?;
    let payload = payload_from_body(args.fuel.frequency(), body)?;
    let series = normalize(&payload, args.fuel, region)?;
    price_per_btu(series, &ConversionTable::standard())?.into_converted()
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let series = args
        .series
        .iter()
        .map(|path| crate::io::read_series_json(path))
        .collect::<Result<Vec<_>, _>>()?;

    let plot = crate::plot::render_ascii_plot(&series, args.width, args.height);
    println!("{plot}");
    Ok(())
}

fn handle_census(args: CensusArgs) -> Result<(), AppError> {
    let census = CensusClient::from_env()?;
    match args.query {
        CensusQuery::Race { zcta } => match census.race_makeup_by_zcta(&zcta)? {
            Some(makeup) => print!("{}", crate::report::format_race_makeup(&makeup)),
            None => println!("No race data for ZCTA {zcta}."),
        },
        CensusQuery::Income { zcta, year } => match census.median_income_by_zcta(&zcta, year)? {
            Some(income) => print!("{}", crate::report::format_median_income(&income)),
            None => println!("No income data for ZCTA {zcta} ({year})."),
        },
        CensusQuery::Group(args) => handle_census_group(&census, args)?,
    }
    Ok(())
}

fn handle_census_group(census: &CensusClient, args: GroupArgs) -> Result<(), AppError> {
    let survey = AcsSurvey::for_table(&args.table)?;
    let state = match &args.state {
        Some(code) => Some(
            state_by_code(&code.trim().to_ascii_uppercase())
                .ok_or_else(|| AppError::unsupported(format!("Unknown state '{code}'.")))?,
        ),
        None => None,
    };

    let Some(table) = census.group_table(&args.table, args.year, state)? else {
        println!("No ACS data for table {} ({}).", args.table, args.year);
        return Ok(());
    };

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| default_group_path(survey, &args.table, state));
    crate::io::write_census_table_csv(&path, &table)?;
    println!(
        "Wrote {} ZCTAs x {} columns to {}",
        table.rows.len(),
        table.header.len(),
        path.display()
    );
    Ok(())
}

fn default_group_path(survey: AcsSurvey, table: &str, state: Option<&State>) -> PathBuf {
    let mut name = format!("acs5-{}-group-{table}-zcta", survey.path());
    if let (AcsSurvey::Profile, Some(state)) = (survey, state) {
        name.push_str(&format!("-state-{}", state.fips));
    }
    PathBuf::from(format!("{name}.csv"))
}

/// Rewrite argv so `btu` defaults to `btu tui`.
///
/// Rules:
/// - `btu`                      -> `btu tui`
/// - `btu -s MA ...`            -> `btu tui -s MA ...`
/// - `btu --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "price" | "compare" | "convert" | "plot" | "census" | "tui"
    );
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FuelType, PriceBasis};
    use std::io::Write;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_dashboard() {
        assert_eq!(rewrite_args(argv(&["btu"])), argv(&["btu", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["btu", "-s", "MA"])),
            argv(&["btu", "tui", "-s", "MA"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(
            rewrite_args(argv(&["btu", "price", "-f", "propane"])),
            argv(&["btu", "price", "-f", "propane"])
        );
        assert_eq!(rewrite_args(argv(&["btu", "--help"])), argv(&["btu", "--help"]));
    }

    #[test]
    fn convert_file_aggregates_weekly_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"period,value\n2022-10-03,3.50\n2022-10-10,3.60\n2022-10-17,3.55\n2022-10-24,3.45\n")
            .unwrap();

        let args = ConvertArgs {
            input: file.path().to_path_buf(),
            fuel: FuelType::HeatingOil,
            state: "NY".to_string(),
            export_json: None,
        };
        let region = RegionCode::parse("NY").unwrap();
        let series = convert_file(file.path(), &args, &region).unwrap();

        assert_eq!(series.basis, PriceBasis::PerMmbtu);
        let oct = series.get("2022-10").unwrap();
        assert!((oct - 3.525 / 0.1385).abs() < 1e-9, "got {oct}");
    }

    #[test]
    fn convert_file_reads_monthly_api_body() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"response":{"data":[{"period":"2022-01","price":21.0}]}}"#)
            .unwrap();

        let args = ConvertArgs {
            input: file.path().to_path_buf(),
            fuel: FuelType::Electricity,
            state: "NY".to_string(),
            export_json: None,
        };
        let region = RegionCode::parse("NY").unwrap();
        let series = convert_file(file.path(), &args, &region).unwrap();
        let jan = series.get("2022-01").unwrap();
        assert!((jan - 21.0 / 0.341214).abs() < 1e-9, "got {jan}");
    }

    #[test]
    fn group_exports_are_named_after_survey_and_state() {
        let ny = state_by_code("NY").unwrap();
        assert_eq!(
            default_group_path(AcsSurvey::Profile, "DP05", Some(ny)),
            PathBuf::from("acs5-profile-group-DP05-zcta-state-36.csv")
        );
        assert_eq!(
            default_group_path(AcsSurvey::Subject, "S1901", Some(ny)),
            PathBuf::from("acs5-subject-group-S1901-zcta.csv")
        );
    }
}
