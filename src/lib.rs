//! `btu-prices` library crate.
//!
//! The binary (`btu`) is a thin wrapper around this library so that:
//!
//! - the fetch -> normalize -> convert pipeline is testable without network or processes
//! - the CLI and the dashboard share one code path
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod tui;
