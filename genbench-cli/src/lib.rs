//! The `genbench` command-line application
//!
//! [`driver::BenchmarkDriver`] owns the serial benchmark loop; the
//! [`commands`] module maps each subcommand onto it and onto the report
//! generator. The binary in `main.rs` only parses arguments, sets up
//! logging and turns a [`commands::Completion`] into an exit status.

pub mod cli;
pub mod commands;
pub mod driver;

pub use commands::Completion;
pub use driver::{BenchmarkDriver, DriverOptions, RunOutcome};
