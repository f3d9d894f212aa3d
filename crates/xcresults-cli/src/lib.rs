//! `xcresults` command line: everything that touches processes or files.
//!
//! Documents come from `xcrun xcresulttool` ([`xcrun::Xcresulttool`]) or a
//! directory of pre-dumped JSON ([`json_dir::DirectorySource`]); the core
//! crate turns them into a [`xcresults_types::Conversion`] and
//! [`emit::ReportWriter`] lays it out as an Allure results directory.

pub mod config;
pub mod emit;
pub mod error;
pub mod export;
pub mod json_dir;
pub mod logging;
pub mod payload;
mod process;
pub mod xcrun;

pub use config::{Command, ExportConfig, HELP, LegacyMode, SourceKind, parse_args};
pub use emit::{ExportSummary, ReportWriter, format_summary};
pub use error::CliError;
pub use export::{export_with, run_export};
pub use json_dir::DirectorySource;
pub use payload::{ImageConverter, PayloadExporter, Sips};
pub use xcrun::Xcresulttool;
