//! The `export` command: convert, then write the report.

use tracing::{error, info};
use xcresults_core::{DocumentSource, convert};

use crate::config::{ExportConfig, SourceKind};
use crate::emit::{ExportSummary, ReportWriter};
use crate::error::CliError;
use crate::json_dir::DirectorySource;
use crate::payload::{ImageConverter, PayloadExporter, Sips};
use crate::xcrun::Xcresulttool;

/// Run an export with the source named by `config.source` and `sips` for
/// HEIC conversion.
pub fn run_export(config: &ExportConfig) -> Result<ExportSummary, CliError> {
    match config.source {
        SourceKind::Xcresulttool => {
            let mut tool = Xcresulttool::with_mode(&config.input, config.legacy);
            export_with(&mut tool, config, &mut Sips)
        }
        SourceKind::JsonDir => {
            let mut directory = DirectorySource::open(&config.input).map_err(|err| {
                CliError::source_failure(format!("cannot open {}", config.input.display()), err)
            })?;
            export_with(&mut directory, config, &mut Sips)
        }
    }
}

/// Convert through `source`; the output directory is touched only when the
/// paths pass [`ExportConfig::check_paths`] and the conversion succeeds.
pub fn export_with<S, C>(
    source: &mut S,
    config: &ExportConfig,
    converter: &mut C,
) -> Result<ExportSummary, CliError>
where
    S: DocumentSource + PayloadExporter,
    C: ImageConverter + ?Sized,
{
    config.check_paths()?;
    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        "exporting bundle"
    );
    let conversion = convert(&mut *source).inspect_err(|err| {
        error!(kind = %err.kind(), error = %err, "conversion failed; output left untouched");
    })?;
    ReportWriter::new(&config.output)
        .keep_output(config.keep_output)
        .convert_heic(config.convert_heic)
        .write(conversion, source, converter)
}
