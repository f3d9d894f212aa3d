//! Allure results directory writer.
//!
//! Runs only after a successful conversion: cleans (or creates) the output
//! directory, exports attachment payloads, then writes one JSON file per
//! result and per container.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use xcresults_types::{Attachment, Conversion, Warning, WarningKind};

use crate::error::CliError;
use crate::payload::{ImageConverter, PayloadExporter};

pub const RESULT_SUFFIX: &str = "-result.json";
pub const CONTAINER_SUFFIX: &str = "-container.json";
const HEIC_EXTENSION: &str = "heic";
const JPEG_EXTENSION: &str = "jpeg";
const JPEG_MEDIA_TYPE: &str = "image/jpeg";

// ── Public types ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReportWriter {
    output: PathBuf,
    keep_output: bool,
    convert_heic: bool,
}

/// What a finished export produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub output: String,
    pub results: usize,
    pub containers: usize,
    pub attachments: usize,
    pub attachments_exported: usize,
    /// Conversion warnings followed by export warnings.
    pub warnings: Vec<Warning>,
}

// ── Writer ───────────────────────────────────────────────────────────

impl ReportWriter {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            keep_output: false,
            convert_heic: false,
        }
    }

    #[must_use]
    pub fn keep_output(mut self, keep: bool) -> Self {
        self.keep_output = keep;
        self
    }

    #[must_use]
    pub fn convert_heic(mut self, enabled: bool) -> Self {
        self.convert_heic = enabled;
        self
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Empty the output directory (unless keeping it) and make sure it exists.
    pub fn prepare(&self) -> Result<(), CliError> {
        if !self.keep_output && self.output.exists() {
            info!(output = %self.output.display(), "cleaning output directory");
            fs::remove_dir_all(&self.output).map_err(|err| CliError::io(&self.output, err))?;
        }
        fs::create_dir_all(&self.output).map_err(|err| CliError::io(&self.output, err))
    }

    pub fn write<E, C>(
        &self,
        mut conversion: Conversion,
        exporter: &mut E,
        converter: &mut C,
    ) -> Result<ExportSummary, CliError>
    where
        E: PayloadExporter + ?Sized,
        C: ImageConverter + ?Sized,
    {
        self.prepare()?;

        let mut warnings = std::mem::take(&mut conversion.warnings);
        let mut exported = 0;
        for result in &mut conversion.results {
            let uuid = result.uuid.clone();
            result.for_each_attachment_mut(|attachment| {
                match self.export_attachment(attachment, exporter, converter) {
                    Ok(heic_warning) => {
                        exported += 1;
                        warnings.extend(heic_warning.map(|message| {
                            export_warning(&uuid, attachment, message)
                        }));
                    }
                    Err(message) => warnings.push(export_warning(&uuid, attachment, message)),
                }
            });
        }

        for result in &conversion.results {
            self.write_json(&format!("{}{RESULT_SUFFIX}", result.uuid), result, "result")?;
        }
        for container in &conversion.containers {
            self.write_json(
                &format!("{}{CONTAINER_SUFFIX}", container.uuid),
                container,
                "container",
            )?;
        }

        let summary = ExportSummary {
            output: self.output.display().to_string(),
            results: conversion.results.len(),
            containers: conversion.containers.len(),
            attachments: conversion.attachment_count(),
            attachments_exported: exported,
            warnings,
        };
        info!(
            results = summary.results,
            containers = summary.containers,
            attachments = summary.attachments_exported,
            warnings = summary.warnings.len(),
            "report written"
        );
        Ok(summary)
    }

    /// `Ok(Some(_))` means the payload landed but HEIC conversion did not.
    fn export_attachment<E, C>(
        &self,
        attachment: &mut Attachment,
        exporter: &mut E,
        converter: &mut C,
    ) -> Result<Option<String>, String>
    where
        E: PayloadExporter + ?Sized,
        C: ImageConverter + ?Sized,
    {
        let destination = self.output.join(&attachment.source);
        exporter
            .export_payload(&attachment.payload, &destination)
            .map_err(|err| format!("payload {} not exported: {err}", attachment.payload))?;

        if !self.convert_heic || !is_heic(&attachment.source) {
            return Ok(None);
        }
        let jpeg_source = Path::new(&attachment.source)
            .with_extension(JPEG_EXTENSION)
            .to_string_lossy()
            .into_owned();
        let jpeg = self.output.join(&jpeg_source);
        if let Err(err) = converter.heic_to_jpeg(&destination, &jpeg) {
            return Ok(Some(format!("HEIC conversion failed, kept original: {err}")));
        }
        if let Err(err) = fs::remove_file(&destination) {
            warn!(path = %destination.display(), error = %err, "cannot remove converted HEIC file");
        }
        attachment.source = jpeg_source;
        JPEG_MEDIA_TYPE.clone_into(&mut attachment.media_type);
        Ok(None)
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T, what: &str) -> Result<(), CliError> {
        let path = self.output.join(file_name);
        let json = serde_json::to_vec_pretty(value).map_err(|source| CliError::Serialize {
            what: format!("{what} {file_name}"),
            source,
        })?;
        fs::write(&path, json).map_err(|err| CliError::io(&path, err))
    }
}

// ── Summary ──────────────────────────────────────────────────────────

#[must_use]
pub fn format_summary(summary: &ExportSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Allure Export ===");
    let _ = writeln!(out, "  Output: {}", summary.output);
    let _ = writeln!(out, "  Results: {}", summary.results);
    let _ = writeln!(out, "  Containers: {}", summary.containers);
    let _ = writeln!(
        out,
        "  Attachments: {}/{} exported",
        summary.attachments_exported, summary.attachments
    );
    let _ = writeln!(out, "  Warnings: {}", summary.warnings.len());
    for warning in &summary.warnings {
        let _ = writeln!(
            out,
            "    [{}] {}: {}",
            warning.kind, warning.path, warning.message
        );
    }
    out
}

// ── Helpers ──────────────────────────────────────────────────────────

fn is_heic(source: &str) -> bool {
    Path::new(source)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(HEIC_EXTENSION))
}

fn export_warning(result_uuid: &str, attachment: &Attachment, message: String) -> Warning {
    let path = format!("result({result_uuid}) > attachment({})", attachment.name);
    warn!(path = %path, message = %message, "attachment export warning");
    Warning::new(WarningKind::PayloadExportFailed, path, message)
}

// ── Tests ────────────────────────────────────────────────────────────
