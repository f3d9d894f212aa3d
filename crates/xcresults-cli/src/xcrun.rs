//! `xcrun xcresulttool` as the document source and payload exporter.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tracing::{debug, info};
use xcresults_core::DocumentSource;
use xcresults_error::SourceError;
use xcresults_types::RecordId;

use crate::config::LegacyMode;
use crate::payload::PayloadExporter;
use crate::process::run_command;

/// Xcode release that started requiring `--legacy` for the JSON object graph.
pub const LEGACY_FROM_MAJOR: u32 = 16;

const ROOT_ID: &str = "<root>";

/// Reads records out of a `.xcresult` bundle through `xcresulttool`.
#[derive(Debug, Clone)]
pub struct Xcresulttool {
    bundle: PathBuf,
    legacy: bool,
}

impl Xcresulttool {
    /// `bundle` is made absolute so commands are independent of the working
    /// directory.
    pub fn new(bundle: impl Into<PathBuf>, legacy: bool) -> Self {
        let bundle = bundle.into();
        let bundle = std::path::absolute(&bundle).unwrap_or(bundle);
        Self { bundle, legacy }
    }

    /// Resolve [`LegacyMode::Auto`] against the installed Xcode.
    pub fn with_mode(bundle: impl Into<PathBuf>, mode: LegacyMode) -> Self {
        let legacy = match mode {
            LegacyMode::On => true,
            LegacyMode::Off => false,
            LegacyMode::Auto => detect_legacy(),
        };
        info!(legacy, ?mode, "xcresulttool mode selected");
        Self::new(bundle, legacy)
    }

    #[must_use]
    pub fn bundle(&self) -> &Path {
        &self.bundle
    }

    #[must_use]
    pub fn legacy(&self) -> bool {
        self.legacy
    }

    /// `xcrun xcresulttool get --format json --path <bundle> [--id <id>] [--legacy]`
    #[must_use]
    pub fn get_command(&self, id: Option<&RecordId>) -> Command {
        let mut command = Command::new("xcrun");
        command
            .args(["xcresulttool", "get", "--format", "json", "--path"])
            .arg(&self.bundle);
        if let Some(id) = id {
            command.args(["--id", id.as_str()]);
        }
        if self.legacy {
            command.arg("--legacy");
        }
        command
    }

    /// `xcrun xcresulttool export --type file --path <bundle> --id <id> --output-path <dest> [--legacy]`
    #[must_use]
    pub fn export_command(&self, id: &RecordId, destination: &Path) -> Command {
        let mut command = Command::new("xcrun");
        command
            .args(["xcresulttool", "export", "--type", "file", "--path"])
            .arg(&self.bundle)
            .args(["--id", id.as_str(), "--output-path"])
            .arg(destination);
        if self.legacy {
            command.arg("--legacy");
        }
        command
    }
}

impl DocumentSource for Xcresulttool {
    fn fetch(&mut self, id: Option<&RecordId>) -> Result<Value, SourceError> {
        let stdout = run_command(&mut self.get_command(id))?;
        let label = id.map_or(ROOT_ID, RecordId::as_str);
        debug!(id = label, bytes = stdout.len(), "fetched document");
        serde_json::from_slice(&stdout).map_err(|err| SourceError::malformed(label, err.to_string()))
    }
}

impl PayloadExporter for Xcresulttool {
    fn export_payload(&mut self, id: &RecordId, destination: &Path) -> Result<(), SourceError> {
        run_command(&mut self.export_command(id, destination)).map(drop)
    }
}

/// Major version from `xcodebuild -version` output (`Xcode 16.0\nBuild version ...`).
#[must_use]
pub fn parse_xcode_major(output: &str) -> Option<u32> {
    let version = output.lines().next()?.trim().strip_prefix("Xcode")?.trim();
    version.split('.').next()?.parse().ok()
}

/// True when the installed Xcode needs `--legacy`. Any detection failure
/// reads as an older Xcode.
#[must_use]
pub fn detect_legacy() -> bool {
    let mut command = Command::new("xcodebuild");
    command.arg("-version");
    match run_command(&mut command) {
        Ok(stdout) => {
            let text = String::from_utf8_lossy(&stdout);
            let major = parse_xcode_major(&text);
            debug!(?major, "detected Xcode version");
            major.is_some_and(|major| major >= LEGACY_FROM_MAJOR)
        }
        Err(err) => {
            debug!(error = %err, "xcodebuild -version failed; assuming no --legacy");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    fn args(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn parses_xcode_major_versions() {
        assert_eq!(parse_xcode_major("Xcode 16.0\nBuild version 16A242d\n"), Some(16));
        assert_eq!(parse_xcode_major("Xcode 15.4"), Some(15));
        assert_eq!(parse_xcode_major("Xcode 26"), Some(26));
        assert_eq!(parse_xcode_major("Command line tools"), None);
        assert_eq!(parse_xcode_major(""), None);
        assert_eq!(parse_xcode_major("Xcode beta"), None);
    }

    #[test]
    fn get_command_for_root_and_ids() {
        let tool = Xcresulttool::new("/tmp/Run.xcresult", false);
        let root = tool.get_command(None);
        assert_eq!(root.get_program(), OsStr::new("xcrun"));
        assert_eq!(
            args(&root),
            ["xcresulttool", "get", "--format", "json", "--path", "/tmp/Run.xcresult"]
        );

        let legacy = Xcresulttool::new("/tmp/Run.xcresult", true);
        let id = RecordId::new("0~abc").unwrap();
        assert_eq!(
            args(&legacy.get_command(Some(&id))),
            [
                "xcresulttool",
                "get",
                "--format",
                "json",
                "--path",
                "/tmp/Run.xcresult",
                "--id",
                "0~abc",
                "--legacy"
            ]
        );
    }

    #[test]
    fn export_command_shape() {
        let tool = Xcresulttool::new("/tmp/Run.xcresult", true);
        let id = RecordId::new("0~payload").unwrap();
        let command = tool.export_command(&id, Path::new("/out/x-attachment.png"));
        assert_eq!(
            args(&command),
            [
                "xcresulttool",
                "export",
                "--type",
                "file",
                "--path",
                "/tmp/Run.xcresult",
                "--id",
                "0~payload",
                "--output-path",
                "/out/x-attachment.png",
                "--legacy"
            ]
        );
    }

    #[test]
    fn explicit_modes_skip_detection() {
        assert!(Xcresulttool::with_mode("/tmp/a.xcresult", LegacyMode::On).legacy());
        assert!(!Xcresulttool::with_mode("/tmp/a.xcresult", LegacyMode::Off).legacy());
    }

    #[test]
    fn relative_bundle_is_made_absolute() {
        let tool = Xcresulttool::new("Run.xcresult", false);
        assert!(tool.bundle().is_absolute());
        assert!(tool.bundle().ends_with("Run.xcresult"));
    }
}
