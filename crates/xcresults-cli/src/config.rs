//! Export configuration and argument parsing.

use std::path::{Path, PathBuf};

use crate::error::CliError;

pub const HELP: &str = "\
xcresults - export an Xcode result bundle as Allure 2 results

USAGE:
    xcresults export <INPUT> <OUTPUT> [OPTIONS]

ARGS:
    <INPUT>                    .xcresult bundle (or document directory with --source json-dir)
    <OUTPUT>                   Allure results directory

OPTIONS:
    --source <KIND>            Document source: xcresulttool|json-dir (default: xcresulttool)
    --legacy <MODE>            Pass --legacy to xcresulttool: auto|on|off (default: auto)
    --keep-output              Do not clean the output directory before writing
    --convert-heic             Convert exported .heic attachments to JPEG with sips
    --json                     Print the export summary as JSON
    --log-json                 Emit logs as JSON lines on stderr
    -h, --help                 Show this help

ENVIRONMENT:
    RUST_LOG                   Log filter (default: info)

EXIT CODES:
    0 success, 1 conversion or export failure, 2 usage error
";

/// Where record documents come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    /// `xcrun xcresulttool get` against a `.xcresult` bundle.
    #[default]
    Xcresulttool,
    /// `root.json` + `<id>.json` documents in a plain directory.
    JsonDir,
}

impl SourceKind {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "xcresulttool" => Some(Self::Xcresulttool),
            "json-dir" => Some(Self::JsonDir),
            _ => None,
        }
    }
}

/// Whether `xcresulttool` calls carry `--legacy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegacyMode {
    /// Decide from the installed Xcode version.
    #[default]
    Auto,
    On,
    Off,
}

impl LegacyMode {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "auto" => Some(Self::Auto),
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub source: SourceKind,
    pub legacy: LegacyMode,
    pub keep_output: bool,
    pub convert_heic: bool,
    pub json_summary: bool,
    pub log_json: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::from("allure-results"),
            source: SourceKind::default(),
            legacy: LegacyMode::default(),
            keep_output: false,
            convert_heic: false,
            json_summary: false,
            log_json: false,
        }
    }
}

impl ExportConfig {
    /// Refuse an OUTPUT that is INPUT or one of its ancestors when OUTPUT is
    /// going to be cleaned. Paths are compared absolute, with symlinks
    /// resolved as far as they exist.
    pub fn check_paths(&self) -> Result<(), CliError> {
        if self.keep_output {
            return Ok(());
        }
        let input = resolve_path(&self.input);
        let output = resolve_path(&self.output);
        if input.starts_with(&output) {
            return Err(CliError::usage(format!(
                "<OUTPUT> {} would be cleaned but contains <INPUT> {}",
                output.display(),
                input.display()
            )));
        }
        Ok(())
    }
}

/// Canonical form of the longest existing prefix of `path`, with the
/// remaining components appended.
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |resolved, part| resolved.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Export(ExportConfig),
    Help,
}

/// Parse arguments (without the program name).
pub fn parse_args(args: &[String]) -> Result<Command, CliError> {
    let Some(subcommand) = args.first() else {
        return Err(CliError::usage("missing subcommand (expected `export`)"));
    };
    match subcommand.as_str() {
        "-h" | "--help" | "help" => return Ok(Command::Help),
        "export" => {}
        other => return Err(CliError::usage(format!("unknown subcommand: {other}"))),
    }

    let mut config = ExportConfig::default();
    let mut positional = Vec::new();
    let mut index = 1;
    while index < args.len() {
        match args[index].as_str() {
            "--source" => {
                let value = option_value(args, &mut index, "--source")?;
                config.source = SourceKind::parse(value).ok_or_else(|| {
                    CliError::usage(format!(
                        "invalid --source value: {value} (expected xcresulttool|json-dir)"
                    ))
                })?;
            }
            "--legacy" => {
                let value = option_value(args, &mut index, "--legacy")?;
                config.legacy = LegacyMode::parse(value).ok_or_else(|| {
                    CliError::usage(format!("invalid --legacy value: {value} (expected auto|on|off)"))
                })?;
            }
            "--keep-output" => config.keep_output = true,
            "--convert-heic" => config.convert_heic = true,
            "--json" => config.json_summary = true,
            "--log-json" => config.log_json = true,
            "-h" | "--help" => return Ok(Command::Help),
            unknown if unknown.starts_with('-') => {
                return Err(CliError::usage(format!("unknown option: {unknown}")));
            }
            value => positional.push(PathBuf::from(value)),
        }
        index += 1;
    }

    let mut positional = positional.into_iter();
    match (positional.next(), positional.next(), positional.next()) {
        (Some(input), Some(output), None) => {
            config.input = input;
            config.output = output;
        }
        (None, _, _) => return Err(CliError::usage("missing <INPUT> path")),
        (Some(_), None, _) => return Err(CliError::usage("missing <OUTPUT> path")),
        (_, _, Some(extra)) => {
            return Err(CliError::usage(format!(
                "unexpected argument: {}",
                extra.display()
            )));
        }
    }
    if config.input == config.output {
        return Err(CliError::usage("<OUTPUT> must differ from <INPUT>"));
    }
    config.check_paths()?;
    Ok(Command::Export(config))
}

fn option_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str, CliError> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| CliError::usage(format!("{flag} requires a value")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| (*arg).to_owned()).collect()
    }

    fn export(raw: &[&str]) -> ExportConfig {
        match parse_args(&args(raw)).unwrap() {
            Command::Export(config) => config,
            Command::Help => panic!("expected export"),
        }
    }

    #[test]
    fn parses_positional_paths_with_defaults() {
        let config = export(&["export", "Run.xcresult", "out"]);
        assert_eq!(config.input, PathBuf::from("Run.xcresult"));
        assert_eq!(config.output, PathBuf::from("out"));
        assert_eq!(config.source, SourceKind::Xcresulttool);
        assert_eq!(config.legacy, LegacyMode::Auto);
        assert!(!config.keep_output);
    }

    #[test]
    fn parses_every_flag() {
        let config = export(&[
            "export",
            "--source",
            "json-dir",
            "docs",
            "--legacy",
            "on",
            "out",
            "--keep-output",
            "--convert-heic",
            "--json",
            "--log-json",
        ]);
        assert_eq!(config.source, SourceKind::JsonDir);
        assert_eq!(config.legacy, LegacyMode::On);
        assert!(config.keep_output && config.convert_heic);
        assert!(config.json_summary && config.log_json);
        assert_eq!(config.input, PathBuf::from("docs"));
    }

    #[test]
    fn help_wins_anywhere() {
        assert_eq!(parse_args(&args(&["--help"])).unwrap(), Command::Help);
        assert_eq!(parse_args(&args(&["export", "a", "-h"])).unwrap(), Command::Help);
    }

    #[test]
    fn output_containing_input_is_refused_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        let input = output.join("Run.xcresult");
        std::fs::create_dir_all(&input).unwrap();
        let (input, output) = (input.display().to_string(), output.display().to_string());

        let err = parse_args(&args(&["export", &input, &output])).unwrap_err();
        assert_eq!(err.exit_code(), 2, "{err}");
        assert!(err.to_string().contains("contains <INPUT>"));

        let kept = export(&["export", &input, &output, "--keep-output"]);
        assert!(kept.keep_output);
    }

    #[test]
    fn sibling_and_missing_outputs_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Run.xcresult");
        std::fs::create_dir(&input).unwrap();
        let output = dir.path().join("not-yet").join("allure-results");
        let (input, output) = (input.display().to_string(), output.display().to_string());

        let config = export(&["export", &input, &output]);
        assert!(config.check_paths().is_ok());
    }

    #[test]
    fn resolve_path_follows_existing_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_path(&dir.path().join("a").join("b"));
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("a").join("b"));
    }

    #[test]
    fn usage_errors_exit_with_two() {
        let cases: [&[&str]; 8] = [
            &[],
            &["import", "a", "b"],
            &["export", "a"],
            &["export", "a", "b", "c"],
            &["export", "a", "b", "--source"],
            &["export", "a", "b", "--legacy", "maybe"],
            &["export", "a", "b", "--verbose"],
            &["export", "same", "same"],
        ];
        for raw in cases {
            let err = parse_args(&args(raw)).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{raw:?}: {err}");
        }
    }
}
