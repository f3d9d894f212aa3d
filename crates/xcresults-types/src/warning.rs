use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// An attachment could not be resolved or decoded and was dropped.
    AttachmentUnresolved,
    /// A reference chain revisited an open record; the branch was cut.
    CycleDetected,
    /// A testable summary listed no tests.
    EmptyTestable,
    /// A test has no duration or no start anchor; start/stop are unknown.
    TimingUnknown,
    /// A timestamp did not parse; the affected timing is unknown.
    InvalidDate,
    /// An attachment payload could not be exported.
    PayloadExportFailed,
}

impl WarningKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttachmentUnresolved => "attachment_unresolved",
            Self::CycleDetected => "cycle_detected",
            Self::EmptyTestable => "empty_testable",
            Self::TimingUnknown => "timing_unknown",
            Self::InvalidDate => "invalid_date",
            Self::PayloadExportFailed => "payload_export_failed",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal finding attached to a conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    /// Rendered [`RecordPath`](crate::RecordPath) of the affected node.
    pub path: String,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
    }
}
