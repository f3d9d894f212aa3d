//! Source → target status mapping.
//!
//! The table is total over [`SourceStatus`]; text outside the closed source
//! set never reaches it and is reported as a projection failure instead.

use xcresults_error::{ConvertError, Result};
use xcresults_types::{SourceStatus, Status};

/// Fixed mapping table.
#[must_use]
pub const fn map_status(status: SourceStatus) -> Status {
    match status {
        SourceStatus::Success | SourceStatus::ExpectedFailure => Status::Passed,
        SourceStatus::Failure => Status::Failed,
        SourceStatus::Skipped => Status::Skipped,
        SourceStatus::Mixed | SourceStatus::Unknown => Status::Unknown,
    }
}

/// Parse a raw `testStatus` and map it.
///
/// A missing or unrecognized value is a `Projection` error carrying `path`.
pub fn resolve_status(raw: Option<&str>, path: &str) -> Result<Status> {
    let Some(raw) = raw else {
        return Err(ConvertError::projection(path, "test has no testStatus"));
    };
    SourceStatus::parse(raw)
        .map(map_status)
        .ok_or_else(|| ConvertError::projection(path, format!("unrecognized testStatus `{raw}`")))
}
