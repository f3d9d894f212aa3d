//! Error taxonomy shared by every xcresults crate.
//!
//! Conversion errors are always fatal: the pipeline aborts and no report is
//! produced. Recoverable problems (a missing attachment, unknown timing) are
//! not errors at all; they travel as warnings next to the projected report.

use std::fmt;
use std::io;

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T, E = ConvertError> = std::result::Result<T, E>;

/// Coarse classification of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Resolution,
    Projection,
    MalformedBundle,
    Io,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolution => "resolution",
            Self::Projection => "projection",
            Self::MalformedBundle => "malformed_bundle",
            Self::Io => "io",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// A fatal conversion failure.
///
/// `path` renders the chain of fields and record identifiers that led to the
/// offending record, e.g. `root > actions[0] > testsRef(0~ab12) > summaries[0]`.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A referenced record could not be retrieved or decoded.
    #[error("cannot resolve record {id} at {path}: {reason}")]
    Resolution {
        id: String,
        path: String,
        reason: String,
    },

    /// A resolved record cannot be mapped onto the report model.
    #[error("cannot project record at {path}: {reason}")]
    Projection { path: String, reason: String },

    /// A record lacks the fields needed to traverse it at all.
    #[error("malformed bundle at {path}: {reason}")]
    MalformedBundle { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    pub fn resolution(
        id: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            id: id.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn projection(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Projection {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedBundle {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolution { .. } => ErrorKind::Resolution,
            Self::Projection { .. } => ErrorKind::Projection,
            Self::MalformedBundle { .. } => ErrorKind::MalformedBundle,
            Self::Io(_) | Self::Json(_) => ErrorKind::Io,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The record path carried by the error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Resolution { path, .. }
            | Self::Projection { path, .. }
            | Self::MalformedBundle { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Failure reported by a document-retrieval collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The collaborator has no document for the identifier.
    #[error("no document for id {id}")]
    NotFound { id: String },

    /// The collaborator returned content that is not a JSON document.
    #[error("malformed document for id {id}: {detail}")]
    Malformed { id: String, detail: String },

    /// An external command exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SourceError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn malformed(id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Malformed {
            id: id.into(),
            detail: detail.into(),
        }
    }
}
