//! Offline source: pre-dumped documents in a plain directory.
//!
//! Layout:
//!
//! ```text
//! <dir>/root.json          root ActionsInvocationRecord
//! <dir>/<id>.json          one document per referenced identifier
//! <dir>/payloads/<id>      raw attachment payloads
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use xcresults_core::DocumentSource;
use xcresults_error::SourceError;
use xcresults_types::RecordId;

use crate::payload::PayloadExporter;

pub const ROOT_FILE: &str = "root.json";
pub const PAYLOAD_DIR: &str = "payloads";

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Fails when `root` is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SourceError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", root.display()),
            )));
        }
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn document_path(&self, id: Option<&RecordId>) -> PathBuf {
        match id {
            None => self.root.join(ROOT_FILE),
            Some(id) => self.root.join(format!("{}.json", id.as_str())),
        }
    }

    #[must_use]
    pub fn payload_path(&self, id: &RecordId) -> PathBuf {
        self.root.join(PAYLOAD_DIR).join(id.as_str())
    }
}

/// Identifiers become file names; anything that could leave the directory is
/// treated as absent.
fn is_plain_file_name(id: &RecordId) -> bool {
    let raw = id.as_str();
    !raw.contains(['/', '\\']) && raw != "." && raw != ".."
}

fn not_found_or_io(err: io::Error, id: &str) -> SourceError {
    if err.kind() == io::ErrorKind::NotFound {
        SourceError::not_found(id)
    } else {
        SourceError::Io(err)
    }
}

impl DocumentSource for DirectorySource {
    fn fetch(&mut self, id: Option<&RecordId>) -> Result<Value, SourceError> {
        let label = id.map_or("<root>", RecordId::as_str);
        if id.is_some_and(|id| !is_plain_file_name(id)) {
            return Err(SourceError::not_found(label));
        }
        let path = self.document_path(id);
        let bytes = fs::read(&path).map_err(|err| not_found_or_io(err, label))?;
        debug!(id = label, path = %path.display(), "read document");
        serde_json::from_slice(&bytes).map_err(|err| SourceError::malformed(label, err.to_string()))
    }
}

impl PayloadExporter for DirectorySource {
    fn export_payload(&mut self, id: &RecordId, destination: &Path) -> Result<(), SourceError> {
        if !is_plain_file_name(id) {
            return Err(SourceError::not_found(id.as_str()));
        }
        fs::copy(self.payload_path(id), destination)
            .map(drop)
            .map_err(|err| not_found_or_io(err, id.as_str()))
    }
}
