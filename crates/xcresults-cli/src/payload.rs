//! Attachment payload export seams.

use std::path::Path;
use std::process::Command;

use xcresults_error::SourceError;
use xcresults_types::RecordId;

use crate::process::run_command;

/// Copies the payload behind `id` to `destination`.
pub trait PayloadExporter {
    fn export_payload(&mut self, id: &RecordId, destination: &Path) -> Result<(), SourceError>;
}

impl<E: PayloadExporter + ?Sized> PayloadExporter for &mut E {
    fn export_payload(&mut self, id: &RecordId, destination: &Path) -> Result<(), SourceError> {
        (**self).export_payload(id, destination)
    }
}

/// Converts an exported HEIC image to JPEG.
pub trait ImageConverter {
    fn heic_to_jpeg(&mut self, heic: &Path, jpeg: &Path) -> Result<(), SourceError>;
}

/// macOS `sips`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sips;

impl Sips {
    #[must_use]
    pub fn command(heic: &Path, jpeg: &Path) -> Command {
        let mut command = Command::new("sips");
        command
            .args(["-s", "format", "jpeg"])
            .arg(heic)
            .arg("--out")
            .arg(jpeg);
        command
    }
}

impl ImageConverter for Sips {
    fn heic_to_jpeg(&mut self, heic: &Path, jpeg: &Path) -> Result<(), SourceError> {
        run_command(&mut Self::command(heic, jpeg)).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    #[test]
    fn sips_command_shape() {
        let command = Sips::command(Path::new("/o/a.heic"), Path::new("/o/a.jpeg"));
        assert_eq!(command.get_program(), OsStr::new("sips"));
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(
            args,
            ["-s", "format", "jpeg", "/o/a.heic", "--out", "/o/a.jpeg"].map(OsStr::new)
        );
    }
}
