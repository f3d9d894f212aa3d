use std::process::Command;

use tracing::debug;
use xcresults_error::SourceError;

/// Run `command` to completion and return its stdout.
///
/// A non-zero exit becomes [`SourceError::Command`] carrying trimmed stderr.
pub fn run_command(command: &mut Command) -> Result<Vec<u8>, SourceError> {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!(
        program = %program,
        args = ?command.get_args().collect::<Vec<_>>(),
        "running external command"
    );
    let output = command.output()?;
    if output.status.success() {
        return Ok(output.stdout);
    }
    Err(SourceError::Command {
        program,
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    })
}
