use std::path::PathBuf;

use thiserror::Error;

use crate::process::ExitKind;

/// Error taxonomy for the verification engine.
///
/// Only conditions that abort a whole session live here. A sample that
/// crashes or prints the wrong answer is not an error - it is an ordinary
/// `Verdict` recorded by the driver.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The executable could not be located or started at all. Distinct from
    /// any `RunResult`: a child that launched and then failed is never a
    /// `Launch` error.
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The compile step exited unsuccessfully. Fatal: no samples are run.
    #[error("compilation failed ({status})")]
    CompileFailed { status: ExitKind },

    /// A template referenced a temp file name that was never registered
    /// when the resolution context was prepared. Programming error in the
    /// language recipe, not user-recoverable.
    #[error("temp file `{0}` referenced but never registered for this context")]
    UnregisteredTempFile(String),

    /// No sample files in the given directory. Recoverable: the caller may
    /// proceed without samples when forcing.
    #[error("no samples found in {}", .0.display())]
    SamplesNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
