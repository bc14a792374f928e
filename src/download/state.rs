//! Download state machine values.
//!
//! This module contains the [`State`] enum describing where a download is
//! in its lifecycle, from creation through transfer and post-processing to
//! one of the terminal outcomes. The [`crate::executor::DownloadExecutor`]
//! is the only component that moves a download through these states.

use std::fmt;

/// The lifecycle state of a [`crate::download::Download`].
///
/// Transitions follow `NotStarted → Resuming → Downloading → Processing`
/// into one of the terminal outcomes. A failed resume falls back to
/// `Downloading`; any transport or I/O failure outside validation ends in
/// `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Created but not yet handed to an executor.
    NotStarted,
    /// Continuing a partial prior transfer with a ranged request.
    Resuming,
    /// Transferring the full payload from offset zero.
    Downloading,
    /// Post-processing the completed temp file into the target.
    Processing,
    /// Target produced and validated.
    Succeeded,
    /// The temp file was missing after the transfer.
    NoFileError,
    /// The temp file size did not match the expectation.
    SizeError,
    /// The temp file checksum did not match the expectation.
    ChecksumError,
    /// Transport failure, I/O failure, unsafe archive, or cancellation.
    Failed,
}

impl State {
    /// Returns true when the executor performs no further work on the
    /// download.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            State::Succeeded
                | State::NoFileError
                | State::SizeError
                | State::ChecksumError
                | State::Failed
        )
    }

    /// Returns true when the download ended with its target in place.
    pub fn is_success(&self) -> bool {
        matches!(self, State::Succeeded)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::NotStarted => "not started",
            State::Resuming => "resuming",
            State::Downloading => "downloading",
            State::Processing => "processing",
            State::Succeeded => "succeeded",
            State::NoFileError => "no file",
            State::SizeError => "size mismatch",
            State::ChecksumError => "checksum mismatch",
            State::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}
