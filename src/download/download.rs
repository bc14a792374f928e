//! Core download descriptor.
//!
//! This module contains the [`Download`] struct, the unit of work handed to
//! the [`crate::executor::DownloadExecutor`]. A download describes a remote
//! artifact declaratively: where it lives, what it is expected to look like
//! once transferred, and what to do with the raw payload afterwards. The
//! executor mutates the observable part of the descriptor (state and
//! progress counters) while it runs; everything else is caller input.
//!
//! # Examples
//!
//! ```rust
//! use std::path::PathBuf;
//! use mule::download::{Action, Download};
//!
//! # fn main() -> Result<(), mule::Error> {
//! let download = Download::new(
//!     "https://example.com/tiles.zip",
//!     PathBuf::from("/tmp/tiles.zip.part"),
//!     PathBuf::from("/data/tiles"),
//! )?
//! .with_action(Action::Extract)
//! .with_expected_size(1_048_576);
//! assert_eq!(download.action, Action::Extract);
//! # Ok(())
//! # }
//! ```

use crate::download::checksum::Checksum;
use crate::download::state::State;
use crate::error::Error;

use chrono::{DateTime, Utc};
use reqwest::Url;
use std::path::PathBuf;

/// The post-download transformation applied to the temp file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Copy the temp file verbatim to the target file.
    Copy,
    /// Unpack the temp file as an archive into the target directory.
    Extract,
}

/// Represents one artifact to be downloaded.
///
/// The expectation fields (`expected_size`, `expected_content_length`,
/// `expected_checksum`, `expected_last_modified`) are all optional; absent
/// expectations are not checked. `expected_size` describes the validated
/// payload while `expected_content_length` describes what the transport
/// delivers, which can differ when the server compresses.
#[derive(Debug, Clone)]
pub struct Download {
    /// URL of the artifact to download.
    pub url: Url,
    /// Expected size in bytes of the validated payload.
    pub expected_size: Option<u64>,
    /// Expected number of bytes delivered by the HTTP layer.
    pub expected_content_length: Option<u64>,
    /// Expected digest over the validated payload.
    pub expected_checksum: Option<Checksum>,
    /// Expected last-modified time of the remote artifact.
    pub expected_last_modified: Option<DateTime<Utc>>,
    /// What to do with the temp file once validated.
    pub action: Action,
    /// Where the raw HTTP payload accumulates.
    pub temp_path: PathBuf,
    /// Final destination: a file for [`Action::Copy`], a directory for
    /// [`Action::Extract`].
    pub target_path: PathBuf,

    /// Current lifecycle state, owned by the executor during a run.
    pub state: State,
    /// Total byte budget of the current phase.
    pub expected_bytes: u64,
    /// Bytes handled so far in the current phase.
    pub processed_bytes: u64,
    /// Set once per completed run, regardless of outcome.
    pub last_sync: Option<DateTime<Utc>>,
}

impl Download {
    /// Creates a new [`Download`] in state [`State::NotStarted`] with the
    /// default [`Action::Copy`].
    pub fn new(
        url: &str,
        temp_path: PathBuf,
        target_path: PathBuf,
    ) -> Result<Self, Error> {
        let url = Url::parse(url)
            .map_err(|e| Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", url, e)))?;
        Ok(Self::from_url(url, temp_path, target_path))
    }

    /// Creates a new [`Download`] from an already parsed URL.
    pub fn from_url(url: Url, temp_path: PathBuf, target_path: PathBuf) -> Self {
        Self {
            url,
            expected_size: None,
            expected_content_length: None,
            expected_checksum: None,
            expected_last_modified: None,
            action: Action::Copy,
            temp_path,
            target_path,
            state: State::NotStarted,
            expected_bytes: 0,
            processed_bytes: 0,
            last_sync: None,
        }
    }

    /// Sets the post-download action.
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Sets the expected size of the validated payload.
    pub fn with_expected_size(mut self, size: u64) -> Self {
        self.expected_size = Some(size);
        self
    }

    /// Sets the expected content length delivered by the HTTP layer.
    pub fn with_expected_content_length(mut self, length: u64) -> Self {
        self.expected_content_length = Some(length);
        self
    }

    /// Sets the expected checksum of the validated payload.
    pub fn with_expected_checksum(mut self, checksum: Checksum) -> Self {
        self.expected_checksum = Some(checksum);
        self
    }

    /// Sets the expected last-modified time of the remote artifact.
    pub fn with_expected_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.expected_last_modified = Some(last_modified);
        self
    }

    /// Length of the temp file on disk, or 0 when it does not exist.
    pub fn temp_len(&self) -> u64 {
        self.temp_path.metadata().map(|m| m.len()).unwrap_or(0)
    }

    /// True when the temp file already holds exactly the recorded content
    /// length.
    pub fn temp_complete(&self) -> bool {
        match self.expected_content_length {
            Some(length) => self.temp_path.exists() && self.temp_len() == length,
            None => false,
        }
    }
}
