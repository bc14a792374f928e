//! Download module containing the download descriptor and its
//! supporting types.
//!
//! # Overview
//!
//! The download module is organized into three components:
//!
//! - [`download`] - The core [`Download`] descriptor and [`Action`] enum
//! - [`state`] - The [`State`] lifecycle values of a download
//! - [`checksum`] - Digest parsing and file verification
//!
//! A [`Download`] is built by the caller, handed to the
//! [`crate::executor::DownloadExecutor`], and retained afterwards for
//! inspection of its terminal state and progress counters.

pub mod checksum;
pub mod download;
pub mod state;

pub use checksum::{Checksum, ChecksumAlgorithm};
pub use download::{Action, Download};
pub use state::State;
