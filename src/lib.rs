//! Mule is a crate providing resumable, validated HTTP(S) downloads:
//! it hauls a remote artifact into a temp file, resumes partial prior
//! transfers when safe, validates size and checksum, and post-processes
//! the payload into its final target as a verbatim copy or an archive
//! expansion.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use mule::download::{Action, Download};
//! use mule::executor::DownloadExecutor;
//! use mule::http::{create_http_client, HttpClientConfig};
//! use mule::observer::NullObserver;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), mule::Error> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! let mut download = Download::new(
//!     "https://example.com/themes.zip",
//!     PathBuf::from("/tmp/themes.zip.part"),
//!     PathBuf::from("/data/themes"),
//! )?
//! .with_action(Action::Extract);
//!
//! let state = DownloadExecutor::new(&client, &NullObserver)
//!     .run(&mut download)
//!     .await;
//! assert!(state.is_terminal());
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! The mule crate is organized into several modules:
//!
//! - [`download`] - The `Download` descriptor, lifecycle `State`, and
//!   checksum types
//! - [`executor`] - The `DownloadExecutor` state machine
//! - [`actions`] - Byte copying, archive extraction, and validation
//! - [`http`] - HTTP client setup and the HEAD/GET facade
//! - [`observer`] - Progress and state observation
//! - [`error`] - Centralized error handling with the `Error` enum

pub mod actions;
pub mod download;
pub mod error;
pub mod executor;
pub mod http;
pub mod observer;

pub use download::{Action, Checksum, ChecksumAlgorithm, Download, State};
pub use error::{Error, Result};
pub use executor::DownloadExecutor;
pub use http::{create_http_client, GetResult, HeadResult, HttpClientConfig};
pub use observer::{ChannelObserver, DownloadEvent, NullObserver, Observer};
