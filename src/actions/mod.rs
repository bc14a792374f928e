//! Actions applied to download payloads.
//!
//! # Overview
//!
//! The actions module contains the three workers the executor drives once
//! bytes start flowing:
//!
//! - [`copier`] - Chunked streaming from a source into a sink file with
//!   progress reporting
//! - [`extractor`] - Archive expansion into a target directory
//! - [`validator`] - Existence, size, and checksum checks on a completed
//!   temp file

pub mod copier;
pub mod extractor;
pub mod validator;

pub use copier::copy;
pub use extractor::extract;
pub use validator::Validator;
