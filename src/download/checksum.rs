//! Checksum verification functionality for downloads.
//!
//! This module provides digest algorithm detection and file verification
//! for completed downloads, supporting SHA-256 and SHA-512. The algorithm
//! is detected from the length of the hex digest, and file contents are
//! streamed through the hasher so large payloads never live in memory.
//!
//! # Examples
//!
//! ```rust
//! use mule::download::checksum::{Checksum, ChecksumAlgorithm};
//!
//! let checksum = Checksum::parse(
//!     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
//! );
//! assert_eq!(
//!     checksum.map(|c| c.algorithm),
//!     Some(ChecksumAlgorithm::Sha256)
//! );
//! ```

use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const SHA256_HEX_LEN: usize = 64;
const SHA512_HEX_LEN: usize = 128;

/// Supported digest algorithms for file verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// SHA-256 (64 hex characters)
    Sha256,
    /// SHA-512 (128 hex characters)
    Sha512,
}

/// An expected digest over the validated payload, tagged with its
/// algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    /// Digest algorithm used to produce [`Checksum::digest`].
    pub algorithm: ChecksumAlgorithm,
    /// Lowercase hex digest.
    pub digest: String,
}

impl Checksum {
    /// Creates a checksum with an explicit algorithm tag.
    pub fn new(algorithm: ChecksumAlgorithm, digest: &str) -> Self {
        Self {
            algorithm,
            digest: digest.to_lowercase(),
        }
    }

    /// Detects the algorithm from the digest format.
    ///
    /// Returns `None` when the string is not a hex digest of a supported
    /// length.
    pub fn parse(digest: &str) -> Option<Self> {
        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let algorithm = match digest.len() {
            SHA256_HEX_LEN => ChecksumAlgorithm::Sha256,
            SHA512_HEX_LEN => ChecksumAlgorithm::Sha512,
            _ => return None,
        };
        Some(Self::new(algorithm, digest))
    }

    /// Computes the digest of `path` and compares it with the expected
    /// value in constant time.
    pub fn matches_file(&self, path: &Path) -> io::Result<bool> {
        let actual = self.compute(path)?;
        Ok(constant_time_eq(actual.as_bytes(), self.digest.as_bytes()))
    }

    /// Computes this checksum's digest over the full contents of `path`.
    pub fn compute(&self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        match self.algorithm {
            ChecksumAlgorithm::Sha256 => hash_reader::<Sha256>(&mut file),
            ChecksumAlgorithm::Sha512 => hash_reader::<Sha512>(&mut file),
        }
    }
}

fn hash_reader<D: Digest + Default>(reader: &mut impl Read) -> io::Result<String> {
    let mut hasher = D::default();
    let mut buffer = [0u8; 32 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    let digest = hasher.finalize();
    Ok(digest
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>())
}

// Comparison must not leak the position of the first differing byte.
fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right.iter())
        .fold(0u8, |acc, (l, r)| acc | (l ^ r))
        == 0
}
