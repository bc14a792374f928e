//! Validation of completed temp files.
//!
//! This module checks a finished transfer against the expectations the
//! caller declared on the download: the file exists, has the expected
//! size, and has the expected checksum. Absent expectations validate
//! true. The executor runs these checks in a fixed order so a file that
//! is wrong in several ways reports the first failing check.

use crate::download::checksum::Checksum;
use crate::error::Result;

use std::path::{Path, PathBuf};
use tracing::warn;

/// Validates one completed temp file.
#[derive(Debug, Clone)]
pub struct Validator {
    path: PathBuf,
}

impl Validator {
    /// Creates a validator for the file at `path`.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// True when the file is present and is a regular file.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// True when the file length equals `expected_size`, or when no size
    /// is expected.
    pub fn size_matches(&self, expected_size: Option<u64>) -> bool {
        let Some(expected) = expected_size else {
            return true;
        };
        let actual = self.path.metadata().map(|m| m.len()).unwrap_or(0);
        if actual != expected {
            warn!(
                "Size of {:?} is {} but expected {} bytes",
                self.path, actual, expected
            );
            return false;
        }
        true
    }

    /// True when the file digest equals `expected_checksum`, or when no
    /// checksum is expected.
    pub fn checksum_matches(&self, expected_checksum: Option<&Checksum>) -> Result<bool> {
        let Some(expected) = expected_checksum else {
            return Ok(true);
        };
        let matches = expected.matches_file(&self.path)?;
        if !matches {
            warn!("Checksum of {:?} does not match {}", self.path, expected.digest);
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::checksum::ChecksumAlgorithm;
    use std::fs;

    const ABC_SHA256: &str =
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn validator_for(content: &[u8]) -> (tempfile::TempDir, Validator) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp.bin");
        fs::write(&path, content).unwrap();
        let validator = Validator::new(&path);
        (dir, validator)
    }

    #[test]
    fn test_exists() {
        let (dir, validator) = validator_for(b"abc");
        assert!(validator.exists());
        assert!(!Validator::new(&dir.path().join("missing")).exists());
        // A directory is not a regular file.
        assert!(!Validator::new(dir.path()).exists());
    }

    #[test]
    fn test_size_matches() {
        let (_dir, validator) = validator_for(b"abc");
        assert!(validator.size_matches(Some(3)));
        assert!(!validator.size_matches(Some(4)));
        assert!(validator.size_matches(None));
    }

    #[test]
    fn test_size_of_missing_file_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let validator = Validator::new(&dir.path().join("missing"));
        assert!(!validator.size_matches(Some(1)));
        assert!(validator.size_matches(Some(0)));
    }

    #[test]
    fn test_checksum_matches() {
        let (_dir, validator) = validator_for(b"abc");
        let good = Checksum::new(ChecksumAlgorithm::Sha256, ABC_SHA256);
        let bad = Checksum::new(
            ChecksumAlgorithm::Sha256,
            "0000000000000000000000000000000000000000000000000000000000000000",
        );
        assert!(validator.checksum_matches(Some(&good)).unwrap());
        assert!(!validator.checksum_matches(Some(&bad)).unwrap());
        assert!(validator.checksum_matches(None).unwrap());
    }
}
