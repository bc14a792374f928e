//! Archive extraction into a target directory.
//!
//! This module unpacks a downloaded archive temp file into a directory,
//! reporting progress through the same [`Observer`] shape the copier
//! uses. The archive format is recognized by magic bytes, never by file
//! name. Entry paths are validated against the target directory before
//! anything is written, so an archive containing `../evil` fails without
//! leaving files outside the target.

use crate::error::{Error, Result};
use crate::observer::Observer;

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

/// Local file header signature of a ZIP archive.
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
/// Empty archives start with the end-of-central-directory record instead.
const ZIP_EMPTY_MAGIC: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

/// Unpacks `archive_path` into `target_dir`, overwriting existing
/// entries.
///
/// Reports `expecting` with the total uncompressed size up front and
/// `processed` cumulatively after each restored entry. The cancellation
/// token is checked between entries.
pub fn extract(
    archive_path: &Path,
    target_dir: &Path,
    observer: &dyn Observer,
    cancel: &CancellationToken,
) -> Result<()> {
    if !is_zip(archive_path)? {
        return Err(Error::UnsupportedArchive(archive_path.to_path_buf()));
    }

    let file = File::open(archive_path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| zip_error(e, archive_path))?;

    // Reject unsafe entries and compute the byte budget before restoring
    // anything.
    let mut total = 0u64;
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| zip_error(e, archive_path))?;
        if entry.enclosed_name().is_none() {
            return Err(Error::UnsafeArchiveEntry(entry.name().to_string()));
        }
        total += entry.size();
    }
    observer.expecting(total);
    debug!(
        "Extracting {} entries ({} bytes) from {:?} into {:?}",
        archive.len(),
        total,
        archive_path,
        target_dir
    );

    fs::create_dir_all(target_dir)?;

    let mut processed = 0u64;
    for index in 0..archive.len() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut entry = archive
            .by_index(index)
            .map_err(|e| zip_error(e, archive_path))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(Error::UnsafeArchiveEntry(entry.name().to_string()));
        };
        let destination = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut output = File::create(&destination)?;
            io::copy(&mut entry, &mut output)?;
            processed += entry.size();
            observer.processed(processed);
        }
    }

    Ok(())
}

/// Recognizes a ZIP archive by its magic bytes.
fn is_zip(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == ZIP_MAGIC || magic == ZIP_EMPTY_MAGIC),
        // Shorter than any archive header.
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn zip_error(error: ZipError, path: &Path) -> Error {
    match error {
        ZipError::Io(source) => Error::IOError { source },
        _ => Error::UnsupportedArchive(path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extracts_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        let target = dir.path().join("out");
        build_archive(
            &archive,
            &[("a.txt", b"alpha"), ("sub/b.txt", b"beta")],
        );

        extract(&archive, &target, &NullObserver, &CancellationToken::new()).unwrap();

        assert_eq!(fs::read(target.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(target.join("sub/b.txt")).unwrap(), b"beta");
    }

    #[test]
    fn test_overwrites_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        let target = dir.path().join("out");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("a.txt"), b"stale").unwrap();
        build_archive(&archive, &[("a.txt", b"fresh")]);

        extract(&archive, &target, &NullObserver, &CancellationToken::new()).unwrap();

        assert_eq!(fs::read(target.join("a.txt")).unwrap(), b"fresh");
    }

    #[test]
    fn test_rejects_escaping_entry_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        let target = dir.path().join("out");
        build_archive(&archive, &[("inside.txt", b"ok"), ("../evil", b"nope")]);

        let result = extract(&archive, &target, &NullObserver, &CancellationToken::new());

        assert!(matches!(result, Err(Error::UnsafeArchiveEntry(_))));
        // Nothing restored, not even the safe entry preceding the bad one.
        assert!(!target.join("inside.txt").exists());
        assert!(!dir.path().join("evil").exists());
    }

    #[test]
    fn test_rejects_non_archive_by_magic() {
        let dir = tempfile::tempdir().unwrap();
        let not_zip = dir.path().join("bundle.zip");
        fs::write(&not_zip, b"plain text, zip extension").unwrap();

        let result = extract(
            &not_zip,
            &dir.path().join("out"),
            &NullObserver,
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(Error::UnsupportedArchive(_))));
    }

    #[test]
    fn test_reports_uncompressed_totals() {
        use std::sync::Mutex;

        #[derive(Default)]
        struct Recording {
            expected: Mutex<Vec<u64>>,
            processed: Mutex<Vec<u64>>,
        }
        impl Observer for Recording {
            fn expecting(&self, n: u64) {
                self.expected.lock().unwrap().push(n);
            }
            fn processed(&self, n: u64) {
                self.processed.lock().unwrap().push(n);
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        build_archive(&archive, &[("a", b"12345"), ("b", b"678")]);

        let observer = Recording::default();
        extract(
            &archive,
            &dir.path().join("out"),
            &observer,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(*observer.expected.lock().unwrap(), vec![8]);
        assert_eq!(*observer.processed.lock().unwrap(), vec![5, 8]);
    }

    #[test]
    fn test_cancellation_between_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        build_archive(&archive, &[("a", b"1")]);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = extract(&archive, &dir.path().join("out"), &NullObserver, &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
