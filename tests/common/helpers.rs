use chrono::{DateTime, Utc};
use mule::http::facade::parse_http_date;
use mule::observer::DownloadEvent;
use mule::{create_http_client, Checksum, Download, HttpClientConfig, State};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

// Common test constants
pub const PAYLOAD_SIZE: usize = 1024;
pub const HTTP_DATE_OLD: &str = "Wed, 21 Oct 2015 07:28:00 GMT";
pub const HTTP_DATE_NEW: &str = "Thu, 22 Oct 2015 07:28:00 GMT";

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Hex SHA-256 of a byte slice
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Parses one of the HTTP date constants above
pub fn http_date(value: &str) -> DateTime<Utc> {
    parse_http_date(value).expect("Failed to parse test HTTP date")
}

/// Creates a download pointing at `url` with temp and target inside `dir`
pub fn create_test_download(url: &str, dir: &Path) -> Download {
    Download::new(
        url,
        dir.join("artifact.part"),
        dir.join("artifact.bin"),
    )
    .expect("Failed to create test download")
}

/// Installs an env-filtered subscriber so RUST_LOG controls test output.
/// Safe to call from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Creates an HTTP client with the default test configuration
pub fn create_test_client() -> reqwest_middleware::ClientWithMiddleware {
    init_tracing();
    create_http_client(HttpClientConfig::default()).expect("Failed to create HTTP client")
}

/// Creates a checksum expectation over the given content
pub fn sha256_checksum(data: &[u8]) -> Checksum {
    Checksum::parse(&sha256_hex(data)).expect("Failed to parse test checksum")
}

/// Writes a partial temp file containing the first `len` bytes of `payload`
pub fn write_partial_temp(download: &Download, payload: &[u8], len: usize) {
    let mut file = std::fs::File::create(&download.temp_path).expect("Failed to create temp file");
    file.write_all(&payload[..len])
        .expect("Failed to write temp file");
}

/// Builds a small ZIP archive in memory
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, content) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .expect("Failed to start zip entry");
            writer.write_all(content).expect("Failed to write zip entry");
        }
        writer.finish().expect("Failed to finish zip archive");
    }
    cursor.into_inner()
}

/// Drains all buffered events from a channel observer receiver
pub fn drain_events(receiver: &mut UnboundedReceiver<DownloadEvent>) -> Vec<DownloadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Extracts the state transitions from an event stream
pub fn state_sequence(events: &[DownloadEvent]) -> Vec<State> {
    events
        .iter()
        .filter_map(|event| match event {
            DownloadEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}

/// Asserts that processed counters never decrease within a phase.
///
/// Phases are delimited by state transitions; a new phase may restart
/// its counter, progress inside one may not go backwards.
pub fn assert_progress_monotonic_per_phase(events: &[DownloadEvent]) {
    let mut last: Option<u64> = None;
    for event in events {
        match event {
            DownloadEvent::StateChanged(_) | DownloadEvent::Expecting(_) => last = None,
            DownloadEvent::Processed(n) => {
                if let Some(previous) = last {
                    assert!(
                        *n >= previous,
                        "processed went backwards within a phase: {} after {}",
                        n,
                        previous
                    );
                }
                last = Some(*n);
            }
        }
    }
}

/// Asserts that a file exists with exactly the given content
pub fn assert_file_content(path: &PathBuf, expected: &[u8]) {
    let actual = std::fs::read(path).expect("Failed to read file");
    assert_eq!(actual, expected, "File content mismatch at {:?}", path);
}
