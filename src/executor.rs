//! The download state machine.
//!
//! This module contains the [`DownloadExecutor`], which drives one
//! [`Download`] through probe, transfer, validation, and post-processing,
//! mutating the descriptor and notifying the [`Observer`] on every
//! transition.
//!
//! The probe and resume branches are soft-failing: anything that goes
//! wrong there falls through to a full download. From the moment the full
//! download begins everything is hard-failing, and the first error decides
//! the terminal state. The executor never retries; invoking [`run`] again
//! on the same download is the caller's retry mechanism, and a retained
//! temp file makes that second run resumable.
//!
//! [`run`]: DownloadExecutor::run
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use mule::download::Download;
//! use mule::executor::DownloadExecutor;
//! use mule::http::{create_http_client, HttpClientConfig};
//! use mule::observer::NullObserver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! let mut download = Download::new(
//!     "https://example.com/artifact.bin",
//!     PathBuf::from("/tmp/artifact.bin.part"),
//!     PathBuf::from("/data/artifact.bin"),
//! )?;
//!
//! let executor = DownloadExecutor::new(&client, &NullObserver);
//! let state = executor.run(&mut download).await;
//! println!("finished: {}", state);
//! # Ok(())
//! # }
//! ```

use crate::actions::{copier, extractor, Validator};
use crate::download::{Action, Download, State};
use crate::error::{Error, Result};
use crate::http::facade;
use crate::observer::Observer;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use reqwest::Response;
use reqwest_middleware::ClientWithMiddleware;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::fs::OpenOptions;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Executes one [`Download`] at a time on the caller's task.
///
/// Each download must be owned by exactly one executor at a time; callers
/// enforce mutual exclusion per request. Executors on distinct downloads
/// may run in parallel and can share the client.
pub struct DownloadExecutor<'a> {
    client: &'a ClientWithMiddleware,
    observer: &'a dyn Observer,
    cancel: CancellationToken,
}

impl<'a> DownloadExecutor<'a> {
    /// Creates an executor publishing to `observer`.
    pub fn new(client: &'a ClientWithMiddleware, observer: &'a dyn Observer) -> Self {
        Self {
            client,
            observer,
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches a cancellation token checked between chunks and archive
    /// entries. Cancellation ends the run as [`State::Failed`] with the
    /// temp file left in place for a later resume.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the state machine to a terminal state.
    ///
    /// Exactly one terminal state is set on the download, `last_sync` is
    /// populated exactly once, and a final `state_changed` notification
    /// carries the terminal state.
    pub async fn run(&self, download: &mut Download) -> State {
        let state = match self.execute(download).await {
            Ok(state) => state,
            Err(Error::Cancelled) => {
                debug!("Cancelled download of {}", download.url);
                State::Failed
            }
            Err(e) => {
                warn!("Could not download content from {}: {}", download.url, e);
                State::Failed
            }
        };

        download.state = state;
        download.last_sync = Some(Utc::now());
        self.observer.state_changed(download);
        state
    }

    async fn execute(&self, download: &mut Download) -> Result<State> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Idempotence on success: a finished download whose target is in
        // place only needs a conditional probe to confirm it is current.
        if download.state.is_success()
            && !download.temp_path.exists()
            && download.target_path.exists()
            && self.still_current(download).await
        {
            return Ok(State::Succeeded);
        }

        // A temp file already holding the full content length needs no
        // probe; validation decides whether it is good.
        if !download.temp_complete() {
            let mut resumed = false;
            if download.temp_path.exists() && self.probe(download).await {
                resumed = self.resume(download).await?;
            }
            if !resumed {
                self.download_full(download).await?;
            }
        }

        let validator = Validator::new(&download.temp_path);
        if !validator.exists() {
            return Ok(State::NoFileError);
        }
        if !validator.size_matches(download.expected_size) {
            return Ok(State::SizeError);
        }
        if !validator.checksum_matches(download.expected_checksum.as_ref())? {
            return Ok(State::ChecksumError);
        }

        self.process(download).await?;
        Ok(State::Succeeded)
    }

    /// Conditional re-probe for an already succeeded download. Any
    /// failure means "not current" and triggers a full re-download.
    async fn still_current(&self, download: &Download) -> bool {
        match facade::head(self.client, &download.url, download.expected_last_modified).await {
            Ok(head) => head.ok && head.not_modified,
            Err(e) => {
                warn!("HEAD re-probe for {} failed: {}", download.url, e);
                false
            }
        }
    }

    /// Decides whether resuming the partial temp file is safe.
    ///
    /// Resumption is safe iff the probe succeeded, the server still
    /// reports the recorded content length, its last-modified is not
    /// newer than the recorded one, the temp file is strictly shorter
    /// than the content length, and the server accepts byte ranges. On
    /// any other outcome the fresh metadata is recorded on the download
    /// and the partial temp file loses its claim to validity.
    async fn probe(&self, download: &mut Download) -> bool {
        let head = match facade::head(self.client, &download.url, temp_mtime(download)).await {
            Ok(head) => head,
            Err(e) => {
                warn!("HEAD request for {} failed: {}, need to download", download.url, e);
                return false;
            }
        };
        if !head.ok {
            warn!("HEAD request for {} not ok, need to download", download.url);
            return false;
        }

        let content_length_equals = download.expected_content_length.is_some()
            && download.expected_content_length == head.content_length;
        let not_newer = match (download.expected_last_modified, head.last_modified) {
            (Some(recorded), Some(server)) => server <= recorded,
            _ => false,
        };
        let temp_shorter = head
            .content_length
            .map(|length| download.temp_len() < length)
            .unwrap_or(false);

        if content_length_equals && not_newer && temp_shorter && head.accept_byte_ranges {
            return true;
        }

        if !content_length_equals {
            warn!(
                "HEAD content length is {:?} but download started with {:?} bytes, need to download",
                head.content_length, download.expected_content_length
            );
        }
        download.expected_content_length = head.content_length;

        if !not_newer {
            warn!(
                "HEAD last modified {:?} is later than {:?} when download started, need to download",
                head.last_modified, download.expected_last_modified
            );
        }
        download.expected_last_modified = head.last_modified;

        false
    }

    /// Continues a partial transfer with a ranged GET.
    ///
    /// Soft-failing: returns `Ok(false)` to fall through to a full
    /// download when the server ignores the range or the transfer breaks.
    /// Only cancellation propagates as an error.
    async fn resume(&self, download: &mut Download) -> Result<bool> {
        self.transition(download, State::Resuming);
        let temp_len = download.temp_len();
        let Some(content_length) = download.expected_content_length else {
            return Ok(false);
        };
        debug!(
            "Resuming bytes {}-{} from {}",
            temp_len, content_length, download.url
        );

        let (result, response) =
            match facade::get(self.client, &download.url, Some((temp_len, content_length))).await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("Ranged GET for {} failed: {}, need to download", download.url, e);
                    return Ok(false);
                }
            };

        // No-range safety: a 200 to a ranged GET is a full payload and
        // must never be appended onto existing bytes.
        if !result.successful || !result.partial_content {
            warn!(
                "Server for {} did not answer the requested range, need to download",
                download.url
            );
            return Ok(false);
        }

        let sink = OpenOptions::new()
            .write(true)
            .append(true)
            .open(&download.temp_path)
            .await;
        let mut sink = match sink {
            Ok(sink) => sink,
            Err(e) => {
                warn!("Cannot append to {:?}: {}, need to download", download.temp_path, e);
                return Ok(false);
            }
        };

        match self
            .stream_to_sink(download, response, &mut sink, temp_len, Some(content_length))
            .await
        {
            Ok(()) => Ok(true),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                warn!("Resume of {} failed: {}, need to download", download.url, e);
                Ok(false)
            }
        }
    }

    /// Transfers the full payload from offset zero, truncating the temp
    /// file. Hard-failing.
    async fn download_full(&self, download: &mut Download) -> Result<()> {
        self.transition(download, State::Downloading);
        // Restart transition: the one permitted progress reset.
        download.expected_bytes = 0;
        download.processed_bytes = 0;
        debug!(
            "Downloading {:?} bytes from {}",
            download.expected_content_length, download.url
        );

        let (result, response) = facade::get(self.client, &download.url, None).await?;
        if !result.successful {
            return Err(Error::HttpStatus(response.status().as_u16()));
        }
        if result.content_length.is_some() {
            download.expected_content_length = result.content_length;
        }
        let content_length = result.content_length.or(download.expected_content_length);

        if let Some(parent) = download.temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut sink = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&download.temp_path)
            .await?;

        self.stream_to_sink(download, response, &mut sink, 0, content_length)
            .await
    }

    /// Pipes a response body into the sink through the copier, folding
    /// the progress counters back into the download afterwards.
    async fn stream_to_sink(
        &self,
        download: &mut Download,
        response: Response,
        sink: &mut tokio::fs::File,
        start_offset: u64,
        end_offset: Option<u64>,
    ) -> Result<()> {
        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);

        let tracker = ProgressTracker::new(self.observer);
        let result = copier::copy(
            &mut reader,
            sink,
            start_offset,
            end_offset,
            &tracker,
            &self.cancel,
        )
        .await;

        tracker.fold_into(download);
        result.map(|_| ())
    }

    /// Post-processes the validated temp file into the target, then
    /// deletes the temp file. A temp file that cannot be deleted fails
    /// the run, but the produced target is retained.
    async fn process(&self, download: &mut Download) -> Result<()> {
        self.transition(download, State::Processing);

        match download.action {
            Action::Copy => {
                let temp_len = download.temp_len();
                let mut source = tokio::fs::File::open(&download.temp_path).await?;
                if let Some(parent) = download.target_path.parent() {
                    fs::create_dir_all(parent).await?;
                }
                let mut sink = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&download.target_path)
                    .await?;

                let tracker = ProgressTracker::new(self.observer);
                let result = copier::copy(
                    &mut source,
                    &mut sink,
                    0,
                    Some(temp_len),
                    &tracker,
                    &self.cancel,
                )
                .await;
                tracker.fold_into(download);
                result?;
            }
            Action::Extract => {
                let tracker = ProgressTracker::new(self.observer);
                let result = extractor::extract(
                    &download.temp_path,
                    &download.target_path,
                    &tracker,
                    &self.cancel,
                );
                tracker.fold_into(download);
                result?;
            }
        }

        fs::remove_file(&download.temp_path).await?;
        Ok(())
    }

    fn transition(&self, download: &mut Download, state: State) {
        download.state = state;
        self.observer.state_changed(download);
    }
}

/// Forwards progress callbacks to the outer observer while recording the
/// counters, so the executor can mirror them onto the download once the
/// phase ends. The download's own counters never decrease mid-run; only
/// the restart transition resets them.
struct ProgressTracker<'a> {
    observer: &'a dyn Observer,
    expected: AtomicU64,
    processed: AtomicU64,
}

impl<'a> ProgressTracker<'a> {
    fn new(observer: &'a dyn Observer) -> Self {
        Self {
            observer,
            expected: AtomicU64::new(0),
            processed: AtomicU64::new(0),
        }
    }

    fn fold_into(&self, download: &mut Download) {
        let expected = self.expected.load(Ordering::Relaxed);
        let processed = self.processed.load(Ordering::Relaxed);
        if expected > 0 {
            download.expected_bytes = expected;
        }
        download.processed_bytes = download.processed_bytes.max(processed);
    }
}

impl Observer for ProgressTracker<'_> {
    fn expecting(&self, byte_count: u64) {
        self.expected.store(byte_count, Ordering::Relaxed);
        self.observer.expecting(byte_count);
    }

    fn processed(&self, byte_count: u64) {
        self.processed.store(byte_count, Ordering::Relaxed);
        self.observer.processed(byte_count);
    }

    fn state_changed(&self, download: &Download) {
        self.observer.state_changed(download);
    }
}

/// Modification time of the temp file, used for the conditional probe.
fn temp_mtime(download: &Download) -> Option<DateTime<Utc>> {
    download
        .temp_path
        .metadata()
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}
