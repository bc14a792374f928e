//! Chunked byte copying with progress reporting.
//!
//! This module streams a source into a sink file in bounded chunks,
//! reporting progress through the [`Observer`] after every chunk write.
//! The source is anything `AsyncRead`, which covers both network byte
//! streams (adapted through `tokio_util::io::StreamReader`) and local
//! files during post-processing. Reading in bounded chunks keeps
//! cancellation latency bounded: the cancellation token is checked before
//! every read.

use crate::error::{Error, Result};
use crate::observer::Observer;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Upper bound of a single read, and therefore of cancellation latency.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Streams `reader` into `sink`, reporting progress to `observer`.
///
/// `start_offset` is the absolute position already present in the sink;
/// the caller opens the sink in append mode when it is non-zero. When
/// `end_offset` is known it is announced through `observer.expecting`
/// before the first read; after each chunk write `observer.processed`
/// receives the current absolute offset.
///
/// Returns the final absolute offset. On failure the sink keeps whatever
/// was written so far, enabling a later resume. Both streams are flushed
/// or closed on every exit path (files close on drop).
pub async fn copy<R>(
    reader: &mut R,
    sink: &mut File,
    start_offset: u64,
    end_offset: Option<u64>,
    observer: &dyn Observer,
    cancel: &CancellationToken,
) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if let Some(end) = end_offset {
        observer.expecting(end);
    }

    let mut position = start_offset;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        if cancel.is_cancelled() {
            sink.flush().await?;
            return Err(Error::Cancelled);
        }

        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }

        sink.write_all(&buffer[..read]).await?;
        position += read as u64;
        observer.processed(position);
    }

    sink.flush().await?;
    Ok(position)
}
