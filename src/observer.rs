//! Progress and state observation.
//!
//! This module defines the [`Observer`] trait through which the executor
//! publishes byte counters and state transitions, plus two ready-made
//! implementations: [`NullObserver`] for callers that do not care, and
//! [`ChannelObserver`] which projects the callbacks into a stream of
//! [`DownloadEvent`] messages for consumers that prefer message passing
//! over callbacks (a UI table model, a logger task).
//!
//! Observers are invoked from whatever execution context runs the
//! executor and must tolerate rapid successive calls.
//!
//! # Examples
//!
//! ```rust
//! use mule::observer::{ChannelObserver, DownloadEvent, Observer};
//!
//! let (observer, mut events) = ChannelObserver::new();
//! observer.expecting(10);
//! observer.processed(4);
//! assert_eq!(events.try_recv().unwrap(), DownloadEvent::Expecting(10));
//! assert_eq!(events.try_recv().unwrap(), DownloadEvent::Processed(4));
//! ```

use crate::download::{Download, State};

use tokio::sync::mpsc;

/// A sink for state transitions and byte counters.
///
/// All methods default to no-ops so implementors only override what they
/// consume. `expecting` announces the byte budget of the current phase,
/// `processed` reports the cumulative bytes handled within it, and
/// `state_changed` is called after every state transition with a snapshot
/// of the download.
pub trait Observer: Send + Sync {
    /// Total byte budget for the current phase.
    fn expecting(&self, _byte_count: u64) {}

    /// Cumulative bytes handled in the current phase.
    fn processed(&self, _byte_count: u64) {}

    /// Called after every state transition.
    fn state_changed(&self, _download: &Download) {}
}

/// An observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// One message emitted by a [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    /// Byte budget of the current phase.
    Expecting(u64),
    /// Cumulative bytes handled in the current phase.
    Processed(u64),
    /// The download transitioned into this state.
    StateChanged(State),
}

/// Projects observer callbacks onto an unbounded channel.
///
/// The channel is unbounded so sends never block the executor; a consumer
/// that falls behind only buffers events.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<DownloadEvent>,
}

impl ChannelObserver {
    /// Creates the observer together with the receiving half of its
    /// channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DownloadEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Observer for ChannelObserver {
    fn expecting(&self, byte_count: u64) {
        let _ = self.sender.send(DownloadEvent::Expecting(byte_count));
    }

    fn processed(&self, byte_count: u64) {
        let _ = self.sender.send(DownloadEvent::Processed(byte_count));
    }

    fn state_changed(&self, download: &Download) {
        let _ = self
            .sender
            .send(DownloadEvent::StateChanged(download.state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_null_observer_accepts_everything() {
        let observer = NullObserver;
        observer.expecting(100);
        observer.processed(50);
    }

    #[test]
    fn test_channel_observer_forwards_events() {
        let (observer, mut events) = ChannelObserver::new();
        let download = Download::new(
            "https://example.com/a",
            PathBuf::from("/tmp/a.part"),
            PathBuf::from("/tmp/a"),
        )
        .unwrap();

        observer.expecting(1024);
        observer.processed(512);
        observer.state_changed(&download);

        assert_eq!(events.try_recv().unwrap(), DownloadEvent::Expecting(1024));
        assert_eq!(events.try_recv().unwrap(), DownloadEvent::Processed(512));
        assert_eq!(
            events.try_recv().unwrap(),
            DownloadEvent::StateChanged(State::NotStarted)
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (observer, events) = ChannelObserver::new();
        drop(events);
        // Sends into a closed channel are ignored, not panics.
        observer.expecting(1);
        observer.processed(1);
    }
}
