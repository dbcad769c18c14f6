use serde::Serialize;

/// Counters for debugging capture sessions. Reset on `begin_recording`.
///
/// `ring_overwrites` and `poll_overruns` are the two data-loss signals:
/// capture is best-effort and bounded-memory, never lossless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureDiagnostics {
    /// Cursor polls performed by the pull path.
    pub polls: u64,
    /// Polls that found new data and drained it.
    pub blocks_drained: u64,
    /// Drained blocks the engine returned as two chunks.
    pub split_blocks: u64,
    /// Buffers delivered by the push path.
    pub push_callbacks: u64,
    /// Samples written into the ring buffer this session.
    pub samples_written: u64,
    /// Unread samples evicted by overwrite-oldest.
    pub ring_overwrites: u64,
    /// Polls spaced at least one loop length apart, where a whole block
    /// may have been lost without the cursor showing it.
    pub poll_overruns: u64,
    /// Lock requests the engine refused.
    pub lock_failures: u64,
}

/// Sample-loss notification passed to a
/// [`PipelineDelegate`](crate::traits::delegate::PipelineDelegate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLoss {
    /// The ring buffer dropped this many unread samples.
    RingOverwrite { samples: u64 },
    /// Two polls were at least one loop length apart.
    PollOverrun { gap_millis: u64 },
}
