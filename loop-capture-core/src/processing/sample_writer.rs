use std::sync::Arc;

use parking_lot::Mutex;

use super::ring_buffer::RingBuffer;

/// A ring buffer shared between the ingestion path and downstream consumers.
pub type SharedRingBuffer<const N: usize> = Arc<Mutex<RingBuffer<f32, N>>>;

/// Destination for captured samples.
///
/// Both ingestion strategies write through this: the pull path from
/// `update`, the push path from the engine's capture callback.
pub trait SampleWriter: Send + Sync {
    /// Append `samples` in order. Returns how many unread samples were
    /// evicted to make room.
    fn write_samples(&self, samples: &[f32]) -> usize;
}

/// [`SampleWriter`] over a [`SharedRingBuffer`]. Holds the lock only for
/// the duration of one write.
#[derive(Debug, Clone)]
pub struct RingWriter<const N: usize> {
    ring: SharedRingBuffer<N>,
}

impl<const N: usize> RingWriter<N> {
    pub fn new(ring: SharedRingBuffer<N>) -> Self {
        Self { ring }
    }
}

impl<const N: usize> SampleWriter for RingWriter<N> {
    fn write_samples(&self, samples: &[f32]) -> usize {
        self.ring.lock().write(samples)
    }
}
