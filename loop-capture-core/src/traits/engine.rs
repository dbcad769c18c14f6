use std::sync::Arc;

use crate::effects::preset::{EffectKind, EffectParameter};
use crate::models::config::LoopBufferFormat;
use crate::models::error::EngineError;
use crate::models::handles::{ChannelHandle, EffectHandle, SoundHandle};

/// Callback the engine invokes with freshly captured interleaved f32
/// samples. Fires on whatever thread the engine records on.
pub type CaptureCallback = Arc<dyn Fn(&[f32]) + Send + Sync + 'static>;

/// A locked sample range of a loop buffer.
///
/// `second` is non-empty exactly when the requested range ran past the end
/// of the loop and wrapped to its start.
#[derive(Debug, Clone, Copy)]
pub struct LockedRange<'a> {
    pub first: &'a [f32],
    pub second: &'a [f32],
}

impl<'a> LockedRange<'a> {
    pub fn contiguous(first: &'a [f32]) -> Self {
        Self { first, second: &[] }
    }

    pub fn is_split(&self) -> bool {
        !self.second.is_empty()
    }

    /// Total interleaved samples across both chunks.
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-empty chunks in capture order.
    pub fn chunks(&self) -> impl Iterator<Item = &'a [f32]> {
        [self.first, self.second]
            .into_iter()
            .filter(|chunk| !chunk.is_empty())
    }
}

/// The external audio engine: system context, record device, loop
/// buffers, effects and output channels.
///
/// Cursor positions, offsets and lengths are in PCM sample frames; locked
/// chunks hold interleaved samples. Handles stay owned by the engine.
///
/// Implemented by:
/// - `SimulatedEngine` (in-memory, deterministic)
pub trait AudioEngine {
    /// Create the system context with `max_channels` voices.
    fn init(&mut self, max_channels: u32) -> Result<(), EngineError>;

    /// Per-tick engine housekeeping.
    fn update(&mut self) -> Result<(), EngineError>;

    /// Shut down the system context and free everything it owns.
    fn close(&mut self) -> Result<(), EngineError>;

    /// Create a looping, user-filled sound to record into.
    fn create_loop_buffer(
        &mut self,
        format: &LoopBufferFormat,
    ) -> Result<SoundHandle, EngineError>;

    /// Length of a sound in PCM sample frames.
    fn sound_length(&self, sound: SoundHandle) -> Result<u32, EngineError>;

    fn release_sound(&mut self, sound: SoundHandle) -> Result<(), EngineError>;

    /// Start asynchronous capture from `device` into `sound`.
    fn record_start(
        &mut self,
        device: i32,
        sound: SoundHandle,
        looping: bool,
    ) -> Result<(), EngineError>;

    fn record_stop(&mut self, device: i32) -> Result<(), EngineError>;

    /// Current write cursor of `device` within its loop buffer.
    fn record_position(&self, device: i32) -> Result<u32, EngineError>;

    /// Lock `length` frames of `sound` starting at `offset` for reading.
    ///
    /// The range wraps at the end of the sound and comes back as two chunks.
    /// It must be released with [`unlock`](Self::unlock).
    fn lock(
        &mut self,
        sound: SoundHandle,
        offset: u32,
        length: u32,
    ) -> Result<LockedRange<'_>, EngineError>;

    fn unlock(&mut self, sound: SoundHandle) -> Result<(), EngineError>;

    /// Deliver captured buffers of `sound` through `callback` instead of
    /// (or in addition to) the loop buffer.
    fn set_capture_callback(
        &mut self,
        _sound: SoundHandle,
        _callback: CaptureCallback,
    ) -> Result<(), EngineError> {
        Err(EngineError::unsupported("capture callback"))
    }

    /// Drop the capture callback registered for `sound`, if any.
    fn clear_capture_callback(&mut self, _sound: SoundHandle) -> Result<(), EngineError> {
        Ok(())
    }

    fn create_effect(
        &mut self,
        kind: EffectKind,
        parameters: &[EffectParameter],
    ) -> Result<EffectHandle, EngineError>;

    fn release_effect(&mut self, effect: EffectHandle) -> Result<(), EngineError>;

    /// Play `sound` on a newly allocated channel.
    fn play_sound(&mut self, sound: SoundHandle) -> Result<ChannelHandle, EngineError>;

    /// Route `channel` through `effect`, replacing the effect previously
    /// attached this way.
    fn attach_effect(
        &mut self,
        channel: ChannelHandle,
        effect: EffectHandle,
    ) -> Result<(), EngineError>;

    fn is_playing(&self, channel: ChannelHandle) -> Result<bool, EngineError>;

    fn stop_channel(&mut self, channel: ChannelHandle) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_range_chunks_in_order() {
        let start = [5.0f32, 6.0];
        let wrapped = [0.0f32];
        let range = LockedRange {
            first: &start,
            second: &wrapped,
        };

        assert!(range.is_split());
        assert_eq!(range.len(), 3);
        let chunks: Vec<&[f32]> = range.chunks().collect();
        assert_eq!(chunks, vec![&start[..], &wrapped[..]]);
    }

    #[test]
    fn contiguous_range_has_one_chunk() {
        let data = [1.0f32, 2.0];
        let range = LockedRange::contiguous(&data);

        assert!(!range.is_split());
        assert_eq!(range.chunks().count(), 1);
        assert!(LockedRange::contiguous(&[]).is_empty());
    }
}
