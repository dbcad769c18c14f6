use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::config::IngestionMode;
use crate::models::diagnostics::CaptureDiagnostics;
use crate::models::error::{check, PipelineError};
use crate::models::handles::SoundHandle;
use crate::models::recording::ElapsedTime;
use crate::processing::sample_writer::SampleWriter;
use crate::traits::engine::{AudioEngine, CaptureCallback};

/// Frames between two cursor readings of a loop buffer `buffer_length`
/// frames long.
///
/// A `device` cursor behind `prior` means the writer wrapped past the end
/// of the loop, so the loop length is added back. Only distances shorter
/// than one loop can be told apart. Cursors are expected below
/// `buffer_length`.
pub fn corrected_block_length(prior: u32, device: u32, buffer_length: u32) -> u32 {
    if device >= prior {
        device - prior
    } else {
        buffer_length.saturating_sub(prior) + device
    }
}

/// What one pull-path poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Device cursor observed by this poll.
    pub cursor: u32,
    /// Frames drained; zero when the cursor had not moved.
    pub block_frames: u32,
    /// Interleaved sample counts of the first and (when split) second chunk.
    pub chunk_samples: [usize; 2],
    /// Unread ring samples evicted by this drain.
    pub overwritten: usize,
    /// Set when this poll came at least one loop length after the last.
    pub poll_gap: Option<Duration>,
}

impl DrainReport {
    pub fn is_split(&self) -> bool {
        self.chunk_samples[1] > 0
    }

    pub fn samples(&self) -> usize {
        self.chunk_samples[0] + self.chunk_samples[1]
    }
}

/// Cursor state of one recording.
///
/// Created by `begin_recording` with every cursor at zero, advanced by each
/// `update` tick, consumed by `end_recording`. The first poll's gap is
/// measured from `started`.
#[derive(Debug)]
pub struct CaptureSession {
    sound: SoundHandle,
    device: i32,
    mode: IngestionMode,
    is_recording: bool,
    device_cursor: u32,
    prior_cursor: u32,
    total_decoded_samples: u64,
    buffer_length_samples: u32,
    loop_duration: Duration,
    last_poll: Option<Instant>,
    push_callbacks: Arc<AtomicU64>,
    ring_written_base: u64,
    ring_overwritten_base: u64,
    diagnostics: CaptureDiagnostics,
}

impl CaptureSession {
    pub fn new(
        sound: SoundHandle,
        device: i32,
        mode: IngestionMode,
        buffer_length_samples: u32,
        loop_duration: Duration,
        started: Instant,
    ) -> Self {
        Self {
            sound,
            device,
            mode,
            is_recording: true,
            device_cursor: 0,
            prior_cursor: 0,
            total_decoded_samples: 0,
            buffer_length_samples,
            loop_duration,
            last_poll: Some(started),
            push_callbacks: Arc::new(AtomicU64::new(0)),
            ring_written_base: 0,
            ring_overwritten_base: 0,
            diagnostics: CaptureDiagnostics::default(),
        }
    }

    /// Pull path: poll the device cursor and copy any new range into
    /// `writer`.
    ///
    /// A failed lock leaves `prior_cursor` where it was, so the next poll
    /// retries the whole range.
    pub fn poll<E: AudioEngine, W: SampleWriter + ?Sized>(
        &mut self,
        engine: &mut E,
        writer: &W,
        now: Instant,
    ) -> Result<DrainReport, PipelineError> {
        if !self.is_recording {
            return Ok(DrainReport {
                cursor: self.device_cursor,
                ..Default::default()
            });
        }

        self.device_cursor = check(engine.record_position(self.device), "record_position")?;
        self.diagnostics.polls += 1;

        let mut report = DrainReport {
            cursor: self.device_cursor,
            ..Default::default()
        };

        if let Some(last) = self.last_poll {
            let gap = now.saturating_duration_since(last);
            if gap >= self.loop_duration {
                self.diagnostics.poll_overruns += 1;
                report.poll_gap = Some(gap);
            }
        }
        self.last_poll = Some(now);

        if self.device_cursor == self.prior_cursor {
            return Ok(report);
        }

        let block_length = corrected_block_length(
            self.prior_cursor,
            self.device_cursor,
            self.buffer_length_samples,
        );

        let range = match engine.lock(self.sound, self.prior_cursor, block_length) {
            Ok(range) => range,
            Err(source) => {
                self.diagnostics.lock_failures += 1;
                return check(Err(source), "lock");
            }
        };

        for (slot, chunk) in range.chunks().enumerate() {
            report.overwritten += writer.write_samples(chunk);
            report.chunk_samples[slot] = chunk.len();
            self.total_decoded_samples += chunk.len() as u64;
        }
        if range.is_split() {
            self.diagnostics.split_blocks += 1;
        }

        // The samples are already copied; a refused unlock loses nothing.
        let _ = check(engine.unlock(self.sound), "unlock");

        report.block_frames = block_length;
        self.diagnostics.blocks_drained += 1;
        self.diagnostics.samples_written += report.samples() as u64;
        self.diagnostics.ring_overwrites += report.overwritten as u64;
        self.prior_cursor = self.device_cursor;

        Ok(report)
    }

    /// Push path: build the engine callback that forwards captured buffers
    /// into `writer`. `ring_written`/`ring_overwritten` are the ring's
    /// lifetime totals at the start of the session.
    pub fn push_callback<W: SampleWriter + 'static>(
        &mut self,
        writer: W,
        ring_written: u64,
        ring_overwritten: u64,
    ) -> CaptureCallback {
        self.ring_written_base = ring_written;
        self.ring_overwritten_base = ring_overwritten;
        let callbacks = Arc::clone(&self.push_callbacks);
        Arc::new(move |samples: &[f32]| {
            writer.write_samples(samples);
            callbacks.fetch_add(1, Ordering::Relaxed);
        })
    }

    /// Push path: bring the counters up to date from the ring's totals.
    ///
    /// Returns the number of samples evicted since the previous sync.
    pub fn sync_pushed(&mut self, ring_written: u64, ring_overwritten: u64) -> u64 {
        let written = ring_written.saturating_sub(self.ring_written_base);
        let overwritten = ring_overwritten.saturating_sub(self.ring_overwritten_base);
        let newly_overwritten = overwritten.saturating_sub(self.diagnostics.ring_overwrites);

        self.total_decoded_samples = written;
        self.diagnostics.samples_written = written;
        self.diagnostics.ring_overwrites = overwritten;
        self.diagnostics.push_callbacks = self.push_callbacks.load(Ordering::Relaxed);
        newly_overwritten
    }

    /// Mark the session finished. Later polls do nothing.
    pub fn finish(&mut self) {
        self.is_recording = false;
    }

    pub fn elapsed(&self, sample_rate: u32, channels: u16) -> ElapsedTime {
        ElapsedTime::from_samples(self.total_decoded_samples, sample_rate, channels)
    }

    pub fn sound(&self) -> SoundHandle {
        self.sound
    }

    pub fn mode(&self) -> IngestionMode {
        self.mode
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn device_cursor(&self) -> u32 {
        self.device_cursor
    }

    pub fn prior_cursor(&self) -> u32 {
        self.prior_cursor
    }

    pub fn total_decoded_samples(&self) -> u64 {
        self.total_decoded_samples
    }

    pub fn buffer_length_samples(&self) -> u32 {
        self.buffer_length_samples
    }

    pub fn diagnostics(&self) -> &CaptureDiagnostics {
        &self.diagnostics
    }
}
