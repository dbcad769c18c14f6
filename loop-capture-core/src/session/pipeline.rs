use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::effects::chain::EffectChain;
use crate::effects::preset::{EffectKind, EffectPreset};
use crate::models::config::{IngestionMode, PipelineConfig};
use crate::models::diagnostics::{CaptureDiagnostics, DataLoss};
use crate::models::error::{check, PipelineError};
use crate::models::handles::{ChannelHandle, SoundHandle};
use crate::models::recording::{ElapsedTime, RecordedSound};
use crate::models::state::PipelineState;
use crate::processing::ring_buffer::RingBuffer;
use crate::processing::sample_writer::{RingWriter, SharedRingBuffer};
use crate::session::capture::CaptureSession;
use crate::session::playback::{PlaybackSelector, SoundSelection};
use crate::traits::delegate::PipelineDelegate;
use crate::traits::engine::AudioEngine;

/// Ring capacity in samples when none is given.
pub const DEFAULT_RING_CAPACITY: usize = 10_000;

/// Owns the engine, the capture ring buffer, the active capture session,
/// the effect chain and the recorded sounds.
///
/// Single-threaded: the host calls [`update`](Self::update) once per tick and
/// every other operation from the same thread. With
/// [`IngestionMode::Push`] the engine's callback thread is the ring's only
/// writer for the session.
///
/// ```text
/// [engine loop buffer] ─ pull: poll/lock/copy ─┐
///                                              ├→ [RingBuffer] → consumer
/// [engine callback] ──── push: write ──────────┘
/// ```
///
/// Capture is best-effort with bounded memory: a slow consumer loses the
/// oldest samples and polls spaced a loop length apart may lose a whole
/// block. Both are counted in [`CaptureDiagnostics`].
pub struct CapturePipeline<E: AudioEngine, const N: usize = DEFAULT_RING_CAPACITY> {
    engine: E,
    config: PipelineConfig,
    state: PipelineState,
    ring: SharedRingBuffer<N>,
    session: Option<CaptureSession>,
    last_diagnostics: CaptureDiagnostics,
    effects: EffectChain,
    playback: PlaybackSelector,
    delegate: Option<Arc<dyn PipelineDelegate>>,
}

impl<E: AudioEngine, const N: usize> CapturePipeline<E, N> {
    pub fn new(engine: E, config: PipelineConfig) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(PipelineError::ConfigurationFailed)?;

        Ok(Self {
            engine,
            config,
            state: PipelineState::Uninitialized,
            ring: Arc::new(Mutex::new(RingBuffer::new())),
            session: None,
            last_diagnostics: CaptureDiagnostics::default(),
            effects: EffectChain::new(),
            playback: PlaybackSelector::new(),
            delegate: None,
        })
    }

    /// Seed the random sound selector, for reproducible playback order.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.playback = PlaybackSelector::with_seed(seed);
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn PipelineDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Create the engine's system context. On failure the pipeline stays
    /// uninitialized and every other operation remains a safe no-op.
    pub fn initialize(&mut self) -> Result<(), PipelineError> {
        if self.state.is_initialized() {
            return Err(PipelineError::AlreadyInitialized);
        }

        if let Err(e) = check(self.engine.init(self.config.max_channels), "init") {
            if let Err(close_err) = self.engine.close() {
                log::error!("Failed to close engine after init failure: {}", close_err);
            }
            return Err(e);
        }

        log::info!(
            "Capture pipeline initialized ({} Hz, {} ch, {:?} ingestion)",
            self.config.sample_rate,
            self.config.channels,
            self.config.ingestion
        );
        self.set_state(PipelineState::Idle);
        Ok(())
    }

    /// Tear down: end any recording, stop the last channel, release effects,
    /// recorded sounds and the engine context. A no-op when uninitialized.
    pub fn destroy(&mut self) {
        if !self.state.is_initialized() {
            return;
        }

        if self.state.is_recording() {
            let _ = self.end_recording();
        }
        self.playback.release_all(&mut self.engine);
        self.effects.release_all(&mut self.engine);
        if let Err(e) = check(self.engine.close(), "close") {
            self.notify_engine_error(&e);
        }

        self.set_state(PipelineState::Uninitialized);
        log::info!("Capture pipeline destroyed");
    }

    /// Per-tick entry point: runs engine housekeeping and drains the active
    /// recording. Engine failures are logged and the tick carries on.
    pub fn update(&mut self) -> Result<(), PipelineError> {
        self.update_at(Instant::now())
    }

    /// [`update`](Self::update) with an explicit tick time, used for poll
    /// gap detection.
    pub fn update_at(&mut self, now: Instant) -> Result<(), PipelineError> {
        if !self.state.is_initialized() {
            return Err(PipelineError::NotInitialized);
        }

        if let Err(e) = check(self.engine.update(), "update") {
            self.notify_engine_error(&e);
        }

        if self.state.is_recording() {
            self.process_recording(now);
        }
        Ok(())
    }

    /// Open a loop buffer, start capture into it and reset the cursors.
    pub fn begin_recording(&mut self) -> Result<(), PipelineError> {
        self.begin_recording_at(Instant::now())
    }

    /// [`begin_recording`](Self::begin_recording) with an explicit start
    /// time, from which the first poll's gap is measured.
    pub fn begin_recording_at(&mut self, now: Instant) -> Result<(), PipelineError> {
        if !self.state.is_initialized() {
            return Err(PipelineError::NotInitialized);
        }
        if self.state.is_recording() {
            return Err(PipelineError::AlreadyRecording);
        }

        let format = self.config.loop_buffer_format();
        let device = self.config.record_device;
        let sound = check(self.engine.create_loop_buffer(&format), "create_loop_buffer")?;
        let length = match check(self.engine.sound_length(sound), "sound_length") {
            Ok(length) if length > 0 => length,
            _ => format.length_frames,
        };

        let mut session = CaptureSession::new(
            sound,
            device,
            self.config.ingestion,
            length,
            Duration::from_secs_f64(self.config.loop_duration_secs),
            now,
        );

        if self.config.ingestion == IngestionMode::Push {
            let (written, overwritten) = {
                let ring = self.ring.lock();
                (ring.total_written(), ring.total_overwritten())
            };
            let writer = RingWriter::new(Arc::clone(&self.ring));
            let callback = session.push_callback(writer, written, overwritten);
            if let Err(e) = check(
                self.engine.set_capture_callback(sound, callback),
                "set_capture_callback",
            ) {
                self.discard_sound(sound);
                return Err(e);
            }
        }

        if let Err(e) = check(self.engine.record_start(device, sound, true), "record_start") {
            self.discard_sound(sound);
            return Err(e);
        }

        log::debug!("Recording started: {} frame loop on device {}", length, device);
        self.session = Some(session);
        self.set_state(PipelineState::Recording);
        Ok(())
    }

    /// Stop capture and append the recording to the collection.
    ///
    /// Drains whatever the device wrote since the last tick first.
    pub fn end_recording(&mut self) -> Result<RecordedSound, PipelineError> {
        if !self.state.is_initialized() {
            return Err(PipelineError::NotInitialized);
        }
        if !self.state.is_recording() {
            return Err(PipelineError::NotRecording);
        }

        self.process_recording(Instant::now());
        let device = self.config.record_device;
        if let Err(e) = check(self.engine.record_stop(device), "record_stop") {
            self.notify_engine_error(&e);
        }

        let Some(mut session) = self.session.take() else {
            self.set_state(PipelineState::Idle);
            return Err(PipelineError::NotRecording);
        };
        session.finish();
        if session.mode() == IngestionMode::Push {
            let cleared = check(
                self.engine.clear_capture_callback(session.sound()),
                "clear_capture_callback",
            );
            if let Err(e) = cleared {
                self.notify_engine_error(&e);
            }
        }
        self.last_diagnostics = session.diagnostics().clone();

        let recording = RecordedSound::new(
            session.sound(),
            session.total_decoded_samples(),
            self.config.sample_rate,
            self.config.channels,
        );
        log::info!(
            "Recording finished: {} ({} samples)",
            recording.elapsed,
            recording.total_decoded_samples
        );
        self.playback.push(recording.clone());
        self.set_state(PipelineState::Idle);

        if let Some(ref delegate) = self.delegate {
            delegate.on_recording_finished(&recording);
        }
        Ok(recording)
    }

    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    /// Create an effect with its kind's default parameters. Returns its
    /// index in the chain.
    pub fn create_effect(&mut self, kind: EffectKind) -> Result<usize, PipelineError> {
        self.create_effect_with(EffectPreset::default_for(kind))
    }

    pub fn create_effect_with(&mut self, preset: EffectPreset) -> Result<usize, PipelineError> {
        if !self.state.is_initialized() {
            return Err(PipelineError::NotInitialized);
        }
        let result = self.effects.create(&mut self.engine, preset);
        if let Err(ref e) = result {
            self.notify_engine_error(e);
        }
        result
    }

    /// Make `index` the active effect, attaching it to the current output
    /// channel straight away.
    pub fn set_active_effect(&mut self, index: usize) -> Result<(), PipelineError> {
        if !self.state.is_initialized() {
            return Err(PipelineError::NotInitialized);
        }
        let channel = self.playback.channel();
        self.effects.set_active(&mut self.engine, index, channel)
    }

    /// Play the most recent recording with the active effect.
    pub fn play_recorded_sound(&mut self) -> Result<ChannelHandle, PipelineError> {
        self.play(SoundSelection::MostRecent)
    }

    /// Play the recording at `index` (oldest first) with the active effect.
    pub fn play_recording(&mut self, index: usize) -> Result<ChannelHandle, PipelineError> {
        self.play(SoundSelection::Index(index))
    }

    /// Play a uniformly random recording with the active effect.
    pub fn play_random_sound(&mut self) -> Result<ChannelHandle, PipelineError> {
        self.play(SoundSelection::Random)
    }

    pub fn is_sound_playing(&self) -> bool {
        self.playback.is_playing(&self.engine)
    }

    /// Copy up to `out.len()` captured samples, oldest first. Returns how
    /// many were copied.
    pub fn drain_captured(&self, out: &mut [f32]) -> usize {
        self.ring.lock().read_available(out)
    }

    /// Handle to the capture ring for a consumer on another thread.
    pub fn ring_buffer(&self) -> SharedRingBuffer<N> {
        Arc::clone(&self.ring)
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn recordings(&self) -> &[RecordedSound] {
        self.playback.recordings()
    }

    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    pub fn current_channel(&self) -> Option<ChannelHandle> {
        self.playback.channel()
    }

    /// Counters of the active session, or of the last finished one.
    pub fn diagnostics(&self) -> CaptureDiagnostics {
        match &self.session {
            Some(session) => session.diagnostics().clone(),
            None => self.last_diagnostics.clone(),
        }
    }

    /// Recording time of the active session.
    pub fn elapsed(&self) -> Option<ElapsedTime> {
        self.session
            .as_ref()
            .map(|s| s.elapsed(self.config.sample_rate, self.config.channels))
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    // --- Internal helpers ---

    fn play(&mut self, selection: SoundSelection) -> Result<ChannelHandle, PipelineError> {
        if !self.state.is_initialized() {
            return Err(PipelineError::NotInitialized);
        }
        self.playback.play(&mut self.engine, &self.effects, selection)
    }

    fn process_recording(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let mut losses = Vec::new();
        match session.mode() {
            IngestionMode::Pull => {
                let writer = RingWriter::new(Arc::clone(&self.ring));
                match session.poll(&mut self.engine, &writer, now) {
                    Ok(report) => {
                        if report.overwritten > 0 {
                            losses.push(DataLoss::RingOverwrite {
                                samples: report.overwritten as u64,
                            });
                        }
                        if let Some(gap) = report.poll_gap {
                            losses.push(DataLoss::PollOverrun {
                                gap_millis: gap.as_millis() as u64,
                            });
                        }
                    }
                    Err(PipelineError::Engine { operation, source }) => {
                        if let Some(ref delegate) = self.delegate {
                            delegate.on_engine_error(operation, &source);
                        }
                    }
                    Err(e) => log::debug!("Recording poll skipped: {}", e),
                }
            }
            IngestionMode::Push => {
                let (written, overwritten) = {
                    let ring = self.ring.lock();
                    (ring.total_written(), ring.total_overwritten())
                };
                let evicted = session.sync_pushed(written, overwritten);
                if evicted > 0 {
                    losses.push(DataLoss::RingOverwrite { samples: evicted });
                }
            }
        }

        log::trace!(
            "Record buffer pos = {:6} : Record time = {}",
            session.device_cursor(),
            session.elapsed(self.config.sample_rate, self.config.channels)
        );

        for loss in &losses {
            log::warn!("Capture data loss: {:?}", loss);
            if let Some(ref delegate) = self.delegate {
                delegate.on_data_loss(loss);
            }
        }
    }

    /// Release a loop buffer that never became a recording.
    fn discard_sound(&mut self, sound: SoundHandle) {
        let _ = check(self.engine.release_sound(sound), "release_sound");
    }

    fn notify_engine_error(&self, error: &PipelineError) {
        if let (Some(delegate), PipelineError::Engine { operation, source }) =
            (&self.delegate, error)
        {
            delegate.on_engine_error(operation, source);
        }
    }

    fn set_state(&mut self, state: PipelineState) {
        self.state = state;
        log::debug!("Pipeline state: {:?}", state);
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }
}

impl<E: AudioEngine, const N: usize> Drop for CapturePipeline<E, N> {
    fn drop(&mut self) {
        self.destroy();
    }
}
