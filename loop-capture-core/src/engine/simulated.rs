//! Deterministic in-memory [`AudioEngine`] for tests and demos.
//!
//! Nothing runs on its own: [`SimulatedEngine::advance`] moves the record
//! cursor and the playing channels forward, writing a counting sample
//! pattern (the n-th captured sample has the value `n`) so a test can check
//! exactly which samples reached the ring buffer.

use std::collections::{HashMap, HashSet};

use crate::effects::preset::{EffectKind, EffectParameter};
use crate::models::config::LoopBufferFormat;
use crate::models::error::EngineError;
use crate::models::handles::{ChannelHandle, EffectHandle, SoundHandle};
use crate::traits::engine::{AudioEngine, CaptureCallback, LockedRange};

const ERR_INJECTED: i32 = 100;
const ERR_NOT_INITIALIZED: i32 = 101;
const ERR_BUSY: i32 = 102;
const ERR_INVALID_PARAM: i32 = 103;
const ERR_NOT_RECORDING: i32 = 104;

/// Engine operations that can be made to fail with [`SimulatedEngine::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOperation {
    Init,
    Update,
    Close,
    CreateLoopBuffer,
    SoundLength,
    ReleaseSound,
    RecordStart,
    RecordStop,
    RecordPosition,
    Lock,
    Unlock,
    SetCaptureCallback,
    ClearCaptureCallback,
    CreateEffect,
    ReleaseEffect,
    PlaySound,
    AttachEffect,
    IsPlaying,
    StopChannel,
}

/// An effect instance as the simulated engine stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimEffect {
    pub kind: EffectKind,
    pub parameters: Vec<EffectParameter>,
}

struct SimSound {
    samples: Vec<f32>,
    channels: u16,
    frames: u32,
    locked: bool,
}

struct SimRecording {
    device: i32,
    sound: SoundHandle,
    looping: bool,
    cursor: u32,
}

struct SimChannel {
    sound: SoundHandle,
    remaining_frames: u64,
    effect: Option<EffectHandle>,
    stopped: bool,
}

pub struct SimulatedEngine {
    initialized: bool,
    frames_per_update: u32,
    next_id: u64,
    next_sample: u64,
    sounds: HashMap<SoundHandle, SimSound>,
    recording: Option<SimRecording>,
    callbacks: HashMap<SoundHandle, CaptureCallback>,
    channels: HashMap<ChannelHandle, SimChannel>,
    channels_created: usize,
    effects: HashMap<EffectHandle, SimEffect>,
    failures: HashSet<SimOperation>,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            initialized: false,
            frames_per_update: 0,
            next_id: 1,
            next_sample: 0,
            sounds: HashMap::new(),
            recording: None,
            callbacks: HashMap::new(),
            channels: HashMap::new(),
            channels_created: 0,
            effects: HashMap::new(),
            failures: HashSet::new(),
        }
    }

    /// Advance by `frames` on every engine `update` call.
    pub fn with_frames_per_update(mut self, frames: u32) -> Self {
        self.frames_per_update = frames;
        self
    }

    /// Make every later call of `operation` fail until cleared.
    pub fn fail(&mut self, operation: SimOperation) {
        self.failures.insert(operation);
    }

    pub fn clear_failure(&mut self, operation: SimOperation) {
        self.failures.remove(&operation);
    }

    /// Capture `frames` frames into the active loop buffer (wrapping at its
    /// end), hand them to any capture callback, and run playing channels
    /// forward by the same amount.
    pub fn advance(&mut self, frames: u32) {
        let mut finished = false;
        if let Some(recording) = self.recording.as_mut() {
            if let Some(sound) = self.sounds.get_mut(&recording.sound) {
                let channels = usize::from(sound.channels);
                let mut captured = Vec::with_capacity(frames as usize * channels);

                for _ in 0..frames {
                    let base = recording.cursor as usize * channels;
                    for slot in &mut sound.samples[base..base + channels] {
                        let value = self.next_sample as f32;
                        self.next_sample += 1;
                        *slot = value;
                        captured.push(value);
                    }
                    recording.cursor += 1;
                    if recording.cursor == sound.frames {
                        recording.cursor = 0;
                        if !recording.looping {
                            finished = true;
                            break;
                        }
                    }
                }

                if let Some(callback) = self.callbacks.get(&recording.sound) {
                    callback(&captured);
                }
            }
        }
        if finished {
            self.recording = None;
        }

        for channel in self.channels.values_mut() {
            channel.remaining_frames = channel.remaining_frames.saturating_sub(u64::from(frames));
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_capturing(&self) -> bool {
        self.recording.is_some()
    }

    pub fn is_locked(&self, sound: SoundHandle) -> bool {
        self.sounds.get(&sound).map(|s| s.locked).unwrap_or(false)
    }

    pub fn has_capture_callback(&self, sound: SoundHandle) -> bool {
        self.callbacks.contains_key(&sound)
    }

    pub fn channel_effect(&self, channel: ChannelHandle) -> Option<EffectHandle> {
        self.channels.get(&channel).and_then(|c| c.effect)
    }

    pub fn effect(&self, effect: EffectHandle) -> Option<&SimEffect> {
        self.effects.get(&effect)
    }

    pub fn live_sounds(&self) -> usize {
        self.sounds.len()
    }

    pub fn live_effects(&self) -> usize {
        self.effects.len()
    }

    /// Channels handed out by `play_sound` since construction.
    pub fn channels_created(&self) -> usize {
        self.channels_created
    }

    /// Samples of a sound, for inspecting what was captured.
    pub fn sound_samples(&self, sound: SoundHandle) -> Option<&[f32]> {
        self.sounds.get(&sound).map(|s| s.samples.as_slice())
    }

    fn ensure(&self, operation: SimOperation) -> Result<(), EngineError> {
        if self.failures.contains(&operation) {
            return Err(EngineError::new(
                ERR_INJECTED,
                format!("{:?} failed (injected)", operation),
            ));
        }
        if operation != SimOperation::Init && !self.initialized {
            return Err(EngineError::new(ERR_NOT_INITIALIZED, "engine not initialized"));
        }
        Ok(())
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for SimulatedEngine {
    fn init(&mut self, max_channels: u32) -> Result<(), EngineError> {
        self.ensure(SimOperation::Init)?;
        if self.initialized {
            return Err(EngineError::new(ERR_BUSY, "engine already initialized"));
        }
        if max_channels == 0 {
            return Err(EngineError::new(ERR_INVALID_PARAM, "max channels must be positive"));
        }
        self.initialized = true;
        Ok(())
    }

    fn update(&mut self) -> Result<(), EngineError> {
        self.ensure(SimOperation::Update)?;
        if self.frames_per_update > 0 {
            self.advance(self.frames_per_update);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        if self.failures.contains(&SimOperation::Close) {
            return self.ensure(SimOperation::Close);
        }
        self.recording = None;
        self.callbacks.clear();
        self.channels.clear();
        self.effects.clear();
        self.sounds.clear();
        self.initialized = false;
        Ok(())
    }

    fn create_loop_buffer(
        &mut self,
        format: &LoopBufferFormat,
    ) -> Result<SoundHandle, EngineError> {
        self.ensure(SimOperation::CreateLoopBuffer)?;
        if format.length_frames == 0 || format.channels == 0 {
            return Err(EngineError::new(ERR_INVALID_PARAM, "empty loop buffer format"));
        }
        let handle = SoundHandle(self.next_id());
        let samples = vec![0.0; format.length_frames as usize * usize::from(format.channels)];
        self.sounds.insert(
            handle,
            SimSound {
                samples,
                channels: format.channels,
                frames: format.length_frames,
                locked: false,
            },
        );
        Ok(handle)
    }

    fn sound_length(&self, sound: SoundHandle) -> Result<u32, EngineError> {
        self.ensure(SimOperation::SoundLength)?;
        self.sounds
            .get(&sound)
            .map(|s| s.frames)
            .ok_or_else(|| EngineError::invalid_handle("sound"))
    }

    fn release_sound(&mut self, sound: SoundHandle) -> Result<(), EngineError> {
        self.ensure(SimOperation::ReleaseSound)?;
        let entry = self
            .sounds
            .get(&sound)
            .ok_or_else(|| EngineError::invalid_handle("sound"))?;
        if entry.locked {
            return Err(EngineError::new(ERR_BUSY, "sound is locked"));
        }
        self.sounds.remove(&sound);
        self.callbacks.remove(&sound);
        if self.recording.as_ref().is_some_and(|r| r.sound == sound) {
            self.recording = None;
        }
        for channel in self.channels.values_mut().filter(|c| c.sound == sound) {
            channel.stopped = true;
        }
        Ok(())
    }

    fn record_start(
        &mut self,
        device: i32,
        sound: SoundHandle,
        looping: bool,
    ) -> Result<(), EngineError> {
        self.ensure(SimOperation::RecordStart)?;
        if !self.sounds.contains_key(&sound) {
            return Err(EngineError::invalid_handle("sound"));
        }
        if self.recording.is_some() {
            return Err(EngineError::new(ERR_BUSY, "device is already recording"));
        }
        self.recording = Some(SimRecording {
            device,
            sound,
            looping,
            cursor: 0,
        });
        Ok(())
    }

    fn record_stop(&mut self, device: i32) -> Result<(), EngineError> {
        self.ensure(SimOperation::RecordStop)?;
        if self.recording.as_ref().is_some_and(|r| r.device == device) {
            self.recording = None;
        }
        Ok(())
    }

    fn record_position(&self, device: i32) -> Result<u32, EngineError> {
        self.ensure(SimOperation::RecordPosition)?;
        match &self.recording {
            Some(recording) if recording.device == device => Ok(recording.cursor),
            _ => Err(EngineError::new(ERR_NOT_RECORDING, "device is not recording")),
        }
    }

    fn lock(
        &mut self,
        sound: SoundHandle,
        offset: u32,
        length: u32,
    ) -> Result<LockedRange<'_>, EngineError> {
        self.ensure(SimOperation::Lock)?;
        let entry = self
            .sounds
            .get_mut(&sound)
            .ok_or_else(|| EngineError::invalid_handle("sound"))?;
        if entry.locked {
            return Err(EngineError::new(ERR_BUSY, "sound is already locked"));
        }
        if offset >= entry.frames || length > entry.frames {
            return Err(EngineError::new(ERR_INVALID_PARAM, "lock range outside sound"));
        }
        entry.locked = true;

        let channels = usize::from(entry.channels);
        let frames = entry.frames as usize;
        let start = offset as usize;
        let end = start + length as usize;
        let samples = &entry.samples;

        let first = &samples[start * channels..end.min(frames) * channels];
        let second: &[f32] = if end > frames {
            &samples[..(end - frames) * channels]
        } else {
            &[]
        };
        Ok(LockedRange { first, second })
    }

    fn unlock(&mut self, sound: SoundHandle) -> Result<(), EngineError> {
        self.ensure(SimOperation::Unlock)?;
        let entry = self
            .sounds
            .get_mut(&sound)
            .ok_or_else(|| EngineError::invalid_handle("sound"))?;
        if !entry.locked {
            return Err(EngineError::new(ERR_INVALID_PARAM, "sound is not locked"));
        }
        entry.locked = false;
        Ok(())
    }

    fn set_capture_callback(
        &mut self,
        sound: SoundHandle,
        callback: CaptureCallback,
    ) -> Result<(), EngineError> {
        self.ensure(SimOperation::SetCaptureCallback)?;
        if !self.sounds.contains_key(&sound) {
            return Err(EngineError::invalid_handle("sound"));
        }
        self.callbacks.insert(sound, callback);
        Ok(())
    }

    fn clear_capture_callback(&mut self, sound: SoundHandle) -> Result<(), EngineError> {
        self.ensure(SimOperation::ClearCaptureCallback)?;
        self.callbacks.remove(&sound);
        Ok(())
    }

    fn create_effect(
        &mut self,
        kind: EffectKind,
        parameters: &[EffectParameter],
    ) -> Result<EffectHandle, EngineError> {
        self.ensure(SimOperation::CreateEffect)?;
        let handle = EffectHandle(self.next_id());
        self.effects.insert(
            handle,
            SimEffect {
                kind,
                parameters: parameters.to_vec(),
            },
        );
        Ok(handle)
    }

    fn release_effect(&mut self, effect: EffectHandle) -> Result<(), EngineError> {
        self.ensure(SimOperation::ReleaseEffect)?;
        self.effects
            .remove(&effect)
            .ok_or_else(|| EngineError::invalid_handle("effect"))?;
        for channel in self.channels.values_mut() {
            if channel.effect == Some(effect) {
                channel.effect = None;
            }
        }
        Ok(())
    }

    fn play_sound(&mut self, sound: SoundHandle) -> Result<ChannelHandle, EngineError> {
        self.ensure(SimOperation::PlaySound)?;
        let frames = self
            .sounds
            .get(&sound)
            .map(|s| s.frames)
            .ok_or_else(|| EngineError::invalid_handle("sound"))?;
        let handle = ChannelHandle(self.next_id());
        self.channels.insert(
            handle,
            SimChannel {
                sound,
                remaining_frames: u64::from(frames),
                effect: None,
                stopped: false,
            },
        );
        self.channels_created += 1;
        Ok(handle)
    }

    fn attach_effect(
        &mut self,
        channel: ChannelHandle,
        effect: EffectHandle,
    ) -> Result<(), EngineError> {
        self.ensure(SimOperation::AttachEffect)?;
        if !self.effects.contains_key(&effect) {
            return Err(EngineError::invalid_handle("effect"));
        }
        let entry = self
            .channels
            .get_mut(&channel)
            .ok_or_else(|| EngineError::invalid_handle("channel"))?;
        entry.effect = Some(effect);
        Ok(())
    }

    fn is_playing(&self, channel: ChannelHandle) -> Result<bool, EngineError> {
        self.ensure(SimOperation::IsPlaying)?;
        self.channels
            .get(&channel)
            .map(|c| !c.stopped && c.remaining_frames > 0)
            .ok_or_else(|| EngineError::invalid_handle("channel"))
    }

    fn stop_channel(&mut self, channel: ChannelHandle) -> Result<(), EngineError> {
        self.ensure(SimOperation::StopChannel)?;
        let entry = self
            .channels
            .get_mut(&channel)
            .ok_or_else(|| EngineError::invalid_handle("channel"))?;
        entry.stopped = true;
        Ok(())
    }
}
