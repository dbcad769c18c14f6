use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::effects::chain::EffectChain;
use crate::models::error::{check, PipelineError};
use crate::models::handles::{ChannelHandle, SoundHandle};
use crate::models::recording::RecordedSound;
use crate::traits::engine::AudioEngine;

/// Which recorded sound to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundSelection {
    MostRecent,
    Index(usize),
    /// Uniformly random over the whole collection.
    Random,
}

/// The recorded-sound collection and the output channel last played on.
///
/// The collection is append-only; sounds leave it only when the pipeline is
/// destroyed.
#[derive(Debug)]
pub struct PlaybackSelector {
    recorded: Vec<RecordedSound>,
    channel: Option<ChannelHandle>,
    rng: StdRng,
}

impl PlaybackSelector {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            recorded: Vec::new(),
            channel: None,
            rng,
        }
    }

    pub fn push(&mut self, recording: RecordedSound) {
        self.recorded.push(recording);
    }

    pub fn recordings(&self) -> &[RecordedSound] {
        &self.recorded
    }

    pub fn channel(&self) -> Option<ChannelHandle> {
        self.channel
    }

    /// Resolve `selection` to a sound without touching the engine.
    pub fn select(&mut self, selection: SoundSelection) -> Result<SoundHandle, PipelineError> {
        let len = self.recorded.len();
        if len == 0 {
            return Err(PipelineError::NoRecordings);
        }

        let index = match selection {
            SoundSelection::MostRecent => len - 1,
            SoundSelection::Index(index) if index < len => index,
            SoundSelection::Index(index) => {
                return Err(PipelineError::RecordingIndexOutOfRange { index, len })
            }
            SoundSelection::Random => self.rng.gen_range(0..len),
        };
        Ok(self.recorded[index].sound)
    }

    /// Play the selected sound on a new channel and attach the chain's
    /// active effect to it.
    ///
    /// No channel is created when the selection fails. A failed effect
    /// attach is logged and the sound keeps playing dry.
    pub fn play<E: AudioEngine>(
        &mut self,
        engine: &mut E,
        effects: &EffectChain,
        selection: SoundSelection,
    ) -> Result<ChannelHandle, PipelineError> {
        let sound = self.select(selection)?;
        let channel = check(engine.play_sound(sound), "play_sound")?;
        self.channel = Some(channel);

        match effects.attach_active(engine, channel) {
            Ok(()) | Err(PipelineError::EffectChainEmpty) => {}
            Err(e) => log::warn!("Playing {:?} without effect: {}", sound, e),
        }
        Ok(channel)
    }

    /// Whether the last-used channel is still playing. False before any
    /// playback, or when the engine cannot say.
    pub fn is_playing<E: AudioEngine>(&self, engine: &E) -> bool {
        let Some(channel) = self.channel else {
            return false;
        };
        check(engine.is_playing(channel), "is_playing").unwrap_or(false)
    }

    /// Stop the last channel, release every recorded sound, and forget both.
    pub fn release_all<E: AudioEngine>(&mut self, engine: &mut E) {
        if let Some(channel) = self.channel.take() {
            let _ = check(engine.stop_channel(channel), "stop_channel");
        }
        for recording in self.recorded.drain(..) {
            let _ = check(engine.release_sound(recording.sound), "release_sound");
        }
    }
}

impl Default for PlaybackSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::effects::preset::EffectKind;
    use crate::engine::simulated::{SimOperation, SimulatedEngine};
    use crate::PipelineConfig;

    fn engine_with_sounds(count: usize) -> (SimulatedEngine, PlaybackSelector) {
        let mut engine = SimulatedEngine::new();
        engine.init(32).unwrap();
        let mut selector = PlaybackSelector::with_seed(7);
        let format = PipelineConfig::default().loop_buffer_format();
        for _ in 0..count {
            let sound = engine.create_loop_buffer(&format).unwrap();
            selector.push(RecordedSound::new(sound, 0, 44_100, 2));
        }
        (engine, selector)
    }

    #[test]
    fn empty_collection_creates_no_channel() {
        let (mut engine, mut selector) = engine_with_sounds(0);
        let effects = EffectChain::new();

        let err = selector
            .play(&mut engine, &effects, SoundSelection::Random)
            .unwrap_err();

        assert_eq!(err, PipelineError::NoRecordings);
        assert_eq!(selector.channel(), None);
        assert_eq!(engine.channels_created(), 0);
        assert!(!selector.is_playing(&engine));
    }

    #[test]
    fn most_recent_and_index_selection() {
        let (_engine, mut selector) = engine_with_sounds(3);
        let sounds: Vec<SoundHandle> = selector.recordings().iter().map(|r| r.sound).collect();

        assert_eq!(selector.select(SoundSelection::MostRecent), Ok(sounds[2]));
        assert_eq!(selector.select(SoundSelection::Index(0)), Ok(sounds[0]));
        assert_eq!(
            selector.select(SoundSelection::Index(3)),
            Err(PipelineError::RecordingIndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn random_selection_covers_whole_collection() {
        let (_engine, mut selector) = engine_with_sounds(4);
        let mut seen = HashSet::new();
        for _ in 0..400 {
            seen.insert(selector.select(SoundSelection::Random).unwrap());
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn play_attaches_active_effect() {
        let (mut engine, mut selector) = engine_with_sounds(1);
        let mut effects = EffectChain::new();
        effects.create(&mut engine, EffectKind::Reverb.into()).unwrap();

        let channel = selector
            .play(&mut engine, &effects, SoundSelection::MostRecent)
            .unwrap();

        assert_eq!(selector.channel(), Some(channel));
        assert_eq!(engine.channel_effect(channel), Some(effects.entries()[0].handle));
        assert!(selector.is_playing(&engine));
    }

    #[test]
    fn play_without_effects_plays_dry() {
        let (mut engine, mut selector) = engine_with_sounds(1);

        let channel = selector
            .play(&mut engine, &EffectChain::new(), SoundSelection::MostRecent)
            .unwrap();

        assert_eq!(engine.channel_effect(channel), None);
        assert!(selector.is_playing(&engine));
    }

    #[test]
    fn failed_play_keeps_previous_channel() {
        let (mut engine, mut selector) = engine_with_sounds(1);
        let effects = EffectChain::new();
        let first = selector
            .play(&mut engine, &effects, SoundSelection::MostRecent)
            .unwrap();

        engine.fail(SimOperation::PlaySound);
        assert!(selector
            .play(&mut engine, &effects, SoundSelection::MostRecent)
            .is_err());

        assert_eq!(selector.channel(), Some(first));
    }

    #[test]
    fn release_all_stops_and_frees() {
        let (mut engine, mut selector) = engine_with_sounds(2);
        let channel = selector
            .play(&mut engine, &EffectChain::new(), SoundSelection::Index(0))
            .unwrap();

        selector.release_all(&mut engine);

        assert!(selector.recordings().is_empty());
        assert_eq!(selector.channel(), None);
        assert_eq!(engine.is_playing(channel), Ok(false));
        assert_eq!(engine.live_sounds(), 0);
    }
}
