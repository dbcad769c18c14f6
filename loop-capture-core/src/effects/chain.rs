use crate::models::error::{check, PipelineError};
use crate::models::handles::{ChannelHandle, EffectHandle};
use crate::traits::engine::AudioEngine;

use super::preset::{EffectKind, EffectPreset};

/// An engine-side effect instance and the preset it was created from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectEntry {
    pub handle: EffectHandle,
    pub preset: EffectPreset,
}

impl EffectEntry {
    pub fn kind(&self) -> EffectKind {
        self.preset.kind()
    }
}

/// Ordered effect instances plus the index of the one attached at playback.
///
/// The entry list is the source of truth for what exists: an effect the
/// engine failed to create is never added. `active_index` is always in range
/// once the chain is non-empty.
#[derive(Debug, Default)]
pub struct EffectChain {
    entries: Vec<EffectEntry>,
    active_index: usize,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate `preset` on the engine and append it. Returns the new
    /// entry's index.
    pub fn create<E: AudioEngine>(
        &mut self,
        engine: &mut E,
        preset: EffectPreset,
    ) -> Result<usize, PipelineError> {
        let handle = check(
            engine.create_effect(preset.kind(), &preset.parameters()),
            "create_effect",
        )?;
        self.entries.push(EffectEntry { handle, preset });
        log::debug!(
            "Created {} effect at index {}",
            preset.kind(),
            self.entries.len() - 1
        );
        Ok(self.entries.len() - 1)
    }

    /// Select the active entry and, if `channel` is given, attach it there
    /// right away.
    ///
    /// An out-of-range index or a failed attach leaves the selection as it
    /// was.
    pub fn set_active<E: AudioEngine>(
        &mut self,
        engine: &mut E,
        index: usize,
        channel: Option<ChannelHandle>,
    ) -> Result<(), PipelineError> {
        let entry = self
            .entries
            .get(index)
            .ok_or(PipelineError::EffectIndexOutOfRange {
                index,
                len: self.entries.len(),
            })?;

        if let Some(channel) = channel {
            check(engine.attach_effect(channel, entry.handle), "attach_effect")?;
        }
        self.active_index = index;
        Ok(())
    }

    /// Attach the active entry to `channel`. An empty chain is a no-op that
    /// reports [`PipelineError::EffectChainEmpty`].
    pub fn attach_active<E: AudioEngine>(
        &self,
        engine: &mut E,
        channel: ChannelHandle,
    ) -> Result<(), PipelineError> {
        let entry = self.active().ok_or(PipelineError::EffectChainEmpty)?;
        check(engine.attach_effect(channel, entry.handle), "attach_effect")
    }

    pub fn active(&self) -> Option<&EffectEntry> {
        self.entries.get(self.active_index)
    }

    pub fn active_index(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.active_index)
    }

    pub fn entries(&self) -> &[EffectEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every instance on the engine and empty the chain.
    pub fn release_all<E: AudioEngine>(&mut self, engine: &mut E) {
        for entry in self.entries.drain(..) {
            // Failures are logged by `check`; nothing else to undo.
            let _ = check(engine.release_effect(entry.handle), "release_effect");
        }
        self.active_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::simulated::{SimOperation, SimulatedEngine};

    fn ready_engine() -> SimulatedEngine {
        let mut engine = SimulatedEngine::new();
        engine.init(32).unwrap();
        engine
    }

    #[test]
    fn create_appends_in_order() {
        let mut engine = ready_engine();
        let mut chain = EffectChain::new();

        assert_eq!(chain.create(&mut engine, EffectKind::Reverb.into()), Ok(0));
        assert_eq!(chain.create(&mut engine, EffectKind::PitchShift.into()), Ok(1));

        let kinds: Vec<EffectKind> = chain.entries().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, [EffectKind::Reverb, EffectKind::PitchShift]);
        assert_eq!(chain.active_index(), Some(0));
    }

    #[test]
    fn failed_creation_appends_nothing() {
        let mut engine = ready_engine();
        engine.fail(SimOperation::CreateEffect);
        let mut chain = EffectChain::new();

        let err = chain
            .create(&mut engine, EffectKind::Distortion.into())
            .unwrap_err();

        assert!(!err.is_precondition());
        assert!(chain.is_empty());
        assert_eq!(chain.active_index(), None);
    }

    #[test]
    fn set_active_out_of_range_keeps_selection() {
        let mut engine = ready_engine();
        let mut chain = EffectChain::new();
        chain.create(&mut engine, EffectKind::Reverb.into()).unwrap();
        chain.create(&mut engine, EffectKind::Distortion.into()).unwrap();
        chain.set_active(&mut engine, 1, None).unwrap();

        let err = chain.set_active(&mut engine, 2, None).unwrap_err();

        assert_eq!(err, PipelineError::EffectIndexOutOfRange { index: 2, len: 2 });
        assert_eq!(chain.active_index(), Some(1));
    }

    #[test]
    fn set_active_attaches_to_channel_immediately() {
        let mut engine = ready_engine();
        let mut chain = EffectChain::new();
        chain.create(&mut engine, EffectKind::Reverb.into()).unwrap();
        chain.create(&mut engine, EffectKind::PitchShift.into()).unwrap();

        let sound = engine
            .create_loop_buffer(&crate::PipelineConfig::default().loop_buffer_format())
            .unwrap();
        let channel = engine.play_sound(sound).unwrap();

        chain.set_active(&mut engine, 1, Some(channel)).unwrap();

        assert_eq!(engine.channel_effect(channel), Some(chain.entries()[1].handle));
    }

    #[test]
    fn attach_with_empty_chain_is_reported() {
        let mut engine = ready_engine();
        let chain = EffectChain::new();

        assert_eq!(
            chain.attach_active(&mut engine, ChannelHandle(1)),
            Err(PipelineError::EffectChainEmpty)
        );
    }

    #[test]
    fn release_all_frees_engine_instances() {
        let mut engine = ready_engine();
        let mut chain = EffectChain::new();
        for kind in EffectKind::ALL {
            chain.create(&mut engine, kind.into()).unwrap();
        }
        assert_eq!(engine.live_effects(), 3);

        chain.release_all(&mut engine);

        assert_eq!(engine.live_effects(), 0);
        assert!(chain.is_empty());
    }
}
