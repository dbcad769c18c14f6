//! # loop-capture-core
//!
//! Engine-agnostic loop capture library.
//!
//! Records from an audio engine's looping record buffer into a bounded ring
//! buffer, keeps every finished recording for playback, and applies one of a
//! registry of effects (reverb, distortion, pitch shift) to the output
//! channel. Engines implement the [`AudioEngine`] trait; the crate ships a
//! [`SimulatedEngine`] for tests and demos.
//!
//! ## Architecture
//!
//! ```text
//! loop-capture-core (this crate)
//! ├── traits/       ← AudioEngine, PipelineDelegate
//! ├── models/       ← PipelineConfig, PipelineError, PipelineState, RecordedSound, handles
//! ├── processing/   ← RingBuffer, SampleWriter
//! ├── effects/      ← EffectPreset, EffectChain
//! ├── session/      ← CaptureSession, PlaybackSelector, CapturePipeline
//! └── engine/       ← SimulatedEngine
//! ```

pub mod effects;
pub mod engine;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use effects::chain::{EffectChain, EffectEntry};
pub use effects::preset::{EffectKind, EffectParameter, EffectPreset};
pub use engine::simulated::{SimOperation, SimulatedEngine};
pub use models::config::{IngestionMode, LoopBufferFormat, PipelineConfig, SampleFormat};
pub use models::diagnostics::{CaptureDiagnostics, DataLoss};
pub use models::error::{EngineError, PipelineError};
pub use models::handles::{ChannelHandle, EffectHandle, SoundHandle};
pub use models::recording::{ElapsedTime, RecordedSound};
pub use models::state::PipelineState;
pub use processing::ring_buffer::RingBuffer;
pub use processing::sample_writer::{RingWriter, SampleWriter, SharedRingBuffer};
pub use session::capture::{CaptureSession, DrainReport};
pub use session::pipeline::{CapturePipeline, DEFAULT_RING_CAPACITY};
pub use session::playback::{PlaybackSelector, SoundSelection};
pub use traits::delegate::PipelineDelegate;
pub use traits::engine::{AudioEngine, CaptureCallback, LockedRange};
