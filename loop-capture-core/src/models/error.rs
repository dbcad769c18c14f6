use std::panic::Location;

use thiserror::Error;

/// Failure reported by an [`AudioEngine`](crate::traits::engine::AudioEngine)
/// implementation.
///
/// `code` carries the engine's native result code when it has one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("engine error [{code}]: {message}")]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_handle(what: &str) -> Self {
        Self::new(-1, format!("invalid {} handle", what))
    }

    pub fn unsupported(what: &str) -> Self {
        Self::new(-2, format!("{} is not supported by this engine", what))
    }
}

/// Errors surfaced by [`CapturePipeline`](crate::CapturePipeline) operations.
///
/// Precondition variants are returned without touching pipeline state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("pipeline is not initialized")]
    NotInitialized,

    #[error("pipeline is already initialized")]
    AlreadyInitialized,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording is in progress")]
    NotRecording,

    #[error("effect index {index} out of range (chain has {len})")]
    EffectIndexOutOfRange { index: usize, len: usize },

    #[error("effect chain is empty")]
    EffectChainEmpty,

    #[error("no recorded sounds")]
    NoRecordings,

    #[error("recording index {index} out of range ({len} recorded)")]
    RecordingIndexOutOfRange { index: usize, len: usize },

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("{operation} failed: {source}")]
    Engine {
        operation: &'static str,
        #[source]
        source: EngineError,
    },
}

impl PipelineError {
    pub fn engine(operation: &'static str, source: EngineError) -> Self {
        Self::Engine { operation, source }
    }

    /// Whether this is a wrong-state / bad-argument call rather than an
    /// engine or configuration failure.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, Self::Engine { .. } | Self::ConfigurationFailed(_))
    }
}

/// Log an engine failure with the calling location and lift it into a
/// [`PipelineError`].
#[track_caller]
pub(crate) fn check<T>(
    result: Result<T, EngineError>,
    operation: &'static str,
) -> Result<T, PipelineError> {
    let location = Location::caller();
    result.map_err(|source| {
        log::error!(
            "{} failed: {} at {}:{}",
            operation,
            source,
            location.file(),
            location.line()
        );
        PipelineError::engine(operation, source)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_display_includes_code() {
        let err = EngineError::new(36, "record device disconnected");
        assert_eq!(err.to_string(), "engine error [36]: record device disconnected");
    }

    #[test]
    fn precondition_classification() {
        assert!(PipelineError::AlreadyRecording.is_precondition());
        assert!(PipelineError::EffectIndexOutOfRange { index: 3, len: 1 }.is_precondition());
        assert!(!PipelineError::engine("lock", EngineError::new(1, "busy")).is_precondition());
        assert!(!PipelineError::ConfigurationFailed("bad".into()).is_precondition());
    }

    #[test]
    fn check_maps_engine_failure() {
        let ok: Result<u32, EngineError> = Ok(4);
        assert_eq!(check(ok, "record_position"), Ok(4));

        let failed: Result<u32, EngineError> = Err(EngineError::new(5, "no device"));
        let err = check(failed, "record_position").unwrap_err();
        assert_eq!(
            err,
            PipelineError::engine("record_position", EngineError::new(5, "no device"))
        );
        assert_eq!(err.to_string(), "record_position failed: engine error [5]: no device");
    }
}
