use crate::models::diagnostics::DataLoss;
use crate::models::error::EngineError;
use crate::models::recording::RecordedSound;
use crate::models::state::PipelineState;

/// Event delegate for pipeline notifications.
///
/// Called synchronously from `update` and the other pipeline operations,
/// on the host's thread. Every method defaults to doing nothing.
pub trait PipelineDelegate: Send + Sync {
    /// Called when the pipeline state changes.
    fn on_state_changed(&self, _state: PipelineState) {}

    /// Called when a recording is finalized and appended to the collection.
    fn on_recording_finished(&self, _recording: &RecordedSound) {}

    /// Called when captured samples were dropped or may have been lost.
    fn on_data_loss(&self, _loss: &DataLoss) {}

    /// Called when the engine rejects an operation the pipeline carried on
    /// past.
    fn on_engine_error(&self, _operation: &'static str, _error: &EngineError) {}
}
