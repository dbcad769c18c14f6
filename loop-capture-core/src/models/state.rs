use serde::Serialize;

/// Pipeline lifecycle.
///
/// State transitions:
/// ```text
/// uninitialized → idle ⇄ recording
///      ↑           │         │
///      └─ destroy ─┴─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Uninitialized,
    Idle,
    Recording,
}

impl PipelineState {
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(!PipelineState::Uninitialized.is_initialized());
        assert!(PipelineState::Idle.is_initialized());
        assert!(PipelineState::Recording.is_initialized());
        assert!(PipelineState::Recording.is_recording());
        assert!(!PipelineState::Idle.is_recording());
    }
}
