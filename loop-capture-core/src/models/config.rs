use serde::{Deserialize, Serialize};

use super::error::PipelineError;

/// Sample encoding requested for the device loop buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    PcmFloat,
    Pcm16,
}

/// How captured samples reach the ring buffer.
///
/// A pipeline uses exactly one strategy for every session it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionMode {
    /// Poll the record cursor each tick and lock/copy the new range.
    Pull,
    /// Let the engine deliver buffers through a capture callback.
    Push,
}

/// Format of the device-owned loop buffer a recording writes into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopBufferFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
    /// Length of the loop in PCM sample frames.
    pub length_frames: u32,
}

/// Configuration for a capture pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Loop buffer sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Interleaved channel count (default: 2). Valid values: 1, 2.
    pub channels: u16,

    /// Sample encoding of the loop buffer (default: PCM float).
    pub sample_format: SampleFormat,

    /// Loop buffer length in seconds (default: 5).
    pub loop_duration_secs: f64,

    /// Voice count passed to the engine on init (default: 32).
    pub max_channels: u32,

    /// Engine record device index (default: 0).
    pub record_device: i32,

    /// Ingestion strategy (default: pull).
    pub ingestion: IngestionMode,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.sample_rate % 100 != 0 {
            return Err(format!(
                "sample rate {} is not a multiple of 100",
                self.sample_rate
            ));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if !(self.loop_duration_secs > 0.0) {
            return Err("loop duration must be positive".into());
        }
        if self.loop_length_frames() == 0 {
            return Err("loop buffer would hold no samples".into());
        }
        if self.max_channels == 0 {
            return Err("max channels must be at least 1".into());
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            PipelineError::ConfigurationFailed(format!("invalid config json: {}", e))
        })?;
        config
            .validate()
            .map_err(PipelineError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn loop_length_frames(&self) -> u32 {
        (f64::from(self.sample_rate) * self.loop_duration_secs) as u32
    }

    pub fn loop_buffer_format(&self) -> LoopBufferFormat {
        LoopBufferFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            sample_format: self.sample_format,
            length_frames: self.loop_length_frames(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            sample_format: SampleFormat::PcmFloat,
            loop_duration_secs: 5.0,
            max_channels: 32,
            record_device: 0,
            ingestion: IngestionMode::Pull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_five_second_stereo_loop() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.loop_length_frames(), 44100 * 5);

        let format = config.loop_buffer_format();
        assert_eq!(format.channels, 2);
        assert_eq!(format.sample_format, SampleFormat::PcmFloat);
    }

    #[test]
    fn rejects_bad_values() {
        let bad_rate = PipelineConfig {
            sample_rate: 44_123,
            ..Default::default()
        };
        assert!(bad_rate.validate().is_err());

        let bad_channels = PipelineConfig {
            channels: 6,
            ..Default::default()
        };
        assert!(bad_channels.validate().is_err());

        let bad_duration = PipelineConfig {
            loop_duration_secs: 0.0,
            ..Default::default()
        };
        assert!(bad_duration.validate().is_err());

        let nan_duration = PipelineConfig {
            loop_duration_secs: f64::NAN,
            ..Default::default()
        };
        assert!(nan_duration.validate().is_err());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config =
            PipelineConfig::from_json_str(r#"{ "sample_rate": 48000, "ingestion": "push" }"#)
                .unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.ingestion, IngestionMode::Push);
        assert_eq!(config.channels, 2);
        assert_eq!(config.max_channels, 32);
    }

    #[test]
    fn json_rejects_invalid_config() {
        let err = PipelineConfig::from_json_str(r#"{ "channels": 0 }"#).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigurationFailed(_)));

        let err = PipelineConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, PipelineError::ConfigurationFailed(_)));
    }
}
