use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of effect the engine can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Reverb,
    Distortion,
    PitchShift,
}

impl EffectKind {
    pub const ALL: [EffectKind; 3] = [Self::Reverb, Self::Distortion, Self::PitchShift];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Reverb => "reverb",
            Self::Distortion => "distortion",
            Self::PitchShift => "pitch_shift",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = String;

    /// Accepts `reverb`, `distortion`, `pitch_shift` (also `pitchshift` and
    /// `pitch-shift`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reverb" => Ok(Self::Reverb),
            "distortion" => Ok(Self::Distortion),
            "pitch_shift" | "pitchshift" | "pitch-shift" => Ok(Self::PitchShift),
            other => Err(format!("unknown effect kind: {}", other)),
        }
    }
}

/// One named float parameter handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectParameter {
    pub name: &'static str,
    pub value: f32,
}

/// An effect kind together with the parameters it is created with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectPreset {
    Reverb {
        decay_time_ms: f32,
        early_delay_ms: f32,
        wet_level_db: f32,
    },
    Distortion {
        /// 0.0 (clean) to 1.0 (full drive).
        level: f32,
    },
    PitchShift {
        /// Playback pitch ratio, 1.0 is unchanged.
        pitch: f32,
        fft_size: f32,
    },
}

impl EffectPreset {
    /// Factory keyed by kind.
    pub fn default_for(kind: EffectKind) -> Self {
        match kind {
            EffectKind::Reverb => Self::Reverb {
                decay_time_ms: 1500.0,
                early_delay_ms: 20.0,
                wet_level_db: -6.0,
            },
            EffectKind::Distortion => Self::Distortion { level: 0.5 },
            EffectKind::PitchShift => Self::PitchShift {
                pitch: 1.5,
                fft_size: 1024.0,
            },
        }
    }

    pub fn kind(&self) -> EffectKind {
        match self {
            Self::Reverb { .. } => EffectKind::Reverb,
            Self::Distortion { .. } => EffectKind::Distortion,
            Self::PitchShift { .. } => EffectKind::PitchShift,
        }
    }

    pub fn parameters(&self) -> Vec<EffectParameter> {
        match *self {
            Self::Reverb {
                decay_time_ms,
                early_delay_ms,
                wet_level_db,
            } => vec![
                EffectParameter { name: "decay_time", value: decay_time_ms },
                EffectParameter { name: "early_delay", value: early_delay_ms },
                EffectParameter { name: "wet_level", value: wet_level_db },
            ],
            Self::Distortion { level } => vec![EffectParameter { name: "level", value: level }],
            Self::PitchShift { pitch, fft_size } => vec![
                EffectParameter { name: "pitch", value: pitch },
                EffectParameter { name: "fft_size", value: fft_size },
            ],
        }
    }
}

impl From<EffectKind> for EffectPreset {
    fn from(kind: EffectKind) -> Self {
        Self::default_for(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_matches_kind() {
        for kind in EffectKind::ALL {
            let preset = EffectPreset::default_for(kind);
            assert_eq!(preset.kind(), kind);
            assert!(!preset.parameters().is_empty());
        }
    }

    #[test]
    fn reverb_defaults() {
        let params = EffectPreset::default_for(EffectKind::Reverb).parameters();
        let names: Vec<&str> = params.iter().map(|p| p.name).collect();
        assert_eq!(names, ["decay_time", "early_delay", "wet_level"]);
        assert_eq!(params[0].value, 1500.0);
    }

    #[test]
    fn parse_kind_names() {
        assert_eq!("Reverb".parse::<EffectKind>(), Ok(EffectKind::Reverb));
        assert_eq!(" distortion ".parse::<EffectKind>(), Ok(EffectKind::Distortion));
        assert_eq!("pitch-shift".parse::<EffectKind>(), Ok(EffectKind::PitchShift));
        assert!("chorus".parse::<EffectKind>().is_err());

        for kind in EffectKind::ALL {
            assert_eq!(kind.to_string().parse::<EffectKind>(), Ok(kind));
        }
    }

    #[test]
    fn preset_json_is_tagged_by_kind() {
        let preset: EffectPreset =
            serde_json::from_str(r#"{ "kind": "distortion", "level": 0.8 }"#).unwrap();
        assert_eq!(preset, EffectPreset::Distortion { level: 0.8 });
    }
}
