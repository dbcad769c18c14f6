use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::handles::SoundHandle;

/// Recording time derived from a count of interleaved samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElapsedTime {
    pub minutes: u64,
    pub seconds: u64,
    pub hundredths: u64,
}

impl ElapsedTime {
    /// `total_samples` counts interleaved samples, so it is divided by the
    /// channel count as well as the rate. Rates below 100 Hz report zero
    /// hundredths.
    pub fn from_samples(total_samples: u64, sample_rate: u32, channels: u16) -> Self {
        let rate = u64::from(sample_rate);
        let channels = u64::from(channels);
        if rate == 0 || channels == 0 {
            return Self::default();
        }

        let seconds_total = total_samples / rate / channels;
        let per_hundredth = rate / 100;
        let hundredths = if per_hundredth == 0 {
            0
        } else {
            (total_samples / per_hundredth / channels) % 100
        };

        Self {
            minutes: seconds_total / 60,
            seconds: seconds_total % 60,
            hundredths,
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        (self.minutes * 60 + self.seconds) as f64 + self.hundredths as f64 / 100.0
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}.{:02}",
            self.minutes, self.seconds, self.hundredths
        )
    }
}

/// A finalized recording, appended to the recorded-sound collection by
/// `end_recording`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSound {
    pub id: Uuid,
    pub sound: SoundHandle,
    pub created_at: DateTime<Utc>,
    pub total_decoded_samples: u64,
    pub elapsed: ElapsedTime,
}

impl RecordedSound {
    pub fn new(
        sound: SoundHandle,
        total_decoded_samples: u64,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sound,
            created_at: Utc::now(),
            total_decoded_samples,
            elapsed: ElapsedTime::from_samples(total_decoded_samples, sample_rate, channels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn elapsed_from_stereo_samples() {
        // 65.5 s of 44.1 kHz stereo
        let total = 44_100 * 2 * 65 + 44_100;
        let elapsed = ElapsedTime::from_samples(total, 44_100, 2);

        assert_eq!(elapsed.minutes, 1);
        assert_eq!(elapsed.seconds, 5);
        assert_eq!(elapsed.hundredths, 50);
        assert_eq!(elapsed.to_string(), "01:05.50");
        assert_relative_eq!(elapsed.as_secs_f64(), 65.5);
    }

    #[test]
    fn elapsed_zero_and_degenerate_formats() {
        assert_eq!(ElapsedTime::from_samples(0, 44_100, 2).to_string(), "00:00.00");
        assert_eq!(ElapsedTime::from_samples(1000, 0, 2), ElapsedTime::default());
        assert_eq!(ElapsedTime::from_samples(1000, 44_100, 0), ElapsedTime::default());
        assert_eq!(ElapsedTime::from_samples(160, 80, 1).hundredths, 0);
    }

    #[test]
    fn recorded_sound_serializes() {
        let recorded = RecordedSound::new(SoundHandle(7), 88_200, 44_100, 2);
        assert_eq!(recorded.elapsed.seconds, 1);

        let json = serde_json::to_string(&recorded).unwrap();
        let back: RecordedSound = serde_json::from_str(&json).unwrap();
        assert_eq!(back, recorded);
    }
}
