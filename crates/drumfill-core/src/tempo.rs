//! Tempo and time conversion

use serde::{Deserialize, Serialize};

use crate::error::{DrumfillError, Result};

/// Playback and export tempo in beats (quarter notes) per minute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tempo {
    bpm: f64,
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 110.0 }
    }
}

impl Tempo {
    /// Reject zero, negative and non-finite tempos before they reach timing math
    pub fn new(bpm: f64) -> Result<Self> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(DrumfillError::InvalidTempo(bpm));
        }
        Ok(Self { bpm })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn seconds_per_sixteenth(&self) -> f64 {
        self.seconds_per_beat() / 4.0
    }

    /// Value of the SMF set-tempo meta event
    pub fn microseconds_per_beat(&self) -> u64 {
        (60_000_000.0 / self.bpm).round() as u64
    }

    /// Length of `bars` bars of 4/4 in seconds
    pub fn bar_secs(&self, bars: usize) -> f64 {
        bars as f64 * 4.0 * self.seconds_per_beat()
    }
}

impl TryFrom<f64> for Tempo {
    type Error = DrumfillError;

    fn try_from(bpm: f64) -> Result<Self> {
        Self::new(bpm)
    }
}

impl From<Tempo> for f64 {
    fn from(tempo: Tempo) -> Self {
        tempo.bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_degenerate_bpm() {
        assert!(Tempo::new(0.0).is_err());
        assert!(Tempo::new(-120.0).is_err());
        assert!(Tempo::new(f64::NAN).is_err());
        assert!(Tempo::new(f64::INFINITY).is_err());
        assert!(Tempo::new(0.5).is_ok());
    }

    #[test]
    fn test_conversions() {
        let tempo = Tempo::new(120.0).unwrap();
        assert_eq!(tempo.seconds_per_sixteenth(), 0.125);
        assert_eq!(tempo.microseconds_per_beat(), 500_000);
        assert_eq!(tempo.bar_secs(2), 4.0);

        // 60e6 / 110 = 545454.54...
        assert_eq!(Tempo::new(110.0).unwrap().microseconds_per_beat(), 545_455);
    }
}
