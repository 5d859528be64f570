//! Drum kit pieces and their General MIDI percussion mapping

use serde::{Deserialize, Serialize};

/// GM percussion note numbers (channel 10)
pub const KICK: u8 = 36;       // C1
pub const SNARE: u8 = 38;      // D1
pub const CLOSED_HAT: u8 = 42; // F#1
pub const LOW_TOM: u8 = 43;    // G1, high floor tom
pub const MID_TOM: u8 = 47;    // B1, low-mid tom
pub const CRASH: u8 = 49;      // C#2
pub const HIGH_TOM: u8 = 50;   // D2

/// Tom drums, each with its own pitch sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tom {
    High,
    Mid,
    Low,
}

impl Tom {
    /// Start and end frequency (Hz) of the pitch sweep
    pub fn sweep_hz(&self) -> (f64, f64) {
        match self {
            Self::High => (200.0, 80.0),
            Self::Mid => (140.0, 60.0),
            Self::Low => (90.0, 40.0),
        }
    }
}

/// A single kit piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    Kick,
    Snare,
    ClosedHiHat,
    Tom(Tom),
    Crash,
}

impl Instrument {
    pub const TOM_HIGH: Self = Self::Tom(Tom::High);
    pub const TOM_MID: Self = Self::Tom(Tom::Mid);
    pub const TOM_LOW: Self = Self::Tom(Tom::Low);

    /// Every kit piece, in step storage order
    pub const ALL: [Self; 7] = [
        Self::Kick,
        Self::Snare,
        Self::ClosedHiHat,
        Self::TOM_HIGH,
        Self::TOM_MID,
        Self::TOM_LOW,
        Self::Crash,
    ];

    /// Slot in a step's velocity array
    pub fn index(&self) -> usize {
        match self {
            Self::Kick => 0,
            Self::Snare => 1,
            Self::ClosedHiHat => 2,
            Self::Tom(Tom::High) => 3,
            Self::Tom(Tom::Mid) => 4,
            Self::Tom(Tom::Low) => 5,
            Self::Crash => 6,
        }
    }

    pub fn gm_note(&self) -> u8 {
        match self {
            Self::Kick => KICK,
            Self::Snare => SNARE,
            Self::ClosedHiHat => CLOSED_HAT,
            Self::Tom(Tom::High) => HIGH_TOM,
            Self::Tom(Tom::Mid) => MID_TOM,
            Self::Tom(Tom::Low) => LOW_TOM,
            Self::Crash => CRASH,
        }
    }

    pub fn from_gm_note(note: u8) -> Option<Self> {
        match note {
            KICK => Some(Self::Kick),
            SNARE => Some(Self::Snare),
            CLOSED_HAT => Some(Self::ClosedHiHat),
            HIGH_TOM => Some(Self::TOM_HIGH),
            MID_TOM => Some(Self::TOM_MID),
            LOW_TOM => Some(Self::TOM_LOW),
            CRASH => Some(Self::Crash),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Kick => "Kick",
            Self::Snare => "Snare",
            Self::ClosedHiHat => "Hi-Hat",
            Self::Tom(Tom::High) => "Tom High",
            Self::Tom(Tom::Mid) => "Tom Mid",
            Self::Tom(Tom::Low) => "Tom Low",
            Self::Crash => "Crash",
        }
    }
}
