//! Generation parameters

use serde::{Deserialize, Serialize};

use crate::error::{DrumfillError, Result};

/// Musical style driving both the generator and the synth voicing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    #[default]
    Acoustic,
    Electronic,
    Jazz,
    Metal,
    Funk,
}

impl Genre {
    pub const ALL: [Self; 5] = [
        Self::Acoustic,
        Self::Electronic,
        Self::Jazz,
        Self::Metal,
        Self::Funk,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Acoustic => "acoustic",
            Self::Electronic => "electronic",
            Self::Jazz => "jazz",
            Self::Metal => "metal",
            Self::Funk => "funk",
        }
    }

    /// Label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Self::Acoustic => "Rock / Pop",
            Self::Electronic => "Trap / EDM",
            Self::Jazz => "Jazz / Fusion",
            Self::Metal => "Metal",
            Self::Funk => "Funk",
        }
    }
}

/// Whether to produce a repeating groove or a one-bar fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Groove,
    #[default]
    Fill,
}

/// Validated generator input. Percentages are 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawParameters")]
pub struct GenerationParameters {
    pub genre: Genre,
    pub complexity: u8,
    pub intensity: u8,
    pub fill_amount: u8,
    pub mode: Mode,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            genre: Genre::Acoustic,
            complexity: 60,
            intensity: 70,
            fill_amount: 25,
            mode: Mode::Fill,
        }
    }
}

impl GenerationParameters {
    /// Build parameters, rejecting percentages outside 0-100
    pub fn new(
        genre: Genre,
        complexity: i64,
        intensity: i64,
        fill_amount: i64,
        mode: Mode,
    ) -> Result<Self> {
        Ok(Self {
            genre,
            complexity: percent("complexity", complexity)?,
            intensity: percent("intensity", intensity)?,
            fill_amount: percent("fill_amount", fill_amount)?,
            mode,
        })
    }

    pub fn groove(genre: Genre, complexity: i64, intensity: i64) -> Result<Self> {
        Self::new(genre, complexity, intensity, 0, Mode::Groove)
    }

    pub fn fill(genre: Genre, complexity: i64, intensity: i64, fill_amount: i64) -> Result<Self> {
        Self::new(genre, complexity, intensity, fill_amount, Mode::Fill)
    }

    /// Fill length in steps; always 0 in groove mode
    pub fn fill_steps(&self) -> usize {
        match self.mode {
            Mode::Groove => 0,
            Mode::Fill => self.fill_amount.min(100) as usize * 16 / 100,
        }
    }

    /// First step of the fill region (16 when there is no fill)
    pub fn fill_start(&self) -> usize {
        16 - self.fill_steps()
    }

    /// Groove skeleton index: 0, 1 or 2
    pub fn variant(&self) -> usize {
        (self.complexity.min(100) as usize * 3 / 100).min(2)
    }
}

/// Unchecked wire form
#[derive(Deserialize)]
struct RawParameters {
    genre: Genre,
    complexity: i64,
    intensity: i64,
    fill_amount: i64,
    mode: Mode,
}

impl TryFrom<RawParameters> for GenerationParameters {
    type Error = DrumfillError;

    fn try_from(raw: RawParameters) -> Result<Self> {
        Self::new(raw.genre, raw.complexity, raw.intensity, raw.fill_amount, raw.mode)
    }
}

fn percent(name: &'static str, value: i64) -> Result<u8> {
    if !(0..=100).contains(&value) {
        return Err(DrumfillError::InvalidParameter { name, value });
    }
    Ok(value as u8)
}
