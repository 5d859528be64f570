//! Error types for drumfill

use thiserror::Error;

use crate::midi::{DecodeError, EncodingError};

#[derive(Debug, Error)]
pub enum DrumfillError {
    #[error("Invalid parameter {name}: {value} (expected 0-100)")]
    InvalidParameter { name: &'static str, value: i64 },
    #[error("Invalid velocity: {0} (expected 0.0-1.0)")]
    InvalidVelocity(f32),
    #[error("Invalid tempo: {0} BPM (must be positive and finite)")]
    InvalidTempo(f64),
    #[error("Invalid pattern length: {0} steps (must be a non-zero multiple of 16)")]
    InvalidPatternLength(usize),
    #[error("MIDI encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("MIDI decoding error: {0}")]
    Decode(#[from] DecodeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DrumfillError>;
