//! Standard MIDI File export and import for drum patterns

mod reader;
mod vlq;
mod writer;

pub use reader::{decode, DecodedSmf, SmfNote, MAX_DECODED_BARS};
pub use vlq::{decode_vlq, encode_vlq, write_vlq, VLQ_MAX};
pub use writer::{encode, encode_with_format, SmfFormat};

use thiserror::Error;

/// Resolution written to every file header
pub const TICKS_PER_QUARTER: u16 = 480;
pub const TICKS_PER_SIXTEENTH: u32 = TICKS_PER_QUARTER as u32 / 4;
/// Gap between a note-on and its zero-velocity note-on "off"
pub const NOTE_LENGTH_TICKS: u32 = 60;
/// Zero-based channel 9, i.e. GM channel 10
pub const DRUM_CHANNEL: u8 = 9;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Value {0} does not fit a 4-byte variable-length quantity")]
    VarIntOverflow(u32),
    #[error("Tick position of step {step} overflows 32 bits")]
    TickOverflow { step: usize },
    #[error("Tempo of {0} microseconds per beat is outside 1-16777215")]
    TempoOutOfRange(u64),
    #[error("Chunk of {0} bytes exceeds the 32-bit length field")]
    ChunkTooLong(usize),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unexpected end of data")]
    UnexpectedEof,
    #[error("Expected {expected} chunk, found {found:?}")]
    BadChunk { expected: &'static str, found: [u8; 4] },
    #[error("Header length {0} is shorter than 6 bytes")]
    BadHeaderLength(u32),
    #[error("SMPTE time division {0:#06x} is not supported")]
    UnsupportedDivision(u16),
    #[error("Variable-length quantity longer than 4 bytes")]
    VarIntTooLong,
    #[error("Data byte {0:#04x} with no running status")]
    MissingStatus(u8),
    #[error("Unexpected status byte {0:#04x} in track data")]
    UnexpectedStatus(u8),
    #[error("Notes span {0} bars, more than a pattern may hold")]
    TooManyBars(usize),
}
