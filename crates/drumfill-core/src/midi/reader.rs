//! SMF bytes -> note events (and back to a pattern)

use crate::error::Result;
use crate::instrument::Instrument;
use crate::pattern::{Pattern, PatternBuilder, STEPS_PER_BAR};

use super::vlq::decode_vlq;
use super::DecodeError;

/// Longest arrangement `to_pattern` will build
pub const MAX_DECODED_BARS: usize = 1024;

/// A note-on or note-off read from a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmfNote {
    pub track: usize,
    pub tick: u32,
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
    /// False for 0x8n and for zero-velocity 0x9n
    pub on: bool,
}

/// Everything drumfill cares about in a decoded file
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSmf {
    pub format: u16,
    pub ticks_per_quarter: u16,
    pub track_count: usize,
    /// First set-tempo value found, in microseconds per beat
    pub tempo_us: Option<u32>,
    /// All notes from all tracks, stably sorted by tick
    pub notes: Vec<SmfNote>,
}

impl DecodedSmf {
    pub fn bpm(&self) -> Option<f64> {
        self.tempo_us.filter(|&us| us > 0).map(|us| 60_000_000.0 / us as f64)
    }

    pub fn note_ons(&self) -> impl Iterator<Item = &SmfNote> {
        self.notes.iter().filter(|n| n.on)
    }

    pub fn note_offs(&self) -> impl Iterator<Item = &SmfNote> {
        self.notes.iter().filter(|n| !n.on)
    }

    /// Map GM drum note-ons back onto sixteenth-note steps
    pub fn to_pattern(&self) -> Result<Pattern> {
        let ticks_per_step = (self.ticks_per_quarter as u32 / 4).max(1);
        let last_step = self
            .note_ons()
            .map(|n| (n.tick / ticks_per_step) as usize)
            .max()
            .unwrap_or(0);
        let bars = last_step / STEPS_PER_BAR + 1;
        if bars > MAX_DECODED_BARS {
            return Err(DecodeError::TooManyBars(bars).into());
        }

        let mut builder = PatternBuilder::new(bars);
        for n in self.note_ons() {
            let Some(instrument) = Instrument::from_gm_note(n.note) else { continue };
            let step = (n.tick / ticks_per_step) as usize;
            builder.raise(step, instrument, n.velocity as f32 / 127.0);
        }
        Ok(builder.build())
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> std::result::Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(DecodeError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn peek(&self) -> std::result::Result<u8, DecodeError> {
        self.data.get(self.pos).copied().ok_or(DecodeError::UnexpectedEof)
    }

    fn u8(&mut self) -> std::result::Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> std::result::Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn tag(&mut self) -> std::result::Result<[u8; 4], DecodeError> {
        let b = self.take(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    fn vlq(&mut self) -> std::result::Result<u32, DecodeError> {
        let rest = self.data.get(self.pos..).unwrap_or(&[]);
        let (value, read) = decode_vlq(rest)?;
        self.pos += read;
        Ok(value)
    }
}

/// Parse a complete file
pub fn decode(bytes: &[u8]) -> std::result::Result<DecodedSmf, DecodeError> {
    let mut cursor = Cursor::new(bytes);

    let tag = cursor.tag()?;
    if &tag != b"MThd" {
        return Err(DecodeError::BadChunk { expected: "MThd", found: tag });
    }
    let header_len = cursor.u32()?;
    if header_len < 6 {
        return Err(DecodeError::BadHeaderLength(header_len));
    }
    let header = cursor.take(header_len as usize)?;
    let format = u16::from_be_bytes([header[0], header[1]]);
    let track_count = u16::from_be_bytes([header[2], header[3]]) as usize;
    let division = u16::from_be_bytes([header[4], header[5]]);
    if division & 0x8000 != 0 {
        return Err(DecodeError::UnsupportedDivision(division));
    }

    let mut decoded = DecodedSmf {
        format,
        ticks_per_quarter: division,
        track_count,
        tempo_us: None,
        notes: Vec::new(),
    };

    let mut track = 0;
    while track < track_count {
        let tag = cursor.tag()?;
        let len = cursor.u32()? as usize;
        let body = cursor.take(len)?;
        // Unknown chunk types are skipped
        if &tag != b"MTrk" {
            continue;
        }
        read_track(body, track, &mut decoded)?;
        track += 1;
    }

    decoded.notes.sort_by_key(|n| n.tick);
    Ok(decoded)
}

fn read_track(body: &[u8], track: usize, decoded: &mut DecodedSmf) -> std::result::Result<(), DecodeError> {
    let mut cursor = Cursor::new(body);
    let mut tick = 0u32;
    let mut running: Option<u8> = None;

    while !cursor.is_empty() {
        tick = tick.saturating_add(cursor.vlq()?);

        let first = cursor.peek()?;
        let status = if first & 0x80 != 0 {
            cursor.u8()?;
            first
        } else {
            running.ok_or(DecodeError::MissingStatus(first))?
        };

        match status {
            0xFF => {
                running = None;
                let kind = cursor.u8()?;
                let len = cursor.vlq()? as usize;
                let data = cursor.take(len)?;
                match kind {
                    0x51 if len == 3 && decoded.tempo_us.is_none() => {
                        decoded.tempo_us =
                            Some(((data[0] as u32) << 16) | ((data[1] as u32) << 8) | data[2] as u32);
                    }
                    0x2F => break,
                    _ => {}
                }
            }
            0xF0 | 0xF7 => {
                running = None;
                let len = cursor.vlq()? as usize;
                cursor.take(len)?;
            }
            0x80..=0xEF => {
                running = Some(status);
                let kind = status & 0xF0;
                let channel = status & 0x0F;
                let data1 = cursor.u8()?;
                if matches!(kind, 0xC0 | 0xD0) {
                    continue;
                }
                let data2 = cursor.u8()?;
                match kind {
                    0x90 | 0x80 => decoded.notes.push(SmfNote {
                        track,
                        tick,
                        channel,
                        note: data1,
                        velocity: data2,
                        on: kind == 0x90 && data2 > 0,
                    }),
                    _ => {}
                }
            }
            other => return Err(DecodeError::UnexpectedStatus(other)),
        }
    }

    Ok(())
}
