//! Pattern -> SMF bytes

use tracing::debug;

use crate::pattern::Pattern;
use crate::tempo::Tempo;

use super::vlq::write_vlq;
use super::{
    EncodingError, DRUM_CHANNEL, NOTE_LENGTH_TICKS, TICKS_PER_QUARTER, TICKS_PER_SIXTEENTH,
};

const NOTE_ON: u8 = 0x90 | DRUM_CHANNEL;
const END_OF_TRACK: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];
const MAX_TEMPO_US: u64 = 0xFF_FFFF;

/// Track layout of the written file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmfFormat {
    /// Format 0: tempo and notes merged into one track
    SingleTrack,
    /// Format 1: a tempo-only track followed by the note track
    MultiTrack,
}

impl SmfFormat {
    /// Single bars export as format 0, arrangements as format 1
    pub fn for_pattern(pattern: &Pattern) -> Self {
        if pattern.bars() <= 1 {
            Self::SingleTrack
        } else {
            Self::MultiTrack
        }
    }

    fn header_value(&self) -> u16 {
        match self {
            Self::SingleTrack => 0,
            Self::MultiTrack => 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TimedNote {
    tick: u32,
    note: u8,
    velocity: u8,
}

/// Encode with the format picked by [`SmfFormat::for_pattern`]
pub fn encode(pattern: &Pattern, tempo: Tempo) -> Result<Vec<u8>, EncodingError> {
    encode_with_format(pattern, tempo, SmfFormat::for_pattern(pattern))
}

pub fn encode_with_format(
    pattern: &Pattern,
    tempo: Tempo,
    format: SmfFormat,
) -> Result<Vec<u8>, EncodingError> {
    let notes = timed_notes(pattern)?;
    let tempo_event = tempo_event(tempo)?;

    let tracks = match format {
        SmfFormat::SingleTrack => {
            let mut track = tempo_event.to_vec();
            write_notes(&mut track, &notes)?;
            track.extend_from_slice(&END_OF_TRACK);
            vec![track]
        }
        SmfFormat::MultiTrack => {
            let mut tempo_track = tempo_event.to_vec();
            tempo_track.extend_from_slice(&END_OF_TRACK);

            let mut note_track = Vec::new();
            write_notes(&mut note_track, &notes)?;
            note_track.extend_from_slice(&END_OF_TRACK);
            vec![tempo_track, note_track]
        }
    };

    let mut out = Vec::new();
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&format.header_value().to_be_bytes());
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&TICKS_PER_QUARTER.to_be_bytes());

    for track in &tracks {
        let len = u32::try_from(track.len()).map_err(|_| EncodingError::ChunkTooLong(track.len()))?;
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(track);
    }

    debug!(
        format = format.header_value(),
        notes = notes.len() / 2,
        bytes = out.len(),
        "Encoded MIDI file"
    );

    Ok(out)
}

/// Set-tempo meta event at delta 0
fn tempo_event(tempo: Tempo) -> Result<[u8; 7], EncodingError> {
    let micros = tempo.microseconds_per_beat();
    if micros == 0 || micros > MAX_TEMPO_US {
        return Err(EncodingError::TempoOutOfRange(micros));
    }
    Ok([
        0x00,
        0xFF,
        0x51,
        0x03,
        (micros >> 16) as u8,
        (micros >> 8) as u8,
        micros as u8,
    ])
}

/// Note-on plus zero-velocity note-on pairs, stably sorted by tick
fn timed_notes(pattern: &Pattern) -> Result<Vec<TimedNote>, EncodingError> {
    let mut notes = Vec::with_capacity(pattern.hit_count() * 2);

    for (index, step) in pattern.steps().iter().enumerate() {
        let tick = u32::try_from(index as u64 * TICKS_PER_SIXTEENTH as u64)
            .ok()
            .and_then(|t| t.checked_add(NOTE_LENGTH_TICKS).map(|_| t))
            .ok_or(EncodingError::TickOverflow { step: index })?;

        for (instrument, velocity) in step.hits() {
            let note = instrument.gm_note();
            notes.push(TimedNote { tick, note, velocity: midi_velocity(velocity) });
            notes.push(TimedNote { tick: tick + NOTE_LENGTH_TICKS, note, velocity: 0 });
        }
    }

    notes.sort_by_key(|n| n.tick);
    Ok(notes)
}

fn write_notes(track: &mut Vec<u8>, notes: &[TimedNote]) -> Result<(), EncodingError> {
    let mut last_tick = 0u32;
    for n in notes {
        write_vlq(track, n.tick - last_tick)?;
        last_tick = n.tick;
        track.extend_from_slice(&[NOTE_ON, n.note, n.velocity]);
    }
    Ok(())
}

/// 0.0-1.0 -> 1-127
fn midi_velocity(velocity: f32) -> u8 {
    (velocity * 127.0).clamp(1.0, 127.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use crate::pattern::PatternBuilder;

    fn single_kick() -> Pattern {
        let mut bar = PatternBuilder::new(1);
        bar.set(0, Instrument::Kick, 1.0);
        bar.build()
    }

    #[test]
    fn test_single_bar_exact_bytes() {
        let bytes = encode(&single_kick(), Tempo::new(120.0).unwrap()).unwrap();
        let expected: Vec<u8> = vec![
            0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, // MThd, length 6
            0x00, 0x00, 0x00, 0x01, 0x01, 0xE0,             // format 0, 1 track, 480 tpq
            0x4D, 0x54, 0x72, 0x6B, 0x00, 0x00, 0x00, 0x13, // MTrk, 19 bytes
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20,       // tempo 500000
            0x00, 0x99, 0x24, 0x7F,                         // kick on
            0x3C, 0x99, 0x24, 0x00,                         // kick off, 60 ticks later
            0x00, 0xFF, 0x2F, 0x00,                         // end of track
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_multi_bar_uses_tempo_track() {
        let mut song = PatternBuilder::new(2);
        song.set_all(&[0, 16], Instrument::Kick, 1.0);
        let song = song.build();
        let bytes = encode(&song, Tempo::new(120.0).unwrap()).unwrap();

        assert_eq!(&bytes[8..10], &[0x00, 0x01]);  // format 1
        assert_eq!(&bytes[10..12], &[0x00, 0x02]); // 2 tracks
        // Tempo-only track: tempo event + end of track
        assert_eq!(&bytes[14..22], b"MTrk\x00\x00\x00\x0B");
        assert_eq!(&bytes[22..33], &[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, 0x00, 0xFF, 0x2F, 0x00]);
        assert_eq!(&bytes[33..37], b"MTrk");
        // Second kick lands on tick 1920 = 16 * 120; delta from the first off is 1860
        let notes = &bytes[41..];
        assert_eq!(&notes[..8], &[0x00, 0x99, 0x24, 0x7F, 0x3C, 0x99, 0x24, 0x00]);
        assert_eq!(&notes[8..10], &[0x8E, 0x44]);
    }

    #[test]
    fn test_forced_format() {
        let bytes = encode_with_format(&single_kick(), Tempo::default(), SmfFormat::MultiTrack).unwrap();
        assert_eq!(&bytes[8..12], &[0x00, 0x01, 0x00, 0x02]);
    }

    #[test]
    fn test_velocity_scaling() {
        assert_eq!(midi_velocity(1.0), 127);
        assert_eq!(midi_velocity(0.5), 64);
        assert_eq!(midi_velocity(0.001), 1);
        assert_eq!(midi_velocity(0.7), 89);
    }

    #[test]
    fn test_empty_pattern_is_valid_file() {
        let bytes = encode(&PatternBuilder::new(1).build(), Tempo::default()).unwrap();
        // header + chunk header + tempo + end of track
        assert_eq!(bytes.len(), 14 + 8 + 7 + 4);
    }

    #[test]
    fn test_tempo_out_of_range() {
        let slow = Tempo::new(1.0).unwrap();
        assert!(matches!(
            encode(&single_kick(), slow),
            Err(EncodingError::TempoOutOfRange(60_000_000))
        ));

        // Rounds to zero microseconds per beat
        let fast = Tempo::new(1e20).unwrap();
        assert!(matches!(
            encode(&single_kick(), fast),
            Err(EncodingError::TempoOutOfRange(0))
        ));
    }

    #[test]
    fn test_events_sorted_by_tick() {
        let mut bar = PatternBuilder::new(1);
        bar.set(0, Instrument::Kick, 1.0);
        bar.set(0, Instrument::Crash, 1.0);
        bar.set(1, Instrument::ClosedHiHat, 0.5);
        let bytes = encode(&bar.build(), Tempo::default()).unwrap();
        let track = &bytes[22 + 7..bytes.len() - 4];
        // kick on, crash on, kick off (+60), crash off, hat on (+60), hat off (+60)
        assert_eq!(
            track,
            &[
                0x00, 0x99, 36, 127,
                0x00, 0x99, 49, 127,
                0x3C, 0x99, 36, 0,
                0x00, 0x99, 49, 0,
                0x3C, 0x99, 42, 64,
                0x3C, 0x99, 42, 0,
            ]
        );
    }
}
