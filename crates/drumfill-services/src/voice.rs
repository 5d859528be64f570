//! Drum voice descriptions and the per-instrument synthesis contract

use drumfill_core::{Genre, Instrument, Tom};

/// Level every gain envelope decays towards
pub const DECAY_FLOOR: f64 = 0.01;

/// Exponential ramp from `start` to `end` over `duration` seconds, then held at `end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

impl Ramp {
    pub fn exponential(start: f64, end: f64, duration: f64) -> Self {
        Self { start, end, duration }
    }

    /// Value `elapsed` seconds after the ramp began
    pub fn value_at(&self, elapsed: f64) -> f64 {
        if elapsed <= 0.0 {
            return self.start;
        }
        if elapsed >= self.duration || self.duration <= 0.0 {
            return self.end;
        }
        let progress = elapsed / self.duration;
        if self.start <= 0.0 || self.end <= 0.0 {
            // Exponential curves cannot cross zero; fall back to a straight line
            return self.start + (self.end - self.start) * progress;
        }
        self.start * (self.end / self.start).powf(progress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

impl Waveform {
    /// One cycle over `phase` in [0, 1)
    pub fn sample(&self, phase: f64) -> f64 {
        match self {
            Self::Sine => (phase * std::f64::consts::TAU).sin(),
            Self::Triangle => {
                let p = phase.rem_euclid(1.0);
                if p < 0.25 {
                    4.0 * p
                } else if p < 0.75 {
                    2.0 - 4.0 * p
                } else {
                    4.0 * p - 4.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoiseFilter {
    Highpass { cutoff_hz: f32 },
    Bandpass { center_hz: f32, q: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    Oscillator { waveform: Waveform, frequency: Ramp },
    Noise { filter: NoiseFilter },
}

/// One short-lived sound: a source shaped by a gain envelope between two absolute times
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub instrument: Instrument,
    pub source: Source,
    pub gain: Ramp,
    /// Clock time the voice starts sounding
    pub start: f64,
    /// Clock time the voice is cut
    pub stop: f64,
}

impl Voice {
    pub fn duration(&self) -> f64 {
        self.stop - self.start
    }
}

/// Anything that accepts freshly built voices
pub trait VoiceSink {
    fn push(&mut self, voice: Voice);
}

impl VoiceSink for Vec<Voice> {
    fn push(&mut self, voice: Voice) {
        Vec::push(self, voice);
    }
}

impl<S: VoiceSink + ?Sized> VoiceSink for &mut S {
    fn push(&mut self, voice: Voice) {
        (**self).push(voice);
    }
}

impl VoiceSink for crossbeam_channel::Sender<Voice> {
    fn push(&mut self, voice: Voice) {
        // A closed channel means the engine is gone; dropping the voice is all we can do
        let _ = self.send(voice);
    }
}

/// Turns a hit into voices. Stateless: every trigger builds new voices.
pub struct VoiceSynthesizer;

impl VoiceSynthesizer {
    /// Genre scaling applied to the hit velocity
    pub fn genre_gain(genre: Genre) -> f64 {
        match genre {
            Genre::Electronic => 0.8,
            Genre::Jazz => 0.7,
            Genre::Metal => 1.1,
            Genre::Acoustic | Genre::Funk => 1.0,
        }
    }

    /// Build the voices for one hit at clock time `time` and hand them to `sink`
    pub fn trigger(
        instrument: Instrument,
        genre: Genre,
        time: f64,
        velocity: f32,
        sink: &mut impl VoiceSink,
    ) {
        let v = velocity as f64 * Self::genre_gain(genre);
        match instrument {
            Instrument::Tom(tom) => sink.push(Self::tom(tom, genre, time, v)),
            Instrument::Kick => {
                sink.push(Self::kick(genre, time, v));
                if genre == Genre::Metal {
                    sink.push(Self::kick_click(time, v));
                }
            }
            Instrument::Snare => {
                sink.push(Self::snare_body(genre, time, v));
                sink.push(Self::snare_noise(time, v));
            }
            Instrument::ClosedHiHat => sink.push(Self::hihat(genre, time, v)),
            Instrument::Crash => sink.push(Self::crash(time, v)),
        }
    }

    fn tom(tom: Tom, genre: Genre, time: f64, v: f64) -> Voice {
        let (start_hz, end_hz) = tom.sweep_hz();
        let (frequency, gain) = if genre == Genre::Electronic {
            (
                Ramp::exponential(start_hz * 1.5, end_hz, 0.2),
                Ramp::exponential(v, DECAY_FLOOR, 0.2),
            )
        } else {
            (
                Ramp::exponential(start_hz, end_hz, 0.4),
                Ramp::exponential(0.9 * v, DECAY_FLOOR, 0.4),
            )
        };
        Voice {
            instrument: Instrument::Tom(tom),
            source: Source::Oscillator { waveform: Waveform::Sine, frequency },
            gain,
            start: time,
            stop: time + 0.5,
        }
    }

    fn kick(genre: Genre, time: f64, v: f64) -> Voice {
        let (start_hz, waveform) = match genre {
            Genre::Electronic => (150.0, Waveform::Sine),
            Genre::Metal => (100.0, Waveform::Triangle),
            _ => (120.0, Waveform::Triangle),
        };
        let decay = if genre == Genre::Jazz { 0.3 } else { 0.5 };
        Voice {
            instrument: Instrument::Kick,
            source: Source::Oscillator {
                waveform,
                frequency: Ramp::exponential(start_hz, 0.01, 0.5),
            },
            gain: Ramp::exponential(v, DECAY_FLOOR, decay),
            start: time,
            stop: time + 0.5,
        }
    }

    fn kick_click(time: f64, v: f64) -> Voice {
        Voice {
            instrument: Instrument::Kick,
            source: Source::Oscillator {
                waveform: Waveform::Sine,
                frequency: Ramp::exponential(3000.0, 100.0, 0.05),
            },
            gain: Ramp::exponential(0.5 * v, DECAY_FLOOR, 0.05),
            start: time,
            stop: time + 0.05,
        }
    }

    fn snare_body(genre: Genre, time: f64, v: f64) -> Voice {
        let hz = if genre == Genre::Electronic { 200.0 } else { 180.0 };
        Voice {
            instrument: Instrument::Snare,
            source: Source::Oscillator {
                waveform: Waveform::Triangle,
                frequency: Ramp::exponential(hz, hz, 0.0),
            },
            gain: Ramp::exponential(0.5 * v, DECAY_FLOOR, 0.2),
            start: time,
            stop: time + 0.5,
        }
    }

    fn snare_noise(time: f64, v: f64) -> Voice {
        Voice {
            instrument: Instrument::Snare,
            source: Source::Noise { filter: NoiseFilter::Highpass { cutoff_hz: 1000.0 } },
            gain: Ramp::exponential(0.8 * v, DECAY_FLOOR, 0.2),
            start: time,
            stop: time + 1.0,
        }
    }

    fn hihat(genre: Genre, time: f64, v: f64) -> Voice {
        let (filter, decay) = if genre == Genre::Jazz {
            (NoiseFilter::Bandpass { center_hz: 5000.0, q: 1.0 }, 0.3)
        } else {
            (NoiseFilter::Highpass { cutoff_hz: 7000.0 }, 0.05)
        };
        Voice {
            instrument: Instrument::ClosedHiHat,
            source: Source::Noise { filter },
            gain: Ramp::exponential(0.3 * v, DECAY_FLOOR, decay),
            start: time,
            stop: time + 0.5,
        }
    }

    fn crash(time: f64, v: f64) -> Voice {
        Voice {
            instrument: Instrument::Crash,
            source: Source::Noise { filter: NoiseFilter::Highpass { cutoff_hz: 3000.0 } },
            gain: Ramp::exponential(0.6 * v, DECAY_FLOOR, 1.5),
            start: time,
            stop: time + 2.0,
        }
    }
}
