//! Renders scheduled voices into a mono buffer

use std::fmt;

use fundsp::hacker::*;

use crate::voice::{NoiseFilter, Source, Voice, VoiceSink};

/// Filter node for a noise voice
enum FilterNode {
    Highpass(An<FixedSvf<f64, HighpassMode<f64>>>),
    Bandpass(An<FixedSvf<f64, BandpassMode<f64>>>),
}

impl FilterNode {
    fn new(filter: NoiseFilter, sample_rate: f64) -> Self {
        match filter {
            NoiseFilter::Highpass { cutoff_hz } => {
                let mut node = highpass_hz(cutoff_hz, 0.707);
                node.set_sample_rate(sample_rate);
                Self::Highpass(node)
            }
            NoiseFilter::Bandpass { center_hz, q } => {
                let mut node = bandpass_hz(center_hz, q);
                node.set_sample_rate(sample_rate);
                Self::Bandpass(node)
            }
        }
    }

    fn tick(&mut self, sample: f32) -> f32 {
        let input = Frame::from([sample]);
        match self {
            Self::Highpass(node) => node.tick(&input)[0],
            Self::Bandpass(node) => node.tick(&input)[0],
        }
    }
}

/// A voice being rendered
struct ActiveVoice {
    voice: Voice,
    started: bool,
    phase: f64,
    filter: Option<FilterNode>,
}

impl ActiveVoice {
    fn new(voice: Voice, sample_rate: f64) -> Self {
        let filter = match voice.source {
            Source::Noise { filter } => Some(FilterNode::new(filter, sample_rate)),
            Source::Oscillator { .. } => None,
        };
        Self { voice, started: false, phase: 0.0, filter }
    }

    /// Late voices play in full from the first sample we can give them
    fn align_start(&mut self, now: f64) {
        if !self.started && self.voice.start < now {
            let shift = now - self.voice.start;
            self.voice.start += shift;
            self.voice.stop += shift;
        }
    }

    fn is_done(&self, now: f64) -> bool {
        now >= self.voice.stop
    }

    fn tick(&mut self, now: f64, dt: f64, rng: &mut fastrand::Rng) -> f64 {
        if now < self.voice.start || now >= self.voice.stop {
            return 0.0;
        }
        self.started = true;
        let elapsed = now - self.voice.start;

        let raw = match self.voice.source {
            Source::Oscillator { waveform, frequency } => {
                let sample = waveform.sample(self.phase);
                self.phase = (self.phase + frequency.value_at(elapsed) * dt).fract();
                sample
            }
            Source::Noise { .. } => {
                let white = rng.f32() * 2.0 - 1.0;
                match self.filter.as_mut() {
                    Some(filter) => filter.tick(white) as f64,
                    None => white as f64,
                }
            }
        };

        raw * self.voice.gain.value_at(elapsed)
    }
}

/// Mixes any number of voices on a shared clock timeline
pub struct VoiceMixer {
    sample_rate: u32,
    voices: Vec<ActiveVoice>,
    rng: fastrand::Rng,
}

impl fmt::Debug for VoiceMixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceMixer")
            .field("sample_rate", &self.sample_rate)
            .field("active_voices", &self.voices.len())
            .finish()
    }
}

impl VoiceMixer {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_rng(sample_rate, fastrand::Rng::new())
    }

    /// Mixer with a fixed noise source
    pub fn with_rng(sample_rate: u32, rng: fastrand::Rng) -> Self {
        Self { sample_rate, voices: Vec::new(), rng }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn add(&mut self, voice: Voice) {
        self.voices.push(ActiveVoice::new(voice, self.sample_rate as f64));
    }

    /// Fill `out` with the mix starting at clock time `start_time`.
    /// Sample `i` sits at `start_time + i / sample_rate`.
    pub fn render(&mut self, start_time: f64, out: &mut [f32]) {
        let dt = 1.0 / self.sample_rate as f64;
        for voice in &mut self.voices {
            voice.align_start(start_time);
        }

        for (i, sample) in out.iter_mut().enumerate() {
            let now = start_time + i as f64 * dt;
            let mut mix = 0.0f64;
            for voice in &mut self.voices {
                mix += voice.tick(now, dt, &mut self.rng);
            }
            *sample = mix.tanh() as f32;
        }

        let end_time = start_time + out.len() as f64 * dt;
        self.voices.retain(|v| !v.is_done(end_time));
    }
}

impl VoiceSink for VoiceMixer {
    fn push(&mut self, voice: Voice) {
        self.add(voice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::VoiceSynthesizer;
    use drumfill_core::{Genre, Instrument};

    const SR: u32 = 8000;

    fn mixer() -> VoiceMixer {
        VoiceMixer::with_rng(SR, fastrand::Rng::with_seed(3))
    }

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_silence_before_start() {
        let mut mixer = mixer();
        VoiceSynthesizer::trigger(Instrument::Kick, Genre::Acoustic, 0.5, 1.0, &mut mixer);

        let mut before = vec![0.0; 2000];
        mixer.render(0.0, &mut before);
        assert_eq!(peak(&before), 0.0);

        let mut after = vec![0.0; 2000];
        mixer.render(0.5, &mut after);
        assert!(peak(&after) > 0.1);
    }

    #[test]
    fn test_voices_end_after_stop() {
        let mut mixer = mixer();
        VoiceSynthesizer::trigger(Instrument::Snare, Genre::Acoustic, 0.0, 1.0, &mut mixer);
        assert_eq!(mixer.active_voices(), 2);

        // Covers both the 0.5 s body and the 1.0 s noise buffer
        let mut block = vec![0.0; SR as usize + 100];
        mixer.render(0.0, &mut block);
        assert_eq!(mixer.active_voices(), 0);

        let mut tail = vec![0.0; 100];
        mixer.render(1.1, &mut tail);
        assert_eq!(peak(&tail), 0.0);
    }

    #[test]
    fn test_envelope_decays() {
        let mut mixer = mixer();
        VoiceSynthesizer::trigger(Instrument::TOM_MID, Genre::Acoustic, 0.0, 1.0, &mut mixer);
        let mut block = vec![0.0; SR as usize / 2];
        mixer.render(0.0, &mut block);

        let head = peak(&block[..400]);
        let tail = peak(&block[3200..]);
        assert!(head > 0.3);
        assert!(tail < 0.02);
    }

    #[test]
    fn test_late_voice_starts_immediately() {
        let mut mixer = mixer();
        VoiceSynthesizer::trigger(Instrument::Crash, Genre::Acoustic, 0.0, 1.0, &mut mixer);

        // Rendering begins well after the scheduled start, the crash still plays from its attack
        let mut block = vec![0.0; 800];
        mixer.render(3.0, &mut block);
        assert!(peak(&block) > 0.05);
        assert_eq!(mixer.active_voices(), 1);
    }

    #[test]
    fn test_mix_is_soft_clipped() {
        let mut mixer = mixer();
        for _ in 0..20 {
            VoiceSynthesizer::trigger(Instrument::Kick, Genre::Metal, 0.0, 1.0, &mut mixer);
        }
        let mut block = vec![0.0; 1000];
        mixer.render(0.0, &mut block);
        assert!(block.iter().all(|s| s.abs() <= 1.0));
    }
}
