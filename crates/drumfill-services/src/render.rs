//! Offline rendering to sample buffers and WAV files

use std::path::Path;

use drumfill_core::{Genre, Pattern, Tempo};
use thiserror::Error;
use tracing::info;

use crate::clock::{AudioClock, VirtualClock};
use crate::mixer::VoiceMixer;
use crate::scheduler::{Hit, HitSink, PlaybackScheduler, SchedulerConfig, SynthSink};

const BLOCK_SIZE: usize = 512;
/// Room after the last bar for the longest voice (crash) to ring out
const TAIL_SECS: f64 = 2.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Drops hits at or after `end`
struct Until<S> {
    end: f64,
    inner: S,
}

impl<S: HitSink> HitSink for Until<S> {
    fn hit(&mut self, hit: Hit) {
        if hit.time < self.end {
            self.inner.hit(hit);
        }
    }
}

/// Plays a pattern through the scheduler, synthesizer and mixer on a virtual clock
#[derive(Debug, Clone)]
pub struct OfflineRenderer {
    sample_rate: u32,
    config: SchedulerConfig,
    seed: Option<u64>,
}

impl OfflineRenderer {
    pub fn new(sample_rate: u32) -> Result<Self, RenderError> {
        if sample_rate == 0 {
            return Err(RenderError::InvalidSampleRate(sample_rate));
        }
        Ok(Self { sample_rate, config: SchedulerConfig::default(), seed: None })
    }

    /// Fixed noise seed for reproducible output
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render `loops` passes over `pattern` plus a decay tail, mono
    pub fn render(&self, pattern: &Pattern, tempo: Tempo, genre: Genre, loops: usize) -> Vec<f32> {
        let sample_rate = self.sample_rate as f64;
        let play_secs = tempo.bar_secs(pattern.bars()) * loops.max(1) as f64;
        let total_frames = ((play_secs + TAIL_SECS) * sample_rate).ceil() as usize;
        // Blocks never outrun the lookahead window
        let lookahead_frames = (self.config.lookahead.as_secs_f64() * sample_rate) as usize;
        let block_size = BLOCK_SIZE.min(lookahead_frames).max(1);

        let clock = VirtualClock::default();
        let mut scheduler =
            PlaybackScheduler::with_config(clock.clone(), pattern.clone(), tempo, self.config);
        let mut mixer = match self.seed {
            Some(seed) => VoiceMixer::with_rng(self.sample_rate, fastrand::Rng::with_seed(seed)),
            None => VoiceMixer::new(self.sample_rate),
        };

        let mut out = vec![0.0f32; total_frames];
        scheduler.start();
        for (index, block) in out.chunks_mut(block_size).enumerate() {
            let start = (index * block_size) as f64 / sample_rate;
            clock.set(start);
            if clock.now() < play_secs {
                let mut sink = Until { end: play_secs, inner: SynthSink::new(genre, &mut mixer) };
                scheduler.tick(&mut sink);
            }
            mixer.render(start, block);
        }
        scheduler.stop();

        info!(
            frames = out.len(),
            sample_rate = self.sample_rate,
            bars = pattern.bars() * loops.max(1),
            "Rendered pattern"
        );
        out
    }

    /// Render and write a mono WAV, 32-bit float or 16-bit integer
    pub fn render_to_file(
        &self,
        path: &Path,
        pattern: &Pattern,
        tempo: Tempo,
        genre: Genre,
        loops: usize,
        float: bool,
    ) -> Result<usize, RenderError> {
        let samples = self.render(pattern, tempo, genre, loops);
        write_wav(path, &samples, self.sample_rate, float)?;
        Ok(samples.len())
    }
}

/// Write mono samples to `path`
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, float: bool) -> Result<(), RenderError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: if float { 32 } else { 16 },
        sample_format: if float { hound::SampleFormat::Float } else { hound::SampleFormat::Int },
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        let sample = sample.clamp(-1.0, 1.0);
        if float {
            writer.write_sample(sample)?;
        } else {
            writer.write_sample((sample * i16::MAX as f32) as i16)?;
        }
    }
    writer.finalize()?;

    info!(path = %path.display(), samples = samples.len(), "Wrote WAV file");
    Ok(())
}
