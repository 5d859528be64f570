//! Audio engine: owns the output stream, renders voices and provides the playback clock

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, info};

use crate::audio_io::{AudioOutputError, RealtimeOutputStream};
use crate::clock::AudioClock;
use crate::mixer::VoiceMixer;
use crate::voice::Voice;

#[derive(Debug, Error)]
pub enum AudioEngineError {
    #[error("Audio output error: {0}")]
    Output(#[from] AudioOutputError),
    #[error("Engine not running")]
    NotRunning,
}

/// Engine state shared between the control thread and the audio thread
#[derive(Debug, Default)]
pub struct EngineState {
    /// Frames rendered since the stream opened
    pub frames: AtomicU64,
    /// Device sample rate, 0 until the stream opens
    pub sample_rate: AtomicU32,
    pub running: AtomicBool,
    /// Set by the control thread; the audio thread drops its voices on the next buffer
    pub clear_voices: AtomicBool,
}

impl EngineState {
    /// Seconds of audio rendered so far
    pub fn seconds(&self) -> f64 {
        let sample_rate = self.sample_rate.load(Ordering::SeqCst);
        if sample_rate == 0 {
            return 0.0;
        }
        self.frames.load(Ordering::SeqCst) as f64 / sample_rate as f64
    }
}

/// Clock that follows the rendered audio position
#[derive(Debug, Clone)]
pub struct EngineClock {
    state: Arc<EngineState>,
}

impl AudioClock for EngineClock {
    fn now(&self) -> f64 {
        self.state.seconds()
    }
}

/// The process-wide audio output. The stream opens on the first `start`;
/// later starts resume it.
pub struct AudioEngine {
    state: Arc<EngineState>,
    stream: Option<RealtimeOutputStream>,
    voice_tx: Sender<Voice>,
    voice_rx: Receiver<Voice>,
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine {
    pub fn new() -> Self {
        let (voice_tx, voice_rx) = unbounded();
        Self {
            state: Arc::new(EngineState::default()),
            stream: None,
            voice_tx,
            voice_rx,
        }
    }

    pub fn clock(&self) -> EngineClock {
        EngineClock { state: self.state.clone() }
    }

    /// Voices sent here are mixed by the audio thread at their start times
    pub fn voice_sender(&self) -> Sender<Voice> {
        self.voice_tx.clone()
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.stream.as_ref().map(|s| s.sample_rate())
    }

    /// Open the output stream, or resume it if it is already open
    pub fn start(&mut self) -> Result<(), AudioEngineError> {
        if let Some(stream) = &self.stream {
            stream.resume();
            self.state.running.store(true, Ordering::SeqCst);
            info!("Audio engine resumed");
            return Ok(());
        }

        let state = self.state.clone();
        let voice_rx = self.voice_rx.clone();
        let mut mixer: Option<VoiceMixer> = None;
        let mut mono: Vec<f32> = Vec::new();

        let stream = RealtimeOutputStream::start(move |buffer, sample_rate, channels| {
            Self::render_audio(&state, &voice_rx, &mut mixer, &mut mono, buffer, sample_rate, channels);
        })?;

        self.state.sample_rate.store(stream.sample_rate(), Ordering::SeqCst);
        self.state.running.store(true, Ordering::SeqCst);
        self.stream = Some(stream);
        info!("Audio engine started");
        Ok(())
    }

    /// Pause output, keeping the stream for a later `start`. Voices still
    /// queued or sounding are dropped so they cannot replay on resume.
    pub fn suspend(&self) -> Result<(), AudioEngineError> {
        let stream = self.stream.as_ref().ok_or(AudioEngineError::NotRunning)?;
        stream.pause();
        self.discard_voices();
        self.state.running.store(false, Ordering::SeqCst);
        info!("Audio engine suspended");
        Ok(())
    }

    /// Close the stream
    pub fn stop(&mut self) -> Result<(), AudioEngineError> {
        let stream = self.stream.take().ok_or(AudioEngineError::NotRunning)?;
        stream.pause();
        self.discard_voices();
        self.state.running.store(false, Ordering::SeqCst);
        info!("Audio engine stopped");
        Ok(())
    }

    fn discard_voices(&self) {
        let dropped = self.voice_rx.try_iter().count();
        self.state.clear_voices.store(true, Ordering::SeqCst);
        debug!(dropped, "Discarded queued voices");
    }

    /// Mix pending voices into the interleaved output buffer (audio thread)
    fn render_audio(
        state: &EngineState,
        voice_rx: &Receiver<Voice>,
        mixer: &mut Option<VoiceMixer>,
        mono: &mut Vec<f32>,
        buffer: &mut [f32],
        sample_rate: u32,
        channels: u16,
    ) {
        let channels = (channels as usize).max(1);
        let num_frames = buffer.len() / channels;

        let cleared = state.clear_voices.swap(false, Ordering::SeqCst);
        if cleared || mixer.as_ref().is_some_and(|m| m.sample_rate() != sample_rate) {
            *mixer = None;
        }
        let mixer = mixer.get_or_insert_with(|| VoiceMixer::new(sample_rate));
        for voice in voice_rx.try_iter() {
            mixer.add(voice);
        }

        mono.resize(num_frames, 0.0);
        let start_time = state.frames.load(Ordering::SeqCst) as f64 / sample_rate as f64;
        mixer.render(start_time, &mut mono[..num_frames]);

        for (frame, &sample) in buffer.chunks_mut(channels).zip(mono.iter()) {
            frame.fill(sample);
        }
        state.frames.fetch_add(num_frames as u64, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::VoiceSynthesizer;
    use drumfill_core::{Genre, Instrument};

    #[test]
    fn test_clock_follows_rendered_frames() {
        let state = Arc::new(EngineState::default());
        let clock = EngineClock { state: state.clone() };
        assert_eq!(clock.now(), 0.0);

        state.sample_rate.store(48_000, Ordering::SeqCst);
        state.frames.store(24_000, Ordering::SeqCst);
        assert_eq!(clock.now(), 0.5);
    }

    #[test]
    fn test_render_drains_voices_into_all_channels() {
        let engine = AudioEngine::new();
        let mut sender = engine.voice_sender();
        VoiceSynthesizer::trigger(Instrument::Kick, Genre::Acoustic, 0.0, 1.0, &mut sender);

        let state = EngineState::default();
        let mut mixer = None;
        let mut mono = Vec::new();
        let mut buffer = vec![0.0f32; 2 * 512];
        AudioEngine::render_audio(&state, &engine.voice_rx, &mut mixer, &mut mono, &mut buffer, 8000, 2);

        assert_eq!(state.frames.load(Ordering::SeqCst), 512);
        assert!(buffer.chunks(2).all(|f| f[0] == f[1]));
        assert!(buffer.iter().any(|s| s.abs() > 0.1));
        assert!(engine.voice_rx.is_empty());
    }

    #[test]
    fn test_discarded_voices_do_not_replay() {
        let engine = AudioEngine::new();
        let state = EngineState::default();
        state.sample_rate.store(8000, Ordering::SeqCst);
        let mut mixer = None;
        let mut mono = Vec::new();
        let mut buffer = vec![0.0f32; 400];

        // One buffer in, a kick is sounding and a crash waits inside the lookahead
        let mut sender = engine.voice_sender();
        VoiceSynthesizer::trigger(Instrument::Kick, Genre::Acoustic, 0.0, 1.0, &mut sender);
        VoiceSynthesizer::trigger(Instrument::Crash, Genre::Acoustic, 0.08, 1.0, &mut sender);
        AudioEngine::render_audio(&state, &engine.voice_rx, &mut mixer, &mut mono, &mut buffer, 8000, 1);
        assert!(buffer.iter().any(|s| s.abs() > 0.1));
        // A snare queued but not yet picked up by the audio thread
        VoiceSynthesizer::trigger(Instrument::Snare, Genre::Acoustic, 0.06, 1.0, &mut sender);

        engine.discard_voices();
        assert!(engine.voice_rx.is_empty());

        // Output resumes from the frozen clock with nothing left over
        for _ in 0..10 {
            AudioEngine::render_audio(&state, &engine.voice_rx, &mut mixer, &mut mono, &mut buffer, 8000, 1);
            assert!(buffer.iter().all(|&s| s == 0.0));
        }

        // Voices sent after the flush still play
        let now = state.seconds();
        VoiceSynthesizer::trigger(Instrument::Kick, Genre::Acoustic, now, 1.0, &mut sender);
        AudioEngine::render_audio(&state, &engine.voice_rx, &mut mixer, &mut mono, &mut buffer, 8000, 1);
        assert!(buffer.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn test_suspend_without_stream_fails() {
        let engine = AudioEngine::new();
        assert!(matches!(engine.suspend(), Err(AudioEngineError::NotRunning)));
        assert!(!engine.is_open());
    }
}
