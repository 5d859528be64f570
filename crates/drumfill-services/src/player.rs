//! Real-time player: audio engine plus scheduler plus the re-armed tick loop

use std::time::Duration;

use crossbeam_channel::{after, never, select, tick, Receiver, Sender};
use drumfill_core::{Genre, Pattern, Tempo};
use thiserror::Error;
use tracing::{info, warn};

use crate::clock::AudioClock;
use crate::engine::{AudioEngine, AudioEngineError, EngineClock};
use crate::scheduler::{
    HitSink, PlaybackContext, PlaybackScheduler, SchedulerConfig, SynthSink,
};
use crate::voice::Voice;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Audio unavailable: {0}")]
    Engine(#[from] AudioEngineError),
}

/// Long enough for the longest voice (crash) to decay after the last hit
pub const RING_OUT: Duration = Duration::from_millis(2000);

/// Tick `scheduler` every `tick_interval` until `stop` fires or `limit` elapses.
/// Returns the number of hits dispatched.
pub fn drive<C: AudioClock>(
    scheduler: &mut PlaybackScheduler<C>,
    sink: &mut impl HitSink,
    stop: &Receiver<()>,
    limit: Option<Duration>,
) -> usize {
    let ticker = tick(scheduler.config().tick_interval);
    let deadline = limit.map(after).unwrap_or_else(never);

    let mut hits = scheduler.tick(sink);
    loop {
        select! {
            recv(ticker) -> _ => hits += scheduler.tick(sink),
            recv(stop) -> _ => break,
            recv(deadline) -> _ => break,
        }
    }
    hits
}

/// Plays a pattern through the default output device
pub struct Player {
    engine: AudioEngine,
    scheduler: PlaybackScheduler<EngineClock>,
    voices: Sender<Voice>,
    genre: Genre,
}

impl Player {
    pub fn new(pattern: Pattern, tempo: Tempo, genre: Genre, config: SchedulerConfig) -> Self {
        let engine = AudioEngine::new();
        let scheduler = PlaybackScheduler::with_config(engine.clock(), pattern, tempo, config);
        let voices = engine.voice_sender();
        Self { engine, scheduler, voices, genre }
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    pub fn current_step(&self) -> usize {
        self.scheduler.current_step()
    }

    pub fn genre(&self) -> Genre {
        self.genre
    }

    /// Open (first call) or resume the output, then play from the top
    pub fn play(&mut self) -> Result<(), PlayerError> {
        self.engine.start()?;
        self.scheduler.start();
        info!(genre = self.genre.name(), bpm = self.scheduler.tempo().bpm(), "Playback started");
        Ok(())
    }

    /// Like `play` but continues from where `stop` left off
    pub fn resume(&mut self) -> Result<(), PlayerError> {
        self.engine.start()?;
        self.scheduler.resume();
        info!(step = self.current_step(), "Playback resumed");
        Ok(())
    }

    /// Stop scheduling. The output keeps running so voices already sent
    /// decay on their own.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        info!(step = self.current_step(), "Playback stopped");
    }

    /// Stop and pause the output, cutting any voices still sounding
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
        if self.engine.is_open() {
            if let Err(e) = self.engine.suspend() {
                warn!("Could not suspend audio engine: {}", e);
            }
        }
        info!("Player shut down");
    }

    /// One scheduler tick through the synthesizer
    pub fn tick(&mut self) -> usize {
        let mut sink = SynthSink::new(self.genre, &mut self.voices);
        self.scheduler.tick(&mut sink)
    }

    /// Jump to a bar, ticking at once when playing
    pub fn seek(&mut self, bar: usize) -> bool {
        let moved = self.scheduler.seek(bar);
        if moved && self.is_playing() {
            self.tick();
        }
        moved
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.scheduler.set_pattern(pattern);
    }

    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.scheduler.set_tempo(tempo);
    }

    pub fn set_genre(&mut self, genre: Genre) {
        self.genre = genre;
    }

    pub fn set_context(&mut self, context: PlaybackContext, pattern: Pattern) {
        self.scheduler.set_context(context, pattern);
    }

    /// Run the tick loop until `stop` fires or `limit` elapses, then stop
    pub fn run(&mut self, stop: &Receiver<()>, limit: Option<Duration>) -> usize {
        let mut sink = SynthSink::new(self.genre, &mut self.voices);
        let hits = drive(&mut self.scheduler, &mut sink, stop, limit);
        self.stop();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::scheduler::Hit;
    use crossbeam_channel::bounded;
    use drumfill_core::{Instrument, PatternBuilder};

    fn quarter_kicks() -> Pattern {
        let mut builder = PatternBuilder::new(1);
        builder.set_all(&[0, 4, 8, 12], Instrument::Kick, 1.0);
        builder.build()
    }

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            tick_interval: Duration::from_millis(5),
            ..SchedulerConfig::default()
        }
    }

    #[test]
    fn test_drive_stops_on_signal() {
        let clock = VirtualClock::default();
        let tempo = Tempo::new(120.0).unwrap();
        let mut scheduler = PlaybackScheduler::with_config(clock, quarter_kicks(), tempo, fast_config());
        scheduler.start();

        let (stop_tx, stop_rx) = bounded(1);
        stop_tx.send(()).unwrap();

        let mut hits: Vec<Hit> = Vec::new();
        let count = drive(&mut scheduler, &mut hits, &stop_rx, None);
        assert_eq!(count, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_drive_follows_clock_until_deadline() {
        let clock = VirtualClock::default();
        let tempo = Tempo::new(120.0).unwrap();
        let mut scheduler =
            PlaybackScheduler::with_config(clock.clone(), quarter_kicks(), tempo, fast_config());
        scheduler.start();
        // Whole bar visible to the first tick
        clock.set(1.9);

        let (_stop_tx, stop_rx) = bounded::<()>(1);
        let mut hits: Vec<Hit> = Vec::new();
        let count = drive(&mut scheduler, &mut hits, &stop_rx, Some(Duration::from_millis(30)));
        assert_eq!(count, 4);
        assert!(hits.iter().all(|h| h.instrument == Instrument::Kick));
    }

    #[test]
    fn test_player_starts_stopped() {
        let player = Player::new(quarter_kicks(), Tempo::default(), Genre::Funk, SchedulerConfig::default());
        assert!(!player.is_playing());
        assert_eq!(player.current_step(), 0);
        assert_eq!(player.genre(), Genre::Funk);
    }

    #[test]
    fn test_stop_and_shutdown_without_output() {
        let mut player = Player::new(quarter_kicks(), Tempo::default(), Genre::Jazz, SchedulerConfig::default());
        player.stop();
        player.shutdown();
        assert!(!player.is_playing());
        assert!(!player.engine.is_open());
    }
}
