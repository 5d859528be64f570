//! Lookahead playback scheduler
//!
//! The scheduler never waits. A host loop calls [`PlaybackScheduler::tick`]
//! every `tick_interval`; each tick dispatches every step whose time falls
//! inside the lookahead window and advances an accumulated event time, so
//! timer jitter in the host loop never turns into tempo drift.

use std::time::Duration;

use drumfill_core::{Genre, Instrument, Pattern, Tempo};
use tracing::{debug, trace};

use crate::clock::AudioClock;
use crate::voice::{VoiceSink, VoiceSynthesizer};

pub const DEFAULT_LOOKAHEAD: Duration = Duration::from_millis(100);
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(25);
/// Most steps one tick will dispatch before skipping ahead to the horizon
pub const MAX_STEPS_PER_TICK: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How far past the clock each tick schedules
    pub lookahead: Duration,
    /// How often the host loop should call `tick`
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead: DEFAULT_LOOKAHEAD,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// What the played pattern came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackContext {
    /// A single generated bar on loop
    #[default]
    Generator,
    /// Several bars joined into one arrangement
    Arrangement,
}

/// One instrument hit at an absolute clock time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub step: usize,
    pub instrument: Instrument,
    pub velocity: f32,
    pub time: f64,
}

pub trait HitSink {
    fn hit(&mut self, hit: Hit);
}

impl HitSink for Vec<Hit> {
    fn hit(&mut self, hit: Hit) {
        self.push(hit);
    }
}

impl<S: HitSink + ?Sized> HitSink for &mut S {
    fn hit(&mut self, hit: Hit) {
        (**self).hit(hit);
    }
}

/// Feeds hits through the synthesizer into a voice sink
pub struct SynthSink<'a, S: VoiceSink> {
    genre: Genre,
    voices: &'a mut S,
}

impl<'a, S: VoiceSink> SynthSink<'a, S> {
    pub fn new(genre: Genre, voices: &'a mut S) -> Self {
        Self { genre, voices }
    }
}

impl<S: VoiceSink> HitSink for SynthSink<'_, S> {
    fn hit(&mut self, hit: Hit) {
        VoiceSynthesizer::trigger(hit.instrument, self.genre, hit.time, hit.velocity, &mut *self.voices);
    }
}

/// Sixteenth-note cursor over a pattern, driven by an injected clock
pub struct PlaybackScheduler<C: AudioClock> {
    clock: C,
    config: SchedulerConfig,
    pattern: Pattern,
    tempo: Tempo,
    context: PlaybackContext,
    state: PlaybackState,
    cursor: usize,
    next_event_time: f64,
    seek_pending: bool,
}

impl<C: AudioClock> PlaybackScheduler<C> {
    pub fn new(clock: C, pattern: Pattern, tempo: Tempo) -> Self {
        Self::with_config(clock, pattern, tempo, SchedulerConfig::default())
    }

    pub fn with_config(clock: C, pattern: Pattern, tempo: Tempo, config: SchedulerConfig) -> Self {
        Self {
            clock,
            config,
            pattern,
            tempo,
            context: PlaybackContext::default(),
            state: PlaybackState::Stopped,
            cursor: 0,
            next_event_time: 0.0,
            seek_pending: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Step the next dispatched event will come from
    pub fn current_step(&self) -> usize {
        self.cursor
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn context(&self) -> PlaybackContext {
        self.context
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Play from the top, or from a bar chosen with `seek` while stopped
    pub fn start(&mut self) {
        if self.is_playing() {
            return;
        }
        if !self.seek_pending {
            self.cursor = 0;
        }
        self.begin();
    }

    /// Play from where `stop` left the cursor
    pub fn resume(&mut self) {
        if self.is_playing() {
            return;
        }
        self.begin();
    }

    fn begin(&mut self) {
        self.seek_pending = false;
        self.cursor %= self.pattern.len().max(1);
        self.next_event_time = self.clock.now();
        self.state = PlaybackState::Playing;
        debug!(step = self.cursor, bpm = self.tempo.bpm(), "Scheduler started");
    }

    /// Stop dispatching. The cursor stays put.
    pub fn stop(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.state = PlaybackState::Stopped;
        debug!(step = self.cursor, "Scheduler stopped");
    }

    /// Dispatch everything inside the lookahead window. Returns the number of hits.
    pub fn tick(&mut self, sink: &mut impl HitSink) -> usize {
        if !self.is_playing() || self.pattern.is_empty() {
            return 0;
        }

        let pattern = self.pattern.clone();
        let step_secs = self.tempo.seconds_per_sixteenth();
        let horizon = self.clock.now() + self.config.lookahead.as_secs_f64();

        let mut hits = 0;
        let mut steps = 0;
        while self.next_event_time < horizon {
            if steps == MAX_STEPS_PER_TICK {
                // Stalled host or a step too short to move the clock
                debug!(skipped_to = horizon, "Scheduler backlog dropped");
                self.next_event_time = horizon;
                break;
            }
            steps += 1;
            if let Some(step) = pattern.step(self.cursor) {
                for (instrument, velocity) in step.hits() {
                    sink.hit(Hit {
                        step: self.cursor,
                        instrument,
                        velocity,
                        time: self.next_event_time,
                    });
                    hits += 1;
                }
            }
            self.next_event_time += step_secs;
            self.cursor = (self.cursor + 1) % pattern.len();
        }

        trace!(hits, step = self.cursor, "Scheduler tick");
        hits
    }

    /// Jump to the start of `bar`. While playing, the lookahead restarts at the
    /// current clock time so the next `tick` plays the new bar at once.
    /// Returns false, changing nothing, when the bar is past the end.
    pub fn seek(&mut self, bar: usize) -> bool {
        let Some(step) = bar.checked_mul(drumfill_core::STEPS_PER_BAR) else {
            return false;
        };
        if step >= self.pattern.len() {
            return false;
        }
        self.cursor = step;
        if self.is_playing() {
            self.next_event_time = self.clock.now();
        } else {
            self.seek_pending = true;
        }
        debug!(bar, "Scheduler seek");
        true
    }

    /// Swap in a new pattern; takes effect on the next tick
    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.cursor %= pattern.len().max(1);
        self.pattern = pattern;
    }

    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
    }

    /// Switch between generator and arrangement playback. A real switch puts
    /// the cursor back on step 0.
    pub fn set_context(&mut self, context: PlaybackContext, pattern: Pattern) {
        if context != self.context {
            self.context = context;
            self.cursor = 0;
            self.seek_pending = false;
            if self.is_playing() {
                self.next_event_time = self.clock.now();
            }
        }
        self.set_pattern(pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::voice::Voice;
    use drumfill_core::PatternBuilder;

    fn eighth_kicks(bars: usize) -> Pattern {
        let mut builder = PatternBuilder::new(bars);
        for step in (0..builder.len()).step_by(2) {
            builder.set(step, Instrument::Kick, 1.0);
        }
        builder.build()
    }

    fn every_step(bars: usize) -> Pattern {
        let mut builder = PatternBuilder::new(bars);
        for step in 0..builder.len() {
            builder.set(step, Instrument::ClosedHiHat, 0.5);
        }
        builder.build()
    }

    fn scheduler(pattern: Pattern, bpm: f64) -> (PlaybackScheduler<VirtualClock>, VirtualClock) {
        let clock = VirtualClock::default();
        let tempo = Tempo::new(bpm).unwrap();
        (PlaybackScheduler::new(clock.clone(), pattern, tempo), clock)
    }

    #[test]
    fn test_no_drift_over_a_minute() {
        let (mut scheduler, clock) = scheduler(eighth_kicks(1), 120.0);
        let mut jitter = fastrand::Rng::with_seed(99);
        let mut hits: Vec<Hit> = Vec::new();

        scheduler.start();
        while clock.now() < 60.0 {
            scheduler.tick(&mut hits);
            // 25 ms nominal, up to 10 ms late
            clock.advance(0.025 + jitter.f64() * 0.010);
        }
        scheduler.tick(&mut hits);

        let in_window = hits.iter().filter(|h| h.time < 60.0).count();
        assert!((239..=241).contains(&in_window), "got {in_window}");
        for pair in hits.windows(2) {
            assert!((pair[1].time - pair[0].time - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tick_is_bounded_when_steps_cannot_advance() {
        let (mut scheduler, clock) = scheduler(every_step(1), 1e20);
        clock.set(5.0);
        let mut hits: Vec<Hit> = Vec::new();

        scheduler.start();
        assert_eq!(scheduler.tick(&mut hits), MAX_STEPS_PER_TICK);
        clock.advance(0.025);
        assert_eq!(scheduler.tick(&mut hits), MAX_STEPS_PER_TICK);
    }

    #[test]
    fn test_stalled_host_skips_backlog() {
        let (mut scheduler, clock) = scheduler(every_step(1), 120.0);
        let mut hits: Vec<Hit> = Vec::new();

        scheduler.start();
        clock.set(100.0);
        assert_eq!(scheduler.tick(&mut hits), MAX_STEPS_PER_TICK);

        hits.clear();
        clock.advance(0.025);
        assert_eq!(scheduler.tick(&mut hits), 1);
        assert!((hits[0].time - 100.1).abs() < 1e-9);
    }

    #[test]
    fn test_times_strictly_increase_across_steps() {
        let mut builder = PatternBuilder::new(1);
        builder.set_all(&[0, 4, 8, 12], Instrument::Kick, 1.0);
        builder.set_all(&[0, 4, 8, 12], Instrument::Crash, 0.6);
        builder.set_all(&[2, 6], Instrument::Snare, 0.8);
        let (mut scheduler, clock) = scheduler(builder.build(), 133.0);

        let mut hits: Vec<Hit> = Vec::new();
        scheduler.start();
        for _ in 0..200 {
            scheduler.tick(&mut hits);
            clock.advance(0.025);
        }

        assert!(!hits.is_empty());
        for pair in hits.windows(2) {
            if pair[0].step == pair[1].step {
                assert_eq!(pair[0].time, pair[1].time);
            } else {
                assert!(pair[1].time > pair[0].time);
            }
        }
    }

    #[test]
    fn test_lookahead_window() {
        let (mut scheduler, clock) = scheduler(every_step(1), 120.0);
        let mut hits: Vec<Hit> = Vec::new();

        scheduler.start();
        assert_eq!(scheduler.tick(&mut hits), 1);
        assert_eq!(scheduler.current_step(), 1);

        clock.advance(0.2);
        // Steps at 0.125 and 0.25 fall before 0.3
        assert_eq!(scheduler.tick(&mut hits), 2);
        assert_eq!(scheduler.current_step(), 3);
        assert_eq!(hits.iter().map(|h| h.step).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_stop_keeps_cursor_and_resume_continues() {
        let (mut scheduler, clock) = scheduler(every_step(1), 120.0);
        let mut hits: Vec<Hit> = Vec::new();

        scheduler.start();
        scheduler.tick(&mut hits);
        clock.advance(0.2);
        scheduler.tick(&mut hits);
        scheduler.stop();
        assert_eq!(scheduler.state(), PlaybackState::Stopped);
        assert_eq!(scheduler.current_step(), 3);

        clock.advance(5.0);
        assert_eq!(scheduler.tick(&mut hits), 0);

        hits.clear();
        scheduler.resume();
        scheduler.tick(&mut hits);
        assert_eq!(hits[0].step, 3);
        assert_eq!(hits[0].time, clock.now());

        scheduler.stop();
        hits.clear();
        scheduler.start();
        scheduler.tick(&mut hits);
        assert_eq!(hits[0].step, 0);
    }

    #[test]
    fn test_seek_jumps_to_bar() {
        let (mut scheduler, clock) = scheduler(every_step(3), 100.0);
        let mut hits: Vec<Hit> = Vec::new();

        scheduler.start();
        scheduler.tick(&mut hits);
        clock.advance(0.1);

        assert!(scheduler.seek(2));
        hits.clear();
        scheduler.tick(&mut hits);
        assert_eq!(hits[0].step, 32);
        assert_eq!(hits[0].time, clock.now());

        assert!(!scheduler.seek(3));
        assert!(!scheduler.seek(usize::MAX));
        assert_eq!(scheduler.current_step(), 33);
    }

    #[test]
    fn test_seek_while_stopped_sets_start_point() {
        let (mut scheduler, _clock) = scheduler(every_step(2), 100.0);
        assert!(scheduler.seek(1));
        scheduler.start();

        let mut hits: Vec<Hit> = Vec::new();
        scheduler.tick(&mut hits);
        assert_eq!(hits[0].step, 16);
    }

    #[test]
    fn test_context_switch_resets_cursor() {
        let (mut scheduler, clock) = scheduler(every_step(1), 120.0);
        let mut hits: Vec<Hit> = Vec::new();
        scheduler.start();
        scheduler.tick(&mut hits);
        clock.advance(0.5);
        scheduler.tick(&mut hits);
        assert!(scheduler.current_step() > 0);

        scheduler.set_context(PlaybackContext::Arrangement, every_step(4));
        assert_eq!(scheduler.current_step(), 0);
        assert_eq!(scheduler.context(), PlaybackContext::Arrangement);

        // Same context: pattern swaps but the cursor stays
        scheduler.tick(&mut hits);
        let step = scheduler.current_step();
        scheduler.set_context(PlaybackContext::Arrangement, every_step(4));
        assert_eq!(scheduler.current_step(), step);
    }

    #[test]
    fn test_pattern_and_tempo_swap_between_ticks() {
        let (mut scheduler, clock) = scheduler(every_step(2), 120.0);
        let mut hits: Vec<Hit> = Vec::new();
        scheduler.start();
        scheduler.tick(&mut hits);

        scheduler.set_tempo(Tempo::new(60.0).unwrap());
        scheduler.set_pattern(eighth_kicks(1));
        clock.advance(1.0);
        hits.clear();
        scheduler.tick(&mut hits);

        assert!(hits.iter().all(|h| h.instrument == Instrument::Kick));
        for pair in hits.windows(2) {
            assert!((pair[1].time - pair[0].time - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_synth_sink_builds_voices() {
        let (mut scheduler, _clock) = scheduler(eighth_kicks(1), 120.0);
        let mut voices: Vec<Voice> = Vec::new();
        scheduler.start();
        {
            let mut sink = SynthSink::new(Genre::Metal, &mut voices);
            scheduler.tick(&mut sink);
        }
        // Metal kick carries a click layer
        assert_eq!(voices.len(), 2);
    }
}
