//! Steps and immutable drum patterns

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DrumfillError, Result};
use crate::instrument::Instrument;

/// Sixteenth-note steps in one 4/4 bar
pub const STEPS_PER_BAR: usize = 16;

/// One sixteenth-note slot: a velocity (0.0-1.0) per instrument, 0 = silent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "[f32; 7]", into = "[f32; 7]")]
pub struct Step {
    velocities: [f32; 7],
}

impl Step {
    pub fn get(&self, instrument: Instrument) -> f32 {
        self.velocities[instrument.index()]
    }

    /// Set velocity, clamped into 0.0-1.0. NaN is silence.
    pub fn set(&mut self, instrument: Instrument, velocity: f32) {
        let velocity = if velocity.is_nan() { 0.0 } else { velocity.clamp(0.0, 1.0) };
        self.velocities[instrument.index()] = velocity;
    }

    /// Raise velocity to at least `velocity`
    pub fn raise(&mut self, instrument: Instrument, velocity: f32) {
        let current = self.get(instrument);
        if velocity > current {
            self.set(instrument, velocity);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.velocities.iter().all(|&v| v <= 0.0)
    }

    /// Non-silent instruments with their velocities
    pub fn hits(&self) -> impl Iterator<Item = (Instrument, f32)> + '_ {
        Instrument::ALL
            .into_iter()
            .map(|inst| (inst, self.get(inst)))
            .filter(|&(_, v)| v > 0.0)
    }
}

impl TryFrom<[f32; 7]> for Step {
    type Error = DrumfillError;

    fn try_from(velocities: [f32; 7]) -> Result<Self> {
        if let Some(&bad) = velocities.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(DrumfillError::InvalidVelocity(bad));
        }
        Ok(Self { velocities })
    }
}

impl From<Step> for [f32; 7] {
    fn from(step: Step) -> Self {
        step.velocities
    }
}

/// An immutable sequence of steps, one or more whole bars long.
///
/// Clones share the same buffer, so handing a pattern to the scheduler or the
/// encoder is a cheap snapshot. New patterns come from [`PatternBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Step>", into = "Vec<Step>")]
pub struct Pattern {
    steps: Arc<[Step]>,
}

impl Pattern {
    /// Build from raw steps; the length must be a non-zero multiple of 16
    pub fn from_steps(steps: Vec<Step>) -> Result<Self> {
        if steps.is_empty() || steps.len() % STEPS_PER_BAR != 0 {
            return Err(DrumfillError::InvalidPatternLength(steps.len()));
        }
        Ok(Self { steps: steps.into() })
    }

    /// Flatten several patterns into one arrangement-length pattern
    pub fn concat(parts: &[Pattern]) -> Result<Self> {
        let steps: Vec<Step> = parts
            .iter()
            .flat_map(|p| p.steps.iter().copied())
            .collect();
        Self::from_steps(steps)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn bars(&self) -> usize {
        self.steps.len() / STEPS_PER_BAR
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Copy of one bar as its own pattern
    pub fn bar(&self, index: usize) -> Option<Pattern> {
        let start = index.checked_mul(STEPS_PER_BAR)?;
        let slice = self.steps.get(start..start.checked_add(STEPS_PER_BAR)?)?;
        Some(Self { steps: slice.into() })
    }

    /// Number of non-silent (step, instrument) pairs
    pub fn hit_count(&self) -> usize {
        self.steps.iter().map(|s| s.hits().count()).sum()
    }
}

impl TryFrom<Vec<Step>> for Pattern {
    type Error = DrumfillError;

    fn try_from(steps: Vec<Step>) -> Result<Self> {
        Self::from_steps(steps)
    }
}

impl From<Pattern> for Vec<Step> {
    fn from(pattern: Pattern) -> Self {
        pattern.steps.to_vec()
    }
}

/// Mutable scratch space used while a pattern is being generated
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    steps: Vec<Step>,
}

impl PatternBuilder {
    pub fn new(bars: usize) -> Self {
        Self {
            steps: vec![Step::default(); bars.max(1) * STEPS_PER_BAR],
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn bars(&self) -> usize {
        self.steps.len() / STEPS_PER_BAR
    }

    /// Overwrite bar `bar` with the first bar of `source`
    pub fn copy_bar(&mut self, bar: usize, source: &Pattern) {
        let Some(start) = bar.checked_mul(STEPS_PER_BAR) else { return };
        let Some(end) = start.checked_add(STEPS_PER_BAR) else { return };
        if let Some(slot) = self.steps.get_mut(start..end) {
            slot.copy_from_slice(&source.steps[..STEPS_PER_BAR]);
        }
    }

    pub fn get(&self, step: usize, instrument: Instrument) -> f32 {
        self.steps.get(step).map_or(0.0, |s| s.get(instrument))
    }

    pub fn set(&mut self, step: usize, instrument: Instrument, velocity: f32) {
        if let Some(s) = self.steps.get_mut(step) {
            s.set(instrument, velocity);
        }
    }

    pub fn raise(&mut self, step: usize, instrument: Instrument, velocity: f32) {
        if let Some(s) = self.steps.get_mut(step) {
            s.raise(instrument, velocity);
        }
    }

    /// Set the same velocity on several steps
    pub fn set_all(&mut self, steps: &[usize], instrument: Instrument, velocity: f32) {
        for &step in steps {
            self.set(step, instrument, velocity);
        }
    }

    pub fn build(self) -> Pattern {
        Pattern { steps: self.steps.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_defaults_and_clamp() {
        let mut step = Step::default();
        assert!(step.is_empty());
        for inst in Instrument::ALL {
            assert_eq!(step.get(inst), 0.0);
        }

        step.set(Instrument::Kick, 1.4);
        step.set(Instrument::Snare, -0.2);
        assert_eq!(step.get(Instrument::Kick), 1.0);
        assert_eq!(step.get(Instrument::Snare), 0.0);

        step.set(Instrument::TOM_LOW, f32::NAN);
        assert_eq!(step.get(Instrument::TOM_LOW), 0.0);

        step.raise(Instrument::Kick, 0.5);
        assert_eq!(step.get(Instrument::Kick), 1.0);
        step.raise(Instrument::Crash, 0.5);
        assert_eq!(step.get(Instrument::Crash), 0.5);

        let hits: Vec<_> = step.hits().collect();
        assert_eq!(hits, vec![(Instrument::Kick, 1.0), (Instrument::Crash, 0.5)]);
    }

    #[test]
    fn test_pattern_length_validation() {
        assert!(Pattern::from_steps(vec![Step::default(); 16]).is_ok());
        assert!(Pattern::from_steps(vec![Step::default(); 48]).is_ok());
        assert!(matches!(
            Pattern::from_steps(vec![Step::default(); 15]),
            Err(DrumfillError::InvalidPatternLength(15))
        ));
        assert!(matches!(
            Pattern::from_steps(Vec::new()),
            Err(DrumfillError::InvalidPatternLength(0))
        ));
    }

    #[test]
    fn test_copy_bar_and_bar() {
        let mut a = PatternBuilder::new(1);
        a.set(0, Instrument::Kick, 1.0);
        let mut b = PatternBuilder::new(1);
        b.set(4, Instrument::Snare, 0.8);
        let (a, b) = (a.build(), b.build());

        let mut song = PatternBuilder::new(3);
        assert_eq!(song.bars(), 3);
        for (bar, part) in [&a, &b, &a].into_iter().enumerate() {
            song.copy_bar(bar, part);
        }
        // Out of range bars are ignored
        song.copy_bar(3, &b);
        song.copy_bar(usize::MAX, &b);
        let song = song.build();

        assert_eq!(song.len(), 48);
        assert_eq!(song.bars(), 3);
        assert_eq!(song.step(20).unwrap().get(Instrument::Snare), 0.8);
        assert_eq!(song.bar(1).unwrap(), b);
        assert_eq!(song.bar(2).unwrap(), a);
        assert!(song.bar(3).is_none());

        assert_eq!(Pattern::concat(&[a.clone(), b.clone(), a.clone()]).unwrap(), song);
        assert!(Pattern::concat(&[]).is_err());
    }

    #[test]
    fn test_deserialize_checks_velocities() {
        let step: Step = serde_json::from_str("[1.0, 0.5, 0, 0, 0, 0, 0.25]").unwrap();
        assert_eq!(step.get(Instrument::Kick), 1.0);
        assert_eq!(step.get(Instrument::Crash), 0.25);
        assert_eq!(serde_json::to_string(&step).unwrap(), "[1.0,0.5,0.0,0.0,0.0,0.0,0.25]");

        assert!(serde_json::from_str::<Step>("[1.5, 0, 0, 0, 0, 0, 0]").is_err());
        assert!(serde_json::from_str::<Step>("[0, -0.1, 0, 0, 0, 0, 0]").is_err());
        assert!(serde_json::from_str::<Step>("[0, 0, 0]").is_err());
        assert!(matches!(
            Step::try_from([0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0]),
            Err(DrumfillError::InvalidVelocity(v)) if v == 2.0
        ));

        let mut bar = PatternBuilder::new(1);
        bar.set(3, Instrument::Snare, 0.75);
        let json = serde_json::to_string(&bar.build()).unwrap();
        assert_eq!(serde_json::from_str::<Pattern>(&json).unwrap().step(3).unwrap().get(Instrument::Snare), 0.75);
        assert!(serde_json::from_str::<Pattern>(&json.replacen("0.75", "7.5", 1)).is_err());
    }

    #[test]
    fn test_clone_is_snapshot() {
        let mut builder = PatternBuilder::new(1);
        builder.set(0, Instrument::Kick, 1.0);
        let original = builder.build();
        let snapshot = original.clone();

        let mut next = PatternBuilder::new(1);
        next.set(0, Instrument::Snare, 1.0);
        let replaced = next.build();

        assert_eq!(snapshot, original);
        assert_ne!(snapshot, replaced);
        assert_eq!(snapshot.hit_count(), 1);
    }
}
