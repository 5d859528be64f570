//! Procedural groove and fill generation
//!
//! Generation is a pure function of the parameters and the random source:
//! the same seed and parameters always give the same pattern, and every call
//! draws its embellishments afresh.

mod fill;
mod groove;

use tracing::debug;

use crate::instrument::Instrument;
use crate::params::{GenerationParameters, Mode};
use crate::pattern::{Pattern, PatternBuilder};
use crate::rng::RandomSource;

const KICK: Instrument = Instrument::Kick;
const SNARE: Instrument = Instrument::Snare;
const HAT: Instrument = Instrument::ClosedHiHat;
const TOM_HIGH: Instrument = Instrument::TOM_HIGH;
const TOM_MID: Instrument = Instrument::TOM_MID;
const TOM_LOW: Instrument = Instrument::TOM_LOW;
const CRASH: Instrument = Instrument::Crash;

/// Generate one 16-step bar
pub fn generate(params: &GenerationParameters, rng: &mut impl RandomSource) -> Pattern {
    let bar = match params.mode {
        Mode::Groove => groove::generate(params, rng),
        Mode::Fill => fill::generate(params, rng),
    };
    let pattern = bar.build();

    debug!(
        genre = params.genre.name(),
        mode = ?params.mode,
        complexity = params.complexity,
        intensity = params.intensity,
        fill_amount = params.fill_amount,
        hits = pattern.hit_count(),
        "Generated pattern"
    );

    pattern
}

/// Generate `bars` independent bars and join them into one pattern
pub fn generate_bars(params: &GenerationParameters, bars: usize, rng: &mut impl RandomSource) -> Pattern {
    let mut song = PatternBuilder::new(bars);
    for bar in 0..song.bars() {
        let part = generate(params, rng);
        song.copy_bar(bar, &part);
    }
    song.build()
}
