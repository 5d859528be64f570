//! drumfill-core: drum pattern model, procedural generator and SMF codec

mod error;
pub mod generator;
mod instrument;
pub mod midi;
mod params;
mod pattern;
pub mod rng;
mod tempo;

pub use error::{DrumfillError, Result};
pub use generator::{generate, generate_bars};
pub use instrument::{Instrument, Tom};
pub use params::{GenerationParameters, Genre, Mode};
pub use pattern::{Pattern, PatternBuilder, Step, STEPS_PER_BAR};
pub use rng::{entropy, CycleRandom, RandomSource};
pub use tempo::Tempo;
