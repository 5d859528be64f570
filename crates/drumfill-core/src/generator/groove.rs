//! Groove skeletons: three variants per genre, picked by complexity

use crate::params::{GenerationParameters, Genre};
use crate::pattern::PatternBuilder;
use crate::rng::RandomSource;

use super::{CRASH, HAT, KICK, SNARE};

/// Funk kick tables; each variant offers two feels
const FUNK_KICKS: [[&[usize]; 2]; 3] = [
    [&[0, 10], &[0, 7, 10]],
    [&[0, 3, 10], &[0, 6, 10, 11]],
    [&[0, 3, 7, 10, 13], &[0, 2, 6, 10, 15]],
];

const ACOUSTIC_GHOSTS: &[usize] = &[2, 6, 9, 11, 14];
const FUNK_GHOSTS: &[usize] = &[2, 3, 6, 7, 9, 11, 13, 15];
const SWING_RIDE: &[usize] = &[0, 3, 4, 7, 8, 11, 12, 15];
const BOSSA_CLAVE: &[usize] = &[0, 3, 6, 10, 13];
const BLAST_SNARES: &[usize] = &[2, 6, 10, 14];

pub(super) fn generate(params: &GenerationParameters, rng: &mut impl RandomSource) -> PatternBuilder {
    let mut bar = PatternBuilder::new(1);
    let v = params.intensity as f32 / 100.0;
    let variant = params.variant();

    match params.genre {
        Genre::Acoustic => acoustic(&mut bar, variant, params, v, rng),
        Genre::Funk => funk(&mut bar, variant, params, v, rng),
        Genre::Electronic => electronic(&mut bar, variant, params, v, rng),
        Genre::Jazz => jazz(&mut bar, variant, v, rng),
        Genre::Metal => metal(&mut bar, variant, params, v, rng),
    }

    bar
}

fn acoustic(
    bar: &mut PatternBuilder,
    variant: usize,
    params: &GenerationParameters,
    v: f32,
    rng: &mut impl RandomSource,
) {
    eighth_hats(bar, v, rng);

    match variant {
        0 => {
            bar.set_all(&[0, 8], KICK, v);
            bar.set_all(&[4, 12], SNARE, v);
        }
        1 => {
            // Half-time: backbeat on 3, optional pushes into beat 3 and the next bar
            bar.set(0, KICK, v);
            bar.set(8, SNARE, v);
            for step in [6, 14] {
                if rng.chance(0.4) {
                    bar.set(step, KICK, v * 0.8);
                }
            }
        }
        _ => {
            bar.set_all(&[0, 8], KICK, v);
            bar.set_all(&[4, 12], SNARE, v);
            bar.set_all(&[3, 10, 15], KICK, v * 0.8);
        }
    }

    if params.intensity > 50 {
        ghost_snares(bar, ACOUSTIC_GHOSTS, 0.45, v * 0.2, rng);
    }
    if params.intensity > 80 {
        bar.set(0, CRASH, v);
    }
}

fn funk(
    bar: &mut PatternBuilder,
    variant: usize,
    params: &GenerationParameters,
    v: f32,
    rng: &mut impl RandomSource,
) {
    let tables = FUNK_KICKS[variant];
    let kicks = tables[rng.index(tables.len())];
    bar.set_all(kicks, KICK, v);
    bar.set_all(&[4, 12], SNARE, v);

    for step in 0..16 {
        let accent = if step % 2 == 0 { 0.7 } else { 0.4 };
        bar.set(step, HAT, v * accent);
    }

    ghost_snares(bar, FUNK_GHOSTS, 0.55, v * 0.25, rng);

    if params.complexity > 60 && rng.chance(0.5) {
        bar.set(0, CRASH, v);
    }
}

fn electronic(
    bar: &mut PatternBuilder,
    variant: usize,
    params: &GenerationParameters,
    v: f32,
    rng: &mut impl RandomSource,
) {
    match variant {
        0 => {
            bar.set_all(&[0, 4, 8, 12], KICK, v);
            bar.set_all(&[4, 12], SNARE, v * 0.9);
            bar.set_all(&[2, 6, 10, 14], HAT, v * 0.8);
        }
        1 => {
            // Trap: sparse kick, half-time clap, hats rolling into the bar line
            bar.set_all(&[0, 7, 10], KICK, v);
            bar.set(8, SNARE, v);
            for step in (0..14).step_by(2) {
                bar.set(step, HAT, v * 0.6);
            }
            for step in [9, 11] {
                if rng.chance(0.3) {
                    bar.set(step, HAT, v * 0.4);
                }
            }
            bar.set(13, HAT, v * 0.5);
            bar.set(14, HAT, v * 0.7);
            bar.set(15, HAT, v * 0.9);
        }
        _ => {
            // House: four on the floor with accented off-beat hats
            bar.set_all(&[0, 4, 8, 12], KICK, v);
            bar.set_all(&[4, 12], SNARE, v * 0.8);
            bar.set_all(&[2, 6, 10, 14], HAT, v);
            for step in (1..16).step_by(2) {
                if rng.chance(0.5) {
                    bar.set(step, HAT, v * 0.3);
                }
            }
        }
    }

    if params.intensity > 80 {
        bar.set(0, CRASH, v);
    }
}

fn jazz(bar: &mut PatternBuilder, variant: usize, v: f32, rng: &mut impl RandomSource) {
    match variant {
        0 => {
            // Spang-a-lang ride with a feathered bass drum
            for &step in SWING_RIDE {
                let accent = if step % 4 == 0 { 0.7 } else { 0.5 };
                bar.set(step, HAT, v * accent);
            }
            bar.set_all(&[0, 4, 8, 12], KICK, v * 0.25);
            for step in [6, 10, 14] {
                if rng.chance(0.3) {
                    bar.set(step, SNARE, v * 0.4);
                }
            }
            for step in [7, 15] {
                if rng.chance(0.25) {
                    bar.set(step, KICK, v * 0.5);
                }
            }
        }
        1 => {
            // Bossa nova: straight ride, clave on the rim, bass drum ostinato
            for step in (0..16).step_by(2) {
                bar.set(step, HAT, v * 0.6);
            }
            bar.set_all(BOSSA_CLAVE, SNARE, v * 0.5);
            bar.set_all(&[0, 3, 4, 8, 11, 12], KICK, v * 0.7);
        }
        _ => {
            // Bebop: busy ride, occasional bombs
            for step in 0..16 {
                if step % 2 == 0 {
                    bar.set(step, HAT, v * (0.6 + rng.next_f32() * 0.2));
                } else if rng.chance(0.5) {
                    bar.set(step, HAT, v * 0.4);
                }
            }
            bar.set(0, KICK, v * 0.3);
            for step in [2, 5, 9, 13] {
                let roll = rng.next_f64();
                if roll < 0.2 {
                    bar.set(step, KICK, v * 0.6);
                } else if roll < 0.4 {
                    bar.set(step, SNARE, v * 0.5);
                }
            }
        }
    }
}

fn metal(
    bar: &mut PatternBuilder,
    variant: usize,
    params: &GenerationParameters,
    v: f32,
    rng: &mut impl RandomSource,
) {
    match variant {
        0 => {
            bar.set_all(&[0, 1, 6, 7, 8, 9, 14, 15], KICK, v);
            bar.set_all(&[4, 12], SNARE, v);
            eighth_hats(bar, v, rng);
        }
        1 => {
            // Blast beat: every sixteenth not taken by the snare gets a kick
            bar.set_all(BLAST_SNARES, SNARE, v);
            for step in 0..16 {
                if !BLAST_SNARES.contains(&step) {
                    bar.set(step, KICK, v * 0.9);
                }
            }
            bar.set_all(&[0, 4, 8, 12], HAT, v * 0.7);
        }
        _ => {
            // Half-time breakdown
            bar.set_all(&[0, 8, 9], KICK, v);
            bar.set(8, SNARE, v);
            bar.set_all(&[0, 4, 8, 12], HAT, v * 0.8);
            for step in [3, 11] {
                if rng.chance(0.3) {
                    bar.set(step, KICK, v * 0.8);
                }
            }
        }
    }

    if params.intensity > 70 {
        bar.set(0, CRASH, v);
    }
}

fn eighth_hats(bar: &mut PatternBuilder, v: f32, rng: &mut impl RandomSource) {
    for step in (0..16).step_by(2) {
        bar.set(step, HAT, v * (0.6 + rng.next_f32() * 0.2));
    }
}

/// Quiet snare strokes on empty slots; every slot draws so the rng sequence is stable
fn ghost_snares(
    bar: &mut PatternBuilder,
    steps: &[usize],
    probability: f64,
    velocity: f32,
    rng: &mut impl RandomSource,
) {
    for &step in steps {
        if rng.chance(probability) && bar.get(step, SNARE) == 0.0 {
            bar.set(step, SNARE, velocity);
        }
    }
}
