//! One-bar fills: steady base groove, then a genre-flavored fill tail

use crate::params::{GenerationParameters, Genre};
use crate::pattern::{PatternBuilder, STEPS_PER_BAR};
use crate::rng::RandomSource;

use super::{CRASH, HAT, KICK, SNARE, TOM_HIGH, TOM_LOW, TOM_MID};

pub(super) fn generate(params: &GenerationParameters, rng: &mut impl RandomSource) -> PatternBuilder {
    let mut bar = PatternBuilder::new(1);
    let fill_duration = params.fill_steps();
    let fill_start = STEPS_PER_BAR - fill_duration;

    base_groove(&mut bar, params, fill_start, rng);

    let vol = params.intensity as f32 / 100.0;
    let density_threshold = 100.0 - params.complexity as f64;

    for i in fill_start..STEPS_PER_BAR {
        let roll = rng.next_f64();

        match params.genre {
            Genre::Jazz => {
                if rng.next_f64() * 100.0 > density_threshold {
                    if roll < 0.3 {
                        bar.set(i, SNARE, vol * rng.next_f32());
                    } else if roll < 0.5 {
                        bar.set(i, TOM_HIGH, vol * 0.8);
                    } else if roll < 0.7 {
                        bar.set(i, TOM_MID, vol * 0.8);
                    } else {
                        bar.set(i, TOM_LOW, vol * 0.8);
                    }
                    if i % 2 == 0 {
                        bar.set(i, HAT, 0.4);
                    }
                }
            }
            Genre::Metal => {
                if params.complexity > 50 {
                    bar.set(i, KICK, vol);
                    let voice = match i % 4 {
                        0 => SNARE,
                        1 => TOM_HIGH,
                        2 => TOM_MID,
                        _ => TOM_LOW,
                    };
                    bar.set(i, voice, vol);
                } else if i % 4 == 0 {
                    bar.set(i, SNARE, 1.0);
                    bar.set(i, CRASH, 0.6);
                }
            }
            Genre::Acoustic | Genre::Electronic | Genre::Funk => {
                if rng.next_f64() * 100.0 > density_threshold {
                    if params.intensity > 60 && params.complexity < 50 {
                        // Snare roll that swells towards the downbeat
                        let swell = 0.6 + (i as f32 / STEPS_PER_BAR as f32) * 0.4;
                        bar.set(i, SNARE, vol * swell);
                    } else {
                        let progress = if fill_duration == 0 {
                            0.0
                        } else {
                            (i - fill_start) as f64 / fill_duration as f64
                        };
                        let tom = if progress < 0.33 {
                            TOM_HIGH
                        } else if progress < 0.66 {
                            TOM_MID
                        } else {
                            TOM_LOW
                        };
                        bar.set(i, tom, vol);
                    }
                }
            }
        }

        if i == fill_start {
            bar.raise(i, SNARE, vol.max(0.6));
        }

        if params.intensity > 90 && i >= 14 {
            bar.set(i, SNARE, 1.0);
            bar.set(i, KICK, 1.0);
            bar.set(i, TOM_LOW, 1.0);
        }
    }

    if params.intensity > 70 {
        bar.set(0, CRASH, 1.0);
    }

    bar
}

/// Plain time-keeping groove for the steps before the fill
fn base_groove(
    bar: &mut PatternBuilder,
    params: &GenerationParameters,
    fill_start: usize,
    rng: &mut impl RandomSource,
) {
    for i in 0..fill_start {
        if params.genre == Genre::Jazz {
            if i % 4 == 0 || i % 4 == 3 {
                bar.set(i, HAT, 0.5 + rng.next_f32() * 0.2);
            }
        } else {
            if i % 2 == 0 {
                bar.set(i, HAT, 0.6 + rng.next_f32() * 0.2);
            }
            if params.genre == Genre::Electronic && params.intensity > 60 {
                bar.set(i, HAT, 0.5);
            }
        }

        if i == 0 {
            bar.set(i, KICK, 1.0);
        }
        if i == 4 || i == 12 {
            bar.set(i, SNARE, 1.0);
        }

        match params.genre {
            Genre::Funk => {
                if i == 10 {
                    bar.set(i, KICK, 0.8);
                }
                if i == 7 || i == 9 {
                    bar.set(i, SNARE, 0.3);
                }
            }
            Genre::Metal => {
                if i == 2 || i == 3 {
                    bar.set(i, KICK, 0.9);
                }
            }
            Genre::Electronic => {
                if i == 6 {
                    bar.set(i, KICK, 0.8);
                }
            }
            Genre::Acoustic | Genre::Jazz => {}
        }
    }
}
