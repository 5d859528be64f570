//! drumfill: generate, export, play and render drum grooves and fills

mod config;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use drumfill_core::midi::{self, SmfFormat};
use drumfill_core::{
    entropy, generate_bars, GenerationParameters, Genre, Instrument, Mode, Pattern, Tempo,
    STEPS_PER_BAR,
};
use drumfill_services::{OfflineRenderer, PlaybackContext, Player, SchedulerConfig, RING_OUT};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{load_config, AppConfig};

/// Procedural drum groove and fill generator
#[derive(Parser)]
#[command(name = "drumfill", version)]
#[command(about = "Generate, export, play and render drum grooves and fills")]
struct Cli {
    /// Config file (defaults to <config dir>/drumfill/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a generated pattern
    Generate {
        #[command(flatten)]
        pattern: PatternArgs,

        /// Print JSON instead of a grid
        #[arg(long)]
        json: bool,
    },

    /// Write a generated pattern as a Standard MIDI File
    Export {
        #[command(flatten)]
        pattern: PatternArgs,

        #[arg(long)]
        bpm: Option<f64>,

        /// Output path (defaults to drum-fill-<genre>-<millis>.mid)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force SMF format 0 or 1
        #[arg(long, value_parser = parse_format)]
        format: Option<SmfFormat>,
    },

    /// Play a generated pattern in a loop on the default output device
    Play {
        #[command(flatten)]
        pattern: PatternArgs,

        #[arg(long)]
        bpm: Option<f64>,

        /// Stop after this many seconds instead of waiting for Enter
        #[arg(long)]
        seconds: Option<f64>,
    },

    /// Render a generated pattern to a mono WAV file
    Render {
        #[command(flatten)]
        pattern: PatternArgs,

        #[arg(long)]
        bpm: Option<f64>,

        #[arg(short, long)]
        output: PathBuf,

        /// Passes over the pattern
        #[arg(long, default_value_t = 1)]
        loops: usize,

        #[arg(long)]
        sample_rate: Option<u32>,

        /// Write 32-bit float samples
        #[arg(long)]
        float: bool,
    },

    /// Decode a MIDI file and print its drum grid
    Inspect { path: PathBuf },
}

#[derive(Args)]
struct PatternArgs {
    #[arg(long, value_parser = parse_genre)]
    genre: Option<Genre>,

    /// 0-100
    #[arg(long)]
    complexity: Option<i64>,

    /// 0-100
    #[arg(long)]
    intensity: Option<i64>,

    /// Share of the bar given to the fill, 0-100
    #[arg(long = "fill")]
    fill_amount: Option<i64>,

    /// groove or fill
    #[arg(long, value_parser = parse_mode)]
    mode: Option<Mode>,

    /// Independent bars to generate and join
    #[arg(long, default_value_t = 1)]
    bars: usize,

    /// Fixed random seed
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_genre(s: &str) -> Result<Genre, String> {
    Genre::ALL
        .into_iter()
        .find(|g| g.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| {
            let names: Vec<_> = Genre::ALL.iter().map(|g| g.name()).collect();
            format!("unknown genre '{s}', expected one of: {}", names.join(", "))
        })
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    match s.to_ascii_lowercase().as_str() {
        "groove" => Ok(Mode::Groove),
        "fill" => Ok(Mode::Fill),
        _ => Err(format!("unknown mode '{s}', expected groove or fill")),
    }
}

fn parse_format(s: &str) -> Result<SmfFormat, String> {
    match s {
        "0" => Ok(SmfFormat::SingleTrack),
        "1" => Ok(SmfFormat::MultiTrack),
        _ => Err(format!("unsupported SMF format '{s}', expected 0 or 1")),
    }
}

#[derive(Serialize)]
struct GeneratedPattern<'a> {
    parameters: &'a GenerationParameters,
    bars: usize,
    pattern: &'a Pattern,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "drumfill=debug" } else { "drumfill=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Generate { pattern, json } => generate(&config, &pattern, json),
        Commands::Export { pattern, bpm, output, format } => {
            export(&config, &pattern, bpm, output, format)
        }
        Commands::Play { pattern, bpm, seconds } => play(&config, &pattern, bpm, seconds),
        Commands::Render { pattern, bpm, output, loops, sample_rate, float } => {
            render(&config, &pattern, bpm, &output, loops, sample_rate, float)
        }
        Commands::Inspect { path } => inspect(&path),
    }
}

fn parameters(config: &AppConfig, args: &PatternArgs) -> Result<GenerationParameters> {
    let defaults = &config.generator;
    GenerationParameters::new(
        args.genre.unwrap_or(defaults.genre),
        args.complexity.unwrap_or(defaults.complexity),
        args.intensity.unwrap_or(defaults.intensity),
        args.fill_amount.unwrap_or(defaults.fill_amount),
        args.mode.unwrap_or(defaults.mode),
    )
    .context("Invalid generation parameters")
}

fn tempo(config: &AppConfig, bpm: Option<f64>) -> Result<Tempo> {
    Tempo::new(bpm.unwrap_or(config.playback.bpm)).context("Invalid tempo")
}

fn build_pattern(config: &AppConfig, args: &PatternArgs) -> Result<(GenerationParameters, Pattern)> {
    if args.bars == 0 {
        bail!("--bars must be at least 1");
    }
    let params = parameters(config, args)?;
    let mut rng = entropy();
    if let Some(seed) = args.seed {
        rng.seed(seed);
    }
    Ok((params, generate_bars(&params, args.bars, &mut rng)))
}

fn generate(config: &AppConfig, args: &PatternArgs, json: bool) -> Result<()> {
    let (params, pattern) = build_pattern(config, args)?;
    if json {
        let output = GeneratedPattern { parameters: &params, bars: pattern.bars(), pattern: &pattern };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "{} {:?}  complexity {}  intensity {}  fill {}",
            params.genre.label(),
            params.mode,
            params.complexity,
            params.intensity,
            params.fill_amount
        );
        print!("{}", grid(&pattern));
    }
    Ok(())
}

fn export(
    config: &AppConfig,
    args: &PatternArgs,
    bpm: Option<f64>,
    output: Option<PathBuf>,
    format: Option<SmfFormat>,
) -> Result<()> {
    let (params, pattern) = build_pattern(config, args)?;
    let tempo = tempo(config, bpm)?;

    let bytes = match format {
        Some(format) => midi::encode_with_format(&pattern, tempo, format),
        None => midi::encode(&pattern, tempo),
    }
    .context("Failed to encode MIDI")?;

    let path = output.unwrap_or_else(|| default_export_name(params.genre));
    std::fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), bytes = bytes.len(), bars = pattern.bars(), "Exported MIDI");
    println!("{}", path.display());
    Ok(())
}

fn default_export_name(genre: Genre) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    PathBuf::from(format!("drum-fill-{}-{}.mid", genre.name(), millis))
}

fn play(config: &AppConfig, args: &PatternArgs, bpm: Option<f64>, seconds: Option<f64>) -> Result<()> {
    let (params, pattern) = build_pattern(config, args)?;
    let tempo = tempo(config, bpm)?;
    let limit = match seconds {
        Some(s) if s.is_finite() && s > 0.0 => Some(Duration::from_secs_f64(s)),
        Some(s) => bail!("--seconds must be positive, got {s}"),
        None => None,
    };

    let scheduler_config = SchedulerConfig {
        lookahead: Duration::from_millis(config.playback.lookahead_ms),
        tick_interval: Duration::from_millis(config.playback.tick_interval_ms.max(1)),
    };
    let bars = pattern.bars();
    let mut player = Player::new(pattern.clone(), tempo, params.genre, scheduler_config);
    if bars > 1 {
        player.set_context(PlaybackContext::Arrangement, pattern);
    }

    player.play().context("Could not start audio playback")?;

    let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
    if limit.is_none() {
        println!("Playing {} bar(s) at {} BPM, press Enter to stop", bars, tempo.bpm());
        std::thread::spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
            let _ = stop_tx.send(());
        });
    }

    let hits = player.run(&stop_rx, limit);
    std::thread::sleep(RING_OUT);
    player.shutdown();
    info!(hits, "Playback finished");
    Ok(())
}

fn render(
    config: &AppConfig,
    args: &PatternArgs,
    bpm: Option<f64>,
    output: &Path,
    loops: usize,
    sample_rate: Option<u32>,
    float: bool,
) -> Result<()> {
    let (params, pattern) = build_pattern(config, args)?;
    let tempo = tempo(config, bpm)?;
    let renderer = OfflineRenderer::new(sample_rate.unwrap_or(config.render.sample_rate))?;

    let frames = renderer
        .render_to_file(output, &pattern, tempo, params.genre, loops, float || config.render.float)
        .with_context(|| format!("Failed to render {}", output.display()))?;

    println!(
        "{} ({:.2} s)",
        output.display(),
        frames as f64 / renderer.sample_rate() as f64
    );
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let decoded = midi::decode(&bytes).context("Not a readable MIDI file")?;
    let pattern = decoded.to_pattern()?;

    println!(
        "format {}  tracks {}  division {}  tempo {}",
        decoded.format,
        decoded.track_count,
        decoded.ticks_per_quarter,
        decoded.bpm().map(|b| format!("{b:.2} BPM")).unwrap_or_else(|| "none".into())
    );
    print!("{}", grid(&pattern));
    Ok(())
}

/// One row per instrument, one column per step, bars separated by `|`
fn grid(pattern: &Pattern) -> String {
    let mut out = String::new();
    for instrument in Instrument::ALL.iter().rev() {
        out.push_str(&format!("{:<9}", instrument.name()));
        for (i, step) in pattern.steps().iter().enumerate() {
            if i % STEPS_PER_BAR == 0 {
                out.push('|');
            }
            out.push(match step.get(*instrument) {
                v if v >= 0.8 => 'X',
                v if v >= 0.4 => 'x',
                v if v > 0.0 => 'o',
                _ => '.',
            });
        }
        out.push_str("|\n");
    }
    out
}
