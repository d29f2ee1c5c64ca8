#![deny(unsafe_code)]
//! CLI binary for the fluid-canvas backgrounds.
//!
//! Subcommands:
//! - `render [effect]`: run an effect headlessly for N frames, write a PNG
//! - `replay <seed.json>`: re-run a recorded seed, write a PNG
//! - `list`: print available effects
//! - `schema <effect>`: print an effect's parameter schema

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use fluid_canvas_core::config::NOMINAL_FRAME_MS;
use fluid_canvas_core::seed::{PointerSample, Seed};
use fluid_canvas_core::Effect;
use fluid_canvas_effects::headless::run_seed;
use fluid_canvas_effects::EffectKind;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fluid-canvas", about = "Pointer-reactive canvas background CLI")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an effect for N frames and write a PNG snapshot.
    Render {
        /// Effect name (e.g. "drops"). Defaults to the effect that
        /// `render_strategy` in --params selects, else drops.
        effect: Option<String>,

        /// Surface width in pixels.
        #[arg(short = 'W', long, default_value_t = 640)]
        width: usize,

        /// Surface height in pixels.
        #[arg(short = 'H', long, default_value_t = 360)]
        height: usize,

        /// Number of animation frames.
        #[arg(short, long, default_value_t = 120)]
        frames: usize,

        /// Fixed delta between frames in milliseconds.
        #[arg(long, default_value_t = NOMINAL_FRAME_MS)]
        frame_ms: f64,

        /// PRNG seed for deterministic output.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Scripted pointer move as FRAME:X,Y (repeatable).
        #[arg(long = "pointer", value_name = "FRAME:X,Y")]
        pointer: Vec<String>,

        /// Output file path.
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,

        /// Effect parameters as a JSON string.
        #[arg(long, default_value = "{}")]
        params: String,

        /// Also write the run's seed record to this path.
        #[arg(long, value_name = "PATH")]
        emit_seed: Option<PathBuf>,
    },
    /// Re-run a seed record and write a PNG snapshot.
    Replay {
        /// Seed record written by `render --emit-seed`.
        seed: PathBuf,

        /// Output file path.
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,
    },
    /// List available effects.
    List,
    /// Print an effect's parameter schema as JSON.
    Schema {
        /// Effect name.
        effect: String,
    },
}

/// Parses `FRAME:X,Y` into a pointer sample.
fn parse_pointer(arg: &str) -> Result<PointerSample, CliError> {
    let bad = || CliError::Pointer { arg: arg.to_string() };
    let (frame, xy) = arg.split_once(':').ok_or_else(bad)?;
    let (x, y) = xy.split_once(',').ok_or_else(bad)?;
    let sample = PointerSample {
        frame: frame.trim().parse().map_err(|_| bad())?,
        x: x.trim().parse().map_err(|_| bad())?,
        y: y.trim().parse().map_err(|_| bad())?,
    };
    if !(sample.x.is_finite() && sample.y.is_finite()) {
        return Err(bad());
    }
    Ok(sample)
}

/// Runs `seed`, writes the snapshot, and reports the outcome.
fn render_seed(seed: &Seed, output: &Path, json: bool) -> Result<(), CliError> {
    let driver = run_seed(seed)?;
    fluid_canvas_effects::snapshot::write_png(driver.surface(), output)?;

    let particles = driver.effect().simulation().particles();
    info!(
        effect = %seed.effect,
        frames = seed.frames,
        particles = particles.len(),
        "snapshot written"
    );
    if json {
        let info = serde_json::json!({
            "effect": seed.effect,
            "width": seed.width,
            "height": seed.height,
            "frames": seed.frames,
            "seed": seed.seed,
            "particles": particles.len(),
            "kinetic_energy": particles.kinetic_energy(),
            "output": output.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        eprintln!(
            "rendered {} ({}x{}, {} frames, seed {}) -> {}",
            seed.effect,
            seed.width,
            seed.height,
            seed.frames,
            seed.seed,
            output.display()
        );
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let effects = EffectKind::list_effects();
            if cli.json {
                let info = serde_json::json!({ "effects": effects });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Effects:");
                for name in effects {
                    println!("  {name}");
                }
            }
        }
        Command::Schema { effect } => {
            let eff = EffectKind::from_name(&effect, 1, 1, 0, &serde_json::json!({}))?;
            println!("{}", serde_json::to_string_pretty(&eff.param_schema())?);
        }
        Command::Render {
            effect,
            width,
            height,
            frames,
            frame_ms,
            seed,
            pointer,
            output,
            params,
            emit_seed,
        } => {
            let params: serde_json::Value = serde_json::from_str(&params).map_err(CliError::Params)?;
            let effect = EffectKind::resolve(effect.as_deref(), &params)?;
            let pointer_path = pointer
                .iter()
                .map(String::as_str)
                .map(parse_pointer)
                .collect::<Result<Vec<_>, _>>()?;

            let record = Seed {
                effect: effect.to_string(),
                width,
                height,
                params,
                seed,
                frames,
                frame_ms,
                pointer_path,
            };
            render_seed(&record, &output, cli.json)?;

            if let Some(path) = emit_seed {
                let text = serde_json::to_string_pretty(&record)?;
                std::fs::write(&path, text).map_err(|source| CliError::SeedWrite {
                    path: path.clone(),
                    source,
                })?;
                info!(path = %path.display(), "seed record written");
            }
        }
        Command::Replay { seed, output } => {
            let file = File::open(&seed).map_err(|source| CliError::SeedRead {
                path: seed.clone(),
                source,
            })?;
            let record: Seed = serde_json::from_reader(BufReader::new(file))
                .map_err(|source| CliError::SeedParse { path: seed.clone(), source })?;
            render_seed(&record, &output, cli.json)?;
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fluid_canvas=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
