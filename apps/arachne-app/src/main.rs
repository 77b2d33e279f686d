//! Arachne procedural locomotion CLI.
//!
//! Provides three modes of operation:
//! - `walk`: Drive a rig across rolling terrain and print gait statistics
//! - `check`: Validate a locomotion config file
//! - `info`: Print workspace crate versions

mod creature;
mod terrain;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nalgebra::Vector3;
use tracing::{debug, info};

use arachne_core::config::LocomotionConfig;
use arachne_gait::{LocomotionInput, LocomotionRig, RigError};

use crate::terrain::Hills;

const QUADRUPED: &str = include_str!("../configs/quadruped.toml");
const HEXAPOD: &str = include_str!("../configs/hexapod.toml");

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Arachne procedural locomotion for multi-limbed creatures.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a rig across rolling hills and print gait statistics.
    Walk {
        /// Locomotion config (TOML). Defaults to the built-in quadruped.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use the built-in hexapod instead of the quadruped.
        #[arg(long, conflicts_with = "config")]
        hexapod: bool,

        /// Number of fixed steps to simulate.
        #[arg(short, long, default_value_t = 1000)]
        ticks: u32,

        /// Fixed step length in seconds.
        #[arg(long, default_value_t = 0.02)]
        dt: f32,

        /// Heading in degrees, counter-clockwise from +x.
        #[arg(long, default_value_t = 0.0)]
        heading: f32,

        /// Turn rate in degrees per second.
        #[arg(long, default_value_t = 0.0)]
        turn: f32,

        /// Hill amplitude. Zero walks on flat ground.
        #[arg(long, default_value_t = 0.15)]
        amplitude: f32,

        /// Hill wavelength.
        #[arg(long, default_value_t = 6.0)]
        wavelength: f32,
    },

    /// Validate a config file and print its limb graph.
    Check {
        /// Path to the TOML file.
        path: PathBuf,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

struct WalkArgs {
    ticks: u32,
    dt: f32,
    heading: f32,
    turn: f32,
    amplitude: f32,
    wavelength: f32,
}

fn load_config(path: Option<&Path>, hexapod: bool) -> Result<LocomotionConfig, RigError> {
    let config = match path {
        Some(path) => LocomotionConfig::from_file(path)?,
        None if hexapod => LocomotionConfig::from_toml_str(HEXAPOD)?,
        None => LocomotionConfig::from_toml_str(QUADRUPED)?,
    };
    Ok(config)
}

fn run_walk(config: LocomotionConfig, args: &WalkArgs) -> Result<(), RigError> {
    let terrain = Hills::new(args.amplitude, args.wavelength);
    let body = creature::body_pose(&config, &terrain);
    let skeletons = creature::skeletons(&config, &body, &terrain);
    let mut rig = LocomotionRig::new(config, body, &skeletons)?;

    let heading = args.heading.to_radians();
    let mut input = LocomotionInput::new(
        Vector3::new(heading.cos(), heading.sin(), 0.0),
        args.turn.to_radians() * args.dt,
    );
    info!(limbs = rig.limbs().len(), ticks = args.ticks, "walking");

    let report_every = (args.ticks / 10).max(1);
    let mut overlaps = 0usize;
    let mut skipped = 0usize;
    let mut max_airborne = 0usize;
    let (mut min_height, mut max_height) = (f32::INFINITY, f32::NEG_INFINITY);

    for tick in 0..args.ticks {
        let report = rig.tick(&input, &terrain, args.dt);
        skipped += report.skipped_solves.len();
        overlaps += rig.airborne_partner_pairs().len();
        max_airborne = max_airborne.max(rig.airborne());

        let position = rig.body().translation.vector;
        let clearance = position.z - terrain.height(position.x, position.y);
        min_height = min_height.min(clearance);
        max_height = max_height.max(clearance);

        if !report.gait.started.is_empty() {
            debug!(tick, started = ?report.gait.started, "steps started");
        }
        if (tick + 1) % report_every == 0 {
            println!(
                "tick {:>6}: body=({:.2}, {:.2}, {:.2}) clearance={clearance:.3} airborne={}",
                tick + 1,
                position.x,
                position.y,
                position.z,
                rig.airborne()
            );
        }

        // keep heading along the body forward axis while turning
        if args.turn != 0.0 {
            input.direction = rig.body().rotation * Vector3::x();
            input.direction.z = 0.0;
        }
    }

    println!();
    println!("steps per limb:");
    for limb in rig.limbs() {
        println!("  {:<16} {}", limb.name(), limb.steps_taken());
    }
    println!();
    println!("max airborne:        {max_airborne}");
    println!("partner overlaps:    {overlaps}");
    println!("skipped solves:      {skipped}");
    println!("clearance range:     {min_height:.3} .. {max_height:.3}");
    Ok(())
}

fn run_check(path: &Path) -> Result<(), RigError> {
    let config = LocomotionConfig::from_file(path)?;
    let partners = config.partner_indices()?;
    println!("{}: ok, {} limbs", path.display(), config.limbs.len());
    for (limb, partners) in config.limbs.iter().zip(&partners) {
        let names: Vec<&str> = partners
            .iter()
            .map(|&i| config.limbs[i].name.as_str())
            .collect();
        println!(
            "  {:<16} segments={} partners=[{}]",
            limb.name,
            limb.segment_count,
            names.join(", ")
        );
    }
    Ok(())
}

fn run_info() {
    println!("arachne v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  arachne-core  {}", env!("CARGO_PKG_VERSION"));
    println!("  arachne-ik    {}", env!("CARGO_PKG_VERSION"));
    println!("  arachne-gait  {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("edition: 2024");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Walk {
            config,
            hexapod,
            ticks,
            dt,
            heading,
            turn,
            amplitude,
            wavelength,
        }) => load_config(config.as_deref(), hexapod).and_then(|config| {
            run_walk(
                config,
                &WalkArgs {
                    ticks,
                    dt,
                    heading,
                    turn,
                    amplitude,
                    wavelength,
                },
            )
        }),
        Some(Commands::Check { path }) => run_check(&path),
        Some(Commands::Info) => {
            run_info();
            Ok(())
        }
        None => load_config(None, false).and_then(|config| {
            run_walk(
                config,
                &WalkArgs {
                    ticks: 500,
                    dt: 0.02,
                    heading: 0.0,
                    turn: 0.0,
                    amplitude: 0.15,
                    wavelength: 6.0,
                },
            )
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
