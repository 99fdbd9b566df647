use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use flock_client::{load_settings, to_params, Clock, Driver, RunOptions, SettingsWatcher};
use flock_core::{FlockSystem, GroupId};
use flock_shared::FlockSettings;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless boid flock driver", long_about = None)]
struct Args {
    /// JSON settings file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 600)]
    ticks: u64,

    /// Fixed time step in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Measure dt from the wall clock instead of using --dt
    #[arg(short, long)]
    realtime: bool,

    /// Target ticks per second in realtime mode
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Seed for the initial headings (random when omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write a frame every N ticks (0 disables frame output)
    #[arg(short, long, default_value_t = 1)]
    every: u64,

    /// Frame output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Clamp out-of-range settings instead of rejecting them
    #[arg(long)]
    clamp: bool,

    /// Reload the settings file when it changes
    #[arg(short, long, requires = "config")]
    watch: bool,

    /// Flock group identifier
    #[arg(long, default_value_t = 0)]
    group: u32,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    log::info!("Flock client starting...");

    let settings = match &args.config {
        Some(path) => {
            log::info!("Settings: {}", path.display());
            load_settings(path)?
        }
        None => FlockSettings::default(),
    };
    let params = to_params(&settings, args.clamp)?;

    let group = GroupId(args.group);
    let system = match args.seed {
        Some(seed) => {
            log::info!("Seed: {}", seed);
            FlockSystem::spawn(group, params, &mut StdRng::seed_from_u64(seed))
        }
        None => FlockSystem::new(group, params),
    }
    .context("Failed to spawn flock")?;

    let (clock, frame_interval) = if args.realtime {
        if !(args.fps.is_finite() && args.fps > 0.0) {
            bail!("--fps must be a positive number, got {}", args.fps);
        }
        (Clock::realtime(), Some(Duration::from_secs_f32(1.0 / args.fps)))
    } else {
        if !(args.dt.is_finite() && args.dt >= 0.0) {
            bail!("--dt must be a non-negative number, got {}", args.dt);
        }
        (Clock::fixed(args.dt), None)
    };

    let options = RunOptions {
        ticks: args.ticks,
        sample_every: args.every,
        frame_interval,
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut watcher = match (&args.config, args.watch) {
        (Some(path), true) => Some(SettingsWatcher::new(path.clone(), args.clamp)),
        _ => None,
    };

    let mut driver = Driver::new(system, clock);
    let status = driver
        .run(&options, &mut out, watcher.as_mut())
        .context("Simulation error")?;

    log::info!(
        "{} agents, {} ticks, {} contacts at exit",
        status.agent_count,
        status.ticks,
        status.contacts
    );

    Ok(())
}
