//! Headless battle runner.
//!
//! # Usage
//!
//! ```bash
//! # Run 1000 trials and print win rates
//! cargo run -p sa_headless -- batch battle.ron --trials 1000 --seed 42
//!
//! # Same, with the full results as JSON on stdout
//! cargo run -p sa_headless -- batch battle.ron --trials 1000 --json
//!
//! # Watch one battle as ASCII snapshots every 5 simulated seconds
//! cargo run -p sa_headless -- run battle.ron --seed 7 --snapshot-every 5
//!
//! # Replay one seed several times and compare the endings
//! cargo run -p sa_headless -- verify battle.ron --seed 12345 --runs 5
//!
//! # Check that a battle file loads and both fleets build
//! cargo run -p sa_headless -- validate battle.ron
//! ```
//!
//! Results go to stdout, logs to stderr.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sa_core::config::BattleConfig;
use sa_core::units::UnitExt;
use sa_headless::{
    ascii::{render_game, AsciiConfig},
    batch::{run_batch, verify_seed, BatchConfig},
    loader::{default_catalog_path, load_config, Scenario},
    runner::{run_observed, TrialOutcome},
};

#[derive(Parser)]
#[command(name = "sa_headless")]
#[command(about = "Headless fleet battle simulator")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Files every command loads.
#[derive(Args)]
struct ScenarioArgs {
    /// Battle file (RON)
    battle: PathBuf,

    /// Module catalog file (RON)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Battle configuration file (RON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the battle timeout, in simulated seconds
    #[arg(long)]
    timeout: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run many seeded trials and report win rates
    Batch {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Number of trials
        #[arg(short = 'n', long, default_value = "100")]
        trials: u32,

        /// Worker threads (0 = all cores)
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,

        /// Master seed for per-trial seeds
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Print the full results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run one battle with ASCII snapshots
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Battle seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Simulated seconds between snapshots (0 = start and end only)
        #[arg(long, default_value = "10")]
        snapshot_every: f64,

        /// Width of ASCII output
        #[arg(long, default_value = "80")]
        width: usize,

        /// Height of ASCII output
        #[arg(long, default_value = "30")]
        height: usize,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Load a battle and build both fleets without running it
    Validate {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries results.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Batch {
            scenario,
            trials,
            threads,
            seed,
            json,
        } => cmd_batch(&scenario, trials, threads, seed, json),
        Commands::Run {
            scenario,
            seed,
            snapshot_every,
            width,
            height,
            no_color,
        } => cmd_run(
            &scenario,
            seed,
            snapshot_every,
            AsciiConfig {
                width,
                height,
                use_color: !no_color,
                ..AsciiConfig::default()
            },
        ),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&scenario, seed, runs),
        Commands::Validate { scenario } => cmd_validate(&scenario),
    }
}

fn fatal(message: impl std::fmt::Display) -> ! {
    tracing::error!(error = %message, "Aborting");
    eprintln!("FATAL: {message}");
    process::exit(1);
}

/// Load the catalog, battle and configuration named on the command line.
fn load(args: &ScenarioArgs) -> (Scenario, BattleConfig) {
    let catalog = args.catalog.clone().unwrap_or_else(default_catalog_path);
    let scenario = Scenario::load(&catalog, &args.battle).unwrap_or_else(|e| fatal(e));

    let mut config = match &args.config {
        Some(path) => load_config(path).unwrap_or_else(|e| fatal(e)),
        None => BattleConfig::default(),
    };
    if let Some(timeout) = args.timeout {
        config = config.with_timeout(timeout.seconds());
    }
    if let Err(e) = config.validate() {
        fatal(e);
    }
    (scenario, config)
}

fn cmd_batch(args: &ScenarioArgs, trials: u32, threads: usize, seed: u64, json: bool) {
    let (scenario, battle) = load(args);
    let config = BatchConfig::new(trials)
        .with_threads(threads)
        .with_seed(seed)
        .with_battle_config(battle);

    let results = run_batch(&scenario, &config).unwrap_or_else(|e| fatal(e));

    if json {
        let text = results.to_json().unwrap_or_else(|e| fatal(e));
        println!("{text}");
    } else {
        println!("{}", results.summary);
    }
}

fn cmd_run(args: &ScenarioArgs, seed: u64, snapshot_every: f64, ascii: AsciiConfig) {
    let (scenario, config) = load(args);
    let mut game = scenario.game(&config, seed).unwrap_or_else(|e| fatal(e));

    tracing::info!(seed, "Starting battle");
    let result = run_observed(&mut game, snapshot_every.seconds(), |g| {
        print!("{}", render_game(g, &ascii));
    });

    let outcome = TrialOutcome::of(0, &game);
    tracing::info!(
        result = %result,
        ticks = outcome.ticks,
        seconds = outcome.elapsed_seconds,
        "Battle finished"
    );
    println!(
        "Result: {result} after {:.1}s ({} ticks), state hash {:016x}",
        outcome.elapsed_seconds, outcome.ticks, outcome.state_hash
    );
}

fn cmd_verify(args: &ScenarioArgs, seed: u64, runs: u32) {
    let (scenario, config) = load(args);
    tracing::info!(seed, runs, "Verifying determinism");

    let report = verify_seed(&scenario, &config, seed, runs).unwrap_or_else(|e| fatal(e));
    for run in &report.runs {
        println!(
            "run {}: {} after {} ticks, hash {:016x}",
            run.index, run.result, run.ticks, run.state_hash
        );
    }

    if report.is_deterministic() {
        println!("PASS: {runs} runs of seed {seed} ended identically");
    } else {
        eprintln!("FAIL: seed {seed} diverged between runs");
        process::exit(1);
    }
}

fn cmd_validate(args: &ScenarioArgs) {
    let (scenario, config) = load(args);
    let stats = scenario.validate(&config).unwrap_or_else(|e| fatal(e));
    for side in 0..2 {
        println!(
            "side {side}: {} ships, {} modules",
            stats.live_ships[side], stats.live_modules[side]
        );
    }
    println!("OK: {} modules in catalog", scenario.catalog().len());
}
