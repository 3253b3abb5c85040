//! Headless battle runner.
//!
//! Loads a module catalog and a battle from RON files and runs them without
//! graphics:
//!
//! - **Batches**: many seeded trials on a worker pool, summarised as win
//!   rates and mean battle length
//! - **Single runs**: one battle with periodic ASCII snapshots on stdout
//! - **Verification**: the same seed replayed several times must end the
//!   same way
//!
//! # Example
//!
//! ```bash
//! # 1000 trials on every core
//! cargo run -p sa_headless -- batch crates/sa_headless/data/battle.ron --trials 1000
//!
//! # Watch one battle
//! cargo run -p sa_headless -- run crates/sa_headless/data/battle.ron --seed 7
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ascii;
pub mod batch;
pub mod loader;
pub mod runner;

pub use ascii::{render_game, AsciiCanvas, AsciiConfig};
pub use batch::{run_batch, verify_seed, BatchConfig, BatchError, BatchResults, BatchSummary};
pub use loader::{LoadError, Scenario};
pub use runner::{run_observed, run_trial, TrialOutcome};
