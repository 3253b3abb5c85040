//! Batch trial runner.
//!
//! Runs many independent battles of one scenario on a rayon pool. Each trial
//! gets its own seed drawn from a master `ChaCha8Rng`, so any single trial
//! can be replayed from its seed. Workers send outcomes through a channel to
//! one collector, which is the only place results are aggregated.

use std::fmt;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use sa_core::config::BattleConfig;
use sa_core::error::SimError;
use sa_core::game::GameResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::loader::Scenario;
use crate::runner::{run_trial, TrialOutcome};

/// Errors that stop a batch before any result is reported.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The scenario cannot be simulated.
    #[error(transparent)]
    Invalid(#[from] SimError),

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    Pool(String),

    /// The collector thread panicked.
    #[error("Result collector stopped unexpectedly")]
    Collector,
}

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of trials.
    pub trials: u32,
    /// Worker threads (0 = rayon default).
    pub threads: usize,
    /// Seed of the generator that seeds every trial.
    pub master_seed: u64,
    /// Parameters shared by every trial.
    pub battle: BattleConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            trials: 100,
            threads: 0,
            master_seed: 0,
            battle: BattleConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Config for `trials` trials.
    #[must_use]
    pub fn new(trials: u32) -> Self {
        Self {
            trials,
            ..Default::default()
        }
    }

    /// Set the worker thread count.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the master seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.master_seed = seed;
        self
    }

    /// Set the battle parameters.
    #[must_use]
    pub fn with_battle_config(mut self, battle: BattleConfig) -> Self {
        self.battle = battle;
        self
    }
}

/// Per-trial seeds drawn from the master generator.
#[must_use]
pub fn trial_seeds(master_seed: u64, trials: u32) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(master_seed);
    (0..trials).map(|_| rng.gen()).collect()
}

/// Aggregate of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Trials run.
    pub trials: u32,
    /// Side 0 wins.
    pub win0: u32,
    /// Side 1 wins.
    pub win1: u32,
    /// Draws, including timeouts.
    pub draws: u32,
    /// Trials that did not finish.
    pub unfinished: u32,
    /// Mean simulated battle length in seconds.
    pub mean_duration_seconds: f64,
    /// Mean ticks per battle.
    pub mean_ticks: f64,
    /// Wall-clock time of the whole batch in seconds.
    pub wall_clock_seconds: f64,
}

impl BatchSummary {
    /// Summarise `outcomes`.
    #[must_use]
    pub fn from_outcomes(outcomes: &[TrialOutcome], wall_clock_seconds: f64) -> Self {
        let mut summary = Self {
            wall_clock_seconds,
            ..Self::default()
        };
        let mut duration_sum = 0.0;
        let mut tick_sum = 0u64;
        for outcome in outcomes {
            summary.trials += 1;
            match outcome.result {
                GameResult::Win0 => summary.win0 += 1,
                GameResult::Win1 => summary.win1 += 1,
                GameResult::Draw => summary.draws += 1,
                GameResult::Unfinished => summary.unfinished += 1,
            }
            duration_sum += outcome.elapsed_seconds;
            tick_sum += outcome.ticks;
        }
        if summary.trials > 0 {
            let n = f64::from(summary.trials);
            summary.mean_duration_seconds = duration_sum / n;
            summary.mean_ticks = tick_sum as f64 / n;
        }
        summary
    }

    fn rate(&self, count: u32) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            f64::from(count) / f64::from(self.trials)
        }
    }

    /// Fraction of trials won by side 0.
    #[must_use]
    pub fn win0_rate(&self) -> f64 {
        self.rate(self.win0)
    }

    /// Fraction of trials won by side 1.
    #[must_use]
    pub fn win1_rate(&self) -> f64 {
        self.rate(self.win1)
    }

    /// Fraction of trials drawn.
    #[must_use]
    pub fn draw_rate(&self) -> f64 {
        self.rate(self.draws)
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<16} {:>8} {:>8}", "outcome", "count", "rate")?;
        writeln!(f, "{}", "-".repeat(34))?;
        for (label, count) in [
            ("side 0 wins", self.win0),
            ("side 1 wins", self.win1),
            ("draws", self.draws),
            ("unfinished", self.unfinished),
        ] {
            writeln!(
                f,
                "{label:<16} {count:>8} {:>7.1}%",
                self.rate(count) * 100.0
            )?;
        }
        writeln!(f, "{}", "-".repeat(34))?;
        writeln!(f, "{:<16} {:>8}", "trials", self.trials)?;
        writeln!(f, "{:<16} {:>7.1}s", "mean duration", self.mean_duration_seconds)?;
        writeln!(f, "{:<16} {:>8.0}", "mean ticks", self.mean_ticks)?;
        write!(f, "{:<16} {:>7.2}s", "wall clock", self.wall_clock_seconds)
    }
}

/// Results of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Aggregate counts.
    pub summary: BatchSummary,
    /// Every trial, ordered by index.
    pub trials: Vec<TrialOutcome>,
}

impl BatchResults {
    /// Pretty JSON rendering.
    ///
    /// # Errors
    ///
    /// Fails only if a value cannot be represented in JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Drain the channel until every worker has hung up.
fn collect(
    receiver: mpsc::Receiver<Result<TrialOutcome, SimError>>,
    expected: u32,
) -> Result<Vec<TrialOutcome>, SimError> {
    let step = (expected / 10).max(1);
    let mut outcomes = Vec::with_capacity(expected as usize);
    let mut first_error = None;
    for message in receiver {
        match message {
            Ok(outcome) => {
                outcomes.push(outcome);
                let completed = u32::try_from(outcomes.len()).unwrap_or(u32::MAX);
                if completed % step == 0 {
                    debug!(completed, total = expected, "Batch progress");
                }
            }
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }
    outcomes.sort_by_key(|outcome| outcome.index);
    Ok(outcomes)
}

/// Run every trial of `config` on `scenario`.
///
/// # Errors
///
/// Fails before running anything when the scenario cannot be built, or when
/// the worker pool cannot be created.
pub fn run_batch(scenario: &Scenario, config: &BatchConfig) -> Result<BatchResults, BatchError> {
    scenario.validate(&config.battle)?;

    let start = Instant::now();
    let seeds = trial_seeds(config.master_seed, config.trials);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| BatchError::Pool(e.to_string()))?;

    info!(
        trials = config.trials,
        threads = pool.current_num_threads(),
        master_seed = config.master_seed,
        "Starting batch"
    );

    let (sender, receiver) = mpsc::channel();
    let collected = thread::scope(|s| {
        let collector = s.spawn(move || collect(receiver, config.trials));
        pool.install(|| {
            (0..config.trials).into_par_iter().for_each_with(sender, |sender, index| {
                let seed = seeds[index as usize];
                // Each worker builds its own game; nothing is shared while a
                // battle runs.
                let message = scenario
                    .game(&config.battle, seed)
                    .map(|game| run_trial(index, game));
                // The collector only hangs up after every sender is gone.
                let _ = sender.send(message);
            });
        });
        collector.join()
    });
    let outcomes = collected.map_err(|_| BatchError::Collector)??;

    let summary = BatchSummary::from_outcomes(&outcomes, start.elapsed().as_secs_f64());
    info!(
        trials = summary.trials,
        win0 = summary.win0,
        win1 = summary.win1,
        draws = summary.draws,
        seconds = summary.wall_clock_seconds,
        "Batch complete"
    );

    Ok(BatchResults {
        config: config.clone(),
        summary,
        trials: outcomes,
    })
}

/// Outcome of re-running one seed several times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Seed under test.
    pub seed: u64,
    /// One outcome per run.
    pub runs: Vec<TrialOutcome>,
}

impl VerifyReport {
    /// Whether every run ended identically.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.runs.windows(2).all(|w| w[0].same_ending(&w[1]))
    }
}

/// Run `seed` `runs` times and compare the endings.
///
/// # Errors
///
/// Fails when the scenario cannot be built.
pub fn verify_seed(
    scenario: &Scenario,
    config: &BattleConfig,
    seed: u64,
    runs: u32,
) -> Result<VerifyReport, SimError> {
    let runs = (0..runs)
        .map(|index| scenario.game(config, seed).map(|game| run_trial(index, game)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(VerifyReport { seed, runs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::units::UnitExt;
    use sa_test_utils::fixtures;

    fn scenario() -> Scenario {
        Scenario::new(fixtures::standard_catalog(), fixtures::skirmish())
    }

    fn short_battle() -> BattleConfig {
        BattleConfig::default().with_timeout(5.seconds())
    }

    fn outcome(index: u32, result: GameResult, ticks: u64) -> TrialOutcome {
        TrialOutcome {
            index,
            seed: u64::from(index),
            result,
            ticks,
            elapsed_seconds: ticks as f64 / 30.0,
            state_hash: 0,
        }
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(500)
            .with_threads(4)
            .with_seed(12345)
            .with_battle_config(short_battle());

        assert_eq!(config.trials, 500);
        assert_eq!(config.threads, 4);
        assert_eq!(config.master_seed, 12345);
        assert_eq!(config.battle.timeout, 5.seconds());
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.trials, 100);
        assert_eq!(config.threads, 0);
    }

    #[test]
    fn test_trial_seeds_reproducible() {
        let a = trial_seeds(7, 20);
        assert_eq!(a, trial_seeds(7, 20));
        assert_ne!(a, trial_seeds(8, 20));
        assert_eq!(&trial_seeds(7, 5)[..], &a[..5]);
    }

    #[test]
    fn test_summary_counts() {
        let outcomes = [
            outcome(0, GameResult::Win0, 30),
            outcome(1, GameResult::Win1, 60),
            outcome(2, GameResult::Draw, 90),
            outcome(3, GameResult::Win0, 120),
        ];
        let summary = BatchSummary::from_outcomes(&outcomes, 1.5);

        assert_eq!(summary.trials, 4);
        assert_eq!((summary.win0, summary.win1, summary.draws), (2, 1, 1));
        assert_eq!(summary.win0_rate(), 0.5);
        assert_eq!(summary.mean_ticks, 75.0);
        assert!((summary.mean_duration_seconds - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_outcomes(&[], 0.0);
        assert_eq!(summary.trials, 0);
        assert_eq!(summary.draw_rate(), 0.0);
    }

    #[test]
    fn test_summary_table() {
        let summary = BatchSummary::from_outcomes(&[outcome(0, GameResult::Win1, 10)], 0.1);
        let table = summary.to_string();
        assert!(table.contains("side 1 wins"));
        assert!(table.contains("100.0%"));
    }

    #[test]
    fn test_run_batch_small() {
        let config = BatchConfig::new(6).with_threads(2).with_battle_config(short_battle());
        let results = run_batch(&scenario(), &config).unwrap();

        assert_eq!(results.trials.len(), 6);
        let s = &results.summary;
        assert_eq!(s.win0 + s.win1 + s.draws + s.unfinished, 6);
        assert_eq!(s.unfinished, 0);
        let indices: Vec<u32> = results.trials.iter().map(|t| t.index).collect();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());
        assert_eq!(
            results.trials.iter().map(|t| t.seed).collect::<Vec<_>>(),
            trial_seeds(0, 6)
        );
    }

    #[test]
    fn test_run_batch_rejects_invalid_scenario() {
        let mut battle = fixtures::skirmish();
        battle.players[1].ships.clear();
        let scenario = Scenario::new(fixtures::standard_catalog(), battle);
        let err = run_batch(&scenario, &BatchConfig::new(3)).unwrap_err();
        assert!(matches!(err, BatchError::Invalid(SimError::EmptyFleet(1))));
    }

    #[test]
    fn test_results_json() {
        let config = BatchConfig::new(2).with_battle_config(short_battle());
        let results = run_batch(&scenario(), &config).unwrap();
        let json = results.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["trials"], 2);
        assert_eq!(value["trials"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_verify_seed() {
        let report = verify_seed(&scenario(), &short_battle(), 12345, 3).unwrap();
        assert_eq!(report.runs.len(), 3);
        assert!(report.is_deterministic());
    }
}
