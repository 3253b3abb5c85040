//! Batch runner tests: outcome accounting and independence from the worker
//! count.

use proptest::prelude::*;
use sa_core::config::BattleConfig;
use sa_core::units::UnitExt;
use sa_headless::batch::{run_batch, trial_seeds, BatchConfig, BatchResults};
use sa_headless::loader::{default_catalog_path, default_data_dir, Scenario};
use sa_test_utils::fixtures;

fn skirmish() -> Scenario {
    Scenario::new(fixtures::standard_catalog(), fixtures::skirmish())
}

fn short_battle() -> BattleConfig {
    BattleConfig::default().with_timeout(8.seconds())
}

fn run(trials: u32, threads: usize, seed: u64) -> BatchResults {
    let config = BatchConfig::new(trials)
        .with_threads(threads)
        .with_seed(seed)
        .with_battle_config(short_battle());
    run_batch(&skirmish(), &config).unwrap()
}

#[test]
fn outcome_counts_sum_to_trial_count() {
    for threads in [1, 2, 4] {
        let summary = run(12, threads, 3).summary;
        assert_eq!(summary.trials, 12, "threads = {threads}");
        assert_eq!(
            summary.win0 + summary.win1 + summary.draws + summary.unfinished,
            12,
            "threads = {threads}"
        );
        assert_eq!(summary.unfinished, 0);
        let rates = summary.win0_rate() + summary.win1_rate() + summary.draw_rate();
        assert!((rates - 1.0).abs() < 1e-9);
    }
}

#[test]
fn thread_count_does_not_change_outcomes() {
    let single = run(8, 1, 99);
    let pooled = run(8, 4, 99);

    assert_eq!(single.trials.len(), pooled.trials.len());
    for (a, b) in single.trials.iter().zip(&pooled.trials) {
        assert_eq!(a.index, b.index);
        assert_eq!(a.seed, b.seed);
        assert!(a.same_ending(b), "trial {} diverged", a.index);
    }
    assert_eq!(
        (single.summary.win0, single.summary.win1, single.summary.draws),
        (pooled.summary.win0, pooled.summary.win1, pooled.summary.draws)
    );
}

#[test]
fn trials_use_master_seed_sequence() {
    let results = run(5, 2, 2024);
    let seeds: Vec<u64> = results.trials.iter().map(|t| t.seed).collect();
    assert_eq!(seeds, trial_seeds(2024, 5));
}

#[test]
fn zero_trials_is_an_empty_batch() {
    let results = run(0, 2, 1);
    assert!(results.trials.is_empty());
    assert_eq!(results.summary.trials, 0);
}

#[test]
fn bundled_battle_runs_in_batch() {
    let scenario = Scenario::load(
        &default_catalog_path(),
        &default_data_dir().join("battle.ron"),
    )
    .unwrap();
    let config = BatchConfig::new(4)
        .with_threads(2)
        .with_battle_config(short_battle());
    let results = run_batch(&scenario, &config).unwrap();

    let s = &results.summary;
    assert_eq!(s.win0 + s.win1 + s.draws, 4);
    assert!(s.mean_duration_seconds < 8.1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn batch_accounting_holds(trials in 0u32..6, threads in 1usize..4, seed in any::<u64>()) {
        let results = run(trials, threads, seed);
        let s = &results.summary;

        prop_assert_eq!(s.trials, trials);
        prop_assert_eq!(s.win0 + s.win1 + s.draws + s.unfinished, trials);
        prop_assert_eq!(results.trials.len(), trials as usize);
        for (i, trial) in results.trials.iter().enumerate() {
            prop_assert_eq!(trial.index as usize, i);
            prop_assert!(trial.result.is_finished());
            prop_assert!(trial.elapsed_seconds < 8.1);
        }
    }
}
