//! Running single battles to completion.

use sa_core::game::{Game, GameResult};
use sa_core::units::Time;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Terminal state of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// Position of the trial in its batch.
    pub index: u32,
    /// Seed the battle was built with.
    pub seed: u64,
    /// Final result.
    pub result: GameResult,
    /// Ticks until the result.
    pub ticks: u64,
    /// Simulated seconds until the result.
    pub elapsed_seconds: f64,
    /// Final state hash.
    pub state_hash: u64,
}

impl TrialOutcome {
    /// Capture the state of a finished game.
    #[must_use]
    pub fn of(index: u32, game: &Game) -> Self {
        Self {
            index,
            seed: game.seed(),
            result: game.result(),
            ticks: game.ticks(),
            elapsed_seconds: game.elapsed().as_seconds(),
            state_hash: game.state_hash(),
        }
    }

    /// Whether two runs ended identically, ignoring their batch position.
    #[must_use]
    pub fn same_ending(&self, other: &Self) -> bool {
        self.result == other.result
            && self.ticks == other.ticks
            && self.state_hash == other.state_hash
    }
}

/// Run `game` to completion.
///
/// A battle always ends: either one side is destroyed or the timeout
/// passes.
pub fn run_trial(index: u32, mut game: Game) -> TrialOutcome {
    game.run_to_completion();
    let outcome = TrialOutcome::of(index, &game);
    debug!(
        trial = index,
        seed = outcome.seed,
        result = %outcome.result,
        ticks = outcome.ticks,
        "Trial finished"
    );
    outcome
}

/// Run `game` to completion, calling `observe` at the start and then every
/// `every` of simulated time. The final state is always observed; a
/// non-positive `every` observes only the start and the end.
pub fn run_observed<F>(game: &mut Game, every: Time, mut observe: F) -> GameResult
where
    F: FnMut(&Game),
{
    observe(game);
    if every <= Time::ZERO {
        game.run_to_completion();
        observe(game);
        return game.result();
    }
    let mut next = every;
    while !game.result().is_finished() {
        game.tick();
        if game.result().is_finished() {
            break;
        }
        if game.elapsed() >= next {
            observe(game);
            while next <= game.elapsed() {
                next += every;
            }
        }
    }
    observe(game);
    game.result()
}
