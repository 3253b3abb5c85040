//! Determinism testing utilities.
//!
//! Provides a harness for verifying that battles produce identical results
//! given identical descriptors and seeds.
//!
//! # Testing Strategy
//!
//! Batch statistics are only meaningful if every trial is reproducible from
//! its seed. Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The engine keeps everything in `Vec`s and `BTreeMap`s.
//!
//! - **System randomness**: every random draw comes from the battle's own
//!   seeded `ChaCha8Rng`.
//!
//! - **Shared state between trials**: battles own all their state, so
//!   running them on different threads cannot change their outcome.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual mechanics (weapons, shields, damage)
//! 2. **Property tests**: Random fleets must still produce deterministic outcomes
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N battles on N threads all match

use std::thread;

use sa_core::game::{Game, GameResult};

/// Terminal state of one complete battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BattleOutcome {
    /// Final result.
    pub result: GameResult,
    /// Ticks until the result.
    pub ticks: u64,
    /// Final state hash.
    pub state_hash: u64,
}

impl BattleOutcome {
    /// Capture the current state of `game`.
    #[must_use]
    pub fn of(game: &Game) -> Self {
        Self {
            result: game.result(),
            ticks: game.ticks(),
            state_hash: game.state_hash(),
        }
    }
}

/// Whether every complete run of the battle ends identically.
pub fn verify_battle_determinism<F>(setup_fn: F, runs: usize) -> bool
where
    F: Fn() -> Game,
{
    let outcomes: Vec<BattleOutcome> = (0..runs)
        .map(|_| {
            let mut game = setup_fn();
            game.run_to_completion();
            BattleOutcome::of(&game)
        })
        .collect();
    outcomes.windows(2).all(|w| w[0] == w[1])
}

/// Run N complete battles on scoped threads and collect their outcomes.
///
/// # Panics
///
/// Panics if a battle thread panics.
pub fn run_parallel_battles<F>(setup_fn: F, num_battles: usize) -> Vec<BattleOutcome>
where
    F: Fn() -> Game + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut game = setup_fn();
                    game.run_to_completion();
                    BattleOutcome::of(&game)
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs stay identical for `num_ticks`, `Some(tick)` if they
/// diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Game,
{
    let mut game1 = setup_fn();
    let mut game2 = setup_fn();

    if game1.state_hash() != game2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        game1.tick();
        game2.tick();

        if game1.state_hash() != game2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Proptest strategies for battle testing.
///
/// These strategies generate random but valid inputs: every generated ship
/// layout is free of overlaps and only uses fixture modules.
pub mod strategies {
    use proptest::prelude::*;
    use sa_core::buff::{ModuleBuff, ModuleTag, StatKind};
    use sa_core::data::{BattleDescriptor, ShipDescriptor};

    use crate::fixtures::{self, ShipBuilder};

    /// Generate a 1x1 filler module name.
    pub fn arb_filler() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just(fixtures::SMALL_ARMOR),
            Just(fixtures::SMALL_REACTOR),
            Just(fixtures::CHAINGUN),
            Just(fixtures::SMALL_LASER),
            Just(fixtures::THRUSTER),
            Just(fixtures::POWDER_KEG),
            Just(fixtures::COMMAND_ARRAY),
        ]
    }

    /// Generate a weapon module name.
    pub fn arb_weapon() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just(fixtures::CHAINGUN),
            Just(fixtures::SMALL_LASER),
            Just(fixtures::SMALL_MISSILE),
        ]
    }

    /// Generate a ship: a weapon and a reactor on the first rows, then up to
    /// `max_fillers` filler modules on the row below.
    pub fn arb_ship(max_fillers: usize) -> impl Strategy<Value = ShipDescriptor> {
        (
            arb_weapon(),
            proptest::collection::vec(arb_filler(), 0..=max_fillers),
        )
            .prop_map(|(weapon, fillers)| {
                let mut builder = ShipBuilder::new()
                    .with_module(weapon, 0, 0)
                    .with_module(fixtures::SMALL_REACTOR, 1, 0);
                for (x, filler) in (0_u32..).zip(fillers) {
                    builder = builder.with_module(filler, x, 2);
                }
                builder.build()
            })
    }

    /// Generate a battle with one to `max_ships` ships per side.
    pub fn arb_battle(max_ships: usize) -> impl Strategy<Value = BattleDescriptor> {
        let ships = 1..=max_ships.max(1);
        (
            proptest::collection::vec(arb_ship(4), ships.clone()),
            proptest::collection::vec(arb_ship(4), ships),
        )
            .prop_map(|(a, b)| fixtures::battle(a, b))
    }

    /// Generate a stat a buff can raise.
    pub fn arb_stat() -> impl Strategy<Value = StatKind> {
        prop_oneof![
            Just(StatKind::Health),
            Just(StatKind::Armor),
            Just(StatKind::Reflect),
            Just(StatKind::Mass),
            Just(StatKind::Damage),
            Just(StatKind::FireRate),
            Just(StatKind::Range),
            Just(StatKind::Strength),
            Just(StatKind::Radius),
            Just(StatKind::Thrust),
        ]
    }

    /// Generate a buff target.
    pub fn arb_tag() -> impl Strategy<Value = ModuleTag> {
        prop_oneof![
            Just(ModuleTag::Any),
            Just(ModuleTag::Armor),
            Just(ModuleTag::Weapon),
            Just(ModuleTag::Shield),
            Just(ModuleTag::Energy),
            Just(ModuleTag::Engine),
        ]
    }

    /// Generate a buff (-50% to +200%).
    pub fn arb_buff() -> impl Strategy<Value = ModuleBuff> {
        (arb_stat(), arb_tag(), -0.5f64..2.0)
            .prop_map(|(stat, target, multiplier)| ModuleBuff::new(stat, target, multiplier))
    }

    /// Generate a sequence of attribute increases.
    pub fn arb_increases(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
        proptest::collection::vec(-0.9f64..3.0, 0..max_len)
    }
}
