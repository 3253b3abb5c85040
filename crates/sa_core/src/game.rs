//! The battle orchestrator.
//!
//! A [`Game`] owns both fleets, every projectile, the spatial grids and the
//! battle's random source. Each call to [`Game::tick`] advances the battle by
//! one fixed time step.
//!
//! # Tick Order
//!
//! 1. Advance the clock; past the timeout the battle is a draw.
//! 2. Purge destroyed ships and check for a winner.
//! 3. Purge dead projectiles, then admit the ones spawned last tick.
//! 4. Rebuild the spatial grids.
//! 5. Tick ships, then projectiles.
//! 6. Settle fleet-bonus changes raised by destroyed modules.
//!
//! Everything is processed in a fixed order from a seeded generator, so two
//! games built from the same descriptors and seed are bit-identical.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buff::{BuffOp, ModuleBuff};
use crate::catalog::Catalog;
use crate::components::TickContext;
use crate::config::BattleConfig;
use crate::data::BattleDescriptor;
use crate::entity::{Hittable, ProjectileId, ShipId, ShipSnapshot, Side};
use crate::error::{Result, SimError};
use crate::math::Transform;
use crate::player::Player;
use crate::projectile::{OtherProjectiles, Projectile, ProjectileWorld, JUNK_RADIUS};
use crate::render::{Canvas, Drawable};
use crate::ship::{Ship, ShipEvent};
use crate::spatial::{Bounds, UniformGrid};
use crate::units::{Angle, Distance, Time};

/// Terminal state of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    /// Side 0 destroyed every enemy ship.
    Win0,
    /// Side 1 destroyed every enemy ship.
    Win1,
    /// Both fleets died on the same tick, or the timeout passed.
    Draw,
    /// Still running.
    Unfinished,
}

impl GameResult {
    /// The winning side, if any.
    #[must_use]
    pub fn winner(self) -> Option<Side> {
        match self {
            Self::Win0 => Some(Side::Zero),
            Self::Win1 => Some(Side::One),
            Self::Draw | Self::Unfinished => None,
        }
    }

    /// Whether the battle is over.
    #[must_use]
    pub fn is_finished(self) -> bool {
        self != Self::Unfinished
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Win0 => "side 0 wins",
            Self::Win1 => "side 1 wins",
            Self::Draw => "draw",
            Self::Unfinished => "unfinished",
        };
        f.write_str(text)
    }
}

/// Snapshot of battle progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BattleStats {
    /// Simulated time.
    pub elapsed: Time,
    /// Ticks run.
    pub ticks: u64,
    /// Current result.
    pub result: GameResult,
    /// Live ships per side.
    pub live_ships: [usize; 2],
    /// Live modules per side, over live ships.
    pub live_modules: [usize; 2],
}

/// Spawn frame of each side before the random offset.
fn spawn_frame(side: Side) -> Transform {
    match side {
        Side::Zero => Transform::new(0.0, 100.0, Angle::radians(-std::f64::consts::FRAC_PI_2)),
        Side::One => Transform::new(50.0, 0.0, Angle::radians(std::f64::consts::FRAC_PI_2)),
    }
}

/// One battle between two fleets.
#[derive(Debug)]
pub struct Game {
    config: BattleConfig,
    seed: u64,
    rng: ChaCha8Rng,
    time: Time,
    ticks: u64,
    result: GameResult,
    ships: Vec<Ship>,
    players: [Player; 2],
    projectiles: Vec<Projectile>,
    spawns: Vec<Projectile>,
    hittables: [UniformGrid<Hittable>; 2],
    munitions: [UniformGrid<ProjectileId>; 2],
}

impl Game {
    /// Build both fleets and apply every buff active at the start.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration, an empty fleet, or a ship that
    /// cannot be built from `catalog`.
    pub fn new(
        battle: &BattleDescriptor,
        catalog: &Catalog,
        config: BattleConfig,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        for side in Side::BOTH {
            if battle.players[side.index()].ships.is_empty() {
                return Err(SimError::EmptyFleet(side.index()));
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut ships = Vec::new();
        let mut players = Side::BOTH.map(|side| Player::new(side, battle.players[side.index()].buffs.clone()));
        for side in Side::BOTH {
            for (index, descriptor) in battle.players[side.index()].ships.iter().enumerate() {
                let offset = Transform::new(
                    f64::from(rng.gen_range(0..5_u8)),
                    f64::from(rng.gen_range(0..50_u8)),
                    Angle::ZERO,
                );
                let id = ShipId::from_index(ships.len());
                let ship = Ship::new(id, side, index, descriptor, catalog, spawn_frame(side) + offset)?;
                players[side.index()].enlist(id);
                ships.push(ship);
            }
        }

        let resolution = config.grid_resolution;
        let mut game = Self {
            config,
            seed,
            rng,
            time: Time::ZERO,
            ticks: 0,
            result: GameResult::Unfinished,
            ships,
            players,
            projectiles: Vec::new(),
            spawns: Vec::new(),
            hittables: [UniformGrid::new(resolution), UniformGrid::new(resolution)],
            munitions: [UniformGrid::new(resolution), UniformGrid::new(resolution)],
        };

        for buff in &battle.global_buffs {
            for side in Side::BOTH {
                game.buff_fleet(side, buff, BuffOp::Apply);
            }
        }
        for side in Side::BOTH {
            let buffs = game.players[side.index()].buffs().to_vec();
            for buff in &buffs {
                game.buff_fleet(side, buff, BuffOp::Apply);
            }
        }
        game.grant_presence_bonuses();
        Ok(game)
    }

    /// Seed the battle was built with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Battle parameters.
    #[must_use]
    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Simulated time so far.
    #[must_use]
    pub fn elapsed(&self) -> Time {
        self.time
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current result.
    #[must_use]
    pub fn result(&self) -> GameResult {
        self.result
    }

    /// Every ship, destroyed ones included, indexed by [`ShipId`].
    #[must_use]
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Ship by handle.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(id.index())
    }

    /// Mutable ship by handle, for scripted scenarios.
    ///
    /// Fleet-bonus changes caused through this handle settle on the next
    /// tick.
    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.get_mut(id.index())
    }

    /// Player of `side`.
    #[must_use]
    pub fn player(&self, side: Side) -> &Player {
        &self.players[side.index()]
    }

    /// Projectiles admitted this tick.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Progress snapshot.
    #[must_use]
    pub fn stats(&self) -> BattleStats {
        let live = |side: Side| {
            self.players[side.index()]
                .roster()
                .iter()
                .filter_map(|&id| self.ships.get(id.index()))
                .filter(|ship| !ship.is_destroyed())
                .fold((0, 0), |(ships, modules), ship| {
                    (ships + 1, modules + ship.live_module_count())
                })
        };
        let (ships0, modules0) = live(Side::Zero);
        let (ships1, modules1) = live(Side::One);
        BattleStats {
            elapsed: self.time,
            ticks: self.ticks,
            result: self.result,
            live_ships: [ships0, ships1],
            live_modules: [modules0, modules1],
        }
    }

    /// Box around every live ship.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.ships
            .iter()
            .filter(|ship| !ship.is_destroyed())
            .map(|ship| Bounds::around(ship.position(), ship.size().as_cells()))
            .reduce(Bounds::union)
            .unwrap_or_default()
    }

    /// Advance the battle by one time step and return the result.
    ///
    /// A finished battle no longer changes.
    pub fn tick(&mut self) -> GameResult {
        if self.result.is_finished() {
            return self.result;
        }
        let dt = self.config.time_step;
        self.time += dt;
        self.ticks += 1;
        if self.time > self.config.timeout {
            self.finish(GameResult::Draw);
            return self.result;
        }

        let ships = &self.ships;
        for player in &mut self.players {
            player.purge(|id| ships.get(id.index()).map_or(true, Ship::is_destroyed));
        }
        match (self.players[0].is_defeated(), self.players[1].is_defeated()) {
            (true, true) => self.finish(GameResult::Draw),
            (true, false) => self.finish(GameResult::Win1),
            (false, true) => self.finish(GameResult::Win0),
            (false, false) => {}
        }
        if self.result.is_finished() {
            return self.result;
        }

        self.projectiles.retain(|p| !p.is_destroyed());
        self.projectiles.append(&mut self.spawns);

        self.rebuild_grids();
        self.tick_ships(dt);
        self.tick_projectiles(dt);
        self.settle_events();

        #[cfg(feature = "debug-validation")]
        self.validate_invariants();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.ticks, state_hash = hash, "Battle state hash");
        }

        self.result
    }

    /// Tick until the battle ends.
    pub fn run_to_completion(&mut self) -> GameResult {
        while !self.result.is_finished() {
            self.tick();
        }
        self.result
    }

    /// Draw every live ship and projectile.
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        for ship in self.ships.iter().filter(|s| !s.is_destroyed()) {
            ship.draw(canvas);
        }
        for projectile in self.projectiles.iter().filter(|p| !p.is_destroyed()) {
            projectile.draw(canvas);
        }
    }

    /// Hash of the battle state, for comparing runs.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.ticks.hash(&mut hasher);
        self.time.as_seconds().to_bits().hash(&mut hasher);
        self.result.hash(&mut hasher);

        self.ships.len().hash(&mut hasher);
        for ship in &self.ships {
            ship.id().hash(&mut hasher);
            ship.is_destroyed().hash(&mut hasher);
            let transform = ship.transform();
            transform.x.to_bits().hash(&mut hasher);
            transform.y.to_bits().hash(&mut hasher);
            transform.rotation.as_radians().to_bits().hash(&mut hasher);
            let velocity = ship.velocity();
            velocity.x.to_bits().hash(&mut hasher);
            velocity.y.to_bits().hash(&mut hasher);
            for module in ship.modules() {
                module.health_fraction().to_bits().hash(&mut hasher);
                module.is_destroyed().hash(&mut hasher);
            }
        }

        self.projectiles.len().hash(&mut hasher);
        for projectile in &self.projectiles {
            projectile.side().hash(&mut hasher);
            let position = projectile.position();
            position.x.to_bits().hash(&mut hasher);
            position.y.to_bits().hash(&mut hasher);
            projectile.damage().to_bits().hash(&mut hasher);
            projectile.is_destroyed().hash(&mut hasher);
        }
        self.spawns.len().hash(&mut hasher);

        hasher.finish()
    }

    fn finish(&mut self, result: GameResult) {
        self.result = result;
        debug!(
            result = %result,
            elapsed = self.time.as_seconds(),
            ticks = self.ticks,
            seed = self.seed,
            "Battle finished"
        );
    }

    fn rebuild_grids(&mut self) {
        let bounds = self.bounds();
        for grid in &mut self.hittables {
            grid.reset(bounds);
        }
        for grid in &mut self.munitions {
            grid.reset(bounds);
        }

        for side in Side::BOTH {
            for &id in self.players[side.index()].roster() {
                if let Some(ship) = self.ships.get(id.index()) {
                    self.hittables[side.index()].add(Hittable::Ship(id), ship.position(), ship.size());
                }
            }
        }
        for (index, projectile) in self.projectiles.iter().enumerate() {
            let id = ProjectileId::from_index(index);
            let side = projectile.side().index();
            if projectile.is_junk() {
                self.hittables[side].add(Hittable::Junk(id), projectile.position(), JUNK_RADIUS);
            } else if projectile.munition_kind().is_some() {
                self.munitions[side].add(id, projectile.position(), Distance::ZERO);
            }
        }
    }

    fn tick_ships(&mut self, dt: Time) {
        let damage_scaling = self.config.damage_scaling(self.time);
        let order: Vec<ShipId> = Side::BOTH
            .iter()
            .flat_map(|side| self.players[side.index()].roster().iter().copied())
            .collect();
        let mut enemies: Vec<ShipSnapshot> = Vec::new();

        for id in order {
            let Some(ship) = self.ships.get(id.index()) else {
                continue;
            };
            if ship.is_destroyed() {
                continue;
            }
            let side = ship.side();
            let exempt = ship.is_flagship()
                && self.players[side.index()]
                    .roster()
                    .iter()
                    .any(|&other| other != id && self.ships.get(other.index()).is_some_and(|s| !s.is_destroyed()));

            enemies.clear();
            enemies.extend(
                self.players[side.opponent().index()]
                    .roster()
                    .iter()
                    .filter_map(|&enemy| self.ships.get(enemy.index()))
                    .filter(|enemy| !enemy.is_destroyed())
                    .map(Ship::snapshot),
            );

            let mut ctx = TickContext {
                dt,
                damage_scaling,
                rng: &mut self.rng,
                enemies: &enemies,
                hostile_munitions: &mut self.munitions[side.opponent().index()],
                projectiles: &mut self.projectiles,
                spawns: &mut self.spawns,
            };
            if let Some(ship) = self.ships.get_mut(id.index()) {
                ship.tick(&mut ctx, &self.config.tuning, exempt);
            }
        }
    }

    fn tick_projectiles(&mut self, dt: Time) {
        let ray_step = self.config.tuning.ray_step;
        for index in 0..self.projectiles.len() {
            let Some((projectile, others)) = OtherProjectiles::split(&mut self.projectiles, index)
            else {
                continue;
            };
            if projectile.is_destroyed() {
                continue;
            }
            let target = projectile.side().opponent().index();
            let mut world = ProjectileWorld {
                dt,
                ray_step,
                ships: &mut self.ships,
                hittables: &mut self.hittables[target],
                others,
            };
            projectile.tick(&mut world);
        }
    }

    fn settle_events(&mut self) {
        for index in 0..self.ships.len() {
            let side = self.ships[index].side();
            for event in self.ships[index].drain_events() {
                match event {
                    ShipEvent::BonusLost { module } => {
                        if let Some(buff) = self.players[side.index()].lose_presence(&module) {
                            debug!(side = %side, module = %module, "Fleet bonus revoked");
                            self.buff_fleet(side, &buff, BuffOp::Revoke);
                        }
                    }
                }
            }
        }
    }

    fn grant_presence_bonuses(&mut self) {
        for side in Side::BOTH {
            let mut granted = Vec::new();
            for ship in self.ships.iter().filter(|ship| ship.side() == side) {
                for module in ship.modules().iter().filter(|m| !m.is_destroyed()) {
                    for bonus in module.bonuses() {
                        if let Some(buff) =
                            self.players[side.index()].gain_presence(bonus.module(), bonus.buff())
                        {
                            granted.push((bonus.module().to_string(), buff));
                        }
                    }
                }
            }
            for (module, buff) in granted {
                debug!(side = %side, module = %module, "Fleet bonus granted");
                self.buff_fleet(side, &buff, BuffOp::Apply);
            }
        }
    }

    /// Apply or revoke `buff` on every ship of `side`, destroyed ones
    /// included, so that revoking always mirrors applying.
    fn buff_fleet(&mut self, side: Side, buff: &ModuleBuff, op: BuffOp) {
        for ship in self.ships.iter_mut().filter(|ship| ship.side() == side) {
            ship.apply_buff(buff, op);
        }
    }

    #[cfg(feature = "debug-validation")]
    fn validate_invariants(&self) {
        for ship in &self.ships {
            for module in ship.modules() {
                assert!(
                    (0.0..=1.0).contains(&module.health_fraction()),
                    "module {} of ship {} has health {}",
                    module.id(),
                    ship.id(),
                    module.health_fraction()
                );
            }
            let live = ship.modules().iter().filter(|m| !m.is_destroyed()).count();
            assert_eq!(live, ship.live_module_count(), "ship {} module count drifted", ship.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ModuleDescriptor, ModulePlacement, PlayerDescriptor, ShipDescriptor};
    use crate::units::UnitExt;

    fn catalog() -> Catalog {
        let mut reactor = ModuleDescriptor {
            name: "Reactor".to_string(),
            width: 1,
            height: 1,
            health: 100.0,
            armor: 0.0,
            reflect: 0.0,
            energy_use: 0.0,
            energy_gen: 10.0,
            mass: 10.0,
            penetration_blocking: 0.0,
            bonus: None,
            components: Vec::new(),
        };
        reactor.components.push(crate::data::ComponentDescriptor {
            name: "Reactor".to_string(),
            params: Default::default(),
        });
        Catalog::new([reactor]).unwrap()
    }

    fn fleet(ships: usize) -> PlayerDescriptor {
        PlayerDescriptor {
            buffs: Vec::new(),
            ships: (0..ships)
                .map(|_| ShipDescriptor::new(vec![ModulePlacement::new("Reactor", 0, 0)]))
                .collect(),
        }
    }

    fn battle(side0: usize, side1: usize) -> BattleDescriptor {
        BattleDescriptor {
            global_buffs: Vec::new(),
            players: [fleet(side0), fleet(side1)],
        }
    }

    #[test]
    fn test_empty_fleet_is_error() {
        let err = Game::new(&battle(1, 0), &catalog(), BattleConfig::default(), 1).unwrap_err();
        assert_eq!(err, SimError::EmptyFleet(1));
    }

    #[test]
    fn test_invalid_config_is_error() {
        let config = BattleConfig::default().with_time_step(Time::ZERO);
        assert!(matches!(
            Game::new(&battle(1, 1), &catalog(), config, 1),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_spawn_sides() {
        let game = Game::new(&battle(1, 1), &catalog(), BattleConfig::default(), 7).unwrap();
        let zero = game.ships()[0].position();
        let one = game.ships()[1].position();
        assert!(zero.y > 40.0);
        assert!(one.y < 10.0);
        assert_eq!(game.player(Side::Zero).roster(), &[ShipId(0)]);
        assert_eq!(game.player(Side::One).roster(), &[ShipId(1)]);
    }

    #[test]
    fn test_unarmed_fleets_draw() {
        // Ships without weapons break apart on their first tick.
        let mut game = Game::new(&battle(1, 1), &catalog(), BattleConfig::default(), 3).unwrap();
        assert_eq!(game.run_to_completion(), GameResult::Draw);
        assert_eq!(game.ticks(), 2);
    }

    #[test]
    fn test_timeout_is_draw() {
        let config = BattleConfig::default()
            .with_time_step(1.seconds())
            .with_timeout(0.5.seconds());
        let mut game = Game::new(&battle(1, 1), &catalog(), config, 3).unwrap();
        assert_eq!(game.tick(), GameResult::Draw);
        assert_eq!(game.tick(), GameResult::Draw);
        assert_eq!(game.ticks(), 1);
    }

    #[test]
    fn test_stats_counts_live() {
        let game = Game::new(&battle(2, 1), &catalog(), BattleConfig::default(), 3).unwrap();
        let stats = game.stats();
        assert_eq!(stats.live_ships, [2, 1]);
        assert_eq!(stats.live_modules, [2, 1]);
        assert_eq!(stats.result, GameResult::Unfinished);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let a = Game::new(&battle(2, 2), &catalog(), BattleConfig::default(), 11).unwrap();
        let b = Game::new(&battle(2, 2), &catalog(), BattleConfig::default(), 11).unwrap();
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_result_winner() {
        assert_eq!(GameResult::Win1.winner(), Some(Side::One));
        assert_eq!(GameResult::Draw.winner(), None);
        assert!(!GameResult::Unfinished.is_finished());
    }
}
