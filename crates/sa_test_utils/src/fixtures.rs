//! Test fixtures and helpers.
//!
//! A catalog of the standard modules, a few extra modules that exercise
//! specific mechanics, and builders for ships and battles.

use std::collections::BTreeMap;

use sa_core::buff::{ModuleBuff, ModuleTag, StatKind};
use sa_core::catalog::Catalog;
use sa_core::config::BattleConfig;
use sa_core::data::{
    BattleDescriptor, ComponentDescriptor, ModuleDescriptor, ModulePlacement, PlayerDescriptor,
    ShipDescriptor,
};
use sa_core::game::Game;
use sa_core::units::UnitExt;

/// Buff granted by a [`COMMAND_ARRAY`] while one survives.
pub const COMMAND_BUFF: ModuleBuff = ModuleBuff::new(StatKind::Armor, ModuleTag::Any, 0.5);

/// 1x1 plating.
pub const SMALL_ARMOR: &str = "SmallSteelArmor";
/// 1x1 reactor.
pub const SMALL_REACTOR: &str = "SmallReactor";
/// 2x2 plating.
pub const MEDIUM_ARMOR: &str = "MediumSteelArmor";
/// 1x1 burst gun.
pub const CHAINGUN: &str = "Chaingun";
/// 1x1 laser.
pub const SMALL_LASER: &str = "SmallLaser";
/// 1x2 guided missile launcher.
pub const SMALL_MISSILE: &str = "SmallMissile";
/// 1x2 shield generator.
pub const SMALL_SHIELD: &str = "SmallShield";
/// 2x2 junk launcher.
pub const JUNK: &str = "Junk";
/// 2x2 point-defense turret.
pub const POINT_DEFENSE: &str = "PointDefense";
/// 1x1 module carrying [`COMMAND_BUFF`] as a fleet bonus.
pub const COMMAND_ARRAY: &str = "CommandArray";
/// 1x1 module that explodes when destroyed.
pub const POWDER_KEG: &str = "PowderKeg";
/// 1x1 engine.
pub const THRUSTER: &str = "Thruster";

fn params(values: &[(&str, f64)]) -> BTreeMap<String, f64> {
    values.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

fn component(name: &str, values: &[(&str, f64)]) -> ComponentDescriptor {
    ComponentDescriptor {
        name: name.to_string(),
        params: params(values),
    }
}

/// Module with the given base stats and no components.
#[must_use]
pub fn module(name: &str, width: u32, height: u32, health: f64) -> ModuleDescriptor {
    ModuleDescriptor {
        name: name.to_string(),
        width,
        height,
        health,
        armor: 0.0,
        reflect: 0.0,
        energy_use: 0.0,
        energy_gen: 0.0,
        mass: 10.0,
        penetration_blocking: 0.0,
        bonus: None,
        components: Vec::new(),
    }
}

/// The standard modules plus the mechanic fixtures.
#[must_use]
pub fn standard_modules() -> Vec<ModuleDescriptor> {
    let plating = |name: &str, size: u32, health: f64, armor: f64| ModuleDescriptor {
        armor,
        reflect: 0.55,
        components: vec![component("Armor", &[])],
        ..module(name, size, size, health)
    };

    let mut reactor = plating(SMALL_REACTOR, 1, 10.0, 3.0);
    reactor.energy_gen = 50.0;
    reactor.components = vec![component("Reactor", &[])];

    let chaingun = ModuleDescriptor {
        components: vec![component(
            "BurstGun",
            &[
                ("fire_rate", 3.3333),
                ("max_ammo", 1.0),
                ("burst_threshold", 1.0),
                ("burst_interval", 0.0),
                ("range", 35.0),
                ("speed", 200.0),
                ("firing_arc", 70.0),
                ("spread", 2.865),
                ("damage", 4.0),
            ],
        )],
        ..module(CHAINGUN, 1, 1, 15.0)
    };

    let laser = ModuleDescriptor {
        components: vec![component(
            "LaserGun",
            &[
                ("fire_rate", 0.5),
                ("duration", 2.0),
                ("range", 100.0),
                ("firing_arc", 360.0),
                ("damage", 10.0),
            ],
        )],
        ..module(SMALL_LASER, 1, 1, 15.0)
    };

    let missile = ModuleDescriptor {
        components: vec![component(
            "MissileGun",
            &[
                ("fire_rate", 3.33333),
                ("max_ammo", 1.0),
                ("burst_threshold", 1.0),
                ("burst_interval", 0.0),
                ("range", 100.0),
                ("speed", 50.0),
                ("firing_arc", 70.0),
                ("spread", 90.0),
                ("radius", 2.0),
                ("damage", 4.0),
                ("guidance", 114.59),
                ("lifetime", 3.0),
            ],
        )],
        ..module(SMALL_MISSILE, 1, 2, 30.0)
    };

    let shield = ModuleDescriptor {
        components: vec![component(
            "Shield",
            &[
                ("strength", 20.0),
                ("radius", 7.0),
                ("regen_rate", 10.0),
                ("max_regen", 200.0),
            ],
        )],
        ..module(SMALL_SHIELD, 1, 2, 30.0)
    };

    let junk = ModuleDescriptor {
        armor: 2.0,
        reflect: 20.0,
        energy_use: 20.0,
        mass: 50.0,
        components: vec![component(
            "JunkLauncher",
            &[
                ("fire_rate", 3.0),
                ("max_ammo", 4.0),
                ("burst_threshold", 3.0),
                ("burst_interval", 0.0),
                ("range", 100.0),
                ("speed", 10.0),
                ("junk_health", 10.0),
            ],
        )],
        ..module(JUNK, 2, 2, 150.0)
    };

    let point_defense = ModuleDescriptor {
        armor: 2.0,
        reflect: 20.0,
        energy_use: 20.0,
        mass: 50.0,
        components: vec![component(
            "PointDefense",
            &[
                ("fire_rate", 10.0),
                ("missile_chance", 0.5),
                ("torpedo_chance", 0.5),
                ("mine_chance", 0.5),
                ("range", 19.0),
            ],
        )],
        ..module(POINT_DEFENSE, 2, 2, 150.0)
    };

    let command = ModuleDescriptor {
        bonus: Some(COMMAND_BUFF),
        ..module(COMMAND_ARRAY, 1, 1, 20.0)
    };

    let keg = ModuleDescriptor {
        components: vec![component("DeathExplode", &[("damage", 60.0), ("radius", 1.5)])],
        ..module(POWDER_KEG, 1, 1, 5.0)
    };

    let thruster = ModuleDescriptor {
        components: vec![component(
            "Engine",
            &[("thrust", 100.0), ("turning", 50.0), ("warp", 0.0)],
        )],
        ..module(THRUSTER, 1, 1, 40.0)
    };

    vec![
        plating(SMALL_ARMOR, 1, 145.0, 3.0),
        reactor,
        plating(MEDIUM_ARMOR, 2, 550.0, 4.0),
        chaingun,
        laser,
        missile,
        shield,
        junk,
        point_defense,
        command,
        keg,
        thruster,
    ]
}

/// Catalog of [`standard_modules`].
///
/// # Panics
///
/// Panics if a fixture module fails validation.
#[must_use]
pub fn standard_catalog() -> Catalog {
    Catalog::new(standard_modules()).expect("fixture catalog is valid")
}

/// Builder for ship descriptors.
#[derive(Debug, Clone, Default)]
pub struct ShipBuilder {
    speed: Option<f64>,
    turn_speed: Option<f64>,
    modules: Vec<ModulePlacement>,
}

impl ShipBuilder {
    /// Empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `module` at battle-file cell `(x, y)`.
    #[must_use]
    pub fn with_module(mut self, module: &str, x: u32, y: u32) -> Self {
        self.modules.push(ModulePlacement::new(module, x, y));
        self
    }

    /// Place `count` 1-wide modules side by side on row `y` from column `x`.
    #[must_use]
    pub fn with_row(mut self, module: &str, x: u32, y: u32, count: u32) -> Self {
        for i in 0..count {
            self.modules.push(ModulePlacement::new(module, x + i, y));
        }
        self
    }

    /// Set the base handling.
    #[must_use]
    pub fn with_handling(mut self, speed: f64, turn_speed: f64) -> Self {
        self.speed = Some(speed);
        self.turn_speed = Some(turn_speed);
        self
    }

    /// Finish the layout.
    #[must_use]
    pub fn build(self) -> ShipDescriptor {
        let mut ship = ShipDescriptor::new(self.modules);
        if let Some(speed) = self.speed {
            ship.speed = speed;
        }
        if let Some(turn_speed) = self.turn_speed {
            ship.turn_speed = turn_speed;
        }
        ship
    }
}

/// Reactor, two chainguns and a row of plating.
#[must_use]
pub fn gunboat() -> ShipDescriptor {
    ShipBuilder::new()
        .with_module(SMALL_REACTOR, 1, 1)
        .with_module(CHAINGUN, 0, 0)
        .with_module(CHAINGUN, 2, 0)
        .with_module(SMALL_ARMOR, 1, 0)
        .with_row(SMALL_ARMOR, 0, 2, 3)
        .build()
}

/// Reactor and a single laser.
#[must_use]
pub fn laser_boat() -> ShipDescriptor {
    ShipBuilder::new()
        .with_module(SMALL_REACTOR, 0, 1)
        .with_module(SMALL_LASER, 0, 0)
        .with_module(SMALL_ARMOR, 1, 0)
        .with_module(SMALL_ARMOR, 1, 1)
        .build()
}

/// Gunboat wrapped around a shield generator.
#[must_use]
pub fn shield_boat() -> ShipDescriptor {
    ShipBuilder::new()
        .with_module(SMALL_SHIELD, 1, 1)
        .with_module(SMALL_REACTOR, 0, 1)
        .with_module(SMALL_REACTOR, 2, 1)
        .with_module(CHAINGUN, 0, 0)
        .with_module(CHAINGUN, 2, 0)
        .with_module(SMALL_ARMOR, 1, 0)
        .build()
}

/// Missile launcher with engine and point defense.
#[must_use]
pub fn missile_boat() -> ShipDescriptor {
    ShipBuilder::new()
        .with_module(SMALL_MISSILE, 0, 0)
        .with_module(SMALL_REACTOR, 1, 0)
        .with_module(THRUSTER, 1, 1)
        .with_module(POINT_DEFENSE, 0, 2)
        .build()
}

/// Gunboat carrying a command array.
#[must_use]
pub fn command_boat() -> ShipDescriptor {
    ShipBuilder::new()
        .with_module(SMALL_REACTOR, 1, 1)
        .with_module(CHAINGUN, 0, 0)
        .with_module(COMMAND_ARRAY, 2, 0)
        .with_module(SMALL_ARMOR, 1, 0)
        .with_row(SMALL_ARMOR, 0, 2, 3)
        .build()
}

/// Battle between two fleets without buffs.
#[must_use]
pub fn battle(side0: Vec<ShipDescriptor>, side1: Vec<ShipDescriptor>) -> BattleDescriptor {
    BattleDescriptor {
        global_buffs: Vec::new(),
        players: [
            PlayerDescriptor {
                buffs: Vec::new(),
                ships: side0,
            },
            PlayerDescriptor {
                buffs: Vec::new(),
                ships: side1,
            },
        ],
    }
}

/// One ship against one ship.
#[must_use]
pub fn duel(a: ShipDescriptor, b: ShipDescriptor) -> BattleDescriptor {
    battle(vec![a], vec![b])
}

/// A mixed two-versus-two battle.
#[must_use]
pub fn skirmish() -> BattleDescriptor {
    battle(
        vec![gunboat(), missile_boat()],
        vec![shield_boat(), laser_boat()],
    )
}

/// Default configuration with a one minute timeout.
#[must_use]
pub fn quick_config() -> BattleConfig {
    BattleConfig::default().with_timeout(60.seconds())
}

/// Build a game from fixture modules.
///
/// # Panics
///
/// Panics if the battle references modules missing from the fixture catalog
/// or is otherwise invalid.
#[must_use]
pub fn game(battle: &BattleDescriptor, config: BattleConfig, seed: u64) -> Game {
    Game::new(battle, &standard_catalog(), config, seed).expect("fixture battle is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_loads() {
        let catalog = standard_catalog();
        assert_eq!(catalog.len(), standard_modules().len());
        assert!(catalog.contains(CHAINGUN));
    }

    #[test]
    fn test_fixture_ships_build() {
        let game = game(&skirmish(), quick_config(), 1);
        assert_eq!(game.ships().len(), 4);
        assert!(game.ships()[0].is_flagship());
        assert!(!game.ships()[1].is_flagship());
    }

    #[test]
    fn test_builder_handling() {
        let ship = ShipBuilder::new()
            .with_row(SMALL_ARMOR, 0, 0, 3)
            .with_handling(2.0, 0.5)
            .build();
        assert_eq!(ship.modules.len(), 3);
        assert_eq!(ship.speed, 2.0);
        assert_eq!(ship.turn_speed, 0.5);
    }
}
