//! Plain descriptor types consumed by the engine.
//!
//! These mirror the on-disk catalog and battle files field for field. They
//! carry no behaviour; [`crate::catalog::Catalog`] validates module
//! descriptors and [`crate::game::Game::new`] turns a battle descriptor into
//! live ships.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buff::ModuleBuff;

/// One behaviour attached to a catalog module, with its named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Component kind, e.g. `"BurstGun"`.
    pub name: String,
    /// Numeric parameters by name.
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique catalog name.
    pub name: String,
    /// Width in cells, as laid out in battle files.
    pub width: u32,
    /// Height in cells, as laid out in battle files.
    pub height: u32,
    /// Maximum health.
    pub health: f64,
    /// Flat damage reduction.
    #[serde(default)]
    pub armor: f64,
    /// Fraction of laser damage reflected.
    #[serde(default)]
    pub reflect: f64,
    /// Energy consumed.
    #[serde(default)]
    pub energy_use: f64,
    /// Energy produced.
    #[serde(default)]
    pub energy_gen: f64,
    /// Mass.
    #[serde(default)]
    pub mass: f64,
    /// Fraction of penetrating damage stopped by this module.
    #[serde(default)]
    pub penetration_blocking: f64,
    /// Fleet-wide buff active while at least one of these modules lives.
    #[serde(default)]
    pub bonus: Option<ModuleBuff>,
    /// Behaviour components in order.
    #[serde(default)]
    pub components: Vec<ComponentDescriptor>,
}

/// Module placed on a ship at cell `(x, y)`, battle-file orientation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePlacement {
    /// Catalog name.
    pub module: String,
    /// Column in the battle-file layout.
    pub x: u32,
    /// Row in the battle-file layout.
    pub y: u32,
}

impl ModulePlacement {
    /// Create a placement.
    #[must_use]
    pub fn new(module: impl Into<String>, x: u32, y: u32) -> Self {
        Self {
            module: module.into(),
            x,
            y,
        }
    }
}

/// Layout of one ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipDescriptor {
    /// Base linear acceleration, cells per second squared.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Base angular acceleration, radians per second squared.
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f64,
    /// Module placements.
    pub modules: Vec<ModulePlacement>,
}

fn default_speed() -> f64 {
    1.0
}

fn default_turn_speed() -> f64 {
    0.1
}

impl ShipDescriptor {
    /// Ship with default handling.
    #[must_use]
    pub fn new(modules: Vec<ModulePlacement>) -> Self {
        Self {
            speed: default_speed(),
            turn_speed: default_turn_speed(),
            modules,
        }
    }
}

/// One side of a battle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerDescriptor {
    /// Buffs applied to this side only.
    #[serde(default)]
    pub buffs: Vec<ModuleBuff>,
    /// Fleet; the first ship is the flagship.
    pub ships: Vec<ShipDescriptor>,
}

/// A complete battle setup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BattleDescriptor {
    /// Buffs applied to both sides.
    #[serde(default)]
    pub global_buffs: Vec<ModuleBuff>,
    /// Side 0 and side 1.
    pub players: [PlayerDescriptor; 2],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buff::{ModuleTag, StatKind};

    #[test]
    fn test_module_descriptor_defaults() {
        let module: ModuleDescriptor = ron::from_str(
            r#"(name: "SmallSteelArmor", width: 1, height: 1, health: 145.0, armor: 3.0)"#,
        )
        .unwrap();
        assert_eq!(module.reflect, 0.0);
        assert!(module.bonus.is_none());
        assert!(module.components.is_empty());
    }

    #[test]
    fn test_battle_descriptor_parses() {
        let battle: BattleDescriptor = ron::from_str(
            r#"(
                global_buffs: [(stat: Health, target: Any, multiplier: 0.1)],
                players: (
                    (ships: [(modules: [(module: "Chaingun", x: 0, y: 0)])]),
                    (buffs: [(stat: Damage, target: Weapon, multiplier: 0.2)],
                     ships: [(speed: 2.0, turn_speed: 0.3, modules: [])]),
                ),
            )"#,
        )
        .unwrap();
        assert_eq!(battle.global_buffs[0].target, ModuleTag::Any);
        assert_eq!(battle.players[0].ships[0].speed, 1.0);
        assert_eq!(battle.players[1].buffs[0].stat, StatKind::Damage);
        assert_eq!(battle.players[1].ships[0].turn_speed, 0.3);
    }
}
