//! Module tags and stat buffs.
//!
//! A [`ModuleBuff`] raises one stat of every module component carrying a
//! matching tag. Buffs come from battle files (global and per player) and
//! from the presence of bonus modules in a fleet.

use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, Scalable};

/// Category labels used to target buffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModuleTag {
    /// Matches every module.
    Any,
    /// Plating.
    Armor,
    /// Anything that shoots.
    Weapon,
    /// Shield generators.
    Shield,
    /// Projectile guns.
    Ballistic,
    /// Missile, torpedo and mine launchers.
    Missile,
    /// Beam weapons.
    Laser,
    /// Reactors.
    Energy,
    /// Repair bays.
    RepairBay,
    /// Engines and afterburners.
    Engine,
    /// Junk launchers.
    Junk,
    /// Point-defense turrets.
    PointDefense,
}

/// Stats a buff can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatKind {
    /// Module max health.
    Health,
    /// Weapon and explosion damage.
    Damage,
    /// Module armor.
    Armor,
    /// Module laser reflection.
    Reflect,
    /// Weapon, launcher and point-defense fire rate.
    FireRate,
    /// Module mass.
    Mass,
    /// Module energy consumption.
    EnergyUse,
    /// Module energy generation.
    EnergyGen,
    /// Weapon and point-defense range.
    Range,
    /// Engine warp force.
    WarpForce,
    /// Weapon firing arc.
    FiringArc,
    /// Engine thrust.
    Thrust,
    /// Engine turning thrust.
    TurnThrust,
    /// Shield strength.
    Strength,
    /// Shield regeneration pool size.
    MaxRegen,
    /// Shield regeneration speed.
    RegenRate,
    /// Shield and repair-bay radius.
    Radius,
    /// Munition and death-explosion radius.
    ExplosionRadius,
    /// Health of launched junk.
    JunkHealth,
    /// Repair-bay healing rate.
    RepairRate,
}

impl StatKind {
    /// Stats owned by the module itself rather than by a component.
    #[must_use]
    pub const fn is_base_stat(self) -> bool {
        matches!(
            self,
            Self::Health | Self::Armor | Self::Reflect | Self::EnergyUse | Self::EnergyGen | Self::Mass
        )
    }
}

/// Raise `stat` by `multiplier` (0.2 = +20%) on modules tagged `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleBuff {
    /// Stat to raise.
    pub stat: StatKind,
    /// Tag a module component must carry.
    pub target: ModuleTag,
    /// Relative increase.
    pub multiplier: f64,
}

impl ModuleBuff {
    /// Create a buff.
    #[must_use]
    pub const fn new(stat: StatKind, target: ModuleTag, multiplier: f64) -> Self {
        Self {
            stat,
            target,
            multiplier,
        }
    }

    /// Whether this buff reaches something tagged with `tags`.
    #[must_use]
    pub fn targets(&self, tags: &[ModuleTag]) -> bool {
        self.target == ModuleTag::Any || tags.contains(&self.target)
    }
}

/// Whether a buff is being granted or taken back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffOp {
    /// Add the increase.
    Apply,
    /// Remove a previously added increase.
    Revoke,
}

impl BuffOp {
    /// Apply or revoke `multiplier` on `attribute`.
    pub fn on<T: Scalable>(self, attribute: &mut Attribute<T>, multiplier: f64) {
        match self {
            Self::Apply => attribute.apply(multiplier),
            Self::Revoke => {
                attribute.revoke(multiplier);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_stats() {
        assert!(StatKind::Health.is_base_stat());
        assert!(StatKind::Mass.is_base_stat());
        assert!(!StatKind::Damage.is_base_stat());
        assert!(!StatKind::Radius.is_base_stat());
    }

    #[test]
    fn test_any_targets_everything() {
        let buff = ModuleBuff::new(StatKind::Damage, ModuleTag::Any, 0.1);
        assert!(buff.targets(&[]));
        let buff = ModuleBuff::new(StatKind::Damage, ModuleTag::Laser, 0.1);
        assert!(buff.targets(&[ModuleTag::Weapon, ModuleTag::Laser]));
        assert!(!buff.targets(&[ModuleTag::Weapon, ModuleTag::Ballistic]));
    }

    #[test]
    fn test_buff_op_round_trip() {
        let mut attr = Attribute::new(4.0);
        BuffOp::Apply.on(&mut attr, 0.25);
        assert_eq!(attr.value(), 5.0);
        BuffOp::Revoke.on(&mut attr, 0.25);
        assert_eq!(attr.value(), 4.0);
    }

    #[test]
    fn test_buff_parses_from_ron() {
        let buff: ModuleBuff =
            ron::from_str("(stat: FireRate, target: Ballistic, multiplier: 0.15)").unwrap();
        assert_eq!(buff.stat, StatKind::FireRate);
        assert_eq!(buff.target, ModuleTag::Ballistic);
    }
}
