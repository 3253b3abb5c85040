//! Module behaviour components.
//!
//! A module owns an ordered list of [`Component`]s. The set of behaviours is
//! closed: every capability (tags, tick, destruction, buffs, drawing) is a
//! `match` over the variants below, so buff routing is exhaustive.

mod shield;
mod support;
mod weapons;

pub use shield::{Shield, SHIELD_POOL_RECOVERY};
pub use support::{Afterburner, DeathExplode, DebugProbe, Engine, ModuleBonus, RepairBay};
pub use weapons::{BurstLoader, Gun, GunKind, JunkLauncher, LaserCycle, Payload, PointDefense, Targeting};

use rand_chacha::ChaCha8Rng;

use crate::buff::{BuffOp, ModuleBuff, ModuleTag};
use crate::catalog::ComponentSpec;
use crate::entity::{ModuleId, ProjectileId, ShipId, ShipSnapshot, Side};
use crate::math::Transform;
use crate::projectile::Projectile;
use crate::render::Canvas;
use crate::spatial::UniformGrid;
use crate::units::{Distance, Time};

/// Per-tick totals a ship collects from its live modules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipTotals {
    /// Linear thrust.
    pub thrust: f64,
    /// Turning thrust.
    pub turn_power: f64,
    /// Mass, starting at 1 so an empty hull still has inertia.
    pub mass: f64,
    /// Energy produced.
    pub energy: f64,
    /// Energy consumed.
    pub energy_use: f64,
    /// Warp force.
    pub warp_force: f64,
}

impl Default for ShipTotals {
    fn default() -> Self {
        Self {
            thrust: 0.0,
            turn_power: 0.0,
            mass: 1.0,
            energy: 0.0,
            energy_use: 0.0,
            warp_force: 0.0,
        }
    }
}

/// The module a component is running on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleHost {
    /// Owning ship.
    pub ship: ShipId,
    /// Owning ship's side.
    pub side: Side,
    /// The module itself.
    pub module: ModuleId,
    /// Module world transform.
    pub transform: Transform,
    /// Module health fraction.
    pub health: f64,
}

/// Battle state visible to components while they tick.
pub struct TickContext<'a> {
    /// Tick length.
    pub dt: Time,
    /// Global projectile damage multiplier.
    pub damage_scaling: f64,
    /// The battle's random source.
    pub rng: &'a mut ChaCha8Rng,
    /// Live enemy ships, flagship first.
    pub enemies: &'a [ShipSnapshot],
    /// Enemy munitions point defense may shoot at.
    pub hostile_munitions: &'a mut UniformGrid<ProjectileId>,
    /// Projectiles admitted this tick.
    pub projectiles: &'a mut [Projectile],
    /// Projectiles spawned this tick; admitted next tick.
    pub spawns: &'a mut Vec<Projectile>,
}

/// Something a component asks its ship to do after ticking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentEffect {
    /// Heal damaged modules around the component's module.
    Repair {
        /// Reach from the module centre.
        radius: Distance,
        /// Total health available this tick.
        budget: f64,
    },
}

/// Consequence of a module's destruction.
#[derive(Debug, Clone, PartialEq)]
pub enum DestroyEffect {
    /// Damage every module of the same ship within `radius`.
    Explode {
        /// Damage to each module.
        damage: f64,
        /// Blast radius.
        radius: Distance,
    },
    /// A fleet bonus lost one of its sources.
    BonusLost {
        /// Catalog name the bonus is counted under.
        module: String,
    },
}

/// A behaviour attached to a module.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// Passive plating.
    Armor,
    /// Energy source.
    Reactor,
    /// Propulsion.
    Engine(Engine),
    /// Pulsed propulsion.
    Afterburner(Afterburner),
    /// Heals nearby modules.
    RepairBay(RepairBay),
    /// Shield bubble.
    Shield(Shield),
    /// Weapon.
    Gun(Gun),
    /// Junk launcher.
    JunkLauncher(JunkLauncher),
    /// Anti-munition turret.
    PointDefense(PointDefense),
    /// Fleet-wide bonus source.
    ModuleBonus(ModuleBonus),
    /// Blast on destruction.
    DeathExplode(DeathExplode),
    /// State logger.
    Debug(DebugProbe),
}

impl Component {
    /// Instantiate a component from its validated definition.
    #[must_use]
    pub fn from_spec(spec: &ComponentSpec) -> Self {
        match spec {
            ComponentSpec::Armor => Self::Armor,
            ComponentSpec::Reactor => Self::Reactor,
            ComponentSpec::Engine {
                thrust,
                turning,
                warp,
            } => Self::Engine(Engine::new(*thrust, *turning, *warp)),
            ComponentSpec::Afterburner {
                thrust,
                turning,
                duration,
                cooldown,
            } => Self::Afterburner(Afterburner::new(*thrust, *turning, *duration, *cooldown)),
            ComponentSpec::RepairBay { rate, radius } => {
                Self::RepairBay(RepairBay::new(*rate, *radius))
            }
            ComponentSpec::Shield {
                strength,
                radius,
                regen_rate,
                max_regen,
            } => Self::Shield(Shield::new(*strength, *radius, *regen_rate, *max_regen)),
            ComponentSpec::Gun(spec) => Self::Gun(Gun::from_spec(spec)),
            ComponentSpec::JunkLauncher {
                loader,
                range,
                speed,
                junk_health,
            } => Self::JunkLauncher(JunkLauncher::new(*loader, *range, *speed, *junk_health)),
            ComponentSpec::PointDefense {
                fire_rate,
                missile_chance,
                torpedo_chance,
                mine_chance,
                range,
            } => Self::PointDefense(PointDefense::new(
                *fire_rate,
                [*missile_chance, *torpedo_chance, *mine_chance],
                *range,
            )),
            ComponentSpec::ModuleBonus { module, buff } => {
                Self::ModuleBonus(ModuleBonus::new(module.clone(), *buff))
            }
            ComponentSpec::DeathExplode { damage, radius } => {
                Self::DeathExplode(DeathExplode::new(*damage, *radius))
            }
            ComponentSpec::Debug { interval } => Self::Debug(DebugProbe::new(*interval)),
        }
    }

    /// Categories this component gives its module.
    #[must_use]
    pub fn tags(&self) -> &'static [ModuleTag] {
        match self {
            Self::Armor => &[ModuleTag::Armor],
            Self::Reactor => &[ModuleTag::Energy],
            Self::Engine(_) | Self::Afterburner(_) => &[ModuleTag::Engine],
            Self::RepairBay(_) => &[ModuleTag::RepairBay],
            Self::Shield(_) => &[ModuleTag::Shield],
            Self::Gun(gun) => gun.tags(),
            Self::JunkLauncher(_) => &[ModuleTag::Junk],
            Self::PointDefense(_) => &[ModuleTag::PointDefense],
            Self::ModuleBonus(_) | Self::DeathExplode(_) | Self::Debug(_) => &[],
        }
    }

    /// Whether this component makes its module count as a weapon.
    #[must_use]
    pub fn is_weapon(&self) -> bool {
        matches!(self, Self::Gun(_))
    }

    /// Whether this component makes its module count as an energy source.
    #[must_use]
    pub fn is_energy_source(&self) -> bool {
        matches!(self, Self::Reactor)
    }

    /// Advance one tick.
    pub fn tick(
        &mut self,
        host: &ModuleHost,
        totals: &mut ShipTotals,
        ctx: &mut TickContext<'_>,
    ) -> Option<ComponentEffect> {
        match self {
            Self::Engine(engine) => engine.tick(totals),
            Self::Afterburner(afterburner) => afterburner.tick(ctx.dt, totals),
            Self::RepairBay(bay) => return Some(bay.tick(ctx.dt)),
            Self::Shield(shield) => shield.tick(ctx.dt),
            Self::Gun(gun) => gun.tick(host, ctx),
            Self::JunkLauncher(launcher) => launcher.tick(host, ctx),
            Self::PointDefense(pd) => pd.tick(host, ctx),
            Self::Debug(probe) => probe.tick(host, ctx.dt),
            Self::Armor | Self::Reactor | Self::ModuleBonus(_) | Self::DeathExplode(_) => {}
        }
        None
    }

    /// React to the module's destruction.
    pub fn on_destroyed(&mut self) -> Option<DestroyEffect> {
        match self {
            Self::Shield(shield) => {
                shield.collapse();
                None
            }
            Self::DeathExplode(explode) => Some(explode.effect()),
            Self::ModuleBonus(bonus) => Some(DestroyEffect::BonusLost {
                module: bonus.module().to_string(),
            }),
            _ => None,
        }
    }

    /// Apply or revoke a component-level buff.
    pub fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        match self {
            Self::Engine(engine) => engine.apply_buff(buff, op),
            Self::Afterburner(afterburner) => afterburner.apply_buff(buff, op),
            Self::RepairBay(bay) => bay.apply_buff(buff, op),
            Self::Shield(shield) => shield.apply_buff(buff, op),
            Self::Gun(gun) => gun.apply_buff(buff, op),
            Self::JunkLauncher(launcher) => launcher.apply_buff(buff, op),
            Self::PointDefense(pd) => pd.apply_buff(buff, op),
            Self::DeathExplode(explode) => explode.apply_buff(buff, op),
            Self::Armor | Self::Reactor | Self::ModuleBonus(_) | Self::Debug(_) => {}
        }
    }

    /// Draw component visuals on top of the module.
    pub fn draw(&self, module: Transform, canvas: &mut dyn Canvas) {
        if let Self::Shield(shield) = self {
            shield.draw(module, canvas);
        }
    }

    /// Shield state, if this is a shield.
    #[must_use]
    pub fn as_shield(&self) -> Option<&Shield> {
        match self {
            Self::Shield(shield) => Some(shield),
            _ => None,
        }
    }

    /// Mutable shield state, if this is a shield.
    pub fn as_shield_mut(&mut self) -> Option<&mut Shield> {
        match self {
            Self::Shield(shield) => Some(shield),
            _ => None,
        }
    }

    /// Targeting range of weapons.
    #[must_use]
    pub fn weapon_range(&self) -> Option<Distance> {
        match self {
            Self::Gun(gun) => Some(gun.range()),
            _ => None,
        }
    }

    /// Fleet bonus carried by this component.
    #[must_use]
    pub fn bonus(&self) -> Option<&ModuleBonus> {
        match self {
            Self::ModuleBonus(bonus) => Some(bonus),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buff::StatKind;
    use crate::units::UnitExt;

    #[test]
    fn test_tags_by_variant() {
        assert_eq!(Component::Reactor.tags(), &[ModuleTag::Energy]);
        let shield = Component::from_spec(&ComponentSpec::Shield {
            strength: 20.0,
            radius: 7.cells(),
            regen_rate: 10.0,
            max_regen: 200.0,
        });
        assert_eq!(shield.tags(), &[ModuleTag::Shield]);
        assert!(shield.as_shield().is_some());
    }

    #[test]
    fn test_bonus_lost_on_destroy() {
        let buff = ModuleBuff::new(StatKind::Armor, ModuleTag::Any, 0.2);
        let mut component = Component::ModuleBonus(ModuleBonus::new("Command".to_string(), buff));
        assert_eq!(
            component.on_destroyed(),
            Some(DestroyEffect::BonusLost {
                module: "Command".to_string()
            })
        );
    }

    #[test]
    fn test_shield_collapses_on_destroy() {
        let mut component = Component::Shield(Shield::new(20.0, 7.cells(), 10.0, 200.0));
        assert!(component.on_destroyed().is_none());
        assert!(!component.as_shield().is_some_and(Shield::is_active));
    }

    #[test]
    fn test_engine_buff_routes() {
        let mut component = Component::Engine(Engine::new(10.0, 2.0, 0.0));
        component.apply_buff(
            &ModuleBuff::new(StatKind::Thrust, ModuleTag::Engine, 0.5),
            BuffOp::Apply,
        );
        let Component::Engine(engine) = &component else {
            unreachable!()
        };
        assert_eq!(engine.thrust(), 15.0);
    }
}
