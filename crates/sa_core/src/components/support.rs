//! Propulsion, repair, fleet bonuses and other non-combat components.

use tracing::debug;

use super::{ComponentEffect, DestroyEffect, ModuleHost, ShipTotals};
use crate::attribute::Attribute;
use crate::buff::{BuffOp, ModuleBuff, StatKind};
use crate::units::{Distance, Time};

/// Constant thrust, turning and warp.
#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    thrust: Attribute<f64>,
    turning: Attribute<f64>,
    warp: Attribute<f64>,
}

impl Engine {
    /// Create an engine.
    #[must_use]
    pub fn new(thrust: f64, turning: f64, warp: f64) -> Self {
        Self {
            thrust: Attribute::new(thrust),
            turning: Attribute::new(turning),
            warp: Attribute::new(warp),
        }
    }

    /// Current thrust.
    #[must_use]
    pub fn thrust(&self) -> f64 {
        self.thrust.value()
    }

    pub(crate) fn tick(&self, totals: &mut ShipTotals) {
        totals.thrust += self.thrust.value();
        totals.turn_power += self.turning.value();
        totals.warp_force += self.warp.value();
    }

    pub(crate) fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        match buff.stat {
            StatKind::Thrust => op.on(&mut self.thrust, buff.multiplier),
            StatKind::TurnThrust => op.on(&mut self.turning, buff.multiplier),
            StatKind::WarpForce => op.on(&mut self.warp, buff.multiplier),
            _ => {}
        }
    }
}

/// Thrust delivered in boosts separated by cooldowns. Starts boosting.
#[derive(Debug, Clone, PartialEq)]
pub struct Afterburner {
    thrust: Attribute<f64>,
    turning: Attribute<f64>,
    duration: Time,
    cooldown: Time,
    boosting: bool,
    remaining: f64,
}

impl Afterburner {
    /// Create an afterburner at the start of a boost.
    #[must_use]
    pub fn new(thrust: f64, turning: f64, duration: Time, cooldown: Time) -> Self {
        Self {
            thrust: Attribute::new(thrust),
            turning: Attribute::new(turning),
            duration,
            cooldown,
            boosting: true,
            remaining: duration.as_seconds(),
        }
    }

    /// Whether a boost is in progress.
    #[must_use]
    pub fn is_boosting(&self) -> bool {
        self.boosting
    }

    pub(crate) fn tick(&mut self, dt: Time, totals: &mut ShipTotals) {
        if self.boosting {
            totals.thrust += self.thrust.value();
            totals.turn_power += self.turning.value();
        }
        self.remaining -= dt.as_seconds();
        if self.remaining <= 0.0 {
            self.boosting = !self.boosting;
            let next = if self.boosting {
                self.duration
            } else {
                self.cooldown
            };
            self.remaining = next.as_seconds().max(0.0);
        }
    }

    pub(crate) fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        match buff.stat {
            StatKind::Thrust => op.on(&mut self.thrust, buff.multiplier),
            StatKind::TurnThrust => op.on(&mut self.turning, buff.multiplier),
            _ => {}
        }
    }
}

/// Heals damaged modules around it.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairBay {
    rate: Attribute<f64>,
    radius: Attribute<Distance>,
}

impl RepairBay {
    /// Create a repair bay.
    #[must_use]
    pub fn new(rate: f64, radius: Distance) -> Self {
        Self {
            rate: Attribute::new(rate),
            radius: Attribute::new(radius),
        }
    }

    pub(crate) fn tick(&self, dt: Time) -> ComponentEffect {
        ComponentEffect::Repair {
            radius: self.radius.value(),
            budget: self.rate.value() * dt.as_seconds(),
        }
    }

    pub(crate) fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        match buff.stat {
            StatKind::RepairRate => op.on(&mut self.rate, buff.multiplier),
            StatKind::Radius => op.on(&mut self.radius, buff.multiplier),
            _ => {}
        }
    }
}

/// Fleet-wide buff source, counted by catalog name.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleBonus {
    module: String,
    buff: ModuleBuff,
}

impl ModuleBonus {
    /// Bonus `buff` counted under `module`.
    #[must_use]
    pub fn new(module: String, buff: ModuleBuff) -> Self {
        Self { module, buff }
    }

    /// Catalog name.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The fleet buff.
    #[must_use]
    pub fn buff(&self) -> ModuleBuff {
        self.buff
    }
}

/// Damages the surrounding modules when its own module dies.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathExplode {
    damage: Attribute<f64>,
    radius: Attribute<Distance>,
}

impl DeathExplode {
    /// Create the charge.
    #[must_use]
    pub fn new(damage: f64, radius: Distance) -> Self {
        Self {
            damage: Attribute::new(damage),
            radius: Attribute::new(radius),
        }
    }

    pub(crate) fn effect(&self) -> DestroyEffect {
        DestroyEffect::Explode {
            damage: self.damage.value(),
            radius: self.radius.value(),
        }
    }

    pub(crate) fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        match buff.stat {
            StatKind::Damage => op.on(&mut self.damage, buff.multiplier),
            StatKind::ExplosionRadius => op.on(&mut self.radius, buff.multiplier),
            _ => {}
        }
    }
}

/// Logs its module's state at a fixed interval.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugProbe {
    interval: Time,
    elapsed: Time,
}

impl DebugProbe {
    /// Create a probe.
    #[must_use]
    pub fn new(interval: Time) -> Self {
        Self {
            interval,
            elapsed: Time::ZERO,
        }
    }

    pub(crate) fn tick(&mut self, host: &ModuleHost, dt: Time) {
        self.elapsed += dt;
        if self.elapsed < self.interval {
            return;
        }
        self.elapsed = Time::ZERO;
        debug!(
            ship = %host.ship,
            side = %host.side,
            module = %host.module,
            health = host.health,
            x = host.transform.x,
            y = host.transform.y,
            "Module state"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buff::ModuleTag;
    use crate::units::UnitExt;

    #[test]
    fn test_engine_contributes() {
        let engine = Engine::new(10.0, 2.0, 1.0);
        let mut totals = ShipTotals::default();
        engine.tick(&mut totals);
        engine.tick(&mut totals);
        assert_eq!(totals.thrust, 20.0);
        assert_eq!(totals.turn_power, 4.0);
        assert_eq!(totals.warp_force, 2.0);
        assert_eq!(totals.mass, 1.0);
    }

    #[test]
    fn test_afterburner_alternates() {
        let mut burner = Afterburner::new(10.0, 0.0, 1.seconds(), 2.seconds());
        let mut boosted = 0;
        for _ in 0..8 {
            let mut totals = ShipTotals::default();
            burner.tick(0.5.seconds(), &mut totals);
            if totals.thrust > 0.0 {
                boosted += 1;
            }
        }
        // 1 s on, 2 s off, 1 s on.
        assert_eq!(boosted, 4);
    }

    #[test]
    fn test_repair_budget_scales_with_dt() {
        let mut bay = RepairBay::new(12.0, 3.cells());
        bay.apply_buff(
            &ModuleBuff::new(StatKind::RepairRate, ModuleTag::RepairBay, 0.5),
            BuffOp::Apply,
        );
        assert_eq!(
            bay.tick(0.5.seconds()),
            ComponentEffect::Repair {
                radius: 3.cells(),
                budget: 9.0
            }
        );
    }

    #[test]
    fn test_death_explode_radius_buff() {
        let mut charge = DeathExplode::new(50.0, 2.cells());
        charge.apply_buff(
            &ModuleBuff::new(StatKind::ExplosionRadius, ModuleTag::Any, 1.0),
            BuffOp::Apply,
        );
        assert_eq!(
            charge.effect(),
            DestroyEffect::Explode {
                damage: 50.0,
                radius: 4.cells()
            }
        );
    }
}
