//! Shield bubbles.
//!
//! A shield's strength is tracked as a fraction of its strength attribute,
//! so buffing strength scales the remaining shield too. Regeneration draws
//! from a pool of at most `max_regen` strength, which refills slowly.

use crate::attribute::Attribute;
use crate::buff::{BuffOp, ModuleBuff, StatKind};
use crate::math::Transform;
use crate::render::Canvas;
use crate::units::{Distance, Time};

/// Fraction of the regeneration pool restored per second.
pub const SHIELD_POOL_RECOVERY: f64 = 0.05;

/// A shield generator.
#[derive(Debug, Clone, PartialEq)]
pub struct Shield {
    strength: Attribute<f64>,
    radius: Attribute<Distance>,
    regen_rate: Attribute<f64>,
    max_regen: Attribute<f64>,
    fraction: f64,
    pool: f64,
    since_hit: Time,
}

impl Shield {
    /// Fully charged shield.
    #[must_use]
    pub fn new(strength: f64, radius: Distance, regen_rate: f64, max_regen: f64) -> Self {
        Self {
            strength: Attribute::new(strength),
            radius: Attribute::new(radius),
            regen_rate: Attribute::new(regen_rate),
            max_regen: Attribute::new(max_regen),
            fraction: 1.0,
            pool: 1.0,
            since_hit: Time::seconds(f64::INFINITY),
        }
    }

    /// Whether the shield intercepts damage.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.fraction > 0.0
    }

    /// Remaining strength as a fraction of full.
    #[must_use]
    pub fn strength_fraction(&self) -> f64 {
        self.fraction
    }

    /// Remaining regeneration pool as a fraction of full.
    #[must_use]
    pub fn pool_fraction(&self) -> f64 {
        self.pool
    }

    /// Full strength.
    #[must_use]
    pub fn strength(&self) -> f64 {
        self.strength.value()
    }

    /// Bubble radius.
    #[must_use]
    pub fn radius(&self) -> Distance {
        self.radius.value()
    }

    /// Soak `amount` of damage.
    pub fn absorb(&mut self, amount: f64) {
        let strength = self.strength.value();
        self.fraction = if strength > 0.0 {
            (self.fraction - amount / strength).max(0.0)
        } else {
            0.0
        };
        self.since_hit = Time::ZERO;
    }

    /// Drop to zero; used when the generator is destroyed.
    pub fn collapse(&mut self) {
        self.fraction = 0.0;
        self.pool = 0.0;
    }

    pub(crate) fn tick(&mut self, dt: Time) {
        self.since_hit += dt;
        self.pool = (self.pool + SHIELD_POOL_RECOVERY * dt.as_seconds()).min(1.0);

        let strength = self.strength.value();
        let max_regen = self.max_regen.value();
        if self.fraction >= 1.0 || strength <= 0.0 || max_regen <= 0.0 {
            return;
        }
        let missing = (1.0 - self.fraction) * strength;
        let available = self.pool * max_regen;
        let amount = (self.regen_rate.value() * dt.as_seconds())
            .min(missing)
            .min(available)
            .max(0.0);
        self.fraction = (self.fraction + amount / strength).min(1.0);
        self.pool -= amount / max_regen;
    }

    pub(crate) fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        match buff.stat {
            StatKind::Strength => op.on(&mut self.strength, buff.multiplier),
            StatKind::Radius => op.on(&mut self.radius, buff.multiplier),
            StatKind::RegenRate => op.on(&mut self.regen_rate, buff.multiplier),
            StatKind::MaxRegen => op.on(&mut self.max_regen, buff.multiplier),
            _ => {}
        }
    }

    pub(crate) fn draw(&self, module: Transform, canvas: &mut dyn Canvas) {
        if !self.is_active() {
            return;
        }
        let flash = (1.0 - self.since_hit.as_seconds()).clamp(0.0, 1.0);
        canvas.shield_bubble(module.position(), self.radius(), self.fraction, flash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitExt;

    #[test]
    fn test_absorb_drains_fraction() {
        let mut shield = Shield::new(20.0, 7.cells(), 10.0, 200.0);
        shield.absorb(5.0);
        assert!((shield.strength_fraction() - 0.75).abs() < 1e-12);
        assert!(shield.is_active());
        shield.absorb(100.0);
        assert_eq!(shield.strength_fraction(), 0.0);
        assert!(!shield.is_active());
    }

    #[test]
    fn test_regen_reactivates() {
        let mut shield = Shield::new(20.0, 7.cells(), 10.0, 200.0);
        shield.absorb(20.0);
        shield.tick(0.1.seconds());
        assert!(shield.is_active());
        assert!((shield.strength_fraction() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_regen_is_bounded_by_pool() {
        let mut shield = Shield::new(100.0, 7.cells(), 50.0, 10.0);
        shield.absorb(100.0);
        shield.tick(1.seconds());
        // Only the 10 strength in the pool is available.
        assert!((shield.strength_fraction() - 0.1).abs() < 1e-9);
        assert!(shield.pool_fraction() < 1e-9);
    }

    #[test]
    fn test_pool_refills() {
        let mut shield = Shield::new(100.0, 7.cells(), 50.0, 10.0);
        shield.absorb(100.0);
        shield.tick(1.seconds());
        shield.tick(1.seconds());
        assert!(shield.strength_fraction() > 0.1);
    }

    #[test]
    fn test_strength_buff_keeps_fraction() {
        let mut shield = Shield::new(20.0, 7.cells(), 10.0, 200.0);
        shield.absorb(10.0);
        let buff = ModuleBuff::new(StatKind::Strength, crate::buff::ModuleTag::Shield, 1.0);
        shield.apply_buff(&buff, BuffOp::Apply);
        assert_eq!(shield.strength(), 40.0);
        assert!((shield.strength_fraction() - 0.5).abs() < 1e-12);
    }
}
