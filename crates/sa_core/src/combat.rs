//! Damage mitigation rules shared by every hit path.
//!
//! - Ballistic and explosive damage is reduced by flat armor
//! - Laser damage is scaled by `1 - reflect` and ignores armor
//! - Whatever makes it through a module continues with
//!   `(amount - armor) * (1 - penetration_blocking)`

use serde::{Deserialize, Serialize};

/// How incoming damage interacts with module defenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DamageType {
    /// Bullets and penetrators.
    #[default]
    Ballistic,
    /// Missiles, torpedoes, mines and death explosions.
    Explosive,
    /// Beam weapons.
    Laser,
}

/// Defensive stats of a module at the moment of impact.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Defenses {
    /// Flat reduction against ballistic and explosive damage.
    pub armor: f64,
    /// Fraction of laser damage turned away.
    pub reflect: f64,
    /// Fraction of leftover damage that does not pass through.
    pub penetration_blocking: f64,
}

/// Health removed from a module by a hit of `amount`.
#[must_use]
pub fn mitigate(amount: f64, kind: DamageType, defenses: Defenses) -> f64 {
    match kind {
        DamageType::Laser => amount * (1.0 - defenses.reflect).max(0.0),
        DamageType::Ballistic | DamageType::Explosive => (amount - defenses.armor).max(0.0),
    }
}

/// Damage left over for whatever lies behind the struck module.
#[must_use]
pub fn penetration_residual(amount: f64, defenses: Defenses) -> f64 {
    ((amount - defenses.armor) * (1.0 - defenses.penetration_blocking)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLATE: Defenses = Defenses {
        armor: 4.0,
        reflect: 0.25,
        penetration_blocking: 0.5,
    };

    #[test]
    fn test_armor_reduces_ballistic() {
        assert_eq!(mitigate(10.0, DamageType::Ballistic, PLATE), 6.0);
        assert_eq!(mitigate(10.0, DamageType::Explosive, PLATE), 6.0);
    }

    #[test]
    fn test_armor_never_heals() {
        assert_eq!(mitigate(1.0, DamageType::Ballistic, PLATE), 0.0);
        assert_eq!(penetration_residual(1.0, PLATE), 0.0);
    }

    #[test]
    fn test_reflect_scales_laser() {
        assert_eq!(mitigate(8.0, DamageType::Laser, PLATE), 6.0);
    }

    #[test]
    fn test_penetration_residual() {
        assert_eq!(penetration_residual(10.0, PLATE), 3.0);
        let open = Defenses::default();
        assert_eq!(penetration_residual(10.0, open), 10.0);
    }
}
