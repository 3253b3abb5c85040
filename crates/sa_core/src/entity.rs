//! Entity handles shared across the engine.
//!
//! Ships, modules and projectiles live in arenas owned by the
//! [`crate::game::Game`] and its ships. Everything else refers to them
//! through these integer handles, never through references.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::units::Distance;

/// One of the two fleets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// First fleet.
    Zero,
    /// Second fleet.
    One,
}

impl Side {
    /// Both sides in tick order.
    pub const BOTH: [Side; 2] = [Side::Zero, Side::One];

    /// Array index of this side.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Handle of a ship inside its battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShipId(pub u32);

/// Handle of a module inside its ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub u32);

/// Handle of a projectile inside the current tick's object list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(pub u32);

macro_rules! index_handle {
    ($ty:ident) => {
        impl $ty {
            /// Position in the owning arena.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Handle for arena position `index`.
            #[must_use]
            pub fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).unwrap_or(u32::MAX))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

index_handle!(ShipId);
index_handle!(ModuleId);
index_handle!(ProjectileId);

/// Something projectiles can collide with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hittable {
    /// A ship, resolved cell by cell.
    Ship(ShipId),
    /// A free-floating junk piece.
    Junk(ProjectileId),
}

/// What weapons and steering need to know about an enemy ship.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipSnapshot {
    /// Ship handle.
    pub id: ShipId,
    /// World position of the ship's centre.
    pub position: Vec2,
    /// Bounding radius.
    pub radius: Distance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opponent() {
        assert_eq!(Side::Zero.opponent(), Side::One);
        assert_eq!(Side::One.opponent().index(), 0);
    }

    #[test]
    fn test_handle_round_trip() {
        assert_eq!(ShipId::from_index(7).index(), 7);
        assert_eq!(ModuleId::from_index(0), ModuleId(0));
    }
}
