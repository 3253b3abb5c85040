//! Renderer hooks.
//!
//! The engine never draws anything itself. An external renderer implements
//! [`Canvas`] and calls [`crate::game::Game::draw`], which walks every live
//! entity through its [`Drawable`] implementation.

use crate::entity::Side;
use crate::math::{Transform, Vec2};
use crate::units::Distance;

/// Visual state of a module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModuleState {
    /// Working, with its health fraction.
    Intact {
        /// Health fraction in `[0, 1]`.
        health: f64,
    },
    /// Alive but skipped this tick.
    Depowered,
    /// Wreckage.
    Destroyed,
}

/// Shape of a projectile trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileStyle {
    /// Plain or penetrating bullet.
    Bullet,
    /// Guided missile.
    Missile,
    /// Torpedo.
    Torpedo,
    /// Mine.
    Mine,
    /// Junk piece.
    Junk,
}

/// Drawing surface supplied by a renderer.
pub trait Canvas {
    /// A module rectangle, `width` x `height` cells, centred on `transform`.
    fn module_cell(
        &mut self,
        transform: Transform,
        width: f64,
        height: f64,
        side: Side,
        state: ModuleState,
    );

    /// A shield bubble. `strength` is the remaining fraction, `flash` fades
    /// from 1 to 0 during the second after a hit.
    fn shield_bubble(&mut self, center: Vec2, radius: Distance, strength: f64, flash: f64);

    /// A laser beam segment.
    fn beam(&mut self, from: Vec2, to: Vec2, side: Side);

    /// A projectile and the trail it left this tick.
    fn projectile(&mut self, from: Vec2, to: Vec2, side: Side, style: ProjectileStyle);

    /// Marker for a ship that is currently out of power.
    fn unpowered_marker(&mut self, transform: Transform, size: Distance);
}

/// An entity an external renderer can draw.
pub trait Drawable {
    /// World transform.
    fn transform(&self) -> Transform;

    /// Approximate bounding radius.
    fn bounding_radius(&self) -> Distance;

    /// Whether the entity is gone.
    fn is_destroyed(&self) -> bool;

    /// Draw onto `canvas`.
    fn draw(&self, canvas: &mut dyn Canvas);
}
