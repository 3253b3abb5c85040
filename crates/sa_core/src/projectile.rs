//! Projectiles, beams, munitions and junk.
//!
//! Every projectile moves along its facing each tick and resolves hits
//! against the opposing side's hittables in the order the travel segment
//! crosses them. Cell hits follow one rule set:
//!
//! 1. An active shield covering the cell absorbs the damage and stops the
//!    projectile. Munitions stopped this way do no area damage.
//! 2. Cells without a module are passed through.
//! 3. A destroyed module hands the hit to its ship's nearest live module.
//! 4. Otherwise the module takes the damage.
//!
//! Lasers are projectiles that cover their full length in a single one
//! second step and then vanish.

use std::cmp::Ordering;

use crate::combat::DamageType;
use crate::entity::{Hittable, ModuleId, ProjectileId, ShipId, Side};
use crate::math::{closest_on_segment, signed_angle, Transform, Vec2};
use crate::render::{Canvas, Drawable, ProjectileStyle};
use crate::ship::Ship;
use crate::spatial::UniformGrid;
use crate::units::{Distance, Speed, Time, UnitExt};

/// Collision radius of a junk piece.
pub const JUNK_RADIUS: Distance = Distance::cells(1.0);

/// Time a laser beam needs to cover its full length.
const BEAM_STEP: Time = Time::seconds(1.0);

/// Area-damage munition families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MunitionKind {
    /// Guided.
    Missile,
    /// Unguided.
    Torpedo,
    /// Unguided and slowing down.
    Mine,
}

/// Target lock of a guided munition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guidance {
    /// Ship steered towards.
    pub target: ShipId,
    /// Turn rate, radians per second.
    pub turn_rate: f64,
}

/// Projectile family and per-family state.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectileKind {
    /// Straight bullet, stopped by the first module.
    Bullet,
    /// Bullet that loses a fraction of its damage per module and keeps going.
    Penetrating {
        /// Fraction of damage kept after each module.
        factor: f64,
        /// Modules already struck, never hit twice.
        struck: Vec<(ShipId, ModuleId)>,
    },
    /// Area-damage munition.
    Munition {
        /// Family.
        kind: MunitionKind,
        /// Blast radius.
        radius: Distance,
        /// Lock for guided munitions.
        guidance: Option<Guidance>,
        /// Speed multiplier applied every tick.
        damping: f64,
    },
    /// Instant beam.
    Laser,
    /// Free-floating junk that soaks enemy fire.
    Junk {
        /// Remaining health.
        health: f64,
    },
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    side: Side,
    transform: Transform,
    speed: Speed,
    lifetime: Time,
    damage: f64,
    destroyed: bool,
    trail_start: Vec2,
    kind: ProjectileKind,
}

/// Everything a projectile can touch while it ticks.
pub struct ProjectileWorld<'a> {
    /// Tick length.
    pub dt: Time,
    /// Ray-march step in cells.
    pub ray_step: f64,
    /// Every ship of the battle, indexed by [`ShipId`].
    pub ships: &'a mut [Ship],
    /// Hittables of the side this projectile is fired at.
    pub hittables: &'a mut UniformGrid<Hittable>,
    /// The other projectiles of this tick.
    pub others: OtherProjectiles<'a>,
}

/// The projectile list with the ticking projectile cut out.
pub struct OtherProjectiles<'a> {
    before: &'a mut [Projectile],
    after: &'a mut [Projectile],
}

impl<'a> OtherProjectiles<'a> {
    /// Split `projectiles` around `index`.
    pub fn split(
        projectiles: &'a mut [Projectile],
        index: usize,
    ) -> Option<(&'a mut Projectile, Self)> {
        if index >= projectiles.len() {
            return None;
        }
        let (before, rest) = projectiles.split_at_mut(index);
        let (current, after) = rest.split_first_mut()?;
        Some((current, Self { before, after }))
    }

    fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        let index = id.index();
        match index.cmp(&self.before.len()) {
            Ordering::Less => self.before.get(index),
            Ordering::Equal => None,
            Ordering::Greater => self.after.get(index - self.before.len() - 1),
        }
    }

    fn get_mut(&mut self, id: ProjectileId) -> Option<&mut Projectile> {
        let index = id.index();
        match index.cmp(&self.before.len()) {
            Ordering::Less => self.before.get_mut(index),
            Ordering::Equal => None,
            Ordering::Greater => self.after.get_mut(index - self.before.len() - 1),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Impact {
    Cell { ship: ShipId, x: usize, y: usize },
    Junk(ProjectileId),
}

impl Projectile {
    /// Create a projectile at `transform`, facing its direction of travel.
    #[must_use]
    pub fn new(
        side: Side,
        transform: Transform,
        speed: Speed,
        lifetime: Time,
        damage: f64,
        kind: ProjectileKind,
    ) -> Self {
        Self {
            side,
            transform,
            speed,
            lifetime,
            damage,
            destroyed: false,
            trail_start: transform.position(),
            kind,
        }
    }

    /// Create a beam `length` long dealing `damage` once.
    #[must_use]
    pub fn laser(side: Side, transform: Transform, length: Distance, damage: f64) -> Self {
        Self::new(
            side,
            transform,
            length / BEAM_STEP,
            Time::ZERO,
            damage,
            ProjectileKind::Laser,
        )
    }

    /// Firing side.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.transform.position()
    }

    /// World transform.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Whether the projectile is gone.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Remaining damage.
    #[must_use]
    pub fn damage(&self) -> f64 {
        self.damage
    }

    /// Current speed.
    #[must_use]
    pub fn speed(&self) -> Speed {
        self.speed
    }

    /// Family and state.
    #[must_use]
    pub fn kind(&self) -> &ProjectileKind {
        &self.kind
    }

    /// Munition family, for point-defense odds.
    #[must_use]
    pub fn munition_kind(&self) -> Option<MunitionKind> {
        match self.kind {
            ProjectileKind::Munition { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Whether this is a junk piece enemy fire can hit.
    #[must_use]
    pub fn is_junk(&self) -> bool {
        matches!(self.kind, ProjectileKind::Junk { .. })
    }

    /// Destroy in flight.
    pub fn shoot_down(&mut self) {
        self.destroyed = true;
    }

    fn take_junk_damage(&mut self, amount: f64) {
        if let ProjectileKind::Junk { health } = &mut self.kind {
            *health -= amount;
            if *health <= 0.0 {
                self.destroyed = true;
            }
        }
    }

    /// Advance one tick, resolving every hit along the way.
    pub fn tick(&mut self, world: &mut ProjectileWorld<'_>) {
        if self.destroyed {
            return;
        }
        self.trail_start = self.transform.position();

        let dt = if matches!(self.kind, ProjectileKind::Laser) {
            BEAM_STEP
        } else {
            world.dt
        };
        self.steer(world, dt);

        let travel = self.speed * dt;
        if !self.is_junk() {
            if let Some(stop) = self.resolve_hits(world, travel) {
                self.transform = Transform::at(self.transform.ahead(stop.cells()), self.transform.rotation);
                self.destroyed = true;
                return;
            }
        }

        self.transform = Transform::at(self.transform.ahead(travel), self.transform.rotation);
        self.lifetime -= dt;
        if self.lifetime <= Time::ZERO {
            self.destroyed = true;
        }
    }

    fn steer(&mut self, world: &ProjectileWorld<'_>, dt: Time) {
        let ProjectileKind::Munition {
            guidance, damping, ..
        } = &self.kind
        else {
            return;
        };
        if let Some(guidance) = guidance {
            let target = world
                .ships
                .get(guidance.target.index())
                .filter(|ship| !ship.is_destroyed());
            if let Some(target) = target {
                let desired = (target.position() - self.position()).angle();
                let error = signed_angle(self.transform.rotation, desired);
                let max_turn = guidance.turn_rate * dt.as_seconds();
                self.transform.rotation = self.transform.rotation + error.clamp(-max_turn, max_turn);
            }
        }
        self.speed = self.speed * *damping;
    }

    /// Walk the travel segment; returns the distance at which the projectile
    /// stopped, if it did.
    fn resolve_hits(&mut self, world: &mut ProjectileWorld<'_>, travel: Distance) -> Option<f64> {
        let origin = self.position();
        let direction = self.transform.rotation;
        let end = self.transform.ahead(travel);

        let candidates: Vec<Hittable> = world.hittables.query_ray(origin, direction, travel).collect();
        let mut impacts: Vec<(f64, Impact)> = Vec::new();
        for candidate in candidates {
            match candidate {
                Hittable::Ship(id) => {
                    let Some(ship) = world.ships.get(id.index()) else {
                        continue;
                    };
                    if ship.is_destroyed() {
                        continue;
                    }
                    impacts.extend(
                        ship.ray_intersect(origin, direction, travel, world.ray_step)
                            .map(|hit| (hit.traveled, Impact::Cell { ship: id, x: hit.x, y: hit.y })),
                    );
                }
                Hittable::Junk(id) => {
                    let Some(junk) = world.others.get(id) else {
                        continue;
                    };
                    if junk.destroyed {
                        continue;
                    }
                    let (along, miss) = closest_on_segment(origin, end, junk.position());
                    if miss <= JUNK_RADIUS.as_cells() {
                        impacts.push((along, Impact::Junk(id)));
                    }
                }
            }
        }
        impacts.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (traveled, impact) in impacts {
            let stopped = match impact {
                Impact::Cell { ship, x, y } => match world.ships.get_mut(ship.index()) {
                    Some(target) => self.strike_cell(target, ship, x, y, origin, traveled),
                    None => false,
                },
                Impact::Junk(id) => {
                    if let Some(junk) = world.others.get_mut(id) {
                        junk.take_junk_damage(self.damage);
                    }
                    true
                }
            };
            if stopped {
                return Some(traveled);
            }
        }
        None
    }

    /// Apply the cell hit rules; returns whether the projectile stops.
    fn strike_cell(
        &mut self,
        ship: &mut Ship,
        ship_id: ShipId,
        x: usize,
        y: usize,
        origin: Vec2,
        traveled: f64,
    ) -> bool {
        if ship.is_destroyed() {
            return false;
        }
        if let Some(shield) = ship.active_shield_at(x, y) {
            ship.absorb(shield, self.damage);
            return true;
        }
        let Some(occupant) = ship.module_at(x, y) else {
            return false;
        };
        let impact_point = origin + Vec2::from_angle(self.transform.rotation) * traveled;
        let (target, redirected) = if ship.module(occupant).is_some_and(|m| !m.is_destroyed()) {
            (occupant, false)
        } else {
            match ship.nearest_live_module(impact_point) {
                Some(nearest) => (nearest, true),
                None => return false,
            }
        };

        match &mut self.kind {
            ProjectileKind::Bullet => {
                ship.damage_module(target, self.damage, DamageType::Ballistic);
                true
            }
            ProjectileKind::Laser => {
                ship.damage_module(target, self.damage, DamageType::Laser);
                true
            }
            ProjectileKind::Penetrating { factor, struck } => {
                if struck.contains(&(ship_id, target)) {
                    return false;
                }
                struck.push((ship_id, target));
                let residual = ship.damage_module(target, self.damage, DamageType::Ballistic);
                self.damage = residual * *factor;
                self.damage <= 0.0
            }
            ProjectileKind::Munition { radius, .. } => {
                let center = if redirected {
                    ship.module(target)
                        .map_or(impact_point, |module| module.transform().position())
                } else {
                    impact_point
                };
                ship.take_aoe_damage(center, *radius, self.damage, DamageType::Explosive);
                true
            }
            ProjectileKind::Junk { .. } => false,
        }
    }

    fn style(&self) -> Option<ProjectileStyle> {
        Some(match &self.kind {
            ProjectileKind::Bullet | ProjectileKind::Penetrating { .. } => ProjectileStyle::Bullet,
            ProjectileKind::Munition { kind, .. } => match kind {
                MunitionKind::Missile => ProjectileStyle::Missile,
                MunitionKind::Torpedo => ProjectileStyle::Torpedo,
                MunitionKind::Mine => ProjectileStyle::Mine,
            },
            ProjectileKind::Junk { .. } => ProjectileStyle::Junk,
            ProjectileKind::Laser => return None,
        })
    }
}

impl Drawable for Projectile {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn bounding_radius(&self) -> Distance {
        if self.is_junk() {
            JUNK_RADIUS
        } else {
            Distance::ZERO
        }
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        match self.style() {
            Some(style) => canvas.projectile(self.trail_start, self.position(), self.side, style),
            None => canvas.beam(self.trail_start, self.position(), self.side),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Angle;

    fn bullet(x: f64) -> Projectile {
        Projectile::new(
            Side::Zero,
            Transform::new(x, 0.0, Angle::ZERO),
            10.cells_per_second(),
            1.seconds(),
            4.0,
            ProjectileKind::Bullet,
        )
    }

    #[test]
    fn test_laser_covers_length_in_one_step() {
        let beam = Projectile::laser(Side::One, Transform::default(), 100.cells(), 0.5);
        assert_eq!(beam.speed() * BEAM_STEP, 100.cells());
        assert!(beam.style().is_none());
    }

    #[test]
    fn test_split_skips_current() {
        let mut list = vec![bullet(0.0), bullet(1.0), bullet(2.0)];
        let (current, others) = OtherProjectiles::split(&mut list, 1).unwrap();
        assert_eq!(current.position().x, 1.0);
        assert!(others.get(ProjectileId(1)).is_none());
        assert_eq!(others.get(ProjectileId(0)).map(|p| p.position().x), Some(0.0));
        assert_eq!(others.get(ProjectileId(2)).map(|p| p.position().x), Some(2.0));
        assert!(others.get(ProjectileId(3)).is_none());
    }

    #[test]
    fn test_split_out_of_range() {
        let mut list = vec![bullet(0.0)];
        assert!(OtherProjectiles::split(&mut list, 1).is_none());
    }

    #[test]
    fn test_junk_health() {
        let mut junk = Projectile::new(
            Side::One,
            Transform::default(),
            Speed::ZERO,
            10.seconds(),
            0.0,
            ProjectileKind::Junk { health: 10.0 },
        );
        junk.take_junk_damage(4.0);
        assert!(!junk.is_destroyed());
        junk.take_junk_damage(6.0);
        assert!(junk.is_destroyed());
    }

    #[test]
    fn test_flies_until_lifetime_ends() {
        let mut ships: Vec<Ship> = Vec::new();
        let mut grid = UniformGrid::new(4);
        let mut list = vec![bullet(0.0)];
        for _ in 0..10 {
            let (current, others) = OtherProjectiles::split(&mut list, 0).unwrap();
            let mut world = ProjectileWorld {
                dt: 0.25.seconds(),
                ray_step: 0.8,
                ships: &mut ships,
                hittables: &mut grid,
                others,
            };
            current.tick(&mut world);
        }
        assert!(list[0].is_destroyed());
        assert!((list[0].position().x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_munition_kind() {
        let mine = Projectile::new(
            Side::Zero,
            Transform::default(),
            5.cells_per_second(),
            3.seconds(),
            4.0,
            ProjectileKind::Munition {
                kind: MunitionKind::Mine,
                radius: 2.cells(),
                guidance: None,
                damping: 0.9,
            },
        );
        assert_eq!(mine.munition_kind(), Some(MunitionKind::Mine));
        assert_eq!(bullet(0.0).munition_kind(), None);
    }
}
