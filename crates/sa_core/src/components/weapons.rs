//! Guns, junk launchers and point defense.

use std::f64::consts::TAU;

use rand::Rng;
use tracing::trace;

use super::{ModuleHost, TickContext};
use crate::attribute::Attribute;
use crate::buff::{BuffOp, ModuleBuff, ModuleTag, StatKind};
use crate::catalog::{flight_time, GunSpec, GunSpecKind, LoaderSpec};
use crate::entity::{ProjectileId, ShipId, ShipSnapshot};
use crate::math::{clamp_angle, cone_circle_intersect, Transform, Vec2};
use crate::projectile::{Guidance, MunitionKind, Projectile, ProjectileKind};
use crate::units::{Distance, Speed, Time};

/// Target selection and aiming shared by everything that shoots at ships.
#[derive(Debug, Clone, PartialEq)]
pub struct Targeting {
    range: Attribute<Distance>,
    firing_arc: Attribute<f64>,
    spread: f64,
    target: Option<ShipId>,
}

impl Targeting {
    /// Create targeting with a cone `firing_arc` radians wide.
    #[must_use]
    pub fn new(range: Distance, firing_arc: f64, spread: f64) -> Self {
        Self {
            range: Attribute::new(range),
            firing_arc: Attribute::new(firing_arc),
            spread,
            target: None,
        }
    }

    /// Current range.
    #[must_use]
    pub fn range(&self) -> Distance {
        self.range.value()
    }

    /// Currently locked target.
    #[must_use]
    pub fn target(&self) -> Option<ShipId> {
        self.target
    }

    fn can_target(&self, mount: Transform, enemy: &ShipSnapshot) -> bool {
        mount.position().distance(enemy.position) < self.range.value().as_cells()
            && cone_circle_intersect(enemy.position, enemy.radius, mount, self.firing_arc.value())
    }

    /// Keep the locked target while it stays valid, otherwise lock the
    /// first valid enemy.
    pub fn acquire(&mut self, mount: Transform, enemies: &[ShipSnapshot]) -> Option<ShipSnapshot> {
        let current = self
            .target
            .and_then(|id| enemies.iter().find(|enemy| enemy.id == id))
            .filter(|enemy| self.can_target(mount, enemy));
        let found = current.or_else(|| enemies.iter().find(|enemy| self.can_target(mount, enemy)));
        self.target = found.map(|enemy| enemy.id);
        found.copied()
    }

    /// Firing direction towards `aim_point`, clamped to the arc, with spread.
    pub fn aim(&self, mount: Transform, aim_point: Vec2, rng: &mut impl Rng) -> Transform {
        let bearing = (aim_point - mount.position()).angle();
        let clamped = clamp_angle(bearing, mount.rotation, self.firing_arc.value() / 2.0);
        let jitter = self.spread * (rng.gen::<f64>() - 0.5);
        Transform::at(mount.position(), clamped + jitter)
    }

    fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        match buff.stat {
            StatKind::Range => op.on(&mut self.range, buff.multiplier),
            StatKind::FiringArc => op.on(&mut self.firing_arc, buff.multiplier),
            _ => {}
        }
    }
}

/// Magazine that loads continuously and empties in bursts.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstLoader {
    max_ammo: f64,
    threshold: f64,
    interval: f64,
    ammo: f64,
    bursting: bool,
    burst_time: f64,
}

impl BurstLoader {
    /// Empty magazine.
    #[must_use]
    pub fn new(spec: &LoaderSpec) -> Self {
        Self {
            max_ammo: spec.max_ammo,
            threshold: spec.burst_threshold,
            interval: spec.burst_interval.as_seconds(),
            ammo: 0.0,
            bursting: false,
            burst_time: 0.0,
        }
    }

    /// Rounds currently loaded.
    #[must_use]
    pub fn ammo(&self) -> f64 {
        self.ammo
    }

    /// Whether a burst is in progress.
    #[must_use]
    pub fn is_bursting(&self) -> bool {
        self.bursting
    }

    /// Load for `dt` and return the number of shots fired this tick.
    ///
    /// A burst starts once a target is available and the magazine holds at
    /// least the threshold. It fires one round per interval and ends when
    /// the magazine runs dry or the target is lost.
    pub fn advance(&mut self, dt: Time, fire_rate: f64, has_target: bool) -> u32 {
        self.ammo = (self.ammo + dt.as_seconds() * fire_rate).min(self.max_ammo);
        if self.bursting {
            if !has_target {
                self.bursting = false;
                return 0;
            }
            self.burst_time += dt.as_seconds();
        } else {
            if !has_target || self.ammo < self.threshold {
                return 0;
            }
            self.bursting = true;
            self.burst_time = self.interval;
        }

        let mut shots = 0;
        while self.ammo >= 1.0 && self.burst_time >= self.interval {
            self.ammo -= 1.0;
            self.burst_time -= self.interval;
            shots += 1;
        }
        if self.ammo < 1.0 {
            self.bursting = false;
        }
        shots
    }
}

/// Firing and cooling phases of a beam weapon.
#[derive(Debug, Clone, PartialEq)]
pub struct LaserCycle {
    duration: Time,
    firing: bool,
    remaining: f64,
}

impl LaserCycle {
    /// Cycle ready to fire.
    #[must_use]
    pub fn new(duration: Time) -> Self {
        Self {
            duration,
            firing: false,
            remaining: 0.0,
        }
    }

    /// Whether the beam is on.
    #[must_use]
    pub fn is_firing(&self) -> bool {
        self.firing
    }

    /// Advance by `dt`; returns whether a beam segment is emitted this tick.
    pub fn advance(&mut self, dt: Time, fire_rate: f64, has_target: bool) -> bool {
        let dt = dt.as_seconds();
        if !self.firing {
            if self.remaining > 0.0 {
                self.remaining -= dt;
                return false;
            }
            if !has_target {
                return false;
            }
            self.firing = true;
            self.remaining = self.duration.as_seconds();
        }
        if !has_target {
            self.cool_down(fire_rate);
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.cool_down(fire_rate);
        }
        true
    }

    fn cool_down(&mut self, fire_rate: f64) {
        self.firing = false;
        self.remaining = if fire_rate > 0.0 {
            1.0 / fire_rate
        } else {
            f64::INFINITY
        };
    }
}

/// What a projectile gun puts into each shot.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain bullet.
    Bullet,
    /// Bullet that keeps a fraction of its damage after each module.
    Penetrating {
        /// Fraction of damage kept per obstacle.
        penetration: f64,
    },
    /// Area-damage munition.
    Munition {
        /// Munition family.
        kind: MunitionKind,
        /// Blast radius.
        radius: Attribute<Distance>,
        /// Turn rate for guided munitions, radians per second.
        guidance: f64,
        /// Per-tick speed multiplier for mines.
        damping: f64,
    },
}

/// Firing mechanism of a gun.
#[derive(Debug, Clone, PartialEq)]
pub enum GunKind {
    /// Spawns projectiles in bursts.
    Projectile {
        /// Magazine.
        loader: BurstLoader,
        /// Muzzle speed.
        speed: Speed,
        /// Flight time; derived from range and speed when absent.
        lifetime: Option<Time>,
        /// Shot contents.
        payload: Payload,
    },
    /// Continuous beam.
    Laser(LaserCycle),
}

/// A weapon aimed at enemy ships.
#[derive(Debug, Clone, PartialEq)]
pub struct Gun {
    targeting: Targeting,
    damage: Attribute<f64>,
    fire_rate: Attribute<f64>,
    kind: GunKind,
}

impl Gun {
    /// Build a gun from its catalog definition.
    #[must_use]
    pub fn from_spec(spec: &GunSpec) -> Self {
        let targeting = Targeting::new(spec.range, spec.firing_arc, spec.spread);
        let projectile = |loader: &LoaderSpec, speed: Speed, lifetime, payload| {
            (
                loader.fire_rate,
                GunKind::Projectile {
                    loader: BurstLoader::new(loader),
                    speed,
                    lifetime,
                    payload,
                },
            )
        };
        let munition = |kind, radius: Distance, guidance, damping| Payload::Munition {
            kind,
            radius: Attribute::new(radius),
            guidance,
            damping,
        };
        let (fire_rate, kind) = match &spec.kind {
            GunSpecKind::Burst { loader, speed } => projectile(loader, *speed, None, Payload::Bullet),
            GunSpecKind::Penetrating {
                loader,
                speed,
                penetration,
            } => projectile(
                loader,
                *speed,
                None,
                Payload::Penetrating {
                    penetration: *penetration,
                },
            ),
            GunSpecKind::Missile {
                loader,
                speed,
                radius,
                guidance,
                lifetime,
            } => projectile(
                loader,
                *speed,
                Some(*lifetime),
                munition(MunitionKind::Missile, *radius, *guidance, 1.0),
            ),
            GunSpecKind::Torpedo {
                loader,
                speed,
                radius,
            } => projectile(
                loader,
                *speed,
                None,
                munition(MunitionKind::Torpedo, *radius, 0.0, 1.0),
            ),
            GunSpecKind::Mine {
                loader,
                speed,
                radius,
                damping,
            } => projectile(
                loader,
                *speed,
                None,
                munition(MunitionKind::Mine, *radius, 0.0, *damping),
            ),
            GunSpecKind::Laser { fire_rate, duration } => {
                (*fire_rate, GunKind::Laser(LaserCycle::new(*duration)))
            }
        };
        Self {
            targeting,
            damage: Attribute::new(spec.damage),
            fire_rate: Attribute::new(fire_rate),
            kind,
        }
    }

    /// Tags by firing mechanism.
    #[must_use]
    pub fn tags(&self) -> &'static [ModuleTag] {
        match &self.kind {
            GunKind::Laser(_) => &[ModuleTag::Weapon, ModuleTag::Laser],
            GunKind::Projectile {
                payload: Payload::Munition { .. },
                ..
            } => &[ModuleTag::Weapon, ModuleTag::Missile],
            GunKind::Projectile { .. } => &[ModuleTag::Weapon, ModuleTag::Ballistic],
        }
    }

    /// Current range.
    #[must_use]
    pub fn range(&self) -> Distance {
        self.targeting.range()
    }

    /// Current damage per shot, or per second for lasers.
    #[must_use]
    pub fn damage(&self) -> f64 {
        self.damage.value()
    }

    /// Current fire rate.
    #[must_use]
    pub fn fire_rate(&self) -> f64 {
        self.fire_rate.value()
    }

    /// Targeting state.
    #[must_use]
    pub fn targeting(&self) -> &Targeting {
        &self.targeting
    }

    /// Firing mechanism state.
    #[must_use]
    pub fn kind(&self) -> &GunKind {
        &self.kind
    }

    pub(crate) fn tick(&mut self, host: &ModuleHost, ctx: &mut TickContext<'_>) {
        let Self {
            targeting,
            damage,
            fire_rate,
            kind,
        } = self;
        let target = targeting.acquire(host.transform, ctx.enemies);
        match kind {
            GunKind::Projectile {
                loader,
                speed,
                lifetime,
                payload,
            } => {
                let shots = loader.advance(ctx.dt, fire_rate.value(), target.is_some());
                let Some(target) = target else {
                    return;
                };
                let lifetime = lifetime.unwrap_or_else(|| flight_time(targeting.range(), *speed));
                let damage = damage.value() * ctx.damage_scaling;
                for _ in 0..shots {
                    let aim = targeting.aim(host.transform, target.position, &mut *ctx.rng);
                    let kind = match payload {
                        Payload::Bullet => ProjectileKind::Bullet,
                        Payload::Penetrating { penetration } => ProjectileKind::Penetrating {
                            factor: *penetration,
                            struck: Vec::new(),
                        },
                        Payload::Munition {
                            kind,
                            radius,
                            guidance,
                            damping,
                        } => ProjectileKind::Munition {
                            kind: *kind,
                            radius: radius.value(),
                            guidance: (*kind == MunitionKind::Missile).then_some(Guidance {
                                target: target.id,
                                turn_rate: *guidance,
                            }),
                            damping: *damping,
                        },
                    };
                    ctx.spawns.push(Projectile::new(
                        host.side, aim, *speed, lifetime, damage, kind,
                    ));
                }
            }
            GunKind::Laser(cycle) => {
                if !cycle.advance(ctx.dt, fire_rate.value(), target.is_some()) {
                    return;
                }
                let Some(target) = target else {
                    return;
                };
                let aim = targeting.aim(host.transform, target.position, &mut *ctx.rng);
                let damage = damage.value() * ctx.damage_scaling * ctx.dt.as_seconds();
                ctx.spawns.push(Projectile::laser(
                    host.side,
                    aim,
                    targeting.range(),
                    damage,
                ));
            }
        }
    }

    pub(crate) fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        match buff.stat {
            StatKind::Damage => op.on(&mut self.damage, buff.multiplier),
            StatKind::FireRate => op.on(&mut self.fire_rate, buff.multiplier),
            StatKind::ExplosionRadius => {
                if let GunKind::Projectile {
                    payload: Payload::Munition { radius, .. },
                    ..
                } = &mut self.kind
                {
                    op.on(radius, buff.multiplier);
                }
            }
            _ => self.targeting.apply_buff(buff, op),
        }
    }
}

/// Launches junk pieces in every direction once an enemy is in range.
#[derive(Debug, Clone, PartialEq)]
pub struct JunkLauncher {
    targeting: Targeting,
    loader: BurstLoader,
    fire_rate: Attribute<f64>,
    speed: Speed,
    junk_health: Attribute<f64>,
}

impl JunkLauncher {
    /// Create a launcher.
    #[must_use]
    pub fn new(loader: LoaderSpec, range: Distance, speed: Speed, junk_health: f64) -> Self {
        Self {
            targeting: Targeting::new(range, TAU, TAU),
            loader: BurstLoader::new(&loader),
            fire_rate: Attribute::new(loader.fire_rate),
            speed,
            junk_health: Attribute::new(junk_health),
        }
    }

    /// Health given to each launched piece.
    #[must_use]
    pub fn junk_health(&self) -> f64 {
        self.junk_health.value()
    }

    pub(crate) fn tick(&mut self, host: &ModuleHost, ctx: &mut TickContext<'_>) {
        let target = self.targeting.acquire(host.transform, ctx.enemies);
        let shots = self
            .loader
            .advance(ctx.dt, self.fire_rate.value(), target.is_some());
        let Some(target) = target else {
            return;
        };
        let lifetime = flight_time(self.targeting.range(), self.speed);
        for _ in 0..shots {
            let aim = self.targeting.aim(host.transform, target.position, &mut *ctx.rng);
            ctx.spawns.push(Projectile::new(
                host.side,
                aim,
                self.speed,
                lifetime,
                0.0,
                ProjectileKind::Junk {
                    health: self.junk_health.value(),
                },
            ));
        }
    }

    pub(crate) fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        match buff.stat {
            StatKind::FireRate => op.on(&mut self.fire_rate, buff.multiplier),
            StatKind::JunkHealth => op.on(&mut self.junk_health, buff.multiplier),
            _ => self.targeting.apply_buff(buff, op),
        }
    }
}

/// Shoots down enemy munitions.
#[derive(Debug, Clone, PartialEq)]
pub struct PointDefense {
    fire_rate: Attribute<f64>,
    chances: [f64; 3],
    range: Attribute<Distance>,
    loaded: f64,
}

impl PointDefense {
    /// Create a turret with success chances against missiles, torpedoes and
    /// mines, in that order.
    #[must_use]
    pub fn new(fire_rate: f64, chances: [f64; 3], range: Distance) -> Self {
        Self {
            fire_rate: Attribute::new(fire_rate),
            chances,
            range: Attribute::new(range),
            loaded: 0.0,
        }
    }

    /// Success chance against `kind`.
    #[must_use]
    pub fn chance(&self, kind: MunitionKind) -> f64 {
        match kind {
            MunitionKind::Missile => self.chances[0],
            MunitionKind::Torpedo => self.chances[1],
            MunitionKind::Mine => self.chances[2],
        }
    }

    pub(crate) fn tick(&mut self, host: &ModuleHost, ctx: &mut TickContext<'_>) {
        self.loaded += self.fire_rate.value() * ctx.dt.as_seconds();
        if self.loaded < 1.0 {
            return;
        }
        self.loaded = 0.0;

        let origin = host.transform.position();
        let projectiles = &*ctx.projectiles;
        let mut nearest: Option<(f64, ProjectileId, MunitionKind)> = None;
        for id in ctx.hostile_munitions.query_radius(origin, self.range.value()) {
            let Some(projectile) = projectiles.get(id.index()) else {
                continue;
            };
            if projectile.is_destroyed() {
                continue;
            }
            let Some(kind) = projectile.munition_kind() else {
                continue;
            };
            let dist = projectile.position().distance_squared(origin);
            if nearest.map_or(true, |(best, _, _)| dist < best) {
                nearest = Some((dist, id, kind));
            }
        }
        let Some((_, id, kind)) = nearest else {
            return;
        };

        let hit = ctx.rng.gen::<f64>() < self.chance(kind);
        trace!(module = %host.module, ship = %host.ship, target = %id, ?kind, hit, "Point defense shot");
        if hit {
            if let Some(projectile) = ctx.projectiles.get_mut(id.index()) {
                projectile.shoot_down();
            }
        }
    }

    pub(crate) fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        match buff.stat {
            StatKind::FireRate => op.on(&mut self.fire_rate, buff.multiplier),
            StatKind::Range => op.on(&mut self.range, buff.multiplier),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ModuleId, Side};
    use crate::spatial::{Bounds, UniformGrid};
    use crate::units::{Angle, UnitExt};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn chaingun() -> GunSpec {
        GunSpec {
            range: 35.cells(),
            firing_arc: 70f64.to_radians(),
            spread: 0.05,
            damage: 4.0,
            kind: GunSpecKind::Burst {
                loader: LoaderSpec {
                    fire_rate: 3.3333,
                    max_ammo: 1.0,
                    burst_threshold: 1.0,
                    burst_interval: Time::ZERO,
                },
                speed: 200.cells_per_second(),
            },
        }
    }

    fn host() -> ModuleHost {
        ModuleHost {
            ship: ShipId(0),
            side: Side::Zero,
            module: ModuleId(0),
            transform: Transform::new(0.0, 0.0, Angle::ZERO),
            health: 1.0,
        }
    }

    fn enemy(id: u32, x: f64, y: f64) -> ShipSnapshot {
        ShipSnapshot {
            id: ShipId(id),
            position: Vec2::new(x, y),
            radius: 2.cells(),
        }
    }

    fn tick_gun(gun: &mut Gun, enemies: &[ShipSnapshot], ticks: usize) -> Vec<Projectile> {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut grid = UniformGrid::new(4);
        let mut spawns = Vec::new();
        for _ in 0..ticks {
            let mut ctx = TickContext {
                dt: 0.1.seconds(),
                damage_scaling: 1.0,
                rng: &mut rng,
                enemies,
                hostile_munitions: &mut grid,
                projectiles: &mut [],
                spawns: &mut spawns,
            };
            gun.tick(&host(), &mut ctx);
        }
        spawns
    }

    #[test]
    fn test_burst_loader_waits_for_threshold() {
        let mut loader = BurstLoader::new(&LoaderSpec {
            fire_rate: 1.0,
            max_ammo: 3.0,
            burst_threshold: 3.0,
            burst_interval: 0.5.seconds(),
        });
        assert_eq!(loader.advance(1.seconds(), 1.0, true), 0);
        assert_eq!(loader.advance(1.seconds(), 1.0, true), 0);
        // Third second fills the magazine and fires the first round at once.
        assert_eq!(loader.advance(1.seconds(), 1.0, true), 1);
        assert!(loader.is_bursting());
        assert_eq!(loader.advance(0.5.seconds(), 1.0, true), 1);
    }

    #[test]
    fn test_burst_loader_stops_without_target() {
        let mut loader = BurstLoader::new(&LoaderSpec {
            fire_rate: 10.0,
            max_ammo: 5.0,
            burst_threshold: 2.0,
            burst_interval: 1.seconds(),
        });
        assert_eq!(loader.advance(1.seconds(), 10.0, true), 1);
        assert_eq!(loader.advance(0.1.seconds(), 10.0, false), 0);
        assert!(!loader.is_bursting());
    }

    #[test]
    fn test_zero_interval_empties_magazine() {
        let mut loader = BurstLoader::new(&LoaderSpec {
            fire_rate: 4.0,
            max_ammo: 4.0,
            burst_threshold: 4.0,
            burst_interval: Time::ZERO,
        });
        assert_eq!(loader.advance(1.seconds(), 4.0, true), 4);
        assert!(!loader.is_bursting());
    }

    #[test]
    fn test_laser_cycle_phases() {
        // Exact binary steps: 0.25 s beam, 0.5 s cooldown at fire rate 2.
        let mut cycle = LaserCycle::new(0.25.seconds());
        let dt = 0.125.seconds();
        let phases: Vec<(bool, bool)> = (0..10)
            .map(|_| {
                let emitted = cycle.advance(dt, 2.0, true);
                (emitted, cycle.is_firing())
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                (true, true),
                (true, false),
                (false, false),
                (false, false),
                (false, false),
                (false, false),
                (true, true),
                (true, false),
                (false, false),
                (false, false),
            ]
        );
    }

    #[test]
    fn test_laser_loses_target_and_cools() {
        let mut cycle = LaserCycle::new(2.seconds());
        assert!(cycle.advance(0.1.seconds(), 1.0, true));
        assert!(!cycle.advance(0.1.seconds(), 1.0, false));
        assert!(!cycle.is_firing());
        assert!(!cycle.advance(0.1.seconds(), 1.0, true));
    }

    #[test]
    fn test_targeting_respects_range_and_arc() {
        let mut targeting = Targeting::new(35.cells(), 70f64.to_radians(), 0.0);
        let mount = Transform::new(0.0, 0.0, Angle::ZERO);
        assert!(targeting.acquire(mount, &[enemy(1, 50.0, 0.0)]).is_none());
        assert!(targeting.acquire(mount, &[enemy(1, -20.0, 0.0)]).is_none());
        let locked = targeting.acquire(mount, &[enemy(1, 20.0, 1.0)]);
        assert_eq!(locked.map(|e| e.id), Some(ShipId(1)));
    }

    #[test]
    fn test_targeting_keeps_lock() {
        let mut targeting = Targeting::new(35.cells(), TAU, 0.0);
        let mount = Transform::default();
        targeting.acquire(mount, &[enemy(2, 10.0, 0.0)]);
        let kept = targeting.acquire(mount, &[enemy(1, 5.0, 0.0), enemy(2, 10.0, 0.0)]);
        assert_eq!(kept.map(|e| e.id), Some(ShipId(2)));
    }

    #[test]
    fn test_aim_is_clamped_to_arc() {
        let targeting = Targeting::new(35.cells(), 90f64.to_radians(), 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mount = Transform::default();
        let aim = targeting.aim(mount, Vec2::new(0.0, 10.0), &mut rng);
        assert!((aim.rotation.as_radians() - 45f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_chaingun_fires_at_target() {
        let mut gun = Gun::from_spec(&chaingun());
        let shots = tick_gun(&mut gun, &[enemy(1, 20.0, 0.0)], 12);
        assert_eq!(shots.len(), 3);
        assert!(shots.iter().all(|p| p.side() == Side::Zero));
    }

    #[test]
    fn test_gun_holds_fire_without_target() {
        let mut gun = Gun::from_spec(&chaingun());
        assert!(tick_gun(&mut gun, &[], 30).is_empty());
    }

    #[test]
    fn test_damage_buff_and_tags() {
        let mut gun = Gun::from_spec(&chaingun());
        assert_eq!(gun.tags(), &[ModuleTag::Weapon, ModuleTag::Ballistic]);
        let buff = ModuleBuff::new(StatKind::Damage, ModuleTag::Weapon, 0.5);
        gun.apply_buff(&buff, BuffOp::Apply);
        assert_eq!(gun.damage(), 6.0);
        gun.apply_buff(&buff, BuffOp::Revoke);
        assert_eq!(gun.damage(), 4.0);
    }

    #[test]
    fn test_point_defense_shoots_down_missile() {
        let mut pd = PointDefense::new(10.0, [1.0, 1.0, 1.0], 19.cells());
        let missile = Projectile::new(
            Side::One,
            Transform::new(5.0, 0.0, Angle::ZERO),
            50.cells_per_second(),
            3.seconds(),
            4.0,
            ProjectileKind::Munition {
                kind: MunitionKind::Missile,
                radius: 2.cells(),
                guidance: None,
                damping: 1.0,
            },
        );
        let mut projectiles = vec![missile];
        let mut grid = UniformGrid::new(4);
        grid.reset(Bounds::around(Vec2::ZERO, 50.0));
        grid.add(ProjectileId(0), Vec2::new(5.0, 0.0), Distance::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut spawns = Vec::new();
        let mut ctx = TickContext {
            dt: 0.1.seconds(),
            damage_scaling: 1.0,
            rng: &mut rng,
            enemies: &[],
            hostile_munitions: &mut grid,
            projectiles: &mut projectiles,
            spawns: &mut spawns,
        };
        pd.tick(&host(), &mut ctx);
        assert!(projectiles[0].is_destroyed());
    }

    #[test]
    fn test_point_defense_needs_loading() {
        let mut pd = PointDefense::new(1.0, [1.0, 1.0, 1.0], 19.cells());
        let mut grid = UniformGrid::new(4);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut spawns = Vec::new();
        let mut ctx = TickContext {
            dt: 0.5.seconds(),
            damage_scaling: 1.0,
            rng: &mut rng,
            enemies: &[],
            hostile_munitions: &mut grid,
            projectiles: &mut [],
            spawns: &mut spawns,
        };
        pd.tick(&host(), &mut ctx);
        assert!((pd.loaded - 0.5).abs() < 1e-12);
        pd.tick(&host(), &mut ctx);
        assert_eq!(pd.loaded, 0.0);
    }
}
