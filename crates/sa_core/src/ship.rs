//! Ships: module grids, power, movement and damage routing.
//!
//! A ship owns an arena of [`Module`]s and a cell grid that refers to them by
//! [`ModuleId`]. Cells also list the shields covering them. The grid is
//! padded by the largest shield radius on every side so coverage never
//! leaves the grid.
//!
//! Layout convention: battle files draw ships pointing up, the engine faces
//! along +x. A placement at `(x, y)` therefore lands on grid column `y` and
//! row `x`, and module dimensions are swapped the same way.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use rand::Rng;
use tracing::{debug, trace};

use crate::buff::{BuffOp, ModuleBuff, StatKind};
use crate::catalog::Catalog;
use crate::combat::DamageType;
use crate::components::{ComponentEffect, DestroyEffect, ModuleHost, ShipTotals, TickContext};
use crate::config::Tuning;
use crate::data::ShipDescriptor;
use crate::entity::{ModuleId, ShipId, ShipSnapshot, Side};
use crate::error::{Result, SimError};
use crate::math::{signed_angle, weighted_choice, Transform, Vec2};
use crate::module::Module;
use crate::render::{Canvas, Drawable};
use crate::units::{Angle, Distance, Time, UnitExt};

/// Smallest ray-march step accepted, in cells.
const MIN_RAY_STEP: f64 = 0.05;

/// A shield component covering a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShieldRef {
    /// Module carrying the shield.
    pub module: ModuleId,
    /// Component index within the module.
    pub component: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Cell {
    module: Option<ModuleId>,
    shields: Vec<ShieldRef>,
}

/// A module or shield-covered cell crossed by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellHit {
    /// Grid column.
    pub x: usize,
    /// Grid row.
    pub y: usize,
    /// Distance from the ray origin, in cells.
    pub traveled: f64,
}

/// Steering behaviour relative to the enemy flagship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementAction {
    /// Head straight for it.
    Forward,
    /// Head straight away from it.
    Retreat,
    /// Keep it on the right.
    CircleLeft,
    /// Keep it on the left.
    CircleRight,
}

impl MovementAction {
    /// Re-roll table, equally weighted.
    const WEIGHTS: [(Self, f64); 4] = [
        (Self::Forward, 1.0),
        (Self::Retreat, 1.0),
        (Self::CircleLeft, 1.0),
        (Self::CircleRight, 1.0),
    ];

    /// Heading offset from the bearing to the enemy flagship.
    #[must_use]
    pub fn heading_offset(self) -> f64 {
        match self {
            Self::Forward => 0.0,
            Self::Retreat => PI,
            Self::CircleLeft => -FRAC_PI_2,
            Self::CircleRight => FRAC_PI_2,
        }
    }
}

/// Something the owning player has to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ShipEvent {
    /// A fleet-bonus module of this catalog name was destroyed.
    BonusLost {
        /// Catalog name.
        module: String,
    },
}

/// A ship in battle.
#[derive(Debug, Clone)]
pub struct Ship {
    id: ShipId,
    side: Side,
    flagship: bool,
    transform: Transform,
    velocity: Vec2,
    angular_velocity: f64,
    base_speed: f64,
    base_turn: f64,
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    occupied_cells: usize,
    modules: Vec<Module>,
    initial_modules: usize,
    live_modules: usize,
    live_weapons: usize,
    live_energy: usize,
    totals: ShipTotals,
    powered: bool,
    energy_phase: f64,
    action: MovementAction,
    action_timer: Time,
    warp_progress: f64,
    size: Distance,
    destroyed: bool,
    events: Vec<ShipEvent>,
}

impl Ship {
    /// Build ship `index` of `side` from its descriptor.
    ///
    /// # Errors
    ///
    /// Fails on an empty layout, an unknown module name or two modules
    /// sharing a cell.
    pub fn new(
        id: ShipId,
        side: Side,
        index: usize,
        descriptor: &ShipDescriptor,
        catalog: &Catalog,
        transform: Transform,
    ) -> Result<Self> {
        if descriptor.modules.is_empty() {
            return Err(SimError::EmptyShip {
                side: side.index(),
                index,
            });
        }

        // Battle-file (x, y) becomes engine (column y, row x).
        let placed = descriptor
            .modules
            .iter()
            .map(|p| Ok((catalog.get(&p.module)?, p.y as usize, p.x as usize)))
            .collect::<Result<Vec<_>>>()?;

        let padding = placed
            .iter()
            .flat_map(|(spec, _, _)| spec.components.iter())
            .filter_map(|c| c.shield_radius())
            .map(|r| r.as_cells().max(0.0) as usize)
            .max()
            .unwrap_or(0);
        let width = placed
            .iter()
            .map(|(spec, gx, _)| gx + spec.height)
            .max()
            .unwrap_or(0)
            + 2 * padding;
        let height = placed
            .iter()
            .map(|(spec, _, gy)| gy + spec.width)
            .max()
            .unwrap_or(0)
            + 2 * padding;

        let mut cells = vec![Cell::default(); width * height];
        let mut modules = Vec::with_capacity(placed.len());
        for (index, (spec, gx, gy)) in placed.iter().enumerate() {
            let id = ModuleId::from_index(index);
            let (ox, oy) = (gx + padding, gy + padding);
            let local = Transform::new(
                ox as f64 + spec.height as f64 / 2.0 - width as f64 / 2.0,
                oy as f64 + spec.width as f64 / 2.0 - height as f64 / 2.0,
                Angle::ZERO,
            );
            let module = Module::new(id, spec, ox, oy, local);
            for y in oy..oy + module.height() {
                for x in ox..ox + module.width() {
                    let cell = &mut cells[y * width + x];
                    if let Some(existing) = cell.module {
                        let existing: &Module = &modules[existing.index()];
                        return Err(SimError::OverlappingModules {
                            x,
                            y,
                            existing: existing.name().to_string(),
                            incoming: spec.name.clone(),
                        });
                    }
                    cell.module = Some(id);
                }
            }
            modules.push(module);
        }

        let occupied_cells = cells.iter().filter(|c| c.module.is_some()).count();
        let live_weapons = modules.iter().filter(|m| m.is_weapon()).count();
        let live_energy = modules.iter().filter(|m| m.is_energy_source()).count();
        let mut ship = Self {
            id,
            side,
            flagship: index == 0,
            transform,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            base_speed: descriptor.speed,
            base_turn: descriptor.turn_speed,
            width,
            height,
            cells,
            occupied_cells,
            initial_modules: modules.len(),
            live_modules: modules.len(),
            live_weapons,
            live_energy,
            modules,
            totals: ShipTotals::default(),
            powered: true,
            energy_phase: 0.0,
            action: MovementAction::Forward,
            action_timer: Time::ZERO,
            warp_progress: 0.0,
            size: (width.max(height) as f64 / std::f64::consts::SQRT_2).cells(),
            destroyed: false,
            events: Vec::new(),
        };
        ship.rebuild_shield_coverage();
        let transform = ship.transform;
        for module in &mut ship.modules {
            module.update(transform, &mut ShipTotals::default());
        }
        Ok(ship)
    }

    /// Handle.
    #[must_use]
    pub fn id(&self) -> ShipId {
        self.id
    }

    /// Owning side.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Whether this is its fleet's first ship.
    #[must_use]
    pub fn is_flagship(&self) -> bool {
        self.flagship
    }

    /// World position of the ship centre.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.transform.position()
    }

    /// World transform.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Linear velocity, cells per second.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Bounding radius.
    #[must_use]
    pub fn size(&self) -> Distance {
        self.size
    }

    /// Grid dimensions, shield padding included.
    #[must_use]
    pub fn grid_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Whether the ship is gone.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether the ship had power this tick.
    #[must_use]
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Current movement action.
    #[must_use]
    pub fn action(&self) -> MovementAction {
        self.action
    }

    /// Totals collected during the last tick.
    #[must_use]
    pub fn totals(&self) -> ShipTotals {
        self.totals
    }

    /// Progress towards the next warp jump.
    #[must_use]
    pub fn warp_progress(&self) -> f64 {
        self.warp_progress
    }

    /// Every module, destroyed ones included.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Module by handle.
    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index())
    }

    /// Modules alive.
    #[must_use]
    pub fn live_module_count(&self) -> usize {
        self.live_modules
    }

    /// Weapon modules alive.
    #[must_use]
    pub fn live_weapon_count(&self) -> usize {
        self.live_weapons
    }

    /// Energy-producing modules alive.
    #[must_use]
    pub fn live_energy_count(&self) -> usize {
        self.live_energy
    }

    /// What enemies see of this ship.
    #[must_use]
    pub fn snapshot(&self) -> ShipSnapshot {
        ShipSnapshot {
            id: self.id,
            position: self.position(),
            radius: self.size,
        }
    }

    /// Longest range among live weapons.
    #[must_use]
    pub fn engagement_range(&self) -> Distance {
        self.modules
            .iter()
            .filter(|m| !m.is_destroyed())
            .filter_map(Module::weapon_range)
            .fold(Distance::ZERO, Distance::max)
    }

    /// Take the events raised since the last call.
    pub fn drain_events(&mut self) -> Vec<ShipEvent> {
        std::mem::take(&mut self.events)
    }

    /// Move the ship without touching its velocity.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        for module in &mut self.modules {
            module.update(transform, &mut ShipTotals::default());
        }
    }

    fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if x < self.width && y < self.height {
            self.cells.get(y * self.width + x)
        } else {
            None
        }
    }

    /// Module occupying cell `(x, y)`, destroyed or not.
    #[must_use]
    pub fn module_at(&self, x: usize, y: usize) -> Option<ModuleId> {
        self.cell(x, y).and_then(|c| c.module)
    }

    /// First active shield covering cell `(x, y)`.
    #[must_use]
    pub fn active_shield_at(&self, x: usize, y: usize) -> Option<ShieldRef> {
        self.cell(x, y)?.shields.iter().copied().find(|shield| {
            self.modules
                .get(shield.module.index())
                .filter(|m| !m.is_destroyed())
                .and_then(|m| m.components().get(shield.component))
                .and_then(|c| c.as_shield())
                .is_some_and(|s| s.is_active())
        })
    }

    /// Shields covering cell `(x, y)`.
    #[must_use]
    pub fn shields_at(&self, x: usize, y: usize) -> &[ShieldRef] {
        self.cell(x, y).map_or(&[], |c| c.shields.as_slice())
    }

    /// Let `shield` soak `amount` of damage.
    pub fn absorb(&mut self, shield: ShieldRef, amount: f64) {
        if let Some(shield) = self
            .modules
            .get_mut(shield.module.index())
            .and_then(|m| m.shield_mut(shield.component))
        {
            shield.absorb(amount);
        }
    }

    /// Live module closest to `point`, by distance between centres.
    #[must_use]
    pub fn nearest_live_module(&self, point: Vec2) -> Option<ModuleId> {
        self.modules
            .iter()
            .filter(|m| !m.is_destroyed())
            .fold(None, |best: Option<(f64, ModuleId)>, m| {
                let dist = m.transform().position().distance_squared(point);
                match best {
                    Some((best_dist, _)) if best_dist <= dist => best,
                    _ => Some((dist, m.id())),
                }
            })
            .map(|(_, id)| id)
    }

    /// Map a world point into grid coordinates (cells, origin at the grid
    /// corner).
    fn to_grid(&self, point: Vec2) -> Vec2 {
        self.transform.to_local(point) + Vec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Cells crossed by a ray that hold a module or lie under a shield, in
    /// order, marched at `step` cells. Consecutive samples in the same cell
    /// are reported once.
    pub fn ray_intersect(
        &self,
        origin: Vec2,
        direction: Angle,
        length: Distance,
        step: f64,
    ) -> impl Iterator<Item = CellHit> + '_ {
        let step = step.max(MIN_RAY_STEP);
        let start = self.to_grid(origin);
        let heading = Vec2::from_angle(direction - self.transform.rotation);
        let samples = (length.as_cells().max(0.0) / step).floor() as usize;
        let mut last: Option<(usize, usize)> = None;
        (0..=samples).filter_map(move |i| {
            let traveled = step * i as f64;
            let p = start + heading * traveled;
            if p.x < 0.0 || p.y < 0.0 {
                return None;
            }
            let (x, y) = (p.x as usize, p.y as usize);
            let cell = self.cell(x, y)?;
            if cell.module.is_none() && cell.shields.is_empty() {
                return None;
            }
            if last == Some((x, y)) {
                return None;
            }
            last = Some((x, y));
            Some(CellHit { x, y, traveled })
        })
    }

    /// Live modules with a cell centre within `radius` of `center`, each
    /// listed once. The cell containing `center` always counts.
    fn modules_within(&self, center: Vec2, radius: Distance) -> Vec<ModuleId> {
        let grid = self.to_grid(center);
        let r = radius.as_cells().max(0.0);
        let span = |value: f64, size: usize| {
            let low = (value - r).floor().max(0.0) as usize;
            let high = ((value + r).ceil().max(0.0) as usize).min(size.saturating_sub(1));
            (low, high)
        };
        let (min_x, max_x) = span(grid.x, self.width);
        let (min_y, max_y) = span(grid.y, self.height);
        let hit_cell = (grid.x >= 0.0 && grid.y >= 0.0).then(|| (grid.x as usize, grid.y as usize));

        let mut seen = vec![false; self.modules.len()];
        let mut found = Vec::new();
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let Some(id) = self.module_at(x, y) else {
                    continue;
                };
                let cell_center = Vec2::new(x as f64 + 0.5, y as f64 + 0.5);
                let inside = cell_center.distance(grid) <= r || hit_cell == Some((x, y));
                if !inside || seen[id.index()] {
                    continue;
                }
                seen[id.index()] = true;
                if self.modules[id.index()].is_destroyed() {
                    continue;
                }
                found.push(id);
            }
        }
        found
    }

    /// Damage one module, destroying it when the hit is lethal. Returns the
    /// damage left for a penetrating projectile.
    pub fn damage_module(&mut self, id: ModuleId, amount: f64, kind: DamageType) -> f64 {
        let Some(module) = self.modules.get_mut(id.index()) else {
            return 0.0;
        };
        let hit = module.take_damage(amount, kind);
        if hit.lethal {
            self.destroy_module(id);
        }
        hit.residual
    }

    /// Damage every live module within `radius` of `center` exactly once.
    pub fn take_aoe_damage(&mut self, center: Vec2, radius: Distance, damage: f64, kind: DamageType) {
        for id in self.modules_within(center, radius) {
            if self.modules[id.index()].is_destroyed() {
                continue;
            }
            self.damage_module(id, damage, kind);
        }
    }

    /// Spend up to `budget` health repairing damaged modules around `source`.
    /// Returns the health restored.
    pub fn heal_around(&mut self, source: ModuleId, radius: Distance, budget: f64) -> f64 {
        let Some(center) = self.module(source).map(|m| m.transform().position()) else {
            return 0.0;
        };
        let mut remaining = budget;
        for id in self.modules_within(center, radius) {
            if remaining <= 0.0 {
                break;
            }
            remaining -= self.modules[id.index()].heal(remaining);
        }
        budget - remaining
    }

    /// Destroy a module and resolve everything its destruction sets off.
    fn destroy_module(&mut self, id: ModuleId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(module) = self.modules.get_mut(id.index()) else {
                continue;
            };
            if module.is_destroyed() {
                continue;
            }
            let weapon = module.is_weapon();
            let energy = module.is_energy_source();
            let center = module.transform().position();
            let effects = module.destroy();
            trace!(ship = %self.id, module = %id, name = module.name(), "Module destroyed");

            self.live_modules -= 1;
            if weapon {
                self.live_weapons -= 1;
            }
            if energy {
                self.live_energy -= 1;
            }

            for effect in effects {
                match effect {
                    DestroyEffect::Explode { damage, radius } => {
                        for target in self.modules_within(center, radius) {
                            let hit = self.modules[target.index()].take_damage(damage, DamageType::Explosive);
                            if hit.lethal {
                                pending.push(target);
                            }
                        }
                    }
                    DestroyEffect::BonusLost { module } => {
                        self.events.push(ShipEvent::BonusLost { module });
                    }
                }
            }
        }
    }

    /// Apply or revoke a buff on every module.
    pub fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        for module in &mut self.modules {
            module.apply_buff(buff, op);
        }
        if buff.stat == StatKind::Radius {
            self.rebuild_shield_coverage();
        }
    }

    fn rebuild_shield_coverage(&mut self) {
        for cell in &mut self.cells {
            cell.shields.clear();
        }
        for module in &self.modules {
            let (cx, cy) = module.cell_center();
            for (component, shield) in module.shields() {
                let r = shield.radius().as_cells().max(0.0);
                let min_x = (cx - r).floor().max(0.0) as usize;
                let min_y = (cy - r).floor().max(0.0) as usize;
                let max_x = ((cx + r).ceil().max(0.0) as usize).min(self.width.saturating_sub(1));
                let max_y = ((cy + r).ceil().max(0.0) as usize).min(self.height.saturating_sub(1));
                for y in min_y..=max_y {
                    for x in min_x..=max_x {
                        let dx = x as f64 + 0.5 - cx;
                        let dy = y as f64 + 0.5 - cy;
                        if dx * dx + dy * dy < r * r {
                            self.cells[y * self.width + x].shields.push(ShieldRef {
                                module: module.id(),
                                component,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Whether the ship should break apart now.
    ///
    /// `exempt` spares a ship that has lost all weapons; the battle grants it
    /// to a flagship while other ships of its fleet live.
    #[must_use]
    pub fn is_critical(&self, tuning: &Tuning, exempt: bool) -> bool {
        (self.live_modules as f64) < tuning.critical_damage_fraction * self.initial_modules as f64
            || self.live_energy == 0
            || (self.live_weapons == 0 && !exempt)
    }

    /// Destroy the whole ship.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        for module in &mut self.modules {
            for effect in module.destroy() {
                if let DestroyEffect::BonusLost { module } = effect {
                    self.events.push(ShipEvent::BonusLost { module });
                }
            }
        }
        self.live_modules = 0;
        self.live_weapons = 0;
        self.live_energy = 0;
        debug!(ship = %self.id, side = %self.side, "Ship destroyed");
    }

    /// Advance one tick.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>, tuning: &Tuning, exempt: bool) {
        if self.destroyed {
            return;
        }
        let dt = ctx.dt.as_seconds();

        self.velocity = self.velocity * tuning.movement_damping.powf(dt);
        self.angular_velocity *= tuning.rotation_damping.powf(dt);
        self.transform = Transform::at(
            self.position() + self.velocity * dt,
            self.transform.rotation + self.angular_velocity * dt,
        );

        if self.is_critical(tuning, exempt) {
            self.destroy();
            return;
        }

        let mut totals = ShipTotals::default();
        let transform = self.transform;
        for module in self.modules.iter_mut().filter(|m| !m.is_destroyed()) {
            module.update(transform, &mut totals);
        }

        let cycle = tuning.energy_cycle.as_seconds();
        if cycle > 0.0 {
            self.energy_phase = (self.energy_phase + dt / cycle).rem_euclid(1.0);
        }
        self.powered = self.energy_phase * totals.energy_use < totals.energy;
        if !self.powered {
            for module in self.modules.iter_mut().filter(|m| !m.is_destroyed()) {
                module.depower();
            }
            self.totals = totals;
            return;
        }

        let mut effects = Vec::new();
        for index in 0..self.modules.len() {
            let module = &mut self.modules[index];
            if module.is_destroyed() {
                continue;
            }
            let host = ModuleHost {
                ship: self.id,
                side: self.side,
                module: module.id(),
                transform: module.transform(),
                health: module.health_fraction(),
            };
            module.tick(&host, &mut totals, ctx, &mut effects);
        }
        for (source, effect) in effects {
            match effect {
                ComponentEffect::Repair { radius, budget } => {
                    self.heal_around(source, radius, budget);
                }
            }
        }
        self.totals = totals;

        self.steer(ctx, tuning, dt);
        self.warp(ctx, tuning, dt);
    }

    fn steer(&mut self, ctx: &mut TickContext<'_>, tuning: &Tuning, dt: f64) {
        let Some(target) = ctx.enemies.first().copied() else {
            return;
        };

        self.action_timer -= ctx.dt;
        if self.action_timer <= Time::ZERO {
            self.action_timer += tuning.movement_interval;
            if self.action_timer <= Time::ZERO {
                self.action_timer = tuning.movement_interval;
            }
            let roll = ctx.rng.gen::<f64>();
            let rolled = weighted_choice(&MovementAction::WEIGHTS, roll)
                .copied()
                .unwrap_or(MovementAction::Forward);
            let distance = self.position().distance(target.position);
            let range = self.engagement_range().as_cells();
            self.action = if (rolled == MovementAction::Retreat
                && distance > tuning.retreat_range_factor * range)
                || distance > tuning.advance_range_factor * range
            {
                MovementAction::Forward
            } else {
                rolled
            };
        }

        let totals = self.totals;
        let idle = if totals.thrust <= 0.0 && totals.turn_power <= 0.0 {
            tuning.idle_acceleration
        } else {
            1.0
        };
        let bearing = (target.position - self.position()).angle();
        let desired = bearing + self.action.heading_offset();
        let turn = (self.base_turn + totals.turn_power / totals.mass) * idle * dt;
        if signed_angle(self.transform.rotation, desired) >= 0.0 {
            self.angular_velocity += turn;
        } else {
            self.angular_velocity -= turn;
        }
        let accel = (self.base_speed + totals.thrust / totals.mass) * idle;
        self.velocity += self.transform.forward() * (accel * dt);
    }

    fn warp(&mut self, ctx: &mut TickContext<'_>, tuning: &Tuning, dt: f64) {
        let force = self.totals.warp_force;
        if force <= 0.0 || self.occupied_cells == 0 {
            return;
        }
        let Some(target) = ctx.enemies.first().copied() else {
            return;
        };
        self.warp_progress += dt * force / self.occupied_cells as f64;
        if self.warp_progress < 1.0 {
            return;
        }

        let angle = Angle::radians(ctx.rng.gen::<f64>() * TAU);
        let reach = target.radius.as_cells() + self.size.as_cells();
        let distance = reach * (1.0 + ctx.rng.gen::<f64>());
        let destination = target.position + Vec2::from_angle(angle) * distance;
        self.set_transform(Transform::at(destination, self.transform.rotation));
        self.velocity = Vec2::ZERO;
        self.warp_progress = -ctx.rng.gen::<f64>() * tuning.warp_jitter;
        debug!(ship = %self.id, side = %self.side, x = destination.x, y = destination.y, "Warp jump");
    }
}

impl Drawable for Ship {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn bounding_radius(&self) -> Distance {
        self.size
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        for module in &self.modules {
            module.draw(self.side, canvas);
        }
        if !self.destroyed && !self.powered {
            canvas.unpowered_marker(self.transform, self.size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ComponentDescriptor, ModuleDescriptor, ModulePlacement};
    use std::collections::BTreeMap;

    fn descriptor(
        name: &str,
        width: u32,
        height: u32,
        components: &[(&str, &[(&str, f64)])],
    ) -> ModuleDescriptor {
        ModuleDescriptor {
            name: name.to_string(),
            width,
            height,
            health: 100.0,
            armor: 0.0,
            reflect: 0.0,
            energy_use: 0.0,
            energy_gen: 0.0,
            mass: 10.0,
            penetration_blocking: 0.0,
            bonus: None,
            components: components
                .iter()
                .map(|(name, params)| ComponentDescriptor {
                    name: (*name).to_string(),
                    params: params
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), *v))
                        .collect::<BTreeMap<_, _>>(),
                })
                .collect(),
        }
    }

    fn catalog() -> Catalog {
        let mut reactor = descriptor("Reactor", 1, 1, &[("Reactor", &[])]);
        reactor.energy_gen = 50.0;
        let mut bomb = descriptor("Bomb", 1, 1, &[("DeathExplode", &[("damage", 500.0), ("radius", 1.5)])]);
        bomb.health = 10.0;
        Catalog::new([
            descriptor("Plate", 1, 1, &[("Armor", &[])]),
            descriptor("Big", 2, 2, &[("Armor", &[])]),
            descriptor("Gun", 1, 1, &[("BurstGun", &[("range", 30.0), ("firing_arc", 90.0)])]),
            descriptor(
                "Shield",
                1,
                2,
                &[("Shield", &[("strength", 20.0), ("radius", 2.0), ("regen_rate", 1.0), ("max_regen", 10.0)])],
            ),
            reactor,
            bomb,
        ])
        .unwrap()
    }

    fn build(modules: &[(&str, u32, u32)]) -> Result<Ship> {
        let descriptor = ShipDescriptor::new(
            modules
                .iter()
                .map(|(name, x, y)| ModulePlacement::new(*name, *x, *y))
                .collect(),
        );
        Ship::new(ShipId(0), Side::Zero, 0, &descriptor, &catalog(), Transform::default())
    }

    #[test]
    fn test_grid_swaps_axes() {
        let ship = build(&[("Plate", 0, 0), ("Plate", 0, 1), ("Plate", 0, 2)]).unwrap();
        // Three cells stacked in battle-file rows become one engine row.
        assert_eq!(ship.grid_size(), (3, 1));
        assert_eq!(ship.module_at(2, 0), Some(ModuleId(2)));
    }

    #[test]
    fn test_shield_padding() {
        let ship = build(&[("Shield", 0, 0)]).unwrap();
        // 2x1 module padded by 2 on every side.
        assert_eq!(ship.grid_size(), (6, 5));
        assert!(ship.module_at(2, 2).is_some());
        assert!(!ship.shields_at(1, 2).is_empty());
        assert!(ship.shields_at(0, 2).is_empty());
        assert!(ship.shields_at(0, 0).is_empty());
    }

    #[test]
    fn test_overlap_is_error() {
        let err = build(&[("Big", 0, 0), ("Plate", 1, 1)]).unwrap_err();
        assert!(matches!(err, SimError::OverlappingModules { x: 1, y: 1, .. }));
    }

    #[test]
    fn test_empty_ship_is_error() {
        assert_eq!(
            build(&[]).unwrap_err(),
            SimError::EmptyShip { side: 0, index: 0 }
        );
    }

    #[test]
    fn test_unknown_module_is_error() {
        assert_eq!(
            build(&[("Warpcore", 0, 0)]).unwrap_err(),
            SimError::UnknownModule("Warpcore".to_string())
        );
    }

    #[test]
    fn test_ray_reports_cells_in_order() {
        let ship = build(&[("Plate", 0, 0), ("Plate", 0, 1), ("Plate", 0, 2)]).unwrap();
        let hits: Vec<CellHit> = ship
            .ray_intersect(Vec2::new(-5.0, 0.0), Angle::ZERO, 10.cells(), 0.8)
            .collect();
        let cells: Vec<usize> = hits.iter().map(|h| h.x).collect();
        assert_eq!(cells, vec![0, 1, 2]);
        assert!(hits.windows(2).all(|w| w[0].traveled < w[1].traveled));
    }

    #[test]
    fn test_ray_reports_shielded_empty_cells() {
        let ship = build(&[("Shield", 0, 0)]).unwrap();
        let cells: Vec<usize> = ship
            .ray_intersect(Vec2::new(-5.0, 0.0), Angle::ZERO, 10.cells(), 0.8)
            .map(|h| h.x)
            .collect();
        assert_eq!(cells, vec![1, 2, 3, 4]);
        assert!(ship.module_at(1, 2).is_none());
        assert!(ship.module_at(4, 2).is_none());
    }

    #[test]
    fn test_ray_misses_beside_ship() {
        let ship = build(&[("Plate", 0, 0)]).unwrap();
        assert_eq!(
            ship.ray_intersect(Vec2::new(-5.0, 3.0), Angle::ZERO, 10.cells(), 0.8)
                .count(),
            0
        );
    }

    #[test]
    fn test_aoe_hits_each_module_once() {
        let mut ship = build(&[("Big", 0, 0), ("Plate", 0, 2)]).unwrap();
        ship.take_aoe_damage(Vec2::new(-0.5, 0.0), 5.cells(), 10.0, DamageType::Explosive);
        assert!((ship.modules()[0].health_fraction() - 0.9).abs() < 1e-12);
        assert!((ship.modules()[1].health_fraction() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_active_shield_absorbs() {
        let mut ship = build(&[("Shield", 0, 0), ("Reactor", 1, 0)]).unwrap();
        let (x, y) = ship.modules()[1].cell_origin();
        let shield = ship.active_shield_at(x, y).unwrap();
        ship.absorb(shield, 20.0);
        assert!(ship.active_shield_at(x, y).is_none());
    }

    #[test]
    fn test_death_explosion_chains() {
        let mut ship = build(&[("Bomb", 0, 0), ("Bomb", 0, 1), ("Reactor", 0, 3)]).unwrap();
        ship.damage_module(ModuleId(0), 100.0, DamageType::Ballistic);
        assert!(ship.modules()[0].is_destroyed());
        assert!(ship.modules()[1].is_destroyed());
        assert!(!ship.modules()[2].is_destroyed());
        assert_eq!(ship.live_module_count(), 1);
    }

    #[test]
    fn test_nearest_live_module() {
        let mut ship = build(&[("Plate", 0, 0), ("Plate", 0, 1), ("Plate", 0, 2)]).unwrap();
        ship.damage_module(ModuleId(0), 1_000.0, DamageType::Ballistic);
        let left = ship.modules()[0].transform().position();
        assert_eq!(ship.nearest_live_module(left), Some(ModuleId(1)));
    }

    #[test]
    fn test_critical_conditions() {
        let tuning = Tuning::default();
        let mut ship = build(&[("Gun", 0, 0), ("Reactor", 0, 1)]).unwrap();
        assert!(!ship.is_critical(&tuning, false));
        ship.damage_module(ModuleId(0), 1_000.0, DamageType::Ballistic);
        assert!(ship.is_critical(&tuning, false));
        assert!(!ship.is_critical(&tuning, true));
        ship.damage_module(ModuleId(1), 1_000.0, DamageType::Ballistic);
        assert!(ship.is_critical(&tuning, true));
    }

    #[test]
    fn test_heal_around_caps_budget() {
        let mut ship = build(&[("Plate", 0, 0), ("Plate", 0, 1)]).unwrap();
        ship.damage_module(ModuleId(0), 50.0, DamageType::Ballistic);
        ship.damage_module(ModuleId(1), 50.0, DamageType::Ballistic);
        let healed = ship.heal_around(ModuleId(0), 3.cells(), 60.0);
        assert!((healed - 60.0).abs() < 1e-9);
        let total: f64 = ship.modules().iter().map(Module::health_fraction).sum();
        assert!((total - 1.6).abs() < 1e-9);
    }
}
