//! Ship modules.
//!
//! A module is a rectangle of cells on its ship's grid with its own health
//! and base stats, and an ordered list of [`Component`]s. Health is kept as
//! a fraction of the (buffable) maximum, so health buffs never heal or hurt.

use crate::attribute::Attribute;
use crate::buff::{BuffOp, ModuleBuff, ModuleTag, StatKind};
use crate::catalog::ModuleSpec;
use crate::combat::{mitigate, penetration_residual, DamageType, Defenses};
use crate::components::{
    Component, ComponentEffect, DestroyEffect, ModuleBonus, ModuleHost, Shield, ShipTotals,
    TickContext,
};
use crate::entity::{ModuleId, Side};
use crate::math::Transform;
use crate::render::{Canvas, ModuleState};
use crate::units::Distance;

/// Outcome of one hit on a module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Health removed, before dividing by max health.
    pub dealt: f64,
    /// Damage left for whatever lies behind the module.
    pub residual: f64,
    /// Whether the hit brought the module to zero health.
    pub lethal: bool,
}

/// A placed module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    id: ModuleId,
    name: String,
    width: usize,
    height: usize,
    cell_x: usize,
    cell_y: usize,
    local: Transform,
    world: Transform,
    health: f64,
    max_health: Attribute<f64>,
    armor: Attribute<f64>,
    reflect: Attribute<f64>,
    energy_use: Attribute<f64>,
    energy_gen: Attribute<f64>,
    mass: Attribute<f64>,
    penetration_blocking: f64,
    depowered: bool,
    destroyed: bool,
    components: Vec<Component>,
}

impl Module {
    /// Instantiate `spec` with its top-left cell at `(cell_x, cell_y)` and
    /// its centre at `local` relative to the ship centre.
    ///
    /// `spec` dimensions are in battle-file orientation; the module stores
    /// them swapped so that width runs along the ship's forward axis.
    #[must_use]
    pub fn new(id: ModuleId, spec: &ModuleSpec, cell_x: usize, cell_y: usize, local: Transform) -> Self {
        Self {
            id,
            name: spec.name.clone(),
            width: spec.height,
            height: spec.width,
            cell_x,
            cell_y,
            local,
            world: local,
            health: 1.0,
            max_health: Attribute::new(spec.health),
            armor: Attribute::new(spec.armor),
            reflect: Attribute::new(spec.reflect),
            energy_use: Attribute::new(spec.energy_use),
            energy_gen: Attribute::new(spec.energy_gen),
            mass: Attribute::new(spec.mass),
            penetration_blocking: spec.penetration_blocking,
            depowered: false,
            destroyed: false,
            components: spec.components.iter().map(Component::from_spec).collect(),
        }
    }

    /// Handle inside the owning ship.
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Catalog name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extent along the ship's forward axis, in cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Extent across the ship, in cells.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Top-left cell on the ship grid.
    #[must_use]
    pub fn cell_origin(&self) -> (usize, usize) {
        (self.cell_x, self.cell_y)
    }

    /// Centre on the ship grid, in cell coordinates.
    #[must_use]
    pub fn cell_center(&self) -> (f64, f64) {
        (
            self.cell_x as f64 + self.width as f64 / 2.0,
            self.cell_y as f64 + self.height as f64 / 2.0,
        )
    }

    /// World transform as of the last ship update.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.world
    }

    /// Transform relative to the ship centre.
    #[must_use]
    pub fn local_transform(&self) -> Transform {
        self.local
    }

    /// Health as a fraction of max health, never below zero.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        self.health
    }

    /// Current max health.
    #[must_use]
    pub fn max_health(&self) -> f64 {
        self.max_health.value()
    }

    /// Current armor.
    #[must_use]
    pub fn armor(&self) -> f64 {
        self.armor.value()
    }

    /// Current laser reflection.
    #[must_use]
    pub fn reflect(&self) -> f64 {
        self.reflect.value()
    }

    /// Current mass.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass.value()
    }

    /// Current energy consumption.
    #[must_use]
    pub fn energy_use(&self) -> f64 {
        self.energy_use.value()
    }

    /// Current energy production.
    #[must_use]
    pub fn energy_gen(&self) -> f64 {
        self.energy_gen.value()
    }

    /// Whether the module is wreckage.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether the module sat out this tick for lack of power.
    #[must_use]
    pub fn is_depowered(&self) -> bool {
        self.depowered
    }

    /// Components in order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Tags of every component.
    pub fn tags(&self) -> impl Iterator<Item = ModuleTag> + '_ {
        self.components.iter().flat_map(|c| c.tags().iter().copied())
    }

    /// Whether any component is a weapon.
    #[must_use]
    pub fn is_weapon(&self) -> bool {
        self.components.iter().any(Component::is_weapon)
    }

    /// Whether any component produces energy.
    #[must_use]
    pub fn is_energy_source(&self) -> bool {
        self.components.iter().any(Component::is_energy_source)
    }

    /// Longest weapon range on this module.
    #[must_use]
    pub fn weapon_range(&self) -> Option<Distance> {
        self.components
            .iter()
            .filter_map(Component::weapon_range)
            .reduce(Distance::max)
    }

    /// Shield components with their index.
    pub fn shields(&self) -> impl Iterator<Item = (usize, &Shield)> + '_ {
        self.components
            .iter()
            .enumerate()
            .filter_map(|(index, c)| c.as_shield().map(|shield| (index, shield)))
    }

    pub(crate) fn shield_mut(&mut self, component: usize) -> Option<&mut Shield> {
        self.components.get_mut(component).and_then(Component::as_shield_mut)
    }

    /// Fleet bonuses carried by this module.
    pub fn bonuses(&self) -> impl Iterator<Item = &ModuleBonus> + '_ {
        self.components.iter().filter_map(Component::bonus)
    }

    fn defenses(&self) -> Defenses {
        Defenses {
            armor: self.armor.value(),
            reflect: self.reflect.value(),
            penetration_blocking: self.penetration_blocking,
        }
    }

    /// Apply a hit. The caller destroys the module when the hit is lethal.
    pub fn take_damage(&mut self, amount: f64, kind: DamageType) -> Hit {
        debug_assert!(!self.destroyed, "module '{}' damaged after destruction", self.name);
        if self.destroyed {
            return Hit {
                dealt: 0.0,
                residual: 0.0,
                lethal: false,
            };
        }
        let defenses = self.defenses();
        let dealt = mitigate(amount, kind, defenses);
        let max = self.max_health.value();
        if max > 0.0 {
            self.health = (self.health - dealt / max).max(0.0);
        } else {
            self.health = 0.0;
        }
        Hit {
            dealt,
            residual: penetration_residual(amount, defenses),
            lethal: self.health <= 0.0,
        }
    }

    /// Restore up to `amount` health; returns the health actually restored.
    pub fn heal(&mut self, amount: f64) -> f64 {
        let max = self.max_health.value();
        if self.destroyed || amount <= 0.0 || max <= 0.0 {
            return 0.0;
        }
        let applied = amount.min((1.0 - self.health) * max);
        self.health = (self.health + applied / max).min(1.0);
        applied
    }

    /// Mark destroyed and collect component reactions. Runs only once.
    pub(crate) fn destroy(&mut self) -> Vec<DestroyEffect> {
        if self.destroyed {
            return Vec::new();
        }
        self.destroyed = true;
        self.health = 0.0;
        self.components
            .iter_mut()
            .filter_map(Component::on_destroyed)
            .collect()
    }

    /// Route a buff to base stats or to the first matching component.
    pub fn apply_buff(&mut self, buff: &ModuleBuff, op: BuffOp) {
        if buff.target == ModuleTag::Any {
            self.apply_base(buff, op);
            return;
        }
        let Some(component) = self
            .components
            .iter_mut()
            .find(|c| c.tags().contains(&buff.target))
        else {
            return;
        };
        if buff.stat.is_base_stat() {
            self.apply_base(buff, op);
        } else {
            component.apply_buff(buff, op);
        }
    }

    fn apply_base(&mut self, buff: &ModuleBuff, op: BuffOp) {
        let attribute = match buff.stat {
            StatKind::Health => &mut self.max_health,
            StatKind::Armor => &mut self.armor,
            StatKind::Reflect => &mut self.reflect,
            StatKind::EnergyUse => &mut self.energy_use,
            StatKind::EnergyGen => &mut self.energy_gen,
            StatKind::Mass => &mut self.mass,
            _ => return,
        };
        op.on(attribute, buff.multiplier);
    }

    /// Refresh the world transform and add this module's base stats to the
    /// ship totals.
    pub(crate) fn update(&mut self, ship: Transform, totals: &mut ShipTotals) {
        self.world = ship.compose(self.local);
        self.depowered = false;
        totals.mass += self.mass.value();
        totals.energy += self.energy_gen.value();
        totals.energy_use += self.energy_use.value();
    }

    pub(crate) fn depower(&mut self) {
        self.depowered = true;
    }

    pub(crate) fn tick(
        &mut self,
        host: &ModuleHost,
        totals: &mut ShipTotals,
        ctx: &mut TickContext<'_>,
        effects: &mut Vec<(ModuleId, ComponentEffect)>,
    ) {
        for component in &mut self.components {
            if let Some(effect) = component.tick(host, totals, ctx) {
                effects.push((self.id, effect));
            }
        }
    }

    pub(crate) fn draw(&self, side: Side, canvas: &mut dyn Canvas) {
        let state = if self.destroyed {
            ModuleState::Destroyed
        } else if self.depowered {
            ModuleState::Depowered
        } else {
            ModuleState::Intact {
                health: self.health,
            }
        };
        canvas.module_cell(
            self.world,
            self.width as f64,
            self.height as f64,
            side,
            state,
        );
        if !self.destroyed {
            for component in &self.components {
                component.draw(self.world, canvas);
            }
        }
    }
}
