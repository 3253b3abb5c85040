//! Module catalog and component registry.
//!
//! Catalog files describe components as `(name, params)` pairs. The registry
//! in [`ComponentSpec::from_named`] maps each known name to a typed
//! constructor; everything is checked once when the [`Catalog`] is built, so
//! ship construction never sees a malformed component.
//!
//! Parameter conventions: distances in cells, times in seconds, speeds in
//! cells per second, angles (`firing_arc`, `spread`, `guidance`) in degrees.
//! A missing parameter defaults to zero and logs a warning.

use std::collections::BTreeMap;

use tracing::warn;

use crate::buff::ModuleBuff;
use crate::data::{ComponentDescriptor, ModuleDescriptor};
use crate::error::{Result, SimError};
use crate::units::{Distance, Speed, Time, UnitExt};

/// Ammunition handling shared by every burst-firing launcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderSpec {
    /// Rounds loaded per second.
    pub fire_rate: f64,
    /// Magazine size.
    pub max_ammo: f64,
    /// Rounds needed before a burst starts.
    pub burst_threshold: f64,
    /// Delay between shots of a burst.
    pub burst_interval: Time,
}

/// Parameters shared by every gun.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GunSpec {
    /// Targeting range.
    pub range: Distance,
    /// Full width of the targeting cone, radians.
    pub firing_arc: f64,
    /// Random aim deviation, radians.
    pub spread: f64,
    /// Damage per shot, or per second for lasers.
    pub damage: f64,
    /// Projectile family.
    pub kind: GunSpecKind,
}

/// What a gun fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GunSpecKind {
    /// Straight bullets.
    Burst {
        /// Magazine.
        loader: LoaderSpec,
        /// Bullet speed.
        speed: Speed,
    },
    /// Bullets that keep going through modules.
    Penetrating {
        /// Magazine.
        loader: LoaderSpec,
        /// Bullet speed.
        speed: Speed,
        /// Damage multiplier kept after each module.
        penetration: f64,
    },
    /// Guided area-damage munitions.
    Missile {
        /// Magazine.
        loader: LoaderSpec,
        /// Flight speed.
        speed: Speed,
        /// Blast radius.
        radius: Distance,
        /// Turn rate, radians per second.
        guidance: f64,
        /// Flight time.
        lifetime: Time,
    },
    /// Unguided area-damage munitions.
    Torpedo {
        /// Magazine.
        loader: LoaderSpec,
        /// Flight speed.
        speed: Speed,
        /// Blast radius.
        radius: Distance,
    },
    /// Slowing area-damage munitions.
    Mine {
        /// Magazine.
        loader: LoaderSpec,
        /// Launch speed.
        speed: Speed,
        /// Blast radius.
        radius: Distance,
        /// Speed multiplier applied every tick.
        damping: f64,
    },
    /// Continuous beam.
    Laser {
        /// Firing cycles per second of cooldown.
        fire_rate: f64,
        /// Length of a firing phase.
        duration: Time,
    },
}

/// A validated, typed component definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentSpec {
    /// Passive plating.
    Armor,
    /// Energy source.
    Reactor,
    /// Constant propulsion.
    Engine {
        /// Linear thrust.
        thrust: f64,
        /// Turning thrust.
        turning: f64,
        /// Warp force.
        warp: f64,
    },
    /// Propulsion in alternating boost phases.
    Afterburner {
        /// Linear thrust while boosting.
        thrust: f64,
        /// Turning thrust while boosting.
        turning: f64,
        /// Boost length.
        duration: Time,
        /// Pause between boosts.
        cooldown: Time,
    },
    /// Heals nearby modules of its own ship.
    RepairBay {
        /// Health restored per second, shared by all targets.
        rate: f64,
        /// Reach from the bay's centre.
        radius: Distance,
    },
    /// Shield bubble.
    Shield {
        /// Damage absorbed from full.
        strength: f64,
        /// Bubble radius.
        radius: Distance,
        /// Strength restored per second.
        regen_rate: f64,
        /// Strength the regeneration pool holds.
        max_regen: f64,
    },
    /// Weapon.
    Gun(GunSpec),
    /// Spits out free-floating junk that soaks enemy fire.
    JunkLauncher {
        /// Magazine.
        loader: LoaderSpec,
        /// Targeting range.
        range: Distance,
        /// Launch speed.
        speed: Speed,
        /// Health of each piece.
        junk_health: f64,
    },
    /// Anti-munition turret.
    PointDefense {
        /// Shots per second, at most one per tick.
        fire_rate: f64,
        /// Success chance against missiles.
        missile_chance: f64,
        /// Success chance against torpedoes.
        torpedo_chance: f64,
        /// Success chance against mines.
        mine_chance: f64,
        /// Reach.
        range: Distance,
    },
    /// Fleet-wide buff while the module lives.
    ModuleBonus {
        /// Catalog name the bonus is counted under.
        module: String,
        /// The buff.
        buff: ModuleBuff,
    },
    /// Blast that damages its own ship on destruction.
    DeathExplode {
        /// Damage to each module in range.
        damage: f64,
        /// Blast radius.
        radius: Distance,
    },
    /// Periodically logs the module's state.
    Debug {
        /// Time between log lines.
        interval: Time,
    },
}

/// Names accepted by [`ComponentSpec::from_named`].
pub const COMPONENT_NAMES: &[&str] = &[
    "Armor",
    "Reactor",
    "Engine",
    "Afterburner",
    "RepairBay",
    "Shield",
    "BurstGun",
    "PenetratingGun",
    "MissileGun",
    "TorpedoGun",
    "MineGun",
    "LaserGun",
    "JunkLauncher",
    "PointDefense",
    "DeathExplode",
    "Debug",
];

struct Params<'a> {
    module: &'a str,
    component: &'a str,
    values: &'a BTreeMap<String, f64>,
    read: Vec<&'static str>,
}

impl<'a> Params<'a> {
    fn new(module: &'a str, component: &'a str, values: &'a BTreeMap<String, f64>) -> Self {
        Self {
            module,
            component,
            values,
            read: Vec::new(),
        }
    }

    fn get(&mut self, key: &'static str) -> f64 {
        self.read.push(key);
        if let Some(value) = self.values.get(key) {
            *value
        } else {
            warn!(
                module = self.module,
                component = self.component,
                param = key,
                "Missing component parameter, defaulting to 0"
            );
            0.0
        }
    }

    fn get_or(&mut self, key: &'static str, default: f64) -> f64 {
        self.read.push(key);
        self.values.get(key).copied().unwrap_or(default)
    }

    fn loader(&mut self) -> LoaderSpec {
        LoaderSpec {
            fire_rate: self.get("fire_rate"),
            max_ammo: self.get("max_ammo"),
            burst_threshold: self.get("burst_threshold"),
            burst_interval: self.get("burst_interval").seconds(),
        }
    }

    fn finish(self) {
        for key in self.values.keys() {
            if !self.read.iter().any(|read| *read == key.as_str()) {
                warn!(
                    module = self.module,
                    component = self.component,
                    param = key.as_str(),
                    "Unknown component parameter ignored"
                );
            }
        }
    }
}

impl ComponentSpec {
    /// Build a component from its catalog name and named parameters.
    pub fn from_named(
        module: &str,
        component: &str,
        params: &BTreeMap<String, f64>,
    ) -> Result<Self> {
        if let Some((key, value)) = params.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SimError::InvalidModule {
                module: module.to_string(),
                reason: format!("parameter '{key}' of '{component}' is not a number: {value}"),
            });
        }

        let mut p = Params::new(module, component, params);
        let spec = match component {
            "Armor" => Self::Armor,
            "Reactor" => Self::Reactor,
            "Engine" => Self::Engine {
                thrust: p.get("thrust"),
                turning: p.get("turning"),
                warp: p.get("warp"),
            },
            "Afterburner" => Self::Afterburner {
                thrust: p.get("thrust"),
                turning: p.get("turning"),
                duration: p.get("duration").seconds(),
                cooldown: p.get("cooldown").seconds(),
            },
            "RepairBay" => Self::RepairBay {
                rate: p.get("rate"),
                radius: p.get("radius").cells(),
            },
            "Shield" => Self::Shield {
                strength: p.get("strength"),
                radius: p.get("radius").cells(),
                regen_rate: p.get("regen_rate"),
                max_regen: p.get("max_regen"),
            },
            "BurstGun" | "PenetratingGun" | "MissileGun" | "TorpedoGun" | "MineGun" => {
                let loader = p.loader();
                let speed = p.get("speed").cells_per_second();
                let range = p.get("range").cells();
                let kind = match component {
                    "BurstGun" => GunSpecKind::Burst { loader, speed },
                    "PenetratingGun" => GunSpecKind::Penetrating {
                        loader,
                        speed,
                        penetration: p.get("penetration"),
                    },
                    "MissileGun" => {
                        let default_lifetime = flight_time(range, speed).as_seconds();
                        GunSpecKind::Missile {
                            loader,
                            speed,
                            radius: p.get("radius").cells(),
                            guidance: p.get("guidance").to_radians(),
                            lifetime: p.get_or("lifetime", default_lifetime).seconds(),
                        }
                    }
                    "TorpedoGun" => GunSpecKind::Torpedo {
                        loader,
                        speed,
                        radius: p.get("radius").cells(),
                    },
                    _ => GunSpecKind::Mine {
                        loader,
                        speed,
                        radius: p.get("radius").cells(),
                        damping: p.get("damping"),
                    },
                };
                Self::Gun(GunSpec {
                    range,
                    firing_arc: p.get("firing_arc").to_radians(),
                    spread: p.get("spread").to_radians(),
                    damage: p.get("damage"),
                    kind,
                })
            }
            "LaserGun" => Self::Gun(GunSpec {
                range: p.get("range").cells(),
                firing_arc: p.get("firing_arc").to_radians(),
                spread: 0.0,
                damage: p.get("damage"),
                kind: GunSpecKind::Laser {
                    fire_rate: p.get("fire_rate"),
                    duration: p.get("duration").seconds(),
                },
            }),
            "JunkLauncher" => Self::JunkLauncher {
                loader: p.loader(),
                range: p.get("range").cells(),
                speed: p.get("speed").cells_per_second(),
                junk_health: p.get("junk_health"),
            },
            "PointDefense" => Self::PointDefense {
                fire_rate: p.get("fire_rate"),
                missile_chance: p.get("missile_chance"),
                torpedo_chance: p.get("torpedo_chance"),
                mine_chance: p.get("mine_chance"),
                range: p.get("range").cells(),
            },
            "DeathExplode" => Self::DeathExplode {
                damage: p.get("damage"),
                radius: p.get("radius").cells(),
            },
            "Debug" => Self::Debug {
                interval: p.get_or("interval", 1.0).seconds(),
            },
            _ => {
                return Err(SimError::UnknownComponent {
                    module: module.to_string(),
                    component: component.to_string(),
                })
            }
        };
        p.finish();
        Ok(spec)
    }

    /// Shield radius, if this is a shield.
    #[must_use]
    pub fn shield_radius(&self) -> Option<Distance> {
        match self {
            Self::Shield { radius, .. } => Some(*radius),
            _ => None,
        }
    }

    /// Targeting range of weapons; used to pick engagement distances.
    #[must_use]
    pub fn weapon_range(&self) -> Option<Distance> {
        match self {
            Self::Gun(gun) => Some(gun.range),
            _ => None,
        }
    }
}

/// Time a projectile needs to cover `range`; zero when it cannot move.
#[must_use]
pub fn flight_time(range: Distance, speed: Speed) -> Time {
    if speed.as_cells_per_second() > 0.0 {
        range / speed
    } else {
        Time::ZERO
    }
}

/// A validated catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSpec {
    /// Catalog name.
    pub name: String,
    /// Width in cells, battle-file orientation.
    pub width: usize,
    /// Height in cells, battle-file orientation.
    pub height: usize,
    /// Maximum health.
    pub health: f64,
    /// Flat damage reduction.
    pub armor: f64,
    /// Laser reflection.
    pub reflect: f64,
    /// Energy consumed.
    pub energy_use: f64,
    /// Energy produced.
    pub energy_gen: f64,
    /// Mass.
    pub mass: f64,
    /// Fraction of penetrating damage stopped.
    pub penetration_blocking: f64,
    /// Components in order, including the fleet bonus if any.
    pub components: Vec<ComponentSpec>,
}

impl ModuleSpec {
    fn from_descriptor(descriptor: ModuleDescriptor) -> Result<Self> {
        let invalid = |reason: String| SimError::InvalidModule {
            module: descriptor.name.clone(),
            reason,
        };
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(invalid(format!(
                "dimensions must be positive, got {}x{}",
                descriptor.width, descriptor.height
            )));
        }
        if !(descriptor.health.is_finite() && descriptor.health > 0.0) {
            return Err(invalid(format!(
                "health must be positive, got {}",
                descriptor.health
            )));
        }
        let stats = [
            ("armor", descriptor.armor),
            ("reflect", descriptor.reflect),
            ("energy_use", descriptor.energy_use),
            ("energy_gen", descriptor.energy_gen),
            ("mass", descriptor.mass),
            ("penetration_blocking", descriptor.penetration_blocking),
        ];
        if let Some((stat, value)) = stats.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(format!("{stat} is not a number: {value}")));
        }

        let mut components = descriptor
            .components
            .iter()
            .map(|ComponentDescriptor { name, params }| {
                ComponentSpec::from_named(&descriptor.name, name, params)
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(buff) = descriptor.bonus {
            components.push(ComponentSpec::ModuleBonus {
                module: descriptor.name.clone(),
                buff,
            });
        }

        Ok(Self {
            width: descriptor.width as usize,
            height: descriptor.height as usize,
            health: descriptor.health,
            armor: descriptor.armor,
            reflect: descriptor.reflect,
            energy_use: descriptor.energy_use,
            energy_gen: descriptor.energy_gen,
            mass: descriptor.mass,
            penetration_blocking: descriptor.penetration_blocking,
            components,
            name: descriptor.name,
        })
    }
}

/// Every module a battle may reference, by name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    modules: BTreeMap<String, ModuleSpec>,
}

impl Catalog {
    /// Validate descriptors and build the catalog.
    pub fn new(descriptors: impl IntoIterator<Item = ModuleDescriptor>) -> Result<Self> {
        let mut modules = BTreeMap::new();
        for descriptor in descriptors {
            let spec = ModuleSpec::from_descriptor(descriptor)?;
            if modules.contains_key(&spec.name) {
                return Err(SimError::DuplicateModule(spec.name));
            }
            modules.insert(spec.name.clone(), spec);
        }
        Ok(Self { modules })
    }

    /// Look up a module by name.
    pub fn get(&self, name: &str) -> Result<&ModuleSpec> {
        self.modules
            .get(name)
            .ok_or_else(|| SimError::UnknownModule(name.to_string()))
    }

    /// Whether `name` is in the catalog.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}
