//! # SA Core
//!
//! Deterministic fleet combat engine.
//!
//! This crate contains **only** simulation logic:
//! - No rendering (entities expose draw hooks through [`render::Canvas`])
//! - No IO
//! - No system randomness (each battle owns a seeded `ChaCha8Rng`)
//! - No threads (battles are independent and can run in parallel elsewhere)
//!
//! ## Crate Structure
//!
//! - [`units`], [`math`], [`spatial`] - Physical units, geometry, spatial index
//! - [`attribute`], [`buff`], [`combat`] - Buffable stats and damage rules
//! - [`data`], [`catalog`] - Descriptors and the validated module catalog
//! - [`module`], [`components`] - Ship modules and their behaviours
//! - [`ship`], [`projectile`], [`player`] - Battle entities
//! - [`game`] - The battle orchestrator

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod attribute;
pub mod buff;
pub mod catalog;
pub mod combat;
pub mod components;
pub mod config;
pub mod data;
pub mod entity;
pub mod error;
pub mod game;
pub mod math;
pub mod module;
pub mod player;
pub mod projectile;
pub mod render;
pub mod ship;
pub mod spatial;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::attribute::Attribute;
    pub use crate::buff::{BuffOp, ModuleBuff, ModuleTag, StatKind};
    pub use crate::catalog::{Catalog, ComponentSpec, ModuleSpec};
    pub use crate::combat::DamageType;
    pub use crate::config::{BattleConfig, Tuning};
    pub use crate::data::{
        BattleDescriptor, ComponentDescriptor, ModuleDescriptor, ModulePlacement, PlayerDescriptor,
        ShipDescriptor,
    };
    pub use crate::entity::{ModuleId, ProjectileId, ShipId, Side};
    pub use crate::error::{Result, SimError};
    pub use crate::game::{BattleStats, Game, GameResult};
    pub use crate::math::{Transform, Vec2};
    pub use crate::render::{Canvas, Drawable, ModuleState, ProjectileStyle};
    pub use crate::ship::Ship;
    pub use crate::units::{Angle, Distance, Speed, Time, UnitExt};
}
