//! Error types for battle construction.
//!
//! Everything here is a configuration failure detected before the first
//! tick. A running battle never produces an error: missing targets and
//! failed interceptions are ordinary outcomes.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for catalog, ship and battle construction.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// A ship references a module name that is not in the catalog.
    #[error("No such module: {0}")]
    UnknownModule(String),

    /// A module definition references a component kind with no constructor.
    #[error("No such module component '{component}' (in module '{module}')")]
    UnknownComponent {
        /// Module whose definition contains the component.
        module: String,
        /// Offending component name.
        component: String,
    },

    /// Two catalog entries share a name.
    #[error("Module '{0}' is defined more than once")]
    DuplicateModule(String),

    /// A module definition has stats that cannot describe a real module.
    #[error("Invalid module '{module}': {reason}")]
    InvalidModule {
        /// Module name.
        module: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two modules of one ship claim the same grid cell.
    #[error("Invalid ship: cell [{x}, {y}] is covered by both '{existing}' and '{incoming}'")]
    OverlappingModules {
        /// Cell column (engine orientation, shield padding included).
        x: usize,
        /// Cell row (engine orientation, shield padding included).
        y: usize,
        /// Module that was placed first.
        existing: String,
        /// Module that collided with it.
        incoming: String,
    },

    /// A ship descriptor without any modules.
    #[error("Invalid ship: ship {index} of side {side} has no modules")]
    EmptyShip {
        /// Side the ship belongs to.
        side: usize,
        /// Index of the ship within its fleet.
        index: usize,
    },

    /// A side without any ships.
    #[error("Side {0} has no ships")]
    EmptyFleet(usize),

    /// Battle parameters that cannot drive a simulation.
    #[error("Invalid battle configuration: {0}")]
    InvalidConfig(String),
}
