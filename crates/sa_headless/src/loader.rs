//! Descriptor loading for headless runs.
//!
//! Catalog files are a RON list of module descriptors; battle files hold the
//! global buffs and both fleets; config files hold a [`BattleConfig`]. A
//! [`Scenario`] pairs a validated catalog with a battle.

use std::fs;
use std::path::{Path, PathBuf};

use sa_core::catalog::Catalog;
use sa_core::config::BattleConfig;
use sa_core::data::{BattleDescriptor, ModuleDescriptor};
use sa_core::error::SimError;
use sa_core::game::{BattleStats, Game};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while loading descriptor files.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("Failed to read '{path}': {message}")]
    Io {
        /// File path.
        path: String,
        /// Underlying IO error.
        message: String,
    },

    /// The file is not valid RON for the expected descriptor.
    #[error("Failed to parse '{path}': {message}")]
    Parse {
        /// File path.
        path: String,
        /// Parser message, with position.
        message: String,
    },

    /// The descriptors parsed but do not describe a valid battle.
    #[error(transparent)]
    Invalid(#[from] SimError),
}

/// Result type alias using [`LoadError`].
pub type Result<T> = std::result::Result<T, LoadError>;

/// Directory holding the bundled catalog and sample battle.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Path of the bundled module catalog.
#[must_use]
pub fn default_catalog_path() -> PathBuf {
    default_data_dir().join("modules.ron")
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn parse<T: DeserializeOwned>(text: &str, origin: &str) -> Result<T> {
    ron::from_str(text).map_err(|e| LoadError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })
}

/// Parse and validate a catalog from RON text. `origin` names the source in
/// error messages.
pub fn parse_catalog(text: &str, origin: &str) -> Result<Catalog> {
    let modules: Vec<ModuleDescriptor> = parse(text, origin)?;
    Ok(Catalog::new(modules)?)
}

/// Parse a battle from RON text.
pub fn parse_battle(text: &str, origin: &str) -> Result<BattleDescriptor> {
    parse(text, origin)
}

/// Load and validate a module catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let catalog = parse_catalog(&read(path)?, &path.display().to_string())?;
    info!(path = %path.display(), modules = catalog.len(), "Loaded module catalog");
    Ok(catalog)
}

/// Load a battle descriptor.
pub fn load_battle(path: &Path) -> Result<BattleDescriptor> {
    let battle = parse_battle(&read(path)?, &path.display().to_string())?;
    debug!(
        path = %path.display(),
        side0 = battle.players[0].ships.len(),
        side1 = battle.players[1].ships.len(),
        "Loaded battle"
    );
    Ok(battle)
}

/// Load and validate a battle configuration.
pub fn load_config(path: &Path) -> Result<BattleConfig> {
    let config: BattleConfig = parse(&read(path)?, &path.display().to_string())?;
    config.validate()?;
    Ok(config)
}

/// A catalog and a battle that only references modules from it.
#[derive(Debug, Clone)]
pub struct Scenario {
    catalog: Catalog,
    battle: BattleDescriptor,
}

impl Scenario {
    /// Pair a catalog with a battle.
    #[must_use]
    pub fn new(catalog: Catalog, battle: BattleDescriptor) -> Self {
        Self { catalog, battle }
    }

    /// Load both files.
    pub fn load(catalog: &Path, battle: &Path) -> Result<Self> {
        Ok(Self::new(load_catalog(catalog)?, load_battle(battle)?))
    }

    /// Module catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Battle descriptor.
    #[must_use]
    pub fn battle(&self) -> &BattleDescriptor {
        &self.battle
    }

    /// Build a fresh game.
    ///
    /// # Errors
    ///
    /// Fails when the configuration or a fleet is invalid; the outcome does
    /// not depend on `seed`.
    pub fn game(&self, config: &BattleConfig, seed: u64) -> sa_core::error::Result<Game> {
        Game::new(&self.battle, &self.catalog, config.clone(), seed)
    }

    /// Build both fleets once and report their starting state.
    ///
    /// # Errors
    ///
    /// Same as [`Scenario::game`].
    pub fn validate(&self, config: &BattleConfig) -> sa_core::error::Result<BattleStats> {
        self.game(config, 0).map(|game| game.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOG: &str = r#"[
        (
            name: "Plate",
            width: 1,
            height: 1,
            health: 100.0,
            armor: 2.0,
            components: [(name: "Armor")],
        ),
        (
            name: "Reactor",
            width: 1,
            height: 1,
            health: 10.0,
            energy_gen: 50.0,
            components: [(name: "Reactor")],
        ),
        (
            name: "Gun",
            width: 1,
            height: 1,
            health: 15.0,
            components: [(name: "BurstGun", params: {
                "fire_rate": 2.0, "max_ammo": 1.0, "burst_threshold": 1.0,
                "burst_interval": 0.0, "range": 30.0, "speed": 100.0,
                "firing_arc": 90.0, "spread": 2.0, "damage": 5.0,
            })],
        ),
    ]"#;

    const BATTLE: &str = r#"(
        players: (
            (ships: [(modules: [
                (module: "Gun", x: 0, y: 0),
                (module: "Reactor", x: 1, y: 0),
                (module: "Plate", x: 0, y: 1),
            ])]),
            (ships: [(modules: [
                (module: "Gun", x: 0, y: 0),
                (module: "Reactor", x: 0, y: 1),
            ])]),
        ),
    )"#;

    fn write_temp(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_scenario_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = write_temp(&dir, "modules.ron", CATALOG);
        let battle = write_temp(&dir, "battle.ron", BATTLE);

        let scenario = Scenario::load(&catalog, &battle).unwrap();
        assert_eq!(scenario.catalog().len(), 3);
        let stats = scenario.validate(&BattleConfig::default()).unwrap();
        assert_eq!(stats.live_ships, [1, 1]);
        assert_eq!(stats.live_modules, [3, 2]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_catalog(&dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("nope.ron"));
    }

    #[test]
    fn test_bad_ron_is_parse_error() {
        let err = parse_battle("(players: (", "inline").unwrap_err();
        match err {
            LoadError::Parse { path, .. } => assert_eq!(path, "inline"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_component_is_invalid() {
        let text = r#"[(name: "Odd", width: 1, height: 1, health: 1.0, components: [(name: "Teleporter")])]"#;
        let err = parse_catalog(text, "inline").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Invalid(SimError::UnknownComponent { .. })
        ));
    }

    #[test]
    fn test_unknown_module_fails_validation() {
        let catalog = parse_catalog(CATALOG, "inline").unwrap();
        let battle = parse_battle(&BATTLE.replace("\"Plate\"", "\"Hull\""), "inline").unwrap();
        let err = Scenario::new(catalog, battle)
            .validate(&BattleConfig::default())
            .unwrap_err();
        assert_eq!(err, SimError::UnknownModule("Hull".to_string()));
    }

    #[test]
    fn test_config_file_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_temp(&dir, "good.ron", "(timeout: 30.0, grid_resolution: 8)");
        let bad = write_temp(&dir, "bad.ron", "(time_step: 0.0)");

        let config = load_config(&good).unwrap();
        assert_eq!(config.timeout.as_seconds(), 30.0);
        assert_eq!(config.grid_resolution, 8);
        assert!(matches!(
            load_config(&bad),
            Err(LoadError::Invalid(SimError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_bundled_data_is_valid() {
        let scenario = Scenario::load(
            &default_catalog_path(),
            &default_data_dir().join("battle.ron"),
        )
        .unwrap();
        let stats = scenario.validate(&BattleConfig::default()).unwrap();
        assert!(stats.live_ships[0] > 0);
        assert!(stats.live_ships[1] > 0);
    }
}
