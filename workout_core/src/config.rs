//! Configuration file support for wgen.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/wgen/config.toml`.

use crate::{Error, Location, Result, SlotType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub fragmentation: FragmentationConfig,

    #[serde(default)]
    pub filler: FillerConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Fragment classification and duration estimation parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FragmentationConfig {
    /// Slots whose max sweat level is at or below this go to part A
    #[serde(default = "default_part_a_sweat_ceiling")]
    pub part_a_sweat_ceiling: u8,

    #[serde(default = "default_minutes_per_set")]
    pub minutes_per_set: f64,

    /// Golden (skill) slots need more rest
    #[serde(default = "default_golden_minutes_per_set")]
    pub golden_minutes_per_set: f64,

    /// Flat extra time for each warm-up and cool-down slot
    #[serde(default = "default_prep_minutes")]
    pub prep_minutes: f64,

    /// Locations where equipment-dependent work cannot happen
    #[serde(default = "default_restrictive_locations")]
    pub restrictive_locations: Vec<Location>,
}

impl Default for FragmentationConfig {
    fn default() -> Self {
        Self {
            part_a_sweat_ceiling: default_part_a_sweat_ceiling(),
            minutes_per_set: default_minutes_per_set(),
            golden_minutes_per_set: default_golden_minutes_per_set(),
            prep_minutes: default_prep_minutes(),
            restrictive_locations: default_restrictive_locations(),
        }
    }
}

/// Exercise selection parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FillerConfig {
    /// Largest accepted gap between exercise level and resolved level
    #[serde(default = "default_level_tolerance")]
    pub level_tolerance: u8,

    /// Equipment that can be improvised once tolerance is widened
    #[serde(default = "default_improvised_equipment")]
    pub improvised_equipment: Vec<String>,

    /// Overrides for the generic exercise used per slot type
    #[serde(default)]
    pub fallback_exercises: BTreeMap<SlotType, String>,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            level_tolerance: default_level_tolerance(),
            improvised_equipment: default_improvised_equipment(),
            fallback_exercises: BTreeMap::new(),
        }
    }
}

/// Context defaults used by the CLI when no flag is given
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DefaultsConfig {
    #[serde(default = "default_location")]
    pub location: Location,

    /// Minutes
    #[serde(default = "default_time_available")]
    pub time_available: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            time_available: default_time_available(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("wgen")
}

fn default_part_a_sweat_ceiling() -> u8 {
    1
}

fn default_minutes_per_set() -> f64 {
    2.0
}

fn default_golden_minutes_per_set() -> f64 {
    3.0
}

fn default_prep_minutes() -> f64 {
    5.0
}

fn default_restrictive_locations() -> Vec<Location> {
    vec![Location::Office]
}

fn default_level_tolerance() -> u8 {
    3
}

fn default_improvised_equipment() -> Vec<String> {
    vec!["bench".into(), "low_bar".into()]
}

fn default_location() -> Location {
    Location::Home
}

fn default_time_available() -> u32 {
    45
}

/// Smallest per-set rate that keeps rounded duration estimates strictly
/// increasing in the number of sets
pub const MIN_MINUTES_PER_SET: f64 = 1.0;

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("wgen").join("config.toml")
    }

    /// Reject values that would make duration estimates meaningless
    pub fn validate(&self) -> Result<()> {
        let f = &self.fragmentation;
        for (name, value) in [
            ("minutes_per_set", f.minutes_per_set),
            ("golden_minutes_per_set", f.golden_minutes_per_set),
            ("prep_minutes", f.prep_minutes),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "fragmentation.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        // Below a minute per set, rounding lets an extra set leave the
        // estimate unchanged
        for (name, value) in [
            ("minutes_per_set", f.minutes_per_set),
            ("golden_minutes_per_set", f.golden_minutes_per_set),
        ] {
            if value < MIN_MINUTES_PER_SET {
                return Err(Error::Config(format!(
                    "fragmentation.{} must be at least {}, got {}",
                    name, MIN_MINUTES_PER_SET, value
                )));
            }
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
