//! Site configuration with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::input::{Action, KeyBindings};
use crate::vehicle::VehicleKind;

pub const CONFIG_FILE: &str = "site.ron";

/// Top-level site configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Websocket + tick loop settings.
    pub server: ServerConfig,
    /// Rigid body world settings.
    pub physics: PhysicsConfig,
    /// Focus key and key binding overrides.
    pub input: InputConfig,
    /// Debris blocks scattered at startup.
    pub debris: DebrisConfig,
    /// Rigs spawned at startup, one lane each, in this order.
    pub rigs: Vec<VehicleKind>,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Websocket listen address.
    pub bind_address: String,
    /// Fixed simulation rate; physics dt and the PD derivative dt are both 1/tick_hz.
    pub tick_hz: u32,
}

impl ServerConfig {
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_hz.max(1) as f32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    /// m/s².
    pub gravity: [f32; 3],
    /// Bodies beyond this distance on any axis (or non-finite) are reset.
    pub safety_bound: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Key that cycles the input focus through rigs.
    pub focus_cycle_key: String,
    /// Rebinds applied on top of each vehicle's default bindings.
    pub overrides: Vec<KeyOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyOverride {
    pub vehicle: VehicleKind,
    pub action: Action,
    /// Browser `KeyboardEvent.code`, e.g. `"ArrowUp"`.
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebrisConfig {
    /// Total number of blocks.
    pub count: usize,
    /// RNG seed for column jitter.
    pub seed: u64,
    /// Corner of the debris field; y is taken from the terrain.
    pub origin: [f32; 3],
    /// Distance between column centres.
    pub spacing: f32,
    /// Blocks per column.
    pub stack_height: usize,
    /// Block half size in metres.
    pub half_extent: f32,
    /// Block mass in kg.
    pub mass: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Include per-joint debug records in snapshots.
    pub joint_overlay: bool,
}

// --- Default implementations ---

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            physics: PhysicsConfig::default(),
            input: InputConfig::default(),
            debris: DebrisConfig::default(),
            rigs: VehicleKind::ALL.to_vec(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9001".to_string(),
            tick_hz: 60,
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            safety_bound: 1_000.0,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            focus_cycle_key: "Tab".to_string(),
            overrides: Vec::new(),
        }
    }
}

impl Default for DebrisConfig {
    fn default() -> Self {
        Self {
            count: 24,
            seed: 7,
            origin: [-2.0, 0.0, -9.0],
            spacing: 1.2,
            stack_height: 3,
            half_extent: 0.25,
            mass: 20.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            joint_overlay: false,
        }
    }
}

// --- Load / Save ---

impl SiteConfig {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::Read)?;
            let config: SiteConfig = ron::from_str(&contents).map_err(ConfigError::Parse)?;
            info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = SiteConfig::default();
            config.save(config_dir)?;
            info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `site.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::Write)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::Write)?;
        Ok(())
    }

    /// Default bindings for `kind` with this config's overrides applied.
    pub fn bindings_for(&self, kind: VehicleKind) -> KeyBindings {
        let mut bindings = kind.default_bindings();
        for o in self.input.overrides.iter().filter(|o| o.vehicle == kind) {
            bindings.rebind(o.action, &o.key);
        }
        bindings
    }
}
