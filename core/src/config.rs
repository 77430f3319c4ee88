//! Configuration types for TICKSCAN

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::TickscanError;
use crate::traits::TickscanResult;
use crate::types::Tick;

/// Lowest tick of the default key space
pub const MIN_TICK: i32 = -887272;

/// Highest tick of the default key space
pub const MAX_TICK: i32 = 887272;

/// Bounds of a tick key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDomain {
    pub min_tick: i32,
    pub max_tick: i32,
}

impl Default for KeyDomain {
    fn default() -> Self {
        Self {
            min_tick: MIN_TICK,
            max_tick: MAX_TICK,
        }
    }
}

impl KeyDomain {
    pub fn new(min_tick: i32, max_tick: i32) -> TickscanResult<Self> {
        let domain = Self { min_tick, max_tick };
        domain.validate()?;
        Ok(domain)
    }

    pub fn validate(&self) -> TickscanResult<()> {
        if self.min_tick >= self.max_tick {
            return Err(TickscanError::InvalidDomain {
                min: self.min_tick,
                max: self.max_tick,
            });
        }
        Ok(())
    }

    /// Strictly between the bounds; the only ticks a scan may report
    pub fn contains_open(&self, tick: Tick) -> bool {
        self.min_tick < tick.0 && tick.0 < self.max_tick
    }

    /// Within the bounds, bounds included
    pub fn contains_closed(&self, tick: Tick) -> bool {
        self.min_tick <= tick.0 && tick.0 <= self.max_tick
    }
}

/// Tick scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Key space the scanner must stay inside
    pub domain: KeyDomain,

    /// Largest `max_steps` a single request may ask for
    pub max_steps_limit: u16,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            domain: KeyDomain::default(),
            max_steps_limit: u16::MAX,
        }
    }
}

impl ScannerConfig {
    pub fn with_domain(domain: KeyDomain) -> Self {
        Self {
            domain,
            ..Default::default()
        }
    }
}

/// Configuration for the `tickscan` tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Logging level / filter directive
    pub log_level: String,

    /// Snapshot store directory
    pub data_dir: PathBuf,

    /// Scanner configuration
    #[serde(default)]
    pub scanner: ScannerConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: PathBuf::from("./data"),
            scanner: ScannerConfig::default(),
        }
    }
}

impl ToolConfig {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> TickscanResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TickscanError::ConfigError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        let config = Self::from_json(&content)?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> TickscanResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TickscanError::ConfigError(e.to_string()))?;
        config.scanner.domain.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> TickscanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
