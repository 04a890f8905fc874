// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Substrate Configuration Types
//
// Defines the configuration schema for a KGC substrate process, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Receipt defaults (toolchain, maximum age, composition semantics)
// - Store-level knowledge metadata
// - Swarm sizing and scheduling strategy
// - Logging settings

use crate::domain::capacity::ScheduleStrategy;
use crate::domain::receipt::{
    CompositionOp, ConflictPolicy, DEFAULT_MAX_AGE_DAYS, DEFAULT_TOOLCHAIN_VERSION,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "kgc.substrate/v1";
pub const KIND: &str = "SubstrateConfig";

/// Top-level Kubernetes-style substrate configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstrateConfigManifest {
    /// API version (must be "kgc.substrate/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "SubstrateConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: SubstrateConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    /// Optional: Configuration version for tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// Content under spec:
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubstrateConfigSpec {
    #[serde(default)]
    pub receipts: ReceiptsConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub swarm: SwarmConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptsConfig {
    /// Toolchain identifier stamped into every receipt
    #[serde(default = "default_toolchain_version")]
    pub toolchain_version: String,

    /// Receipts older than this are rejected by verification
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    #[serde(default)]
    pub composition_op: CompositionOp,

    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

impl Default for ReceiptsConfig {
    fn default() -> Self {
        Self {
            toolchain_version: default_toolchain_version(),
            max_age_days: default_max_age_days(),
            composition_op: CompositionOp::default(),
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Store-level metadata seeded into every new knowledge store
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    #[serde(default = "default_agent_count")]
    pub agent_count: usize,

    /// Total abstract resource units split across agents
    #[serde(default = "default_resource_budget")]
    pub resource_budget: i64,

    #[serde(default)]
    pub strategy: ScheduleStrategy,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            agent_count: default_agent_count(),
            resource_budget: default_resource_budget(),
            strategy: ScheduleStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_toolchain_version() -> String {
    DEFAULT_TOOLCHAIN_VERSION.to_string()
}

fn default_max_age_days() -> u32 {
    DEFAULT_MAX_AGE_DAYS
}

fn default_agent_count() -> usize {
    3
}

fn default_resource_budget() -> i64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for SubstrateConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "kgc-substrate".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: SubstrateConfigSpec::default(),
        }
    }
}

impl SubstrateConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. KGC_CONFIG_PATH environment variable
    /// 2. ./kgc-config.yaml (working directory)
    /// 3. ~/.kgc/config.yaml (user home)
    /// 4. /etc/kgc/config.yaml (system, Unix) or C:\ProgramData\Kgc\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("KGC_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./kgc-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".kgc").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/kgc/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Kgc\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails hard if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::debug!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("KGC_LOG_LEVEL") {
            tracing::info!("Environment override: KGC_LOG_LEVEL={}", val);
            let observability = self.spec.observability.get_or_insert_with(Default::default);
            observability.logging.get_or_insert_with(Default::default).level = val;
        }

        if let Ok(val) = std::env::var("KGC_RECEIPT_MAX_AGE_DAYS") {
            match val.parse::<u32>() {
                Ok(days) => {
                    tracing::info!("Environment override: KGC_RECEIPT_MAX_AGE_DAYS={}", days);
                    self.spec.receipts.max_age_days = days;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for KGC_RECEIPT_MAX_AGE_DAYS: '{}'. Expected a day count. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("KGC_SWARM_STRATEGY") {
            match val.parse::<ScheduleStrategy>() {
                Ok(strategy) => {
                    tracing::info!("Environment override: KGC_SWARM_STRATEGY={}", strategy);
                    self.spec.swarm.strategy = strategy;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for KGC_SWARM_STRATEGY: '{}'. Expected round-robin/priority. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Effective logging settings (defaults when the section is absent)
    pub fn logging(&self) -> LoggingConfig {
        self.spec
            .observability
            .as_ref()
            .and_then(|o| o.logging.clone())
            .unwrap_or_default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.receipts.toolchain_version.is_empty() {
            anyhow::bail!("spec.receipts.toolchain_version cannot be empty");
        }

        if self.spec.receipts.max_age_days == 0 {
            anyhow::bail!("spec.receipts.max_age_days must be greater than 0");
        }

        if self.spec.swarm.agent_count == 0 {
            anyhow::bail!("spec.swarm.agent_count must be greater than 0");
        }

        if self.spec.swarm.resource_budget < 0 {
            anyhow::bail!(
                "spec.swarm.resource_budget cannot be negative: {}",
                self.spec.swarm.resource_budget
            );
        }

        let format = self.logging().format;
        if format != "json" && format != "text" {
            anyhow::bail!("Invalid log format: '{}'. Must be 'json' or 'text'", format);
        }

        Ok(())
    }
}
