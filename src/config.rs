/// Configuration management for lineagekit
use crate::io::ParserSettings;
use crate::kinship::KinshipMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment variables overriding configuration values
pub const ENV_PREFIX: &str = "LINEAGEKIT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub graph: GraphSettings,
    pub kinship: KinshipSettings,
    pub errors: ErrorSimulationSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSettings {
    pub max_parents: usize,
    pub parser: ParserSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinshipSettings {
    pub mode: KinshipMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSimulationSettings {
    pub rate: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph: GraphSettings {
                max_parents: 2,
                parser: ParserSettings::default(),
            },
            kinship: KinshipSettings {
                mode: KinshipMode::default(),
            },
            errors: ErrorSimulationSettings {
                rate: 0.01,
                seed: None,
            },
            output: OutputSettings {
                format: "text".to_string(),
            },
        }
    }
}

impl Config {
    /// Layered load: built-in defaults, then the optional YAML file, then
    /// `LINEAGEKIT__SECTION__KEY` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Config::default())
            .context("Failed to serialize default configuration")?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to assemble configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, without environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.graph.max_parents == 0 {
            return Err(anyhow::anyhow!("Maximum number of parents must be greater than 0"));
        }

        if self.graph.parser.missing_parent_notation.is_empty() {
            return Err(anyhow::anyhow!("At least one missing-parent token is required"));
        }

        if let Some(separator) = &self.graph.parser.separator {
            if separator.is_empty() {
                return Err(anyhow::anyhow!("Column separator must not be empty"));
            }
        }

        if !(0.0..=1.0).contains(&self.errors.rate) {
            return Err(anyhow::anyhow!("Error rate must be between 0 and 1"));
        }

        if !matches!(self.output.format.as_str(), "json" | "text") {
            return Err(anyhow::anyhow!(
                "Unsupported output format '{}', expected 'json' or 'text'",
                self.output.format
            ));
        }

        Ok(())
    }
}
