mod schema;

pub use schema::{AnalysisConfig, DimensionSchema};

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Default analysis config path, relative to the corpus directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("analysis.yaml")
}

/// Load a per-corpus analysis configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to the config file. If None, uses ./analysis.yaml
///
/// # Errors
///
/// Returns an error if:
/// - The config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<AnalysisConfig> {
    let config_path = path.unwrap_or_else(default_config_path);

    if !config_path.exists() {
        anyhow::bail!(
            "Analysis config not found at {}. Pass --config or create ./analysis.yaml",
            config_path.display()
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: AnalysisConfig = serde_saphyr::from_str(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    Ok(config)
}
