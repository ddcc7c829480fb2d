//! Command handlers -- one module per subcommand

pub mod check;
pub mod config;
pub mod scan;

use std::path::Path;

use tracing::debug;

use modelscan_core::config::ModelScanConfig;

use crate::error::CliError;

/// Load the effective configuration.
///
/// An explicitly requested file must exist. When the implicit default file is
/// absent, built-in defaults are used (still subject to env overrides and validation).
pub async fn load_config(path: &Path, explicit: bool) -> Result<ModelScanConfig, CliError> {
    if !explicit && !path.exists() {
        debug!(path = %path.display(), "no config file found, using defaults");
        let mut config = ModelScanConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        return Ok(config);
    }

    Ok(ModelScanConfig::load(path).await?)
}

/// Human-readable name of the configuration source.
pub fn config_source(path: &Path, explicit: bool) -> String {
    if !explicit && !path.exists() {
        "built-in defaults".to_owned()
    } else {
        path.display().to_string()
    }
}
