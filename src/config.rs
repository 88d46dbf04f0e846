//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/rscombo/rscombo.toml`
//! 3. Environment variables: `RSCOMBO_*` prefix
//! 4. Command-line overrides (applied by the CLI layer)

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Flat JSON catalog file the category source reads from
    pub catalog_path: PathBuf,
    /// Directory the combo store persists into
    pub store_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let store_dir = ProjectDirs::from("", "", "rscombo")
            .map(|dirs| dirs.data_dir().join("combos"))
            .unwrap_or_else(|| PathBuf::from(".rscombo/combos"));
        Self {
            catalog_path: PathBuf::from("catalog.json"),
            store_dir,
        }
    }
}

impl Settings {
    /// Load settings with layered precedence.
    pub fn load() -> Result<Self, ApplicationError> {
        let defaults = Settings::default();

        let mut builder = Config::builder()
            .set_default("catalog_path", path_str(&defaults.catalog_path))
            .map_err(config_err)?
            .set_default("store_dir", path_str(&defaults.store_dir))
            .map_err(config_err)?;

        if let Some(dirs) = ProjectDirs::from("", "", "rscombo") {
            let global = dirs.config_dir().join("rscombo.toml");
            if global.is_file() {
                debug!(path = %global.display(), "loading global config");
                builder = builder.add_source(File::from(global));
            }
        }

        builder = builder.add_source(Environment::with_prefix("RSCOMBO"));

        builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_err)
    }
}

fn path_str(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

fn config_err(e: config::ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
