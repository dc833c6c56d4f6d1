//! Layered configuration loading: defaults, then an optional TOML file,
//! then `TAINT_*` environment variables.

use libtaint_core::error::{Result, TaintError};
pub use serde::{Deserialize, Serialize};

/// Marker for a loadable configuration section.
pub trait Config: Deserialize<'static> + Serialize {}

pub static CONFIG_FILE_ENV_VAR: &str = "TAINT_CONFIG";
pub static CONFIG_ENV_PREFIX: &str = "TAINT";
pub static CONFIG_ENV_SEPARATOR: &str = "_";

pub struct ConfigLoader {}

impl ConfigLoader {
    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        let config_file = std::env::var(CONFIG_FILE_ENV_VAR)
            .unwrap_or_else(|_| "config.toml".to_string());
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator(CONFIG_ENV_SEPARATOR),
            )
            .add_source(
                config::File::new(&config_file, config::FileFormat::Toml)
                    .required(false),
            )
    }

    /// Load `section`, falling back to `default` field-by-field and when the
    /// section is absent altogether.
    pub fn load_cfg_or_default<T: Config>(section: &str, default: T) -> Result<T> {
        let defaults = config::Config::try_from(&default).map_err(|e| {
            TaintError::Config(format!("bad default config: {}", e))
        })?;
        let cfg = Self::builder()
            .add_source(defaults)
            .build()
            .map_err(|e| TaintError::Config(e.to_string()))?;
        cfg.get(section).or_else(|e| match e {
            config::ConfigError::NotFound(_) => Ok(default),
            _ => Err(TaintError::Config(e.to_string())),
        })
    }

    /// Load `section`, erroring when it is missing.
    pub fn load_cfg<T: Config>(section: &str) -> Result<T> {
        let cfg = Self::builder()
            .build()
            .map_err(|e| TaintError::Config(e.to_string()))?;
        cfg.get(section)
            .map_err(|e| TaintError::Config(e.to_string()))
    }
}
