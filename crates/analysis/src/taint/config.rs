use libtaint_utils::config::{Config, ConfigLoader};

/// `[taint]` section: which untrusted sources the tracker registers at
/// attach. Everything defaults to off; sources can still be added at
/// runtime through the registration mutators.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct TaintConfig {
    /// Taint command-line argument bytes.
    pub args: bool,
    /// Environment variable names whose values are tainted.
    pub env: Vec<String>,
    /// File paths whose reads are tainted.
    pub files: Vec<String>,
    /// Taint bytes read from standard input.
    pub stdin: bool,
    /// Taint bytes received from the network.
    pub network: bool,
}

pub static CONFIG_SECTION: &str = "taint";

impl Config for TaintConfig {}

impl TaintConfig {
    pub fn must_load() -> TaintConfig {
        ConfigLoader::load_cfg_or_default(CONFIG_SECTION, Default::default())
            .expect("failed to load taint config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_all_off() {
        let cfg = TaintConfig::default();
        assert!(!cfg.args && !cfg.stdin && !cfg.network);
        assert!(cfg.env.is_empty() && cfg.files.is_empty());
    }
}
