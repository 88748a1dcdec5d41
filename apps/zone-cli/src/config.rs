//! CLI configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use soundtouch_core::ControllerConfig;

/// Environment variable naming the preferred zone master.
pub const ENV_MASTER_NAME: &str = "SOUNDTOUCH_MASTER_NAME";
/// Environment variable with comma-separated fallback addresses.
pub const ENV_FALLBACK_ADDRESSES: &str = "SOUNDTOUCH_FALLBACK_ADDRESSES";
/// Environment variable overriding the number of SSDP rounds.
pub const ENV_DISCOVERY_ROUNDS: &str = "SOUNDTOUCH_DISCOVERY_ROUNDS";

/// Loads configuration from a YAML file, then applies environment overrides.
pub fn load(path: Option<&Path>) -> Result<ControllerConfig> {
    let mut config = if let Some(path) = path {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        ControllerConfig::default()
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Applies overrides looked up through `var`.
///
/// Unparseable values are ignored with a warning.
pub fn apply_env_overrides(config: &mut ControllerConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(name) = var(ENV_MASTER_NAME) {
        config.master_name = name;
    }

    if let Some(val) = var(ENV_FALLBACK_ADDRESSES) {
        config.fallback_addresses = split_addresses(&val);
    }

    if let Some(val) = var(ENV_DISCOVERY_ROUNDS) {
        match val.parse() {
            Ok(rounds) => config.discovery.rounds = rounds,
            Err(_) => log::warn!("Ignoring {}={:?}: not a number", ENV_DISCOVERY_ROUNDS, val),
        }
    }
}

/// Splits a comma-separated address list, dropping blanks.
pub fn split_addresses(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn loads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "master_name: Working\n\
             fallback_addresses:\n  - 192.168.1.20\n  - 192.168.1.21\n\
             discovery:\n  rounds: 2\n  broadcast: false\n\
             fade:\n  step: 2"
        )
        .expect("write config");

        let config = load(Some(file.path())).expect("config loads");
        assert_eq!(config.master_name, "Working");
        assert_eq!(config.fallback_addresses, vec!["192.168.1.20", "192.168.1.21"]);
        assert_eq!(config.discovery.rounds, 2);
        assert!(!config.discovery.broadcast);
        assert_eq!(config.discovery.round_window_ms, 2000);
        assert_eq!(config.fade.step, 2);
        assert_eq!(config.key_hold_ms, 200);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load(Some(&dir.path().join("absent.yaml"))).expect_err("no file");
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "discovery: 42").expect("write config");
        assert!(load(Some(file.path())).is_err());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = ControllerConfig {
            master_name: "Office".into(),
            ..ControllerConfig::default()
        };
        apply_env_overrides(
            &mut config,
            vars(&[
                (ENV_MASTER_NAME, "Working"),
                (ENV_FALLBACK_ADDRESSES, "10.0.0.4, 10.0.0.5,,"),
                (ENV_DISCOVERY_ROUNDS, "5"),
            ]),
        );

        assert_eq!(config.master_name, "Working");
        assert_eq!(config.fallback_addresses, vec!["10.0.0.4", "10.0.0.5"]);
        assert_eq!(config.discovery.rounds, 5);
    }

    #[test]
    fn invalid_rounds_override_is_ignored() {
        let mut config = ControllerConfig::default();
        apply_env_overrides(&mut config, vars(&[(ENV_DISCOVERY_ROUNDS, "many")]));
        assert_eq!(config.discovery.rounds, 3);
    }
}
