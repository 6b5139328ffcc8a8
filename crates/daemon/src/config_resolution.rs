//! Merges CLI flags, environment variables, an optional TOML file, and
//! built-in defaults into one `Config`, in that priority order (highest
//! first), per SPEC_FULL.md §2.1 / §6.

use anyhow::{Context, Result};
use claimd_core::Config;
use std::path::Path;

/// CLI-flag overrides. `None` means "flag not passed" — leave the lower
/// layers' value alone.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub reaper_interval_secs: Option<u64>,
    pub default_work_unit_ttl_secs: Option<u64>,
    pub default_agent_ttl_secs: Option<u64>,
}

pub fn resolve(cli: CliOverrides, config_path: Option<&Path>) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            Config::from_toml_str(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        }
        None => Config::default(),
    };

    config = config.apply_env_overrides();

    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(v) = cli.reaper_interval_secs {
        config.reaper_interval_secs = v;
    }
    if let Some(v) = cli.default_work_unit_ttl_secs {
        config.default_work_unit_ttl_secs = v;
    }
    if let Some(v) = cli.default_agent_ttl_secs {
        config.default_agent_ttl_secs = v;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_overrides_yields_defaults() {
        let config = resolve(CliOverrides::default(), None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn cli_override_wins_over_file() {
        let dir = std::env::temp_dir().join(format!("claimd-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("claimd.toml");
        std::fs::write(&path, "bind = \"127.0.0.1:9000\"\n").unwrap();

        let cli = CliOverrides {
            bind: Some("127.0.0.1:9999".to_string()),
            ..Default::default()
        };
        let config = resolve(cli, Some(&path)).unwrap();
        assert_eq!(config.bind, "127.0.0.1:9999");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn file_value_applies_when_no_cli_override() {
        let dir = std::env::temp_dir().join(format!("claimd-test-file-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("claimd.toml");
        std::fs::write(&path, "reaper_interval_secs = 5\n").unwrap();

        let config = resolve(CliOverrides::default(), Some(&path)).unwrap();
        assert_eq!(config.reaper_interval_secs, 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let result = resolve(CliOverrides::default(), Some(Path::new("/nonexistent/claimd.toml")));
        assert!(result.is_err());
    }
}
