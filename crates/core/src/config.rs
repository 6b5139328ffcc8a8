//! Daemon configuration: TTL defaults, reaper cadence, bind address.
//!
//! Resolution priority (highest first), mirrored by the daemon binary:
//! 1. Command-line flags
//! 2. Environment variables (`CLAIMD_*`)
//! 3. TOML config file (`--config <path>`)
//! 4. These defaults

use serde::{Deserialize, Serialize};

/// Default reaper cadence per SPEC_FULL.md §4.2 / §6.
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 30;
/// Default work-unit TTL per SPEC_FULL.md §6.
pub const DEFAULT_WORK_UNIT_TTL_SECS: u64 = 300;
/// Default agent TTL per SPEC_FULL.md §3.
pub const DEFAULT_AGENT_TTL_SECS: u64 = 600;
/// Default loopback bind per SPEC_FULL.md §6.
pub const DEFAULT_BIND: &str = "127.0.0.1:7432";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,
    #[serde(default = "default_work_unit_ttl")]
    pub default_work_unit_ttl_secs: u64,
    #[serde(default = "default_agent_ttl")]
    pub default_agent_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            reaper_interval_secs: default_reaper_interval(),
            default_work_unit_ttl_secs: default_work_unit_ttl(),
            default_agent_ttl_secs: default_agent_ttl(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_reaper_interval() -> u64 {
    DEFAULT_REAPER_INTERVAL_SECS
}

fn default_work_unit_ttl() -> u64 {
    DEFAULT_WORK_UNIT_TTL_SECS
}

fn default_agent_ttl() -> u64 {
    DEFAULT_AGENT_TTL_SECS
}

impl Config {
    /// Parse a TOML config file's contents. Missing fields fall back to
    /// defaults via `#[serde(default = ...)]`.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply an environment-variable override layer on top of `self`.
    /// Unset or unparsable variables are ignored (an unparsable override is
    /// treated the same as an absent one; the request surface, not config
    /// resolution, is responsible for rejecting bad input from users).
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("CLAIMD_BIND") {
            self.bind = v;
        }
        if let Some(v) = env_u64("CLAIMD_REAPER_INTERVAL_SECS") {
            self.reaper_interval_secs = v;
        }
        if let Some(v) = env_u64("CLAIMD_DEFAULT_WORK_UNIT_TTL_SECS") {
            self.default_work_unit_ttl_secs = v;
        }
        if let Some(v) = env_u64("CLAIMD_DEFAULT_AGENT_TTL_SECS") {
            self.default_agent_ttl_secs = v;
        }
        self
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.bind, "127.0.0.1:7432");
        assert_eq!(cfg.reaper_interval_secs, 30);
        assert_eq!(cfg.default_work_unit_ttl_secs, 300);
        assert_eq!(cfg.default_agent_ttl_secs, 600);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg = Config::from_toml_str("bind = \"127.0.0.1:9000\"\n").unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:9000");
        assert_eq!(cfg.reaper_interval_secs, 30);
    }

    #[test]
    fn roundtrips_through_toml() {
        let cfg = Config::default();
        let s = toml::to_string(&cfg).unwrap();
        let back = Config::from_toml_str(&s).unwrap();
        assert_eq!(cfg, back);
    }
}
