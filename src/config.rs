//! Typed, environment-driven configuration (`SPEC_FULL.md` §6, §4.11).
//!
//! Resolved once at orchestrator-construction time via the `config` crate's
//! `Environment` source layered over in-code defaults. Orchestration code
//! never re-reads the environment mid-run: doing so would violate the TCR
//! Orchestrator's replay-determinism requirement (§5).

use serde::Deserialize;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub cell_port_min: u16,
    pub cell_port_max: u16,
    pub cell_boot_timeout_ms: u64,
    pub tcr_max_retries: u32,
    pub tcr_max_fix_attempts: u32,
    pub reviewer_count: u32,
    pub file_reservation_ttl_seconds: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            cell_port_min: 8000,
            cell_port_max: 9000,
            cell_boot_timeout_ms: 10_000,
            tcr_max_retries: 2,
            tcr_max_fix_attempts: 5,
            reviewer_count: 2,
            file_reservation_ttl_seconds: 3600,
        }
    }
}

impl CoreConfig {
    /// Build configuration by layering process environment variables (see
    /// `SPEC_FULL.md` §6) over the documented defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("cell_port_min", defaults.cell_port_min as i64)
            .and_then(|b| b.set_default("cell_port_max", defaults.cell_port_max as i64))
            .and_then(|b| {
                b.set_default("cell_boot_timeout_ms", defaults.cell_boot_timeout_ms as i64)
            })
            .and_then(|b| b.set_default("tcr_max_retries", defaults.tcr_max_retries as i64))
            .and_then(|b| {
                b.set_default("tcr_max_fix_attempts", defaults.tcr_max_fix_attempts as i64)
            })
            .and_then(|b| b.set_default("reviewer_count", defaults.reviewer_count as i64))
            .and_then(|b| {
                b.set_default(
                    "file_reservation_ttl_seconds",
                    defaults.file_reservation_ttl_seconds as i64,
                )
            })
            .map_err(|e| CoreError::Configuration {
                message: e.to_string(),
            })?
            .add_source(
                config::Environment::default()
                    .prefix_separator("_")
                    .try_parsing(true)
                    .source(Some(Self::env_map())),
            );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CoreError::Configuration {
                message: e.to_string(),
            })
    }

    /// Map the non-prefixed environment variable names from §6 onto the
    /// snake_case field names `config::Environment` expects.
    fn env_map() -> std::collections::HashMap<String, String> {
        let names = [
            ("CELL_PORT_MIN", "cell_port_min"),
            ("CELL_PORT_MAX", "cell_port_max"),
            ("CELL_BOOT_TIMEOUT_MS", "cell_boot_timeout_ms"),
            ("TCR_MAX_RETRIES", "tcr_max_retries"),
            ("TCR_MAX_FIX_ATTEMPTS", "tcr_max_fix_attempts"),
            ("REVIEWER_COUNT", "reviewer_count"),
            ("FILE_RESERVATION_TTL_SECONDS", "file_reservation_ttl_seconds"),
        ];
        let mut map = std::collections::HashMap::new();
        for (env_name, field_name) in names {
            if let Ok(value) = std::env::var(env_name) {
                map.insert(field_name.to_string(), value);
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.cell_port_min, 8000);
        assert_eq!(cfg.cell_port_max, 9000);
        assert_eq!(cfg.cell_boot_timeout_ms, 10_000);
        assert_eq!(cfg.tcr_max_retries, 2);
        assert_eq!(cfg.tcr_max_fix_attempts, 5);
        assert_eq!(cfg.reviewer_count, 2);
        assert_eq!(cfg.file_reservation_ttl_seconds, 3600);
    }

    #[test]
    fn from_env_falls_back_to_defaults_when_unset() {
        let cfg = CoreConfig::from_env().expect("config should build from defaults alone");
        assert_eq!(cfg.cell_port_min, 8000);
    }
}
