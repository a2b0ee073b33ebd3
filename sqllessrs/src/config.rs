//! Configuration system for sqlless.
//!
//! Supports TOML-based configuration with global defaults and per-datasource overrides.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqllessError};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SqllessConfig {
    /// Global defaults applied to all datasources unless overridden.
    pub defaults: GlobalDefaults,

    /// Per-datasource configuration overrides (keyed by datasource name).
    #[serde(default)]
    pub datasources: HashMap<String, DatasourceConfig>,
}

/// Global default settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalDefaults {
    pub query: QueryConfig,
    pub catalog: CatalogConfig,
    pub pool: PoolConfig,
    pub store: StoreConfig,
    pub validation: ValidationConfig,
}

/// Query compilation and execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Execution timeout in milliseconds (default: 30000, 0 = no timeout).
    pub timeout_ms: u64,
    /// Row limit a fresh query starts with (default: 1000).
    pub default_row_limit: u64,
    /// Limits at or above this value emit no LIMIT clause at all (default: 10000).
    pub row_limit_ceiling: u64,
}

/// Metadata catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Cache TTL in seconds (default: 3600).
    pub ttl_secs: u64,
    /// Maximum cached entries per key space (default: 1000).
    pub max_size: usize,
    /// Maximum distinct values sampled for categorical columns (default: 50).
    pub sample_limit: usize,
    /// Lower-case name fragments that mark a string column as categorical.
    pub categorical_keywords: Vec<String>,
}

/// Connection pooling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum concurrent connections (default: 16).
    pub size: usize,
}

/// Saved-query store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Warehouse table holding saved queries (default: SQL_TOOL_USER_CONFIGS).
    pub table_name: String,
}

/// Validation configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Report join columns missing from the target table as warnings (default: false).
    pub warn_only: bool,
}

/// Per-datasource configuration (can override globals).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasourceConfig {
    pub query: Option<QueryConfig>,
    pub catalog: Option<CatalogConfig>,
    pub pool: Option<PoolConfig>,
    pub store: Option<StoreConfig>,
    pub validation: Option<ValidationConfig>,
}

// Default implementations

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            default_row_limit: 1000,
            row_limit_ceiling: 10_000,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_size: 1000,
            sample_limit: 50,
            categorical_keywords: ["category", "region", "status", "type"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { size: 16 }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_name: "SQL_TOOL_USER_CONFIGS".to_string(),
        }
    }
}

impl SqllessConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SqllessError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| SqllessError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `SQLLESS_CONFIG` environment variable
    /// 2. `./sqlless.toml` (current directory)
    /// 3. `~/.config/sqlless/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("SQLLESS_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from SQLLESS_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring SQLLESS_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("sqlless.toml") {
            tracing::info!("loaded config from ./sqlless.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sqlless").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }

    /// Get resolved config for a specific datasource (merges global defaults).
    pub fn for_datasource(&self, name: &str) -> ResolvedDatasourceConfig {
        ResolvedDatasourceConfig::merge(&self.defaults, self.datasources.get(name))
    }
}

/// Fully resolved configuration for a datasource (no Option fields).
#[derive(Debug, Clone, Default)]
pub struct ResolvedDatasourceConfig {
    pub query: QueryConfig,
    pub catalog: CatalogConfig,
    pub pool: PoolConfig,
    pub store: StoreConfig,
    pub validation: ValidationConfig,
}

impl ResolvedDatasourceConfig {
    fn merge(defaults: &GlobalDefaults, override_cfg: Option<&DatasourceConfig>) -> Self {
        let ds = override_cfg.cloned().unwrap_or_default();
        Self {
            query: ds.query.unwrap_or_else(|| defaults.query.clone()),
            catalog: ds.catalog.unwrap_or_else(|| defaults.catalog.clone()),
            pool: ds.pool.unwrap_or_else(|| defaults.pool.clone()),
            store: ds.store.unwrap_or_else(|| defaults.store.clone()),
            validation: ds.validation.unwrap_or_else(|| defaults.validation.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = SqllessConfig::default();
        assert_eq!(cfg.defaults.query.timeout_ms, 30_000);
        assert_eq!(cfg.defaults.query.default_row_limit, 1000);
        assert_eq!(cfg.defaults.query.row_limit_ceiling, 10_000);
        assert_eq!(cfg.defaults.catalog.ttl_secs, 3600);
        assert_eq!(cfg.defaults.catalog.sample_limit, 50);
        assert_eq!(cfg.defaults.store.table_name, "SQL_TOOL_USER_CONFIGS");
        assert!(!cfg.defaults.validation.warn_only);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[defaults.query]
timeout_ms = 60000
row_limit_ceiling = 50000

[defaults.catalog]
categorical_keywords = ["segment"]
"#;
        let cfg = SqllessConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.defaults.query.timeout_ms, 60_000);
        assert_eq!(cfg.defaults.query.row_limit_ceiling, 50_000);
        // Unspecified fields keep their defaults.
        assert_eq!(cfg.defaults.query.default_row_limit, 1000);
        assert_eq!(cfg.defaults.catalog.categorical_keywords, vec!["segment"]);
        assert_eq!(cfg.defaults.catalog.sample_limit, 50);
    }

    #[test]
    fn test_datasource_override() {
        let toml = r#"
[defaults.pool]
size = 8

[datasources.prod.pool]
size = 32

[datasources.prod.validation]
warn_only = true
"#;
        let cfg = SqllessConfig::from_toml(toml).unwrap();

        let default_resolved = cfg.for_datasource("unknown");
        assert_eq!(default_resolved.pool.size, 8);
        assert!(!default_resolved.validation.warn_only);

        let prod_resolved = cfg.for_datasource("prod");
        assert_eq!(prod_resolved.pool.size, 32);
        assert!(prod_resolved.validation.warn_only);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = SqllessConfig::from_toml("defaults = 3").unwrap_err();
        assert!(matches!(err, SqllessError::Config(_)));
    }
}
