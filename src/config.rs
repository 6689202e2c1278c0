use std::time::Duration;

use crate::error::ConfigError;

/// Everything one scan invocation needs, built explicitly at startup and
/// passed down. No ambient globals, so parallel invocations with different
/// settings cannot interfere.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Fixed number of tenant schemas an instance is sized for.
    pub max_schema_count: i64,
    /// Only hosts with this prefix are considered tenant-hosting instances.
    pub host_prefix: String,
    /// Case-sensitive substring marking a schema name as tenant-owned.
    pub schema_marker: String,
    /// Per-endpoint inspection deadline.
    pub inspect_timeout: Duration,
    /// Cap on simultaneous outbound inspections.
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_schema_count: 5,
            host_prefix: "db-".to_string(),
            schema_marker: "dg".to_string(),
            inspect_timeout: Duration::from_millis(5_000),
            concurrency: 16,
        }
    }
}

impl ScanConfig {
    /// Reject invalid settings before any task is dispatched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_schema_count < 0 {
            return Err(ConfigError::NegativeMaxSchemaCount(self.max_schema_count));
        }
        if self.schema_marker.is_empty() {
            return Err(ConfigError::EmptyMarker);
        }
        if self.inspect_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Connection parameters for the Postgres inspector. Supplied via flags and
/// environment; the password never appears in source or logs.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub user: String,
    pub password: String,
    pub port: u16,
    pub database: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: String::new(),
            port: 5432,
            database: "postgres".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_max_rejected() {
        let cfg = ScanConfig {
            max_schema_count: -1,
            ..ScanConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NegativeMaxSchemaCount(-1))
        ));
    }

    #[test]
    fn empty_marker_rejected() {
        let cfg = ScanConfig {
            schema_marker: String::new(),
            ..ScanConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyMarker)));
    }

    #[test]
    fn zero_timeout_rejected() {
        let cfg = ScanConfig {
            inspect_timeout: Duration::ZERO,
            ..ScanConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroTimeout)));
    }
}
