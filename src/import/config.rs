//! Configuration for schema import

use crate::models::DatabaseType;
use serde::{Deserialize, Serialize};

/// Configuration for schema import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    /// Engine the input was written for; selects grammar and type rules
    pub database_type: DatabaseType,

    /// Repair known malformed-but-common SQL before parsing
    pub auto_fix: bool,

    /// Recover table skeletons with pattern matching when the grammar yields nothing
    pub regex_fallback: bool,

    /// Reject relationships whose endpoint types cannot be joined
    pub check_type_compatibility: bool,

    /// Name given to the resulting diagram
    pub diagram_name: String,

    /// Warn when a DBML type has to be simplified (arrays)
    pub lossy_conversion_warnings: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_type: DatabaseType::Generic,
            auto_fix: true,
            regex_fallback: true,
            check_type_compatibility: true,
            diagram_name: "Imported diagram".to_string(),
            lossy_conversion_warnings: true,
        }
    }
}

impl ImportConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration for one engine
    pub fn for_database(database_type: DatabaseType) -> Self {
        Self {
            database_type,
            ..Self::default()
        }
    }

    /// Create a builder for custom configuration
    pub fn builder() -> ImportConfigBuilder {
        ImportConfigBuilder::default()
    }
}

/// Builder for ImportConfig
#[derive(Debug, Default)]
pub struct ImportConfigBuilder {
    config: ImportConfig,
}

impl ImportConfigBuilder {
    pub fn database_type(mut self, database_type: DatabaseType) -> Self {
        self.config.database_type = database_type;
        self
    }

    pub fn auto_fix(mut self, enabled: bool) -> Self {
        self.config.auto_fix = enabled;
        self
    }

    pub fn regex_fallback(mut self, enabled: bool) -> Self {
        self.config.regex_fallback = enabled;
        self
    }

    pub fn check_type_compatibility(mut self, enabled: bool) -> Self {
        self.config.check_type_compatibility = enabled;
        self
    }

    /// Set the diagram name; blank names keep the default
    pub fn diagram_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.config.diagram_name = name;
        }
        self
    }

    pub fn lossy_conversion_warnings(mut self, enabled: bool) -> Self {
        self.config.lossy_conversion_warnings = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ImportConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ImportConfig::default();
        assert_eq!(config.database_type, DatabaseType::Generic);
        assert!(config.auto_fix);
        assert!(config.regex_fallback);
        assert!(config.check_type_compatibility);
    }

    #[test]
    fn test_builder() {
        let config = ImportConfig::builder()
            .database_type(DatabaseType::MySql)
            .auto_fix(false)
            .diagram_name("  ")
            .build();

        assert_eq!(config.database_type, DatabaseType::MySql);
        assert!(!config.auto_fix);
        assert_eq!(config.diagram_name, "Imported diagram");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ImportConfig =
            serde_json::from_str(r#"{"databaseType": "postgresql", "regexFallback": false}"#).unwrap();
        assert_eq!(config.database_type, DatabaseType::PostgreSql);
        assert!(!config.regex_fallback);
        assert!(config.auto_fix);
    }
}
