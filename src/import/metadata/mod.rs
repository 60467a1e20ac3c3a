//! Introspection JSON import
//!
//! Each supported engine has a catalog query that reports the schema as one JSON
//! document with `columns`, `indexes`, `fk_info`, `pk_info`, `tables` and `views`
//! arrays (plus optional `custom_types` and `check_constraints`). This module reads
//! that document into the canonical model.
//!
//! # Example
//!
//! ```rust
//! use schema_diagram_sdk::import::{ImportConfig, MetadataImporter};
//! use schema_diagram_sdk::models::DatabaseType;
//!
//! let json = r#"{
//!     "columns": [{"schema": "public", "table": "users", "name": "id", "type": "integer", "nullable": false}],
//!     "pk_info": [{"schema": "public", "table": "users", "column": "id"}]
//! }"#;
//! let outcome = MetadataImporter::new(ImportConfig::for_database(DatabaseType::PostgreSql))
//!     .import_str(json)
//!     .unwrap();
//! assert!(outcome.diagram.tables[0].fields[0].primary_key);
//! ```

pub mod normalize;
pub mod payload;

pub use normalize::{normalize, Normalized};
pub use payload::MetadataPayload;

use super::{ImportConfig, ImportError, ImportOutcome};
use crate::model::DiagramBuilder;
use crate::models::DatabaseType;
use tracing::info;

/// Metadata importer - normalizes introspection JSON into a diagram
pub struct MetadataImporter {
    config: ImportConfig,
}

impl Default for MetadataImporter {
    fn default() -> Self {
        Self::new(ImportConfig::default())
    }
}

impl MetadataImporter {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    /// Decode and normalize a JSON document
    pub fn import_str(&self, json: &str) -> Result<ImportOutcome, ImportError> {
        let payload: MetadataPayload = serde_json::from_str(json)?;
        Ok(self.import(payload))
    }

    /// Normalize an already decoded payload
    ///
    /// With a `Generic` config the engine is guessed from the payload's `version`.
    pub fn import(&self, payload: MetadataPayload) -> ImportOutcome {
        let mut config = self.config.clone();
        if config.database_type == DatabaseType::Generic {
            if let Some(engine) = payload.version.as_ref().and_then(|v| engine_from_version(&v.as_text())) {
                info!("Detected {} from payload version", engine);
                config.database_type = engine;
            }
        }
        if let Some(database_name) = payload.database_name.as_deref() {
            if config.diagram_name == ImportConfig::default().diagram_name && !database_name.trim().is_empty() {
                config.diagram_name = database_name.trim().to_string();
            }
        }

        let normalized = normalize(payload, config.database_type, config.lossy_conversion_warnings);
        let mut warnings = normalized.warnings;
        let built = DiagramBuilder::new(config).build(normalized.draft);
        warnings.extend(built.warnings);
        if !built.issues.is_empty() {
            info!("Model builder rejected {} entities", built.issues.len());
        }

        ImportOutcome {
            diagram: built.diagram,
            warnings,
            errors: Vec::new(),
            issues: built.issues,
        }
    }
}

/// Engine named by a `SELECT version()` style string
pub fn engine_from_version(version: &str) -> Option<DatabaseType> {
    let lower = version.to_lowercase();
    let engine = if lower.contains("cockroach") {
        DatabaseType::CockroachDb
    } else if lower.contains("postgres") {
        DatabaseType::PostgreSql
    } else if lower.contains("mariadb") {
        DatabaseType::MariaDb
    } else if lower.contains("mysql") {
        DatabaseType::MySql
    } else if lower.contains("sql server") {
        DatabaseType::SqlServer
    } else if lower.contains("sqlite") {
        DatabaseType::Sqlite
    } else if lower.contains("clickhouse") {
        DatabaseType::ClickHouse
    } else if lower.contains("oracle") {
        DatabaseType::Oracle
    } else {
        return None;
    };
    Some(engine)
}
