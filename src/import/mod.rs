//! Import functionality
//!
//! Turns external schema descriptions into a canonical [`Diagram`]:
//! - SQL DDL, per engine dialect, with auto-fix and a pattern-matching fallback
//! - DBML
//! - JSON emitted by the per-engine introspection scripts
//!
//! All front-ends produce a [`SchemaDraft`](crate::model::SchemaDraft) that the
//! [`DiagramBuilder`](crate::model::DiagramBuilder) resolves into ids.
//!
//! # Example
//!
//! ```rust
//! use schema_diagram_sdk::import::{import_auto, ImportConfig};
//!
//! let outcome = import_auto(
//!     "Table users {\n  id int [pk]\n}\nTable posts {\n  id int [pk]\n  user_id int [ref: > users.id]\n}",
//!     &ImportConfig::default(),
//! ).unwrap();
//! assert_eq!(outcome.diagram.tables.len(), 2);
//! assert_eq!(outcome.diagram.relationships.len(), 1);
//! ```

pub mod classify;
pub mod config;
pub mod dbml;
pub mod metadata;
pub mod sql;
pub mod views;

pub use classify::{classify, ContentType};
pub use config::{ImportConfig, ImportConfigBuilder};
pub use dbml::DbmlImporter;
pub use metadata::MetadataImporter;
pub use sql::SqlImporter;

use crate::models::Diagram;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error during import
///
/// Only `ClassificationAmbiguous`, `Syntax` and `InvalidPayload` abort an import.
/// The remaining variants describe a single rejected entity and are reported in
/// [`ImportOutcome::issues`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    #[error("Could not determine whether the input is DDL, DBML or introspection JSON")]
    ClassificationAmbiguous,
    #[error("Syntax error{}: {message}", position_suffix(.line, .column))]
    Syntax {
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },
    #[error("{entity} references missing {reference}")]
    ReferentialIntegrity { entity: String, reference: String },
    #[error("Relationship '{relationship}' links incompatible types {source_type} and {target_type}")]
    TypeIncompatibility {
        relationship: String,
        source_type: String,
        target_type: String,
    },
    #[error("Duplicate {kind} '{name}' rejected")]
    DuplicateEntity { kind: &'static str, name: String },
    #[error("Invalid metadata payload: {0}")]
    InvalidPayload(String),
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::InvalidPayload(err.to_string())
    }
}

fn position_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {}, column {}", line, column),
        (Some(line), None) => format!(" at line {}", line),
        _ => String::new(),
    }
}

/// A statement that could not be parsed; processing continued with the next one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementError {
    /// 1-based line in the submitted text
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
}

impl fmt::Display for StatementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(column) => write!(f, "line {}, column {}: {}", self.line, column, self.message),
            None => write!(f, "line {}: {}", self.line, self.message),
        }
    }
}

impl From<StatementError> for ImportError {
    fn from(err: StatementError) -> Self {
        ImportError::Syntax {
            line: Some(err.line),
            column: err.column,
            message: err.message,
        }
    }
}

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// Everything that could be recovered
    pub diagram: Diagram,
    /// Non-fatal notes for the user (auto-fixes, skipped statements, lossy conversions)
    pub warnings: Vec<String>,
    /// Statements that failed to parse
    pub errors: Vec<StatementError>,
    /// Entities rejected while building the model
    pub issues: Vec<ImportError>,
}

/// Classify `input` and run the matching importer
pub fn import_auto(input: &str, config: &ImportConfig) -> Result<ImportOutcome, ImportError> {
    let content_type = classify(input).ok_or(ImportError::ClassificationAmbiguous)?;
    tracing::debug!("Input classified as {}", content_type);

    match content_type {
        ContentType::Ddl => SqlImporter::new(config.clone()).parse(input),
        ContentType::Dbml => DbmlImporter::new(config.clone()).parse(input),
        ContentType::Query => MetadataImporter::new(config.clone()).import_str(input),
    }
}
