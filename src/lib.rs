//! Schema Diagram SDK - schema import and structural diffing for editable diagrams
//!
//! Provides unified interfaces for:
//! - Import of SQL DDL, DBML and introspection JSON into one canonical model
//! - Canonical model construction and type compatibility rules
//! - Validation logic (naming conflicts, view dependency cycles)
//! - Diffing of two diagram snapshots into typed change records

pub mod cli;
pub mod diff;
pub mod import;
pub mod model;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use diff::{diff, Change, ChangeKind, ChangeList, ObjectKind};
pub use import::{
    classify, import_auto, ContentType, DbmlImporter, ImportConfig, ImportError, ImportOutcome, MetadataImporter,
    SqlImporter, StatementError,
};
pub use model::{are_types_compatible, DiagramBuilder};
pub use validation::{DependencyValidator, TableValidator};

// Re-export models
pub use models::enums::*;
pub use models::{DataType, Diagram, Field, Relationship, Table};
