//! Canonical schema model
//!
//! Every importer converges on these structures and the diff engine compares them.
//! Entities carry random v4 ids assigned at construction; names can change without
//! breaking references between entities.

pub mod custom_type;
pub mod data_type;
pub mod diagram;
pub mod enums;
pub mod field;
pub mod index;
pub mod relationship;
pub mod table;

pub use custom_type::{CustomType, CustomTypeField, Dependency};
pub use data_type::{DataType, ParsedType};
pub use diagram::{Area, Diagram, DiagramIndex};
pub use enums::*;
pub use field::Field;
pub use index::{CheckConstraint, Index, IndexColumn};
pub use relationship::Relationship;
pub use table::{Position, Table, DEFAULT_TABLE_COLOR};

use uuid::Uuid;

/// Error raised by model-level operations (validation, removal, linking)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("{kind} {id} references missing {reference}")]
    DanglingReference {
        kind: &'static str,
        id: Uuid,
        reference: String,
    },
    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },
    #[error("type {source_type} is not compatible with {target_type}")]
    TypeIncompatibility {
        source_type: String,
        target_type: String,
    },
}
