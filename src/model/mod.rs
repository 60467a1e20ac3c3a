//! Canonical model construction
//!
//! - [`draft`]: name-based intermediate shapes every importer emits
//! - [`builder`]: resolves drafts into a validated [`Diagram`](crate::models::Diagram)
//! - [`compatibility`]: foreign-key type compatibility rules

pub mod builder;
pub mod compatibility;
pub mod draft;

pub use builder::{relate, BuildOutput, DiagramBuilder, FieldEndpoint, TABLE_COLORS};
pub use compatibility::{are_raw_types_compatible, are_types_compatible, compatible_across, type_family, TypeFamily};
pub use draft::{
    CheckDraft, ColumnRef, DependencyDraft, IndexDraft, RelationshipDraft, SchemaDraft, TableDraft,
    TableIndexDraft, TableRef,
};
