//! Validation functionality
//!
//! Provides validation logic for:
//! - Table validation (naming conflicts on `(schema, name)`)
//! - Dependency validation (view dependency cycles, self-references)

pub mod dependencies;
pub mod tables;

pub use dependencies::{CircularDependency, DependencyValidator, SelfReference};
pub use tables::{NamingConflict, TableValidator};
