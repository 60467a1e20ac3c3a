//! Structural diff between two diagram snapshots
//!
//! [`diff`] reports one record per changed attribute, plus whole-entity
//! `Added`/`Removed` records. Output order depends only on entity ids and
//! attribute names, never on the order of the input arrays.
//!
//! # Example
//!
//! ```rust
//! use schema_diagram_sdk::diff::diff;
//! use schema_diagram_sdk::models::{DatabaseType, Diagram, Table};
//!
//! let mut before = Diagram::new("app", DatabaseType::PostgreSql);
//! before.tables.push(Table::new("users"));
//! let mut after = before.clone();
//! after.tables[0].name = "accounts".to_string();
//!
//! let changes = diff(&before, &after);
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes.iter().next().unwrap().attribute(), Some("name"));
//! ```

pub mod change;
pub mod engine;

pub use change::{Change, ChangeKind, ChangeList, ObjectKind};
pub use engine::diff;
