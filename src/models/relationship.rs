//! Relationship model for the SDK

use super::enums::Cardinality;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field-level link between two tables.
///
/// Orientation is fixed: the *source* is the referenced side (normally the "one"
/// side, e.g. `users.id`), the *target* is the table holding the foreign key column
/// (e.g. `posts.user_id`). Every importer produces relationships in this orientation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: Uuid,
    pub name: String,
    pub source_table_id: Uuid,
    pub source_field_id: Uuid,
    pub target_table_id: Uuid,
    pub target_field_id: Uuid,
    pub source_cardinality: Cardinality,
    pub target_cardinality: Cardinality,
}

impl Relationship {
    /// One-to-many relationship from a referenced field to a referencing field
    pub fn new(
        name: impl Into<String>,
        (source_table_id, source_field_id): (Uuid, Uuid),
        (target_table_id, target_field_id): (Uuid, Uuid),
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source_table_id,
            source_field_id,
            target_table_id,
            target_field_id,
            source_cardinality: Cardinality::One,
            target_cardinality: Cardinality::Many,
        }
    }

    pub fn with_cardinality(mut self, source: Cardinality, target: Cardinality) -> Self {
        self.source_cardinality = source;
        self.target_cardinality = target;
        self
    }

    pub fn touches_table(&self, table_id: Uuid) -> bool {
        self.source_table_id == table_id || self.target_table_id == table_id
    }

    pub fn touches_field(&self, field_id: Uuid) -> bool {
        self.source_field_id == field_id || self.target_field_id == field_id
    }
}
