//! Index and check constraint models

use super::enums::SortDirection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexColumn {
    pub field_id: Uuid,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub id: Uuid,
    pub name: String,
    /// Indexed fields in key order
    pub columns: Vec<IndexColumn>,
    #[serde(default)]
    pub unique: bool,
    /// Engine-specific access method (btree, hash, gin, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_type: Option<String>,
    /// Distinct-value estimate reported by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<u64>,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: Vec<IndexColumn>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            columns,
            unique: false,
            index_type: None,
            cardinality: None,
        }
    }

    pub fn references(&self, field_id: Uuid) -> bool {
        self.columns.iter().any(|c| c.field_id == field_id)
    }
}

/// `CHECK` constraint; `field_ids` lists the columns the expression was attached to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConstraint {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub expression: String,
    #[serde(default)]
    pub field_ids: Vec<Uuid>,
}

impl CheckConstraint {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            expression: expression.into(),
            field_ids: Vec::new(),
        }
    }
}
