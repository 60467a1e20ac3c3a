//! Table model for the SDK

use super::field::Field;
use super::index::{CheckConstraint, Index};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canvas position. Importers leave it at the origin; layout belongs to the caller.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

pub const DEFAULT_TABLE_COLOR: &str = "#8eb7ff";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub color: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub check_constraints: Vec<CheckConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub is_view: bool,
    /// View body, kept verbatim for display only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_definition: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            schema: None,
            color: DEFAULT_TABLE_COLOR.to_string(),
            position: Position::default(),
            fields: Vec::new(),
            indexes: Vec::new(),
            check_constraints: Vec::new(),
            comment: None,
            is_view: false,
            view_definition: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    /// `schema.name`, or just `name` when unqualified
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Identity key used for duplicate detection
    pub fn unique_key(&self) -> (Option<String>, String) {
        (self.schema.clone(), self.name.clone())
    }

    pub fn field(&self, id: Uuid) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Exact match first, then case-insensitive
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
    }

    pub fn primary_key_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    pub fn has_field(&self, id: Uuid) -> bool {
        self.fields.iter().any(|f| f.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;

    #[test]
    fn test_field_by_name_falls_back_to_case_insensitive() {
        let table = Table::new("users").with_fields(vec![
            Field::new("Id", DataType::new("int")),
            Field::new("id", DataType::new("bigint")),
        ]);
        assert_eq!(table.field_by_name("id").map(|f| f.data_type.id.as_str()), Some("bigint"));
        assert_eq!(table.field_by_name("ID").map(|f| f.name.as_str()), Some("Id"));
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(Table::new("users").with_schema("app").qualified_name(), "app.users");
        assert_eq!(Table::new("users").qualified_name(), "users");
    }
}
