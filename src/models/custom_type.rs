//! User-defined types and view dependencies

use super::enums::CustomTypeKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTypeField {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Enum or composite type declared in the schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomType {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
    pub kind: CustomTypeKind,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub fields: Vec<CustomTypeField>,
}

impl CustomType {
    pub fn new_enum(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema: None,
            name: name.into(),
            kind: CustomTypeKind::Enum,
            values,
            fields: Vec::new(),
        }
    }

    pub fn new_composite(name: impl Into<String>, fields: Vec<CustomTypeField>) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema: None,
            name: name.into(),
            kind: CustomTypeKind::Composite,
            values: Vec::new(),
            fields,
        }
    }

    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    /// True if `reference` names this type, qualified or not
    pub fn matches(&self, reference: &str) -> bool {
        match (&self.schema, reference.rsplit_once('.')) {
            (Some(schema), Some((s, n))) => schema.eq_ignore_ascii_case(s) && self.name.eq_ignore_ascii_case(n),
            (_, Some(_)) => false,
            (_, None) => self.name.eq_ignore_ascii_case(reference),
        }
    }
}

/// A view's reference to a table (or another view) it reads from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub id: Uuid,
    /// The referenced base table
    pub table_id: Uuid,
    /// The view that reads from `table_id`
    pub dependent_table_id: Uuid,
}

impl Dependency {
    pub fn new(table_id: Uuid, dependent_table_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            table_id,
            dependent_table_id,
        }
    }
}
