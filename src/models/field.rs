//! Field (column) model

use super::data_type::DataType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A column of a table or view
///
/// # Example
///
/// ```rust
/// use schema_diagram_sdk::models::{DataType, Field};
///
/// let field = Field::new("email", DataType::parse("VARCHAR(255)")).not_null().unique();
/// assert!(!field.nullable);
/// assert_eq!(field.data_type.length, Some(255));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    /// Auto-increment / identity / serial column
    #[serde(default)]
    pub increment: bool,
    /// Default expression as written in the source, engine syntax preserved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Name of the `CustomType` this column was declared with, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            data_type,
            nullable: true,
            primary_key: false,
            unique: false,
            increment: false,
            default: None,
            collation: None,
            comment: None,
            custom_type: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
