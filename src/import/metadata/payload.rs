//! Shape of the JSON emitted by the per-engine introspection scripts
//!
//! Every engine script fills the same top-level arrays, but the values inside vary:
//! booleans arrive as `true`, `"YES"`, `1` or `"t"`, numbers as numbers or strings,
//! and optional arrays are often missing entirely. All keys are optional here.

use serde::{Deserialize, Serialize};

/// A boolean in whatever spelling the engine produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl Flag {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Flag::Bool(b) => Some(*b),
            Flag::Number(n) => Some(*n != 0),
            Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" | "t" | "1" => Some(true),
                "no" | "n" | "false" | "f" | "0" => Some(false),
                _ => None,
            },
        }
    }
}

/// A number or string scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Scalar {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::Integer(n) => u64::try_from(*n).ok(),
            Scalar::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as u64),
            Scalar::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_u64().and_then(|n| u32::try_from(n).ok())
    }

    pub fn as_text(&self) -> String {
        match self {
            Scalar::Integer(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s.clone(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataPayload {
    pub fk_info: Vec<ForeignKeyInfo>,
    pub pk_info: Vec<PrimaryKeyInfo>,
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
    pub tables: Vec<TableInfo>,
    pub views: Vec<ViewInfo>,
    pub custom_types: Vec<CustomTypeInfo>,
    pub check_constraints: Vec<CheckConstraintInfo>,
    pub database_name: Option<String>,
    pub version: Option<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyInfo {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub foreign_key_name: Option<String>,
    pub reference_schema: Option<String>,
    pub reference_table: String,
    pub reference_column: String,
    pub fk_def: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryKeyInfo {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub pk_def: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionInfo {
    pub precision: Option<Scalar>,
    pub scale: Option<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnInfo {
    pub schema: Option<String>,
    pub table: String,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub character_maximum_length: Option<Scalar>,
    pub precision: Option<PrecisionInfo>,
    pub ordinal_position: Option<Scalar>,
    pub nullable: Option<Flag>,
    pub default: Option<Scalar>,
    pub collation: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexInfo {
    pub schema: Option<String>,
    pub table: String,
    pub name: String,
    /// `None` for expression index parts
    pub column: Option<String>,
    pub index_type: Option<String>,
    pub cardinality: Option<Scalar>,
    pub size: Option<Scalar>,
    pub unique: Option<Flag>,
    pub column_position: Option<Scalar>,
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableInfo {
    pub schema: Option<String>,
    pub table: String,
    pub rows: Option<Scalar>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub engine: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewInfo {
    pub schema: Option<String>,
    pub view_name: String,
    pub view_definition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomTypeFieldInfo {
    pub field: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomTypeInfo {
    pub schema: Option<String>,
    #[serde(rename = "type")]
    pub name: String,
    /// `enum` or `composite`
    pub kind: String,
    pub values: Vec<String>,
    pub fields: Vec<CustomTypeFieldInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConstraintInfo {
    pub schema: Option<String>,
    pub table: String,
    pub name: Option<String>,
    pub expression: String,
}
