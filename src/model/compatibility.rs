//! Type compatibility for foreign keys
//!
//! Decides whether two column types may be joined by a relationship. Types are sorted
//! into families (integer, exact numeric, text, ...) with a few engine-specific rules,
//! then compared by family.

use crate::models::{DataType, DatabaseType};

/// Coarse classification of a column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFamily {
    Integer,
    /// Exact numeric; carries the scale when known
    Exact(Option<u32>),
    Float,
    Text,
    Uuid,
    Binary,
    Boolean,
    Date,
    Time,
    DateTime,
    Json,
    Other(String),
}

const INTEGER_IDS: &[&str] = &[
    "int", "smallint", "bigint", "tinyint", "mediumint", "serial", "smallserial", "bigserial",
    "serial4", "serial8", "int1", "int3", "hugeint", "pls_integer", "binary_integer",
];
const EXACT_IDS: &[&str] = &["decimal", "numeric", "number", "money", "smallmoney"];
const FLOAT_IDS: &[&str] = &[
    "float", "real", "double", "float32", "float64", "binary_float", "binary_double",
];
const TEXT_IDS: &[&str] = &[
    "varchar", "char", "nvarchar", "nchar", "text", "tinytext", "mediumtext", "longtext",
    "ntext", "string", "fixedstring", "clob", "nclob", "citext", "name", "bpchar", "long",
];
const BINARY_IDS: &[&str] = &[
    "bytea", "blob", "binary", "varbinary", "tinyblob", "mediumblob", "longblob", "raw",
    "long raw", "image",
];
const DATETIME_PREFIXES: &[&str] = &["timestamp", "datetime", "smalldatetime"];

/// Family of `data_type` under the rules of `engine`
pub fn type_family(data_type: &DataType, engine: DatabaseType) -> TypeFamily {
    let id = data_type
        .id
        .trim_end_matches(" unsigned")
        .trim_end_matches(" signed")
        .trim_end_matches(" zerofill");

    match engine {
        DatabaseType::MySql | DatabaseType::MariaDb => {
            if id == "tinyint" && data_type.length == Some(1) {
                return TypeFamily::Boolean;
            }
            if id == "binary" && data_type.length == Some(16) {
                return TypeFamily::Uuid;
            }
        }
        DatabaseType::SqlServer => {
            if id == "uniqueidentifier" {
                return TypeFamily::Uuid;
            }
        }
        DatabaseType::Sqlite => return sqlite_affinity(id, data_type),
        _ => {}
    }

    if INTEGER_IDS.contains(&id) || is_sized_integer(id) {
        TypeFamily::Integer
    } else if EXACT_IDS.contains(&id) {
        TypeFamily::Exact(data_type.scale)
    } else if FLOAT_IDS.contains(&id) {
        TypeFamily::Float
    } else if TEXT_IDS.contains(&id) {
        TypeFamily::Text
    } else if id == "uuid" || id == "uniqueidentifier" {
        TypeFamily::Uuid
    } else if BINARY_IDS.contains(&id) {
        TypeFamily::Binary
    } else if id == "boolean" || (id == "bit" && data_type.length.unwrap_or(1) == 1) {
        TypeFamily::Boolean
    } else if id == "date" || id == "date32" {
        TypeFamily::Date
    } else if id.starts_with("time") && !id.starts_with("timestamp") {
        TypeFamily::Time
    } else if DATETIME_PREFIXES.iter().any(|p| id.starts_with(p)) {
        TypeFamily::DateTime
    } else if id == "json" || id == "jsonb" {
        TypeFamily::Json
    } else {
        TypeFamily::Other(id.to_string())
    }
}

/// ClickHouse-style `Int32`, `UInt64`, ...
fn is_sized_integer(id: &str) -> bool {
    let digits = id
        .strip_prefix("uint")
        .or_else(|| id.strip_prefix("int"));
    digits.is_some_and(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
}

/// SQLite type affinity rules, applied in the documented order
fn sqlite_affinity(id: &str, data_type: &DataType) -> TypeFamily {
    if id.contains("int") {
        TypeFamily::Integer
    } else if id.contains("char") || id.contains("clob") || id.contains("text") {
        TypeFamily::Text
    } else if id.contains("blob") || id.is_empty() {
        TypeFamily::Binary
    } else if id.contains("real") || id.contains("floa") || id.contains("doub") {
        TypeFamily::Float
    } else {
        TypeFamily::Exact(data_type.scale)
    }
}

/// Whether a foreign key may link a column of type `a` to a column of type `b`
///
/// ```rust
/// use schema_diagram_sdk::model::are_types_compatible;
/// use schema_diagram_sdk::models::{DataType, DatabaseType};
///
/// let int = DataType::parse("int");
/// assert!(are_types_compatible(&int, &DataType::parse("bigint"), DatabaseType::PostgreSql));
/// assert!(!are_types_compatible(&int, &DataType::parse("varchar(10)"), DatabaseType::PostgreSql));
/// ```
pub fn are_types_compatible(a: &DataType, b: &DataType, engine: DatabaseType) -> bool {
    compatible_across(a, engine, b, engine)
}

/// Like [`are_types_compatible`], classifying each side with its own engine
pub fn compatible_across(
    a: &DataType,
    engine_a: DatabaseType,
    b: &DataType,
    engine_b: DatabaseType,
) -> bool {
    if a.id == b.id {
        return true;
    }
    families_compatible(&type_family(a, engine_a), &type_family(b, engine_b))
}

/// Raw type strings, e.g. straight from a user edit
pub fn are_raw_types_compatible(a: &str, b: &str, engine: DatabaseType) -> bool {
    are_types_compatible(&DataType::parse(a), &DataType::parse(b), engine)
}

fn families_compatible(a: &TypeFamily, b: &TypeFamily) -> bool {
    use TypeFamily::*;
    match (a, b) {
        (Other(_), _) | (_, Other(_)) => false,
        (Exact(_), Exact(_)) => true,
        // Whole-number decimals (Oracle NUMBER(10), NUMERIC(12,0)) join integer keys
        (Integer, Exact(scale)) | (Exact(scale), Integer) => scale.unwrap_or(0) == 0,
        (x, y) => x == y,
    }
}
