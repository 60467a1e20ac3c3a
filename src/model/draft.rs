//! Name-based drafts produced by the importers
//!
//! Front-ends describe what they found by *name*; the builder resolves names to ids,
//! assigns ids and enforces the model invariants.

use crate::models::{Cardinality, CustomType, Field, SortDirection};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[A-Za-z_][\w$]*|"[^"]+"|`[^`]+`"#).expect("valid word regex"));

/// Possibly schema-qualified table name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }

    /// Split `schema.table` on the last dot
    pub fn parse(qualified: &str) -> Self {
        match qualified.rsplit_once('.') {
            Some((schema, name)) => Self::new(Some(schema.to_string()), name),
            None => Self::new(None, qualified),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A column of a table; `column: None` stands for the table's primary key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: TableRef,
    pub column: Option<String>,
}

impl ColumnRef {
    pub fn new(table: TableRef, column: impl Into<String>) -> Self {
        Self {
            table,
            column: Some(column.into()),
        }
    }

    pub fn primary_key_of(table: TableRef) -> Self {
        Self {
            table,
            column: None,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}.{}", self.table, column),
            None => write!(f, "{}(primary key)", self.table),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexDraft {
    pub name: Option<String>,
    pub columns: Vec<(String, SortDirection)>,
    pub unique: bool,
    pub index_type: Option<String>,
    pub cardinality: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckDraft {
    pub name: Option<String>,
    pub expression: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableDraft {
    pub schema: Option<String>,
    pub name: String,
    pub fields: Vec<Field>,
    pub indexes: Vec<IndexDraft>,
    pub checks: Vec<CheckDraft>,
    pub comment: Option<String>,
    pub is_view: bool,
    pub view_definition: Option<String>,
}

impl TableDraft {
    pub fn new(table: TableRef) -> Self {
        Self {
            schema: table.schema,
            name: table.name,
            ..Default::default()
        }
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.schema.clone(), self.name.clone())
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        let pos = self
            .fields
            .iter()
            .position(|f| f.name == name)
            .or_else(|| self.fields.iter().position(|f| f.name.eq_ignore_ascii_case(name)))?;
        self.fields.get_mut(pos)
    }

    /// Names of this table's fields mentioned in `expression`, in order of first mention
    pub fn mentioned_fields(&self, expression: &str) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for word in WORD.find_iter(expression) {
            let name = word.as_str().trim_matches(|c| c == '"' || c == '`');
            if let Some(field) = self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)) {
                if !columns.contains(&field.name) {
                    columns.push(field.name.clone());
                }
            }
        }
        columns
    }

    /// Same table, comparing names case-insensitively
    pub fn is(&self, table: &TableRef) -> bool {
        self.name.eq_ignore_ascii_case(&table.name)
            && match (&self.schema, &table.schema) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (_, None) => true,
                (None, Some(_)) => false,
            }
    }
}

/// Foreign key in canonical orientation: `source` is referenced, `target` references it
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDraft {
    pub name: Option<String>,
    pub source: ColumnRef,
    pub target: ColumnRef,
    /// Explicit `(source, target)` cardinalities; inferred from constraints when absent
    pub cardinality: Option<(Cardinality, Cardinality)>,
}

impl RelationshipDraft {
    pub fn foreign_key(referenced: ColumnRef, referencing: ColumnRef) -> Self {
        Self {
            name: None,
            source: referenced,
            target: referencing,
            cardinality: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyDraft {
    pub table: TableRef,
    pub dependent: TableRef,
}

/// Index declared outside its table (`CREATE INDEX ... ON t`)
#[derive(Debug, Clone, PartialEq)]
pub struct TableIndexDraft {
    pub table: TableRef,
    pub index: IndexDraft,
}

/// Everything one import found, before id resolution
#[derive(Debug, Clone, Default)]
pub struct SchemaDraft {
    pub tables: Vec<TableDraft>,
    pub relationships: Vec<RelationshipDraft>,
    pub dependencies: Vec<DependencyDraft>,
    pub custom_types: Vec<CustomType>,
    pub indexes: Vec<TableIndexDraft>,
}

impl SchemaDraft {
    pub fn table_mut(&mut self, table: &TableRef) -> Option<&mut TableDraft> {
        self.tables.iter_mut().find(|t| t.is(table))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.custom_types.is_empty()
    }

    /// Point every field whose type names a known custom type at it
    pub fn link_custom_types(&mut self) {
        let SchemaDraft {
            tables, custom_types, ..
        } = self;
        if custom_types.is_empty() {
            return;
        }
        for field in tables.iter_mut().flat_map(|t| t.fields.iter_mut()) {
            if let Some(custom) = custom_types.iter().find(|c| c.matches(&field.data_type.id)) {
                field.custom_type = Some(custom.name.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_ref_parse() {
        assert_eq!(TableRef::parse("app.users"), TableRef::new(Some("app".into()), "users"));
        assert_eq!(TableRef::parse("users"), TableRef::new(None, "users"));
    }

    #[test]
    fn test_draft_matches_unqualified_reference() {
        let draft = TableDraft::new(TableRef::parse("public.Users"));
        assert!(draft.is(&TableRef::parse("users")));
        assert!(draft.is(&TableRef::parse("PUBLIC.users")));
        assert!(!draft.is(&TableRef::parse("other.users")));
    }

    #[test]
    fn test_mentioned_fields_in_order_of_appearance() {
        let mut draft = TableDraft::new(TableRef::parse("items"));
        for name in ["qty", "price", "note"] {
            draft.fields.push(Field::new(name, crate::models::DataType::new("int")));
        }
        assert_eq!(draft.mentioned_fields(r#"PRICE > 0 AND "qty" < 10"#), vec!["price", "qty"]);
    }
}
