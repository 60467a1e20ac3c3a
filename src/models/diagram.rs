//! Diagram aggregate root and its id arena

use super::custom_type::{CustomType, Dependency};
use super::enums::DatabaseType;
use super::field::Field;
use super::index::{CheckConstraint, Index};
use super::relationship::Relationship;
use super::table::Table;
use super::ModelError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Visual grouping rectangle; carried through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    pub id: Uuid,
    pub name: String,
    pub database_type: DatabaseType,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub custom_types: Vec<CustomType>,
    #[serde(default)]
    pub areas: Vec<Area>,
    pub created_at: DateTime<Utc>,
}

impl Diagram {
    pub fn new(name: impl Into<String>, database_type: DatabaseType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            database_type,
            tables: Vec::new(),
            relationships: Vec::new(),
            dependencies: Vec::new(),
            custom_types: Vec::new(),
            areas: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn table(&self, id: Uuid) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn table_mut(&mut self, id: Uuid) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.id == id)
    }

    pub fn table_by_name(&self, schema: Option<&str>, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name == name && t.schema.as_deref() == schema)
    }

    /// Flat id lookup over every entity in the diagram
    pub fn index(&self) -> DiagramIndex<'_> {
        DiagramIndex::new(self)
    }

    /// Check the referential invariants of the model.
    ///
    /// Every field referenced by an index, check constraint or relationship must
    /// exist in the owning table, relationship and dependency endpoints must be tables
    /// of this diagram, and `(schema, name)` must be unique among tables and among
    /// the fields of each table.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen_tables = HashSet::new();
        for table in &self.tables {
            if !seen_tables.insert(table.unique_key()) {
                return Err(ModelError::Duplicate {
                    kind: "table",
                    name: table.qualified_name(),
                });
            }

            let mut seen_fields = HashSet::new();
            for field in &table.fields {
                if !seen_fields.insert(field.name.as_str()) {
                    return Err(ModelError::Duplicate {
                        kind: "field",
                        name: format!("{}.{}", table.qualified_name(), field.name),
                    });
                }
            }

            for index in &table.indexes {
                if let Some(missing) = index.columns.iter().find(|c| !table.has_field(c.field_id)) {
                    return Err(ModelError::DanglingReference {
                        kind: "index",
                        id: index.id,
                        reference: format!("field {}", missing.field_id),
                    });
                }
            }

            for check in &table.check_constraints {
                if let Some(missing) = check.field_ids.iter().find(|id| !table.has_field(**id)) {
                    return Err(ModelError::DanglingReference {
                        kind: "check constraint",
                        id: check.id,
                        reference: format!("field {}", missing),
                    });
                }
            }
        }

        for rel in &self.relationships {
            for (table_id, field_id) in [
                (rel.source_table_id, rel.source_field_id),
                (rel.target_table_id, rel.target_field_id),
            ] {
                let table = self.table(table_id).ok_or_else(|| ModelError::DanglingReference {
                    kind: "relationship",
                    id: rel.id,
                    reference: format!("table {}", table_id),
                })?;
                if !table.has_field(field_id) {
                    return Err(ModelError::DanglingReference {
                        kind: "relationship",
                        id: rel.id,
                        reference: format!("field {} of table {}", field_id, table.name),
                    });
                }
            }
        }

        for dep in &self.dependencies {
            for table_id in [dep.table_id, dep.dependent_table_id] {
                if self.table(table_id).is_none() {
                    return Err(ModelError::DanglingReference {
                        kind: "dependency",
                        id: dep.id,
                        reference: format!("table {}", table_id),
                    });
                }
            }
        }

        Ok(())
    }

    /// Remove a table together with every relationship and dependency touching it
    pub fn remove_table(&mut self, table_id: Uuid) -> Result<Table, ModelError> {
        let pos = self
            .tables
            .iter()
            .position(|t| t.id == table_id)
            .ok_or(ModelError::NotFound { kind: "table", id: table_id })?;
        let table = self.tables.remove(pos);
        self.relationships.retain(|r| !r.touches_table(table_id));
        self.dependencies
            .retain(|d| d.table_id != table_id && d.dependent_table_id != table_id);
        Ok(table)
    }

    /// Remove a field, dropping it from indexes (and indexes left empty), check
    /// constraints and relationships that reference it
    pub fn remove_field(&mut self, table_id: Uuid, field_id: Uuid) -> Result<Field, ModelError> {
        let table = self
            .table_mut(table_id)
            .ok_or(ModelError::NotFound { kind: "table", id: table_id })?;
        let pos = table
            .fields
            .iter()
            .position(|f| f.id == field_id)
            .ok_or(ModelError::NotFound { kind: "field", id: field_id })?;
        let field = table.fields.remove(pos);

        for index in &mut table.indexes {
            index.columns.retain(|c| c.field_id != field_id);
        }
        table.indexes.retain(|i| !i.columns.is_empty());
        table.check_constraints.retain(|c| !c.field_ids.contains(&field_id));
        self.relationships.retain(|r| !r.touches_field(field_id));
        Ok(field)
    }

    pub fn remove_index(&mut self, table_id: Uuid, index_id: Uuid) -> Result<Index, ModelError> {
        let table = self
            .table_mut(table_id)
            .ok_or(ModelError::NotFound { kind: "table", id: table_id })?;
        let pos = table
            .indexes
            .iter()
            .position(|i| i.id == index_id)
            .ok_or(ModelError::NotFound { kind: "index", id: index_id })?;
        Ok(table.indexes.remove(pos))
    }

    pub fn remove_check_constraint(
        &mut self,
        table_id: Uuid,
        check_id: Uuid,
    ) -> Result<CheckConstraint, ModelError> {
        let table = self
            .table_mut(table_id)
            .ok_or(ModelError::NotFound { kind: "table", id: table_id })?;
        let pos = table
            .check_constraints
            .iter()
            .position(|c| c.id == check_id)
            .ok_or(ModelError::NotFound { kind: "check constraint", id: check_id })?;
        Ok(table.check_constraints.remove(pos))
    }

    pub fn remove_relationship(&mut self, id: Uuid) -> Result<Relationship, ModelError> {
        let pos = self
            .relationships
            .iter()
            .position(|r| r.id == id)
            .ok_or(ModelError::NotFound { kind: "relationship", id })?;
        Ok(self.relationships.remove(pos))
    }

    pub fn remove_dependency(&mut self, id: Uuid) -> Result<Dependency, ModelError> {
        let pos = self
            .dependencies
            .iter()
            .position(|d| d.id == id)
            .ok_or(ModelError::NotFound { kind: "dependency", id })?;
        Ok(self.dependencies.remove(pos))
    }

    /// Remove a custom type; columns declared with it keep their plain type
    pub fn remove_custom_type(&mut self, id: Uuid) -> Result<CustomType, ModelError> {
        let pos = self
            .custom_types
            .iter()
            .position(|t| t.id == id)
            .ok_or(ModelError::NotFound { kind: "custom type", id })?;
        let removed = self.custom_types.remove(pos);
        for field in self.tables.iter_mut().flat_map(|t| t.fields.iter_mut()) {
            if field.custom_type.as_deref().is_some_and(|name| removed.matches(name)) {
                field.custom_type = None;
            }
        }
        Ok(removed)
    }
}

/// Borrowed id -> entity maps over one diagram snapshot.
///
/// Nested entities are stored with the id of their owning table so callers can
/// resolve parents without walking the table list.
#[derive(Debug, Default)]
pub struct DiagramIndex<'a> {
    pub tables: HashMap<Uuid, &'a Table>,
    pub fields: HashMap<Uuid, (Uuid, &'a Field)>,
    pub indexes: HashMap<Uuid, (Uuid, &'a Index)>,
    pub check_constraints: HashMap<Uuid, (Uuid, &'a CheckConstraint)>,
    pub relationships: HashMap<Uuid, &'a Relationship>,
    pub dependencies: HashMap<Uuid, &'a Dependency>,
    pub custom_types: HashMap<Uuid, &'a CustomType>,
}

impl<'a> DiagramIndex<'a> {
    pub fn new(diagram: &'a Diagram) -> Self {
        let mut index = DiagramIndex::default();
        for table in &diagram.tables {
            index.tables.insert(table.id, table);
            for field in &table.fields {
                index.fields.insert(field.id, (table.id, field));
            }
            for idx in &table.indexes {
                index.indexes.insert(idx.id, (table.id, idx));
            }
            for check in &table.check_constraints {
                index.check_constraints.insert(check.id, (table.id, check));
            }
        }
        index.relationships = diagram.relationships.iter().map(|r| (r.id, r)).collect();
        index.dependencies = diagram.dependencies.iter().map(|d| (d.id, d)).collect();
        index.custom_types = diagram.custom_types.iter().map(|t| (t.id, t)).collect();
        index
    }

    pub fn table(&self, id: Uuid) -> Option<&'a Table> {
        self.tables.get(&id).copied()
    }

    pub fn field(&self, id: Uuid) -> Option<&'a Field> {
        self.fields.get(&id).map(|(_, f)| *f)
    }

    /// Table owning the given field
    pub fn field_owner(&self, id: Uuid) -> Option<&'a Table> {
        self.fields.get(&id).and_then(|(table_id, _)| self.table(*table_id))
    }
}
