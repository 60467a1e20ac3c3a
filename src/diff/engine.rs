//! Snapshot comparison
//!
//! Entities are matched by id through each snapshot's [`DiagramIndex`]. Nested
//! entities of an added or removed table are covered by that table's record and do
//! not get records of their own.

use super::change::{Change, ChangeKind, ChangeList, ObjectKind};
use crate::models::{CheckConstraint, CustomType, Dependency, Diagram, DiagramIndex, Field, Index, Relationship, Table};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Typed list of differences going from `before` to `after`
///
/// Diagram-level records are keyed on [`Uuid::nil`] so they mirror exactly when the
/// arguments are swapped; a change of diagram id is itself an `id` record.
pub fn diff(before: &Diagram, after: &Diagram) -> ChangeList {
    let old = before.index();
    let new = after.index();
    let mut collector = Collector::default();

    collector.attribute(ObjectKind::Diagram, Uuid::nil(), "id", &before.id, &after.id);
    collector.attribute(ObjectKind::Diagram, Uuid::nil(), "name", &before.name, &after.name);
    collector.attribute(
        ObjectKind::Diagram,
        Uuid::nil(),
        "databaseType",
        &before.database_type,
        &after.database_type,
    );

    collector.top_level(ObjectKind::Table, &old.tables, &new.tables, compare_tables);
    collector.nested(ObjectKind::Field, &old, &new, &old.fields, &new.fields, compare_fields);
    collector.nested(ObjectKind::Index, &old, &new, &old.indexes, &new.indexes, compare_indexes);
    collector.nested(
        ObjectKind::CheckConstraint,
        &old,
        &new,
        &old.check_constraints,
        &new.check_constraints,
        compare_checks,
    );
    collector.top_level(
        ObjectKind::Relationship,
        &old.relationships,
        &new.relationships,
        compare_relationships,
    );
    collector.top_level(
        ObjectKind::Dependency,
        &old.dependencies,
        &new.dependencies,
        compare_dependencies,
    );
    collector.top_level(
        ObjectKind::CustomType,
        &old.custom_types,
        &new.custom_types,
        compare_custom_types,
    );

    debug!("Diff produced {} change records", collector.changes.len());
    ChangeList::new(collector.changes)
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[derive(Default)]
struct Collector {
    changes: Vec<Change>,
}

impl Collector {
    fn attribute<T: Serialize + PartialEq + ?Sized>(
        &mut self,
        object: ObjectKind,
        id: Uuid,
        attribute: &str,
        old: &T,
        new: &T,
    ) {
        if old != new {
            self.changes.push(Change {
                object,
                entity_id: id,
                kind: ChangeKind::Changed {
                    attribute: attribute.to_string(),
                    old_value: to_value(old),
                    new_value: to_value(new),
                },
            });
        }
    }

    fn added<T: Serialize>(&mut self, object: ObjectKind, id: Uuid, parent_id: Option<Uuid>, value: &T) {
        self.changes.push(Change {
            object,
            entity_id: id,
            kind: ChangeKind::Added {
                parent_id,
                value: to_value(value),
            },
        });
    }

    fn removed<T: Serialize>(&mut self, object: ObjectKind, id: Uuid, parent_id: Option<Uuid>, value: &T) {
        self.changes.push(Change {
            object,
            entity_id: id,
            kind: ChangeKind::Removed {
                parent_id,
                value: to_value(value),
            },
        });
    }

    fn top_level<T: Serialize>(
        &mut self,
        object: ObjectKind,
        old: &HashMap<Uuid, &T>,
        new: &HashMap<Uuid, &T>,
        compare: fn(&mut Collector, Uuid, &T, &T),
    ) {
        for (id, after) in new {
            match old.get(id) {
                Some(before) => compare(self, *id, before, after),
                None => self.added(object, *id, None, *after),
            }
        }
        for (id, before) in old {
            if !new.contains_key(id) {
                self.removed(object, *id, None, *before);
            }
        }
    }

    /// Entities owned by a table; moving one to another table is a `tableId` change
    fn nested<T: Serialize>(
        &mut self,
        object: ObjectKind,
        old_index: &DiagramIndex<'_>,
        new_index: &DiagramIndex<'_>,
        old: &HashMap<Uuid, (Uuid, &T)>,
        new: &HashMap<Uuid, (Uuid, &T)>,
        compare: fn(&mut Collector, Uuid, &T, &T),
    ) {
        for (id, (table_id, after)) in new {
            match old.get(id) {
                Some((old_table_id, before)) => {
                    self.attribute(object, *id, "tableId", old_table_id, table_id);
                    compare(self, *id, before, after);
                }
                None if old_index.tables.contains_key(table_id) => self.added(object, *id, Some(*table_id), *after),
                None => {}
            }
        }
        for (id, (table_id, before)) in old {
            if !new.contains_key(id) && new_index.tables.contains_key(table_id) {
                self.removed(object, *id, Some(*table_id), *before);
            }
        }
    }
}

fn compare_tables(c: &mut Collector, id: Uuid, old: &Table, new: &Table) {
    let kind = ObjectKind::Table;
    c.attribute(kind, id, "name", &old.name, &new.name);
    c.attribute(kind, id, "schema", &old.schema, &new.schema);
    c.attribute(kind, id, "color", &old.color, &new.color);
    c.attribute(kind, id, "comment", &old.comment, &new.comment);
    c.attribute(kind, id, "isView", &old.is_view, &new.is_view);
    c.attribute(kind, id, "viewDefinition", &old.view_definition, &new.view_definition);
}

fn compare_fields(c: &mut Collector, id: Uuid, old: &Field, new: &Field) {
    let kind = ObjectKind::Field;
    c.attribute(kind, id, "name", &old.name, &new.name);
    c.attribute(kind, id, "type", &old.data_type, &new.data_type);
    c.attribute(kind, id, "nullable", &old.nullable, &new.nullable);
    c.attribute(kind, id, "unique", &old.unique, &new.unique);
    c.attribute(kind, id, "primaryKey", &old.primary_key, &new.primary_key);
    c.attribute(kind, id, "increment", &old.increment, &new.increment);
    c.attribute(kind, id, "default", &old.default, &new.default);
    c.attribute(kind, id, "collation", &old.collation, &new.collation);
    c.attribute(kind, id, "comment", &old.comment, &new.comment);
    c.attribute(kind, id, "customType", &old.custom_type, &new.custom_type);
}

fn compare_indexes(c: &mut Collector, id: Uuid, old: &Index, new: &Index) {
    let kind = ObjectKind::Index;
    c.attribute(kind, id, "name", &old.name, &new.name);
    c.attribute(kind, id, "unique", &old.unique, &new.unique);
    c.attribute(kind, id, "columns", &old.columns, &new.columns);
    c.attribute(kind, id, "indexType", &old.index_type, &new.index_type);
}

fn compare_checks(c: &mut Collector, id: Uuid, old: &CheckConstraint, new: &CheckConstraint) {
    let kind = ObjectKind::CheckConstraint;
    c.attribute(kind, id, "name", &old.name, &new.name);
    c.attribute(kind, id, "expression", &old.expression, &new.expression);
    c.attribute(kind, id, "fieldIds", &old.field_ids, &new.field_ids);
}

fn compare_relationships(c: &mut Collector, id: Uuid, old: &Relationship, new: &Relationship) {
    let kind = ObjectKind::Relationship;
    c.attribute(kind, id, "name", &old.name, &new.name);
    c.attribute(kind, id, "sourceTableId", &old.source_table_id, &new.source_table_id);
    c.attribute(kind, id, "sourceFieldId", &old.source_field_id, &new.source_field_id);
    c.attribute(kind, id, "targetTableId", &old.target_table_id, &new.target_table_id);
    c.attribute(kind, id, "targetFieldId", &old.target_field_id, &new.target_field_id);
    c.attribute(kind, id, "sourceCardinality", &old.source_cardinality, &new.source_cardinality);
    c.attribute(kind, id, "targetCardinality", &old.target_cardinality, &new.target_cardinality);
}

fn compare_dependencies(c: &mut Collector, id: Uuid, old: &Dependency, new: &Dependency) {
    let kind = ObjectKind::Dependency;
    c.attribute(kind, id, "tableId", &old.table_id, &new.table_id);
    c.attribute(kind, id, "dependentTableId", &old.dependent_table_id, &new.dependent_table_id);
}

fn compare_custom_types(c: &mut Collector, id: Uuid, old: &CustomType, new: &CustomType) {
    let kind = ObjectKind::CustomType;
    c.attribute(kind, id, "name", &old.name, &new.name);
    c.attribute(kind, id, "schema", &old.schema, &new.schema);
    c.attribute(kind, id, "kind", &old.kind, &new.kind);
    c.attribute(kind, id, "values", &old.values, &new.values);
    c.attribute(kind, id, "fields", &old.fields, &new.fields);
}
