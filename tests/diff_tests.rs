//! Diff engine tests

use schema_diagram_sdk::diff::{diff, ChangeKind, ChangeList, ObjectKind};
use schema_diagram_sdk::import::{import_auto, ImportConfig};
use schema_diagram_sdk::models::{CheckConstraint, DataType, DatabaseType, Diagram, Field, Table};

fn imported() -> Diagram {
    let sql = "CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255) NOT NULL);\n\
               CREATE TABLE orders (id INT PRIMARY KEY, user_id INT REFERENCES users(id), total DECIMAL(10,2));\n\
               CREATE INDEX idx_orders_user ON orders (user_id);";
    import_auto(sql, &ImportConfig::for_database(DatabaseType::PostgreSql))
        .unwrap()
        .diagram
}

/// A copy of `base` with edits touching several entity kinds
fn edited(base: &Diagram) -> Diagram {
    let mut after = base.clone();
    after.tables[0].name = "accounts".to_string();
    after.tables[0].fields[1].nullable = true;
    after.tables[1].fields[2].data_type = DataType::parse("numeric(12,2)");
    after.tables[1].indexes[0].unique = true;
    after.tables[1]
        .check_constraints
        .push(CheckConstraint::new("total >= 0"));
    after.relationships[0].name = "orders_owner_fk".to_string();
    after
        .tables
        .push(Table::new("audit").with_fields(vec![Field::new("id", DataType::new("bigint"))]));
    after
}

fn shuffled(diagram: &Diagram) -> Diagram {
    let mut copy = diagram.clone();
    copy.tables.reverse();
    copy.relationships.reverse();
    copy.dependencies.reverse();
    copy.custom_types.reverse();
    for table in &mut copy.tables {
        table.indexes.reverse();
        table.check_constraints.reverse();
    }
    copy
}

mod identity_tests {
    use super::*;

    #[test]
    fn test_diff_of_empty_diagram_with_itself() {
        let empty = Diagram::new("empty", DatabaseType::Generic);
        assert!(diff(&empty, &empty).is_empty());
    }

    #[test]
    fn test_diff_of_snapshot_with_itself() {
        let diagram = imported();
        assert_eq!(diff(&diagram, &diagram), ChangeList::default());
    }
}

mod attribute_tests {
    use super::*;

    #[test]
    fn test_one_record_per_attribute() {
        let before = imported();
        let after = edited(&before);
        let changes = diff(&before, &after);

        let attributes: Vec<(ObjectKind, Option<&str>)> =
            changes.iter().map(|c| (c.object, c.attribute())).collect();
        assert!(attributes.contains(&(ObjectKind::Table, Some("name"))));
        assert!(attributes.contains(&(ObjectKind::Field, Some("nullable"))));
        assert!(attributes.contains(&(ObjectKind::Field, Some("type"))));
        assert!(attributes.contains(&(ObjectKind::Index, Some("unique"))));
        assert!(attributes.contains(&(ObjectKind::Relationship, Some("name"))));
        assert!(attributes.contains(&(ObjectKind::CheckConstraint, None)));
        assert!(attributes.contains(&(ObjectKind::Table, None)));
        assert_eq!(changes.len(), 7);
    }

    #[test]
    fn test_rename_is_not_remove_and_add() {
        let before = imported();
        let mut after = before.clone();
        after.tables[1].name = "purchases".to_string();

        let changes = diff(&before, &after);
        assert_eq!(changes.len(), 1);
        assert!(!changes.iter().any(|c| c.is_added() || c.is_removed()));
    }

    #[test]
    fn test_removed_table_carries_whole_entity() {
        let before = imported();
        let mut after = before.clone();
        let orders_id = after.tables[1].id;
        after.remove_table(orders_id).unwrap();

        let changes = diff(&before, &after);
        let removed: Vec<_> = changes.iter().filter(|c| c.is_removed()).collect();
        assert_eq!(removed.len(), 2);
        let table = removed.iter().find(|c| c.object == ObjectKind::Table).unwrap();
        match &table.kind {
            ChangeKind::Removed { value, .. } => assert_eq!(value["name"], "orders"),
            other => panic!("unexpected change {:?}", other),
        }
    }
}

mod ordering_tests {
    use super::*;

    #[test]
    fn test_shuffled_inputs_give_identical_output() {
        let before = imported();
        let after = edited(&before);
        assert_eq!(diff(&before, &after), diff(&shuffled(&before), &shuffled(&after)));
    }

    #[test]
    fn test_output_sorted_by_entity_then_attribute() {
        let before = imported();
        let after = edited(&before);
        let keys: Vec<_> = diff(&before, &after)
            .iter()
            .map(|c| (c.entity_id, c.attribute().unwrap_or("").to_string()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_symmetry() {
        let a = imported();
        let b = edited(&a);
        let forward = diff(&a, &b);
        let backward = diff(&b, &a);

        for change in &forward {
            if let ChangeKind::Changed {
                attribute,
                old_value,
                new_value,
            } = &change.kind
            {
                let mirrored = backward.iter().any(|c| {
                    c.entity_id == change.entity_id
                        && c.kind
                            == ChangeKind::Changed {
                                attribute: attribute.clone(),
                                old_value: new_value.clone(),
                                new_value: old_value.clone(),
                            }
                });
                assert!(mirrored, "no mirror for {}", change);
            }
        }
        assert_eq!(backward, forward.inverted());
    }

    #[test]
    fn test_symmetry_between_separate_diagrams() {
        let mut a = Diagram::new("before", DatabaseType::PostgreSql);
        a.tables.push(Table::new("users"));
        let b = Diagram::new("after", DatabaseType::MySql);

        let forward = diff(&a, &b);
        let backward = diff(&b, &a);
        assert_eq!(forward.iter().filter(|c| c.object == ObjectKind::Diagram).count(), 3);
        assert_eq!(backward, forward.inverted());

        let rename = forward.iter().find(|c| c.attribute() == Some("name")).unwrap();
        let mirror = backward.iter().find(|c| c.attribute() == Some("name")).unwrap();
        assert_eq!(rename.entity_id, mirror.entity_id);
    }
}
