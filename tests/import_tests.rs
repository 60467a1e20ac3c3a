//! Import module tests

use schema_diagram_sdk::import::sql::auto_fix;
use schema_diagram_sdk::import::{
    classify, import_auto, ContentType, DbmlImporter, ImportConfig, ImportError, MetadataImporter, SqlImporter,
};
use schema_diagram_sdk::models::{Cardinality, DatabaseType, Diagram, Relationship};

fn config(engine: DatabaseType) -> ImportConfig {
    ImportConfig::for_database(engine)
}

/// Relationship endpoints by table and field name, for comparing imports
fn endpoints(diagram: &Diagram, rel: &Relationship) -> (String, String, String, String) {
    let index = diagram.index();
    let name = |table_id, field_id| {
        (
            index.table(table_id).unwrap().name.clone(),
            index.field(field_id).unwrap().name.clone(),
        )
    };
    let (source_table, source_field) = name(rel.source_table_id, rel.source_field_id);
    let (target_table, target_field) = name(rel.target_table_id, rel.target_field_id);
    (source_table, source_field, target_table, target_field)
}

mod classify_tests {
    use super::*;

    #[test]
    fn test_dbml_wins_over_ddl() {
        let input = "CREATE TABLE legacy (id int);\n\nTable x {\n  id int [pk]\n}\n";
        assert_eq!(classify(input), Some(ContentType::Dbml));
    }

    #[test]
    fn test_unclassifiable_input_is_ambiguous() {
        let err = import_auto("hello there", &ImportConfig::default()).unwrap_err();
        assert_eq!(err, ImportError::ClassificationAmbiguous);
    }

    #[test]
    fn test_query_payload_dispatches_to_metadata() {
        let outcome = import_auto(
            r#"{"columns": [{"table": "t", "name": "id", "type": "int"}]}"#,
            &ImportConfig::default(),
        )
        .unwrap();
        assert_eq!(outcome.diagram.tables.len(), 1);
    }
}

mod sql_import_tests {
    use super::*;

    #[test]
    fn test_parse_simple_table() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100) NOT NULL);";
        let outcome = SqlImporter::new(config(DatabaseType::PostgreSql)).parse(sql).unwrap();

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.diagram.tables.len(), 1);

        let table = &outcome.diagram.tables[0];
        assert_eq!(table.name, "users");
        assert_eq!(table.fields.len(), 2);
        assert!(table.fields[0].primary_key);
        assert!(!table.fields[1].nullable);
        assert_eq!(table.fields[1].data_type.length, Some(100));
    }

    #[test]
    fn test_auto_fix_is_idempotent() {
        let sql = "CREATE TABLE t (\n  amount DECIMAL(10,\n2),\n  code TEXT DEFAULT 'x': :text,\n);";
        let (once, repairs) = auto_fix(sql);
        assert!(!repairs.is_empty());
        let (twice, more) = auto_fix(&once);
        assert_eq!(twice, once);
        assert!(more.is_empty());
    }

    #[test]
    fn test_split_decimal() {
        let sql = "CREATE TABLE invoices (\n  id INT PRIMARY KEY,\n  total DECIMAL(15,\n2)\n);";
        let outcome = import_auto(sql, &config(DatabaseType::MySql)).unwrap();

        assert!(outcome.warnings.iter().any(|w| w.contains("Auto-fixed split DECIMAL")));
        let total = outcome.diagram.tables[0].field_by_name("total").unwrap();
        assert_eq!(total.data_type.id, "decimal");
        assert_eq!(total.data_type.precision, Some(15));
        assert_eq!(total.data_type.scale, Some(2));
    }

    #[test]
    fn test_partial_failure_keeps_good_table() {
        let sql = "CREATE TABLE good (id INT PRIMARY KEY);\nCREATE TABLE bad (id INT, CHECK (id >));";
        let outcome = import_auto(sql, &config(DatabaseType::PostgreSql)).unwrap();

        assert_eq!(outcome.diagram.tables.len(), 1);
        assert_eq!(outcome.diagram.tables[0].name, "good");
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].line, 2);
    }

    #[test]
    fn test_foreign_key_orientation_and_cardinality() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY);\n\
                   CREATE TABLE profiles (id INT PRIMARY KEY, user_id INT UNIQUE REFERENCES users(id));\n\
                   CREATE TABLE posts (id INT PRIMARY KEY, user_id INT REFERENCES users(id));";
        let outcome = import_auto(sql, &config(DatabaseType::PostgreSql)).unwrap();
        let diagram = &outcome.diagram;
        assert_eq!(diagram.relationships.len(), 2);

        let profile = diagram
            .relationships
            .iter()
            .find(|r| endpoints(diagram, r).2 == "profiles")
            .unwrap();
        assert_eq!(endpoints(diagram, profile).0, "users");
        assert_eq!(profile.target_cardinality, Cardinality::One);

        let post = diagram
            .relationships
            .iter()
            .find(|r| endpoints(diagram, r).2 == "posts")
            .unwrap();
        assert_eq!(post.source_cardinality, Cardinality::One);
        assert_eq!(post.target_cardinality, Cardinality::Many);
    }

    #[test]
    fn test_missing_reference_is_an_issue_not_a_failure() {
        let sql = "CREATE TABLE posts (id INT PRIMARY KEY, user_id INT REFERENCES users(id));";
        let outcome = import_auto(sql, &config(DatabaseType::PostgreSql)).unwrap();
        assert_eq!(outcome.diagram.tables.len(), 1);
        assert!(outcome.diagram.relationships.is_empty());
        assert!(matches!(outcome.issues[0], ImportError::ReferentialIntegrity { .. }));
    }

    #[test]
    fn test_imported_diagram_is_valid() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY, email TEXT UNIQUE);\n\
                   CREATE INDEX idx_users_email ON users (email);\n\
                   CREATE VIEW active_users AS SELECT id FROM users;";
        let outcome = import_auto(sql, &config(DatabaseType::PostgreSql)).unwrap();
        assert!(outcome.diagram.validate().is_ok());
        assert_eq!(outcome.diagram.dependencies.len(), 1);
    }
}

mod dbml_import_tests {
    use super::*;

    const TABLES: &str = "Table users {\n  id int [pk]\n}\nTable posts {\n  id int [pk]\n  user_id int\n}\n";

    #[test]
    fn test_ref_directions_are_equivalent() {
        let importer = DbmlImporter::new(ImportConfig::default());
        let forward = importer
            .parse(&format!("{}Ref: posts.user_id > users.id\n", TABLES))
            .unwrap();
        let backward = importer
            .parse(&format!("{}Ref: users.id < posts.user_id\n", TABLES))
            .unwrap();

        let a = &forward.diagram.relationships[0];
        let b = &backward.diagram.relationships[0];
        assert_eq!(endpoints(&forward.diagram, a), endpoints(&backward.diagram, b));
        assert_eq!(
            endpoints(&forward.diagram, a),
            ("users".into(), "id".into(), "posts".into(), "user_id".into())
        );
        assert_eq!(
            (a.source_cardinality, a.target_cardinality),
            (b.source_cardinality, b.target_cardinality)
        );
    }

    #[test]
    fn test_table_group_and_notes_are_ignored() {
        let dbml = format!("{}TableGroup core {{\n  users\n  posts\n}}\nNote intro {{\n  'hello'\n}}\n", TABLES);
        let outcome = import_auto(&dbml, &ImportConfig::default()).unwrap();
        assert_eq!(outcome.diagram.tables.len(), 2);
    }

    #[test]
    fn test_syntax_error_has_position() {
        let err = DbmlImporter::new(ImportConfig::default())
            .parse("Table users {\n  id int [pk\n}")
            .unwrap_err();
        assert!(matches!(err, ImportError::Syntax { line: Some(_), .. }));
    }
}

mod metadata_import_tests {
    use super::*;

    #[test]
    fn test_primary_keys_match_full_triple() {
        let json = r#"{
            "columns": [
                {"schema": "a", "table": "t", "name": "id", "type": "int"},
                {"schema": "b", "table": "t", "name": "id", "type": "int"}
            ],
            "pk_info": [{"schema": "b", "table": "t", "column": "id"}]
        }"#;
        let outcome = import_auto(json, &config(DatabaseType::PostgreSql)).unwrap();
        let a = outcome.diagram.table_by_name(Some("a"), "t").unwrap();
        let b = outcome.diagram.table_by_name(Some("b"), "t").unwrap();
        assert!(!a.fields[0].primary_key);
        assert!(b.fields[0].primary_key);
    }

    #[test]
    fn test_missing_optional_arrays() {
        let outcome = MetadataImporter::new(config(DatabaseType::MySql))
            .import_str(r#"{"fk_info": [], "pk_info": [], "columns": [], "indexes": [], "tables": [], "views": []}"#)
            .unwrap();
        assert!(outcome.diagram.tables.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_nullable_spellings() {
        let json = r#"{"columns": [
            {"table": "t", "name": "a", "type": "int", "nullable": "NO"},
            {"table": "t", "name": "b", "type": "int", "nullable": 1},
            {"table": "t", "name": "c", "type": "int", "nullable": false}
        ]}"#;
        let outcome = MetadataImporter::new(config(DatabaseType::MySql)).import_str(json).unwrap();
        let nullable: Vec<bool> = outcome.diagram.tables[0].fields.iter().map(|f| f.nullable).collect();
        assert_eq!(nullable, vec![false, true, false]);
    }
}
