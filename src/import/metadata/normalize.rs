//! Introspection payload to draft
//!
//! Entities are matched by exact `(schema, table[, column])` as reported by the
//! engine; catalogs never need the case-folding the text front-ends rely on.

use super::payload::{
    CheckConstraintInfo, ColumnInfo, CustomTypeInfo, ForeignKeyInfo, IndexInfo, MetadataPayload, PrimaryKeyInfo,
    Scalar, TableInfo, ViewInfo,
};
use crate::import::views::all_view_dependencies;
use crate::model::{CheckDraft, ColumnRef, IndexDraft, RelationshipDraft, SchemaDraft, TableDraft, TableRef};
use crate::models::{CustomType, CustomTypeField, DataType, DatabaseType, Field, SortDirection};
use std::collections::HashMap;
use tracing::debug;

/// Longest declared length kept; larger values are the engines' way of saying "unbounded"
const MAX_DECLARED_LENGTH: u64 = 65_535;

/// Draft and notes produced from one payload
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub draft: SchemaDraft,
    pub warnings: Vec<String>,
}

type TableKey = (Option<String>, String);

/// Tables in first-seen order with exact-key lookup
#[derive(Default)]
struct TableSet {
    drafts: Vec<TableDraft>,
    positions: HashMap<TableKey, usize>,
}

impl TableSet {
    fn entry(&mut self, schema: Option<String>, name: &str) -> &mut TableDraft {
        let key = (schema, name.to_string());
        let pos = match self.positions.get(&key) {
            Some(&pos) => pos,
            None => {
                let pos = self.drafts.len();
                self.drafts.push(TableDraft::new(TableRef::new(key.0.clone(), name)));
                self.positions.insert(key, pos);
                pos
            }
        };
        &mut self.drafts[pos]
    }

    fn get_mut(&mut self, schema: &Option<String>, name: &str) -> Option<&mut TableDraft> {
        let pos = *self.positions.get(&(schema.clone(), name.to_string()))?;
        self.drafts.get_mut(pos)
    }
}

struct Normalizer {
    engine: DatabaseType,
    lossy_conversion_warnings: bool,
    tables: TableSet,
    warnings: Vec<String>,
}

/// Normalize one introspection payload for `engine`
pub fn normalize(payload: MetadataPayload, engine: DatabaseType, lossy_conversion_warnings: bool) -> Normalized {
    let mut normalizer = Normalizer {
        engine,
        lossy_conversion_warnings,
        tables: TableSet::default(),
        warnings: Vec::new(),
    };

    let MetadataPayload {
        fk_info,
        pk_info,
        columns,
        indexes,
        tables,
        views,
        custom_types,
        check_constraints,
        ..
    } = payload;

    normalizer.tables_from(&tables);
    normalizer.columns_from(columns);
    normalizer.views_from(&views);
    normalizer.primary_keys_from(&pk_info);
    normalizer.checks_from(&check_constraints);

    let custom_types: Vec<CustomType> = custom_types.iter().filter_map(|c| normalizer.custom_type(c)).collect();
    let table_indexes = normalizer.indexes_from(&indexes);
    let relationships: Vec<RelationshipDraft> = fk_info.iter().map(|fk| normalizer.relationship(fk)).collect();

    let Normalizer {
        tables, mut warnings, ..
    } = normalizer;
    let mut draft = SchemaDraft {
        tables: tables.drafts,
        relationships,
        custom_types,
        ..Default::default()
    };
    for (pos, index) in table_indexes {
        draft.tables[pos].indexes.push(index);
    }
    draft.link_custom_types();
    draft.dependencies = all_view_dependencies(&draft.tables);

    debug!(
        "Normalized {} tables, {} relationships, {} custom types",
        draft.tables.len(),
        draft.relationships.len(),
        draft.custom_types.len()
    );
    warnings.dedup();
    Normalized { draft, warnings }
}

impl Normalizer {
    fn schema(&self, raw: Option<&str>) -> Option<String> {
        let schema = raw?.trim();
        if schema.is_empty() || (self.engine == DatabaseType::Sqlite && schema.eq_ignore_ascii_case("main")) {
            return None;
        }
        Some(schema.to_string())
    }

    fn note(&mut self, warning: String) {
        debug!("{}", warning);
        self.warnings.push(warning);
    }

    fn tables_from(&mut self, tables: &[TableInfo]) {
        for info in tables {
            let schema = self.schema(info.schema.as_deref());
            let table = self.tables.entry(schema, &info.table);
            table.comment = non_empty(info.comment.as_deref());
            if info.kind.as_deref().is_some_and(|k| k.to_ascii_uppercase().contains("VIEW")) {
                table.is_view = true;
            }
        }
    }

    fn columns_from(&mut self, mut columns: Vec<ColumnInfo>) {
        // Register tables in payload order before reordering columns
        for column in &columns {
            let schema = self.schema(column.schema.as_deref());
            self.tables.entry(schema, &column.table);
        }
        columns.sort_by_key(|c| c.ordinal_position.as_ref().and_then(Scalar::as_u64).unwrap_or(u64::MAX));

        for column in &columns {
            let schema = self.schema(column.schema.as_deref());
            let field = self.field(column);
            // Repeated names are kept; the builder rejects them as duplicates
            self.tables.entry(schema, &column.table).fields.push(field);
        }
    }

    fn field(&mut self, column: &ColumnInfo) -> Field {
        let (raw_type, wrapped_nullable) = unwrap_engine_type(self.engine, &column.data_type);
        let parsed = DataType::parse_detailed(&raw_type);
        if parsed.is_array && self.lossy_conversion_warnings {
            self.note(format!(
                "Column {}.{} is an array of {}; stored as its element type",
                column.table, column.name, parsed.data_type
            ));
        }

        let mut data_type = parsed.data_type;
        if data_type.length.is_none() && data_type.precision.is_none() {
            if is_sized_text(&data_type.id) {
                if let Some(length) = column
                    .character_maximum_length
                    .as_ref()
                    .and_then(Scalar::as_u64)
                    .filter(|n| (1..=MAX_DECLARED_LENGTH).contains(n))
                {
                    data_type.length = Some(length as u32);
                }
            } else if data_type.is_exact_numeric() {
                if let Some(precision) = column.precision.as_ref() {
                    data_type.precision = precision.precision.as_ref().and_then(Scalar::as_u32);
                    data_type.scale = precision.scale.as_ref().and_then(Scalar::as_u32);
                }
            }
        }

        let mut field = Field::new(column.name.clone(), data_type);
        field.nullable = wrapped_nullable || column.nullable.as_ref().and_then(|f| f.as_bool()).unwrap_or(true);
        field.collation = non_empty(column.collation.as_deref());
        field.comment = non_empty(column.comment.as_deref());

        if let Some(default) = column.default.as_ref().map(Scalar::as_text) {
            let default = self.clean_default(&default);
            if is_sequence_default(&default) {
                field.increment = true;
            } else if !default.is_empty() && !default.eq_ignore_ascii_case("null") {
                field.default = Some(default);
            }
        }
        field
    }

    fn clean_default(&self, raw: &str) -> String {
        let mut value = raw.trim();
        if self.engine == DatabaseType::SqlServer {
            while let Some(inner) = strip_outer_parens(value) {
                value = inner.trim();
            }
        }
        value.to_string()
    }

    fn views_from(&mut self, views: &[ViewInfo]) {
        for view in views {
            let schema = self.schema(view.schema.as_deref());
            let table = self.tables.entry(schema, &view.view_name);
            table.is_view = true;
            table.view_definition = non_empty(view.view_definition.as_deref());
        }
    }

    fn primary_keys_from(&mut self, keys: &[PrimaryKeyInfo]) {
        for key in keys {
            let schema = self.schema(key.schema.as_deref());
            let field = self
                .tables
                .get_mut(&schema, &key.table)
                .and_then(|t| t.fields.iter_mut().find(|f| f.name == key.column));
            match field {
                Some(field) => {
                    field.primary_key = true;
                    field.nullable = false;
                }
                None => self.note(format!(
                    "Primary key entry for unknown column {}.{} ignored",
                    TableRef::new(schema, key.table.as_str()),
                    key.column
                )),
            }
        }
    }

    fn checks_from(&mut self, checks: &[CheckConstraintInfo]) {
        for check in checks {
            let schema = self.schema(check.schema.as_deref());
            let Some(table) = self.tables.get_mut(&schema, &check.table) else {
                self.note(format!("Check constraint on unknown table {} ignored", check.table));
                continue;
            };
            let expression = strip_check_keyword(&check.expression);
            let columns = table.mentioned_fields(&expression);
            table.checks.push(CheckDraft {
                name: non_empty(check.name.as_deref()),
                expression,
                columns,
            });
        }
    }

    fn custom_type(&mut self, info: &CustomTypeInfo) -> Option<CustomType> {
        let schema = self.schema(info.schema.as_deref());
        let custom = match info.kind.to_ascii_lowercase().as_str() {
            "enum" => CustomType::new_enum(info.name.clone(), info.values.clone()),
            "composite" => CustomType::new_composite(
                info.name.clone(),
                info.fields
                    .iter()
                    .map(|f| CustomTypeField {
                        name: f.field.clone(),
                        data_type: f.data_type.clone(),
                    })
                    .collect(),
            ),
            other => {
                self.note(format!("Custom type {} has unsupported kind '{}'", info.name, other));
                return None;
            }
        };
        Some(custom.with_schema(schema))
    }

    /// Index parts grouped per `(schema, table, name)`, ordered by column position
    fn indexes_from(&mut self, parts: &[IndexInfo]) -> Vec<(usize, IndexDraft)> {
        let mut groups: Vec<(usize, &IndexInfo, Vec<&IndexInfo>)> = Vec::new();
        let mut lookup: HashMap<(usize, &str), usize> = HashMap::new();

        for part in parts {
            let schema = self.schema(part.schema.as_deref());
            let Some(&table_pos) = self.tables.positions.get(&(schema, part.table.clone())) else {
                self.note(format!("Index {} on unknown table {} ignored", part.name, part.table));
                continue;
            };
            match lookup.get(&(table_pos, part.name.as_str())) {
                Some(&group) => groups[group].2.push(part),
                None => {
                    lookup.insert((table_pos, part.name.as_str()), groups.len());
                    groups.push((table_pos, part, vec![part]));
                }
            }
        }

        let mut result = Vec::new();
        for (table_pos, first, mut members) in groups {
            if members.iter().any(|m| m.column.is_none()) {
                self.note(format!("Index {} is built on an expression; skipped", first.name));
                continue;
            }
            members.sort_by_key(|m| m.column_position.as_ref().and_then(Scalar::as_u64).unwrap_or(u64::MAX));
            let columns: Vec<(String, SortDirection)> = members
                .iter()
                .filter_map(|m| {
                    let column = m.column.clone()?;
                    Some((column, m.direction.as_deref().map(SortDirection::parse).unwrap_or_default()))
                })
                .collect();
            let unique = first.unique.as_ref().and_then(|f| f.as_bool()).unwrap_or(false);

            let table = &self.tables.drafts[table_pos];
            if unique && backs_primary_key(table, &columns) {
                continue;
            }

            result.push((
                table_pos,
                IndexDraft {
                    name: Some(first.name.clone()),
                    columns,
                    unique,
                    index_type: non_empty(first.index_type.as_deref()).map(|t| t.to_lowercase()),
                    cardinality: first.cardinality.as_ref().and_then(Scalar::as_u64),
                },
            ));
        }
        result
    }

    fn relationship(&self, fk: &ForeignKeyInfo) -> RelationshipDraft {
        let referenced = TableRef::new(self.schema(fk.reference_schema.as_deref()), fk.reference_table.as_str());
        let referencing = TableRef::new(self.schema(fk.schema.as_deref()), fk.table.as_str());
        let mut draft = RelationshipDraft::foreign_key(
            ColumnRef::new(referenced, fk.reference_column.as_str()),
            ColumnRef::new(referencing, fk.column.as_str()),
        );
        draft.name = non_empty(fk.foreign_key_name.as_deref());
        draft
    }
}

/// Peel ClickHouse `Nullable(..)` and `LowCardinality(..)` wrappers
///
/// Returns the inner type and whether a `Nullable` wrapper was present.
fn unwrap_engine_type(engine: DatabaseType, raw: &str) -> (String, bool) {
    let mut current = raw.trim();
    let mut nullable = false;
    if engine != DatabaseType::ClickHouse {
        return (current.to_string(), false);
    }
    loop {
        if let Some(inner) = unwrap_call(current, "Nullable") {
            nullable = true;
            current = inner;
        } else if let Some(inner) = unwrap_call(current, "LowCardinality") {
            current = inner;
        } else {
            return (current.to_string(), nullable);
        }
    }
}

fn unwrap_call<'a>(text: &'a str, wrapper: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(wrapper)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.trim())
}

/// `(x)` to `x` when the outer parentheses enclose the whole text
fn strip_outer_parens(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

fn strip_check_keyword(expression: &str) -> String {
    let trimmed = expression.trim();
    let body = match trimmed.get(..5) {
        Some(head) if head.eq_ignore_ascii_case("check") => trimmed[5..].trim_start(),
        _ => trimmed,
    };
    strip_outer_parens(body).unwrap_or(body).trim().to_string()
}

fn is_sequence_default(default: &str) -> bool {
    default.to_ascii_lowercase().starts_with("nextval(")
}

fn is_sized_text(id: &str) -> bool {
    id.contains("char") || id.contains("binary") || id == "bit" || id == "varbit"
}

fn backs_primary_key(table: &TableDraft, columns: &[(String, SortDirection)]) -> bool {
    let pk: Vec<&str> = table.fields.iter().filter(|f| f.primary_key).map(|f| f.name.as_str()).collect();
    !pk.is_empty() && pk.len() == columns.len() && columns.iter().all(|(c, _)| pk.contains(&c.as_str()))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> MetadataPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_clickhouse_wrappers() {
        assert_eq!(
            unwrap_engine_type(DatabaseType::ClickHouse, "LowCardinality(Nullable(String))"),
            ("String".to_string(), true)
        );
        assert_eq!(
            unwrap_engine_type(DatabaseType::PostgreSql, "Nullable(text)"),
            ("Nullable(text)".to_string(), false)
        );
    }

    #[test]
    fn test_strip_outer_parens() {
        assert_eq!(strip_outer_parens("((0))"), Some("(0)"));
        assert_eq!(strip_outer_parens("(a) + (b)"), None);
        assert_eq!(strip_check_keyword("CHECK ((price > 0))"), "(price > 0)");
    }

    #[test]
    fn test_sql_server_defaults_lose_wrapping_parens() {
        let out = normalize(
            payload(
                r#"{"columns": [
                    {"schema": "dbo", "table": "t", "name": "n", "type": "int", "default": "((0))"},
                    {"schema": "dbo", "table": "t", "name": "at", "type": "datetime", "default": "(getdate())"}
                ]}"#,
            ),
            DatabaseType::SqlServer,
            true,
        );
        let fields = &out.draft.tables[0].fields;
        assert_eq!(fields[0].default.as_deref(), Some("0"));
        assert_eq!(fields[1].default.as_deref(), Some("getdate()"));
    }

    #[test]
    fn test_repeated_column_is_not_merged() {
        let out = normalize(
            payload(
                r#"{"columns": [
                    {"schema": "public", "table": "t", "name": "id", "type": "int"},
                    {"schema": "public", "table": "t", "name": "id", "type": "text"}
                ]}"#,
            ),
            DatabaseType::PostgreSql,
            true,
        );
        let types: Vec<&str> = out.draft.tables[0].fields.iter().map(|f| f.data_type.id.as_str()).collect();
        assert_eq!(types, vec!["int", "text"]);
    }

    #[test]
    fn test_columns_follow_ordinal_position() {
        let out = normalize(
            payload(
                r#"{"columns": [
                    {"table": "t", "name": "b", "type": "text", "ordinal_position": 2},
                    {"table": "t", "name": "a", "type": "int", "ordinal_position": "1"}
                ]}"#,
            ),
            DatabaseType::MySql,
            true,
        );
        let names: Vec<_> = out.draft.tables[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_length_and_precision_from_payload() {
        let out = normalize(
            payload(
                r#"{"columns": [
                    {"table": "t", "name": "s", "type": "character varying", "character_maximum_length": 80},
                    {"table": "t", "name": "body", "type": "text", "character_maximum_length": 65535},
                    {"table": "t", "name": "amount", "type": "numeric", "precision": {"precision": 12, "scale": 2}},
                    {"table": "t", "name": "id", "type": "integer", "default": "nextval('t_id_seq'::regclass)"}
                ]}"#,
            ),
            DatabaseType::PostgreSql,
            true,
        );
        let fields = &out.draft.tables[0].fields;
        assert_eq!(fields[0].data_type.length, Some(80));
        assert_eq!(fields[1].data_type.length, None);
        assert_eq!((fields[2].data_type.precision, fields[2].data_type.scale), (Some(12), Some(2)));
        assert!(fields[3].increment);
        assert_eq!(fields[3].default, None);
    }

    #[test]
    fn test_sqlite_main_schema_is_dropped() {
        let out = normalize(
            payload(r#"{"columns": [{"schema": "main", "table": "t", "name": "id", "type": "INTEGER"}]}"#),
            DatabaseType::Sqlite,
            true,
        );
        assert_eq!(out.draft.tables[0].schema, None);
    }

    #[test]
    fn test_indexes_grouped_and_primary_key_index_dropped() {
        let out = normalize(
            payload(
                r#"{
                    "columns": [
                        {"table": "t", "name": "id", "type": "int"},
                        {"table": "t", "name": "a", "type": "int"},
                        {"table": "t", "name": "b", "type": "int"}
                    ],
                    "pk_info": [{"table": "t", "column": "id"}],
                    "indexes": [
                        {"table": "t", "name": "PRIMARY", "column": "id", "unique": 1, "column_position": 1},
                        {"table": "t", "name": "ix_ab", "column": "b", "unique": "0", "column_position": 2, "index_type": "BTREE"},
                        {"table": "t", "name": "ix_ab", "column": "a", "unique": "0", "column_position": 1, "direction": "DESC"},
                        {"table": "t", "name": "ix_expr", "column": null, "unique": false}
                    ]
                }"#,
            ),
            DatabaseType::MySql,
            true,
        );
        let indexes = &out.draft.tables[0].indexes;
        assert_eq!(indexes.len(), 1);
        assert_eq!(
            indexes[0].columns,
            vec![("a".to_string(), SortDirection::Desc), ("b".to_string(), SortDirection::Asc)]
        );
        assert_eq!(indexes[0].index_type.as_deref(), Some("btree"));
        assert!(out.warnings.iter().any(|w| w.contains("ix_expr")));
    }

    #[test]
    fn test_views_keep_definition() {
        let out = normalize(
            payload(
                r#"{
                    "columns": [{"schema": "public", "table": "users", "name": "id", "type": "int"}],
                    "views": [{"schema": "public", "view_name": "active_users",
                               "view_definition": "SELECT id FROM public.users"}]
                }"#,
            ),
            DatabaseType::PostgreSql,
            true,
        );
        let view = out.draft.tables.iter().find(|t| t.name == "active_users").unwrap();
        assert!(view.is_view);
        assert_eq!(out.draft.dependencies.len(), 1);
        assert_eq!(out.draft.dependencies[0].table.name, "users");
    }

    #[test]
    fn test_enum_custom_types_link_fields() {
        let out = normalize(
            payload(
                r#"{
                    "columns": [{"schema": "public", "table": "t", "name": "mood", "type": "mood"}],
                    "custom_types": [{"schema": "public", "type": "mood", "kind": "enum", "values": ["sad", "ok"]}]
                }"#,
            ),
            DatabaseType::PostgreSql,
            true,
        );
        assert_eq!(out.draft.custom_types[0].values, vec!["sad", "ok"]);
        assert_eq!(out.draft.tables[0].fields[0].custom_type.as_deref(), Some("mood"));
    }
}
