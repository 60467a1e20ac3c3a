//! Grammar-driven DDL parsing
//!
//! The script is split into statements first; each `CREATE TABLE` / `ALTER TABLE`
//! goes through `sqlparser` with the engine's dialect, other DDL goes through the
//! pattern readers in [`extract`](super::extract). A statement that fails is recorded
//! and skipped, so one bad statement never loses the rest of the script.

use super::extract::{self, CommentOn, CommentTarget, Extracted, StatementKind};
use super::lexical::{key_column, split_statements, split_top_level, table_ref, RawStatement};
use super::{ParseOutcome, ParseStrategy};
use crate::import::views::all_view_dependencies;
use crate::import::StatementError;
use crate::model::{CheckDraft, ColumnRef, IndexDraft, RelationshipDraft, SchemaDraft, TableDraft, TableRef};
use crate::models::{DataType, DatabaseType, Field};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::ast::{AlterTableOperation, ColumnDef, ColumnOption, CreateTable, Statement, TableConstraint};
use sqlparser::dialect::{
    ClickHouseDialect, Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser;
use tracing::{debug, warn};

/// `sqlparser` dialect for an engine
pub fn dialect_for(database_type: DatabaseType) -> Box<dyn Dialect + Send + Sync> {
    match database_type {
        DatabaseType::PostgreSql | DatabaseType::CockroachDb => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySql | DatabaseType::MariaDb => Box::new(MySqlDialect {}),
        DatabaseType::Sqlite => Box::new(SQLiteDialect {}),
        DatabaseType::SqlServer => Box::new(MsSqlDialect {}),
        DatabaseType::ClickHouse => Box::new(ClickHouseDialect {}),
        DatabaseType::Generic | DatabaseType::Oracle => Box::new(GenericDialect {}),
    }
}

static ERROR_POSITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*at Line: (\d+), Column: (\d+)").expect("valid position regex"));

static CONSTRAINT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^CONSTRAINT\s+(\S+)").expect("valid constraint name regex"));

static CHECK_CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?:CONSTRAINT\s+(\S+)\s+)?CHECK\s*\((.*)\)\s*(?:NOT\s+ENFORCED|ENFORCED)?\s*$")
        .expect("valid check regex")
});

static KEY_CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^(?:CONSTRAINT\s+(\S+)\s+)?(UNIQUE\s*)?(?:(?:FULLTEXT|SPATIAL)\s+)?(?:(?:INDEX|KEY)\s+)?(?:([^\s(]+)\s*)?(?:USING\s+(\w+)\s*)?\((.*)\)",
    )
    .expect("valid key regex")
});

static KEY_CONSTRAINT_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:CONSTRAINT\s+\S+\s+)?(?:UNIQUE|INDEX|KEY|FULLTEXT|SPATIAL)\b").expect("valid key start regex")
});

static REFERENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bREFERENCES\s+([^\s(]+)\s*(?:\(([^)]*)\))?").expect("valid references regex")
});

static INCREMENT_OPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:AUTO_INCREMENT|AUTOINCREMENT|IDENTITY|GENERATED\s+(?:ALWAYS|BY\s+DEFAULT)\s+AS\s+IDENTITY)\b")
        .expect("valid increment regex")
});

static TABLE_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\)[^()]*?\bCOMMENT\s*=?\s*'((?:[^']|'')*)'[^()']*$").expect("valid table comment regex")
});

const SERIAL_TYPES: &[&str] = &["serial", "bigserial", "smallserial", "serial4", "serial8", "serial2"];

/// Grammar-based strategy; the primary way DDL is read
pub struct GrammarStrategy {
    database_type: DatabaseType,
    lossy_conversion_warnings: bool,
}

impl GrammarStrategy {
    pub fn new(database_type: DatabaseType, lossy_conversion_warnings: bool) -> Self {
        Self {
            database_type,
            lossy_conversion_warnings,
        }
    }
}

impl ParseStrategy for GrammarStrategy {
    fn name(&self) -> &'static str {
        "grammar"
    }

    fn parse(&self, sql: &str) -> ParseOutcome {
        let dialect = self.dialect();
        let mut script = Script::default();

        for statement in split_statements(sql) {
            match extract::statement_kind(&statement.text) {
                StatementKind::CreateTable | StatementKind::AlterTable => {
                    match Parser::parse_sql(dialect.as_ref(), &statement.text) {
                        Ok(parsed) => {
                            for stmt in parsed {
                                self.apply(&mut script, &stmt, &statement);
                            }
                        }
                        Err(e) => script.fail(&statement, &e.to_string()),
                    }
                }
                StatementKind::CreateIndex => match extract::create_index(&statement.text) {
                    Ok(Extracted::Found(index)) => script.draft.indexes.push(index),
                    Ok(Extracted::Skipped(reason)) => script.note(reason),
                    Err(message) => script.fail(&statement, &message),
                },
                StatementKind::CreateView => match extract::create_view(&statement.text) {
                    Ok(view) => script.draft.tables.push(view),
                    Err(message) => script.fail(&statement, &message),
                },
                StatementKind::CreateType => match extract::create_type(&statement.text) {
                    Ok(Extracted::Found(custom_type)) => script.draft.custom_types.push(custom_type),
                    Ok(Extracted::Skipped(reason)) => script.note(reason),
                    Err(message) => script.fail(&statement, &message),
                },
                StatementKind::CommentOn => match extract::comment_on(&statement.text) {
                    Ok(Extracted::Found(comment)) => script.comments.push(comment),
                    Ok(Extracted::Skipped(reason)) => script.note(reason),
                    Err(message) => script.fail(&statement, &message),
                },
                StatementKind::Other => {
                    debug!("Ignoring statement at line {}", statement.line);
                }
            }
        }

        script.finish()
    }
}

impl GrammarStrategy {
    fn dialect(&self) -> Box<dyn Dialect + Send + Sync> {
        dialect_for(self.database_type)
    }

    fn apply(&self, script: &mut Script, stmt: &Statement, raw: &RawStatement) {
        match stmt {
            Statement::CreateTable(create) => self.create_table(script, create, raw),
            Statement::AlterTable(alter) => {
                let table = table_ref(&alter.name.to_string());
                for operation in &alter.operations {
                    self.alter_table(script, &table, operation);
                }
            }
            other => debug!("Ignoring parsed statement kind at line {}: {}", raw.line, other),
        }
    }

    fn create_table(&self, script: &mut Script, create: &CreateTable, raw: &RawStatement) {
        let mut table = TableDraft::new(table_ref(&create.name.to_string()));
        for column in &create.columns {
            let field = self.column_field(column, &mut table, script);
            table.fields.push(field);
        }
        for constraint in &create.constraints {
            let name = table.table_ref();
            table_constraint(
                constraint,
                &name,
                Some(&mut table),
                &mut script.draft.relationships,
                &mut script.warnings,
            );
        }
        table.comment = TABLE_COMMENT
            .captures(&raw.text)
            .map(|caps| super::lexical::unescape_literal(&caps[1]));
        script.draft.tables.push(table);
    }

    fn alter_table(&self, script: &mut Script, table: &TableRef, operation: &AlterTableOperation) {
        match operation {
            AlterTableOperation::AddConstraint { constraint, .. } => {
                let SchemaDraft {
                    tables, relationships, ..
                } = &mut script.draft;
                let target = tables.iter_mut().find(|t| t.is(table));
                table_constraint(constraint, table, target, relationships, &mut script.warnings);
            }
            AlterTableOperation::AddColumn { column_def, .. } => {
                let Some(pos) = script.draft.tables.iter().position(|t| t.is(table)) else {
                    script.note(format!(
                        "ALTER TABLE {} adds column '{}' to a table not defined in this script, ignored",
                        table, column_def.name.value
                    ));
                    return;
                };
                let mut draft = std::mem::take(&mut script.draft.tables[pos]);
                let field = self.column_field(column_def, &mut draft, script);
                draft.fields.push(field);
                script.draft.tables[pos] = draft;
            }
            other => debug!("Ignoring ALTER TABLE {} operation: {}", table, other),
        }
    }

    /// Field for a column definition; inline REFERENCES and CHECK clauses become
    /// relationship and check drafts
    fn column_field(&self, column: &ColumnDef, table: &mut TableDraft, script: &mut Script) -> Field {
        let raw_type = column.data_type.to_string();
        let parsed = DataType::parse_detailed(&raw_type);
        if parsed.is_array && self.lossy_conversion_warnings {
            script.note(format!(
                "Column {}.{}: array type {} stored as its element type {}",
                table.name, column.name.value, raw_type, parsed.data_type
            ));
        }

        let mut field = Field::new(column.name.value.clone(), parsed.data_type);
        field.increment = SERIAL_TYPES.contains(&field.data_type.id.as_str());

        for option in &column.options {
            match &option.option {
                ColumnOption::NotNull => field.nullable = false,
                ColumnOption::Null => field.nullable = true,
                ColumnOption::PrimaryKey(_) => {
                    field.primary_key = true;
                    field.nullable = false;
                }
                ColumnOption::Unique(_) => field.unique = true,
                ColumnOption::Default(expr) => field.default = Some(expr.to_string()),
                ColumnOption::Comment(comment) => field.comment = Some(comment.clone()),
                other => {
                    let text = other.to_string();
                    let upper = text.to_ascii_uppercase();
                    if upper.contains("REFERENCES ") {
                        if let Some(caps) = REFERENCES.captures(&text) {
                            let referenced = table_ref(&caps[1]);
                            let target = ColumnRef::new(table.table_ref(), field.name.clone());
                            let source = match caps.get(2).and_then(|m| key_column(m.as_str())) {
                                Some((column, _)) => ColumnRef::new(referenced, column),
                                None => ColumnRef::primary_key_of(referenced),
                            };
                            script.draft.relationships.push(RelationshipDraft::foreign_key(source, target));
                        }
                    } else if let Some(caps) = CHECK_CONSTRAINT.captures(&text) {
                        table.checks.push(CheckDraft {
                            name: caps.get(1).map(|m| super::lexical::unquote(m.as_str())),
                            expression: caps[2].trim().to_string(),
                            columns: vec![field.name.clone()],
                        });
                    } else if upper.starts_with("COLLATE") {
                        field.collation = text.split_whitespace().nth(1).map(super::lexical::unquote);
                    } else if INCREMENT_OPTION.is_match(&text) {
                        field.increment = true;
                    } else {
                        debug!("Ignoring column option on {}.{}: {}", table.name, field.name, text);
                    }
                }
            }
        }
        field
    }
}

/// Apply a table-level constraint. `table` is `None` when an `ALTER TABLE` targets a
/// table this script never created; foreign keys are still recorded then.
fn table_constraint(
    constraint: &TableConstraint,
    table_name: &TableRef,
    table: Option<&mut TableDraft>,
    relationships: &mut Vec<RelationshipDraft>,
    warnings: &mut Vec<String>,
) {
    let text = constraint.to_string();

    if let TableConstraint::ForeignKey(fk) = constraint {
        let name = CONSTRAINT_NAME
            .captures(&text)
            .map(|caps| super::lexical::unquote(&caps[1]));
        let referencing = table_name.clone();
        let referenced = table_ref(&fk.foreign_table.to_string());

        if fk.referred_columns.is_empty() {
            for column in &fk.columns {
                let mut draft = RelationshipDraft::foreign_key(
                    ColumnRef::primary_key_of(referenced.clone()),
                    ColumnRef::new(referencing.clone(), column.value.clone()),
                );
                draft.name = name.clone();
                relationships.push(draft);
            }
        } else {
            for (from, to) in fk.columns.iter().zip(fk.referred_columns.iter()) {
                let mut draft = RelationshipDraft::foreign_key(
                    ColumnRef::new(referenced.clone(), to.value.clone()),
                    ColumnRef::new(referencing.clone(), from.value.clone()),
                );
                draft.name = name.clone();
                relationships.push(draft);
            }
        }
        return;
    }

    let Some(table) = table else {
        warnings.push(format!(
            "Constraint '{}' on {} targets a table not defined in this script, ignored",
            text, table_name
        ));
        return;
    };

    if let TableConstraint::PrimaryKey(pk) = constraint {
        for column in &pk.columns {
            let Some((name, _)) = key_column(&column.column.to_string()) else {
                continue;
            };
            match table.field_mut(&name) {
                Some(field) => {
                    field.primary_key = true;
                    field.nullable = false;
                }
                None => warnings.push(format!(
                    "Primary key of {} names unknown column '{}', ignored",
                    table.table_ref(),
                    name
                )),
            }
        }
        return;
    }

    if let Some(caps) = CHECK_CONSTRAINT.captures(&text) {
        let expression = caps[2].trim().to_string();
        let columns = table.mentioned_fields(&expression);
        table.checks.push(CheckDraft {
            name: caps.get(1).map(|m| super::lexical::unquote(m.as_str())),
            expression,
            columns,
        });
        return;
    }

    if KEY_CONSTRAINT_START.is_match(&text) {
        if let Some(caps) = KEY_CONSTRAINT.captures(&text) {
            let columns: Vec<_> = split_top_level(&caps[5], ',')
                .iter()
                .filter_map(|element| key_column(element))
                .collect();
            let unique = caps.get(2).is_some();
            if unique && columns.len() == 1 && caps.get(1).is_none() && caps.get(3).is_none() {
                if let Some(field) = table.field_mut(&columns[0].0) {
                    field.unique = true;
                    return;
                }
            }
            let name = caps
                .get(1)
                .or_else(|| caps.get(3))
                .map(|m| super::lexical::unquote(m.as_str()));
            table.indexes.push(IndexDraft {
                name,
                columns,
                unique,
                index_type: caps.get(4).map(|m| m.as_str().to_lowercase()),
                cardinality: None,
            });
            return;
        }
    }

    debug!("Ignoring table constraint on {}: {}", table.name, text);
}

/// Accumulated state while walking one script
#[derive(Default)]
struct Script {
    draft: SchemaDraft,
    comments: Vec<CommentOn>,
    warnings: Vec<String>,
    errors: Vec<StatementError>,
}

impl Script {
    fn note(&mut self, warning: String) {
        debug!("{}", warning);
        self.warnings.push(warning);
    }

    fn fail(&mut self, statement: &RawStatement, error: &str) {
        let message = error.trim_start_matches("sql parser error: ");
        let (line, column, message) = match ERROR_POSITION.captures(message) {
            Some(caps) => {
                let relative: usize = caps[1].parse().unwrap_or(1);
                let column = caps[2].parse().ok();
                let stripped = ERROR_POSITION.replace(message, "").to_string();
                (statement.line + relative.saturating_sub(1), column, stripped)
            }
            None => (statement.line, None, message.to_string()),
        };

        warn!("Skipping statement at line {}: {}", line, message);
        self.warnings
            .push(format!("Skipped statement at line {}: {}", line, message));
        self.errors.push(StatementError { line, column, message });
    }

    fn finish(mut self) -> ParseOutcome {
        for comment in std::mem::take(&mut self.comments) {
            self.apply_comment(comment);
        }
        self.draft.link_custom_types();
        let dependencies = all_view_dependencies(&self.draft.tables);
        self.draft.dependencies.extend(dependencies);

        ParseOutcome {
            draft: self.draft,
            warnings: self.warnings,
            errors: self.errors,
        }
    }

    fn apply_comment(&mut self, comment: CommentOn) {
        match comment.target {
            CommentTarget::Table(table) => match self.draft.table_mut(&table) {
                Some(draft) => draft.comment = comment.text,
                None => self.note(format!("COMMENT ON unknown table {}, ignored", table)),
            },
            CommentTarget::Column(table, column) => {
                let field = self.draft.table_mut(&table).and_then(|t| t.field_mut(&column));
                match field {
                    Some(field) => field.comment = comment.text,
                    None => self.note(format!("COMMENT ON unknown column {}.{}, ignored", table, column)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cardinality, SortDirection};

    fn parse(engine: DatabaseType, sql: &str) -> ParseOutcome {
        GrammarStrategy::new(engine, true).parse(sql)
    }

    #[test]
    fn test_create_table_columns_and_keys() {
        let out = parse(
            DatabaseType::PostgreSql,
            r#"
            CREATE TABLE public.users (
                id SERIAL PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                balance NUMERIC(12, 2) DEFAULT 0,
                bio TEXT COLLATE "C"
            );
            "#,
        );
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let table = &out.draft.tables[0];
        assert_eq!(table.schema.as_deref(), Some("public"));
        assert_eq!(table.name, "users");

        let id = &table.fields[0];
        assert!(id.primary_key && id.increment && !id.nullable);

        let email = &table.fields[1];
        assert!(email.unique && !email.nullable);
        assert_eq!(email.data_type.length, Some(255));

        let balance = &table.fields[2];
        assert_eq!(balance.data_type.id, "numeric");
        assert_eq!((balance.data_type.precision, balance.data_type.scale), (Some(12), Some(2)));
        assert_eq!(balance.default.as_deref(), Some("0"));
        assert_eq!(table.fields[3].data_type.id, "text");
    }

    #[test]
    fn test_foreign_keys_inline_and_table_level() {
        let out = parse(
            DatabaseType::PostgreSql,
            r#"
            CREATE TABLE users (id INT PRIMARY KEY);
            CREATE TABLE posts (
                id INT PRIMARY KEY,
                author_id INT REFERENCES users(id),
                editor_id INT,
                CONSTRAINT fk_editor FOREIGN KEY (editor_id) REFERENCES users (id)
            );
            "#,
        );
        assert_eq!(out.draft.relationships.len(), 2);
        let inline = &out.draft.relationships[0];
        assert_eq!(inline.source, ColumnRef::new(TableRef::new(None, "users"), "id"));
        assert_eq!(inline.target, ColumnRef::new(TableRef::new(None, "posts"), "author_id"));

        let named = &out.draft.relationships[1];
        assert_eq!(named.name.as_deref(), Some("fk_editor"));
        assert_eq!(named.target.column.as_deref(), Some("editor_id"));
    }

    #[test]
    fn test_alter_table_add_foreign_key_and_column() {
        let out = parse(
            DatabaseType::MySql,
            "CREATE TABLE a (id INT PRIMARY KEY);\nCREATE TABLE b (id INT PRIMARY KEY);\n\
             ALTER TABLE b ADD COLUMN a_id INT NOT NULL;\n\
             ALTER TABLE b ADD CONSTRAINT fk_b_a FOREIGN KEY (a_id) REFERENCES a (id);",
        );
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let b = &out.draft.tables[1];
        assert_eq!(b.fields.len(), 2);
        assert!(!b.fields[1].nullable);
        assert_eq!(out.draft.relationships.len(), 1);
        assert_eq!(out.draft.relationships[0].cardinality, None::<(Cardinality, Cardinality)>);
    }

    #[test]
    fn test_composite_primary_key_and_unique_constraint() {
        let out = parse(
            DatabaseType::Generic,
            "CREATE TABLE memberships (user_id INT, group_id INT, code INT, \
             PRIMARY KEY (user_id, group_id), UNIQUE (code), CONSTRAINT uq_pair UNIQUE (group_id, code));",
        );
        let table = &out.draft.tables[0];
        assert!(table.fields[0].primary_key && table.fields[1].primary_key);
        assert!(table.fields[2].unique);
        assert_eq!(table.indexes.len(), 1);
        assert_eq!(table.indexes[0].name.as_deref(), Some("uq_pair"));
        assert!(table.indexes[0].unique);
        assert_eq!(
            table.indexes[0].columns,
            vec![("group_id".to_string(), SortDirection::Asc), ("code".to_string(), SortDirection::Asc)]
        );
    }

    #[test]
    fn test_check_constraints() {
        let out = parse(
            DatabaseType::PostgreSql,
            "CREATE TABLE items (qty INT CHECK (qty > 0), price INT, CONSTRAINT price_ok CHECK (price >= qty));",
        );
        let table = &out.draft.tables[0];
        assert_eq!(table.checks.len(), 2);
        assert_eq!(table.checks[0].columns, vec!["qty"]);
        assert_eq!(table.checks[1].name.as_deref(), Some("price_ok"));
        assert_eq!(table.checks[1].columns, vec!["price", "qty"]);
    }

    #[test]
    fn test_failed_statement_is_skipped_with_position() {
        let out = parse(
            DatabaseType::PostgreSql,
            "CREATE TABLE ok (id INT);\n\nCREATE TABLE bad (\n  id INT,\n  CHECK (id >)\n);",
        );
        assert_eq!(out.draft.tables.len(), 1);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.errors[0].line >= 3);
        assert!(out.warnings[0].starts_with("Skipped statement at line"));
    }

    #[test]
    fn test_index_view_type_and_comments() {
        let out = parse(
            DatabaseType::PostgreSql,
            r#"
            CREATE TYPE mood AS ENUM ('sad', 'happy');
            CREATE TABLE people (id INT PRIMARY KEY, name TEXT, feeling mood);
            CREATE INDEX idx_people_name ON people (name);
            CREATE VIEW happy_people AS SELECT * FROM people WHERE feeling = 'happy';
            COMMENT ON TABLE people IS 'Everyone';
            COMMENT ON COLUMN people.name IS 'Full name';
            INSERT INTO people VALUES (1, 'a', 'sad');
            "#,
        );
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.draft.custom_types.len(), 1);
        assert_eq!(out.draft.indexes.len(), 1);
        assert_eq!(out.draft.tables.len(), 2);

        let people = &out.draft.tables[0];
        assert_eq!(people.comment.as_deref(), Some("Everyone"));
        assert_eq!(people.fields[1].comment.as_deref(), Some("Full name"));
        assert_eq!(people.fields[2].custom_type.as_deref(), Some("mood"));

        assert!(out.draft.tables[1].is_view);
        assert_eq!(out.draft.dependencies.len(), 1);
        assert_eq!(out.draft.dependencies[0].table.name, "people");
    }

    #[test]
    fn test_mysql_auto_increment_and_table_comment() {
        let out = parse(
            DatabaseType::MySql,
            "CREATE TABLE `orders` (`id` INT NOT NULL AUTO_INCREMENT, PRIMARY KEY (`id`)) ENGINE=InnoDB COMMENT='Customer orders';",
        );
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let orders = &out.draft.tables[0];
        assert_eq!(orders.name, "orders");
        assert!(orders.fields[0].increment);
        assert!(orders.fields[0].primary_key);
        assert_eq!(orders.comment.as_deref(), Some("Customer orders"));
    }

    #[test]
    fn test_array_column_warns() {
        let out = parse(DatabaseType::PostgreSql, "CREATE TABLE t (tags TEXT[]);");
        assert_eq!(out.draft.tables[0].fields[0].data_type.id, "text");
        assert_eq!(out.warnings.len(), 1);
    }
}
