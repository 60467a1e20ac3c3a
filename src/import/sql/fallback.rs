//! Pattern-matching recovery of table skeletons
//!
//! Used only when the grammar pass recovered nothing. It finds `CREATE TABLE name (...)`
//! blocks and reads each top-level element as `name type [modifiers]`, keeping
//! primary keys, nullability, uniqueness and defaults. Everything else is dropped.

use super::lexical::{balanced_group, key_column, split_statements, split_top_level, table_ref, unquote};
use super::{ParseOutcome, ParseStrategy};
use crate::model::TableDraft;
use crate::models::{DataType, Field};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static TABLE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)\bCREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([^\s(]+)\s*\(",
    )
    .expect("valid table header regex")
});

static COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^("[^"]+"|`[^`]+`|\[[^\]]+\]|[\w$]+)\s+((?:double\s+precision|character\s+varying|national\s+character\s+varying|(?:timestamp|time)(?:\s*\(\s*\d+\s*\))?\s+with(?:out)?\s+time\s+zone|[\w.]+)(?:\s*\([^()]*\))?(?:\s*\[\s*\d*\s*\])*(?:\s+unsigned)?)(.*)$"#,
    )
    .expect("valid column regex")
});

static TABLE_LEVEL_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:CONSTRAINT|PRIMARY\s+KEY|FOREIGN\s+KEY|UNIQUE|INDEX|KEY|CHECK|FULLTEXT|SPATIAL|EXCLUDE)\b")
        .expect("valid element regex")
});

static PRIMARY_KEY_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bPRIMARY\s+KEY\s*\(([^)]*)\)").expect("valid primary key regex"));

static NOT_NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").expect("valid not null regex"));
static PRIMARY_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").expect("valid primary key regex"));
static UNIQUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bUNIQUE\b").expect("valid unique regex"));
static INCREMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:AUTO_INCREMENT|AUTOINCREMENT|IDENTITY)\b").expect("valid increment regex"));
static DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bDEFAULT\s+('(?:[^']|'')*'|\([^()]*\)|[^\s,]+)").expect("valid default regex"));

/// Pattern-based strategy; recovers skeletons from text the grammar rejects
pub struct RegexFallbackStrategy;

impl ParseStrategy for RegexFallbackStrategy {
    fn name(&self) -> &'static str {
        "regex fallback"
    }

    fn parse(&self, sql: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();

        for statement in split_statements(sql) {
            for caps in TABLE_HEADER.captures_iter(&statement.text) {
                let Some(whole) = caps.get(0) else { continue };
                let open = whole.end() - 1;
                // An unclosed body still yields whatever columns precede the damage
                let body = match balanced_group(&statement.text, open) {
                    Some((inner, _)) => inner,
                    None => &statement.text[open + 1..],
                };

                let table = recover_table(table_ref(&caps[1]), body);
                if table.fields.is_empty() {
                    debug!("Fallback found no columns for {} at line {}", table.name, statement.line);
                    continue;
                }
                outcome.warnings.push(format!(
                    "Recovered table {} with {} columns by pattern matching; constraints, relationships and complex defaults were not read",
                    table.table_ref(),
                    table.fields.len()
                ));
                outcome.draft.tables.push(table);
            }
        }
        outcome
    }
}

fn recover_table(name: crate::model::TableRef, body: &str) -> TableDraft {
    let mut table = TableDraft::new(name);
    let mut key_columns = Vec::new();

    for element in split_top_level(body, ',') {
        if TABLE_LEVEL_ELEMENT.is_match(&element) {
            if let Some(caps) = PRIMARY_KEY_LIST.captures(&element) {
                key_columns.extend(caps[1].split(',').filter_map(key_column).map(|(c, _)| c));
            }
            continue;
        }
        let Some(caps) = COLUMN.captures(&element) else {
            debug!("Fallback skipping element '{}'", element);
            continue;
        };

        let modifiers = &caps[3];
        let mut field = Field::new(unquote(&caps[1]), DataType::parse(&caps[2]));
        if PRIMARY_KEY.is_match(modifiers) {
            field.primary_key = true;
            field.nullable = false;
        }
        if NOT_NULL.is_match(modifiers) {
            field.nullable = false;
        }
        field.unique = UNIQUE.is_match(modifiers);
        field.increment = INCREMENT.is_match(modifiers) || field.data_type.id.ends_with("serial");
        field.default = DEFAULT.captures(modifiers).map(|d| d[1].to_string());
        table.fields.push(field);
    }

    for column in key_columns {
        if let Some(field) = table.field_mut(&column) {
            field.primary_key = true;
            field.nullable = false;
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_columns_from_unparseable_table() {
        let sql = "CREATE TABLE accounts (\n  id BIGINT PRIMARY KEY,\n  owner VARCHAR(64) NOT NULL WITH MAGIC,\n  created timestamp with time zone DEFAULT now()\n);";
        let out = RegexFallbackStrategy.parse(sql);
        assert_eq!(out.draft.tables.len(), 1);
        assert_eq!(out.warnings.len(), 1);

        let table = &out.draft.tables[0];
        assert_eq!(table.fields.len(), 3);
        assert!(table.fields[0].primary_key);
        assert_eq!(table.fields[1].data_type.length, Some(64));
        assert!(!table.fields[1].nullable);
        assert_eq!(table.fields[2].data_type.id, "timestamp with time zone");
        assert!(table.fields[2].nullable);
    }

    #[test]
    fn test_table_level_primary_key() {
        let sql = "CREATE TABLE t (a INT, b INT, PRIMARY KEY (a, b), FOREIGN KEY (b) REFERENCES x(id))";
        let out = RegexFallbackStrategy.parse(sql);
        let table = &out.draft.tables[0];
        assert_eq!(table.fields.len(), 2);
        assert!(table.fields.iter().all(|f| f.primary_key));
    }

    #[test]
    fn test_nothing_to_recover() {
        let out = RegexFallbackStrategy.parse("DROP TABLE x; SELECT 1;");
        assert!(out.draft.tables.is_empty());
        assert!(out.warnings.is_empty());
    }
}
