//! Pattern-based readers for statements the grammar parser is not used for
//!
//! `CREATE INDEX`, `CREATE VIEW`, `CREATE TYPE` and `COMMENT ON` vary too much across
//! engines for one grammar, and only a few parts of each are needed.

use super::lexical::{balanced_group, key_column, split_top_level, table_ref, unescape_literal};
use crate::model::{IndexDraft, TableDraft, TableIndexDraft, TableRef};
use crate::models::{CustomType, CustomTypeField};
use once_cell::sync::Lazy;
use regex::Regex;

/// Statement categories the SQL importer dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    AlterTable,
    CreateIndex,
    CreateView,
    CreateType,
    CommentOn,
    Other,
}

static KIND_PATTERNS: Lazy<Vec<(StatementKind, Regex)>> = Lazy::new(|| {
    [
        (
            StatementKind::CreateTable,
            r"(?is)^CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?TABLE\b",
        ),
        (StatementKind::AlterTable, r"(?is)^ALTER\s+TABLE\b"),
        (
            StatementKind::CreateIndex,
            r"(?is)^CREATE\s+(?:UNIQUE\s+)?(?:(?:CLUSTERED|NONCLUSTERED|FULLTEXT|SPATIAL|BITMAP)\s+)?INDEX\b",
        ),
        (
            StatementKind::CreateView,
            r"(?is)^CREATE\s+(?:OR\s+(?:REPLACE|ALTER)\s+)?(?:(?:TEMP|TEMPORARY)\s+)?(?:MATERIALIZED\s+)?VIEW\b",
        ),
        (StatementKind::CreateType, r"(?is)^CREATE\s+TYPE\b"),
        (StatementKind::CommentOn, r"(?is)^COMMENT\s+ON\b"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("valid statement kind regex")))
    .collect()
});

pub fn statement_kind(statement: &str) -> StatementKind {
    KIND_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(statement))
        .map(|(kind, _)| *kind)
        .unwrap_or(StatementKind::Other)
}

/// What a pattern reader made of a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    Found(T),
    /// Well-formed but not representable; the reason becomes a warning
    Skipped(String),
}

static INDEX_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^CREATE\s+(UNIQUE\s+)?(?:(?:CLUSTERED|NONCLUSTERED|FULLTEXT|SPATIAL|BITMAP)\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(?:(\S+)\s+)?ON\s+(?:ONLY\s+)?([^\s(]+)\s*(?:USING\s+(\w+)\s*)?\(",
    )
    .expect("valid index regex")
});

/// `CREATE [UNIQUE] INDEX name ON table [USING method] (cols ...)`
pub fn create_index(statement: &str) -> Result<Extracted<TableIndexDraft>, String> {
    let caps = INDEX_HEADER
        .captures(statement)
        .ok_or_else(|| "Unrecognized CREATE INDEX statement".to_string())?;
    let open = caps.get(0).map(|m| m.end() - 1).unwrap_or_default();
    let (inner, _) = balanced_group(statement, open).ok_or_else(|| "Unbalanced parentheses in CREATE INDEX".to_string())?;

    let name = caps.get(2).map(|m| table_ref(m.as_str()).name);
    let table = table_ref(&caps[3]);

    let mut columns = Vec::new();
    for element in split_top_level(inner, ',') {
        match key_column(&element) {
            Some(column) => columns.push(column),
            None => {
                return Ok(Extracted::Skipped(format!(
                    "Index {} on {}: expression '{}' is not a plain column, index skipped",
                    name.as_deref().unwrap_or("(unnamed)"),
                    table,
                    element
                )));
            }
        }
    }
    if columns.is_empty() {
        return Err("CREATE INDEX without columns".to_string());
    }

    Ok(Extracted::Found(TableIndexDraft {
        table,
        index: IndexDraft {
            name,
            columns,
            unique: caps.get(1).is_some(),
            index_type: caps.get(4).map(|m| m.as_str().to_lowercase()),
            cardinality: None,
        },
    }))
}

static VIEW_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^CREATE\s+(?:OR\s+(?:REPLACE|ALTER)\s+)?(?:(?:TEMP|TEMPORARY)\s+)?(?:MATERIALIZED\s+)?VIEW\s+(?:IF\s+NOT\s+EXISTS\s+)?([^\s(]+)\s*(?:\([^()]*\)\s*)?(?:WITH\s*\([^()]*\)\s*)?AS\s+(.+)$",
    )
    .expect("valid view regex")
});

/// `CREATE [OR REPLACE] [MATERIALIZED] VIEW name AS body`; the body is kept verbatim
pub fn create_view(statement: &str) -> Result<TableDraft, String> {
    let caps = VIEW_HEADER
        .captures(statement)
        .ok_or_else(|| "Unrecognized CREATE VIEW statement".to_string())?;
    Ok(TableDraft {
        is_view: true,
        view_definition: Some(caps[2].trim().to_string()),
        ..TableDraft::new(table_ref(&caps[1]))
    })
}

static ENUM_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^CREATE\s+TYPE\s+(\S+)\s+AS\s+ENUM\s*\(").expect("valid enum type regex"));

static COMPOSITE_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^CREATE\s+TYPE\s+(\S+)\s+AS\s*\(").expect("valid composite type regex"));

static QUOTED_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'((?:[^']|'')*)'").expect("valid literal regex"));

/// `CREATE TYPE name AS ENUM (...)` and `CREATE TYPE name AS (field type, ...)`
pub fn create_type(statement: &str) -> Result<Extracted<CustomType>, String> {
    if let Some(caps) = ENUM_TYPE.captures(statement) {
        let open = caps.get(0).map(|m| m.end() - 1).unwrap_or_default();
        let (inner, _) = balanced_group(statement, open).ok_or_else(|| "Unbalanced parentheses in CREATE TYPE".to_string())?;
        let values = QUOTED_VALUE
            .captures_iter(inner)
            .map(|c| unescape_literal(&c[1]))
            .collect();
        let name = table_ref(&caps[1]);
        return Ok(Extracted::Found(CustomType::new_enum(name.name, values).with_schema(name.schema)));
    }

    if let Some(caps) = COMPOSITE_TYPE.captures(statement) {
        let open = caps.get(0).map(|m| m.end() - 1).unwrap_or_default();
        let (inner, _) = balanced_group(statement, open).ok_or_else(|| "Unbalanced parentheses in CREATE TYPE".to_string())?;
        let fields = split_top_level(inner, ',')
            .into_iter()
            .filter_map(|part| {
                let (name, data_type) = part.split_once(char::is_whitespace)?;
                Some(CustomTypeField {
                    name: super::lexical::unquote(name),
                    data_type: data_type.trim().to_string(),
                })
            })
            .collect();
        let name = table_ref(&caps[1]);
        return Ok(Extracted::Found(CustomType::new_composite(name.name, fields).with_schema(name.schema)));
    }

    Ok(Extracted::Skipped(
        "CREATE TYPE is neither an enum nor a composite type, skipped".to_string(),
    ))
}

/// Object a `COMMENT ON` statement describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    Table(TableRef),
    Column(TableRef, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentOn {
    pub target: CommentTarget,
    /// `None` for `IS NULL`, which removes the comment
    pub text: Option<String>,
}

static COMMENT_ON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^COMMENT\s+ON\s+(TABLE|VIEW|MATERIALIZED\s+VIEW|COLUMN)\s+(.+?)\s+IS\s+(?:'((?:[^']|'')*)'|NULL)\s*$")
        .expect("valid comment regex")
});

pub fn comment_on(statement: &str) -> Result<Extracted<CommentOn>, String> {
    let Some(caps) = COMMENT_ON.captures(statement) else {
        if Regex::new(r"(?is)^COMMENT\s+ON\s+(?:TABLE|VIEW|COLUMN)\b")
            .is_ok_and(|re| re.is_match(statement))
        {
            return Err("Malformed COMMENT ON statement".to_string());
        }
        return Ok(Extracted::Skipped(
            "COMMENT ON for an object other than a table or column, skipped".to_string(),
        ));
    };

    let text = caps.get(3).map(|m| unescape_literal(m.as_str()));
    let object = caps[2].trim();
    let target = if caps[1].eq_ignore_ascii_case("COLUMN") {
        let mut parts = super::lexical::split_name(object);
        let column = parts.pop().unwrap_or_default();
        let table = parts.pop().unwrap_or_default();
        CommentTarget::Column(TableRef::new(parts.pop(), table), column)
    } else {
        CommentTarget::Table(table_ref(object))
    };
    Ok(Extracted::Found(CommentOn { target, text }))
}
