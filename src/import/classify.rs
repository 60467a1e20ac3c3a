//! Content type detection for pasted input

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Ddl,
    Dbml,
    /// JSON produced by an introspection query
    Query,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentType::Ddl => "ddl",
            ContentType::Dbml => "dbml",
            ContentType::Query => "query",
        })
    }
}

/// DBML block openers and column annotations
static DBML_SIGNALS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?im)^\s*table\s+[\w."`]+(?:\s+as\s+\w+)?\s*(?:\[[^\]\n]*\])?\s*\{"#,
        r"(?im)^\s*ref\s*[\w]*\s*:",
        r"(?im)^\s*ref\s+[\w]*\s*\{",
        r#"(?im)^\s*enum\s+[\w."]+\s*\{"#,
        r#"(?im)^\s*tablegroup\s+[\w."]+\s*\{"#,
        r#"(?im)^\s*(?:project|note)\s+[\w."']*\s*\{"#,
        r"(?i)\[\s*pk\s*[,\]]",
        r"(?i)\[[^\]\n]*\bref\s*:\s*(?:<>|[<>-])",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid DBML signal regex"))
    .collect()
});

/// DDL statement openers; any case-insensitive occurrence marks the input as DDL
const DDL_KEYWORDS: &[&str] = &[
    "CREATE TABLE",
    "ALTER TABLE",
    "DROP TABLE",
    "CREATE INDEX",
    "CREATE VIEW",
    "CREATE PROCEDURE",
    "CREATE FUNCTION",
    "CREATE SCHEMA",
    "CREATE DATABASE",
];

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Guess what `text` is. `None` means the caller should ask the user.
///
/// DBML wins over DDL when both are present, since DBML notes and strings may quote SQL.
pub fn classify(text: &str) -> Option<ContentType> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if DBML_SIGNALS.iter().any(|re| re.is_match(trimmed)) {
        return Some(ContentType::Dbml);
    }

    let upper = WHITESPACE_RUN.replace_all(trimmed, " ").to_uppercase();
    if DDL_KEYWORDS.iter().any(|kw| upper.contains(kw)) {
        return Some(ContentType::Ddl);
    }

    let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if bracketed {
        return Some(ContentType::Query);
    }

    None
}
