//! SQL Import functionality
//!
//! Reads DDL scripts for any supported engine into a [`Diagram`](crate::models::Diagram).
//!
//! The pipeline per call is: strip batch separators, run the auto-fix pass, parse
//! statement by statement with the engine grammar, and only if that recovers no table
//! at all, retry with pattern matching. Statements that fail are skipped with a warning
//! and a [`StatementError`]; the rest of the script is still imported.
//!
//! # Example
//!
//! ```rust
//! use schema_diagram_sdk::import::{ImportConfig, SqlImporter};
//! use schema_diagram_sdk::models::DatabaseType;
//!
//! let importer = SqlImporter::new(ImportConfig::for_database(DatabaseType::PostgreSql));
//! let outcome = importer
//!     .parse("CREATE TABLE users (id SERIAL PRIMARY KEY, email TEXT NOT NULL);")
//!     .unwrap();
//! assert_eq!(outcome.diagram.tables.len(), 1);
//! assert_eq!(outcome.diagram.tables[0].fields.len(), 2);
//! ```

pub mod autofix;
pub mod extract;
pub mod fallback;
pub mod grammar;
pub mod lexical;

pub use autofix::{auto_fix, Repair};
pub use fallback::RegexFallbackStrategy;
pub use grammar::{dialect_for, GrammarStrategy};

use super::{ImportConfig, ImportError, ImportOutcome, StatementError};
use crate::model::{DiagramBuilder, SchemaDraft};
use crate::models::DatabaseType;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

/// What one parsing strategy recovered from a script
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub draft: SchemaDraft,
    pub warnings: Vec<String>,
    pub errors: Vec<StatementError>,
}

/// A way of turning DDL text into a draft
///
/// Strategies never fail as a whole: problems are reported inside the outcome.
pub trait ParseStrategy {
    fn name(&self) -> &'static str;
    fn parse(&self, sql: &str) -> ParseOutcome;
}

static BATCH_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*GO[ \t]*(?:\d+)?[ \t]*;?[ \t]*$").expect("valid GO regex"));

/// SQL Importer - parses DDL into a diagram
pub struct SqlImporter {
    config: ImportConfig,
}

impl Default for SqlImporter {
    fn default() -> Self {
        Self::new(ImportConfig::default())
    }
}

impl SqlImporter {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Parse a DDL script
    ///
    /// Fails only when nothing at all could be recovered from a script that had
    /// errors; every other problem ends up in the outcome's warnings and errors.
    pub fn parse(&self, sql: &str) -> Result<ImportOutcome, ImportError> {
        let mut warnings = Vec::new();
        let mut text = self.strip_batch_separators(sql);

        if self.config.auto_fix {
            let (fixed, repairs) = auto_fix(&text);
            if !repairs.is_empty() {
                info!("Applied {} auto-fix repairs", repairs.len());
            }
            warnings.extend(repairs.iter().map(|r| r.warning().to_string()));
            text = fixed;
        }

        let grammar = GrammarStrategy::new(self.config.database_type, self.config.lossy_conversion_warnings);
        let mut outcome = grammar.parse(&text);
        debug!(
            "{} strategy: {} tables, {} failed statements",
            grammar.name(),
            outcome.draft.tables.len(),
            outcome.errors.len()
        );

        if outcome.draft.tables.is_empty() && !outcome.errors.is_empty() {
            outcome = self.recover(&text, outcome)?;
        }

        warnings.append(&mut outcome.warnings);
        let built = DiagramBuilder::new(self.config.clone()).build(outcome.draft);
        warnings.extend(built.warnings);
        if !built.issues.is_empty() {
            info!("Model builder rejected {} entities", built.issues.len());
        }

        Ok(ImportOutcome {
            diagram: built.diagram,
            warnings,
            errors: outcome.errors,
            issues: built.issues,
        })
    }

    /// Retry with the fallback strategy after the grammar recovered no table
    fn recover(&self, sql: &str, primary: ParseOutcome) -> Result<ParseOutcome, ImportError> {
        let first_error = || {
            primary
                .errors
                .first()
                .cloned()
                .map(ImportError::from)
                .unwrap_or_else(|| ImportError::Syntax {
                    line: None,
                    column: None,
                    message: "No tables could be read".to_string(),
                })
        };

        if !self.config.regex_fallback {
            return Err(first_error());
        }

        let fallback = RegexFallbackStrategy;
        let recovered = fallback.parse(sql);
        if recovered.draft.tables.is_empty() {
            warn!("{} strategy recovered nothing", fallback.name());
            return Err(first_error());
        }
        info!(
            "{} strategy recovered {} tables",
            fallback.name(),
            recovered.draft.tables.len()
        );

        let mut draft = primary.draft;
        draft.tables = recovered.draft.tables;
        let mut warnings = primary.warnings;
        warnings.extend(recovered.warnings);
        Ok(ParseOutcome {
            draft,
            warnings,
            errors: primary.errors,
        })
    }

    fn strip_batch_separators(&self, sql: &str) -> String {
        match self.config.database_type {
            DatabaseType::SqlServer | DatabaseType::Generic => BATCH_SEPARATOR.replace_all(sql, ";").into_owned(),
            _ => sql.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn importer(database_type: DatabaseType) -> SqlImporter {
        SqlImporter::new(ImportConfig::for_database(database_type))
    }

    #[test]
    fn test_sql_importer_default() {
        let importer = SqlImporter::default();
        assert_eq!(importer.config().database_type, DatabaseType::Generic);
    }

    #[test]
    fn test_split_decimal_is_auto_fixed() {
        let outcome = importer(DatabaseType::MySql)
            .parse("CREATE TABLE invoices (\n  id INT PRIMARY KEY,\n  total DECIMAL(15,\n2) NOT NULL\n);")
            .unwrap();
        assert!(outcome.warnings.iter().any(|w| w.contains("Auto-fixed split DECIMAL")));
        let total = outcome.diagram.tables[0].field_by_name("total").unwrap();
        assert_eq!(total.data_type.precision, Some(15));
        assert_eq!(total.data_type.scale, Some(2));
    }

    #[test]
    fn test_malformed_statement_is_skipped() {
        let outcome = importer(DatabaseType::PostgreSql)
            .parse("CREATE TABLE good (id INT PRIMARY KEY);\nCREATE TABLE bad (id INT, CHECK (id >));")
            .unwrap();
        assert_eq!(outcome.diagram.tables.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].line, 2);
    }

    #[test]
    fn test_fallback_recovers_when_grammar_finds_nothing() {
        let outcome = importer(DatabaseType::PostgreSql)
            .parse("CREATE TABLE t (id INT PRIMARY KEY, name TEXT WITH SOMETHING ODD);")
            .unwrap();
        assert_eq!(outcome.diagram.tables.len(), 1);
        assert_eq!(outcome.diagram.tables[0].fields.len(), 2);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.warnings.iter().any(|w| w.starts_with("Recovered table")));
    }

    #[test]
    fn test_fails_without_fallback() {
        let config = ImportConfig::builder()
            .database_type(DatabaseType::PostgreSql)
            .regex_fallback(false)
            .build();
        let err = SqlImporter::new(config)
            .parse("CREATE TABLE t (id INT PRIMARY KEY, name TEXT WITH SOMETHING ODD);")
            .unwrap_err();
        assert!(matches!(err, ImportError::Syntax { line: Some(1), .. }));
    }

    #[test]
    fn test_nothing_recoverable_is_a_syntax_error() {
        let err = importer(DatabaseType::PostgreSql)
            .parse("CREATE TABLE (((;")
            .unwrap_err();
        assert!(matches!(err, ImportError::Syntax { .. }));
    }

    #[test]
    fn test_go_batches() {
        let outcome = importer(DatabaseType::SqlServer)
            .parse("CREATE TABLE [dbo].[A] ([Id] INT NOT NULL PRIMARY KEY)\nGO\nCREATE TABLE [dbo].[B] ([Id] INT NOT NULL)\nGO\n")
            .unwrap();
        assert_eq!(outcome.diagram.tables.len(), 2);
        assert_eq!(outcome.diagram.tables[0].schema.as_deref(), Some("dbo"));
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_foreign_key_becomes_relationship() {
        let outcome = importer(DatabaseType::PostgreSql)
            .parse(
                "CREATE TABLE users (id INT PRIMARY KEY);\n\
                 CREATE TABLE posts (id INT PRIMARY KEY, user_id INT NOT NULL REFERENCES users(id));",
            )
            .unwrap();
        assert!(outcome.issues.is_empty(), "{:?}", outcome.issues);
        let rel = &outcome.diagram.relationships[0];
        let users = outcome.diagram.table_by_name(None, "users").unwrap();
        let posts = outcome.diagram.table_by_name(None, "posts").unwrap();
        assert_eq!(rel.source_table_id, users.id);
        assert_eq!(rel.target_table_id, posts.id);
    }
}
