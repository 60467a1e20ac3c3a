//! DBML Import functionality
//!
//! Tables, enums, refs and `indexes` blocks become canonical entities. `Project`,
//! `TableGroup` and standalone `Note` blocks are read and ignored.
//!
//! Two conversions lose information and are reported as warnings (when
//! [`ImportConfig::lossy_conversion_warnings`] is set):
//! - array columns (`text[]`) keep only their element type
//! - enum columns become `varchar`, remembering the enum in `Field::custom_type`
//!
//! Every ref is stored with the referenced (one) side as source and the referencing
//! side as target, so `a.x > b.y` and `b.y < a.x` produce the same relationship.

pub mod lexer;
pub mod parser;

use super::{ImportConfig, ImportError, ImportOutcome};
use crate::model::{
    ColumnRef, DiagramBuilder, IndexDraft, RelationshipDraft, SchemaDraft, TableDraft, TableRef,
};
use crate::models::{Cardinality, CustomType, DataType, Field, SortDirection};
use parser::{Document, Endpoint, IndexPart, Parser, RefDecl, RefOp, TableDecl};
use std::collections::HashMap;
use tracing::{debug, info};

/// Error while reading DBML text
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DbmlError {
    #[error("DBML parse error: {0}")]
    Parse(#[from] parser::ParseError),
}

impl From<DbmlError> for ImportError {
    fn from(err: DbmlError) -> Self {
        let DbmlError::Parse(inner) = &err;
        let (line, column) = inner.position();
        ImportError::Syntax {
            line: Some(line),
            column: Some(column),
            message: inner.to_string(),
        }
    }
}

/// Parse DBML text into its syntax tree
pub fn parse_document(dbml: &str) -> Result<Document, DbmlError> {
    Ok(Parser::new(dbml)?.parse()?)
}

/// DBML Importer - parses DBML into a diagram
pub struct DbmlImporter {
    config: ImportConfig,
}

impl Default for DbmlImporter {
    fn default() -> Self {
        Self::new(ImportConfig::default())
    }
}

impl DbmlImporter {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    /// Parse DBML text
    ///
    /// Syntax errors abort the import; everything after parsing is reported as
    /// warnings and issues on the outcome.
    pub fn parse(&self, dbml: &str) -> Result<ImportOutcome, ImportError> {
        let document = parse_document(dbml)?;
        if !document.skipped_blocks.is_empty() {
            debug!("Ignored DBML blocks: {}", document.skipped_blocks.join(", "));
        }
        info!(
            "Parsed DBML: {} tables, {} refs, {} enums",
            document.tables.len(),
            document.refs.len(),
            document.enums.len()
        );

        let mut warnings = Vec::new();
        let draft = self.lower(document, &mut warnings);
        let built = DiagramBuilder::new(self.config.clone()).build(draft);
        warnings.extend(built.warnings);

        Ok(ImportOutcome {
            diagram: built.diagram,
            warnings,
            errors: Vec::new(),
            issues: built.issues,
        })
    }

    fn lower(&self, document: Document, warnings: &mut Vec<String>) -> SchemaDraft {
        let mut draft = SchemaDraft::default();

        draft.custom_types = document
            .enums
            .into_iter()
            .map(|e| CustomType::new_enum(e.name, e.values).with_schema(e.schema))
            .collect();

        let aliases: HashMap<String, TableRef> = document
            .tables
            .iter()
            .filter_map(|t| {
                let alias = t.alias.clone()?;
                Some((alias, TableRef::new(t.schema.clone(), t.name.clone())))
            })
            .collect();

        for table in document.tables {
            let lowered = self.lower_table(table, &draft.custom_types, warnings);
            draft.tables.push(lowered);
        }

        for decl in document.refs {
            draft.relationships.extend(lower_ref(decl, &aliases, warnings));
        }
        draft
    }

    fn lower_table(&self, decl: TableDecl, custom_types: &[CustomType], warnings: &mut Vec<String>) -> TableDraft {
        let mut table = TableDraft::new(TableRef::new(decl.schema, decl.name));
        table.comment = decl.note;

        for column in decl.columns {
            let enum_type = custom_types.iter().find(|c| c.matches(&column.type_name));
            let data_type = match enum_type {
                Some(custom) => {
                    if self.config.lossy_conversion_warnings {
                        warnings.push(format!(
                            "Column {}.{}: enum {} stored as varchar",
                            table.name, column.name, custom.name
                        ));
                    }
                    DataType::new("varchar")
                }
                None => {
                    let parsed = DataType::parse_detailed(&column.type_name);
                    if column.is_array && self.config.lossy_conversion_warnings {
                        warnings.push(format!(
                            "Column {}.{}: array type {}[] stored as its element type {}",
                            table.name, column.name, column.type_name, parsed.data_type
                        ));
                    }
                    parsed.data_type
                }
            };

            let settings = column.settings;
            let mut field = Field::new(column.name, data_type);
            field.custom_type = enum_type.map(|c| c.name.clone());
            field.primary_key = settings.primary_key;
            field.nullable = settings.nullable.unwrap_or(true) && !settings.primary_key;
            field.unique = settings.unique;
            field.increment = settings.increment;
            field.default = settings.default;
            field.comment = settings.note;
            table.fields.push(field);
        }

        for index in decl.indexes {
            let mut columns = Vec::new();
            let mut expressions = Vec::new();
            for part in index.parts {
                match part {
                    IndexPart::Column(c) => columns.push((c, SortDirection::Asc)),
                    IndexPart::Expression(e) => expressions.push(e),
                }
            }
            if !expressions.is_empty() {
                warnings.push(format!(
                    "Index on {} uses expressions ({}) which cannot be represented, index skipped",
                    table.name,
                    expressions.join(", ")
                ));
                continue;
            }
            if index.primary_key {
                for (name, _) in &columns {
                    if let Some(field) = table.field_mut(name) {
                        field.primary_key = true;
                        field.nullable = false;
                    }
                }
                continue;
            }
            table.indexes.push(IndexDraft {
                name: index.name,
                columns,
                unique: index.unique,
                index_type: index.index_type,
                cardinality: None,
            });
        }
        table
    }
}

fn resolve_endpoint_table(endpoint: &Endpoint, aliases: &HashMap<String, TableRef>) -> TableRef {
    match (&endpoint.schema, aliases.get(&endpoint.table)) {
        (None, Some(aliased)) => aliased.clone(),
        _ => TableRef::new(endpoint.schema.clone(), endpoint.table.clone()),
    }
}

/// Relationships for one ref, in canonical orientation
fn lower_ref(decl: RefDecl, aliases: &HashMap<String, TableRef>, warnings: &mut Vec<String>) -> Vec<RelationshipDraft> {
    if decl.left.columns.len() != decl.right.columns.len() {
        warnings.push(format!(
            "Ref at line {} pairs {} columns with {}, skipped",
            decl.line,
            decl.left.columns.len(),
            decl.right.columns.len()
        ));
        return Vec::new();
    }

    let left_table = resolve_endpoint_table(&decl.left, aliases);
    let right_table = resolve_endpoint_table(&decl.right, aliases);

    // (referenced side, referencing side, source cardinality, target cardinality)
    let (source, target, cardinality) = match decl.op {
        RefOp::ManyToOne => (
            (&right_table, &decl.right.columns),
            (&left_table, &decl.left.columns),
            (Cardinality::One, Cardinality::Many),
        ),
        RefOp::OneToMany => (
            (&left_table, &decl.left.columns),
            (&right_table, &decl.right.columns),
            (Cardinality::One, Cardinality::Many),
        ),
        RefOp::OneToOne => (
            (&right_table, &decl.right.columns),
            (&left_table, &decl.left.columns),
            (Cardinality::One, Cardinality::One),
        ),
        RefOp::ManyToMany => (
            (&right_table, &decl.right.columns),
            (&left_table, &decl.left.columns),
            (Cardinality::Many, Cardinality::Many),
        ),
    };

    source
        .1
        .iter()
        .zip(target.1.iter())
        .map(|(source_column, target_column)| RelationshipDraft {
            name: decl.name.clone(),
            source: ColumnRef::new(source.0.clone(), source_column.clone()),
            target: ColumnRef::new(target.0.clone(), target_column.clone()),
            cardinality: Some(cardinality),
        })
        .collect()
}
