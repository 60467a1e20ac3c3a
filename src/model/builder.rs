//! Canonical model construction
//!
//! Resolves the name-based drafts produced by the importers into a [`Diagram`]:
//! assigns ids, rejects duplicates, and excludes any entity whose references cannot
//! be resolved. Each exclusion is reported twice: as a structured [`ImportError`]
//! and as a human-readable warning.

use super::compatibility::are_types_compatible;
use super::draft::{
    CheckDraft, ColumnRef, DependencyDraft, IndexDraft, RelationshipDraft, SchemaDraft,
    TableDraft, TableRef,
};
use crate::import::{ImportConfig, ImportError};
use crate::models::{
    Cardinality, CheckConstraint, CustomType, Dependency, Diagram, Index, IndexColumn, ModelError,
    Relationship, Table,
};
use crate::validation::{DependencyValidator, TableValidator};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

/// Table header colors, assigned round-robin in import order
pub const TABLE_COLORS: &[&str] = &[
    "#ff6363", "#ff6b8a", "#ff82b8", "#c084fc", "#8a61f5", "#7175fa", "#8eb7ff", "#42e0c0",
    "#4dee8a", "#9ef07a", "#ffe374", "#ffad62", "#ff9f74",
];

/// Output of [`DiagramBuilder::build`]
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub diagram: Diagram,
    pub warnings: Vec<String>,
    pub issues: Vec<ImportError>,
}

/// Builds a [`Diagram`] out of a [`SchemaDraft`]
#[derive(Debug, Clone)]
pub struct DiagramBuilder {
    config: ImportConfig,
}

impl DiagramBuilder {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, draft: SchemaDraft) -> BuildOutput {
        let mut ctx = BuildContext {
            diagram: Diagram::new(self.config.diagram_name.clone(), self.config.database_type),
            warnings: Vec::new(),
            issues: Vec::new(),
        };

        self.add_custom_types(&mut ctx, draft.custom_types);

        let mut validator = TableValidator::new();
        for table in draft.tables {
            self.add_table(&mut ctx, &mut validator, table);
        }
        for standalone in draft.indexes {
            match ctx.resolve_table(&standalone.table) {
                Ok(pos) => {
                    if let Some(index) = ctx.build_index(pos, standalone.index) {
                        ctx.diagram.tables[pos].indexes.push(index);
                    }
                }
                Err(reference) => ctx.reject(ImportError::ReferentialIntegrity {
                    entity: format!("Index {}", standalone.index.name.as_deref().unwrap_or("<unnamed>")),
                    reference,
                }),
            }
        }

        for rel in draft.relationships {
            self.add_relationship(&mut ctx, rel);
        }
        for dep in draft.dependencies {
            ctx.add_dependency(dep);
        }

        debug!(
            "Built diagram with {} table(s), {} relationship(s), {} issue(s)",
            ctx.diagram.tables.len(),
            ctx.diagram.relationships.len(),
            ctx.issues.len()
        );

        BuildOutput {
            diagram: ctx.diagram,
            warnings: ctx.warnings,
            issues: ctx.issues,
        }
    }

    fn add_custom_types(&self, ctx: &mut BuildContext, types: Vec<CustomType>) {
        let mut seen = HashSet::new();
        for custom_type in types {
            let key = (
                custom_type.schema.as_deref().map(str::to_lowercase),
                custom_type.name.to_lowercase(),
            );
            if !seen.insert(key) {
                ctx.reject(ImportError::DuplicateEntity {
                    kind: "custom type",
                    name: custom_type.name,
                });
                continue;
            }
            ctx.diagram.custom_types.push(custom_type);
        }
    }

    fn add_table(&self, ctx: &mut BuildContext, validator: &mut TableValidator, draft: TableDraft) {
        let mut table = Table::new(draft.name);
        table.schema = draft.schema;
        table.comment = draft.comment;
        table.is_view = draft.is_view;
        table.view_definition = draft.view_definition;

        if let Err(conflict) = validator.register(&table) {
            ctx.reject(ImportError::DuplicateEntity {
                kind: if table.is_view { "view" } else { "table" },
                name: conflict.new_table_name,
            });
            return;
        }

        let mut seen_fields = HashSet::new();
        for field in draft.fields {
            if !seen_fields.insert(field.name.clone()) {
                ctx.reject(ImportError::DuplicateEntity {
                    kind: "field",
                    name: format!("{}.{}", table.qualified_name(), field.name),
                });
                continue;
            }
            table.fields.push(field);
        }

        table.color = TABLE_COLORS[ctx.diagram.tables.len() % TABLE_COLORS.len()].to_string();
        ctx.diagram.tables.push(table);
        let pos = ctx.diagram.tables.len() - 1;

        for index in draft.indexes {
            if let Some(index) = ctx.build_index(pos, index) {
                ctx.diagram.tables[pos].indexes.push(index);
            }
        }
        for check in draft.checks {
            if let Some(check) = ctx.build_check(pos, check) {
                ctx.diagram.tables[pos].check_constraints.push(check);
            }
        }
    }

    fn add_relationship(&self, ctx: &mut BuildContext, draft: RelationshipDraft) {
        let name = draft.name.clone().unwrap_or_else(|| default_relationship_name(&draft));

        let source = match ctx.resolve_column(&draft.source) {
            Ok(found) => found,
            Err(reference) => {
                ctx.reject(ImportError::ReferentialIntegrity {
                    entity: format!("Relationship '{}'", name),
                    reference,
                });
                return;
            }
        };
        let target = match ctx.resolve_column(&draft.target) {
            Ok(found) => found,
            Err(reference) => {
                ctx.reject(ImportError::ReferentialIntegrity {
                    entity: format!("Relationship '{}'", name),
                    reference,
                });
                return;
            }
        };

        let duplicate = ctx.diagram.relationships.iter().any(|r| {
            r.source_field_id == source.field_id && r.target_field_id == target.field_id
        });
        if duplicate {
            debug!("Relationship '{}' already present, skipping", name);
            return;
        }

        match link(&ctx.diagram, source, target, self.config.check_type_compatibility) {
            Ok(relationship) => {
                let (source_cardinality, target_cardinality) = draft
                    .cardinality
                    .unwrap_or((relationship.source_cardinality, relationship.target_cardinality));
                ctx.diagram.relationships.push(Relationship {
                    name,
                    ..relationship.with_cardinality(source_cardinality, target_cardinality)
                });
            }
            Err(ModelError::TypeIncompatibility {
                source_type,
                target_type,
            }) => ctx.reject(ImportError::TypeIncompatibility {
                relationship: name,
                source_type,
                target_type,
            }),
            Err(other) => ctx.reject(ImportError::ReferentialIntegrity {
                entity: format!("Relationship '{}'", name),
                reference: other.to_string(),
            }),
        }
    }
}

/// Resolved field endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldEndpoint {
    pub table_id: Uuid,
    pub field_id: Uuid,
}

/// Link two existing fields with a relationship, as when a user draws one by hand.
///
/// `source` is the referenced field. Cardinality defaults to one-to-many and becomes
/// one-to-one when the referencing field is unique or the table's sole primary key.
pub fn relate(
    diagram: &mut Diagram,
    source_field_id: Uuid,
    target_field_id: Uuid,
) -> Result<Uuid, ModelError> {
    let index = diagram.index();
    let endpoint = |field_id| {
        index
            .field_owner(field_id)
            .map(|table| FieldEndpoint {
                table_id: table.id,
                field_id,
            })
            .ok_or(ModelError::NotFound { kind: "field", id: field_id })
    };
    let source = endpoint(source_field_id)?;
    let target = endpoint(target_field_id)?;
    let mut relationship = link(diagram, source, target, true)?;

    if let (Some(s), Some(t)) = (index.table(source.table_id), index.table(target.table_id)) {
        let source_name = index.field(source_field_id).map(|f| f.name.as_str()).unwrap_or_default();
        let target_name = index.field(target_field_id).map(|f| f.name.as_str()).unwrap_or_default();
        relationship.name = format!("{}_{}_{}_{}_fk", t.name, target_name, s.name, source_name);
    }

    let id = relationship.id;
    diagram.relationships.push(relationship);
    Ok(id)
}

fn link(
    diagram: &Diagram,
    source: FieldEndpoint,
    target: FieldEndpoint,
    check_types: bool,
) -> Result<Relationship, ModelError> {
    let source_table = diagram
        .table(source.table_id)
        .ok_or(ModelError::NotFound { kind: "table", id: source.table_id })?;
    let target_table = diagram
        .table(target.table_id)
        .ok_or(ModelError::NotFound { kind: "table", id: target.table_id })?;
    let source_field = source_table
        .field(source.field_id)
        .ok_or(ModelError::NotFound { kind: "field", id: source.field_id })?;
    let target_field = target_table
        .field(target.field_id)
        .ok_or(ModelError::NotFound { kind: "field", id: target.field_id })?;

    if check_types
        && !are_types_compatible(&source_field.data_type, &target_field.data_type, diagram.database_type)
    {
        return Err(ModelError::TypeIncompatibility {
            source_type: source_field.data_type.to_string(),
            target_type: target_field.data_type.to_string(),
        });
    }

    let sole_primary_key = target_field.primary_key && target_table.primary_key_fields().count() == 1;
    let target_cardinality = if target_field.unique || sole_primary_key {
        Cardinality::One
    } else {
        Cardinality::Many
    };

    Ok(Relationship::new(
        String::new(),
        (source.table_id, source.field_id),
        (target.table_id, target.field_id),
    )
    .with_cardinality(Cardinality::One, target_cardinality))
}

fn default_relationship_name(draft: &RelationshipDraft) -> String {
    format!(
        "{}_{}_fk",
        draft.target.table.name,
        draft.target.column.as_deref().unwrap_or("id")
    )
}

struct BuildContext {
    diagram: Diagram,
    warnings: Vec<String>,
    issues: Vec<ImportError>,
}

impl BuildContext {
    fn reject(&mut self, issue: ImportError) {
        warn!("{}", issue);
        self.warnings.push(issue.to_string());
        self.issues.push(issue);
    }

    /// Position of the table `table` names.
    ///
    /// An unqualified reference matches a table in any schema when that is unambiguous,
    /// otherwise the unqualified table or the engine's default schema wins.
    fn resolve_table(&self, table: &TableRef) -> Result<usize, String> {
        let tables = &self.diagram.tables;
        if let Some(pos) = tables
            .iter()
            .position(|t| t.name == table.name && t.schema == table.schema)
        {
            return Ok(pos);
        }

        let by_name: Vec<usize> = tables
            .iter()
            .enumerate()
            .filter(|(_, t)| t.name.eq_ignore_ascii_case(&table.name))
            .filter(|(_, t)| match (&table.schema, &t.schema) {
                (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
                (Some(wanted), None) => self
                    .diagram
                    .database_type
                    .default_schema()
                    .is_some_and(|default| default.eq_ignore_ascii_case(wanted)),
                (None, _) => true,
            })
            .map(|(pos, _)| pos)
            .collect();

        match by_name.as_slice() {
            [pos] => Ok(*pos),
            [] => Err(format!("table {}", table)),
            candidates => {
                let default_schema = self.diagram.database_type.default_schema();
                candidates
                    .iter()
                    .copied()
                    .find(|pos| tables[*pos].schema.is_none())
                    .or_else(|| {
                        candidates.iter().copied().find(|pos| {
                            tables[*pos].schema.as_deref() == default_schema && default_schema.is_some()
                        })
                    })
                    .ok_or_else(|| format!("table {} (ambiguous across schemas)", table))
            }
        }
    }

    fn resolve_column(&self, column: &ColumnRef) -> Result<FieldEndpoint, String> {
        let pos = self.resolve_table(&column.table)?;
        let table = &self.diagram.tables[pos];
        let field = match &column.column {
            Some(name) => table.field_by_name(name),
            None => {
                let mut keys = table.primary_key_fields();
                match (keys.next(), keys.next()) {
                    (Some(field), None) => Some(field),
                    _ => None,
                }
            }
        };
        field
            .map(|f| FieldEndpoint {
                table_id: table.id,
                field_id: f.id,
            })
            .ok_or_else(|| format!("field {}", column))
    }

    fn build_index(&mut self, pos: usize, draft: IndexDraft) -> Option<Index> {
        let table = &self.diagram.tables[pos];
        let mut columns = Vec::with_capacity(draft.columns.len());
        for (name, direction) in &draft.columns {
            match table.field_by_name(name) {
                Some(field) => columns.push(IndexColumn {
                    field_id: field.id,
                    direction: *direction,
                }),
                None => {
                    let issue = ImportError::ReferentialIntegrity {
                        entity: format!("Index {}", draft.name.as_deref().unwrap_or("<unnamed>")),
                        reference: format!("field {}.{}", table.qualified_name(), name),
                    };
                    self.reject(issue);
                    return None;
                }
            }
        }
        if columns.is_empty() {
            return None;
        }

        let name = draft.name.unwrap_or_else(|| {
            let names: Vec<&str> = draft.columns.iter().map(|(n, _)| n.as_str()).collect();
            format!("idx_{}_{}", table.name, names.join("_"))
        });
        let mut index = Index::new(name, columns);
        index.unique = draft.unique;
        index.index_type = draft.index_type;
        index.cardinality = draft.cardinality;
        Some(index)
    }

    fn build_check(&mut self, pos: usize, draft: CheckDraft) -> Option<CheckConstraint> {
        let table = &self.diagram.tables[pos];
        let mut field_ids = Vec::new();
        for name in &draft.columns {
            match table.field_by_name(name) {
                Some(field) => field_ids.push(field.id),
                None => {
                    let issue = ImportError::ReferentialIntegrity {
                        entity: format!("Check constraint '{}'", draft.expression),
                        reference: format!("field {}.{}", table.qualified_name(), name),
                    };
                    self.reject(issue);
                    return None;
                }
            }
        }
        let mut check = CheckConstraint::new(draft.expression);
        check.name = draft.name;
        check.field_ids = field_ids;
        Some(check)
    }

    fn add_dependency(&mut self, draft: DependencyDraft) {
        let (table_pos, dependent_pos) =
            match (self.resolve_table(&draft.table), self.resolve_table(&draft.dependent)) {
                (Ok(a), Ok(b)) => (a, b),
                (Err(reference), _) | (_, Err(reference)) => {
                    self.reject(ImportError::ReferentialIntegrity {
                        entity: format!("View dependency {} -> {}", draft.dependent, draft.table),
                        reference,
                    });
                    return;
                }
            };
        let table_id = self.diagram.tables[table_pos].id;
        let dependent_id = self.diagram.tables[dependent_pos].id;

        let validator = DependencyValidator::new();
        if validator.validate_no_self_reference(table_id, dependent_id).is_err() {
            debug!("Ignoring self-reference of view {}", draft.dependent);
            return;
        }
        if self
            .diagram
            .dependencies
            .iter()
            .any(|d| d.table_id == table_id && d.dependent_table_id == dependent_id)
        {
            return;
        }
        if let Err(cycle) = validator.check_circular_dependency(&self.diagram.dependencies, table_id, dependent_id) {
            let message = format!(
                "Skipped dependency of {} on {}: it would close a cycle of {} view(s)",
                draft.dependent,
                draft.table,
                cycle.cycle_path.len()
            );
            warn!("{}", message);
            self.warnings.push(message);
            return;
        }
        self.diagram.dependencies.push(Dependency::new(table_id, dependent_id));
    }
}
