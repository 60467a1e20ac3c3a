//! Output formatting for CLI

use crate::diff::{ChangeKind, ChangeList};
use crate::import::ImportOutcome;

/// Format an import outcome as a human-readable summary
pub fn format_import_summary(outcome: &ImportOutcome) -> String {
    let mut output = String::new();
    let diagram = &outcome.diagram;

    if !outcome.errors.is_empty() {
        output.push_str("\n⚠️  Parse Errors:\n");
        for error in &outcome.errors {
            output.push_str(&format!("  - {}\n", error));
        }
    }

    if !outcome.warnings.is_empty() {
        output.push_str("\n⚠️  Warnings:\n");
        for warning in &outcome.warnings {
            output.push_str(&format!("  - {}\n", warning));
        }
    }

    if !outcome.issues.is_empty() {
        output.push_str("\n⚠️  Rejected Entities:\n");
        for issue in &outcome.issues {
            output.push_str(&format!("  - {}\n", issue));
        }
    }

    output.push_str(&format!(
        "\n✅ Imported {} table(s), {} relationship(s) for {}:\n",
        diagram.tables.len(),
        diagram.relationships.len(),
        diagram.database_type
    ));
    for table in &diagram.tables {
        let kind = if table.is_view { "View" } else { "Table" };
        output.push_str(&format!("\n{} {}\n", kind, table.qualified_name()));

        let columns: Vec<String> = table
            .fields
            .iter()
            .map(|f| {
                let marker = if f.primary_key { "*" } else { "" };
                format!("{}{}:{}", marker, f.name, f.data_type)
            })
            .collect();
        output.push_str(&format!("  Columns: {}\n", columns.join(", ")));
        if !table.indexes.is_empty() {
            output.push_str(&format!("  Indexes: {}\n", table.indexes.len()));
        }
    }

    if !diagram.custom_types.is_empty() {
        output.push_str("\nCustom Types:\n");
        for custom in &diagram.custom_types {
            output.push_str(&format!("  - {}\n", custom.name));
        }
    }

    if outcome.errors.is_empty() && outcome.issues.is_empty() {
        output.push_str("\n✅ All statements imported!\n");
    }

    output
}

/// Format a change list one record per line
pub fn format_changes(changes: &ChangeList) -> String {
    if changes.is_empty() {
        return "No changes\n".to_string();
    }

    let (added, removed, changed) = changes.counts();
    let mut output = format!("{} added, {} removed, {} changed\n", added, removed, changed);
    for change in changes {
        output.push_str(&format!("  {}\n", change));
        if let ChangeKind::Added { value, .. } | ChangeKind::Removed { value, .. } = &change.kind {
            if let Some(name) = value.get("name").and_then(|n| n.as_str()) {
                output.push_str(&format!("      name: {}\n", name));
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{import_auto, ImportConfig};

    #[test]
    fn test_summary_lists_tables() {
        let outcome = import_auto(
            "CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255));",
            &ImportConfig::default(),
        )
        .unwrap();
        let summary = format_import_summary(&outcome);
        assert!(summary.contains("Table users"));
        assert!(summary.contains("*id:int"));
        assert!(summary.contains("email:varchar(255)"));
    }

    #[test]
    fn test_empty_change_list() {
        assert_eq!(format_changes(&ChangeList::default()), "No changes\n");
    }
}
