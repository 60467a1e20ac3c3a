//! View dependency discovery
//!
//! View bodies are kept as opaque text. Dependencies are found by looking for the
//! names of known tables as whole words in the body, not by parsing the query.

use crate::model::{DependencyDraft, TableDraft};
use regex::Regex;

/// Dependency edges from `view` to every other known table its body mentions
pub fn view_dependencies(view: &TableDraft, tables: &[TableDraft]) -> Vec<DependencyDraft> {
    let Some(definition) = view.view_definition.as_deref() else {
        return Vec::new();
    };
    let body = strip_string_literals(definition);
    let view_ref = view.table_ref();

    tables
        .iter()
        .filter(|t| !(t.name == view.name && t.schema == view.schema))
        .filter(|t| mentions(&body, t))
        .map(|t| DependencyDraft {
            table: t.table_ref(),
            dependent: view_ref.clone(),
        })
        .collect()
}

fn mentions(body: &str, table: &TableDraft) -> bool {
    let name = regex::escape(&table.name);
    let quoted_name = format!(r#"[`"\[]?{}[`"\]]?"#, name);
    let pattern = match &table.schema {
        // Qualified mention, or a bare name not preceded by some other qualifier
        Some(schema) => format!(
            r#"(?i)(?:[`"\[]?{}[`"\]]?\s*\.\s*{q}|(?:^|[^\w.`"\]]){q})(?:$|[^\w`"])"#,
            regex::escape(schema),
            q = quoted_name
        ),
        None => format!(r#"(?i)(?:^|[^\w.`"\]]){}(?:$|[^\w`"])"#, quoted_name),
    };
    Regex::new(&pattern).is_ok_and(|re| re.is_match(body))
}

/// Blank out `'...'` literals so string contents never count as references
fn strip_string_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_quote = false;
    for ch in sql.chars() {
        if ch == '\'' {
            in_quote = !in_quote;
            out.push(ch);
        } else if in_quote {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out
}

/// Convenience for importers: dependencies of every view among `tables`
pub fn all_view_dependencies(tables: &[TableDraft]) -> Vec<DependencyDraft> {
    tables
        .iter()
        .filter(|t| t.is_view)
        .flat_map(|view| view_dependencies(view, tables))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableRef;

    fn table(name: &str) -> TableDraft {
        TableDraft::new(TableRef::parse(name))
    }

    fn view(name: &str, body: &str) -> TableDraft {
        TableDraft {
            is_view: true,
            view_definition: Some(body.to_string()),
            ..table(name)
        }
    }

    #[test]
    fn test_finds_tables_in_joins() {
        let tables = vec![
            table("users"),
            table("orders"),
            table("order_items"),
            view("active_orders", "SELECT o.* FROM orders o JOIN users u ON u.id = o.user_id"),
        ];
        let deps = all_view_dependencies(&tables);
        let names: Vec<&str> = deps.iter().map(|d| d.table.name.as_str()).collect();
        assert_eq!(names, vec!["users", "orders"]);
        assert!(deps.iter().all(|d| d.dependent.name == "active_orders"));
    }

    #[test]
    fn test_ignores_string_literals_and_prefixes() {
        let tables = vec![
            table("users"),
            table("user"),
            view("v", "SELECT * FROM users WHERE kind = 'user'"),
        ];
        let deps = all_view_dependencies(&tables);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].table.name, "users");
    }

    #[test]
    fn test_schema_qualified_mentions() {
        let tables = vec![
            table("sales.orders"),
            table("archive.orders"),
            view("sales.recent", "SELECT * FROM sales.orders"),
        ];
        let deps = all_view_dependencies(&tables);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].table.schema.as_deref(), Some("sales"));
    }
}
