//! Table validation functionality
//!
//! Detects naming conflicts: two tables sharing the identity key `(schema, name)`.

use crate::models::Table;
use std::collections::HashMap;
use uuid::Uuid;

/// Naming conflict between two tables
#[derive(Debug, Clone, PartialEq)]
pub struct NamingConflict {
    pub new_table_id: Uuid,
    pub new_table_name: String,
    pub existing_table_id: Uuid,
    pub existing_table_name: String,
}

/// Table validator
///
/// Keeps the identity keys of every table registered so far; a table whose key is
/// already taken is reported as a conflict and not registered.
#[derive(Debug, Default)]
pub struct TableValidator {
    registered: HashMap<(Option<String>, String), (Uuid, String)>,
}

impl TableValidator {
    /// Create a new table validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `table`, or return the conflict with the table already holding its key
    pub fn register(&mut self, table: &Table) -> Result<(), NamingConflict> {
        let key = table.unique_key();
        if let Some((existing_id, existing_name)) = self.registered.get(&key) {
            return Err(NamingConflict {
                new_table_id: table.id,
                new_table_name: table.qualified_name(),
                existing_table_id: *existing_id,
                existing_table_name: existing_name.clone(),
            });
        }
        self.registered.insert(key, (table.id, table.qualified_name()));
        Ok(())
    }

    /// Detect naming conflicts between new tables and existing tables
    pub fn detect_naming_conflicts(existing_tables: &[Table], new_tables: &[Table]) -> Vec<NamingConflict> {
        let mut validator = Self::new();
        for table in existing_tables {
            // Conflicts inside the existing set are not this check's concern
            let _ = validator.register(table);
        }
        new_tables
            .iter()
            .filter_map(|table| validator.register(table).err())
            .collect()
    }
}
