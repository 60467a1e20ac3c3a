//! View dependency validation
//!
//! Validates view dependencies for circular references and self-references.

use crate::models::Dependency;
use petgraph::algo::has_path_connecting;
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Graph};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Circular dependency detected
#[derive(Debug, Clone, PartialEq)]
pub struct CircularDependency {
    pub table_id: Uuid,
    pub dependent_table_id: Uuid,
    /// Existing path from the dependent back to the table, which the new edge would close
    pub cycle_path: Vec<Uuid>,
}

/// Self-reference detected
#[derive(Debug, Clone, PartialEq)]
pub struct SelfReference {
    pub table_id: Uuid,
}

/// Dependency validator
pub struct DependencyValidator;

impl DependencyValidator {
    /// Create a new dependency validator
    pub fn new() -> Self {
        Self
    }

    /// Check whether adding `table_id -> dependent_table_id` would close a cycle.
    ///
    /// Edges run from the referenced table to the view reading it, so a cycle exists
    /// when the dependent view already (transitively) feeds the referenced table.
    pub fn check_circular_dependency(
        &self,
        dependencies: &[Dependency],
        table_id: Uuid,
        dependent_table_id: Uuid,
    ) -> Result<(), CircularDependency> {
        let mut graph = Graph::<Uuid, Uuid, Directed>::new();
        let mut node_map = HashMap::new();

        for dep in dependencies {
            let from = *node_map
                .entry(dep.table_id)
                .or_insert_with(|| graph.add_node(dep.table_id));
            let to = *node_map
                .entry(dep.dependent_table_id)
                .or_insert_with(|| graph.add_node(dep.dependent_table_id));
            graph.add_edge(from, to, dep.id);
        }

        let (Some(&from), Some(&to)) = (node_map.get(&dependent_table_id), node_map.get(&table_id)) else {
            return Ok(());
        };

        if has_path_connecting(&graph, from, to, None) {
            return Err(CircularDependency {
                table_id,
                dependent_table_id,
                cycle_path: Self::find_path(&graph, from, to).unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Shortest path between two nodes (BFS)
    fn find_path(graph: &Graph<Uuid, Uuid, Directed>, from: NodeIndex, to: NodeIndex) -> Option<Vec<Uuid>> {
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        let mut parent = HashMap::new();

        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = Vec::new();
                let mut current = Some(to);
                while let Some(node_idx) = current {
                    path.push(graph[node_idx]);
                    current = parent.get(&node_idx).copied();
                }
                path.reverse();
                return Some(path);
            }

            for neighbor in graph.neighbors(node) {
                if visited.insert(neighbor) {
                    parent.insert(neighbor, node);
                    queue.push_back(neighbor);
                }
            }
        }
        None
    }

    /// A view cannot depend on itself
    pub fn validate_no_self_reference(&self, table_id: Uuid, dependent_table_id: Uuid) -> Result<(), SelfReference> {
        if table_id == dependent_table_id {
            return Err(SelfReference { table_id });
        }
        Ok(())
    }
}

impl Default for DependencyValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_without_cycle() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let deps = vec![Dependency::new(a, b)];
        let validator = DependencyValidator::new();
        assert!(validator.check_circular_dependency(&deps, b, c).is_ok());
        assert!(validator.check_circular_dependency(&deps, a, c).is_ok());
    }

    #[test]
    fn test_cycle_is_detected_with_path() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let deps = vec![Dependency::new(a, b), Dependency::new(b, c)];
        let validator = DependencyValidator::new();

        let err = validator.check_circular_dependency(&deps, c, a).unwrap_err();
        assert_eq!(err.cycle_path, vec![a, b, c]);
    }

    #[test]
    fn test_self_reference() {
        let a = Uuid::new_v4();
        let validator = DependencyValidator::new();
        assert!(validator.validate_no_self_reference(a, a).is_err());
        assert!(validator.validate_no_self_reference(a, Uuid::new_v4()).is_ok());
    }
}
