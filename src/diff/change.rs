//! Change records produced by the diff engine

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Kind of entity a change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectKind {
    Diagram,
    Table,
    Field,
    Index,
    CheckConstraint,
    Relationship,
    Dependency,
    CustomType,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Diagram => "diagram",
            ObjectKind::Table => "table",
            ObjectKind::Field => "field",
            ObjectKind::Index => "index",
            ObjectKind::CheckConstraint => "check constraint",
            ObjectKind::Relationship => "relationship",
            ObjectKind::Dependency => "dependency",
            ObjectKind::CustomType => "custom type",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "camelCase")]
pub enum ChangeKind {
    /// The whole entity appeared; `parent_id` is the owning table of nested entities
    Added {
        #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<Uuid>,
        value: Value,
    },
    /// The whole entity disappeared
    Removed {
        #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<Uuid>,
        value: Value,
    },
    /// One attribute of an entity present in both snapshots
    Changed {
        attribute: String,
        #[serde(rename = "oldValue")]
        old_value: Value,
        #[serde(rename = "newValue")]
        new_value: Value,
    },
}

impl ChangeKind {
    fn inverted(self) -> Self {
        match self {
            ChangeKind::Added { parent_id, value } => ChangeKind::Removed { parent_id, value },
            ChangeKind::Removed { parent_id, value } => ChangeKind::Added { parent_id, value },
            ChangeKind::Changed {
                attribute,
                old_value,
                new_value,
            } => ChangeKind::Changed {
                attribute,
                old_value: new_value,
                new_value: old_value,
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ChangeKind::Removed { .. } => 0,
            ChangeKind::Added { .. } => 1,
            ChangeKind::Changed { .. } => 2,
        }
    }
}

/// One difference between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub object: ObjectKind,
    pub entity_id: Uuid,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl Change {
    /// Changed attribute name; `None` for whole-entity records
    pub fn attribute(&self) -> Option<&str> {
        match &self.kind {
            ChangeKind::Changed { attribute, .. } => Some(attribute),
            _ => None,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self.kind, ChangeKind::Added { .. })
    }

    pub fn is_removed(&self) -> bool {
        matches!(self.kind, ChangeKind::Removed { .. })
    }

    fn sort_key(&self) -> (Uuid, &str, u8, ObjectKind) {
        (self.entity_id, self.attribute().unwrap_or(""), self.kind.rank(), self.object)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ChangeKind::Added { .. } => write!(f, "+ {} {}", self.object, self.entity_id),
            ChangeKind::Removed { .. } => write!(f, "- {} {}", self.object, self.entity_id),
            ChangeKind::Changed {
                attribute,
                old_value,
                new_value,
            } => write!(
                f,
                "~ {} {} {}: {} -> {}",
                self.object, self.entity_id, attribute, old_value, new_value
            ),
        }
    }
}

/// Ordered list of changes, sorted by entity id then attribute name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeList {
    changes: Vec<Change>,
}

impl ChangeList {
    pub fn new(mut changes: Vec<Change>) -> Self {
        changes.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Changes touching one entity
    pub fn for_entity(&self, id: Uuid) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.entity_id == id)
    }

    /// The change list that undoes this one
    pub fn inverted(&self) -> ChangeList {
        ChangeList::new(
            self.changes
                .iter()
                .cloned()
                .map(|c| Change {
                    kind: c.kind.inverted(),
                    ..c
                })
                .collect(),
        )
    }

    /// `(added, removed, changed)` record counts
    pub fn counts(&self) -> (usize, usize, usize) {
        self.changes.iter().fold((0, 0, 0), |(a, r, c), change| match change.kind {
            ChangeKind::Added { .. } => (a + 1, r, c),
            ChangeKind::Removed { .. } => (a, r + 1, c),
            ChangeKind::Changed { .. } => (a, r, c + 1),
        })
    }
}

impl IntoIterator for ChangeList {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeList {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn changed(id: Uuid, attribute: &str, old: Value, new: Value) -> Change {
        Change {
            object: ObjectKind::Table,
            entity_id: id,
            kind: ChangeKind::Changed {
                attribute: attribute.to_string(),
                old_value: old,
                new_value: new,
            },
        }
    }

    #[test]
    fn test_sorted_by_entity_then_attribute() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let list = ChangeList::new(vec![
            changed(b, "name", json!("x"), json!("y")),
            changed(a, "schema", json!(null), json!("s")),
            changed(a, "color", json!("#fff"), json!("#000")),
        ]);
        let keys: Vec<_> = list.iter().map(|c| (c.entity_id, c.attribute().unwrap())).collect();
        assert_eq!(keys, vec![(a, "color"), (a, "schema"), (b, "name")]);
    }

    #[test]
    fn test_inverted_swaps_direction() {
        let id = Uuid::from_u128(7);
        let list = ChangeList::new(vec![
            changed(id, "name", json!("old"), json!("new")),
            Change {
                object: ObjectKind::Field,
                entity_id: Uuid::from_u128(8),
                kind: ChangeKind::Added {
                    parent_id: Some(id),
                    value: json!({"name": "f"}),
                },
            },
        ]);
        let inverted = list.inverted();
        assert_eq!(inverted.counts(), (0, 1, 1));
        assert_eq!(inverted.inverted(), list);
    }

    #[test]
    fn test_serialized_shape() {
        let change = changed(Uuid::nil(), "name", json!("a"), json!("b"));
        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["object"], "table");
        assert_eq!(value["change"], "changed");
        assert_eq!(value["attribute"], "name");
        assert_eq!(value["oldValue"], "a");
        assert_eq!(value["newValue"], "b");
    }
}
