//! The live variable store.
//!
//! One owned instance per session. All edits go through the enumerated
//! mutators below; reconciliation and merges build a complete replacement
//! off to the side and swap it in with [`VariableStore::commit`].

use std::collections::BTreeMap;

use crate::domain::{
    error::DomainError,
    schema::{VariableKind, VariableSchema},
    value::{ListItem, VariableValue},
};

/// Serializable copy of every value, handed to render and save calls.
pub type Snapshot = BTreeMap<String, VariableValue>;

/// Current values for every name in the current schema.
///
/// `revision` advances on every successful mutation; the session watches it
/// to drive the dirty state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    schema: VariableSchema,
    values: BTreeMap<String, VariableValue>,
    revision: u64,
}

impl VariableStore {
    /// An empty store with an empty schema (session start).
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(schema: VariableSchema, values: BTreeMap<String, VariableValue>) -> Self {
        Self {
            schema,
            values,
            revision: 0,
        }
    }

    pub fn schema(&self) -> &VariableSchema {
        &self.schema
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, name: &str) -> Result<&VariableValue, DomainError> {
        self.values.get(name).ok_or_else(|| DomainError::unknown(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.values.clone()
    }

    pub(crate) fn values(&self) -> &BTreeMap<String, VariableValue> {
        &self.values
    }

    // ── Mutators ────────────────────────────────────────────────────────────

    pub fn set_scalar(&mut self, name: &str, value: impl Into<String>) -> Result<(), DomainError> {
        if let VariableValue::Scalar(current) = self.slot_mut(name, VariableKind::Scalar)? {
            *current = value.into();
        }
        self.touch();
        Ok(())
    }

    /// Append a blank item; returns its index.
    pub fn add_list_item(&mut self, list: &str) -> Result<usize, DomainError> {
        let fields = self
            .schema
            .fields(list)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        let items = self.items_mut(list)?;
        items.push(ListItem::blank(fields));
        let index = items.len() - 1;
        self.touch();
        Ok(index)
    }

    /// Remove the item at `index`, keeping the order of the rest.
    pub fn remove_list_item(&mut self, list: &str, index: usize) -> Result<ListItem, DomainError> {
        let items = self.items_mut(list)?;
        if index >= items.len() {
            return Err(DomainError::IndexOutOfRange {
                list: list.to_string(),
                index,
                len: items.len(),
            });
        }
        let removed = items.remove(index);
        self.touch();
        Ok(removed)
    }

    pub fn set_list_field(
        &mut self,
        list: &str,
        index: usize,
        field: &str,
        value: impl Into<String>,
    ) -> Result<(), DomainError> {
        let items = self.items_mut(list)?;
        let len = items.len();
        let item = items.get_mut(index).ok_or_else(|| DomainError::IndexOutOfRange {
            list: list.to_string(),
            index,
            len,
        })?;
        if !item.set(field, value.into()) {
            return Err(DomainError::UnknownField {
                list: list.to_string(),
                field: field.to_string(),
            });
        }
        self.touch();
        Ok(())
    }

    /// Swap in a fully computed replacement, keeping the revision sequence.
    ///
    /// Returns `true` when the replacement differs from the current state.
    pub(crate) fn commit(&mut self, next: VariableStore) -> bool {
        let changed = self.schema != next.schema || self.values != next.values;
        self.schema = next.schema;
        self.values = next.values;
        if changed {
            self.touch();
        }
        changed
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn slot_mut(&mut self, name: &str, expected: VariableKind) -> Result<&mut VariableValue, DomainError> {
        let slot = self
            .values
            .get_mut(name)
            .ok_or_else(|| DomainError::unknown(name))?;
        if slot.kind() != expected {
            return Err(DomainError::KindMismatch {
                name: name.to_string(),
                expected: expected.as_str(),
                actual: slot.kind().as_str(),
            });
        }
        Ok(slot)
    }

    fn items_mut(&mut self, list: &str) -> Result<&mut Vec<ListItem>, DomainError> {
        match self.slot_mut(list, VariableKind::List)? {
            VariableValue::List(items) => Ok(items),
            VariableValue::Scalar(_) => Err(DomainError::KindMismatch {
                name: list.to_string(),
                expected: "list",
                actual: "scalar",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VariableStore {
        let schema = VariableSchema::new(["host"], [("disks".to_string(), vec!["name", "size"])]);
        let mut values = BTreeMap::new();
        values.insert("host".to_string(), VariableValue::from(""));
        values.insert("disks".to_string(), VariableValue::List(vec![]));
        VariableStore::from_parts(schema, values)
    }

    #[test]
    fn set_scalar_updates_value_and_revision() {
        let mut s = store();
        s.set_scalar("host", "db01").unwrap();
        assert_eq!(s.get("host").unwrap().as_scalar(), Some("db01"));
        assert_eq!(s.revision(), 1);
    }

    #[test]
    fn unknown_variable_is_rejected_without_mutation() {
        let mut s = store();
        let before = s.clone();
        assert_eq!(
            s.set_scalar("port", "1"),
            Err(DomainError::UnknownVariable { name: "port".into() })
        );
        assert!(matches!(s.add_list_item("nics"), Err(DomainError::UnknownVariable { .. })));
        assert_eq!(s, before);
    }

    #[test]
    fn add_list_item_appends_blank_item() {
        let mut s = store();
        assert_eq!(s.add_list_item("disks").unwrap(), 0);
        assert_eq!(s.add_list_item("disks").unwrap(), 1);
        let items = s.get("disks").unwrap().as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.get("name") == Some("") && i.get("size") == Some("")));
        assert_eq!(s.revision(), 2);
    }

    #[test]
    fn remove_list_item_preserves_order() {
        let mut s = store();
        for name in ["a", "b", "c"] {
            let idx = s.add_list_item("disks").unwrap();
            s.set_list_field("disks", idx, "name", name).unwrap();
        }
        let removed = s.remove_list_item("disks", 1).unwrap();
        assert_eq!(removed.get("name"), Some("b"));
        let names: Vec<_> = s
            .get("disks")
            .unwrap()
            .as_list()
            .unwrap()
            .iter()
            .map(|i| i.get("name").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut s = store();
        s.add_list_item("disks").unwrap();
        let rev = s.revision();
        assert_eq!(
            s.remove_list_item("disks", 3),
            Err(DomainError::IndexOutOfRange {
                list: "disks".into(),
                index: 3,
                len: 1
            })
        );
        assert!(matches!(
            s.set_list_field("disks", 1, "name", "x"),
            Err(DomainError::IndexOutOfRange { .. })
        ));
        assert_eq!(s.revision(), rev);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut s = store();
        s.add_list_item("disks").unwrap();
        assert!(matches!(
            s.set_list_field("disks", 0, "mount", "/"),
            Err(DomainError::UnknownField { .. })
        ));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let mut s = store();
        assert!(matches!(
            s.set_scalar("disks", "x"),
            Err(DomainError::KindMismatch { expected: "scalar", actual: "list", .. })
        ));
        assert!(matches!(
            s.add_list_item("host"),
            Err(DomainError::KindMismatch { expected: "list", .. })
        ));
    }

    #[test]
    fn commit_reports_change_only_when_different() {
        let mut s = store();
        let same = s.clone();
        assert!(!s.commit(same));
        assert_eq!(s.revision(), 0);

        let mut other = s.clone();
        other.values.insert("host".into(), VariableValue::from("x"));
        assert!(s.commit(other));
        assert_eq!(s.revision(), 1);
    }
}
