//! Core domain layer for confgen.
//!
//! This module contains the variable-state rules with no I/O. Template
//! parsing, rendering and storage are reached only through the ports in
//! `crate::application`.
//!
//! ## Rules the domain enforces
//!
//! - **Coverage**: after a reconciliation the store's names are exactly the
//!   schema's names
//! - **All or nothing**: reconciliation and merges compute a full replacement
//!   store; errors leave the live store untouched
//! - **Enumerated edits**: the store changes only through its mutators
//! - **No async**: everything here is synchronous

pub mod error;
pub mod merge;
pub mod reconcile;
pub mod schema;
pub mod store;
pub mod value;

mod validation;

pub use error::{DomainError, ErrorCategory};
pub use merge::{MergeChoice, MergeChoiceProvider, MergeOutcome, MergeRequest, MergeResolver};
pub use reconcile::{ItemCountPolicy, ItemCountProvider, Reconciler};
pub use schema::{VariableKind, VariableSchema};
pub use store::{Snapshot, VariableStore};
pub use value::{ListItem, RawValues, VariableValue};

pub use validation::DomainValidator;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ========================================================================
    // End-to-end domain scenarios
    // ========================================================================

    fn disks_schema() -> VariableSchema {
        VariableSchema::new(["host"], [("disks".to_string(), vec!["name", "size"])])
    }

    #[test]
    fn scenario_reconcile_fills_empty_list_with_one_item() {
        // store {host: "", disks: []} reconciled with the default count
        let empty = Reconciler::new(ItemCountPolicy::Empty)
            .reconcile(&VariableStore::new(), &disks_schema())
            .unwrap();
        assert!(empty.get("disks").unwrap().as_list().unwrap().is_empty());

        let filled = Reconciler::default()
            .reconcile(&empty, &disks_schema())
            .unwrap();
        assert_eq!(
            filled.get("disks").unwrap().as_list().unwrap(),
            [ListItem::blank(["name", "size"])]
        );
    }

    #[test]
    fn scenario_overwrite_versus_merge() {
        let schema = VariableSchema::new(["host"], Vec::<(String, Vec<String>)>::new());
        let mut store = Reconciler::default()
            .reconcile(&VariableStore::new(), &schema)
            .unwrap();
        store.set_scalar("host", "a").unwrap();
        let incoming: RawValues = serde_json::from_value(json!({"host": "b"})).unwrap();

        let (overwritten, _) = MergeResolver
            .resolve(&store, &incoming, MergeChoice::Overwrite)
            .unwrap();
        assert_eq!(overwritten.get("host").unwrap().as_scalar(), Some("b"));

        let (merged, _) = MergeResolver
            .resolve(&store, &incoming, MergeChoice::Merge)
            .unwrap();
        assert_eq!(merged.get("host").unwrap().as_scalar(), Some("a"));
    }

    #[test]
    fn snapshot_serializes_as_plain_mapping() {
        let store = Reconciler::default()
            .reconcile(&VariableStore::new(), &disks_schema())
            .unwrap();
        let json = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(
            json,
            json!({"host": "", "disks": [{"name": "", "size": ""}]})
        );
    }
}
