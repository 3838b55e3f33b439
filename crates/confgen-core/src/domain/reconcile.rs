//! Schema reconciliation.
//!
//! Rules, applied to every name of the *new* schema:
//!
//! | Before                                 | After                              |
//! |----------------------------------------|------------------------------------|
//! | scalar with same name                  | value kept                         |
//! | missing, or a list                     | `""`                               |
//! | non-empty list, identical field set    | kept unchanged                     |
//! | non-empty list, different field set    | items conformed field by field     |
//! | missing, empty, or a scalar            | `initial_count` blank items        |
//!
//! Names not in the new schema are dropped. Running the reconciler twice
//! against the same schema yields the same store.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::domain::{
    error::DomainError,
    schema::VariableSchema,
    store::VariableStore,
    validation::DomainValidator,
    value::{ListItem, VariableValue},
};

/// Hook asked for the starting item count of a list that has no items yet.
///
/// Closures `Fn(&str, &[String]) -> usize` implement it.
pub trait ItemCountProvider: Send + Sync {
    fn initial_count(&self, list: &str, fields: &[String]) -> usize;
}

impl<F> ItemCountProvider for F
where
    F: Fn(&str, &[String]) -> usize + Send + Sync,
{
    fn initial_count(&self, list: &str, fields: &[String]) -> usize {
        self(list, fields)
    }
}

/// How many blank items a new or empty list starts with.
pub enum ItemCountPolicy {
    /// Always start with this many items.
    Fixed(usize),
    /// Start with no items at all.
    Empty,
    /// Ask the hook; an answer of zero falls back to one item.
    Ask(Box<dyn ItemCountProvider>),
}

impl ItemCountPolicy {
    pub fn ask(provider: impl ItemCountProvider + 'static) -> Self {
        Self::Ask(Box::new(provider))
    }

    fn count_for(&self, list: &str, fields: &[String]) -> usize {
        match self {
            Self::Fixed(n) => *n,
            Self::Empty => 0,
            Self::Ask(provider) => match provider.initial_count(list, fields) {
                0 => 1,
                n => n,
            },
        }
    }
}

impl Default for ItemCountPolicy {
    fn default() -> Self {
        Self::Fixed(1)
    }
}

impl fmt::Debug for ItemCountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            Self::Empty => f.write_str("Empty"),
            Self::Ask(_) => f.write_str("Ask(..)"),
        }
    }
}

/// Builds the store that matches a new schema.
#[derive(Debug, Default)]
pub struct Reconciler {
    policy: ItemCountPolicy,
}

impl Reconciler {
    pub fn new(policy: ItemCountPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ItemCountPolicy {
        &self.policy
    }

    /// Compute the replacement store for `schema`.
    ///
    /// `current` is only read; the caller commits the result.
    pub fn reconcile(
        &self,
        current: &VariableStore,
        schema: &VariableSchema,
    ) -> Result<VariableStore, DomainError> {
        DomainValidator::validate_schema(schema)?;

        let previous = current.values();
        let mut next = BTreeMap::new();

        for name in schema.scalars() {
            let value = match previous.get(name) {
                Some(VariableValue::Scalar(s)) => s.clone(),
                _ => String::new(),
            };
            next.insert(name.clone(), VariableValue::Scalar(value));
        }

        for (name, fields) in schema.lists() {
            let items = match previous.get(name) {
                Some(VariableValue::List(items)) if !items.is_empty() => {
                    if items.iter().all(|item| item.has_fields(fields)) {
                        items.clone()
                    } else {
                        debug!(list = %name, "Conforming list items to new field set");
                        items.iter().map(|item| item.conformed_to(fields)).collect()
                    }
                }
                _ => {
                    let count = self.policy.count_for(name, fields);
                    (0..count).map(|_| ListItem::blank(fields.iter().cloned())).collect()
                }
            };
            next.insert(name.clone(), VariableValue::List(items));
        }

        let dropped = previous.keys().filter(|k| !schema.contains(k)).count();
        debug!(
            names = next.len(),
            dropped,
            "Reconciled store against schema"
        );

        Ok(VariableStore::from_parts(schema.clone(), next))
    }
}
