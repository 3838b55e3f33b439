//! Variable schema extracted from template text.
//!
//! A schema is a plain value: the session receives a fresh one from the
//! schema port after every template edit and hands it to the reconciler.
//! Nothing in the core inspects template text directly.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Whether a declared name holds a single string or a sequence of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Scalar,
    List,
}

impl VariableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::List => "list",
        }
    }
}

impl std::fmt::Display for VariableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared scalar and list variables of a template.
///
/// Scalars keep first-seen order for display; identity comparisons treat
/// them as a set. List fields keep declaration order and are unique per list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableSchema {
    scalars: Vec<String>,
    lists: BTreeMap<String, Vec<String>>,
}

impl VariableSchema {
    /// Build a schema, dropping duplicates.
    ///
    /// A name declared both as scalar and as list is a list: a template
    /// that iterates over a name needs a sequence there.
    pub fn new<S, L, F>(scalars: S, lists: L) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        L: IntoIterator<Item = (String, F)>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        let lists: BTreeMap<String, Vec<String>> = lists
            .into_iter()
            .map(|(name, fields)| {
                let mut seen = BTreeSet::new();
                let fields: Vec<String> = fields
                    .into_iter()
                    .map(Into::into)
                    .filter(|f: &String| seen.insert(f.clone()))
                    .collect();
                (name, fields)
            })
            .collect();

        let mut seen = BTreeSet::new();
        let scalars: Vec<String> = scalars
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !lists.contains_key(s) && seen.insert(s.clone()))
            .collect();

        Self { scalars, lists }
    }

    /// An empty schema (no template loaded yet).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn scalars(&self) -> &[String] {
        &self.scalars
    }

    pub fn lists(&self) -> &BTreeMap<String, Vec<String>> {
        &self.lists
    }

    /// Declared fields of a list, if `name` is a list.
    pub fn fields(&self, name: &str) -> Option<&[String]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    pub fn kind_of(&self, name: &str) -> Option<VariableKind> {
        if self.lists.contains_key(name) {
            Some(VariableKind::List)
        } else if self.scalars.iter().any(|s| s == name) {
            Some(VariableKind::Scalar)
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }

    /// Every declared name, scalars and lists alike.
    pub fn names(&self) -> BTreeSet<&str> {
        self.scalars
            .iter()
            .map(String::as_str)
            .chain(self.lists.keys().map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scalars.len() + self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scalar order is presentation only, so equality ignores it.
impl PartialEq for VariableSchema {
    fn eq(&self, other: &Self) -> bool {
        let mine: BTreeSet<&String> = self.scalars.iter().collect();
        let theirs: BTreeSet<&String> = other.scalars.iter().collect();
        mine == theirs && self.lists == other.lists
    }
}

impl Eq for VariableSchema {}
