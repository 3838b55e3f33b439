//! Merging a loaded value set into the store.
//!
//! The policy is decided up front by a [`MergeChoiceProvider`]; the resolver
//! then computes the whole replacement store before anything is committed.
//! Decision table per name present in both the schema and the loaded set:
//!
//! | Choice      | Scalar                                   | List                               |
//! |-------------|------------------------------------------|------------------------------------|
//! | `cancel`    | unchanged                                | unchanged                          |
//! | `overwrite` | incoming                                 | incoming, replaced wholesale       |
//! | `merge`     | incoming if current is blank and incoming is not | incoming if it has items   |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    error::DomainError,
    schema::VariableKind,
    store::VariableStore,
    value::{RawValues, VariableValue},
};

/// How a loaded value set combines with the current values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeChoice {
    Overwrite,
    Merge,
    Cancel,
}

impl MergeChoice {
    pub const ALL: [MergeChoice; 3] = [Self::Overwrite, Self::Merge, Self::Cancel];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Merge => "merge",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for MergeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" | "o" => Ok(Self::Overwrite),
            "merge" | "m" => Ok(Self::Merge),
            "cancel" | "c" => Ok(Self::Cancel),
            other => Err(format!(
                "unknown merge choice '{}' (expected overwrite, merge or cancel)",
                other
            )),
        }
    }
}

/// What the choice provider gets to look at before deciding.
#[derive(Debug, Clone, Copy)]
pub struct MergeRequest<'a> {
    /// Name of the value set being loaded.
    pub source: &'a str,
    /// Loaded names that the current schema declares.
    pub matching: usize,
    /// Loaded names the current schema does not declare (ignored).
    pub ignored: usize,
}

/// Synchronous decision point standing in for an interactive prompt.
///
/// Closures `Fn(&MergeRequest<'_>) -> MergeChoice` implement it, and so does
/// a bare [`MergeChoice`] (always the same answer).
pub trait MergeChoiceProvider {
    fn choose(&self, request: &MergeRequest<'_>) -> MergeChoice;
}

impl<F> MergeChoiceProvider for F
where
    F: Fn(&MergeRequest<'_>) -> MergeChoice,
{
    fn choose(&self, request: &MergeRequest<'_>) -> MergeChoice {
        self(request)
    }
}

impl MergeChoiceProvider for MergeChoice {
    fn choose(&self, _request: &MergeRequest<'_>) -> MergeChoice {
        *self
    }
}

/// Result of resolving one loaded value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub choice: MergeChoice,
    /// Names whose value the merge replaced.
    pub replaced: Vec<String>,
    /// Loaded names absent from the schema.
    pub ignored: Vec<String>,
}

/// Applies a [`MergeChoice`] to a loaded value set.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeResolver;

impl MergeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Describe `incoming` relative to the current schema.
    pub fn request<'a>(&self, source: &'a str, current: &VariableStore, incoming: &RawValues) -> MergeRequest<'a> {
        let matching = incoming
            .keys()
            .filter(|k| current.schema().contains(k))
            .count();
        MergeRequest {
            source,
            matching,
            ignored: incoming.len() - matching,
        }
    }

    /// Compute the replacement store for `choice`.
    ///
    /// Every incoming value of a declared name is type-checked first; one
    /// malformed value aborts the whole merge.
    pub fn resolve(
        &self,
        current: &VariableStore,
        incoming: &RawValues,
        choice: MergeChoice,
    ) -> Result<(VariableStore, MergeOutcome), DomainError> {
        let schema = current.schema();
        let mut outcome = MergeOutcome {
            choice,
            replaced: Vec::new(),
            ignored: incoming
                .keys()
                .filter(|k| !schema.contains(k))
                .cloned()
                .collect(),
        };

        let mut converted = Vec::new();
        for (name, raw) in incoming {
            let value = match schema.kind_of(name) {
                Some(VariableKind::Scalar) => VariableValue::scalar_from_raw(name, raw)?,
                Some(VariableKind::List) => {
                    let fields = schema.fields(name).unwrap_or_default();
                    VariableValue::list_from_raw(name, raw, fields)?
                }
                None => continue,
            };
            converted.push((name, value));
        }

        let mut values = current.values().clone();
        if choice != MergeChoice::Cancel {
            for (name, value) in converted {
                let Some(slot) = values.get_mut(name.as_str()) else {
                    continue;
                };
                if Self::takes(choice, slot, &value) {
                    *slot = value;
                    outcome.replaced.push(name.clone());
                }
            }
        }

        debug!(
            choice = %choice,
            replaced = outcome.replaced.len(),
            ignored = outcome.ignored.len(),
            "Resolved loaded value set"
        );

        Ok((VariableStore::from_parts(schema.clone(), values), outcome))
    }

    /// Whether `incoming` replaces `current` under `choice`.
    pub fn takes(choice: MergeChoice, current: &VariableValue, incoming: &VariableValue) -> bool {
        match choice {
            MergeChoice::Cancel => false,
            MergeChoice::Overwrite => true,
            MergeChoice::Merge => match (current, incoming) {
                (VariableValue::Scalar(_), VariableValue::Scalar(_)) => {
                    current.is_blank() && !incoming.as_scalar().unwrap_or_default().is_empty()
                }
                (_, VariableValue::List(items)) => !items.is_empty(),
                (VariableValue::List(_), VariableValue::Scalar(_)) => false,
            },
        }
    }
}
