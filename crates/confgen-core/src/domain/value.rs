//! Variable values and loaded (untyped) value sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value as RawValue;

use crate::domain::{error::DomainError, schema::VariableKind};

/// A value set as read from storage, before it is checked against a schema.
pub type RawValues = BTreeMap<String, RawValue>;

/// One item of a list variable: field name → value.
///
/// Always holds exactly the fields its list declares in the current schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListItem(BTreeMap<String, String>);

impl ListItem {
    /// An item with every field set to the empty string.
    pub fn blank<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(|f| (f.into(), String::new())).collect())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub(crate) fn set(&mut self, field: &str, value: String) -> bool {
        match self.0.get_mut(field) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn has_fields(&self, fields: &[String]) -> bool {
        let declared: BTreeSet<&str> = fields.iter().map(String::as_str).collect();
        self.fields().collect::<BTreeSet<_>>() == declared
    }

    /// Keep surviving field values, blank-fill new fields, drop the rest.
    pub(crate) fn conformed_to(&self, fields: &[String]) -> Self {
        Self(
            fields
                .iter()
                .map(|f| (f.clone(), self.0.get(f).cloned().unwrap_or_default()))
                .collect(),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for ListItem
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Current value of one declared variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Scalar(String),
    List(Vec<ListItem>),
}

impl VariableValue {
    pub fn kind(&self) -> VariableKind {
        match self {
            Self::Scalar(_) => VariableKind::Scalar,
            Self::List(_) => VariableKind::List,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ListItem]> {
        match self {
            Self::List(items) => Some(items),
            Self::Scalar(_) => None,
        }
    }

    /// Blank scalar, or a list with no items.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Scalar(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    /// Interpret a loaded scalar.
    ///
    /// Numbers and booleans are stringified and `null` reads as empty;
    /// sequences and mappings are rejected.
    pub fn scalar_from_raw(name: &str, raw: &RawValue) -> Result<Self, DomainError> {
        let value = match raw {
            RawValue::Null => String::new(),
            RawValue::String(s) => s.clone(),
            RawValue::Bool(b) => b.to_string(),
            RawValue::Number(n) => n.to_string(),
            RawValue::Array(_) | RawValue::Object(_) => {
                return Err(DomainError::malformed(name, "expected a scalar value"));
            }
        };
        Ok(Self::Scalar(value))
    }

    /// Interpret a loaded list, conforming every item to `fields`.
    ///
    /// `null` reads as an empty list. Item fields that are not declared are
    /// dropped; declared fields missing from an item become empty strings.
    pub fn list_from_raw(name: &str, raw: &RawValue, fields: &[String]) -> Result<Self, DomainError> {
        let entries = match raw {
            RawValue::Null => return Ok(Self::List(Vec::new())),
            RawValue::Array(entries) => entries,
            _ => return Err(DomainError::malformed(name, "expected a sequence of items")),
        };

        let mut items = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            let map = match entry {
                RawValue::Object(map) => map,
                RawValue::Array(_) => {
                    return Err(DomainError::malformed(
                        name,
                        format!("item {} is not a mapping", idx),
                    ));
                }
                _ => {
                    return Err(DomainError::malformed(
                        name,
                        format!(
                            "item {} is a plain value; lists of plain values are not supported, \
                             each item must map field names to values",
                            idx
                        ),
                    ));
                }
            };
            let mut item = ListItem::blank(fields.iter().cloned());
            for field in fields {
                if let Some(raw_field) = map.get(field) {
                    match Self::scalar_from_raw(field, raw_field) {
                        Ok(Self::Scalar(s)) => {
                            item.set(field, s);
                        }
                        _ => {
                            return Err(DomainError::malformed(
                                name,
                                format!("item {} field '{}' is not a scalar", idx, field),
                            ));
                        }
                    }
                }
            }
            items.push(item);
        }
        Ok(Self::List(items))
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<ListItem>> for VariableValue {
    fn from(items: Vec<ListItem>) -> Self {
        Self::List(items)
    }
}
