//! In-memory persistence adapter for testing.

use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use confgen_core::{
    application::{ApplicationError, PersistenceErrorKind, PersistenceService, PortResult},
    domain::{RawValues, Snapshot},
};

use crate::names::validate_name;

/// In-memory persistence; clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    inner: Arc<RwLock<MemoryPersistenceInner>>,
}

#[derive(Debug, Default)]
struct MemoryPersistenceInner {
    values: BTreeMap<String, RawValues>,
    templates: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a template (testing helper).
    pub fn with_template(self, name: &str, text: &str) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.templates.insert(name.to_string(), text.to_string());
        }
        self
    }

    /// Seed a value set (testing helper).
    pub fn with_values(self, name: &str, values: RawValues) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.values.insert(name.to_string(), values);
        }
        self
    }

    /// Read a rendered output (testing helper).
    pub fn output(&self, name: &str) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner.outputs.get(name).cloned()
    }

    fn read(&self) -> PortResult<RwLockReadGuard<'_, MemoryPersistenceInner>> {
        self.inner.read().map_err(|_| lock_error())
    }

    fn write(&self) -> PortResult<RwLockWriteGuard<'_, MemoryPersistenceInner>> {
        self.inner.write().map_err(|_| lock_error())
    }
}

#[async_trait]
impl PersistenceService for MemoryPersistence {
    async fn load_values(&self, name: &str) -> PortResult<RawValues> {
        validate_name(name)?;
        self.read()?
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| ApplicationError::not_found(name))
    }

    async fn save_values(&self, name: &str, snapshot: &Snapshot) -> PortResult<()> {
        validate_name(name)?;
        let raw = serde_json::to_value(snapshot)
            .and_then(serde_json::from_value::<RawValues>)
            .map_err(|e| {
                ApplicationError::persistence(name, PersistenceErrorKind::Format, e.to_string())
            })?;
        self.write()?.values.insert(name.to_string(), raw);
        Ok(())
    }

    async fn load_template(&self, name: &str) -> PortResult<String> {
        validate_name(name)?;
        self.read()?
            .templates
            .get(name)
            .cloned()
            .ok_or_else(|| ApplicationError::not_found(name))
    }

    async fn save_template(&self, name: &str, text: &str) -> PortResult<()> {
        validate_name(name)?;
        self.write()?
            .templates
            .insert(name.to_string(), text.to_string());
        Ok(())
    }

    async fn list_templates(&self) -> PortResult<Vec<String>> {
        Ok(self.read()?.templates.keys().cloned().collect())
    }

    async fn list_values(&self) -> PortResult<Vec<String>> {
        Ok(self.read()?.values.keys().cloned().collect())
    }

    async fn save_output(&self, name: &str, text: &str) -> PortResult<()> {
        validate_name(name)?;
        self.write()?
            .outputs
            .insert(name.to_string(), text.to_string());
        Ok(())
    }

    async fn append_output(&self, name: &str, text: &str) -> PortResult<()> {
        validate_name(name)?;
        let mut inner = self.write()?;
        let entry = inner.outputs.entry(name.to_string()).or_default();
        entry.push('\n');
        entry.push_str(text);
        Ok(())
    }
}

fn lock_error() -> ApplicationError {
    ApplicationError::persistence("memory", PersistenceErrorKind::Io, "store lock poisoned")
}
