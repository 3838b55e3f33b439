//! Workspace directory adapter using tokio::fs.
//!
//! Layout under the root:
//!
//! ```text
//! <root>/templates/   template texts, stored verbatim
//! <root>/variables/   value sets, YAML mappings of name -> value
//! <root>/saved/       rendered outputs
//! ```

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use confgen_core::{
    application::{ApplicationError, PersistenceErrorKind, PersistenceService, PortResult},
    domain::{RawValues, Snapshot},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, instrument};

use crate::names::validate_name;

pub const TEMPLATES_DIR: &str = "templates";
pub const VALUES_DIR: &str = "variables";
pub const OUTPUT_DIR: &str = "saved";

/// Which workspace directory an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Template,
    Values,
    Output,
}

impl EntryKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Template => TEMPLATES_DIR,
            Self::Values => VALUES_DIR,
            Self::Output => OUTPUT_DIR,
        }
    }
}

/// Production persistence rooted at a workspace directory.
#[derive(Debug, Clone)]
pub struct FsPersistence {
    root: PathBuf,
}

impl FsPersistence {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, kind: EntryKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Create the three workspace directories.
    #[instrument(skip_all, fields(root = %self.root.display()))]
    pub async fn init(&self) -> PortResult<()> {
        for kind in [EntryKind::Template, EntryKind::Values, EntryKind::Output] {
            let dir = self.dir(kind);
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| map_io_error(kind.dir_name(), e, "create directory"))?;
        }
        debug!("Workspace directories ready");
        Ok(())
    }

    /// Copy an outside file into the workspace under its own file name.
    ///
    /// Returns the stored name.
    #[instrument(skip_all, fields(source = %source.display()))]
    pub async fn import(&self, kind: EntryKind, source: &Path) -> PortResult<String> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ApplicationError::persistence(
                    source.display().to_string(),
                    PersistenceErrorKind::InvalidName,
                    "path has no usable file name",
                )
            })?;
        validate_name(&name)?;

        let content = fs::read_to_string(source)
            .await
            .map_err(|e| map_io_error(&source.display().to_string(), e, "read file"))?;
        if kind == EntryKind::Values {
            parse_values(&name, &content)?;
        }
        self.write(kind, &name, &content).await?;
        Ok(name)
    }

    /// Path of a stored entry, after name validation.
    pub fn path_of(&self, kind: EntryKind, name: &str) -> PortResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir(kind).join(name))
    }

    async fn read(&self, kind: EntryKind, name: &str) -> PortResult<String> {
        let path = self.path_of(kind, name)?;
        fs::read_to_string(&path)
            .await
            .map_err(|e| map_io_error(name, e, "read file"))
    }

    async fn write(&self, kind: EntryKind, name: &str, content: &str) -> PortResult<()> {
        let path = self.path_of(kind, name)?;
        fs::create_dir_all(self.dir(kind))
            .await
            .map_err(|e| map_io_error(name, e, "create directory"))?;
        fs::write(&path, content)
            .await
            .map_err(|e| map_io_error(name, e, "write file"))?;
        debug!(path = %path.display(), bytes = content.len(), "Wrote file");
        Ok(())
    }

    async fn list(&self, kind: EntryKind) -> PortResult<Vec<String>> {
        let dir = self.dir(kind);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(map_io_error(kind.dir_name(), e, "list directory")),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| map_io_error(kind.dir_name(), e, "list directory"))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl PersistenceService for FsPersistence {
    #[instrument(skip(self))]
    async fn load_values(&self, name: &str) -> PortResult<RawValues> {
        let content = self.read(EntryKind::Values, name).await?;
        parse_values(name, &content)
    }

    #[instrument(skip(self, snapshot), fields(names = snapshot.len()))]
    async fn save_values(&self, name: &str, snapshot: &Snapshot) -> PortResult<()> {
        let yaml = serde_yaml::to_string(snapshot).map_err(|e| {
            ApplicationError::persistence(name, PersistenceErrorKind::Format, e.to_string())
        })?;
        self.write(EntryKind::Values, name, &yaml).await
    }

    #[instrument(skip(self))]
    async fn load_template(&self, name: &str) -> PortResult<String> {
        self.read(EntryKind::Template, name).await
    }

    #[instrument(skip(self, text))]
    async fn save_template(&self, name: &str, text: &str) -> PortResult<()> {
        self.write(EntryKind::Template, name, text).await
    }

    async fn list_templates(&self) -> PortResult<Vec<String>> {
        self.list(EntryKind::Template).await
    }

    async fn list_values(&self) -> PortResult<Vec<String>> {
        self.list(EntryKind::Values).await
    }

    #[instrument(skip(self, text))]
    async fn save_output(&self, name: &str, text: &str) -> PortResult<()> {
        self.write(EntryKind::Output, name, text).await
    }

    #[instrument(skip(self, text))]
    async fn append_output(&self, name: &str, text: &str) -> PortResult<()> {
        let path = self.path_of(EntryKind::Output, name)?;
        fs::create_dir_all(self.dir(EntryKind::Output))
            .await
            .map_err(|e| map_io_error(name, e, "create directory"))?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| map_io_error(name, e, "open file"))?;
        let mut chunk = String::with_capacity(text.len() + 1);
        chunk.push('\n');
        chunk.push_str(text);
        file.write_all(chunk.as_bytes())
            .await
            .map_err(|e| map_io_error(name, e, "append to file"))?;
        file.flush()
            .await
            .map_err(|e| map_io_error(name, e, "append to file"))?;
        Ok(())
    }
}

/// Decode a YAML value set. An empty document is an empty set.
pub(crate) fn parse_values(name: &str, content: &str) -> PortResult<RawValues> {
    if content.trim().is_empty() {
        return Ok(RawValues::new());
    }
    let parsed: Option<RawValues> = serde_yaml::from_str(content).map_err(|e| {
        ApplicationError::persistence(name, PersistenceErrorKind::Format, e.to_string())
    })?;
    Ok(parsed.unwrap_or_default())
}

fn map_io_error(name: &str, e: io::Error, operation: &str) -> ApplicationError {
    let kind = match e.kind() {
        io::ErrorKind::NotFound => PersistenceErrorKind::NotFound,
        _ => PersistenceErrorKind::Io,
    };
    ApplicationError::persistence(name, kind, format!("Failed to {}: {}", operation, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use confgen_core::domain::{ListItem, VariableValue};
    use serde_json::json;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, FsPersistence) {
        let dir = TempDir::new().unwrap();
        let store = FsPersistence::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn values_roundtrip_through_yaml() {
        let (_dir, store) = workspace();
        let mut snapshot = Snapshot::new();
        snapshot.insert("host".into(), VariableValue::from("db01"));
        snapshot.insert(
            "disks".into(),
            VariableValue::List(vec![[("name", "sda"), ("size", "10G")].into_iter().collect::<ListItem>()]),
        );

        store.save_values("db.yaml", &snapshot).await.unwrap();
        let raw = store.load_values("db.yaml").await.unwrap();
        assert_eq!(raw["host"], json!("db01"));
        assert_eq!(raw["disks"], json!([{"name": "sda", "size": "10G"}]));
    }

    #[tokio::test]
    async fn hand_written_yaml_keeps_plain_types() {
        let (dir, store) = workspace();
        std::fs::create_dir_all(dir.path().join(VALUES_DIR)).unwrap();
        std::fs::write(
            dir.path().join(VALUES_DIR).join("site.yaml"),
            "port: 8080\ndebug: true\nnics:\n  - mac: aa:bb\n",
        )
        .unwrap();

        let raw = store.load_values("site.yaml").await.unwrap();
        assert_eq!(raw["port"], json!(8080));
        assert_eq!(raw["debug"], json!(true));
        assert_eq!(raw["nics"][0]["mac"], json!("aa:bb"));
    }

    #[tokio::test]
    async fn empty_value_file_is_empty_set() {
        let (dir, store) = workspace();
        std::fs::create_dir_all(dir.path().join(VALUES_DIR)).unwrap();
        std::fs::write(dir.path().join(VALUES_DIR).join("blank.yaml"), "\n").unwrap();
        assert!(store.load_values("blank.yaml").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_mapping_yaml_is_a_format_error() {
        let (dir, store) = workspace();
        std::fs::create_dir_all(dir.path().join(VALUES_DIR)).unwrap();
        std::fs::write(dir.path().join(VALUES_DIR).join("list.yaml"), "- a\n- b\n").unwrap();
        let err = store.load_values("list.yaml").await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Persistence { kind: PersistenceErrorKind::Format, .. }
        ));
    }

    #[tokio::test]
    async fn missing_entries_are_not_found() {
        let (_dir, store) = workspace();
        assert!(store.load_values("nope.yaml").await.unwrap_err().is_not_found());
        assert!(store.load_template("nope.j2").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn invalid_names_never_touch_disk() {
        let (dir, store) = workspace();
        let err = store.save_template("../escape.j2", "x").await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Persistence { kind: PersistenceErrorKind::InvalidName, .. }
        ));
        assert!(!dir.path().join("escape.j2").exists());
    }

    #[tokio::test]
    async fn templates_list_sorted_and_skip_hidden() {
        let (dir, store) = workspace();
        assert!(store.list_templates().await.unwrap().is_empty());

        store.save_template("b.j2", "{{ x }}").await.unwrap();
        store.save_template("a.j2", "{{ y }}").await.unwrap();
        std::fs::write(dir.path().join(TEMPLATES_DIR).join(".swap"), "").unwrap();
        std::fs::create_dir(dir.path().join(TEMPLATES_DIR).join("sub")).unwrap();

        assert_eq!(store.list_templates().await.unwrap(), vec!["a.j2", "b.j2"]);
        assert_eq!(store.load_template("a.j2").await.unwrap(), "{{ y }}");
    }

    #[tokio::test]
    async fn append_writes_newline_then_text() {
        let (dir, store) = workspace();
        store.save_output("out.cfg", "first").await.unwrap();
        store.append_output("out.cfg", "second").await.unwrap();
        let content = std::fs::read_to_string(dir.path().join(OUTPUT_DIR).join("out.cfg")).unwrap();
        assert_eq!(content, "first\nsecond");
    }

    #[tokio::test]
    async fn init_creates_layout() {
        let (dir, store) = workspace();
        store.init().await.unwrap();
        for sub in [TEMPLATES_DIR, VALUES_DIR, OUTPUT_DIR] {
            assert!(dir.path().join(sub).is_dir());
        }
    }

    #[tokio::test]
    async fn import_copies_and_checks_value_files() {
        let (dir, store) = workspace();
        let outside = TempDir::new().unwrap();
        let good = outside.path().join("edge.yaml");
        std::fs::write(&good, "host: edge01\n").unwrap();
        let bad = outside.path().join("broken.yaml");
        std::fs::write(&bad, "host: [unclosed\n").unwrap();

        assert_eq!(store.import(EntryKind::Values, &good).await.unwrap(), "edge.yaml");
        assert!(dir.path().join(VALUES_DIR).join("edge.yaml").is_file());
        assert!(store.import(EntryKind::Values, &bad).await.is_err());
        assert!(!dir.path().join(VALUES_DIR).join("broken.yaml").exists());
    }
}
