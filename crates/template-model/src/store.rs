//! Template persistence.
//!
//! A [`TemplateStore`] keeps documents under opaque ids. Saving a document and
//! loading it back yields a structurally equal document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// Identifier assigned by a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTemplate {
    pub id: TemplateId,
    pub document: Document,
}

/// Template storage backend.
pub trait TemplateStore {
    /// All stored templates, most recently edited first.
    fn list(&self) -> Result<Vec<StoredTemplate>, TemplateError>;

    fn load(&self, id: &TemplateId) -> Result<Document, TemplateError>;

    /// Store a new template and return its id.
    fn save(&mut self, document: &Document) -> Result<TemplateId, TemplateError>;

    /// Replace an existing template.
    fn update(&mut self, id: &TemplateId, document: &Document) -> Result<(), TemplateError>;

    fn delete(&mut self, id: &TemplateId) -> Result<(), TemplateError>;
}

/// Stores one pretty-printed JSON file per template in a directory.
#[derive(Debug, Clone)]
pub struct DirTemplateStore {
    root: PathBuf,
}

impl DirTemplateStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| TemplateError::IoError {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `id`. Ids that could name a file outside the store root
    /// are rejected.
    fn path_for(&self, id: &TemplateId) -> Result<PathBuf, TemplateError> {
        let raw = id.as_str();
        if raw.is_empty() || raw.starts_with('.') || raw.contains(['/', '\\']) {
            return Err(TemplateError::ValidationError {
                message: format!("invalid template id '{raw}'"),
            });
        }
        Ok(self.root.join(format!("{raw}.json")))
    }

    fn write(&self, id: &TemplateId, document: &Document) -> Result<(), TemplateError> {
        let path = self.path_for(id)?;
        let json =
            serde_json::to_string_pretty(document).map_err(|e| TemplateError::ParseError {
                path: path.clone(),
                source: e,
            })?;
        std::fs::write(&path, json).map_err(|e| TemplateError::IoError { path, source: e })
    }
}

impl TemplateStore for DirTemplateStore {
    fn list(&self) -> Result<Vec<StoredTemplate>, TemplateError> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| TemplateError::IoError {
            path: self.root.clone(),
            source: e,
        })?;

        let mut templates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TemplateError::IoError {
                path: self.root.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match read_document(&path) {
                Ok(document) => templates.push(StoredTemplate {
                    id: TemplateId::new(stem),
                    document,
                }),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable template"),
            }
        }

        sort_recent_first(&mut templates);
        Ok(templates)
    }

    fn load(&self, id: &TemplateId) -> Result<Document, TemplateError> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(TemplateError::NotFound { id: id.clone() });
        }
        read_document(&path)
    }

    fn save(&mut self, document: &Document) -> Result<TemplateId, TemplateError> {
        let id = TemplateId::generate();
        self.write(&id, document)?;
        tracing::debug!(id = %id, title = %document.title, "Saved template");
        Ok(id)
    }

    fn update(&mut self, id: &TemplateId, document: &Document) -> Result<(), TemplateError> {
        if !self.path_for(id)?.exists() {
            return Err(TemplateError::NotFound { id: id.clone() });
        }
        self.write(id, document)
    }

    fn delete(&mut self, id: &TemplateId) -> Result<(), TemplateError> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(TemplateError::NotFound { id: id.clone() });
        }
        std::fs::remove_file(&path).map_err(|e| TemplateError::IoError { path, source: e })
    }
}

/// In-memory store, mainly for tests and previews.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateStore {
    templates: BTreeMap<TemplateId, Document>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn list(&self) -> Result<Vec<StoredTemplate>, TemplateError> {
        let mut templates: Vec<StoredTemplate> = self
            .templates
            .iter()
            .map(|(id, document)| StoredTemplate {
                id: id.clone(),
                document: document.clone(),
            })
            .collect();
        sort_recent_first(&mut templates);
        Ok(templates)
    }

    fn load(&self, id: &TemplateId) -> Result<Document, TemplateError> {
        self.templates
            .get(id)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound { id: id.clone() })
    }

    fn save(&mut self, document: &Document) -> Result<TemplateId, TemplateError> {
        let id = TemplateId::generate();
        self.templates.insert(id.clone(), document.clone());
        Ok(id)
    }

    fn update(&mut self, id: &TemplateId, document: &Document) -> Result<(), TemplateError> {
        match self.templates.get_mut(id) {
            Some(slot) => {
                *slot = document.clone();
                Ok(())
            }
            None => Err(TemplateError::NotFound { id: id.clone() }),
        }
    }

    fn delete(&mut self, id: &TemplateId) -> Result<(), TemplateError> {
        self.templates
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TemplateError::NotFound { id: id.clone() })
    }
}

/// Read a single template file.
pub fn read_document(path: impl AsRef<Path>) -> Result<Document, TemplateError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| TemplateError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| TemplateError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a single template file, creating parent directories.
pub fn write_document(path: impl AsRef<Path>, document: &Document) -> Result<(), TemplateError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TemplateError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let json = serde_json::to_string_pretty(document).map_err(|e| TemplateError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| TemplateError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn sort_recent_first(templates: &mut [StoredTemplate]) {
    // Unparsable timestamps sort last.
    let edited_at = |t: &StoredTemplate| {
        chrono::DateTime::parse_from_rfc3339(&t.document.last_edited_at)
            .ok()
            .map(|d| d.with_timezone(&chrono::Utc))
    };
    templates.sort_by(|a, b| {
        edited_at(b)
            .cmp(&edited_at(a))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Errors that can occur when reading or storing templates.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Template not found: {id}")]
    NotFound { id: TemplateId },

    #[error("Invalid template: {message}")]
    ValidationError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, Shape};

    fn sample() -> Document {
        let mut doc = Document::new("Workshop Certificate", &["name".to_string()]);
        doc.insert(Element::new(Shape::Circle { radius: 50.0 }, 100.0, 120.0));
        doc
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryTemplateStore::new();
        let doc = sample();
        let id = store.save(&doc).unwrap();
        assert_eq!(store.load(&id).unwrap(), doc);
        assert_eq!(store.list().unwrap().len(), 1);
        store.delete(&id).unwrap();
        assert!(matches!(
            store.load(&id),
            Err(TemplateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_dir_store_round_trip_and_update() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirTemplateStore::open(dir.path()).unwrap();
        let mut doc = sample();
        let id = store.save(&doc).unwrap();
        assert_eq!(store.load(&id).unwrap(), doc);

        doc.title = "Renamed".to_string();
        store.update(&id, &doc).unwrap();
        assert_eq!(store.load(&id).unwrap().title, "Renamed");

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);

        store.delete(&id).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_dir_store_rejects_ids_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("store");
        std::fs::write(dir.path().join("outside.json"), "{}").unwrap();
        let mut store = DirTemplateStore::open(&nested).unwrap();

        for raw in ["../outside", "..", "a/b", "a\\b", ".hidden", ""] {
            let id = TemplateId::new(raw);
            assert!(
                matches!(store.load(&id), Err(TemplateError::ValidationError { .. })),
                "load accepted {raw:?}"
            );
            assert!(matches!(
                store.update(&id, &sample()),
                Err(TemplateError::ValidationError { .. })
            ));
            assert!(matches!(
                store.delete(&id),
                Err(TemplateError::ValidationError { .. })
            ));
        }
        assert!(dir.path().join("outside.json").exists());
    }

    #[test]
    fn test_update_missing_template_fails() {
        let mut store = MemoryTemplateStore::new();
        let result = store.update(&TemplateId::new("nope"), &sample());
        assert!(matches!(result, Err(TemplateError::NotFound { .. })));
    }
}
