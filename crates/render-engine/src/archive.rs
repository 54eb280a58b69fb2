//! Artifact collection, packaging, and delivery.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use certforge_common::error::{CertforgeError, CertforgeResult};
use zip::write::SimpleFileOptions;

use crate::encode::ArtifactKind;
use crate::notify::EmailStatus;

/// One generated file.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
    /// Index of the data row that produced it.
    pub row_index: usize,
    /// Email address to notify, if an email column is mapped.
    pub recipient: Option<String>,
    pub email_status: EmailStatus,
}

/// Artifacts of one job, in row order, with unique names.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
    names: HashSet<String>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact, suffixing `_2`, `_3`, ... to a name already taken.
    ///
    /// Returns the name the artifact was stored under.
    pub fn push(&mut self, mut artifact: Artifact) -> String {
        if self.names.contains(&artifact.name) {
            let unique = self.unique_name(&artifact.name);
            tracing::warn!(
                row = artifact.row_index,
                original = %artifact.name,
                renamed = %unique,
                "Duplicate artifact name"
            );
            artifact.name = unique;
        }
        self.names.insert(artifact.name.clone());
        let name = artifact.name.clone();
        self.artifacts.push(artifact);
        name
    }

    fn unique_name(&self, name: &str) -> String {
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{ext}")),
            None => (name, String::new()),
        };
        (2..)
            .map(|n| format!("{stem}_{n}{ext}"))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.artifacts.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Artifact> {
        self.artifacts.iter_mut()
    }

    pub fn as_slice(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn as_mut_slice(&mut self) -> &mut [Artifact] {
        &mut self.artifacts
    }

    pub fn into_vec(self) -> Vec<Artifact> {
        self.artifacts
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.iter()
    }
}

/// Bundles artifacts into a single blob.
pub trait Packager: Send {
    fn package(&self, artifacts: &[Artifact]) -> CertforgeResult<Vec<u8>>;

    /// File extension of the produced blob.
    fn extension(&self) -> &str;
}

/// Deflate-compressed zip archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackager;

impl Packager for ZipPackager {
    fn package(&self, artifacts: &[Artifact]) -> CertforgeResult<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for artifact in artifacts {
            writer
                .start_file(artifact.name.as_str(), options)
                .map_err(|e| CertforgeError::archive(format!("{}: {e}", artifact.name)))?;
            writer.write_all(&artifact.bytes)?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| CertforgeError::archive(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    fn extension(&self) -> &str {
        "zip"
    }
}

/// Hands finished blobs to the user.
pub trait Delivery: Send {
    /// Deliver `bytes` under `suggested_name`, returning where it went.
    fn deliver(&mut self, bytes: &[u8], suggested_name: &str) -> CertforgeResult<PathBuf>;
}

/// Writes deliveries into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    root: PathBuf,
    delivered: Vec<PathBuf>,
}

impl DirectoryDelivery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            delivered: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths written so far.
    pub fn delivered(&self) -> &[PathBuf] {
        &self.delivered
    }
}

impl Delivery for DirectoryDelivery {
    fn deliver(&mut self, bytes: &[u8], suggested_name: &str) -> CertforgeResult<PathBuf> {
        let file_name = Path::new(suggested_name)
            .file_name()
            .ok_or_else(|| CertforgeError::delivery(format!("Invalid name: {suggested_name}")))?;
        std::fs::create_dir_all(&self.root)?;
        let path = self.root.join(file_name);
        std::fs::write(&path, bytes).map_err(|e| {
            CertforgeError::delivery(format!("Failed to write {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Delivered");
        self.delivered.push(path.clone());
        Ok(path)
    }
}
