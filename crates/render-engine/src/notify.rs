//! Notification and remote-save collaborators.
//!
//! Both run after artifacts are collected. Their failures are logged and
//! never block delivery.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use certforge_common::clock::now_rfc3339;
use certforge_common::error::{CertforgeError, CertforgeResult};
use serde::{Deserialize, Serialize};

use crate::archive::Artifact;

/// Per-artifact email outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    /// No email requested or no recipient in the row.
    Skipped,
}

/// Sends a generated artifact to its recipient.
#[async_trait]
pub trait Notifier: Send {
    async fn notify(&mut self, recipient: &str, artifact: &Artifact) -> CertforgeResult<()>;
}

/// Persists job results somewhere outside the local delivery.
#[async_trait]
pub trait RemoteSaver: Send {
    async fn save(&mut self, job_name: &str, artifacts: &[Artifact]) -> CertforgeResult<()>;
}

/// A message queued by [`OutboxNotifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub recipient: String,
    pub attachment: String,
    pub row_index: usize,
    pub queued_at: String,
}

/// Writes one JSON message per notification into an outbox directory,
/// with the attachment next to it.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn notify(&mut self, recipient: &str, artifact: &Artifact) -> CertforgeResult<()> {
        if !recipient.contains('@') {
            return Err(CertforgeError::notification(format!(
                "Invalid recipient address: {recipient}"
            )));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let attachment = self.dir.join(&artifact.name);
        tokio::fs::write(&attachment, &artifact.bytes).await?;

        let message = OutboxMessage {
            recipient: recipient.to_string(),
            attachment: artifact.name.clone(),
            row_index: artifact.row_index,
            queued_at: now_rfc3339(),
        };
        let path = self.dir.join(format!("{}.json", artifact.name));
        tokio::fs::write(&path, serde_json::to_vec_pretty(&message)?).await?;

        tracing::debug!(recipient, attachment = %artifact.name, "Queued notification");
        Ok(())
    }
}

/// Job summary written by [`DirectoryRemoteSaver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedJob {
    pub job_name: String,
    pub saved_at: String,
    pub artifacts: Vec<SavedArtifact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedArtifact {
    pub name: String,
    pub row_index: usize,
    pub size_bytes: usize,
    pub email_status: EmailStatus,
}

/// Copies artifacts plus a JSON manifest into `<root>/<job_name>/`.
#[derive(Debug, Clone)]
pub struct DirectoryRemoteSaver {
    root: PathBuf,
}

impl DirectoryRemoteSaver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl RemoteSaver for DirectoryRemoteSaver {
    async fn save(&mut self, job_name: &str, artifacts: &[Artifact]) -> CertforgeResult<()> {
        let dir = self.root.join(job_name);
        tokio::fs::create_dir_all(&dir).await?;
        for artifact in artifacts {
            tokio::fs::write(dir.join(&artifact.name), &artifact.bytes).await?;
        }

        let manifest = SavedJob {
            job_name: job_name.to_string(),
            saved_at: now_rfc3339(),
            artifacts: artifacts
                .iter()
                .map(|a| SavedArtifact {
                    name: a.name.clone(),
                    row_index: a.row_index,
                    size_bytes: a.bytes.len(),
                    email_status: a.email_status,
                })
                .collect(),
        };
        tokio::fs::write(
            dir.join("manifest.json"),
            serde_json::to_vec_pretty(&manifest)?,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::ArtifactKind;

    fn artifact() -> Artifact {
        Artifact {
            name: "01_Alice.pdf".to_string(),
            kind: ArtifactKind::Pdf,
            bytes: b"%PDF".to_vec(),
            row_index: 0,
            recipient: Some("alice@example.com".to_string()),
            email_status: EmailStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_outbox_writes_message_and_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let mut notifier = OutboxNotifier::new(dir.path());
        notifier
            .notify("alice@example.com", &artifact())
            .await
            .unwrap();

        let message: OutboxMessage = serde_json::from_slice(
            &std::fs::read(dir.path().join("01_Alice.pdf.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(message.recipient, "alice@example.com");
        assert_eq!(message.attachment, "01_Alice.pdf");
        assert!(dir.path().join("01_Alice.pdf").exists());
    }

    #[tokio::test]
    async fn test_outbox_rejects_bad_address() {
        let dir = tempfile::tempdir().unwrap();
        let mut notifier = OutboxNotifier::new(dir.path());
        assert!(notifier.notify("not-an-address", &artifact()).await.is_err());
    }

    #[tokio::test]
    async fn test_remote_saver_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut saver = DirectoryRemoteSaver::new(dir.path());
        saver.save("Workshop", &[artifact()]).await.unwrap();

        let manifest: SavedJob = serde_json::from_slice(
            &std::fs::read(dir.path().join("Workshop").join("manifest.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest.artifacts.len(), 1);
        assert_eq!(manifest.artifacts[0].size_bytes, 4);
    }
}
