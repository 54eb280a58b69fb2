//! Batch generation of certificates from a data table.
//!
//! [`BatchGenerator`] renders one artifact set per data row on a single
//! [`RenderSurface`], strictly in row order. A failing row is logged and
//! skipped; losing the surface fails the whole job.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use certforge_common::clock::{log_stamp, JobClock};
use certforge_common::config::{GenerationDefaults, PageSize};
use certforge_common::error::{CertforgeError, CertforgeResult};
use certforge_template_model::{DataRow, DataTable, Document, VariableMapping};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::archive::{Artifact, ArtifactSet, Delivery, Packager, ZipPackager};
use crate::encode::{encode_pdf, ArtifactKind};
use crate::naming::{name_for, sanitize};
use crate::notify::{EmailStatus, Notifier, RemoteSaver};
use crate::substitute::instantiate;
use crate::surface::{RasterCapture, RenderSurface, SurfaceError};
use crate::svg;

/// What to produce and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Artifact kinds produced per row, in order.
    pub kinds: Vec<ArtifactKind>,
    /// Bundle all artifacts into one archive instead of delivering them one by one.
    pub archive: bool,
    /// Archive name without extension.
    pub archive_name: String,
    pub capture_scale: f32,
    pub page: PageSize,
    /// Send each row's first artifact to the address in `email_column`.
    pub send_email: bool,
    pub email_column: Option<String>,
    /// Hand the finished artifacts to the remote saver.
    pub remote_save: bool,
}

impl GenerationOptions {
    pub fn from_defaults(defaults: &GenerationDefaults) -> Self {
        Self {
            kinds: vec![ArtifactKind::Pdf],
            archive: true,
            archive_name: defaults.archive_name.clone(),
            capture_scale: defaults.capture_scale,
            page: defaults.page,
            send_email: false,
            email_column: None,
            remote_save: false,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::from_defaults(&GenerationDefaults::default())
    }
}

/// A template, the data to fill it with, and the output options.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub document: Option<Document>,
    pub table: DataTable,
    pub mapping: VariableMapping,
    pub options: GenerationOptions,
}

impl GenerationJob {
    pub fn new(document: Document, table: DataTable, mapping: VariableMapping) -> Self {
        Self {
            document: Some(document),
            table,
            mapping,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Check the job can start, returning the template.
    pub fn validate(&self) -> CertforgeResult<&Document> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| CertforgeError::validation("No template selected"))?;
        if self.table.is_empty() {
            return Err(CertforgeError::validation("No data rows to generate"));
        }
        if self.options.kinds.is_empty() {
            return Err(CertforgeError::validation("No output format selected"));
        }
        if self.options.send_email {
            match self.options.email_column.as_deref() {
                None => {
                    return Err(CertforgeError::validation(
                        "Email delivery requires an email column",
                    ))
                }
                Some(column) if !self.table.has_column(column) => {
                    return Err(CertforgeError::validation(format!(
                        "Email column '{column}' not found in data"
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(document)
    }
}

/// Lifecycle of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running { row: usize },
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }

    pub fn status(self) -> JobStatus {
        match self {
            JobState::Idle => JobStatus::Pending,
            JobState::Running { .. } => JobStatus::Processing,
            JobState::Completed => JobStatus::Completed,
            JobState::Failed => JobStatus::Failed,
            JobState::Cancelled => JobStatus::Cancelled,
        }
    }
}

/// Externally reported job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One line of the user-visible job log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            at: Local::now(),
            level,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", log_stamp(self.at), self.message)
    }
}

/// Progress after each row.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationProgress {
    pub processed: usize,
    pub total: usize,
    /// Whole percent, `round(processed / total * 100)`.
    pub percent: u8,
    pub eta_secs: f64,
}

/// Progress callback for batch generation.
pub type ProgressCallback = Box<dyn Fn(GenerationProgress) + Send>;

/// Serializable status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub status: JobStatus,
    pub total_records: usize,
    pub processed: usize,
    /// 0.0 to 100.0, one decimal.
    pub progress_percent: f64,
}

/// Outcome of a finished (or rejected) job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub state: JobState,
    pub total_records: usize,
    pub processed: usize,
    /// Indices of rows that produced no artifacts.
    pub failed_rows: Vec<usize>,
    pub artifacts: Vec<Artifact>,
    /// Paths written by the delivery collaborator.
    pub delivered: Vec<PathBuf>,
    pub log: Vec<LogEntry>,
    pub elapsed_secs: f64,
}

impl JobReport {
    pub fn status(&self) -> JobStatusReport {
        let progress_percent = if self.total_records == 0 {
            0.0
        } else {
            (self.processed as f64 / self.total_records as f64 * 1000.0).round() / 10.0
        };
        JobStatusReport {
            status: self.state.status(),
            total_records: self.total_records,
            processed: self.processed,
            progress_percent,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter().filter(|e| e.level == LogLevel::Error)
    }
}

/// Whole-percent progress of `processed` out of `total`.
pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((processed.min(total) as f64 / total as f64) * 100.0).round() as u8
}

enum RowFailure {
    /// The surface is gone; no later row can succeed.
    Fatal(String),
    Row(String),
}

impl From<SurfaceError> for RowFailure {
    fn from(error: SurfaceError) -> Self {
        match error {
            SurfaceError::Unavailable(message) => RowFailure::Fatal(message),
            other => RowFailure::Row(other.to_string()),
        }
    }
}

impl From<CertforgeError> for RowFailure {
    fn from(error: CertforgeError) -> Self {
        RowFailure::Row(error.to_string())
    }
}

#[derive(Default)]
struct RunTally {
    processed: usize,
    failed_rows: Vec<usize>,
    artifacts: ArtifactSet,
    delivered: Vec<PathBuf>,
}

/// Drives generation jobs over one rendering surface.
pub struct BatchGenerator {
    surface: Box<dyn RenderSurface>,
    packager: Box<dyn Packager>,
    delivery: Box<dyn Delivery>,
    notifier: Option<Box<dyn Notifier>>,
    remote_saver: Option<Box<dyn RemoteSaver>>,
    progress: Option<ProgressCallback>,
    cancel: Arc<AtomicBool>,
    state: JobState,
    log: Vec<LogEntry>,
}

impl BatchGenerator {
    pub fn new(surface: Box<dyn RenderSurface>, delivery: Box<dyn Delivery>) -> Self {
        Self {
            surface,
            packager: Box::new(ZipPackager),
            delivery,
            notifier: None,
            remote_saver: None,
            progress: None,
            cancel: Arc::new(AtomicBool::new(false)),
            state: JobState::Idle,
            log: Vec::new(),
        }
    }

    pub fn with_packager(mut self, packager: Box<dyn Packager>) -> Self {
        self.packager = packager;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_remote_saver(mut self, saver: Box<dyn RemoteSaver>) -> Self {
        self.remote_saver = Some(saver);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Flag that stops the running job before its next row.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Log of the current or last job.
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Run a job to completion.
    pub async fn run(&mut self, job: &GenerationJob) -> JobReport {
        let clock = JobClock::start();
        self.state = JobState::Idle;
        self.log.clear();
        self.cancel.store(false, Ordering::SeqCst);

        let total = job.table.len();
        let mut tally = RunTally::default();

        let document = match job.validate() {
            Ok(document) => document,
            Err(e) => {
                self.push_log(LogLevel::Error, e.to_string());
                return self.report(total, tally, &clock);
            }
        };

        self.state = JobState::Running { row: 0 };
        self.push_log(
            LogLevel::Info,
            format!("Generating {total} certificate(s) from '{}'", document.title),
        );

        if !self.surface.is_available() {
            let message = format!("Rendering surface '{}' is not available", self.surface.name());
            self.push_log(LogLevel::Error, message);
            self.state = JobState::Failed;
            return self.report(total, tally, &clock);
        }

        for (index, row) in job.table.rows.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                self.push_log(
                    LogLevel::Warn,
                    format!("Cancelled after {} of {total} rows", tally.processed),
                );
                self.state = JobState::Cancelled;
                break;
            }
            self.state = JobState::Running { row: index };

            match self.generate_row(job, document, index, row).await {
                Ok(artifacts) => {
                    for artifact in artifacts {
                        tally.artifacts.push(artifact);
                    }
                }
                Err(RowFailure::Row(message)) => {
                    self.push_log(LogLevel::Error, format!("Row {index}: {message}"));
                    tally.failed_rows.push(index);
                }
                Err(RowFailure::Fatal(message)) => {
                    self.push_log(
                        LogLevel::Error,
                        format!("Rendering surface lost at row {index}: {message}"),
                    );
                    self.state = JobState::Failed;
                    return self.report(total, tally, &clock);
                }
            }

            tally.processed = index + 1;
            if let Some(progress) = &self.progress {
                progress(GenerationProgress {
                    processed: tally.processed,
                    total,
                    percent: progress_percent(tally.processed, total),
                    eta_secs: clock.eta_secs(tally.processed, total),
                });
            }
        }

        self.finish_outputs(job, document, &mut tally).await;
        if self.state != JobState::Cancelled {
            self.state = JobState::Completed;
        }
        self.push_log(
            LogLevel::Info,
            format!(
                "Finished: {} artifact(s), {} failed row(s)",
                tally.artifacts.len(),
                tally.failed_rows.len()
            ),
        );
        self.report(total, tally, &clock)
    }

    /// Retry notifications whose last attempt failed. Returns how many were sent.
    pub async fn resend_failed(&mut self, artifacts: &mut [Artifact]) -> usize {
        let (sent, _) = self.send_notifications(artifacts, EmailStatus::Failed).await;
        sent
    }

    async fn generate_row(
        &mut self,
        job: &GenerationJob,
        document: &Document,
        index: usize,
        row: &DataRow,
    ) -> Result<Vec<Artifact>, RowFailure> {
        let options = &job.options;
        let instance = instantiate(document, &job.mapping, row);

        let capture = if options.kinds.iter().any(|k| k.needs_capture()) {
            self.surface.render(&instance).await?;
            self.surface.settled().await?;
            Some(self.surface.capture(options.capture_scale).await?)
        } else {
            None
        };

        let recipient = options
            .email_column
            .as_deref()
            .and_then(|column| row.get(column))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let mut artifacts = Vec::with_capacity(options.kinds.len());
        for (position, &kind) in options.kinds.iter().enumerate() {
            let bytes = match kind {
                ArtifactKind::Pdf => encode_pdf(captured(&capture)?, options.page)?,
                ArtifactKind::Png => captured(&capture)?.png.clone(),
                ArtifactKind::Svg => svg::serialize(&instance).into_bytes(),
            };
            let email_status = if options.send_email && position == 0 && recipient.is_some() {
                EmailStatus::Pending
            } else {
                EmailStatus::Skipped
            };
            artifacts.push(Artifact {
                name: name_for(&job.table.columns, row, index, kind),
                kind,
                bytes,
                row_index: index,
                recipient: recipient.clone(),
                email_status,
            });
        }

        tracing::debug!(row = index, artifacts = artifacts.len(), "Row generated");
        Ok(artifacts)
    }

    async fn finish_outputs(&mut self, job: &GenerationJob, document: &Document, tally: &mut RunTally) {
        if tally.artifacts.is_empty() {
            self.push_log(LogLevel::Warn, "No artifacts were generated");
            return;
        }

        if job.options.archive {
            let name = format!("{}.{}", job.options.archive_name, self.packager.extension());
            let packaged = self.packager.package(tally.artifacts.as_slice());
            match packaged.and_then(|blob| self.delivery.deliver(&blob, &name)) {
                Ok(path) => {
                    self.push_log(LogLevel::Info, format!("Archive saved to {}", path.display()));
                    tally.delivered.push(path);
                }
                Err(e) => self.push_log(LogLevel::Error, format!("Archive delivery failed: {e}")),
            }
        } else {
            let mut failures = Vec::new();
            for artifact in tally.artifacts.iter() {
                match self.delivery.deliver(&artifact.bytes, &artifact.name) {
                    Ok(path) => tally.delivered.push(path),
                    Err(e) => failures.push(format!("Delivery of {} failed: {e}", artifact.name)),
                }
            }
            for failure in failures {
                self.push_log(LogLevel::Error, failure);
            }
            self.push_log(
                LogLevel::Info,
                format!("Saved {} file(s)", tally.delivered.len()),
            );
        }

        if job.options.send_email {
            let (sent, failed) = self
                .send_notifications(tally.artifacts.as_mut_slice(), EmailStatus::Pending)
                .await;
            self.push_log(
                LogLevel::Info,
                format!("Emails sent: {sent}, failed: {failed}"),
            );
        }

        if job.options.remote_save {
            match self.remote_saver.take() {
                Some(mut saver) => {
                    let job_name = sanitize(&document.export_file_stem());
                    match saver.save(&job_name, tally.artifacts.as_slice()).await {
                        Ok(()) => self.push_log(
                            LogLevel::Info,
                            format!("Saved {} artifact(s) remotely", tally.artifacts.len()),
                        ),
                        Err(e) => {
                            self.push_log(LogLevel::Error, format!("Remote save failed: {e}"))
                        }
                    }
                    self.remote_saver = Some(saver);
                }
                None => self.push_log(LogLevel::Warn, "Remote save requested but not configured"),
            }
        }
    }

    async fn send_notifications(
        &mut self,
        artifacts: &mut [Artifact],
        wanted: EmailStatus,
    ) -> (usize, usize) {
        let Some(mut notifier) = self.notifier.take() else {
            self.push_log(LogLevel::Warn, "Email requested but no notifier is configured");
            for artifact in artifacts.iter_mut().filter(|a| a.email_status == wanted) {
                artifact.email_status = EmailStatus::Skipped;
            }
            return (0, 0);
        };

        let (mut sent, mut failed) = (0, 0);
        for artifact in artifacts.iter_mut() {
            if artifact.email_status != wanted {
                continue;
            }
            let Some(recipient) = artifact.recipient.clone() else {
                artifact.email_status = EmailStatus::Skipped;
                continue;
            };
            match notifier.notify(&recipient, artifact).await {
                Ok(()) => {
                    artifact.email_status = EmailStatus::Sent;
                    sent += 1;
                }
                Err(e) => {
                    artifact.email_status = EmailStatus::Failed;
                    failed += 1;
                    self.push_log(LogLevel::Error, format!("Email to {recipient} failed: {e}"));
                }
            }
        }

        self.notifier = Some(notifier);
        (sent, failed)
    }

    fn push_log(&mut self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::now(level, message);
        match level {
            LogLevel::Info => tracing::info!(target: "certforge::job", "{}", entry.message),
            LogLevel::Warn => tracing::warn!(target: "certforge::job", "{}", entry.message),
            LogLevel::Error => tracing::error!(target: "certforge::job", "{}", entry.message),
        }
        self.log.push(entry);
    }

    fn report(&self, total: usize, tally: RunTally, clock: &JobClock) -> JobReport {
        JobReport {
            state: self.state,
            total_records: total,
            processed: tally.processed,
            failed_rows: tally.failed_rows,
            artifacts: tally.artifacts.into_vec(),
            delivered: tally.delivered,
            log: self.log.clone(),
            elapsed_secs: clock.elapsed_secs(),
        }
    }
}

fn captured(capture: &Option<RasterCapture>) -> Result<&RasterCapture, RowFailure> {
    capture
        .as_ref()
        .ok_or_else(|| RowFailure::Row("No raster capture available".to_string()))
}
