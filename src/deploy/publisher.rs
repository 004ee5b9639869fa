//! Walk a build output tree and upload every file to an object store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::cdn::CdnInvalidator;
use super::mime::content_type_for;
use super::store::{Acl, ObjectStore};
use crate::error::DeployError;

/// One file discovered under the build output root.
///
/// The body is not held here; it is read right before its upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployableFile {
    /// Object key: the `/`-joined path relative to the root
    pub key: String,
    pub path: PathBuf,
    pub content_type: &'static str,
}

/// Enumerate every regular file under `root`, sorted by key.
pub fn collect_files(root: impl AsRef<Path>) -> Result<Vec<DeployableFile>, DeployError> {
    let root = root.as_ref();
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| DeployError::Walk {
            path: e
                .path()
                .unwrap_or(root)
                .display()
                .to_string(),
            message: e.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| DeployError::Walk {
                path: entry.path().display().to_string(),
                message: e.to_string(),
            })?;

        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push(DeployableFile {
            content_type: content_type_for(&key),
            key,
            path: entry.path().to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(files)
}

/// What to do once a file has exhausted its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Record the failure and upload the remaining files
    #[default]
    Continue,
    /// Stop the pass at the first failed file
    Abort,
}

/// A file that could not be uploaded.
#[derive(Debug, Clone)]
pub struct UploadFailure {
    pub key: String,
    pub attempts: u32,
    pub error: DeployError,
}

/// Outcome of a publish pass.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    pub uploaded: Vec<String>,
    pub failures: Vec<UploadFailure>,
    /// Files never attempted because the pass aborted
    pub skipped: Vec<String>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    /// CDN invalidation is only worth running after a clean, non-empty pass.
    pub fn should_invalidate(&self) -> bool {
        self.is_success() && !self.uploaded.is_empty()
    }
}

/// Sequential uploader with an explicit retry and failure policy.
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    policy: FailurePolicy,
    retries: u32,
    acl: Acl,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            policy: FailurePolicy::default(),
            retries: 0,
            acl: Acl::PublicRead,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Extra attempts per file after the first one fails.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Upload `files` in order.
    pub async fn publish(&self, files: &[DeployableFile]) -> PublishReport {
        let mut report = PublishReport::default();

        info!(
            files = files.len(),
            destination = %self.store.describe(),
            policy = ?self.policy,
            retries = self.retries,
            "Publishing build output"
        );

        for (index, file) in files.iter().enumerate() {
            match self.upload_with_retries(file).await {
                Ok(()) => report.uploaded.push(file.key.clone()),
                Err(failure) => {
                    error!(
                        key = %failure.key,
                        attempts = failure.attempts,
                        error = %failure.error,
                        "Upload failed"
                    );
                    report.failures.push(failure);

                    if self.policy == FailurePolicy::Abort {
                        report.skipped = files[index + 1..]
                            .iter()
                            .map(|f| f.key.clone())
                            .collect();
                        warn!(skipped = report.skipped.len(), "Aborting publish pass");
                        break;
                    }
                }
            }
        }

        info!(
            uploaded = report.uploaded.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "Publish pass finished"
        );

        report
    }

    async fn upload_with_retries(&self, file: &DeployableFile) -> Result<(), UploadFailure> {
        let max_attempts = self.retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.upload_once(file).await {
                Ok(()) => {
                    debug!(key = %file.key, content_type = file.content_type, attempt, "Uploaded");
                    return Ok(());
                }
                // A local read failure will not improve on retry
                Err(e @ DeployError::Read { .. }) => {
                    return Err(UploadFailure {
                        key: file.key.clone(),
                        attempts: attempt,
                        error: e,
                    });
                }
                Err(e) => {
                    warn!(key = %file.key, attempt, max_attempts, error = %e, "Upload attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(UploadFailure {
            key: file.key.clone(),
            attempts: max_attempts,
            error: last_error.unwrap_or_else(|| DeployError::Upload {
                key: file.key.clone(),
                message: "no attempts made".to_string(),
            }),
        })
    }

    async fn upload_once(&self, file: &DeployableFile) -> Result<(), DeployError> {
        let body = tokio::fs::read(&file.path)
            .await
            .map_err(|e| DeployError::Read {
                path: file.path.display().to_string(),
                message: e.to_string(),
            })?;

        self.store
            .put_object(&file.key, Bytes::from(body), file.content_type, self.acl)
            .await
    }
}

/// Result of a full deploy: the publish report plus the CDN step.
#[derive(Debug)]
pub struct DeployOutcome {
    pub report: PublishReport,
    /// URLs purged, or `None` when invalidation did not run
    pub purged: Option<usize>,
    pub invalidation_error: Option<DeployError>,
}

impl DeployOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_success() && self.invalidation_error.is_none()
    }
}

/// Publish `files`, then invalidate the uploaded keys if the pass was clean.
pub async fn publish_and_invalidate(
    publisher: &Publisher,
    files: &[DeployableFile],
    invalidator: Option<&dyn CdnInvalidator>,
) -> DeployOutcome {
    let report = publisher.publish(files).await;

    let mut outcome = DeployOutcome {
        report,
        purged: None,
        invalidation_error: None,
    };

    let Some(invalidator) = invalidator else {
        return outcome;
    };

    if !outcome.report.should_invalidate() {
        warn!(
            failed = outcome.report.failures.len(),
            uploaded = outcome.report.uploaded.len(),
            "Skipping CDN invalidation"
        );
        return outcome;
    }

    match invalidator.invalidate(&outcome.report.uploaded).await {
        Ok(count) => outcome.purged = Some(count),
        Err(e) => {
            error!(error = %e, "CDN invalidation failed");
            outcome.invalidation_error = Some(e);
        }
    }

    outcome
}
