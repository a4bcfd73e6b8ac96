//! High-level pass: upload → share link → record → delete, one file at a time.
//!
//! This module implements the single-pass batch run over the configured
//! upload directory:
//!   - If the directory is missing it is created and the pass ends.
//!   - Every regular file directly inside it is uploaded through a
//!     [`ShareClient`]; a rejected upload leaves the file in place.
//!   - For accepted uploads a public share link is requested. A failing share
//!     is logged and the file kept.
//!   - A successful link is handed to the [`LinkRecorder`]; the local file is
//!     deleted when the recorder allows it.
//!
//! # Error Handling
//! Per-file application failures end up in the [`SyncReport`]. Any
//! [`SyncError`] stops the pass immediately and is returned to the caller;
//! files handled before it keep their outcome.
//!
//! Files are processed strictly sequentially in directory-listing order.

use std::fs;

use tracing::{debug, error, info, warn};

use crate::config::Configuration;
use crate::contract::{LinkRecorder, ShareClient, ShareStatus, UploadTarget};
use crate::error::{SyncError, SyncResult};

/// What happened to one file during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Uploaded and shared. `deleted` is false when the recorder did not
    /// allow removing the local copy.
    Shared { url: String, deleted: bool },
    /// The server answered the upload with a non-empty body.
    UploadRejected,
    /// The share request failed; the local file is kept.
    LinkFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub file_name: String,
    pub outcome: FileOutcome,
}

/// Report of a completed pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// The upload directory did not exist and was created; nothing was processed.
    pub created_upload_dir: bool,
    pub files: Vec<FileReport>,
}

impl SyncReport {
    pub fn shared(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Shared { .. }))
            .count()
    }

    pub fn deleted(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Shared { deleted: true, .. }))
            .count()
    }

    pub fn retained(&self) -> usize {
        self.files.len() - self.deleted()
    }
}

pub async fn synchronise<C, R>(
    config: &Configuration,
    client: &C,
    recorder: &R,
) -> SyncResult<SyncReport>
where
    C: ShareClient + ?Sized,
    R: LinkRecorder + ?Sized,
{
    let upload_dir = config.upload_dir();
    info!(upload_dir = %upload_dir.display(), "[SYNC] Starting synchronisation pass");

    if !upload_dir.exists() {
        fs::create_dir_all(upload_dir).map_err(|e| SyncError::io(upload_dir, e))?;
        info!(upload_dir = %upload_dir.display(), "[SYNC] Upload directory created, nothing to process");
        return Ok(SyncReport {
            created_upload_dir: true,
            files: Vec::new(),
        });
    }

    let targets = list_upload_targets(config)?;
    info!(files = targets.len(), "[SYNC] Files found in upload directory");

    let mut report = SyncReport::default();
    for target in targets {
        let outcome = sync_file(client, recorder, &target).await?;
        report.files.push(FileReport {
            file_name: target.file_name,
            outcome,
        });
    }

    info!(
        processed = report.files.len(),
        shared = report.shared(),
        deleted = report.deleted(),
        "[SYNC] Synchronisation pass complete"
    );
    Ok(report)
}

/// Regular files directly inside the upload directory, in listing order.
pub fn list_upload_targets(config: &Configuration) -> SyncResult<Vec<UploadTarget>> {
    let upload_dir = config.upload_dir();
    let entries = fs::read_dir(upload_dir).map_err(|e| SyncError::io(upload_dir, e))?;

    let mut targets = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| SyncError::io(upload_dir, e))?.path();
        if !path.is_file() {
            debug!(path = %path.display(), "[SYNC] Skipping non-file entry");
            continue;
        }
        match config.target_for(path.clone()) {
            Some(target) => targets.push(target),
            None => warn!(path = %path.display(), "[SYNC] Skipping file without a UTF-8 name"),
        }
    }
    Ok(targets)
}

async fn sync_file<C, R>(client: &C, recorder: &R, target: &UploadTarget) -> SyncResult<FileOutcome>
where
    C: ShareClient + ?Sized,
    R: LinkRecorder + ?Sized,
{
    debug!(file = %target.file_name, remote_path = %target.remote_path, "[SYNC][UPLOAD] Uploading file");
    if !client.upload(target).await? {
        debug!(file = %target.file_name, "[SYNC][UPLOAD] Upload rejected, keeping local file");
        return Ok(FileOutcome::UploadRejected);
    }

    let share = client.create_link(&target.share_path).await?;
    match share.status {
        ShareStatus::Fail => {
            error!(
                file = %target.file_name,
                message = %share.message,
                "[SYNC][LINK] Unable to create share link"
            );
            Ok(FileOutcome::LinkFailed {
                message: share.message,
            })
        }
        ShareStatus::Success => {
            info!(file = %target.file_name, url = %share.message, "[SYNC][LINK] Shared link created");

            let recorded = recorder
                .record_link(&target.file_name, &share.message)
                .await?;
            let deleted = if recorded.allows_delete() {
                fs::remove_file(&target.local_path)
                    .map_err(|e| SyncError::io(&target.local_path, e))?;
                debug!(file = %target.file_name, "[SYNC] Local file deleted");
                true
            } else {
                warn!(
                    file = %target.file_name,
                    "[SYNC][RECORD] No row matched the file name, keeping local file"
                );
                false
            };

            Ok(FileOutcome::Shared {
                url: share.message,
                deleted,
            })
        }
    }
}
