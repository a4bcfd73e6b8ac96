#![allow(unused)]

//! # contract: interfaces between the sync driver and the outside world
//!
//! The driver talks to two collaborators:
//! - a [`ShareClient`], which uploads a file and asks the server for a public
//!   share link for it;
//! - a [`LinkRecorder`], which persists the link somewhere (or nowhere).
//!
//! Both traits are async and annotated for `mockall`, so tests can script the
//! server and the database without any network.

use std::path::PathBuf;

use async_trait::async_trait;

use mockall::{automock, predicate::*};

use crate::error::SyncError;

/// One file to push, derived from the directory listing. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub local_path: PathBuf,
    /// WebDAV path the bytes are PUT to.
    pub remote_path: String,
    /// Path handed to the share API.
    pub share_path: String,
    pub file_name: String,
}

/// Share kinds understood by the OCS sharing API. Only [`ShareType::PublicLink`]
/// is ever requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareType {
    User,
    Group,
    PublicLink,
    Email,
    FederatedCloud,
    Circle,
    TalkConversation,
}

impl ShareType {
    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            ShareType::User => 0,
            ShareType::Group => 1,
            ShareType::PublicLink => 3,
            ShareType::Email => 4,
            ShareType::FederatedCloud => 6,
            ShareType::Circle => 7,
            ShareType::TalkConversation => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareStatus {
    Success,
    Fail,
}

/// Outcome of a share request: the share URL on success, a human-readable
/// reason otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareResult {
    pub status: ShareStatus,
    pub message: String,
}

impl ShareResult {
    pub fn success(url: impl Into<String>) -> Self {
        ShareResult {
            status: ShareStatus::Success,
            message: url.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ShareResult {
            status: ShareStatus::Fail,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ShareStatus::Success
    }
}

/// Result of handing a link to a [`LinkRecorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The recorder does not persist anything.
    NotPersisted,
    /// The link was written; `rows_affected` rows matched the file name.
    Stored { rows_affected: u64 },
}

impl RecordOutcome {
    /// Whether the local file may be removed after recording.
    pub fn allows_delete(self) -> bool {
        match self {
            RecordOutcome::NotPersisted => true,
            RecordOutcome::Stored { rows_affected } => rows_affected > 0,
        }
    }
}

/// Client for the remote file-sync server.
///
/// Implementations must not retry and must not touch the local file beyond
/// reading it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ShareClient: Send + Sync {
    /// Upload the file's bytes to `target.remote_path`.
    ///
    /// Returns `Ok(false)` when the server answered with a non-empty body.
    /// Transport and local read failures are errors.
    async fn upload(&self, target: &UploadTarget) -> Result<bool, SyncError>;

    /// Request a public share link for `share_path`.
    ///
    /// A failure status reported by the server is `Ok` with a failing
    /// [`ShareResult`]; only transport problems and undecodable responses are
    /// errors.
    async fn create_link(&self, share_path: &str) -> Result<ShareResult, SyncError>;
}

/// Sink for share links produced during a run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LinkRecorder: Send + Sync {
    async fn record_link(&self, file_name: &str, link: &str) -> Result<RecordOutcome, SyncError>;
}

/// Recorder used when no database is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

#[async_trait]
impl LinkRecorder for NoopRecorder {
    async fn record_link(&self, _file_name: &str, _link: &str) -> Result<RecordOutcome, SyncError> {
        Ok(RecordOutcome::NotPersisted)
    }
}
