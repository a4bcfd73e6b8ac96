//! Server configuration and remote path/URL construction.
//!
//! [`ServerSettings`] is the raw, deserialisable form of the connection
//! parameters. [`Configuration`] wraps it together with the base URL, which is
//! derived exactly once when the configuration is built: `https://` for port
//! 443, `http://` otherwise, with the port left out when it is the scheme
//! default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::contract::{ShareType, UploadTarget};
use crate::error::{SyncError, SyncResult};

/// Connection parameters as they appear in a settings file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password")]
    pub password: String,
    /// WebDAV root, e.g. `/remote.php/dav/files/alice/`.
    #[serde(rename = "RootPath")]
    pub root_path: String,
    /// Local folder that is scanned, and the remote subfolder files land in.
    #[serde(rename = "UploadFolder")]
    pub upload_dir: String,
    /// OCS sharing API prefix, e.g. `/ocs/v2.php/apps/files_sharing/api/v1/`.
    #[serde(rename = "OCSEndPoint")]
    pub ocs_endpoint: String,
}

// Keeps the password out of logs.
impl std::fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSettings")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("root_path", &self.root_path)
            .field("upload_dir", &self.upload_dir)
            .field("ocs_endpoint", &self.ocs_endpoint)
            .finish()
    }
}

/// Immutable, validated configuration for one run.
#[derive(Debug, Clone)]
pub struct Configuration {
    settings: ServerSettings,
    base_url: Url,
}

impl Configuration {
    pub fn new(settings: ServerSettings) -> SyncResult<Self> {
        let hostname = settings.hostname.trim();
        if hostname.is_empty() {
            return Err(SyncError::InvalidConfiguration(
                "hostname must not be empty".to_string(),
            ));
        }

        let scheme = if settings.port == 443 { "https" } else { "http" };
        let mut base_url = Url::parse(&format!("{scheme}://{hostname}")).map_err(|e| {
            SyncError::InvalidConfiguration(format!("invalid hostname `{hostname}`: {e}"))
        })?;
        if base_url.path() != "/" || base_url.query().is_some() || base_url.fragment().is_some() {
            return Err(SyncError::InvalidConfiguration(format!(
                "hostname `{hostname}` must be a bare host name without scheme or path"
            )));
        }
        base_url.set_port(Some(settings.port)).map_err(|_| {
            SyncError::InvalidConfiguration(format!("hostname `{hostname}` cannot carry a port"))
        })?;

        debug!(base_url = %base_url, "Derived server base URL");
        Ok(Configuration { settings, base_url })
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Local directory scanned for files.
    pub fn upload_dir(&self) -> &Path {
        Path::new(&self.settings.upload_dir)
    }

    /// WebDAV path a file is uploaded to: `<rootPath><uploadDir>/<file>`.
    pub fn remote_path(&self, file_name: &str) -> String {
        join_remote_path([
            self.settings.root_path.as_str(),
            self.settings.upload_dir.as_str(),
            file_name,
        ])
    }

    /// Path the share API refers to: `<uploadDir>/<file>`, relative to the
    /// user's root.
    pub fn share_path(&self, file_name: &str) -> String {
        join_remote_path([self.settings.upload_dir.as_str(), file_name])
            .trim_start_matches('/')
            .to_string()
    }

    /// Every segment is percent-encoded in full, `%` included, so the server
    /// stores the file under exactly the name the share request refers to.
    pub fn url_for_path(&self, remote_path: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .clear()
                .extend(remote_path.split('/').filter(|segment| !segment.is_empty()));
        }
        url
    }

    /// `<endpoint>shares?shareType=<code>&path=<share_path>`
    pub fn shares_url(&self, share_path: &str, share_type: ShareType) -> Url {
        let mut url =
            self.url_for_path(&join_remote_path([self.settings.ocs_endpoint.as_str(), "shares"]));
        url.query_pairs_mut()
            .append_pair("shareType", &share_type.code().to_string())
            .append_pair("path", share_path);
        url
    }

    /// Builds the upload target for a file found in the upload directory.
    /// Returns `None` for paths without a UTF-8 file name.
    pub fn target_for(&self, local_path: PathBuf) -> Option<UploadTarget> {
        let file_name = local_path.file_name()?.to_str()?.to_string();
        Some(UploadTarget {
            remote_path: self.remote_path(&file_name),
            share_path: self.share_path(&file_name),
            file_name,
            local_path,
        })
    }
}

/// Joins path fragments with exactly one `/` between segments and a leading
/// `/`, whatever slashes the fragments carry themselves.
pub fn join_remote_path<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut path = String::new();
    for segment in parts
        .into_iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
    {
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}
