#![doc = "HTTP client for the Nextcloud WebDAV and OCS sharing endpoints, implementing the core `ShareClient` contract."]
//
//! # Nextcloud client
//!
//! [`NextcloudClient`] uploads files with a WebDAV `PUT` and creates public
//! share links through the OCS sharing API. Every request carries
//! `OCS-APIRequest: true` and a basic-auth header.
//!
//! - An upload counts as accepted only when the response body is empty; the
//!   status code is not looked at.
//! - Share responses are decoded by [`share_sync_core::share::decode_share_response`].
//! - Idle connections are not kept, so each request uses its own connection.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use share_sync_core::config::Configuration;
use share_sync_core::contract::{ShareClient, ShareResult, ShareType, UploadTarget};
use share_sync_core::share::decode_share_response;
use share_sync_core::SyncError;

pub const OCS_API_REQUEST: HeaderName = HeaderName::from_static("ocs-apirequest");

/// Encoding of the share request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePayload {
    #[default]
    Json,
    Form,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShareRequest<'a> {
    share_type: u8,
    path: &'a str,
}

/// `Basic base64(username:password)`, marked sensitive.
pub fn basic_auth_header(username: &str, password: &str) -> Result<HeaderValue, SyncError> {
    let token = STANDARD.encode(format!("{username}:{password}"));
    let mut value = HeaderValue::from_str(&format!("Basic {token}")).map_err(|e| {
        SyncError::InvalidConfiguration(format!("credentials cannot form a header: {e}"))
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// An upload is accepted exactly when the server answers with an empty body.
pub fn upload_succeeded(body: &str) -> bool {
    body.is_empty()
}

pub struct NextcloudClient {
    config: Configuration,
    http: Client,
    authorization: HeaderValue,
    payload: SharePayload,
}

impl NextcloudClient {
    pub fn new(config: Configuration, payload: SharePayload) -> Result<Self, SyncError> {
        let http = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| SyncError::Transport(format!("failed to build HTTP client: {e}")))?;
        let settings = config.settings();
        let authorization = basic_auth_header(&settings.username, &settings.password)?;
        tracing::info!(
            base_url = %config.base_url(),
            username = %settings.username,
            ?payload,
            "Initialized Nextcloud client"
        );
        Ok(NextcloudClient {
            config,
            http,
            authorization,
            payload,
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(OCS_API_REQUEST, "true")
            .header(AUTHORIZATION, self.authorization.clone())
    }

    async fn send_for_text(&self, request: RequestBuilder, what: &str) -> Result<String, SyncError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(error = ?e, request = what, "HTTP request failed");
            SyncError::Transport(format!("{what} request failed: {e}"))
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Transport(format!("{what} response unreadable: {e}")))?;
        tracing::debug!(request = what, %status, body_len = body.len(), "HTTP response received");
        Ok(body)
    }
}

#[async_trait]
impl ShareClient for NextcloudClient {
    async fn upload(&self, target: &UploadTarget) -> Result<bool, SyncError> {
        let bytes = tokio::fs::read(&target.local_path)
            .await
            .map_err(|e| SyncError::io(&target.local_path, e))?;
        let url = self.config.url_for_path(&target.remote_path);
        tracing::info!(
            file = %target.file_name,
            url = %url,
            size = bytes.len(),
            "Uploading file"
        );

        let body = self
            .send_for_text(self.request(Method::PUT, url).body(bytes), "upload")
            .await?;
        let accepted = upload_succeeded(&body);
        if !accepted {
            tracing::debug!(file = %target.file_name, body = %body, "Upload answered with a body");
        }
        Ok(accepted)
    }

    async fn create_link(&self, share_path: &str) -> Result<ShareResult, SyncError> {
        let share_type = ShareType::PublicLink;
        let url = self.config.shares_url(share_path, share_type);
        let payload = ShareRequest {
            share_type: share_type.code(),
            path: share_path,
        };
        tracing::info!(path = share_path, url = %url, "Requesting public share link");

        let request = match self.payload {
            SharePayload::Json => self.request(Method::POST, url).json(&payload),
            SharePayload::Form => self.request(Method::POST, url).form(&payload),
        };
        let body = self.send_for_text(request, "share").await?;
        decode_share_response(&body)
    }
}
