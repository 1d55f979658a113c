use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use super::{Backend, BackendError, FileListing, LinkAction, Provider};
use crate::config::Config;
use crate::oauth::{LinkState, OAuthClient, OAuthToken};

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const TOKEN_CACHE_FILE: &str = "gdrive_token.json";

/// Google Drive storage backend. Holds the OAuth client config and a
/// memoized token; all Drive calls go through the plain REST surface.
pub struct GoogleDriveBackend {
    oauth: OAuthClient,
    cache_file: PathBuf,
    api_base: String,
    http: Client,
    token: RwLock<Option<OAuthToken>>,
    state: Mutex<LinkState>,
}

#[derive(Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    #[serde(default)]
    name: String,
    #[serde(default)]
    file_extension: String,
    #[serde(default)]
    created_time: String,
    #[serde(default)]
    modified_time: String,
}

impl GoogleDriveBackend {
    pub fn new(oauth: OAuthClient, cache_file: PathBuf) -> Self {
        Self {
            oauth,
            cache_file,
            api_base: DEFAULT_API_BASE.to_string(),
            http: Client::new(),
            token: RwLock::new(None),
            state: Mutex::new(LinkState::Unlinked),
        }
    }

    /// Build the backend from server config: client secret from disk, token
    /// cache under the credentials dir.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let oauth = OAuthClient::from_secret_file(&config.gdrive_client_secret_path)?;
        std::fs::create_dir_all(&config.credentials_dir)?;
        let mut backend = Self::new(oauth, config.credentials_dir.join(TOKEN_CACHE_FILE));
        if let Some(base) = &config.gdrive_api_base {
            backend = backend.with_api_base(base);
        }
        Ok(backend)
    }

    /// Point Drive API calls at a different base URL.
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub async fn link_state(&self) -> LinkState {
        *self.state.lock().await
    }

    fn token_from_cache(&self) -> Option<OAuthToken> {
        let tok = OAuthToken::from_file(&self.cache_file)?;
        if tok.is_valid() {
            Some(tok)
        } else {
            tracing::info!(backend = self.name(), "Cached token is expired");
            None
        }
    }

    /// The memoized token, falling back to the cache file. `ClientUnavailable`
    /// if neither yields a valid token.
    async fn authed_token(&self) -> Result<OAuthToken, BackendError> {
        if let Some(tok) = self.token.read().await.as_ref() {
            if tok.is_valid() {
                return Ok(tok.clone());
            }
        }

        match self.token_from_cache() {
            Some(tok) => {
                *self.token.write().await = Some(tok.clone());
                Ok(tok)
            }
            None => Err(BackendError::ClientUnavailable),
        }
    }

    fn list_url(&self) -> String {
        format!(
            "{}/drive/v3/files?fields=files(name,fileExtension,createdTime,modifiedTime)",
            self.api_base
        )
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/drive/v3/files?uploadType=multipart",
            self.api_base
        )
    }

    /// Drive's multipart upload wants a `multipart/related` body: a JSON
    /// metadata part naming the file, then the media part.
    fn multipart_body(name: &str, content_type: &str, data: &Bytes) -> (String, Bytes) {
        let boundary = "horcrux_upload_boundary";
        let metadata = serde_json::json!({ "name": name });

        let mut body = BytesMut::new();
        body.put_slice(format!("--{boundary}\r\n").as_bytes());
        body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.put_slice(metadata.to_string().as_bytes());
        body.put_slice(format!("\r\n--{boundary}\r\n").as_bytes());
        body.put_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.put_slice(data);
        body.put_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        (
            format!("multipart/related; boundary={boundary}"),
            body.freeze(),
        )
    }
}

#[async_trait]
impl Backend for GoogleDriveBackend {
    fn name(&self) -> &'static str {
        Provider::Gdrive.name()
    }

    async fn link(&self) -> Result<LinkAction, BackendError> {
        if self.token_from_cache().is_some() {
            return Ok(LinkAction::None);
        }

        let url = self.oauth.consent_url(DRIVE_SCOPE)?;
        let mut state = self.state.lock().await;
        *state = state.begin_consent();
        tracing::info!(backend = self.name(), "Issuing consent redirect");
        Ok(LinkAction::Redirect(url))
    }

    async fn has_token(&self) -> bool {
        match self.token_from_cache() {
            Some(tok) => {
                // Memoize so later list/upload calls skip the file read.
                *self.token.write().await = Some(tok);
                *self.state.lock().await = LinkState::Linked;
                true
            }
            None => false,
        }
    }

    async fn save_token(&self, code: Option<&str>) -> Result<(), BackendError> {
        let code = match code {
            Some(c) if !c.is_empty() => c,
            _ => {
                tracing::error!(backend = self.name(), "Authorization callback without a code");
                let mut state = self.state.lock().await;
                *state = state.fail();
                return Err(BackendError::MissingAuthCode);
            }
        };

        let tok = match self.oauth.exchange_code(&self.http, code).await {
            Ok(tok) => tok,
            Err(e) => {
                tracing::error!(backend = self.name(), error = %e, "Token exchange failed");
                let mut state = self.state.lock().await;
                *state = state.fail();
                return Err(e.into());
            }
        };

        tok.save(&self.cache_file)?;
        *self.token.write().await = Some(tok);
        let mut state = self.state.lock().await;
        *state = state.complete();
        tracing::info!(backend = self.name(), "Account linked");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<FileListing>, BackendError> {
        let tok = self.authed_token().await?;

        let resp = self
            .http
            .get(self.list_url())
            .bearer_auth(&tok.access_token)
            .send()
            .await
            .map_err(|e| BackendError::ListFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::ListFailed(format!(
                "Drive list failed ({status}): {body}"
            )));
        }

        let listing: DriveFileList = resp
            .json()
            .await
            .map_err(|e| BackendError::ListFailed(e.to_string()))?;

        if listing.files.is_empty() {
            tracing::info!(backend = self.name(), "No files found");
        }

        Ok(listing
            .files
            .into_iter()
            .map(|f| FileListing {
                icon: String::new(),
                name: f.name,
                extension: f.file_extension,
                created_time: f.created_time,
                modified_time: f.modified_time,
            })
            .collect())
    }

    async fn upload_file(&self, name: &str, data: Bytes) -> Result<(), BackendError> {
        let tok = self.authed_token().await?;

        let content_type = mime_guess::from_path(name)
            .first_raw()
            .unwrap_or("application/octet-stream");
        let (body_type, body) = Self::multipart_body(name, content_type, &data);

        tracing::info!(backend = self.name(), file = name, bytes = data.len(), "Uploading file");

        let resp = self
            .http
            .post(self.upload_url())
            .bearer_auth(&tok.access_token)
            .header("Content-Type", body_type)
            .body(body)
            .send()
            .await
            .map_err(|e| BackendError::UploadFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::UploadFailed(format!(
                "Drive upload failed ({status}): {body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_wraps_metadata_and_media() {
        let data = Bytes::from("file contents");
        let (content_type, body) =
            GoogleDriveBackend::multipart_body("notes.txt", "text/plain", &data);

        assert!(content_type.starts_with("multipart/related; boundary="));
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(r#"{"name":"notes.txt"}"#));
        assert!(body.contains("Content-Type: text/plain"));
        assert!(body.contains("file contents"));
        assert!(body.trim_end().ends_with("--"));
    }
}
