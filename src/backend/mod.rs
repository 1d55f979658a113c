mod dropbox;
mod flickr;
mod gdrive;
mod registry;

pub use dropbox::DropboxBackend;
pub use flickr::FlickrBackend;
pub use gdrive::GoogleDriveBackend;
pub use registry::BackendRegistry;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("authorization callback is missing the code parameter")]
    MissingAuthCode,
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),
    #[error("no authenticated client, link the account first")]
    ClientUnavailable,
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("listing failed: {0}")]
    ListFailed(String),
    #[error("no valid token available")]
    TokenUnavailable,
    #[error("client secret unreadable: {0}")]
    SecretUnreadable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::oauth::OAuthError> for BackendError {
    fn from(e: crate::oauth::OAuthError) -> Self {
        match e {
            crate::oauth::OAuthError::ExchangeFailed(msg) => BackendError::ExchangeFailed(msg),
            crate::oauth::OAuthError::SecretUnreadable(msg) => BackendError::SecretUnreadable(msg),
            crate::oauth::OAuthError::Io(e) => BackendError::Io(e),
        }
    }
}

/// Outcome of a `link` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Send the user to the provider consent page.
    Redirect(String),
    /// A valid token is already cached; nothing to do.
    None,
}

/// Read-only projection of a remote file's metadata, produced fresh on each
/// `list` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileListing {
    pub icon: String,
    pub name: String,
    pub extension: String,
    pub created_time: String,
    pub modified_time: String,
}

/// The storage providers this tool knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gdrive,
    Dropbox,
    Flickr,
}

impl Provider {
    /// Registry key, also used in log output.
    pub fn name(self) -> &'static str {
        match self {
            Provider::Gdrive => "gdrive",
            Provider::Dropbox => "dbox",
            Provider::Flickr => "flickr",
        }
    }

    pub const ALL: [Provider; 3] = [Provider::Gdrive, Provider::Dropbox, Provider::Flickr];
}

/// Capability contract every storage backend implements. One instance per
/// linked provider, held in the registry for the life of the process.
///
/// `unlink`, `refresh_token`, `upload_folder`, and `delete` are part of the
/// declared surface but are no-ops for now; callers must not depend on their
/// effects. A stale token is never silently refreshed, it forces a fresh
/// consent redirect.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// If no valid cached token exists, return the consent redirect.
    async fn link(&self) -> Result<LinkAction, BackendError>;

    /// True iff a cached token exists, parses, and has not expired. On
    /// success the backend memoizes the token for subsequent API calls.
    async fn has_token(&self) -> bool;

    /// Handle the authorization callback: extract the `code` parameter,
    /// exchange it, persist the token, and build the authenticated client.
    async fn save_token(&self, code: Option<&str>) -> Result<(), BackendError>;

    /// List remote files. An account with zero files yields an empty Vec.
    async fn list(&self) -> Result<Vec<FileListing>, BackendError>;

    /// Stream content to the provider under the given name.
    async fn upload_file(&self, name: &str, data: Bytes) -> Result<(), BackendError>;

    async fn unlink(&self) {}

    async fn refresh_token(&self) {}

    async fn upload_folder(&self) {}

    async fn delete(&self) {}
}
