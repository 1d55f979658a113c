use async_trait::async_trait;
use bytes::Bytes;

use super::{Backend, BackendError, FileListing, LinkAction, Provider};

/// Placeholder Flickr backend.
#[derive(Default)]
pub struct FlickrBackend;

impl FlickrBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for FlickrBackend {
    fn name(&self) -> &'static str {
        Provider::Flickr.name()
    }

    async fn link(&self) -> Result<LinkAction, BackendError> {
        tracing::warn!(backend = self.name(), "Linking not implemented");
        Ok(LinkAction::None)
    }

    async fn has_token(&self) -> bool {
        false
    }

    async fn save_token(&self, _code: Option<&str>) -> Result<(), BackendError> {
        Err(BackendError::ClientUnavailable)
    }

    async fn list(&self) -> Result<Vec<FileListing>, BackendError> {
        Err(BackendError::ClientUnavailable)
    }

    async fn upload_file(&self, _name: &str, _data: Bytes) -> Result<(), BackendError> {
        Err(BackendError::ClientUnavailable)
    }
}
