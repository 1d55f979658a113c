//! horcrux - a local web server for linking cloud-storage accounts and
//! uploading files into them.
//!
//! This crate provides:
//! - A capability trait every storage backend implements (Google Drive,
//!   with Dropbox/Flickr stubs)
//! - An OAuth2 authorization-code link flow with a per-backend token cache
//! - A registry of live backends, grown as the user links providers
//! - A small browser UI: link page, home page, multipart upload

pub mod api;
pub mod backend;
pub mod config;
pub mod oauth;
pub mod pages;

use tokio::sync::Mutex;

use config::{Config, ConfigStore};

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub client_config: Mutex<ConfigStore>,
    pub registry: backend::BackendRegistry,
}
