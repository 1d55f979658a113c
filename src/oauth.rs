//! OAuth2 authorization-code flow: consent URL construction, code exchange,
//! and the cached token file each backend keeps under the credentials dir.

use std::path::Path;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed opaque value sent as the `state` query parameter on the consent
/// redirect and echoed back by the provider.
pub const STATE_TOKEN: &str = "state-token";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Client secret unreadable: {0}")]
    SecretUnreadable(String),
    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A cached OAuth2 token. The on-disk JSON matches the standard token file
/// schema (`expiry` as RFC 3339), so token files written by other tooling
/// round-trip unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
}

impl OAuthToken {
    /// A token is valid only while its expiry is strictly in the future.
    /// `expiry == now` counts as expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expiry > now
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Read a token from its cache file. Missing, unreadable, or malformed
    /// files all yield `None`.
    pub fn from_file(path: &Path) -> Option<Self> {
        let raw = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(tok) => Some(tok),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Token cache file is corrupt");
                None
            }
        }
    }

    /// Persist the token, overwriting any previous cache file.
    pub fn save(&self, path: &Path) -> Result<(), OAuthError> {
        tracing::info!(path = %path.display(), "Saving credential file");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec(self).map_err(|e| OAuthError::ExchangeFailed(e.to_string()))?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

/// Provider-issued OAuth client credentials, parsed from the client-secret
/// JSON Google hands out (either the `installed` or `web` variant).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    refresh_token: String,
    expires_in: i64,
}

impl OAuthClient {
    pub fn from_secret_file(path: &Path) -> Result<Self, OAuthError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| OAuthError::SecretUnreadable(format!("{}: {e}", path.display())))?;
        let parsed: ClientSecretFile = serde_json::from_str(&raw)
            .map_err(|e| OAuthError::SecretUnreadable(e.to_string()))?;
        parsed
            .installed
            .or(parsed.web)
            .ok_or_else(|| OAuthError::SecretUnreadable("no installed or web section".to_string()))
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or("http://localhost:9999/redirect")
    }

    /// Build the provider consent URL for the requested scope, asking for
    /// offline access so the provider includes a refresh token.
    pub fn consent_url(&self, scope: &str) -> Result<String, OAuthError> {
        let url = reqwest::Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri()),
                ("response_type", "code"),
                ("scope", scope),
                ("state", STATE_TOKEN),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| OAuthError::SecretUnreadable(format!("bad auth_uri: {e}")))?;
        Ok(url.into())
    }

    /// Exchange an authorization code for a token at the provider's token
    /// endpoint. `expires_in` seconds are converted to an absolute expiry.
    pub async fn exchange_code(&self, http: &Client, code: &str) -> Result<OAuthToken, OAuthError> {
        let resp = http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri()),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::ExchangeFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(OAuthError::ExchangeFailed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let tok: TokenResponse = resp
            .json()
            .await
            .map_err(|e| OAuthError::ExchangeFailed(e.to_string()))?;

        Ok(OAuthToken {
            access_token: tok.access_token,
            token_type: tok.token_type,
            refresh_token: tok.refresh_token,
            expiry: Utc::now() + chrono::Duration::seconds(tok.expires_in),
        })
    }
}

/// Per-backend link state. Failures during the exchange drop back to
/// `Unlinked`; an abandoned consent simply stays `AwaitingConsent` until the
/// user retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Unlinked,
    AwaitingConsent,
    Linked,
}

impl LinkState {
    /// Consent redirect issued.
    pub fn begin_consent(self) -> Self {
        match self {
            LinkState::Linked => LinkState::Linked,
            _ => LinkState::AwaitingConsent,
        }
    }

    /// Code exchange succeeded and the token was persisted.
    pub fn complete(self) -> Self {
        LinkState::Linked
    }

    /// Anything failed mid-flow. No partial state survives.
    pub fn fail(self) -> Self {
        LinkState::Unlinked
    }
}
