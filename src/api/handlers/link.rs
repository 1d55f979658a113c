use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::api::response::ApiError;
use crate::backend::{
    Backend, DropboxBackend, FlickrBackend, GoogleDriveBackend, LinkAction, Provider,
};
use crate::pages;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

/// Checkbox fields posted by the link page. A box left unchecked is simply
/// absent from the form body.
#[derive(Debug, Default, Deserialize)]
pub struct LinkForm {
    #[serde(default)]
    pub gdrive: Option<String>,
    #[serde(default)]
    pub dbox: Option<String>,
    #[serde(default)]
    pub flickr: Option<String>,
}

impl LinkForm {
    fn requested(&self, provider: Provider) -> bool {
        let field = match provider {
            Provider::Gdrive => &self.gdrive,
            Provider::Dropbox => &self.dbox,
            Provider::Flickr => &self.flickr,
        };
        field.as_deref().is_some_and(|v| !v.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / — link page while any registered backend still needs consent (or
/// nothing is linked at all), home page otherwise.
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    if needs_link_page(&state).await {
        Html(pages::link_page(&state.config.assets_dir))
    } else {
        Html(pages::home_page())
    }
}

async fn needs_link_page(state: &AppState) -> bool {
    if state.registry.is_empty().await {
        return true;
    }
    for backend in state.registry.all().await {
        if !backend.has_token().await {
            tracing::info!(backend = backend.name(), "Backend has no valid token");
            return true;
        }
    }
    false
}

/// POST /link — register any newly-requested providers, persist the config
/// flags, then run the link step on every registered backend. At most one
/// consent redirect goes out; when several backends want consent the last
/// one wins.
pub async fn link(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LinkForm>,
) -> Result<Response, ApiError> {
    for provider in Provider::ALL {
        if !form.requested(provider) || state.registry.contains(provider.name()).await {
            continue;
        }

        let backend: Arc<dyn Backend> = match provider {
            Provider::Gdrive => Arc::new(
                GoogleDriveBackend::from_config(&state.config)
                    .map_err(|e| ApiError::internal(e.to_string()))?,
            ),
            Provider::Dropbox => Arc::new(DropboxBackend::new()),
            Provider::Flickr => Arc::new(FlickrBackend::new()),
        };
        state.registry.register(backend).await;

        if let Err(e) = state.client_config.lock().await.enable(provider) {
            tracing::warn!(provider = provider.name(), error = %e, "Failed to persist client config");
        }
    }

    let mut consent: Option<String> = None;
    for backend in state.registry.all().await {
        match backend.link().await? {
            LinkAction::Redirect(url) => consent = Some(url),
            LinkAction::None => {}
        }
    }

    match consent {
        Some(url) => Ok(Redirect::to(&url).into_response()),
        None => Ok(StatusCode::OK.into_response()),
    }
}

/// GET /redirect — the OAuth callback for the gdrive backend: exchange the
/// code, persist the token, log a listing of the account, show the home page.
pub async fn redirect_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, ApiError> {
    let backend = state
        .registry
        .get(Provider::Gdrive.name())
        .await
        .ok_or_else(|| ApiError::internal("gdrive backend is not registered"))?;

    backend.save_token(params.code.as_deref()).await?;

    // Listing only to confirm the linked account works; the result is not
    // rendered anywhere.
    match backend.list().await {
        Ok(files) => tracing::info!(count = files.len(), "Listed remote files after linking"),
        Err(e) => tracing::error!(error = %e, "Post-link listing failed"),
    }

    Ok(Html(pages::home_page()))
}

/// Shared fallback for known routes hit with the wrong verb.
pub async fn bad_verb() -> ApiError {
    tracing::error!("invalid request method");
    ApiError::bad_request("Bad Request")
}
