//! HTTP request handlers.
//!
//! # Endpoints
//!
//! - `GET /` - Redirect to the default section
//! - `GET /section/{id}` - Render a section (placeholder if missing)
//! - `GET /slides/{id}/` - Slide-deck page
//! - `GET /decks/{file}` - Slide-deck markdown source
//! - `GET /sign-in` - Sign-in page
//! - `GET /auth/{provider}` - Start the OAuth handshake
//! - `GET /auth/{provider}/callback` - Complete the OAuth handshake
//! - `GET /auth/failure` - Sign-in failed page
//! - `GET /auth/{provider}/deauthorized` - Access revoked page
//! - `GET /logout` - Clear the session
//! - `GET /health` - Health check

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

use super::gate::AccessGate;
use super::session::{Session, SessionStore, OAUTH_STATE_KEY};
use crate::content::{
    ContentId, FixedPage, PageContext, Resolution, SiteRenderer, DECK_EXTENSION,
};
use crate::error::ContentError;
use crate::identity::ProviderRegistry;

// =============================================================================
// Application State
// =============================================================================

/// Cache-Control policy for rendered pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheControl {
    /// max-age in seconds
    pub max_age: u32,

    /// Emit `private` instead of `public`
    pub private: bool,
}

impl CacheControl {
    pub fn public(max_age: u32) -> Self {
        Self {
            max_age,
            private: false,
        }
    }

    pub fn private(max_age: u32) -> Self {
        Self {
            max_age,
            private: true,
        }
    }

    /// Pages rendered for a signed-in caller never go into shared caches.
    pub fn for_session(&self, session: &Session) -> Self {
        if session.authenticated() {
            Self::private(self.max_age)
        } else {
            *self
        }
    }

    pub fn header_value(&self) -> String {
        let scope = if self.private { "private" } else { "public" };
        format!("{}, must-revalidate, max-age={}", scope, self.max_age)
    }
}

/// Shared application state.
///
/// Everything here is constructed once at startup; per-request state lives
/// only in the session cookie.
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<SiteRenderer>,
    pub sessions: SessionStore,
    pub gate: Arc<AccessGate>,
    pub providers: Arc<ProviderRegistry>,
    pub default_section: ContentId,
    pub cache_control: CacheControl,
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters of the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    /// Set by the provider when the user declined or the app was rejected
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// Response Helpers
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Build an HTML response with the given Cache-Control policy.
pub fn html_response(status: StatusCode, html: String, cache: CacheControl) -> Response {
    let mut response = (status, Html(html)).into_response();
    if let Ok(value) = HeaderValue::from_str(&cache.header_value()) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

fn page_context(session: &Session) -> PageContext {
    match session.user_id() {
        Some(user) if session.authenticated() => PageContext::signed_in(user),
        _ => PageContext::anonymous(),
    }
}

async fn fixed_page_response(
    state: &AppState,
    session: &Session,
    page: FixedPage,
    status: StatusCode,
) -> Result<Response, ContentError> {
    let rendered = state
        .renderer
        .render_fixed(page, &page_context(session))
        .await?;
    Ok(html_response(
        status,
        rendered.html,
        state.cache_control.for_session(session),
    ))
}

/// Convert ContentError to an HTTP response.
///
/// Content errors are always server-side (a file that existed could not be
/// read), so they log at ERROR and return a bare 500 page.
impl IntoResponse for ContentError {
    fn into_response(self) -> Response {
        error!(error = %self, status = 500, "Server error: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<!DOCTYPE html><title>Server error</title><h1>Server error</h1>".to_string()),
        )
            .into_response()
    }
}

// =============================================================================
// Content Handlers
// =============================================================================

/// `GET /` - redirect to the configured default section.
pub async fn root_handler(State(state): State<AppState>) -> Redirect {
    Redirect::to(&format!("/section/{}", state.default_section))
}

/// `GET /section/{id}` - render a section, or the placeholder when missing.
pub async fn section_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Response, ContentError> {
    let session = state.sessions.load(&jar);
    let (resolution, page) = state
        .renderer
        .render_section(&id, &page_context(&session))
        .await?;

    if resolution == Resolution::ComingSoon {
        debug!(id = %id, "Served placeholder");
    }

    Ok(html_response(
        StatusCode::OK,
        page.html,
        state.cache_control.for_session(&session),
    ))
}

/// `GET /slides/{id}/` - slide-deck page; no existence check on the deck.
pub async fn slides_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Result<Response, ContentError> {
    let session = state.sessions.load(&jar);

    match ContentId::parse(&id) {
        Ok(id) => {
            let page = state.renderer.render_slides(&id);
            Ok(html_response(
                StatusCode::OK,
                page.html,
                state.cache_control.for_session(&session),
            ))
        }
        Err(e) => {
            debug!(id = %id, error = %e, "Rejected deck identifier");
            fixed_page_response(&state, &session, FixedPage::NotFound, StatusCode::NOT_FOUND)
                .await
        }
    }
}

/// `GET /decks/{file}` - raw markdown of a deck, fetched by the slide page.
///
/// `file` must be `<id>.md`; anything else, or a deck with no source, is the
/// 404 page.
pub async fn deck_source_handler(
    State(state): State<AppState>,
    Path(file): Path<String>,
    jar: CookieJar,
) -> Result<Response, ContentError> {
    let session = state.sessions.load(&jar);

    let markdown = match deck_stem(&file) {
        Some(stem) => state.renderer.resolver().deck(stem).await?,
        None => None,
    };

    let Some(markdown) = markdown else {
        debug!(file = %file, "No deck source");
        return fixed_page_response(&state, &session, FixedPage::NotFound, StatusCode::NOT_FOUND)
            .await;
    };

    let mut response = (
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        markdown,
    )
        .into_response();
    let cache = state.cache_control.for_session(&session);
    if let Ok(value) = HeaderValue::from_str(&cache.header_value()) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    Ok(response)
}

fn deck_stem(file: &str) -> Option<&str> {
    file.strip_suffix(DECK_EXTENSION)?.strip_suffix('.')
}

/// Fallback for unknown routes: the markdown not-found page with a 404.
pub async fn not_found_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, ContentError> {
    let session = state.sessions.load(&jar);
    fixed_page_response(&state, &session, FixedPage::NotFound, StatusCode::NOT_FOUND).await
}

// =============================================================================
// Authentication Handlers
// =============================================================================

/// `GET /sign-in`
pub async fn sign_in_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, ContentError> {
    let session = state.sessions.load(&jar);
    fixed_page_response(&state, &session, FixedPage::SignIn, StatusCode::OK).await
}

/// `GET /auth/{provider}` - store a fresh `state` and send the browser to
/// the provider.
pub async fn auth_start_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<Response, ContentError> {
    let mut session = state.sessions.load(&jar);

    let Some(identity_provider) = state.providers.find(&provider) else {
        warn!(provider = %provider, "Sign-in requested for unknown provider");
        return fixed_page_response(&state, &session, FixedPage::AuthFailed, StatusCode::NOT_FOUND)
            .await;
    };

    let oauth_state = generate_oauth_state();
    let location = identity_provider.authorize_url(&oauth_state);
    session.set(OAUTH_STATE_KEY, oauth_state);

    let jar = state.sessions.save(jar, &session);
    Ok((jar, Redirect::to(&location)).into_response())
}

/// `GET /auth/{provider}/callback` - complete the handshake, record the
/// identity and go back to the site root.
pub async fn auth_callback_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Result<Response, ContentError> {
    let mut session = state.sessions.load(&jar);
    let expected_state = session.clear(OAUTH_STATE_KEY);

    match complete_sign_in(&state, &provider, &params, expected_state.as_deref()).await {
        Ok(nickname) => {
            info!(provider = %provider, user = %nickname, "Signed in");
            session.sign_in(nickname);
            let jar = state.sessions.save(jar, &session);
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(reason) => {
            warn!(provider = %provider, reason = reason, "Sign-in failed");
            let jar = state.sessions.save(jar, &session);
            let page =
                fixed_page_response(&state, &session, FixedPage::AuthFailed, StatusCode::OK)
                    .await?;
            Ok((jar, page).into_response())
        }
    }
}

async fn complete_sign_in(
    state: &AppState,
    provider: &str,
    params: &CallbackParams,
    expected_state: Option<&str>,
) -> Result<String, &'static str> {
    let identity_provider = state.providers.find(provider).ok_or("unknown provider")?;

    if params.error.is_some() {
        return Err("provider returned an error");
    }

    let (Some(expected), Some(provided)) = (expected_state, params.state.as_deref()) else {
        return Err("missing state");
    };
    if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        return Err("state mismatch");
    }

    let code = params.code.as_deref().ok_or("missing code")?;

    identity_provider
        .exchange_code(code)
        .await
        .map(|identity| identity.nickname)
        .map_err(|e| {
            warn!(provider = provider, error = %e, "Code exchange failed");
            "code exchange failed"
        })
}

fn generate_oauth_state() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// `GET /auth/failure`
pub async fn auth_failure_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, ContentError> {
    let session = state.sessions.load(&jar);
    fixed_page_response(&state, &session, FixedPage::AuthFailed, StatusCode::OK).await
}

/// `GET /auth/{provider}/deauthorized`
pub async fn deauthorized_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<Response, ContentError> {
    debug!(provider = %provider, "Deauthorization callback");
    let session = state.sessions.load(&jar);
    fixed_page_response(&state, &session, FixedPage::Deauthorized, StatusCode::OK).await
}

/// `GET /logout` - drop the authenticated flag and go back to the root.
pub async fn logout_handler(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut session = state.sessions.load(&jar);
    if let Some(user) = session.user_id() {
        info!(user = %user, "Signed out");
    }
    session.sign_out();

    let jar = state.sessions.save(jar, &session);
    (jar, Redirect::to("/")).into_response()
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
