//! Access gate for member-only routes.
//!
//! # Decision Table
//!
//! ```text
//! mode         authenticated   is_member(user, org)   decision
//! ───────────  ─────────────   ────────────────────   ─────────
//! development  (any)           (not called)           Allow
//! production   false           (not called)           SignIn    -> 303 /sign-in
//! production   true            Ok(true)               Allow
//! production   true            Ok(false)              Forbidden -> 403 page
//! production   true            Err / timeout          Forbidden -> 403 page
//! ```
//!
//! Membership is re-checked on every gated request; nothing is cached.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use super::handlers::{html_response, AppState};
use super::session::Session;
use crate::config::RuntimeMode;
use crate::content::{FixedPage, PageContext};
use crate::identity::MembershipChecker;

/// Path unauthenticated callers are redirected to.
pub const SIGN_IN_PATH: &str = "/sign-in";

/// Default timeout for a membership lookup.
pub const DEFAULT_MEMBERSHIP_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of evaluating a session against the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    SignIn,
    Forbidden,
}

/// Guards member-only routes.
#[derive(Clone)]
pub struct AccessGate {
    mode: RuntimeMode,
    org: String,
    checker: Arc<dyn MembershipChecker>,
    timeout: Duration,
}

impl AccessGate {
    pub fn new(
        mode: RuntimeMode,
        org: impl Into<String>,
        checker: Arc<dyn MembershipChecker>,
    ) -> Self {
        Self {
            mode,
            org: org.into(),
            checker,
            timeout: DEFAULT_MEMBERSHIP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    /// Decide whether `session` may see gated content. Fails closed.
    pub async fn evaluate(&self, session: &Session) -> GateDecision {
        if self.mode.is_development() {
            debug!("Development mode, skipping access gate");
            return GateDecision::Allow;
        }

        if !session.authenticated() {
            return GateDecision::SignIn;
        }

        let Some(user) = session.user_id() else {
            warn!("Authenticated session without a user id");
            return GateDecision::SignIn;
        };

        match tokio::time::timeout(self.timeout, self.checker.is_member(user, &self.org)).await {
            Ok(Ok(true)) => GateDecision::Allow,
            Ok(Ok(false)) => {
                debug!(user = user, org = %self.org, "Not an organization member");
                GateDecision::Forbidden
            }
            Ok(Err(e)) => {
                warn!(user = user, org = %self.org, error = %e, "Membership check failed, denying");
                GateDecision::Forbidden
            }
            Err(_) => {
                warn!(
                    user = user,
                    org = %self.org,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Membership check timed out, denying"
                );
                GateDecision::Forbidden
            }
        }
    }
}

/// Axum middleware applying the [`AccessGate`] in front of a route.
///
/// ```ignore
/// let gated = Router::new()
///     .route("/section/{id}", get(section_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), access_gate));
/// ```
pub async fn access_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let session = state.sessions.load(&jar);

    match state.gate.evaluate(&session).await {
        GateDecision::Allow => next.run(request).await,
        GateDecision::SignIn => {
            debug!(path = %request.uri().path(), "Unauthenticated, redirecting to sign-in");
            Redirect::to(SIGN_IN_PATH).into_response()
        }
        GateDecision::Forbidden => {
            let ctx = match session.user_id() {
                Some(user) => PageContext::signed_in(user),
                None => PageContext::anonymous(),
            };
            match state.renderer.render_fixed(FixedPage::Forbidden, &ctx).await {
                Ok(page) => html_response(
                    StatusCode::FORBIDDEN,
                    page.html,
                    state.cache_control.for_session(&session),
                ),
                Err(e) => e.into_response(),
            }
        }
    }
}
