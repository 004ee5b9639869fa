//! Route table and router construction.
//!
//! # Route Structure
//!
//! ```text
//! /                               - Redirect to default section (public)
//! /section/{id}                   - Section page (gated when auth is required)
//! /slides/{id}/                   - Slide deck (gated when auth is required)
//! /decks/{file}                   - Deck markdown (gated when auth is required)
//! /sign-in                        - Sign-in page (public)
//! /auth/{provider}                - Start OAuth (public)
//! /auth/{provider}/callback       - OAuth callback (public)
//! /auth/failure                   - Sign-in failed (public)
//! /auth/{provider}/deauthorized   - Access revoked (public)
//! /logout                         - Sign out (public)
//! /health                         - Health check (public)
//! (fallback)                      - Static files, then markdown 404
//! ```
//!
//! # Example
//!
//! ```ignore
//! use distilled_site::content::{ContentResolver, SiteRenderer};
//! use distilled_site::server::{create_router, IdentityServices, RouterConfig};
//!
//! let renderer = SiteRenderer::new(ContentResolver::new("views"));
//! let config = RouterConfig::new("a-session-secret-of-at-least-32-bytes")
//!     .with_org("SICPDistilled");
//!
//! let router = create_router(renderer, IdentityServices::disabled(), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:4567").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    handler::Handler,
    middleware,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use http::Method;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::gate::{access_gate, AccessGate, DEFAULT_MEMBERSHIP_TIMEOUT};
use super::handlers::{
    auth_callback_handler, auth_failure_handler, auth_start_handler, deauthorized_handler,
    deck_source_handler, health_handler, logout_handler, not_found_handler, root_handler, section_handler,
    sign_in_handler, slides_handler, AppState, CacheControl,
};
use super::session::{SessionStore, DEFAULT_SESSION_MAX_AGE};
use crate::config::{RuntimeMode, DEFAULT_CACHE_MAX_AGE, DEFAULT_SECTION};
use crate::content::{ContentId, SiteRenderer};
use crate::identity::{DenyAllMembership, MembershipChecker, ProviderRegistry};

// =============================================================================
// Route Table
// =============================================================================

/// Handler behind a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Root,
    Section,
    Slides,
    DeckSource,
    SignIn,
    AuthStart,
    AuthCallback,
    AuthFailure,
    AuthDeauthorized,
    Logout,
    Health,
}

/// Whether a route sits behind the access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Gated when the router is configured to require authentication
    Gated,
}

/// One row of the route table.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub method: Method,
    pub path: &'static str,
    pub endpoint: Endpoint,
    pub access: Access,
}

impl RouteEntry {
    fn get(path: &'static str, endpoint: Endpoint, access: Access) -> Self {
        Self {
            method: Method::GET,
            path,
            endpoint,
            access,
        }
    }
}

/// The canonical, ordered route table.
pub fn route_table() -> Vec<RouteEntry> {
    use Access::{Gated, Public};

    vec![
        RouteEntry::get("/", Endpoint::Root, Public),
        RouteEntry::get("/section/{id}", Endpoint::Section, Gated),
        RouteEntry::get("/slides/{id}/", Endpoint::Slides, Gated),
        RouteEntry::get("/decks/{file}", Endpoint::DeckSource, Gated),
        RouteEntry::get("/sign-in", Endpoint::SignIn, Public),
        RouteEntry::get("/auth/failure", Endpoint::AuthFailure, Public),
        RouteEntry::get("/auth/{provider}", Endpoint::AuthStart, Public),
        RouteEntry::get("/auth/{provider}/callback", Endpoint::AuthCallback, Public),
        RouteEntry::get(
            "/auth/{provider}/deauthorized",
            Endpoint::AuthDeauthorized,
            Public,
        ),
        RouteEntry::get("/logout", Endpoint::Logout, Public),
        RouteEntry::get("/health", Endpoint::Health, Public),
    ]
}

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Development bypasses the access gate
    pub mode: RuntimeMode,

    /// Secret for signing session cookies
    pub session_secret: String,

    /// Whether gated routes sit behind the access gate
    pub require_auth: bool,

    /// Organization whose members may read gated content
    pub org: String,

    /// Section the site root redirects to
    pub default_section: ContentId,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    pub session_max_age: Duration,

    pub membership_timeout: Duration,

    /// Directory served for unmatched paths before the 404 page
    pub static_dir: Option<PathBuf>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a production configuration with the access gate enabled.
    pub fn new(session_secret: impl Into<String>) -> Self {
        Self {
            mode: RuntimeMode::Production,
            session_secret: session_secret.into(),
            require_auth: true,
            org: String::new(),
            default_section: default_section_id(),
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            session_max_age: DEFAULT_SESSION_MAX_AGE,
            membership_timeout: DEFAULT_MEMBERSHIP_TIMEOUT,
            static_dir: None,
            enable_tracing: true,
        }
    }

    /// Create a configuration with every route public.
    pub fn without_auth(session_secret: impl Into<String>) -> Self {
        Self::new(session_secret).with_require_auth(false)
    }

    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }

    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.org = org.into();
        self
    }

    pub fn with_default_section(mut self, section: ContentId) -> Self {
        self.default_section = section;
        self
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_session_max_age(mut self, max_age: Duration) -> Self {
        self.session_max_age = max_age;
        self
    }

    pub fn with_membership_timeout(mut self, timeout: Duration) -> Self {
        self.membership_timeout = timeout;
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

fn default_section_id() -> ContentId {
    ContentId::parse(DEFAULT_SECTION).expect("default section is a valid identifier")
}

/// Identity collaborators injected into the router.
#[derive(Clone)]
pub struct IdentityServices {
    pub membership: Arc<dyn MembershipChecker>,
    pub providers: ProviderRegistry,
}

impl IdentityServices {
    pub fn new(membership: Arc<dyn MembershipChecker>, providers: ProviderRegistry) -> Self {
        Self {
            membership,
            providers,
        }
    }

    /// No providers, and nobody is a member.
    pub fn disabled() -> Self {
        Self::new(Arc::new(DenyAllMembership), ProviderRegistry::new())
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router from the route table.
pub fn create_router(
    renderer: SiteRenderer,
    identity: IdentityServices,
    config: RouterConfig,
) -> Router {
    let sessions = SessionStore::new(&config.session_secret)
        .with_max_age(config.session_max_age)
        .with_secure(config.mode.is_production());

    let gate = AccessGate::new(config.mode, config.org.clone(), identity.membership)
        .with_timeout(config.membership_timeout);

    let cache_control = if config.require_auth {
        CacheControl::private(config.cache_max_age)
    } else {
        CacheControl::public(config.cache_max_age)
    };

    let state = AppState {
        renderer: Arc::new(renderer),
        sessions,
        gate: Arc::new(gate),
        providers: Arc::new(identity.providers),
        default_section: config.default_section.clone(),
        cache_control,
    };

    let mut router = Router::new();
    for entry in route_table() {
        let mut method_router = endpoint_router(entry.endpoint, entry.method);
        if entry.access == Access::Gated && config.require_auth {
            method_router = method_router
                .route_layer(middleware::from_fn_with_state(state.clone(), access_gate));
        }
        router = router.route(entry.path, method_router);
    }

    let not_found = not_found_handler.with_state(state.clone());
    let router = match config.static_dir {
        Some(ref dir) => router.fallback_service(ServeDir::new(dir).fallback(not_found)),
        None => router.fallback_service(not_found),
    };

    let router = router.with_state(state);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn endpoint_router(endpoint: Endpoint, method: Method) -> MethodRouter<AppState> {
    let filter = MethodFilter::try_from(method).unwrap_or(MethodFilter::GET);
    match endpoint {
        Endpoint::Root => on(filter, root_handler),
        Endpoint::Section => on(filter, section_handler),
        Endpoint::Slides => on(filter, slides_handler),
        Endpoint::DeckSource => on(filter, deck_source_handler),
        Endpoint::SignIn => on(filter, sign_in_handler),
        Endpoint::AuthStart => on(filter, auth_start_handler),
        Endpoint::AuthCallback => on(filter, auth_callback_handler),
        Endpoint::AuthFailure => on(filter, auth_failure_handler),
        Endpoint::AuthDeauthorized => on(filter, deauthorized_handler),
        Endpoint::Logout => on(filter, logout_handler),
        Endpoint::Health => on(filter, health_handler),
    }
}

// =============================================================================
// Tests
// =============================================================================
