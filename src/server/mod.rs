//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /section/{id}   GET /slides/{id}/   GET /decks/{file}     │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────┐  ┌───────────┐  │
//! │  │   routes    │  │    gate     │  │ session  │  │ handlers  │  │
//! │  │ (table)     │─▶│ (org check) │─▶│ (cookie) │─▶│ (render)  │  │
//! │  └─────────────┘  └─────────────┘  └──────────┘  └───────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod gate;
pub mod handlers;
pub mod routes;
pub mod session;

pub use gate::{access_gate, AccessGate, GateDecision, DEFAULT_MEMBERSHIP_TIMEOUT, SIGN_IN_PATH};
pub use handlers::{
    auth_callback_handler, auth_failure_handler, auth_start_handler, deauthorized_handler,
    deck_source_handler, health_handler, html_response, logout_handler, not_found_handler, root_handler,
    section_handler, sign_in_handler, slides_handler, AppState, CacheControl, CallbackParams,
    HealthResponse,
};
pub use routes::{
    create_router, route_table, Access, Endpoint, IdentityServices, RouteEntry, RouterConfig,
};
pub use session::{Session, SessionStore, DEFAULT_SESSION_MAX_AGE, SESSION_COOKIE};
