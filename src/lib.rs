//! # Distilled Site
//!
//! Serves a markdown book as a website, optionally behind GitHub organization
//! membership, and publishes a static build of it to S3.
//!
//! ## Features
//!
//! - **Markdown sections**: `views/section/<id>.md` rendered with a shared layout
//! - **Placeholder pages**: unknown sections render a "coming soon" page, never an error
//! - **Slide decks**: remark.js pages backed by `/decks/<id>.md`
//! - **Access gate**: signed session cookies plus a per-request membership check
//! - **Static build and deploy**: directory-index HTML uploaded with public-read ACLs,
//!   followed by a Cloudflare purge
//!
//! ## Architecture
//!
//! - [`content`] - Identifiers, resolution, markdown and page layouts
//! - [`identity`] - GitHub OAuth and organization membership
//! - [`server`] - Axum router, access gate and session cookies
//! - [`site`] - Static site builder
//! - [`deploy`] - S3 publisher and CDN invalidation
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use distilled_site::{create_router, ContentResolver, IdentityServices, RouterConfig, SiteRenderer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let renderer = SiteRenderer::new(ContentResolver::new("views"));
//!     let config = RouterConfig::without_auth("a-session-secret-of-at-least-32-bytes")
//!         .with_static_dir("public");
//!
//!     let router = create_router(renderer, IdentityServices::disabled(), config);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:4567").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod content;
pub mod deploy;
pub mod error;
pub mod identity;
pub mod server;
pub mod site;

// Re-export commonly used types
pub use config::{BuildConfig, Cli, Command, DeployConfig, RuntimeMode, ServeConfig};
pub use content::{
    ContentId, ContentResolver, FixedPage, PageContext, RenderedPage, Resolution, SiteRenderer,
};
pub use deploy::{
    collect_files, publish_and_invalidate, CdnInvalidator, CloudflareInvalidator, DeployOutcome,
    DeployableFile, FailurePolicy, ObjectStore, PublishReport, Publisher, S3ObjectStore, S3Target,
};
pub use error::{ContentError, ContentIdError, DeployError, IdentityError, SessionError};
pub use identity::{
    GitHubClient, GitHubConfig, Identity, IdentityProvider, MembershipChecker, ProviderRegistry,
};
pub use server::{
    access_gate, create_router, AccessGate, AppState, GateDecision, IdentityServices,
    RouterConfig, Session, SessionStore,
};
pub use site::{BuildReport, SiteBuilder};
