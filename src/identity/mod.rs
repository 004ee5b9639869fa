//! External identity: OAuth sign-in and organization membership.
//!
//! Both concerns sit behind traits so the server can be handed a real GitHub
//! client in production and an in-memory double in tests. Instances are
//! constructed once per process and shared through `Arc`.

mod github;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::IdentityError;

pub use github::{GitHubClient, GitHubConfig, DEFAULT_GITHUB_API_URL, DEFAULT_GITHUB_OAUTH_URL};

/// Identity returned by a completed OAuth exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Login name (GitHub `login`), stored as the session's user id
    pub nickname: String,
}

/// Answers "does `user` belong to `org`?".
#[async_trait]
pub trait MembershipChecker: Send + Sync {
    async fn is_member(&self, user: &str, org: &str) -> Result<bool, IdentityError>;
}

/// An OAuth identity provider reachable under `/auth/{name}`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Path segment identifying the provider (e.g. `github`).
    fn name(&self) -> &str;

    /// URL the browser is sent to in order to start the handshake.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange the callback `code` for the caller's identity.
    async fn exchange_code(&self, code: &str) -> Result<Identity, IdentityError>;
}

/// OAuth providers available under `/auth/{name}`.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn IdentityProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn IdentityProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

/// Membership checker used when no identity service is configured.
///
/// Always answers "not a member", so a gate wired to it denies every
/// authenticated session.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllMembership;

#[async_trait]
impl MembershipChecker for DenyAllMembership {
    async fn is_member(&self, _user: &str, _org: &str) -> Result<bool, IdentityError> {
        Ok(false)
    }
}
