use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{Identity, IdentityProvider, MembershipChecker};
use crate::error::IdentityError;

/// Default GitHub REST API base URL.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default GitHub OAuth base URL.
pub const DEFAULT_GITHUB_OAUTH_URL: &str = "https://github.com";

const PROVIDER_NAME: &str = "github";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// GitHub client configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// OAuth application client id
    pub client_id: String,

    /// OAuth application client secret
    pub client_secret: String,

    /// Token used for organization membership lookups
    pub api_token: Option<String>,

    /// Callback URL registered with the OAuth app (optional; GitHub falls
    /// back to the app's configured URL)
    pub callback_url: Option<String>,

    pub api_base_url: String,
    pub oauth_base_url: String,

    /// Timeout applied to every request
    pub timeout: Duration,
}

impl GitHubConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_token: None,
            callback_url: None,
            api_base_url: DEFAULT_GITHUB_API_URL.to_string(),
            oauth_base_url: DEFAULT_GITHUB_OAUTH_URL.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_urls(mut self, api: impl Into<String>, oauth: impl Into<String>) -> Self {
        self.api_base_url = api.into();
        self.oauth_base_url = oauth.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

/// GitHub OAuth provider and organization membership checker.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self, IdentityError> {
        // The membership endpoint answers 302 for non-members when the token
        // cannot see private membership; following it would hide that.
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("distilled-site/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IdentityError::Http(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> IdentityError {
        if e.is_timeout() {
            IdentityError::Timeout(self.config.timeout)
        } else {
            IdentityError::Http(e.to_string())
        }
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, IdentityError> {
        let endpoint = format!(
            "{}/login/oauth/access_token",
            self.config.oauth_base_url.trim_end_matches('/')
        );

        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
        ];
        if let Some(ref callback) = self.config.callback_url {
            form.push(("redirect_uri", callback.as_str()));
        }

        let response = self
            .http
            .post(&endpoint)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(IdentityError::UnexpectedStatus {
                endpoint,
                status: response.status().as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;

        token_from_response(body)
    }

    async fn fetch_login(&self, access_token: &str) -> Result<String, IdentityError> {
        let endpoint = self.api_url("/user");
        let response = self
            .http
            .get(&endpoint)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(IdentityError::UnexpectedStatus {
                endpoint,
                status: response.status().as_u16(),
            });
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;
        Ok(user.login)
    }
}

#[async_trait]
impl IdentityProvider for GitHubClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn authorize_url(&self, state: &str) -> String {
        let base = format!(
            "{}/login/oauth/authorize",
            self.config.oauth_base_url.trim_end_matches('/')
        );

        let mut params = vec![
            ("client_id", self.config.client_id.as_str()),
            ("scope", "read:user"),
            ("state", state),
        ];
        if let Some(ref callback) = self.config.callback_url {
            params.push(("redirect_uri", callback.as_str()));
        }

        match Url::parse_with_params(&base, &params) {
            Ok(url) => url.to_string(),
            // Only reachable with a malformed base URL from configuration
            Err(_) => base,
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<Identity, IdentityError> {
        let access_token = self.fetch_access_token(code).await?;
        let nickname = self.fetch_login(&access_token).await?;
        debug!(nickname = %nickname, "GitHub sign-in completed");
        Ok(Identity { nickname })
    }
}

#[async_trait]
impl MembershipChecker for GitHubClient {
    async fn is_member(&self, user: &str, org: &str) -> Result<bool, IdentityError> {
        let endpoint = self.api_url(&format!(
            "/orgs/{}/members/{}",
            urlencoding::encode(org),
            urlencoding::encode(user)
        ));

        let mut request = self.http.get(&endpoint).header(ACCEPT, GITHUB_ACCEPT);
        if let Some(ref token) = self.config.api_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let result = membership_from_status(status, &endpoint);
        if result.is_err() {
            warn!(
                endpoint = %endpoint,
                status = status.as_u16(),
                "Unexpected membership response"
            );
        }
        result
    }
}

/// Interpret the status of `GET /orgs/{org}/members/{user}`.
///
/// 204 means member. 404 means not a member (or not visible to the token);
/// 302 means the requester is not an org member and was redirected to the
/// public list, which says nothing about `user`, so it also counts as no.
fn membership_from_status(status: StatusCode, endpoint: &str) -> Result<bool, IdentityError> {
    match status {
        StatusCode::NO_CONTENT => Ok(true),
        StatusCode::NOT_FOUND | StatusCode::FOUND => Ok(false),
        other => Err(IdentityError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status: other.as_u16(),
        }),
    }
}

fn token_from_response(body: TokenResponse) -> Result<String, IdentityError> {
    if let Some(error) = body.error {
        let message = match body.error_description {
            Some(description) => format!("{}: {}", error, description),
            None => error,
        };
        return Err(IdentityError::Provider(message));
    }

    body.access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| IdentityError::InvalidResponse("missing access_token".to_string()))
}
