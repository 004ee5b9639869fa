//! Cookie-backed session store.
//!
//! The whole session lives in one signed cookie; nothing is kept server-side.
//! Losing the cookie loses the session.
//!
//! # Cookie Format
//!
//! ```text
//! site_session = base64url(json({"v": {...}, "iat": 1735689600})) "." hex(hmac)
//! hmac         = HMAC-SHA256(secret, base64url part)
//! ```
//!
//! A cookie that fails to decode, carries a bad signature, or is older than
//! the configured max age is treated as an empty session.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::SessionError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "site_session";

/// Default session lifetime (7 days).
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub const AUTHENTICATED_KEY: &str = "authenticated";
pub const USER_ID_KEY: &str = "user_id";
pub const OAUTH_STATE_KEY: &str = "oauth_state";

// =============================================================================
// Session
// =============================================================================

/// Per-caller key/value state carried in the session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    values: BTreeMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn clear(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn authenticated(&self) -> bool {
        self.get(AUTHENTICATED_KEY) == Some("true")
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID_KEY).filter(|id| !id.is_empty())
    }

    /// Record a completed sign-in.
    pub fn sign_in(&mut self, nickname: impl Into<String>) {
        self.set(AUTHENTICATED_KEY, "true");
        self.set(USER_ID_KEY, nickname);
    }

    /// Drop the authenticated flag and identity.
    pub fn sign_out(&mut self) {
        self.set(AUTHENTICATED_KEY, "false");
        self.clear(USER_ID_KEY);
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionPayload {
    #[serde(rename = "v")]
    values: BTreeMap<String, String>,

    #[serde(rename = "iat")]
    issued_at: u64,
}

// =============================================================================
// Session Store
// =============================================================================

/// Signs, verifies and (de)serializes session cookies.
#[derive(Clone)]
pub struct SessionStore {
    secret_key: Vec<u8>,
    max_age: Duration,
    secure: bool,
}

impl SessionStore {
    /// Create a store signing with the given secret.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
            max_age: DEFAULT_SESSION_MAX_AGE,
            secure: false,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Mark cookies `Secure` (HTTPS only).
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Session carried by the request, or an empty one.
    pub fn load(&self, jar: &CookieJar) -> Session {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Session::new();
        };

        match self.decode(cookie.value()) {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "Discarding session cookie");
                Session::new()
            }
        }
    }

    /// Write the session into the jar.
    pub fn save(&self, jar: CookieJar, session: &Session) -> CookieJar {
        let value = self.encode(session);
        let cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(cookie::time::Duration::seconds(self.max_age.as_secs() as i64))
            .build();
        jar.add(cookie)
    }

    pub fn encode(&self, session: &Session) -> String {
        self.encode_at(session, unix_now())
    }

    pub fn decode(&self, value: &str) -> Result<Session, SessionError> {
        self.decode_at(value, unix_now())
    }

    fn encode_at(&self, session: &Session, issued_at: u64) -> String {
        let payload = SessionPayload {
            values: session.values.clone(),
            issued_at,
        };
        // BTreeMap<String, String> + u64 always serializes
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        let body = URL_SAFE_NO_PAD.encode(json);
        let signature = self.compute_signature(&body);
        format!("{}.{}", body, signature)
    }

    fn decode_at(&self, value: &str, now: u64) -> Result<Session, SessionError> {
        let (body, signature) = value.rsplit_once('.').ok_or(SessionError::Malformed)?;

        let provided_sig = hex::decode(signature).map_err(|_| SessionError::Malformed)?;
        let expected_sig = hex::decode(self.compute_signature(body))
            .map_err(|_| SessionError::InvalidSignature)?;

        if !bool::from(provided_sig.ct_eq(&expected_sig)) {
            return Err(SessionError::InvalidSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| SessionError::Malformed)?;
        let payload: SessionPayload =
            serde_json::from_slice(&json).map_err(|_| SessionError::Malformed)?;

        let max_age = self.max_age.as_secs();
        if now.saturating_sub(payload.issued_at) > max_age {
            return Err(SessionError::Expired {
                issued_at: payload.issued_at,
                max_age,
            });
        }

        Ok(Session {
            values: payload.values,
        })
    }

    fn compute_signature(&self, body: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
