//! Configuration management for the distilled site.
//!
//! Every subcommand reads its options from the command line, falling back to
//! environment variables, falling back to defaults.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use distilled_site::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! if let Command::Serve(config) = cli.command {
//!     println!("Listening on {}", config.bind_address());
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `SITE_HOST`, `SITE_PORT` - bind address (default: 0.0.0.0:4567)
//! - `SITE_MODE` - `development` or `production` (default: production)
//! - `SITE_VIEWS_DIR` - markdown sources (default: views)
//! - `SITE_STATIC_DIR` - static assets (default: public)
//! - `SITE_DEFAULT_SECTION` - where `/` redirects (default: 1-distilled)
//! - `SITE_CACHE_MAX_AGE` - Cache-Control max-age seconds (default: 600)
//! - `SITE_REQUIRE_AUTH` - gate sections and slides (default: true)
//! - `SITE_MEMBERSHIP_TIMEOUT` - membership lookup timeout seconds (default: 5)
//! - `SESSION_SECRET` - session cookie signing key
//! - `GITHUB_KEY`, `GITHUB_SECRET` - OAuth application credentials
//! - `GITHUB_TOKEN` - token for organization membership lookups
//! - `GITHUB_ORG` - organization whose members may read gated pages
//! - `BUCKET`, `AWS_REGION`, `SITE_S3_ENDPOINT` - deploy target
//! - `CLOUDFLARE_CLIENT_API_KEY`, `CLOUDFLARE_EMAIL`, `CLOUDFLARE_ZONE`,
//!   `SITE_BASE_URLS` - CDN purge after deploy

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::content::{ContentId, DEFAULT_SITE_TITLE};
use crate::deploy::{CloudflareConfig, FailurePolicy};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 4567;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default HTTP cache max-age in seconds (10 minutes).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 600;

/// Section the site root redirects to.
pub const DEFAULT_SECTION: &str = "1-distilled";

pub const DEFAULT_VIEWS_DIR: &str = "views";
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Default membership lookup timeout in seconds.
pub const DEFAULT_MEMBERSHIP_TIMEOUT_SECS: u64 = 5;

/// Default extra upload attempts per file.
pub const DEFAULT_UPLOAD_RETRIES: u32 = 2;

/// Minimum session secret length when the gate is active in production.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Session secret used when none is configured. Only accepted in development.
pub const DEVELOPMENT_SESSION_SECRET: &str = "development-only-session-secret-do-not-deploy";

// =============================================================================
// Runtime Mode
// =============================================================================

/// Whether the site runs on a developer machine or in production.
///
/// Development bypasses the access gate entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RuntimeMode {
    Development,
    #[default]
    Production,
}

impl RuntimeMode {
    pub fn is_development(self) -> bool {
        self == RuntimeMode::Development
    }

    pub fn is_production(self) -> bool {
        self == RuntimeMode::Production
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Distilled Site - serves, builds and publishes a markdown book.
#[derive(Parser, Debug, Clone)]
#[command(name = "distilled")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeConfig),
    /// Render the site into a directory of static files.
    Build(BuildConfig),
    /// Upload a build directory to S3 and purge the CDN.
    Deploy(DeployConfig),
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "SITE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SITE_PORT")]
    pub port: u16,

    /// Runtime mode. Development disables the access gate.
    #[arg(long, value_enum, default_value_t = RuntimeMode::Production, env = "SITE_MODE")]
    pub mode: RuntimeMode,

    // =========================================================================
    // Content Configuration
    // =========================================================================
    /// Directory holding `section/*.md` and the fixed pages.
    #[arg(long, default_value = DEFAULT_VIEWS_DIR, env = "SITE_VIEWS_DIR")]
    pub views_dir: PathBuf,

    /// Directory of static assets served for unmatched paths.
    #[arg(long, default_value = DEFAULT_STATIC_DIR, env = "SITE_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Section the site root redirects to.
    #[arg(long, default_value = DEFAULT_SECTION, env = "SITE_DEFAULT_SECTION")]
    pub default_section: String,

    #[arg(long, default_value = DEFAULT_SITE_TITLE, env = "SITE_TITLE")]
    pub site_title: String,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "SITE_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Put sections and slides behind GitHub organization membership.
    ///
    /// WARNING: Only disable for a fully public site.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "SITE_REQUIRE_AUTH")]
    pub require_auth: bool,

    /// Secret for signing session cookies.
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// GitHub OAuth application client id.
    #[arg(long, env = "GITHUB_KEY")]
    pub github_key: Option<String>,

    /// GitHub OAuth application client secret.
    #[arg(long, env = "GITHUB_SECRET", hide_env_values = true)]
    pub github_secret: Option<String>,

    /// GitHub token for organization membership lookups.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Organization whose members may read gated pages.
    #[arg(long, env = "GITHUB_ORG")]
    pub github_org: Option<String>,

    /// OAuth callback URL, if it differs from the app's registered one.
    #[arg(long, env = "GITHUB_CALLBACK_URL")]
    pub github_callback_url: Option<String>,

    /// Timeout for a membership lookup in seconds.
    #[arg(
        long,
        default_value_t = DEFAULT_MEMBERSHIP_TIMEOUT_SECS,
        env = "SITE_MEMBERSHIP_TIMEOUT"
    )]
    pub membership_timeout_secs: u64,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        ContentId::parse(&self.default_section)
            .map_err(|e| format!("Invalid default section {:?}: {}", self.default_section, e))?;

        if self.membership_timeout_secs == 0 {
            return Err("membership_timeout_secs must be greater than 0".to_string());
        }

        if self.mode.is_development() {
            return Ok(());
        }

        let secret = match self.session_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                return Err(
                    "Production mode requires a session secret. \
                     Set --session-secret or SESSION_SECRET"
                        .to_string(),
                )
            }
        };
        if secret == DEVELOPMENT_SESSION_SECRET {
            return Err("The development session secret cannot be used in production".to_string());
        }

        if !self.require_auth {
            return Ok(());
        }

        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(format!(
                "Session secret must be at least {} bytes when auth is required",
                MIN_SESSION_SECRET_LEN
            ));
        }
        if is_blank(&self.github_key) || is_blank(&self.github_secret) {
            return Err(
                "Authentication is required but GitHub OAuth credentials are missing. \
                 Set GITHUB_KEY and GITHUB_SECRET, or disable auth with --require-auth=false"
                    .to_string(),
            );
        }
        if is_blank(&self.github_org) {
            return Err(
                "Authentication is required but no organization is set. Set --github-org or GITHUB_ORG"
                    .to_string(),
            );
        }
        // Without a token GitHub hides private members and everyone gets a 403
        if is_blank(&self.github_token) {
            return Err(
                "Authentication is required but no GitHub token is set for membership lookups. \
                 Set --github-token or GITHUB_TOKEN"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured secret, or the development default.
    pub fn session_secret_or_default(&self) -> &str {
        match self.session_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret,
            _ => DEVELOPMENT_SESSION_SECRET,
        }
    }

    pub fn membership_timeout(&self) -> Duration {
        Duration::from_secs(self.membership_timeout_secs)
    }

    /// Whether GitHub sign-in can be offered.
    pub fn has_github_credentials(&self) -> bool {
        !is_blank(&self.github_key) && !is_blank(&self.github_secret)
    }
}

// =============================================================================
// Build
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct BuildConfig {
    #[arg(long, default_value = DEFAULT_VIEWS_DIR, env = "SITE_VIEWS_DIR")]
    pub views_dir: PathBuf,

    /// Static assets copied into the output (skipped if missing).
    #[arg(long, default_value = DEFAULT_STATIC_DIR, env = "SITE_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Output directory.
    #[arg(short, long, default_value = DEFAULT_BUILD_DIR, env = "SITE_BUILD_DIR")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_SECTION, env = "SITE_DEFAULT_SECTION")]
    pub default_section: String,

    #[arg(long, default_value = DEFAULT_SITE_TITLE, env = "SITE_TITLE")]
    pub site_title: String,
}

impl BuildConfig {
    pub fn validate(&self) -> Result<(), String> {
        ContentId::parse(&self.default_section)
            .map_err(|e| format!("Invalid default section {:?}: {}", self.default_section, e))?;

        if self.output_dir == self.views_dir || self.output_dir == self.static_dir {
            return Err("output_dir must differ from views_dir and static_dir".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Deploy
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct DeployConfig {
    /// Build output directory to upload.
    #[arg(long, default_value = DEFAULT_BUILD_DIR, env = "SITE_BUILD_DIR")]
    pub build_dir: PathBuf,

    /// Target S3 bucket.
    #[arg(long, env = "BUCKET")]
    pub bucket: Option<String>,

    #[arg(long, default_value = DEFAULT_REGION, env = "AWS_REGION")]
    pub region: String,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "SITE_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// What to do when a file still fails after its retries.
    #[arg(long, value_enum, default_value_t = FailurePolicy::Continue)]
    pub on_failure: FailurePolicy,

    /// Extra attempts per file.
    #[arg(long, default_value_t = DEFAULT_UPLOAD_RETRIES)]
    pub retries: u32,

    /// Do not purge the CDN after uploading.
    #[arg(long, default_value_t = false)]
    pub skip_invalidation: bool,

    #[arg(long, env = "CLOUDFLARE_CLIENT_API_KEY", hide_env_values = true)]
    pub cloudflare_api_key: Option<String>,

    #[arg(long, env = "CLOUDFLARE_EMAIL")]
    pub cloudflare_email: Option<String>,

    /// Cloudflare zone name, e.g. `example.com`.
    #[arg(long, env = "CLOUDFLARE_ZONE")]
    pub cloudflare_zone: Option<String>,

    /// Public base URLs to purge (comma-separated).
    #[arg(long, env = "SITE_BASE_URLS", value_delimiter = ',')]
    pub base_urls: Vec<String>,
}

impl DeployConfig {
    pub fn validate(&self) -> Result<(), String> {
        if is_blank(&self.bucket) {
            return Err("S3 bucket name is required. Set --bucket or BUCKET".to_string());
        }

        if self.skip_invalidation {
            return Ok(());
        }

        let cloudflare = [
            &self.cloudflare_api_key,
            &self.cloudflare_email,
            &self.cloudflare_zone,
        ];
        let configured = cloudflare.iter().filter(|v| !is_blank(v)).count();
        if configured == 0 {
            return Ok(());
        }
        if configured < cloudflare.len() {
            return Err(
                "Incomplete Cloudflare configuration. Set CLOUDFLARE_CLIENT_API_KEY, \
                 CLOUDFLARE_EMAIL and CLOUDFLARE_ZONE, or pass --skip-invalidation"
                    .to_string(),
            );
        }
        if self.base_urls.is_empty() {
            return Err("CDN invalidation needs at least one base URL. Set SITE_BASE_URLS".to_string());
        }

        Ok(())
    }

    pub fn bucket_or_empty(&self) -> &str {
        self.bucket.as_deref().unwrap_or("")
    }

    /// Cloudflare settings, or `None` when invalidation is off or unconfigured.
    pub fn cloudflare_config(&self) -> Option<CloudflareConfig> {
        if self.skip_invalidation {
            return None;
        }
        match (
            non_blank(&self.cloudflare_api_key),
            non_blank(&self.cloudflare_email),
            non_blank(&self.cloudflare_zone),
        ) {
            (Some(key), Some(email), Some(zone)) => Some(CloudflareConfig::new(
                key,
                email,
                zone,
                self.base_urls.clone(),
            )),
            _ => None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn is_blank(value: &Option<String>) -> bool {
    non_blank(value).is_none()
}

// =============================================================================
// Tests
// =============================================================================
