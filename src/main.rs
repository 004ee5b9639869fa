//! Distilled Site - serve, build and deploy a markdown book.
//!
//! This binary wires configuration into the library components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use distilled_site::{
    config::{BuildConfig, Cli, Command, DeployConfig, ServeConfig},
    content::{ContentId, ContentResolver, SiteRenderer},
    deploy::{
        collect_files, publish_and_invalidate, CdnInvalidator, CloudflareInvalidator, Publisher,
        S3ObjectStore, S3Target,
    },
    identity::{GitHubClient, GitHubConfig, ProviderRegistry},
    server::{create_router, IdentityServices, RouterConfig},
    site::SiteBuilder,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Serve(config) => run_serve(config).await,
        Command::Build(config) => run_build(config).await,
        Command::Deploy(config) => run_deploy(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let default_section = match ContentId::parse(&config.default_section) {
        Ok(id) => id,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Distilled Site v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Mode: {:?}", config.mode);
    info!("  Views: {}", config.views_dir.display());
    info!("  Static: {}", config.static_dir.display());
    info!("  Default section: {}", default_section);
    info!("  Cache max-age: {}s", config.cache_max_age);

    if config.mode.is_development() {
        warn!("  DEVELOPMENT MODE - the access gate is bypassed for every request");
        warn!("        Never run with --mode=development on a public host");
    }

    // Auth status with warning if disabled
    if config.require_auth {
        info!(
            "  Auth: GitHub organization '{}'",
            config.github_org.as_deref().unwrap_or("")
        );
        info!("  Membership timeout: {}s", config.membership_timeout_secs);
    } else {
        warn!("  Auth: DISABLED - all sections and slides are publicly accessible");
        warn!("        Enable for production: --require-auth=true --github-org=<org>");
    }

    let identity = match build_identity_services(&config) {
        Ok(identity) => identity,
        Err(e) => {
            error!("Failed to create GitHub client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if identity.providers.is_empty() {
        info!("  Sign-in: no identity provider configured");
    }

    let renderer = SiteRenderer::new(ContentResolver::new(&config.views_dir))
        .with_site_title(config.site_title.clone());

    let router_config = build_router_config(&config, default_section);
    let router = create_router(renderer, identity, router_config);

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    open http://{}/", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "distilled_site=debug,distilled=debug,tower_http=debug"
    } else {
        "distilled_site=info,distilled=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Construct the GitHub client once and share it as both provider and checker.
fn build_identity_services(
    config: &ServeConfig,
) -> Result<IdentityServices, distilled_site::IdentityError> {
    if !config.has_github_credentials() {
        return Ok(IdentityServices::disabled());
    }

    let mut github = GitHubConfig::new(
        config.github_key.clone().unwrap_or_default(),
        config.github_secret.clone().unwrap_or_default(),
    )
    .with_timeout(config.membership_timeout());

    if let Some(ref token) = config.github_token {
        github = github.with_api_token(token);
    }
    if let Some(ref callback) = config.github_callback_url {
        github = github.with_callback_url(callback);
    }

    let client = Arc::new(GitHubClient::new(github)?);
    let providers = ProviderRegistry::new().with_provider(client.clone());

    Ok(IdentityServices::new(client, providers))
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig, default_section: ContentId) -> RouterConfig {
    RouterConfig::new(config.session_secret_or_default())
        .with_mode(config.mode)
        .with_require_auth(config.require_auth)
        .with_org(config.github_org.clone().unwrap_or_default())
        .with_default_section(default_section)
        .with_cache_max_age(config.cache_max_age)
        .with_membership_timeout(config.membership_timeout())
        .with_static_dir(&config.static_dir)
        .with_tracing(!config.no_tracing)
}

// =============================================================================
// Build Command
// =============================================================================

async fn run_build(config: BuildConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let default_section = match ContentId::parse(&config.default_section) {
        Ok(id) => id,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Building site");
    info!("  Views: {}", config.views_dir.display());
    info!("  Static: {}", config.static_dir.display());
    info!("  Output: {}", config.output_dir.display());

    let renderer = SiteRenderer::new(ContentResolver::new(&config.views_dir))
        .with_site_title(config.site_title.clone());
    let builder = SiteBuilder::new(renderer, &config.output_dir, default_section)
        .with_static_dir(&config.static_dir);

    match builder.build().await {
        Ok(report) => {
            info!(
                "Built {} section(s), {} deck(s), {} asset(s)",
                report.sections.len(),
                report.decks.len(),
                report.assets
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Build failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Deploy Command
// =============================================================================

async fn run_deploy(config: DeployConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let target = S3Target::new(config.bucket_or_empty(), config.region.clone())
        .with_endpoint(config.s3_endpoint.clone());

    info!("Deploying {}", config.build_dir.display());
    info!("  Target: {}", target.describe());
    info!("  On failure: {:?}, retries: {}", config.on_failure, config.retries);

    let files = match collect_files(&config.build_dir) {
        Ok(files) => files,
        Err(e) => {
            error!("Failed to collect files: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if files.is_empty() {
        warn!("Nothing to deploy in {}", config.build_dir.display());
        return ExitCode::SUCCESS;
    }

    let invalidator = match config.cloudflare_config() {
        Some(cloudflare) => {
            info!("  CDN: Cloudflare zone '{}'", cloudflare.zone);
            match CloudflareInvalidator::new(cloudflare) {
                Ok(invalidator) => Some(invalidator),
                Err(e) => {
                    error!("Failed to create Cloudflare client: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            info!("  CDN: invalidation disabled");
            None
        }
    };

    let store = Arc::new(S3ObjectStore::connect(&target).await);
    let publisher = Publisher::new(store)
        .with_policy(config.on_failure)
        .with_retries(config.retries);

    let outcome = publish_and_invalidate(
        &publisher,
        &files,
        invalidator.as_ref().map(|i| i as &dyn CdnInvalidator),
    )
    .await;

    for failure in &outcome.report.failures {
        error!("  {} ({} attempt(s)): {}", failure.key, failure.attempts, failure.error);
    }
    if let Some(count) = outcome.purged {
        info!("Purged {} URL(s)", count);
    }

    if outcome.is_success() {
        info!("Deployed {} file(s)", outcome.report.uploaded.len());
        ExitCode::SUCCESS
    } else {
        error!(
            "Deploy finished with {} failure(s), {} skipped",
            outcome.report.failures.len(),
            outcome.report.skipped.len()
        );
        ExitCode::FAILURE
    }
}
