//! Access gate integration tests.
//!
//! Tests verify:
//! - Unauthenticated callers are redirected to sign-in
//! - Members see content; non-members, checker errors and timeouts get 403
//! - Tampered and foreign-secret cookies count as no session
//! - Development mode bypasses the gate without calling the checker
//! - Only sections, slides and deck sources are gated
//! - Deck sources never leak through the static directory

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::Router;
use tempfile::TempDir;

use distilled_site::config::RuntimeMode;
use distilled_site::identity::ProviderRegistry;
use distilled_site::server::{create_router, IdentityServices, RouterConfig, Session};

use super::test_utils::{
    body_string, get, location, session_cookie_with, signed_in_cookie, standard_views,
    MembershipAnswer, MockMembership, MockProvider, TestViews, TEST_ORG, TEST_SECRET,
};

fn gated_router(views: &TestViews, membership: Arc<MockMembership>) -> Router {
    gated_router_with(views, membership, RuntimeMode::Production)
}

fn gated_router_with(
    views: &TestViews,
    membership: Arc<MockMembership>,
    mode: RuntimeMode,
) -> Router {
    let providers = ProviderRegistry::new().with_provider(Arc::new(MockProvider::new()));
    create_router(
        views.renderer(),
        IdentityServices::new(membership, providers),
        RouterConfig::new(TEST_SECRET)
            .with_mode(mode)
            .with_org(TEST_ORG)
            .with_membership_timeout(Duration::from_millis(100))
            .with_tracing(false),
    )
}

// =============================================================================
// Unauthenticated
// =============================================================================

#[tokio::test]
async fn test_anonymous_redirected_to_sign_in() {
    let views = standard_views();
    let membership = MockMembership::new(MembershipAnswer::Member);
    let router = gated_router(&views, membership.clone());

    for uri in [
        "/section/1-distilled",
        "/slides/lecture-1a/",
        "/decks/lecture-1a.md",
    ] {
        let response = get(&router, uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/sign-in");
    }
    assert_eq!(membership.calls(), 0);
}

#[tokio::test]
async fn test_signed_out_session_redirected() {
    let views = standard_views();
    let membership = MockMembership::new(MembershipAnswer::Member);
    let router = gated_router(&views, membership.clone());

    let mut session = Session::new();
    session.sign_in("alyssa");
    session.sign_out();
    let cookie = session_cookie_with(TEST_SECRET, &session);

    let response = get(&router, "/section/1-distilled", Some(&cookie)).await;
    assert_eq!(location(&response), "/sign-in");
    assert_eq!(membership.calls(), 0);
}

#[tokio::test]
async fn test_tampered_cookie_is_no_session() {
    let views = standard_views();
    let membership = MockMembership::new(MembershipAnswer::Member);
    let router = gated_router(&views, membership.clone());

    let cookie = signed_in_cookie("alyssa");
    // Flip the last signature character
    let mut tampered = cookie.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == '0' { '1' } else { '0' });

    let response = get(&router, "/section/1-distilled", Some(&tampered)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/sign-in");
    assert_eq!(membership.calls(), 0);
}

#[tokio::test]
async fn test_foreign_secret_cookie_is_no_session() {
    let views = standard_views();
    let membership = MockMembership::new(MembershipAnswer::Member);
    let router = gated_router(&views, membership);

    let mut session = Session::new();
    session.sign_in("alyssa");
    let cookie = session_cookie_with("some-other-deployment-secret-value", &session);

    let response = get(&router, "/section/1-distilled", Some(&cookie)).await;
    assert_eq!(location(&response), "/sign-in");
}

#[tokio::test]
async fn test_garbage_cookie_is_no_session() {
    let views = standard_views();
    let router = gated_router(&views, MockMembership::new(MembershipAnswer::Member));

    let response = get(&router, "/section/1-distilled", Some("site_session=garbage")).await;
    assert_eq!(location(&response), "/sign-in");
}

// =============================================================================
// Deck Sources
// =============================================================================

const SECRET_DECK: &str = "# Members-only slide\n\nsecret deck";

/// Gated router whose static dir also carries a copy of the deck.
fn gated_router_with_static_deck(
    views: &TestViews,
    membership: Arc<MockMembership>,
) -> (Router, TempDir) {
    let assets = TempDir::new().unwrap();
    fs::create_dir_all(assets.path().join("decks")).unwrap();
    fs::write(assets.path().join("decks/lecture-1a.md"), SECRET_DECK).unwrap();

    let router = create_router(
        views.renderer(),
        IdentityServices::new(membership, ProviderRegistry::new()),
        RouterConfig::new(TEST_SECRET)
            .with_org(TEST_ORG)
            .with_static_dir(assets.path())
            .with_membership_timeout(Duration::from_millis(100))
            .with_tracing(false),
    );
    (router, assets)
}

#[tokio::test]
async fn test_anonymous_deck_source_redirected_to_sign_in() {
    let views = standard_views().with_deck("lecture-1a", SECRET_DECK);
    let membership = MockMembership::new(MembershipAnswer::Member);
    let (router, _assets) = gated_router_with_static_deck(&views, membership.clone());

    for uri in ["/decks/lecture-1a.md", "/decks/unknown.md", "/decks/lecture-1a"] {
        let response = get(&router, uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/sign-in");
        assert!(!body_string(response).await.contains("secret deck"));
    }
    assert_eq!(membership.calls(), 0);
}

#[tokio::test]
async fn test_non_member_cannot_read_deck_source() {
    let views = standard_views().with_deck("lecture-1a", SECRET_DECK);
    let membership = MockMembership::new(MembershipAnswer::NotMember);
    let (router, _assets) = gated_router_with_static_deck(&views, membership);
    let cookie = signed_in_cookie("ben");

    let response = get(&router, "/decks/lecture-1a.md", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!body_string(response).await.contains("secret deck"));
}

#[tokio::test]
async fn test_member_reads_deck_source() {
    let views = standard_views().with_deck("lecture-1a", SECRET_DECK);
    let membership = MockMembership::new(MembershipAnswer::Member);
    let (router, _assets) = gated_router_with_static_deck(&views, membership);
    let cookie = signed_in_cookie("alyssa");

    let response = get(&router, "/decks/lecture-1a.md", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/markdown"));
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "private, must-revalidate, max-age=600"
    );
    assert_eq!(body_string(response).await, SECRET_DECK);
}

#[tokio::test]
async fn test_member_missing_deck_is_not_found() {
    let views = standard_views();
    let (router, _assets) =
        gated_router_with_static_deck(&views, MockMembership::new(MembershipAnswer::Member));
    let cookie = signed_in_cookie("alyssa");

    // Only the static dir has a copy; it is never served
    let response = get(&router, "/decks/lecture-1a.md", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!body_string(response).await.contains("secret deck"));
}

// =============================================================================
// Authenticated
// =============================================================================

#[tokio::test]
async fn test_member_sees_content() {
    let views = standard_views();
    let membership = MockMembership::new(MembershipAnswer::Member);
    let router = gated_router(&views, membership.clone());
    let cookie = signed_in_cookie("alyssa");

    let response = get(&router, "/section/1-distilled", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "private, must-revalidate, max-age=600"
    );

    let body = body_string(response).await;
    assert!(body.contains("<h1>Distilled</h1>"));
    assert!(body.contains("alyssa"));
    assert!(body.contains(r#"href="/logout""#));
}

#[tokio::test]
async fn test_member_sees_slides() {
    let views = standard_views();
    let router = gated_router(&views, MockMembership::new(MembershipAnswer::Member));
    let cookie = signed_in_cookie("alyssa");

    let response = get(&router, "/slides/lecture-1a/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("/decks/lecture-1a.md"));
}

#[tokio::test]
async fn test_membership_checked_on_every_request() {
    let views = standard_views();
    let membership = MockMembership::new(MembershipAnswer::Member);
    let router = gated_router(&views, membership.clone());
    let cookie = signed_in_cookie("alyssa");

    get(&router, "/section/1-distilled", Some(&cookie)).await;
    get(&router, "/section/2-data", Some(&cookie)).await;

    assert_eq!(membership.calls(), 2);
}

#[tokio::test]
async fn test_non_member_forbidden() {
    let views = standard_views();
    let router = gated_router(&views, MockMembership::new(MembershipAnswer::NotMember));
    let cookie = signed_in_cookie("ben");

    let response = get(&router, "/section/1-distilled", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_string(response).await;
    assert!(body.contains("Members only"));
    assert!(!body.contains("The first section."));
}

#[tokio::test]
async fn test_custom_forbidden_page() {
    let views = standard_views().with_page("forbidden", "# Join the org first\n");
    let router = gated_router(&views, MockMembership::new(MembershipAnswer::NotMember));
    let cookie = signed_in_cookie("ben");

    let response = get(&router, "/section/1-distilled", Some(&cookie)).await;
    assert!(body_string(response).await.contains("Join the org first"));
}

#[tokio::test]
async fn test_checker_error_denies() {
    let views = standard_views();
    let router = gated_router(&views, MockMembership::new(MembershipAnswer::Error));
    let cookie = signed_in_cookie("alyssa");

    let response = get(&router, "/section/1-distilled", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_checker_timeout_denies() {
    let views = standard_views();
    let membership = MockMembership::new(MembershipAnswer::Hang);
    let router = gated_router(&views, membership.clone());
    let cookie = signed_in_cookie("alyssa");

    let started = std::time::Instant::now();
    let response = get(&router, "/section/1-distilled", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(membership.calls(), 1);
}

// =============================================================================
// Development Mode
// =============================================================================

#[tokio::test]
async fn test_development_mode_bypasses_gate() {
    let views = standard_views();
    let membership = MockMembership::new(MembershipAnswer::NotMember);
    let router = gated_router_with(&views, membership.clone(), RuntimeMode::Development);

    let response = get(&router, "/section/1-distilled", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("The first section."));

    let cookie = signed_in_cookie("ben");
    let response = get(&router, "/slides/lecture-1a/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(membership.calls(), 0);
}

// =============================================================================
// Gate Scope
// =============================================================================

#[tokio::test]
async fn test_public_routes_not_gated() {
    let views = standard_views();
    let membership = MockMembership::new(MembershipAnswer::NotMember);
    let router = gated_router(&views, membership.clone());

    for uri in ["/sign-in", "/auth/failure", "/auth/github/deauthorized", "/health"] {
        let response = get(&router, uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }

    let response = get(&router, "/", None).await;
    assert_eq!(location(&response), "/section/1-distilled");
    assert_eq!(membership.calls(), 0);
}

#[tokio::test]
async fn test_auth_not_required_leaves_content_public() {
    let views = standard_views();
    let membership = MockMembership::new(MembershipAnswer::NotMember);
    let router = create_router(
        views.renderer(),
        IdentityServices::new(membership.clone(), ProviderRegistry::new()),
        RouterConfig::without_auth(TEST_SECRET)
            .with_org(TEST_ORG)
            .with_tracing(false),
    );

    let response = get(&router, "/section/2-data", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(membership.calls(), 0);
}
