//! Content routing integration tests.
//!
//! Tests verify:
//! - Sections render from `views/section/<id>.md` (then `.markdown`)
//! - Missing or malformed identifiers render the placeholder, never an error
//! - The root redirects to the default section
//! - Slide decks, static files and the markdown 404 page

use std::fs;

use axum::http::{header, StatusCode};
use tempfile::TempDir;

use distilled_site::content::ContentId;
use distilled_site::server::{create_router, IdentityServices, RouterConfig};

use super::test_utils::{body_string, get, location, standard_views, TestViews, TEST_SECRET};

fn public_router(views: &TestViews) -> axum::Router {
    create_router(
        views.renderer(),
        IdentityServices::disabled(),
        RouterConfig::without_auth(TEST_SECRET).with_tracing(false),
    )
}

// =============================================================================
// Sections
// =============================================================================

#[tokio::test]
async fn test_existing_section_renders_markdown() {
    let views = standard_views();
    let router = public_router(&views);

    let response = get(&router, "/section/2-data", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let body = body_string(response).await;
    assert!(body.contains("<h1>Building Abstractions With Data</h1>"));
    assert!(body.contains("<p>Pairs.</p>"));
    assert!(body.contains("/stylesheets/all.css"));
}

#[tokio::test]
async fn test_markdown_extension_fallback() {
    let views = TestViews::new().with_section("3-state.markdown", "# Modularity\n");
    let router = public_router(&views);

    let body = body_string(get(&router, "/section/3-state", None).await).await;
    assert!(body.contains("<h1>Modularity</h1>"));
}

#[tokio::test]
async fn test_md_preferred_over_markdown() {
    let views = TestViews::new()
        .with_section("4-eval.md", "# From md\n")
        .with_section("4-eval.markdown", "# From markdown\n");
    let router = public_router(&views);

    let body = body_string(get(&router, "/section/4-eval", None).await).await;
    assert!(body.contains("From md"));
    assert!(!body.contains("From markdown"));
}

#[tokio::test]
async fn test_missing_section_renders_placeholder() {
    let views = standard_views();
    let router = public_router(&views);

    let response = get(&router, "/section/9-not-written", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("<h1>Coming soon</h1>"));
}

#[tokio::test]
async fn test_custom_placeholder_page() {
    let views = standard_views().with_page("coming_soon", "# Patience\n\nSoon.");
    let router = public_router(&views);

    let body = body_string(get(&router, "/section/nope", None).await).await;
    assert!(body.contains("<h1>Patience</h1>"));
}

#[tokio::test]
async fn test_traversal_identifiers_render_placeholder() {
    // A file that a traversal would reach if identifiers were not validated
    let views = standard_views().with_page("secret", "# Leaked\n");
    let router = public_router(&views);

    for uri in [
        "/section/..%2Fsecret",
        "/section/.hidden",
        "/section/..",
        "/section/a%5Cb",
    ] {
        let response = get(&router, uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let body = body_string(response).await;
        assert!(body.contains("Coming soon"), "{}", uri);
        assert!(!body.contains("Leaked"), "{}", uri);
    }
}

#[tokio::test]
async fn test_directory_with_section_name_is_not_content() {
    let views = standard_views();
    fs::create_dir_all(views.path().join("section/5-dir.md")).unwrap();
    let router = public_router(&views);

    let body = body_string(get(&router, "/section/5-dir", None).await).await;
    assert!(body.contains("Coming soon"));
}

#[tokio::test]
async fn test_public_pages_are_publicly_cacheable() {
    let views = standard_views();
    let router = public_router(&views);

    let response = get(&router, "/section/1-distilled", None).await;
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, must-revalidate, max-age=600"
    );
}

// =============================================================================
// Root Redirect
// =============================================================================

#[tokio::test]
async fn test_root_redirects_to_default_section() {
    let views = standard_views();
    let router = public_router(&views);

    let response = get(&router, "/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/section/1-distilled");
}

#[tokio::test]
async fn test_root_redirect_is_configurable() {
    let views = standard_views();
    let router = create_router(
        views.renderer(),
        IdentityServices::disabled(),
        RouterConfig::without_auth(TEST_SECRET)
            .with_default_section(ContentId::parse("2-data").unwrap())
            .with_tracing(false),
    );

    let response = get(&router, "/", None).await;
    assert_eq!(location(&response), "/section/2-data");
}

// =============================================================================
// Slides
// =============================================================================

#[tokio::test]
async fn test_slides_page_references_deck_source() {
    let views = standard_views();
    let router = public_router(&views);

    // No deck file exists; the page is rendered anyway
    let response = get(&router, "/slides/lecture-1a/", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("remark.create"));
    assert!(body.contains(r#"sourceUrl: "/decks/lecture-1a.md""#));
}

#[tokio::test]
async fn test_deck_source_served_from_views() {
    let views = standard_views().with_deck("lecture-1a", "# Lecture 1A\n---\n# Two");
    let router = public_router(&views);

    let response = get(&router, "/decks/lecture-1a.md", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/markdown; charset=utf-8"
    );
    assert_eq!(body_string(response).await, "# Lecture 1A\n---\n# Two");
}

#[tokio::test]
async fn test_deck_source_missing_or_malformed_is_not_found() {
    let views = standard_views().with_deck("lecture-1a", "# Lecture 1A");
    let router = public_router(&views);

    for uri in ["/decks/lecture-9z.md", "/decks/lecture-1a", "/decks/..md"] {
        let response = get(&router, uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert!(body_string(response).await.contains("Not found"));
    }
}

#[tokio::test]
async fn test_slides_invalid_identifier_is_not_found() {
    let views = standard_views();
    let router = public_router(&views);

    let response = get(&router, "/slides/..hidden/", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_string(response).await.contains("Not found"));
}

// =============================================================================
// Not Found and Static Files
// =============================================================================

#[tokio::test]
async fn test_unknown_route_renders_markdown_404() {
    let views = standard_views().with_page("not_found", "# Lost\n\nNothing here.");
    let router = public_router(&views);

    let response = get(&router, "/no/such/page", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_string(response).await.contains("<h1>Lost</h1>"));
}

#[tokio::test]
async fn test_static_files_served_before_404() {
    let views = standard_views();
    let assets = TempDir::new().unwrap();
    fs::create_dir_all(assets.path().join("stylesheets")).unwrap();
    fs::write(assets.path().join("stylesheets/all.css"), "body { margin: 0 }").unwrap();

    let router = create_router(
        views.renderer(),
        IdentityServices::disabled(),
        RouterConfig::without_auth(TEST_SECRET)
            .with_static_dir(assets.path())
            .with_tracing(false),
    );

    let response = get(&router, "/stylesheets/all.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "body { margin: 0 }");

    let response = get(&router, "/stylesheets/missing.css", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_string(response).await.contains("Not found"));
}

#[tokio::test]
async fn test_health() {
    let views = standard_views();
    let router = public_router(&views);

    let response = get(&router, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
}
