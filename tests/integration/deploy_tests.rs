//! Deploy publisher integration tests.
//!
//! Tests verify:
//! - Every regular file is uploaded under its relative key with the right
//!   content type and a public-read ACL
//! - Continue and Abort failure policies, and retries
//! - CDN invalidation runs only after a clean, non-empty pass

use std::fs;

use tempfile::TempDir;

use distilled_site::deploy::{
    collect_files, publish_and_invalidate, Acl, CdnInvalidator, FailurePolicy, Publisher,
};

use super::test_utils::{MemoryStore, RecordingInvalidator};

/// `index.html`, `stylesheets/all.css`, `javascripts/all.js`.
fn three_file_build() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("index.html"), "<html>home</html>").unwrap();
    fs::create_dir_all(dir.path().join("stylesheets")).unwrap();
    fs::write(dir.path().join("stylesheets/all.css"), "body{}").unwrap();
    fs::create_dir_all(dir.path().join("javascripts")).unwrap();
    fs::write(dir.path().join("javascripts/all.js"), "hljs.initHighlighting();").unwrap();
    dir
}

#[tokio::test]
async fn test_three_file_publish() {
    let build = three_file_build();
    let files = collect_files(build.path()).unwrap();
    let store = MemoryStore::new();

    let report = Publisher::new(store.clone()).publish(&files).await;

    assert!(report.is_success());
    assert_eq!(store.puts().len(), 3);

    let html = store.put_for("index.html").unwrap();
    assert_eq!(html.content_type, "text/html");
    assert_eq!(html.acl, Acl::PublicRead);
    assert_eq!(&html.body[..], b"<html>home</html>");

    let css = store.put_for("stylesheets/all.css").unwrap();
    assert_eq!(css.content_type, "text/css");
    assert_eq!(css.acl, Acl::PublicRead);

    let js = store.put_for("javascripts/all.js").unwrap();
    assert_eq!(js.content_type, "application/javascript");
    assert_eq!(js.acl, Acl::PublicRead);
}

#[tokio::test]
async fn test_directories_are_not_uploaded() {
    let build = three_file_build();
    fs::create_dir_all(build.path().join("images/empty")).unwrap();

    let files = collect_files(build.path()).unwrap();
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|f| !f.key.starts_with("images")));
}

#[tokio::test]
async fn test_empty_build_uploads_nothing() {
    let build = TempDir::new().unwrap();
    let files = collect_files(build.path()).unwrap();
    let store = MemoryStore::new();
    let invalidator = RecordingInvalidator::new();

    let outcome = publish_and_invalidate(
        &Publisher::new(store.clone()),
        &files,
        Some(&invalidator as &dyn CdnInvalidator),
    )
    .await;

    assert!(outcome.report.uploaded.is_empty());
    assert!(outcome.purged.is_none());
    assert!(invalidator.calls().is_empty());
}

// =============================================================================
// Failure Policy
// =============================================================================

#[tokio::test]
async fn test_continue_uploads_rest_and_skips_invalidation() {
    let build = three_file_build();
    let files = collect_files(build.path()).unwrap();
    let store = MemoryStore::failing("javascripts/all.js", u32::MAX);
    let invalidator = RecordingInvalidator::new();

    let publisher = Publisher::new(store.clone()).with_policy(FailurePolicy::Continue);
    let outcome =
        publish_and_invalidate(&publisher, &files, Some(&invalidator as &dyn CdnInvalidator))
            .await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.report.failures.len(), 1);
    assert_eq!(outcome.report.failures[0].key, "javascripts/all.js");
    assert_eq!(outcome.report.uploaded, vec!["index.html", "stylesheets/all.css"]);
    assert!(outcome.report.skipped.is_empty());
    assert!(invalidator.calls().is_empty());
}

#[tokio::test]
async fn test_abort_stops_after_failing_key() {
    let build = three_file_build();
    let files = collect_files(build.path()).unwrap();
    // Sorted order: index.html, javascripts/all.js, stylesheets/all.css
    let store = MemoryStore::failing("javascripts/all.js", u32::MAX);

    let report = Publisher::new(store.clone())
        .with_policy(FailurePolicy::Abort)
        .publish(&files)
        .await;

    assert_eq!(report.uploaded, vec!["index.html"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.skipped, vec!["stylesheets/all.css"]);
    assert!(store.put_for("stylesheets/all.css").is_none());
}

#[tokio::test]
async fn test_retry_then_success_is_uploaded() {
    let build = three_file_build();
    let files = collect_files(build.path()).unwrap();
    let store = MemoryStore::failing("index.html", 1);
    let invalidator = RecordingInvalidator::new();

    let publisher = Publisher::new(store.clone()).with_retries(1);
    let outcome =
        publish_and_invalidate(&publisher, &files, Some(&invalidator as &dyn CdnInvalidator))
            .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.report.uploaded.len(), 3);
    assert_eq!(store.attempts(), 4);
    assert_eq!(invalidator.calls().len(), 1);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let build = three_file_build();
    let files = collect_files(build.path()).unwrap();
    let store = MemoryStore::failing("index.html", u32::MAX);

    let report = Publisher::new(store.clone())
        .with_retries(2)
        .publish(&files)
        .await;

    assert_eq!(report.failures[0].attempts, 3);
    // 3 attempts for the failing file, 1 each for the others
    assert_eq!(store.attempts(), 5);
}

// =============================================================================
// CDN Invalidation
// =============================================================================

#[tokio::test]
async fn test_invalidation_receives_uploaded_keys() {
    let build = three_file_build();
    let files = collect_files(build.path()).unwrap();
    let invalidator = RecordingInvalidator::new();

    let outcome = publish_and_invalidate(
        &Publisher::new(MemoryStore::new()),
        &files,
        Some(&invalidator as &dyn CdnInvalidator),
    )
    .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.purged, Some(3));
    assert_eq!(
        invalidator.calls(),
        vec![vec![
            "index.html".to_string(),
            "javascripts/all.js".to_string(),
            "stylesheets/all.css".to_string(),
        ]]
    );
}

#[tokio::test]
async fn test_invalidation_failure_fails_deploy() {
    let build = three_file_build();
    let files = collect_files(build.path()).unwrap();
    let invalidator = RecordingInvalidator::failing();

    let outcome = publish_and_invalidate(
        &Publisher::new(MemoryStore::new()),
        &files,
        Some(&invalidator as &dyn CdnInvalidator),
    )
    .await;

    assert!(outcome.report.is_success());
    assert!(outcome.invalidation_error.is_some());
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_without_invalidator() {
    let build = three_file_build();
    let files = collect_files(build.path()).unwrap();

    let outcome = publish_and_invalidate(&Publisher::new(MemoryStore::new()), &files, None).await;

    assert!(outcome.is_success());
    assert!(outcome.purged.is_none());
}
