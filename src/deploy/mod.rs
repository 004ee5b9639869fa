//! Publishing a built site.
//!
//! [`collect_files`] walks the build output, [`Publisher`] uploads each file
//! through an [`ObjectStore`], and a [`CdnInvalidator`] purges the uploaded
//! keys once the pass completes cleanly.

pub mod cdn;
pub mod mime;
pub mod publisher;
pub mod store;

pub use cdn::{
    purge_urls, CdnInvalidator, CloudflareConfig, CloudflareInvalidator,
    DEFAULT_CLOUDFLARE_API_URL, PURGE_BATCH_SIZE,
};
pub use mime::{content_type_for, DEFAULT_CONTENT_TYPE};
pub use publisher::{
    collect_files, publish_and_invalidate, DeployOutcome, DeployableFile, FailurePolicy,
    PublishReport, Publisher, UploadFailure,
};
pub use store::{Acl, ObjectStore, S3ObjectStore, S3Target};
