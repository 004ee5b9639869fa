//! Static site build.

pub mod builder;

pub use builder::{BuildReport, SiteBuilder};
