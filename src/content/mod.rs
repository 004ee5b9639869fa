//! Content layer: identifiers, resolution, markdown rendering and layouts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                SiteRenderer                  │
//! │   render_section / render_fixed / slides     │
//! └───────────────┬──────────────────────────────┘
//!                 │
//!       ┌─────────┴─────────┐
//!       ▼                   ▼
//! ┌───────────────┐   ┌──────────────────────────┐
//! │ContentResolver│   │ markdown + layout        │
//! │ (id -> file)  │   │ (pulldown-cmark, HTML)   │
//! └───────────────┘   └──────────────────────────┘
//! ```

pub mod identifier;
pub mod layout;
pub mod markdown;
pub mod pages;
pub mod render;
pub mod resolver;

pub use identifier::{ContentId, MAX_CONTENT_ID_LEN};
pub use layout::{html_escape, render_layout, render_redirect, render_slides, PageContext};
pub use markdown::{first_heading, markdown_to_html};
pub use pages::FixedPage;
pub use render::{RenderedPage, SiteRenderer, DEFAULT_SITE_TITLE};
pub use resolver::{
    ContentResolver, Resolution, DECKS_DIR, DECK_EXTENSION, MARKDOWN_EXTENSIONS, SECTION_DIR,
};
