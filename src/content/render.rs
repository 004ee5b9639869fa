use super::identifier::ContentId;
use super::layout::{render_layout, render_slides, PageContext};
use super::markdown::{first_heading, markdown_to_html};
use super::pages::FixedPage;
use super::resolver::{ContentResolver, Resolution};
use crate::error::ContentError;

/// Default site title shown in the layout header.
pub const DEFAULT_SITE_TITLE: &str = "SICP Distilled";

/// A fully rendered HTML page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub title: String,
    pub html: String,
}

/// Turns resolved markdown into complete HTML pages.
///
/// Shared by the server handlers, the access gate (for the forbidden page)
/// and the static builder so every surface renders identically.
#[derive(Debug, Clone)]
pub struct SiteRenderer {
    resolver: ContentResolver,
    site_title: String,
}

impl SiteRenderer {
    pub fn new(resolver: ContentResolver) -> Self {
        Self {
            resolver,
            site_title: DEFAULT_SITE_TITLE.to_string(),
        }
    }

    pub fn with_site_title(mut self, site_title: impl Into<String>) -> Self {
        self.site_title = site_title.into();
        self
    }

    pub fn resolver(&self) -> &ContentResolver {
        &self.resolver
    }

    pub fn site_title(&self) -> &str {
        &self.site_title
    }

    /// Resolve and render a section, or the placeholder if it has no source.
    pub async fn render_section(
        &self,
        raw_id: &str,
        ctx: &PageContext,
    ) -> Result<(Resolution, RenderedPage), ContentError> {
        let resolution = self.resolver.resolve(raw_id).await;
        let markdown = self.resolver.load(&resolution).await?;
        let fallback_title = match &resolution {
            Resolution::Section { id, .. } => id.as_str(),
            Resolution::ComingSoon => "",
        };
        let page = self.render_markdown(&markdown, fallback_title, ctx);
        Ok((resolution, page))
    }

    pub async fn render_fixed(
        &self,
        page: FixedPage,
        ctx: &PageContext,
    ) -> Result<RenderedPage, ContentError> {
        let markdown = self.resolver.fixed_page(page).await?;
        Ok(self.render_markdown(&markdown, "", ctx))
    }

    pub fn render_slides(&self, id: &ContentId) -> RenderedPage {
        RenderedPage {
            title: id.to_string(),
            html: render_slides(&self.site_title, id),
        }
    }

    pub fn render_markdown(
        &self,
        markdown: &str,
        fallback_title: &str,
        ctx: &PageContext,
    ) -> RenderedPage {
        let title = first_heading(markdown).unwrap_or_else(|| fallback_title.to_string());
        let body = markdown_to_html(markdown);
        let html = render_layout(&self.site_title, &title, &body, ctx);
        RenderedPage { title, html }
    }
}
