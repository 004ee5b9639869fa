use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::content::{
    render_redirect, ContentId, FixedPage, PageContext, Resolution, SiteRenderer, DECKS_DIR,
    DECK_EXTENSION,
};
use crate::error::ContentError;

/// Summary of a static build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub sections: Vec<ContentId>,
    pub decks: Vec<ContentId>,
    /// Static assets copied verbatim
    pub assets: usize,
    /// Every file written, relative to the output dir
    pub written: Vec<String>,
}

/// Renders the whole site into a directory of plain HTML files.
///
/// Layout uses directory indexes so the static host serves the same URLs as
/// the server: `section/<id>/index.html`, `slides/<id>/index.html`.
pub struct SiteBuilder {
    renderer: SiteRenderer,
    output_dir: PathBuf,
    static_dir: Option<PathBuf>,
    default_section: ContentId,
}

impl SiteBuilder {
    pub fn new(
        renderer: SiteRenderer,
        output_dir: impl Into<PathBuf>,
        default_section: ContentId,
    ) -> Self {
        Self {
            renderer,
            output_dir: output_dir.into(),
            static_dir: None,
            default_section,
        }
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn build(&self) -> Result<BuildReport, ContentError> {
        let mut report = BuildReport::default();
        let ctx = PageContext::anonymous();

        // Assets first so rendered pages win on a name clash
        if let Some(ref static_dir) = self.static_dir {
            report.assets = self.copy_static(static_dir, &mut report).await?;
        }

        for id in self.renderer.resolver().list_sections()? {
            let (_, page) = self.renderer.render_section(id.as_str(), &ctx).await?;
            let relative = format!("section/{}/index.html", id);
            self.write(&relative, &page.html, &mut report).await?;
            report.sections.push(id);
        }

        let resolver = self.renderer.resolver();
        for id in resolver.list_decks()? {
            let Some(markdown) = resolver.deck(id.as_str()).await? else {
                continue;
            };
            let source = format!("{}/{}.{}", DECKS_DIR, id, DECK_EXTENSION);
            self.write(&source, &markdown, &mut report).await?;

            let page = self.renderer.render_slides(&id);
            let relative = format!("slides/{}/index.html", id);
            self.write(&relative, &page.html, &mut report).await?;
            report.decks.push(id);
        }

        // Without a source the default section is the placeholder, written
        // where the root redirect points
        let (resolution, default_page) = self
            .renderer
            .render_section(self.default_section.as_str(), &ctx)
            .await?;
        if resolution == Resolution::ComingSoon {
            warn!(
                section = %self.default_section,
                "Default section has no source, writing the placeholder"
            );
            let relative = format!("section/{}/index.html", self.default_section);
            self.write(&relative, &default_page.html, &mut report)
                .await?;
        }

        let target = format!("/section/{}/", self.default_section);
        self.write("index.html", &render_redirect(&target), &mut report)
            .await?;

        let not_found = self.renderer.render_fixed(FixedPage::NotFound, &ctx).await?;
        self.write("404.html", &not_found.html, &mut report).await?;

        info!(
            output = %self.output_dir.display(),
            sections = report.sections.len(),
            decks = report.decks.len(),
            assets = report.assets,
            "Static build complete"
        );

        Ok(report)
    }

    async fn copy_static(
        &self,
        static_dir: &Path,
        report: &mut BuildReport,
    ) -> Result<usize, ContentError> {
        if !static_dir.is_dir() {
            debug!(dir = %static_dir.display(), "No static directory to copy");
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_dir) {
            let entry = entry.map_err(|e| ContentError::List {
                path: static_dir.display().to_string(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(static_dir)
                .map_err(|e| ContentError::List {
                    path: entry.path().display().to_string(),
                    message: e.to_string(),
                })?;
            let destination = self.output_dir.join(relative);
            ensure_parent(&destination).await?;

            tokio::fs::copy(entry.path(), &destination)
                .await
                .map_err(|e| ContentError::Write {
                    path: destination.display().to_string(),
                    message: e.to_string(),
                })?;

            report.written.push(
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
            );
            copied += 1;
        }

        Ok(copied)
    }

    async fn write(
        &self,
        relative: &str,
        html: &str,
        report: &mut BuildReport,
    ) -> Result<(), ContentError> {
        let destination = self.output_dir.join(relative);
        ensure_parent(&destination).await?;

        tokio::fs::write(&destination, html)
            .await
            .map_err(|e| ContentError::Write {
                path: destination.display().to_string(),
                message: e.to_string(),
            })?;

        debug!(file = relative, bytes = html.len(), "Wrote page");
        report.written.push(relative.to_string());
        Ok(())
    }
}

async fn ensure_parent(path: &Path) -> Result<(), ContentError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| ContentError::Write {
            path: parent.display().to_string(),
            message: e.to_string(),
        })
}
