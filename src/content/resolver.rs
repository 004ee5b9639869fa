//! Maps content identifiers to markdown sources on disk.
//!
//! ```text
//! views/
//! ├── section/
//! │   ├── 1-distilled.md
//! │   └── 2-procedures.markdown
//! ├── decks/
//! │   └── lecture-1a.md
//! ├── coming_soon.md
//! └── not_found.md
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use super::identifier::ContentId;
use super::pages::FixedPage;
use crate::error::ContentError;

/// Directory under the views root holding section sources.
pub const SECTION_DIR: &str = "section";

/// Directory under the views root holding slide-deck sources.
///
/// Decks live beside sections rather than under the static dir so they are
/// only ever served through the gated `/decks/{file}` route.
pub const DECKS_DIR: &str = "decks";

/// Extension of a deck source, both on disk and in its URL.
pub const DECK_EXTENSION: &str = "md";

/// Extensions tried in order when looking for a section source.
pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Outcome of resolving a requested identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A markdown source backs this identifier
    Section { id: ContentId, path: PathBuf },

    /// No source exists (or the identifier was rejected); render the placeholder
    ComingSoon,
}

/// Resolves identifiers against a views directory.
#[derive(Debug, Clone)]
pub struct ContentResolver {
    views_dir: PathBuf,
}

impl ContentResolver {
    pub fn new(views_dir: impl Into<PathBuf>) -> Self {
        Self {
            views_dir: views_dir.into(),
        }
    }

    pub fn views_dir(&self) -> &Path {
        &self.views_dir
    }

    pub fn section_dir(&self) -> PathBuf {
        self.views_dir.join(SECTION_DIR)
    }

    pub fn decks_dir(&self) -> PathBuf {
        self.views_dir.join(DECKS_DIR)
    }

    /// Resolve a raw path segment.
    ///
    /// Invalid identifiers never touch the filesystem and resolve like
    /// missing content.
    pub async fn resolve(&self, raw_id: &str) -> Resolution {
        let id = match ContentId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => {
                debug!(raw_id = raw_id, error = %e, "Rejected content identifier");
                return Resolution::ComingSoon;
            }
        };

        let section_dir = self.section_dir();
        for ext in MARKDOWN_EXTENSIONS {
            let path = section_dir.join(format!("{}.{}", id, ext));
            if is_regular_file(&path).await {
                return Resolution::Section { id, path };
            }
        }

        debug!(id = %id, "No section source, rendering placeholder");
        Resolution::ComingSoon
    }

    /// Read the markdown source behind a resolution.
    pub async fn load(&self, resolution: &Resolution) -> Result<String, ContentError> {
        match resolution {
            Resolution::Section { path, .. } => read_to_string(path).await,
            Resolution::ComingSoon => self.fixed_page(FixedPage::ComingSoon).await,
        }
    }

    /// Markdown source of a deck, `None` when the id is invalid or has no file.
    pub async fn deck(&self, raw_id: &str) -> Result<Option<String>, ContentError> {
        let id = match ContentId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => {
                debug!(raw_id = raw_id, error = %e, "Rejected deck identifier");
                return Ok(None);
            }
        };

        let path = self.decks_dir().join(format!("{}.{}", id, DECK_EXTENSION));
        if !is_regular_file(&path).await {
            return Ok(None);
        }
        read_to_string(&path).await.map(Some)
    }

    /// Markdown source of a fixed page, falling back to the built-in default.
    pub async fn fixed_page(&self, page: FixedPage) -> Result<String, ContentError> {
        for ext in MARKDOWN_EXTENSIONS {
            let path = self
                .views_dir
                .join(format!("{}.{}", page.file_stem(), ext));
            if is_regular_file(&path).await {
                return read_to_string(&path).await;
            }
        }
        Ok(page.default_markdown().to_string())
    }

    /// Every section with a valid identifier, sorted.
    ///
    /// When both `<id>.md` and `<id>.markdown` exist the id is listed once,
    /// matching what [`resolve`](Self::resolve) would serve.
    pub fn list_sections(&self) -> Result<Vec<ContentId>, ContentError> {
        list_ids(&self.section_dir(), &MARKDOWN_EXTENSIONS)
    }

    /// Every deck with a valid identifier, sorted.
    pub fn list_decks(&self) -> Result<Vec<ContentId>, ContentError> {
        list_ids(&self.decks_dir(), &[DECK_EXTENSION])
    }
}

/// Ids of the regular files in `dir` with one of `extensions`.
///
/// A missing directory lists as empty.
fn list_ids(dir: &Path, extensions: &[&str]) -> Result<Vec<ContentId>, ContentError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ContentError::List {
                path: dir.display().to_string(),
                message: e.to_string(),
            })
        }
    };

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ContentError::List {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let has_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.contains(&e))
            .unwrap_or(false);
        if !has_ext {
            continue;
        }

        match path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(ContentId::parse)
        {
            Some(Ok(id)) => ids.push(id),
            Some(Err(e)) => debug!(file = %path.display(), error = %e, "Skipping file"),
            None => {}
        }
    }

    ids.sort();
    ids.dedup();
    Ok(ids)
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn read_to_string(path: &Path) -> Result<String, ContentError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ContentError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}
