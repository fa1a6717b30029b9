use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexSet;

use crate::calendar::ArchiveIndex;
use crate::posts::PostIndex;

pub mod markup;

pub use markup::ThemeCard;

const DATE_DIR: &str = "date";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Root,
    DatePage,
}

impl PageKind {
    pub fn detect(path: &Path) -> Self {
        let in_date_dir = path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name == DATE_DIR)
            .unwrap_or(false);
        if in_date_dir {
            PageKind::DatePage
        } else {
            PageKind::Root
        }
    }
}

/// Where a page lives; everything it links to is resolved from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub kind: PageKind,
    pub path: PathBuf,
}

impl PageLocation {
    pub fn new(path: PathBuf) -> Self {
        Self {
            kind: PageKind::detect(&path),
            path,
        }
    }

    fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Resolves an href the way the browser would from this page.
    pub fn resolve(&self, href: &str) -> PathBuf {
        self.directory().join(href)
    }

    /// Status JSON lives at the site root, one level up from date pages.
    pub fn status_path(&self, file_name: &str) -> PathBuf {
        match self.kind {
            PageKind::Root => self.directory().join(file_name),
            PageKind::DatePage => self.directory().join("..").join(file_name),
        }
    }
}

/// One pre-rendered archive page, parsed once into typed data.
#[derive(Debug, Clone)]
pub struct Page {
    pub location: PageLocation,
    pub posts: PostIndex,
    pub tags: IndexSet<String>,
    pub themes: Vec<ThemeCard>,
    pub archive: ArchiveIndex,
}

impl Page {
    pub fn load(path: &Path) -> Result<Self> {
        let html = fs::read_to_string(path)
            .with_context(|| format!("reading archive page {}", path.display()))?;
        let page = Self::parse(&html, path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            kind = ?page.location.kind,
            posts = page.posts.len(),
            tags = page.tags.len(),
            themes = page.themes.len(),
            months = page.archive.month_keys().count(),
            "loaded archive page"
        );
        Ok(page)
    }

    pub fn parse(html: &str, path: PathBuf) -> Self {
        Self {
            location: PageLocation::new(path),
            posts: PostIndex::new(markup::parse_posts(html)),
            tags: markup::parse_tag_controls(html).into_iter().collect(),
            themes: markup::parse_theme_cards(html),
            archive: markup::parse_archive_index(html),
        }
    }

    pub fn kind(&self) -> PageKind {
        self.location.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE: &str = r##"<html><body>
<div class="theme-card" data-tags="Dev,System"><span class="theme-name">System Sentience</span></div>
<div class="tag-cloud"><span class="tag" data-tag="dev">#Dev</span><span class="tag" data-tag="life">#Life</span></div>
<div class="tweet" data-tags="dev" data-type="original">
  <div class="tweet-text"><p>Compiler day</p></div>
  <div class="tweet-tags"><span class="tag" data-tag="dev">#Dev</span></div>
  <div class="tweet-time"><a href="#">2024-05-01 10:00:00</a></div>
</div>
<script>window.__archiveDays = {"2024-05": ["2024-05-01"]};</script>
</body></html>"##;

    #[test]
    fn detects_date_pages_by_directory() {
        assert_eq!(PageKind::detect(Path::new("site/index.html")), PageKind::Root);
        assert_eq!(
            PageKind::detect(Path::new("site/date/2024-05-01.html")),
            PageKind::DatePage
        );
    }

    #[test]
    fn resolves_status_and_navigation_relative_to_page() {
        let root = PageLocation::new(PathBuf::from("site/index.html"));
        assert_eq!(root.status_path("model-status.json"), PathBuf::from("site/model-status.json"));
        assert_eq!(root.resolve("date/2024-05-01.html"), PathBuf::from("site/date/2024-05-01.html"));

        let day = PageLocation::new(PathBuf::from("site/date/2024-05-01.html"));
        assert_eq!(
            day.status_path("model-status.json"),
            PathBuf::from("site/date/../model-status.json")
        );
        assert_eq!(day.resolve("2024-05-02.html"), PathBuf::from("site/date/2024-05-02.html"));
    }

    #[test]
    fn loads_page_from_disk() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("index.html");
        fs::write(&path, PAGE)?;
        let page = Page::load(&path)?;
        assert_eq!(page.kind(), PageKind::Root);
        assert_eq!(page.posts.len(), 1);
        assert_eq!(
            page.tags.iter().cloned().collect::<Vec<_>>(),
            vec!["dev".to_string(), "life".to_string()]
        );
        assert_eq!(page.themes[0].name, "System Sentience");
        assert_eq!(page.archive.latest_month_key(), "2024-05");
        Ok(())
    }

    #[test]
    fn page_chrome_after_the_last_post_is_not_searchable() {
        use assert_matches::assert_matches;

        use crate::filter::{ApplyOutcome, FilterEngine, FilterRequest};

        let html = PAGE.replace(
            "<script>",
            r#"<div class="pagination"><a href="page2.html">Next page</a></div>
<footer>Powered by generator</footer>
<script>"#,
        );
        let page = Page::parse(&html, PathBuf::from("site/index.html"));
        let mut engine = FilterEngine::new(page.posts);
        for term in ["powered", "next page", "system sentience"] {
            let outcome = engine.apply(FilterRequest::Search(term.into()));
            assert_matches!(
                outcome,
                ApplyOutcome::Applied { count: 0, .. },
                "{term} leaked into a post"
            );
        }
        let outcome = engine.apply(FilterRequest::Search("compiler".into()));
        assert_matches!(outcome, ApplyOutcome::Applied { count: 1, .. });
    }

    #[test]
    fn missing_page_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        assert!(Page::load(&temp.path().join("absent.html")).is_err());
    }
}
