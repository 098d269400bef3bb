//! Offline page driver.
//!
//! The CLI has no embedded browser; the live `PageDriver` over real
//! browser automation belongs to the embedding application. For
//! offline use (and for exercising the full extraction pipeline
//! against a saved copy of the portal page) this driver serves a
//! page-text dump from disk.

use std::fs;
use std::path::PathBuf;

use vt_core::extract::{FrameContent, PageDriver, PageError};

/// A page backed by a saved text dump, or by nothing at all (manual
/// schedule mode never consults the page).
#[derive(Debug, Default)]
pub struct OfflinePage {
    source: Option<PathBuf>,
}

impl OfflinePage {
    #[must_use]
    pub const fn new(source: Option<PathBuf>) -> Self {
        Self { source }
    }
}

impl PageDriver for OfflinePage {
    fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        tracing::debug!(url, "offline page: navigation is a no-op");
        Ok(())
    }

    fn table_rows(&mut self) -> Result<Vec<Vec<String>>, PageError> {
        // A text dump has no table structure; extraction falls through
        // to the text strategy.
        Ok(Vec::new())
    }

    fn visible_text(&mut self) -> Result<String, PageError> {
        let Some(path) = &self.source else {
            return Ok(String::new());
        };
        fs::read_to_string(path)
            .map_err(|err| PageError::Content(format!("{}: {err}", path.display())))
    }

    fn frames(&mut self) -> Result<Vec<FrameContent>, PageError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write as _;

    #[test]
    fn serves_the_dump_as_visible_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "My Schedule").unwrap();

        let mut page = OfflinePage::new(Some(path));
        assert_eq!(page.visible_text().unwrap(), "My Schedule\n");
        assert!(page.table_rows().unwrap().is_empty());
        assert!(page.frames().unwrap().is_empty());
    }

    #[test]
    fn missing_dump_is_a_content_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = OfflinePage::new(Some(dir.path().join("absent.txt")));
        assert!(page.visible_text().is_err());
    }

    #[test]
    fn sourceless_page_is_empty() {
        let mut page = OfflinePage::new(None);
        assert_eq!(page.visible_text().unwrap(), "");
    }
}
