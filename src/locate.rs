//! Executable discovery seam.
//!
//! Strategies never search the file system themselves; they ask an
//! [`ExecutableLocator`]. Production code uses [`SystemLocator`], which
//! delegates to the `chrome-locate` crate and `which`. Tests inject a
//! [`StaticLocator`] to pin what is "installed".

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Finds the external programs the strategies depend on.
pub trait ExecutableLocator: Send + Sync {
    /// A Chrome/Chromium executable, if one is installed.
    fn locate_browser(&self) -> Option<PathBuf>;

    /// Another named program on the search path (e.g. `wkhtmltopdf`).
    fn locate_program(&self, name: &str) -> Option<PathBuf>;
}

/// Looks at the real machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLocator;

impl ExecutableLocator for SystemLocator {
    fn locate_browser(&self) -> Option<PathBuf> {
        match chrome_locate::find_chrome() {
            Ok(found) => {
                debug!("Browser found via {}: {}", found.origin, found.path.display());
                Some(found.path)
            }
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    fn locate_program(&self, name: &str) -> Option<PathBuf> {
        chrome_locate::find_program(name)
    }
}

/// A fixed answer for every query.
#[derive(Debug, Default, Clone)]
pub struct StaticLocator {
    browser: Option<PathBuf>,
    programs: HashMap<String, PathBuf>,
}

impl StaticLocator {
    /// Nothing is installed.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_browser(mut self, path: impl Into<PathBuf>) -> Self {
        self.browser = Some(path.into());
        self
    }

    pub fn with_program(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.programs.insert(name.into(), path.into());
        self
    }
}

impl ExecutableLocator for StaticLocator {
    fn locate_browser(&self) -> Option<PathBuf> {
        self.browser.clone()
    }

    fn locate_program(&self, name: &str) -> Option<PathBuf> {
        self.programs.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_locator_answers_what_it_was_given() {
        let empty = StaticLocator::empty();
        assert!(empty.locate_browser().is_none());
        assert!(empty.locate_program("wkhtmltopdf").is_none());

        let l = StaticLocator::empty()
            .with_browser("/opt/chrome/chrome")
            .with_program("wkhtmltopdf", "/usr/bin/wkhtmltopdf");
        assert_eq!(l.locate_browser(), Some(PathBuf::from("/opt/chrome/chrome")));
        assert_eq!(
            l.locate_program("wkhtmltopdf"),
            Some(PathBuf::from("/usr/bin/wkhtmltopdf"))
        );
        assert!(l.locate_program("other").is_none());
    }

    #[test]
    fn system_locator_does_not_panic() {
        let _ = SystemLocator.locate_browser();
        let _ = SystemLocator.locate_program("definitely-not-a-real-program-xyz");
    }
}
