//! Input selection for the extractor.

use log::info;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::evtx::{has_evtx_extension, parse_file};
use crate::models::EvtxEvent;

/// Supplies the event log file to parse, if any
pub trait EvtxPathProvider {
    fn select(&self) -> Option<PathBuf>;
}

/// Provider wrapping a path given up front, e.g. on the command line
#[derive(Debug, Clone, Default)]
pub struct StaticPathProvider {
    path: Option<PathBuf>,
}

impl StaticPathProvider {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl EvtxPathProvider for StaticPathProvider {
    fn select(&self) -> Option<PathBuf> {
        self.path.clone()
    }
}

/// Accept only a non-empty path to an existing `.evtx` file
pub fn validate_selection(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_file() && has_evtx_extension(path)
}

/// Parse whatever the provider selects; `Ok(None)` when nothing was selected
pub fn parse_selected(provider: &dyn EvtxPathProvider) -> Result<Option<Vec<EvtxEvent>>> {
    match provider.select() {
        Some(path) => parse_file(&path).map(Some),
        None => {
            info!("No event log selected");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TriageError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_validate_selection() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("System.EVTX");
        fs::write(&good, b"ElfFile\0").unwrap();
        let wrong_ext = temp.path().join("System.log");
        fs::write(&wrong_ext, b"ElfFile\0").unwrap();

        assert!(validate_selection(&good));
        assert!(!validate_selection(&wrong_ext));
        assert!(!validate_selection(&temp.path().join("absent.evtx")));
        assert!(!validate_selection(Path::new("")));
        assert!(!validate_selection(temp.path()));
    }

    #[test]
    fn test_no_selection_is_none() {
        let provider = StaticPathProvider::new(None);
        assert!(parse_selected(&provider).unwrap().is_none());
    }

    #[test]
    fn test_selection_errors_surface() {
        let provider = StaticPathProvider::new(Some(PathBuf::from("/nonexistent/Security.evtx")));
        assert!(matches!(parse_selected(&provider), Err(TriageError::NotFound(_))));
    }
}
