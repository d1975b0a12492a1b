use std::path::{Path, PathBuf};

use crate::sizes::SizeEntry;

/// A raster written to the iconset directory under its canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFile {
    pub file_name: String,
    pub dimension: u32,
    pub path: PathBuf,
}

/// A size entry that could not be produced, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFailure {
    pub file_name: String,
    pub dimension: u32,
    pub reason: String,
}

impl RasterFailure {
    pub(crate) fn new(entry: &SizeEntry, error: &anyhow::Error) -> Self {
        Self {
            file_name: entry.file_name.clone(),
            dimension: entry.dimension,
            reason: format!("{:#}", error),
        }
    }
}

/// Whatever rasterization produced: successes in size-table order plus the
/// entries that were skipped.
///
/// Missing entries are partial success; packaging proceeds regardless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RasterSet {
    files: Vec<RasterFile>,
    failures: Vec<RasterFailure>,
}

impl RasterSet {
    pub(crate) fn push(&mut self, file: RasterFile) {
        self.files.push(file);
    }

    pub(crate) fn push_failure(&mut self, failure: RasterFailure) {
        self.failures.push(failure);
    }

    pub fn files(&self) -> &[RasterFile] {
        &self.files
    }

    pub fn failures(&self) -> &[RasterFailure] {
        &self.failures
    }

    pub fn get(&self, file_name: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|f| f.file_name == file_name)
            .map(|f| f.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// True when every requested entry was produced.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn lookup_by_name() {
        let mut set = RasterSet::default();
        set.push(RasterFile {
            file_name: "icon_16x16.png".into(),
            dimension: 16,
            path: PathBuf::from("/stage/icon_16x16.png"),
        });
        set.push_failure(RasterFailure::new(
            &SizeEntry::new(32, "icon_16x16@2x.png"),
            &anyhow!("rsvg-convert missing"),
        ));

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get("icon_16x16.png"),
            Some(Path::new("/stage/icon_16x16.png"))
        );
        assert_eq!(set.get("icon_16x16@2x.png"), None);
        assert!(!set.is_complete());
        assert_eq!(set.failures()[0].reason, "rsvg-convert missing");
    }
}
