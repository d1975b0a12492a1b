use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::template::VectorImage;

const SOURCE_FILENAME: &str = "icon.svg";

/// Scratch space owned by one run.
///
/// ```text
/// <tmp>/
///   icon.svg              vector source
///   work/                 raw rasterizer output
///   <Name>.iconset/       canonical PNGs, the packager's input
///   out/                  container before it is moved into place
/// ```
///
/// Dropping the value removes the whole tree, on success and on every
/// error path.
pub struct Staging {
    root: TempDir,
    source: PathBuf,
    work_dir: PathBuf,
    iconset_dir: PathBuf,
    out_dir: PathBuf,
}

impl Staging {
    pub fn new(iconset_dir_name: &str, image: &VectorImage) -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix("iconset-builder-")
            .tempdir()
            .context("creating staging directory")?;

        let source = root.path().join(SOURCE_FILENAME);
        let work_dir = root.path().join("work");
        let iconset_dir = root.path().join(iconset_dir_name);
        let out_dir = root.path().join("out");

        for dir in [&work_dir, &iconset_dir, &out_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating staging directory '{}'", dir.display()))?;
        }
        image.write_to(&source)?;

        Ok(Self {
            root,
            source,
            work_dir,
            iconset_dir,
            out_dir,
        })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn iconset_dir(&self) -> &Path {
        &self.iconset_dir
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}
