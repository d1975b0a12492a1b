//! Tools that ship with macOS: Quick Look, `sips` and `iconutil`.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::{expect_output, Packager, Rasterizer, Resizer};
use crate::process::Cmd;

pub const QLMANAGE: &str = "qlmanage";
pub const SIPS: &str = "sips";
pub const ICONUTIL: &str = "iconutil";

const MACOS_HINT: &str = "macOS (preinstalled)";

/// Thumbnails the SVG with `qlmanage -t -s N -o <dir> <svg>`.
///
/// Quick Look names its output after the input, appending `.png`
/// (`AppIcon.svg` becomes `AppIcon.svg.png`). It treats `-s` as a bounding
/// box, so the result still goes through an exact resize.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickLook;

impl QuickLook {
    fn output_path(source: &Path, work_dir: &Path) -> PathBuf {
        let mut name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "source.svg".into());
        name.push(".png");
        work_dir.join(name)
    }
}

impl Rasterizer for QuickLook {
    fn name(&self) -> &str {
        QLMANAGE
    }

    fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
        vec![(QLMANAGE, MACOS_HINT)]
    }

    fn rasterize(&self, source: &Path, dimension: u32, work_dir: &Path) -> Result<PathBuf> {
        let output = Self::output_path(source, work_dir);
        // A thumbnail left over from a previous size would hide a failure.
        if output.exists() {
            fs::remove_file(&output)
                .with_context(|| format!("removing stale thumbnail '{}'", output.display()))?;
        }

        Cmd::new(QLMANAGE)
            .args(["-t", "-s", &dimension.to_string(), "-o"])
            .arg_path(work_dir)
            .arg_path(source)
            .error_msg(format!("qlmanage failed at {dimension}px"))
            .run()?;

        expect_output(QLMANAGE, &output)?;
        Ok(output)
    }
}

/// Resizes with `sips -z H W <in> --out <out>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sips;

impl Sips {
    fn command(input: &Path, width: u32, height: u32, output: &Path) -> Cmd {
        Cmd::new(SIPS)
            .args(["-z", &height.to_string(), &width.to_string()])
            .arg_path(input)
            .arg("--out")
            .arg_path(output)
            .error_msg(format!("sips failed to resize to {width}x{height}"))
    }
}

impl Resizer for Sips {
    fn name(&self) -> &str {
        SIPS
    }

    fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
        vec![(SIPS, MACOS_HINT)]
    }

    fn resize(&self, input: &Path, width: u32, height: u32, output: &Path) -> Result<()> {
        Self::command(input, width, height, output).run()?;
        expect_output(SIPS, output)
    }
}

/// Packs with `iconutil -c icns <dir>.iconset -o <out>.icns`.
///
/// `iconutil` only accepts a directory whose name ends in `.iconset`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iconutil;

impl Iconutil {
    fn command(iconset_dir: &Path, output: &Path) -> Cmd {
        Cmd::new(ICONUTIL)
            .args(["-c", "icns"])
            .arg_path(iconset_dir)
            .arg("-o")
            .arg_path(output)
            .error_msg("iconutil failed to create the .icns file")
    }
}

impl Packager for Iconutil {
    fn name(&self) -> &str {
        ICONUTIL
    }

    fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
        vec![(ICONUTIL, MACOS_HINT)]
    }

    fn pack(&self, iconset_dir: &Path, output: &Path) -> Result<()> {
        Self::command(iconset_dir, output).run()?;
        expect_output(ICONUTIL, output)
    }
}
