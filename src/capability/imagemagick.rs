//! ImageMagick `convert`, used both as a rasterizer and as a resizer.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::{expect_output, Rasterizer, Resizer};
use crate::process::Cmd;

pub const CONVERT: &str = "convert";

/// Rasterizes with `convert -background transparent -size NxN <svg> <png>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagickConvert;

impl MagickConvert {
    fn command(source: &Path, dimension: u32, output: &Path) -> Cmd {
        Cmd::new(CONVERT)
            .args(["-background", "transparent"])
            .args(["-size", &format!("{dimension}x{dimension}")])
            .arg_path(source)
            .arg_path(output)
            .error_msg(format!("ImageMagick failed to rasterize at {dimension}px"))
    }
}

impl Rasterizer for MagickConvert {
    fn name(&self) -> &str {
        CONVERT
    }

    fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
        vec![(CONVERT, "imagemagick")]
    }

    fn rasterize(&self, source: &Path, dimension: u32, work_dir: &Path) -> Result<PathBuf> {
        let output = work_dir.join(format!("magick_{dimension}.png"));
        Self::command(source, dimension, &output).run()?;
        expect_output(CONVERT, &output)?;
        Ok(output)
    }
}

/// Resizes with `convert <in> -resize WxH! <out>`.
///
/// The `!` suffix makes ImageMagick ignore the aspect ratio and hit the
/// requested geometry exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagickResize;

impl MagickResize {
    fn command(input: &Path, width: u32, height: u32, output: &Path) -> Cmd {
        Cmd::new(CONVERT)
            .arg_path(input)
            .args(["-resize", &format!("{width}x{height}!")])
            .arg_path(output)
            .error_msg(format!("ImageMagick failed to resize to {width}x{height}"))
    }
}

impl Resizer for MagickResize {
    fn name(&self) -> &str {
        CONVERT
    }

    fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
        vec![(CONVERT, "imagemagick")]
    }

    fn resize(&self, input: &Path, width: u32, height: u32, output: &Path) -> Result<()> {
        Self::command(input, width, height, output).run()?;
        expect_output(CONVERT, output)
    }
}
