//! `rsvg-convert` from librsvg.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::{expect_output, Rasterizer};
use crate::process::Cmd;

pub const RSVG_CONVERT: &str = "rsvg-convert";

/// Rasterizes with `rsvg-convert -w N -h N <svg> -o <png>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsvgConvert;

impl RsvgConvert {
    fn command(source: &Path, dimension: u32, output: &Path) -> Cmd {
        let size = dimension.to_string();
        Cmd::new(RSVG_CONVERT)
            .args(["-w", &size, "-h", &size])
            .arg_path(source)
            .arg("-o")
            .arg_path(output)
            .error_msg(format!("rsvg-convert failed at {dimension}px"))
    }
}

impl Rasterizer for RsvgConvert {
    fn name(&self) -> &str {
        RSVG_CONVERT
    }

    fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
        vec![(RSVG_CONVERT, "librsvg")]
    }

    fn rasterize(&self, source: &Path, dimension: u32, work_dir: &Path) -> Result<PathBuf> {
        let output = work_dir.join(format!("rsvg_{dimension}.png"));
        Self::command(source, dimension, &output).run()?;
        expect_output(RSVG_CONVERT, &output)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_shape() {
        let cmd = RsvgConvert::command(Path::new("icon.svg"), 64, Path::new("out.png"));
        assert_eq!(
            cmd.display(),
            "rsvg-convert -w 64 -h 64 icon.svg -o out.png"
        );
    }
}
