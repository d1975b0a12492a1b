//! Conversion capabilities the pipeline depends on.
//!
//! The builder never names a tool directly. It talks to three traits:
//!
//! - [`Rasterizer`] - SVG file to PNG at (roughly) a target dimension
//! - [`Resizer`] - PNG to PNG at an exact width and height
//! - [`Packager`] - directory of canonically named PNGs to one container file
//!
//! Host-tool implementations live in [`librsvg`], [`imagemagick`] and
//! [`macos`]; in-process ones in [`native`]. A [`Backend`] picks a
//! consistent set of them.
//!
//! # Architecture
//!
//! ```text
//! Backend::Auto ──► Capabilities
//!                     ├── rasterizer: FallbackRasterizer [rsvg-convert, convert, qlmanage, resvg]
//!                     ├── resizer:    sips | convert | image
//!                     └── packager:   iconutil | icns
//! ```

pub mod imagemagick;
pub mod librsvg;
pub mod macos;
pub mod native;

use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::preflight::{check_required_tools, command_exists};

/// Renders an SVG file to a PNG.
pub trait Rasterizer {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Host tools this implementation shells out to, as (command, package).
    fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    /// Render `source` targeting `dimension` pixels, writing into
    /// `work_dir`. Returns the path of the produced PNG.
    ///
    /// Tools differ in how they honor the target, so callers must not rely
    /// on the output being exactly `dimension` pixels.
    fn rasterize(&self, source: &Path, dimension: u32, work_dir: &Path) -> Result<PathBuf>;
}

/// Resamples a PNG to an exact pixel size.
pub trait Resizer {
    fn name(&self) -> &str;

    fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    fn resize(&self, input: &Path, width: u32, height: u32, output: &Path) -> Result<()>;
}

/// Packs an iconset directory into a single container file.
pub trait Packager {
    fn name(&self) -> &str;

    fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    /// Consume `iconset_dir` and write the container to `output`.
    fn pack(&self, iconset_dir: &Path, output: &Path) -> Result<()>;
}

/// Fail with a uniform message when a tool exited cleanly but left no file.
pub(crate) fn expect_output(tool: &str, path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!(
            "{} reported success but produced no file at '{}'",
            tool,
            path.display()
        );
    }
    Ok(())
}

/// Tries each rasterizer in order until one succeeds.
///
/// Every alternative is attempted at most once per call.
pub struct FallbackRasterizer {
    name: String,
    chain: Vec<Box<dyn Rasterizer>>,
}

impl FallbackRasterizer {
    pub fn new(chain: Vec<Box<dyn Rasterizer>>) -> Self {
        let name = chain
            .iter()
            .map(|r| r.name())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self { name, chain }
    }
}

impl Rasterizer for FallbackRasterizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn rasterize(&self, source: &Path, dimension: u32, work_dir: &Path) -> Result<PathBuf> {
        let mut failures = Vec::new();
        for rasterizer in &self.chain {
            match rasterizer.rasterize(source, dimension, work_dir) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    log::debug!("{} could not rasterize: {:#}", rasterizer.name(), e);
                    failures.push(format!("{}: {:#}", rasterizer.name(), e));
                }
            }
        }

        if failures.is_empty() {
            bail!("no rasterizer configured");
        }
        Err(anyhow!(
            "all rasterizers failed:\n  {}",
            failures.join("\n  ")
        ))
    }
}

/// Named capability sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Host tools found on PATH, in-process fallbacks for the rest.
    #[default]
    Auto,
    /// Quick Look, sips and iconutil.
    Macos,
    /// rsvg-convert with an ImageMagick fallback, packaged by iconutil.
    Rsvg,
    /// resvg, image and icns; no host tools.
    Native,
}

impl Backend {
    pub const ALL: [Backend; 4] = [Backend::Auto, Backend::Macos, Backend::Rsvg, Backend::Native];

    pub fn id(&self) -> &'static str {
        match self {
            Backend::Auto => "auto",
            Backend::Macos => "macos",
            Backend::Rsvg => "rsvg",
            Backend::Native => "native",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Backend::ALL
            .iter()
            .find(|b| b.id() == wanted)
            .copied()
            .ok_or_else(|| {
                let known = Backend::ALL
                    .iter()
                    .map(|b| b.id())
                    .collect::<Vec<_>>()
                    .join(", ");
                anyhow!("unknown backend '{}'; expected one of: {}", s, known)
            })
    }
}

/// One implementation of each capability.
pub struct Capabilities {
    pub rasterizer: Box<dyn Rasterizer>,
    pub resizer: Box<dyn Resizer>,
    pub packager: Box<dyn Packager>,
}

impl Capabilities {
    pub fn new(
        rasterizer: Box<dyn Rasterizer>,
        resizer: Box<dyn Resizer>,
        packager: Box<dyn Packager>,
    ) -> Self {
        Self {
            rasterizer,
            resizer,
            packager,
        }
    }

    pub fn for_backend(backend: Backend) -> Self {
        match backend {
            Backend::Auto => Self::detect(),
            Backend::Macos => Self::new(
                Box::new(macos::QuickLook),
                Box::new(macos::Sips),
                Box::new(macos::Iconutil),
            ),
            Backend::Rsvg => Self::new(
                Box::new(FallbackRasterizer::new(vec![
                    Box::new(librsvg::RsvgConvert),
                    Box::new(imagemagick::MagickConvert),
                ])),
                Box::new(native::ImageResizer),
                Box::new(macos::Iconutil),
            ),
            Backend::Native => Self::new(
                Box::new(native::ResvgRasterizer),
                Box::new(native::ImageResizer),
                Box::new(native::IcnsPackager),
            ),
        }
    }

    fn detect() -> Self {
        let mut chain: Vec<Box<dyn Rasterizer>> = Vec::new();
        if command_exists(librsvg::RSVG_CONVERT) {
            chain.push(Box::new(librsvg::RsvgConvert));
        }
        if command_exists(imagemagick::CONVERT) {
            chain.push(Box::new(imagemagick::MagickConvert));
        }
        if command_exists(macos::QLMANAGE) {
            chain.push(Box::new(macos::QuickLook));
        }
        chain.push(Box::new(native::ResvgRasterizer));

        let resizer: Box<dyn Resizer> = if command_exists(macos::SIPS) {
            Box::new(macos::Sips)
        } else if command_exists(imagemagick::CONVERT) {
            Box::new(imagemagick::MagickResize)
        } else {
            Box::new(native::ImageResizer)
        };

        let packager: Box<dyn Packager> = if command_exists(macos::ICONUTIL) {
            Box::new(macos::Iconutil)
        } else {
            Box::new(native::IcnsPackager)
        };

        Self::new(
            Box::new(FallbackRasterizer::new(chain)),
            resizer,
            packager,
        )
    }

    /// Tools that must all be present for this set to work.
    pub fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
        let mut tools = self.rasterizer.required_tools();
        tools.extend(self.resizer.required_tools());
        tools.extend(self.packager.required_tools());
        tools.sort();
        tools.dedup();
        tools
    }

    /// Fail early, with install hints, if a required tool is missing.
    pub fn preflight(&self) -> Result<()> {
        check_required_tools(&self.required_tools())
    }

    pub fn describe(&self) -> String {
        format!(
            "rasterizer={}, resizer={}, packager={}",
            self.rasterizer.name(),
            self.resizer.name(),
            self.packager.name()
        )
    }
}
