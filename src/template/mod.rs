//! Embedded SVG icon templates.
//!
//! Templates are compiled into the binary, so rendering one never touches
//! the filesystem and never fails. The same template always yields the same
//! markup, which is what makes whole-pipeline runs reproducible.
//!
//! # Example
//!
//! ```rust
//! use iconset_builder::template::{render_vector, Template};
//!
//! let image = render_vector(Template::AppIcon);
//! assert_eq!(image.width(), 1024);
//! assert!(image.markup().contains("<svg"));
//! ```

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

const APP_ICON_SVG: &str = include_str!("../../assets/app-icon.svg");
const APP_ICON_CLASSIC_SVG: &str = include_str!("../../assets/app-icon-classic.svg");
const MENU_BAR_SVG: &str = include_str!("../../assets/menu-bar.svg");
const MENU_BAR_CLASSIC_SVG: &str = include_str!("../../assets/menu-bar-classic.svg");

/// Identifier of an embedded artwork template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// 1024x1024 application icon with the vibrant gradient palette.
    AppIcon,
    /// 512x512 application icon with the classic blue palette.
    AppIconClassic,
    /// 18x18 menu bar glyph matching [`Template::AppIcon`].
    MenuBar,
    /// 18x18 menu bar glyph matching [`Template::AppIconClassic`].
    MenuBarClassic,
}

impl Template {
    /// Every template, in a stable order.
    pub const ALL: [Template; 4] = [
        Template::AppIcon,
        Template::AppIconClassic,
        Template::MenuBar,
        Template::MenuBarClassic,
    ];

    /// Name used in config files and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Template::AppIcon => "app-icon",
            Template::AppIconClassic => "app-icon-classic",
            Template::MenuBar => "menu-bar",
            Template::MenuBarClassic => "menu-bar-classic",
        }
    }

    fn markup(&self) -> &'static str {
        match self {
            Template::AppIcon => APP_ICON_SVG,
            Template::AppIconClassic => APP_ICON_CLASSIC_SVG,
            Template::MenuBar => MENU_BAR_SVG,
            Template::MenuBarClassic => MENU_BAR_CLASSIC_SVG,
        }
    }

    fn intrinsic_size(&self) -> (u32, u32) {
        match self {
            Template::AppIcon => (1024, 1024),
            Template::AppIconClassic => (512, 512),
            Template::MenuBar | Template::MenuBarClassic => (18, 18),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Template {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        if let Some(template) = Template::ALL.iter().find(|t| t.id() == wanted) {
            return Ok(*template);
        }

        let known = Template::ALL
            .iter()
            .map(|t| t.id())
            .collect::<Vec<_>>()
            .join(", ");
        bail!("unknown template '{}'; expected one of: {}", s, known)
    }
}

/// A self-contained SVG document with its intrinsic pixel size.
///
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorImage {
    markup: String,
    width: u32,
    height: u32,
}

impl VectorImage {
    /// Wrap caller-provided markup.
    ///
    /// The markup is not parsed here; rasterizers report malformed input
    /// as a per-entry failure.
    pub fn new(markup: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            markup: markup.into(),
            width,
            height,
        }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Write the markup to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory '{}'", parent.display()))?;
        }
        fs::write(path, &self.markup)
            .with_context(|| format!("writing SVG source '{}'", path.display()))
    }
}

/// Produce the markup for an embedded template.
pub fn render_vector(template: Template) -> VectorImage {
    let (width, height) = template.intrinsic_size();
    VectorImage::new(template.markup(), width, height)
}
