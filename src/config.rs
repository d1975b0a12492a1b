//! Builder configuration.
//!
//! A run is fully described by a [`BuilderConfig`]. It can be built in code
//! or loaded from a TOML file:
//!
//! ```toml
//! [bundle]
//! name = "AppIcon"
//! output = "Resources/AppIcon.icns"
//! template = "app-icon"
//! backend = "auto"
//! checksum = true
//!
//! [[sizes]]
//! dimension = 16
//! file_name = "icon_16x16.png"
//! ```
//!
//! Every key is optional; missing keys fall back to [`BuilderConfig::default`].

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::capability::Backend;
use crate::sizes::{SizeEntry, SizeSpec};
use crate::template::Template;

pub const DEFAULT_BUNDLE_NAME: &str = "AppIcon";
pub const DEFAULT_OUTPUT: &str = "Resources/AppIcon.icns";

/// Immutable inputs of one builder run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Iconset directory is staged as `<bundle_name>.iconset`.
    pub bundle_name: String,
    pub output: PathBuf,
    pub template: Template,
    pub backend: Backend,
    pub sizes: SizeSpec,
    /// Write `<output>.sha256` after a successful run.
    pub write_checksum: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            bundle_name: DEFAULT_BUNDLE_NAME.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            template: Template::AppIcon,
            backend: Backend::Auto,
            sizes: SizeSpec::macos(),
            write_checksum: false,
        }
    }
}

impl BuilderConfig {
    pub fn iconset_dir_name(&self) -> String {
        format!("{}.iconset", self.bundle_name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    bundle: Option<BundleToml>,
    sizes: Option<Vec<SizeEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleToml {
    name: Option<String>,
    output: Option<PathBuf>,
    template: Option<String>,
    backend: Option<String>,
    checksum: Option<bool>,
}

pub fn load_config(config_path: &Path) -> Result<BuilderConfig> {
    let text = fs::read_to_string(config_path)
        .with_context(|| format!("reading builder config '{}'", config_path.display()))?;
    parse_config(&text, config_path)
}

/// Parse config text. `origin` is only used in error messages.
pub fn parse_config(text: &str, origin: &Path) -> Result<BuilderConfig> {
    let parsed: ConfigToml = toml::from_str(text)
        .with_context(|| format!("parsing builder config '{}'", origin.display()))?;

    let mut config = BuilderConfig::default();

    if let Some(bundle) = parsed.bundle {
        if let Some(name) = bundle.name {
            config.bundle_name = parse_bundle_name(&name, origin)?;
        }
        if let Some(output) = bundle.output {
            if output.as_os_str().is_empty() {
                bail!(
                    "invalid builder config '{}': output must not be empty",
                    origin.display()
                );
            }
            config.output = output;
        }
        if let Some(template) = bundle.template {
            config.template = template
                .parse()
                .with_context(|| format!("invalid builder config '{}'", origin.display()))?;
        }
        if let Some(backend) = bundle.backend {
            config.backend = backend
                .parse()
                .with_context(|| format!("invalid builder config '{}'", origin.display()))?;
        }
        if let Some(checksum) = bundle.checksum {
            config.write_checksum = checksum;
        }
    }

    if let Some(sizes) = parsed.sizes {
        config.sizes = SizeSpec::new(sizes)
            .with_context(|| format!("invalid builder config '{}'", origin.display()))?;
    }

    Ok(config)
}

fn parse_bundle_name(raw: &str, origin: &Path) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        bail!(
            "invalid builder config '{}': bundle name must not be empty",
            origin.display()
        );
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        bail!(
            "invalid builder config '{}': bundle name '{}' must be a plain file name",
            origin.display(),
            raw
        );
    }
    Ok(name.to_string())
}
