//! The icon bundle pipeline: render source, rasterize every size, package.
//!
//! ```text
//! Init ─► SourceGenerated ─► Rasterizing(1/N) ─► ... ─► Rasterizing(N/N) ─► Packaging ─┬─► Done
//!                                                                                       └─► PackagingFailed
//! ```
//!
//! Rasterizing never fails the run: an entry that cannot be produced is
//! logged and left out. Packaging is the only fatal step, and when it fails
//! nothing is left at the output path.
//!
//! # Example
//!
//! ```rust,no_run
//! use iconset_builder::capability::Backend;
//! use iconset_builder::pipeline::IconsetBuilder;
//! use iconset_builder::BuilderConfig;
//!
//! let config = BuilderConfig {
//!     backend: Backend::Native,
//!     ..Default::default()
//! };
//! let report = IconsetBuilder::from_config(config).run()?;
//! println!("{} entries", report.bundle.entries);
//! # Ok::<(), iconset_builder::pipeline::BuildError>(())
//! ```

mod raster_set;
mod staging;

pub use raster_set::{RasterFailure, RasterFile, RasterSet};
pub use staging::Staging;

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::capability::Capabilities;
use crate::checksum::{abbreviate, sha256_file, write_checksum_file};
use crate::config::BuilderConfig;
use crate::sizes::SizeEntry;
use crate::template::{render_vector, VectorImage};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Init,
    SourceGenerated,
    /// Working on entry `index` (1-based) of `total`.
    Rasterizing { index: usize, total: usize },
    Packaging,
    Done,
    PackagingFailed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Init => write!(f, "Init"),
            BuildState::SourceGenerated => write!(f, "SourceGenerated"),
            BuildState::Rasterizing { index, total } => write!(f, "Rasterizing({index}/{total})"),
            BuildState::Packaging => write!(f, "Packaging"),
            BuildState::Done => write!(f, "Done"),
            BuildState::PackagingFailed => write!(f, "PackagingFailed"),
        }
    }
}

/// Failures that end a run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("could not prepare the staging directory")]
    Staging(#[source] BoxError),

    #[error("packaging with {packager} failed")]
    Packaging {
        packager: String,
        #[source]
        source: BoxError,
    },

    #[error("could not install the bundle at '{}'", .path.display())]
    Install {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// The container file a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconBundle {
    pub path: PathBuf,
    /// Rasters that went into the container.
    pub entries: usize,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub bundle: IconBundle,
    pub raster_set: RasterSet,
    /// Requested entries, for "N of M" reporting.
    pub requested: usize,
    pub sha256: Option<String>,
    pub checksum_file: Option<PathBuf>,
}

/// Drives one template through the configured capabilities.
pub struct IconsetBuilder {
    config: BuilderConfig,
    caps: Capabilities,
}

impl IconsetBuilder {
    pub fn new(config: BuilderConfig, caps: Capabilities) -> Self {
        Self { config, caps }
    }

    /// Build with the capability set named by `config.backend`.
    pub fn from_config(config: BuilderConfig) -> Self {
        let caps = Capabilities::for_backend(config.backend);
        Self::new(config, caps)
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn tag(&self) -> String {
        format!("[iconset:{}]", self.config.bundle_name)
    }

    pub fn render_vector(&self) -> VectorImage {
        render_vector(self.config.template)
    }

    /// Produce one canonical raster in the iconset directory.
    ///
    /// The rasterizer's output always goes through an exact resize, so the
    /// file has precisely `entry.dimension` pixels on each side whatever
    /// the rasterizer did with the target.
    pub fn rasterize(&self, staging: &Staging, entry: &SizeEntry) -> Result<RasterFile> {
        let target = staging.iconset_dir().join(&entry.file_name);
        let result = self.rasterize_into(staging, entry, &target);
        if result.is_err() && target.exists() {
            // Never hand a half-written entry to the packager.
            let _ = fs::remove_file(&target);
        }
        result
    }

    fn rasterize_into(
        &self,
        staging: &Staging,
        entry: &SizeEntry,
        target: &Path,
    ) -> Result<RasterFile> {
        let dimension = entry.dimension;
        let raw = self
            .caps
            .rasterizer
            .rasterize(staging.source(), dimension, staging.work_dir())
            .with_context(|| format!("rasterizing at {dimension}px"))?;

        self.caps
            .resizer
            .resize(&raw, dimension, dimension, target)
            .with_context(|| format!("resizing to {dimension}x{dimension}"))?;

        let (width, height) = image::image_dimensions(target)
            .with_context(|| format!("reading dimensions of '{}'", target.display()))?;
        if (width, height) != (dimension, dimension) {
            bail!(
                "{} produced {}x{} instead of {}x{}",
                self.caps.resizer.name(),
                width,
                height,
                dimension,
                dimension
            );
        }

        Ok(RasterFile {
            file_name: entry.file_name.clone(),
            dimension,
            path: target.to_path_buf(),
        })
    }

    /// Rasterize every configured size. Never fails; see [`RasterSet`].
    pub fn build_raster_set(&self, staging: &Staging) -> RasterSet {
        self.build_raster_set_with(staging, &mut |_: &BuildState| {})
    }

    fn build_raster_set_with(
        &self,
        staging: &Staging,
        on_state: &mut dyn FnMut(&BuildState),
    ) -> RasterSet {
        let entries = self.config.sizes.entries();
        let total = entries.len();
        let mut set = RasterSet::default();

        for (i, entry) in entries.iter().enumerate() {
            on_state(&BuildState::Rasterizing {
                index: i + 1,
                total,
            });
            match self.rasterize(staging, entry) {
                Ok(file) => {
                    println!(
                        "  [{}/{}] {} ({}x{})",
                        i + 1,
                        total,
                        file.file_name,
                        file.dimension,
                        file.dimension
                    );
                    set.push(file);
                }
                Err(e) => {
                    println!("  [{}/{}] {} skipped", i + 1, total, entry.file_name);
                    log::warn!("could not create {}: {:#}", entry.file_name, e);
                    set.push_failure(RasterFailure::new(entry, &e));
                }
            }
        }

        set
    }

    /// Pack the staged iconset and move the container to `output`.
    ///
    /// A container from an earlier run is removed first, and the new one is
    /// only moved into place once the packager has succeeded, so a failure
    /// leaves nothing at `output`.
    pub fn package_bundle(
        &self,
        staging: &Staging,
        raster_set: &RasterSet,
        output: &Path,
    ) -> Result<IconBundle, BuildError> {
        remove_stale_output(output).map_err(|e| BuildError::Install {
            path: output.to_path_buf(),
            source: e.into(),
        })?;

        let file_name = output
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "bundle.icns".into());
        let staged = staging.out_dir().join(file_name);

        self.caps
            .packager
            .pack(staging.iconset_dir(), &staged)
            .and_then(|()| crate::capability::expect_output(self.caps.packager.name(), &staged))
            .map_err(|e| BuildError::Packaging {
                packager: self.caps.packager.name().to_string(),
                source: e.into(),
            })?;

        install(&staged, output).map_err(|e| BuildError::Install {
            path: output.to_path_buf(),
            source: e.into(),
        })?;

        Ok(IconBundle {
            path: output.to_path_buf(),
            entries: raster_set.len(),
        })
    }

    pub fn run(&self) -> Result<BuildReport, BuildError> {
        self.run_with(|_| {})
    }

    /// Run the whole pipeline, reporting each state transition to `on_state`.
    pub fn run_with(
        &self,
        mut on_state: impl FnMut(&BuildState),
    ) -> Result<BuildReport, BuildError> {
        let tag = self.tag();
        let mut enter = |state: BuildState| {
            log::debug!("{} state -> {}", tag, state);
            on_state(&state);
        };

        enter(BuildState::Init);
        log::info!("{} using {}", tag, self.caps.describe());
        // Advisory only: a missing rasterizer is a per-entry failure and a
        // missing packager surfaces as BuildError::Packaging.
        if let Err(e) = self.caps.preflight() {
            log::warn!("{} {:#}", tag, e);
        }

        let image = self.render_vector();
        let staging = Staging::new(&self.config.iconset_dir_name(), &image)
            .map_err(|e| BuildError::Staging(e.into()))?;
        enter(BuildState::SourceGenerated);
        println!(
            "{} rendering {} ({}x{}) at {} sizes...",
            tag,
            self.config.template,
            image.width(),
            image.height(),
            self.config.sizes.len()
        );

        let raster_set =
            self.build_raster_set_with(&staging, &mut |state: &BuildState| enter(*state));

        enter(BuildState::Packaging);
        println!(
            "{} packaging {} of {} rasters with {}...",
            tag,
            raster_set.len(),
            self.config.sizes.len(),
            self.caps.packager.name()
        );
        let bundle = match self.package_bundle(&staging, &raster_set, &self.config.output) {
            Ok(bundle) => bundle,
            Err(e) => {
                enter(BuildState::PackagingFailed);
                return Err(e);
            }
        };
        drop(staging);

        let (sha256, checksum_file) = self.checksum(&bundle.path);
        enter(BuildState::Done);
        println!("{} wrote {}", tag, bundle.path.display());

        Ok(BuildReport {
            bundle,
            requested: self.config.sizes.len(),
            raster_set,
            sha256,
            checksum_file,
        })
    }

    /// Digest failures do not undo a finished bundle; they are only logged.
    fn checksum(&self, bundle: &Path) -> (Option<String>, Option<PathBuf>) {
        let hash = match sha256_file(bundle) {
            Ok(hash) => hash,
            Err(e) => {
                log::warn!("could not hash '{}': {:#}", bundle.display(), e);
                return (None, None);
            }
        };
        println!("  SHA256: {}", abbreviate(&hash));

        if !self.config.write_checksum {
            return (Some(hash), None);
        }
        match write_checksum_file(bundle, &hash) {
            Ok(path) => (Some(hash), Some(path)),
            Err(e) => {
                log::warn!("{:#}", e);
                (Some(hash), None)
            }
        }
    }

    /// Rasterize the configured template once, at `dimension`, to `output`.
    ///
    /// Used for standalone previews next to the SVG sources.
    pub fn export_png(&self, image: &VectorImage, dimension: u32, output: &Path) -> Result<()> {
        let staging = Staging::new("preview.iconset", image)?;
        let entry = SizeEntry::new(dimension, "preview.png");
        let file = self.rasterize(&staging, &entry)?;
        install(&file.path, output)
    }
}

fn remove_stale_output(output: &Path) -> Result<()> {
    if output.is_file() {
        log::info!("removing previous bundle '{}'", output.display());
        fs::remove_file(output)
            .with_context(|| format!("removing previous bundle '{}'", output.display()))?;
    } else if output.exists() {
        bail!("'{}' exists and is not a file", output.display());
    }
    Ok(())
}

/// Copy `staged` next to `output` under a temporary name, then rename it
/// into place so `output` never holds a partial file.
fn install(staged: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }

    let mut partial = output.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let result = fs::copy(staged, &partial)
        .with_context(|| format!("copying bundle to '{}'", partial.display()))
        .and_then(|_| {
            fs::rename(&partial, output).with_context(|| {
                format!(
                    "renaming '{}' -> '{}'",
                    partial.display(),
                    output.display()
                )
            })
        });
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::native::{IcnsPackager, ImageResizer, ResvgRasterizer};
    use crate::capability::{Backend, Packager, Rasterizer, Resizer};
    use crate::sizes::SizeSpec;
    use crate::template::Template;
    use image::RgbaImage;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Writes a PNG slightly off the requested size, like Quick Look does.
    struct SloppyRasterizer {
        fail_at: Option<u32>,
    }

    impl Rasterizer for SloppyRasterizer {
        fn name(&self) -> &str {
            "sloppy"
        }

        fn rasterize(&self, _: &Path, dimension: u32, work_dir: &Path) -> Result<PathBuf> {
            if self.fail_at == Some(dimension) {
                bail!("crashed at {dimension}px");
            }
            let path = work_dir.join(format!("sloppy_{dimension}.png"));
            RgbaImage::new(dimension + 3, dimension).save(&path)?;
            Ok(path)
        }
    }

    struct AbsentRasterizer;

    impl Rasterizer for AbsentRasterizer {
        fn name(&self) -> &str {
            "absent"
        }

        fn required_tools(&self) -> Vec<(&'static str, &'static str)> {
            vec![("definitely-not-installed-rasterizer", "nowhere")]
        }

        fn rasterize(&self, _: &Path, _: u32, _: &Path) -> Result<PathBuf> {
            bail!("rasterizer is not installed")
        }
    }

    /// Copies the input unchanged, ignoring the requested size.
    struct LazyResizer;

    impl Resizer for LazyResizer {
        fn name(&self) -> &str {
            "lazy"
        }

        fn resize(&self, input: &Path, _: u32, _: u32, output: &Path) -> Result<()> {
            fs::copy(input, output)?;
            Ok(())
        }
    }

    /// Writes a listing of the iconset; deterministic and tool-free.
    struct ListingPackager {
        calls: Rc<Cell<u32>>,
    }

    impl Packager for ListingPackager {
        fn name(&self) -> &str {
            "listing"
        }

        fn pack(&self, iconset_dir: &Path, output: &Path) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            let mut names = fs::read_dir(iconset_dir)?
                .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
                .collect::<std::io::Result<Vec<_>>>()?;
            names.sort();
            fs::write(output, names.join("\n"))?;
            Ok(())
        }
    }

    struct AbsentPackager;

    impl Packager for AbsentPackager {
        fn name(&self) -> &str {
            "iconutil"
        }

        fn pack(&self, _: &Path, _: &Path) -> Result<()> {
            bail!("iconutil: command not found")
        }
    }

    fn two_sizes() -> SizeSpec {
        SizeSpec::new(vec![
            SizeEntry::new(16, "icon_16x16.png"),
            SizeEntry::new(32, "icon_16x16@2x.png"),
        ])
        .unwrap()
    }

    fn config_in(temp: &TempDir) -> BuilderConfig {
        BuilderConfig {
            output: temp.path().join("out/AppIcon.icns"),
            template: Template::MenuBar,
            sizes: two_sizes(),
            ..Default::default()
        }
    }

    fn listing() -> (Box<ListingPackager>, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Box::new(ListingPackager {
                calls: Rc::clone(&calls),
            }),
            calls,
        )
    }

    #[test]
    fn every_entry_is_resized_exactly() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.sizes = SizeSpec::macos();
        let (packager, _) = listing();
        let builder = IconsetBuilder::new(
            config,
            Capabilities::new(
                Box::new(SloppyRasterizer { fail_at: None }),
                Box::new(ImageResizer),
                packager,
            ),
        );
        let staging = Staging::new("AppIcon.iconset", &builder.render_vector()).unwrap();

        let set = builder.build_raster_set(&staging);

        assert_eq!(set.len(), 10);
        assert!(set.is_complete());
        for file in set.files() {
            assert_eq!(
                image::image_dimensions(&file.path).unwrap(),
                (file.dimension, file.dimension),
                "{}",
                file.file_name
            );
        }
    }

    #[test]
    fn two_entry_scenario_reaches_done() {
        let temp = TempDir::new().unwrap();
        let (packager, calls) = listing();
        let builder = IconsetBuilder::new(
            config_in(&temp),
            Capabilities::new(
                Box::new(SloppyRasterizer { fail_at: None }),
                Box::new(ImageResizer),
                packager,
            ),
        );

        let mut states = Vec::new();
        let report = builder.run_with(|s| states.push(*s)).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(report.bundle.entries, 2);
        assert_eq!(report.requested, 2);
        assert_eq!(
            fs::read_to_string(&report.bundle.path).unwrap(),
            "icon_16x16.png\nicon_16x16@2x.png"
        );
        assert_eq!(
            states,
            vec![
                BuildState::Init,
                BuildState::SourceGenerated,
                BuildState::Rasterizing { index: 1, total: 2 },
                BuildState::Rasterizing { index: 2, total: 2 },
                BuildState::Packaging,
                BuildState::Done,
            ]
        );
    }

    #[test]
    fn missing_rasterizer_still_packages() {
        let temp = TempDir::new().unwrap();
        let (packager, calls) = listing();
        let builder = IconsetBuilder::new(
            config_in(&temp),
            Capabilities::new(Box::new(AbsentRasterizer), Box::new(ImageResizer), packager),
        );

        let report = builder.run().unwrap();

        assert_eq!(calls.get(), 1);
        assert!(report.raster_set.is_empty());
        assert_eq!(report.raster_set.failures().len(), 2);
        assert_eq!(report.bundle.entries, 0);
        assert!(report.bundle.path.is_file());
    }

    #[test]
    fn failed_preflight_does_not_stop_the_run() {
        let temp = TempDir::new().unwrap();
        let (packager, calls) = listing();
        let caps = Capabilities::new(Box::new(AbsentRasterizer), Box::new(ImageResizer), packager);
        assert!(caps.preflight().is_err());
        let builder = IconsetBuilder::new(config_in(&temp), caps);

        let mut states = Vec::new();
        let report = builder.run_with(|s| states.push(*s)).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(states.last(), Some(&BuildState::Done));
        assert!(report.bundle.path.is_file());
    }

    #[test]
    fn macos_backend_without_its_tools_still_attempts_packaging() {
        let caps = Capabilities::for_backend(Backend::Macos);
        if caps.preflight().is_ok() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        let output = config.output.clone();
        let builder = IconsetBuilder::new(config, caps);

        let mut states = Vec::new();
        let err = builder.run_with(|s| states.push(*s)).unwrap_err();

        assert!(matches!(err, BuildError::Packaging { .. }));
        assert!(states.contains(&BuildState::Rasterizing { index: 2, total: 2 }));
        assert!(states.contains(&BuildState::Packaging));
        assert!(!output.exists());
    }

    #[test]
    fn missing_rasterizer_and_packager_fails() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        let output = config.output.clone();
        let builder = IconsetBuilder::new(
            config,
            Capabilities::new(
                Box::new(AbsentRasterizer),
                Box::new(ImageResizer),
                Box::new(AbsentPackager),
            ),
        );

        let mut states = Vec::new();
        let err = builder.run_with(|s| states.push(*s)).unwrap_err();

        assert!(matches!(err, BuildError::Packaging { .. }));
        assert_eq!(states.last(), Some(&BuildState::PackagingFailed));
        assert!(!output.exists());
    }

    #[test]
    fn failed_packaging_removes_stale_bundle() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        let output = config.output.clone();
        fs::create_dir_all(output.parent().unwrap()).unwrap();
        fs::write(&output, b"old bundle").unwrap();
        let builder = IconsetBuilder::new(
            config,
            Capabilities::new(
                Box::new(SloppyRasterizer { fail_at: None }),
                Box::new(ImageResizer),
                Box::new(AbsentPackager),
            ),
        );

        let err = builder.run().unwrap_err();

        assert!(format!("{}", err).contains("iconutil"));
        assert!(!output.exists());
        assert!(!temp.path().join("out/AppIcon.icns.partial").exists());
    }

    #[test]
    fn one_failed_size_is_partial_success() {
        let temp = TempDir::new().unwrap();
        let (packager, _) = listing();
        let builder = IconsetBuilder::new(
            config_in(&temp),
            Capabilities::new(
                Box::new(SloppyRasterizer { fail_at: Some(32) }),
                Box::new(ImageResizer),
                packager,
            ),
        );

        let report = builder.run().unwrap();

        assert_eq!(report.bundle.entries, 1);
        assert_eq!(report.raster_set.failures()[0].file_name, "icon_16x16@2x.png");
        assert!(report.raster_set.failures()[0].reason.contains("crashed at 32px"));
    }

    #[test]
    fn wrong_size_after_resize_is_rejected() {
        let temp = TempDir::new().unwrap();
        let (packager, _) = listing();
        let builder = IconsetBuilder::new(
            config_in(&temp),
            Capabilities::new(
                Box::new(SloppyRasterizer { fail_at: None }),
                Box::new(LazyResizer),
                packager,
            ),
        );
        let staging = Staging::new("AppIcon.iconset", &builder.render_vector()).unwrap();

        let set = builder.build_raster_set(&staging);

        assert!(set.is_empty());
        assert!(set.failures()[0].reason.contains("19x16 instead of 16x16"));
        // The rejected file must not reach the packager.
        assert_eq!(fs::read_dir(staging.iconset_dir()).unwrap().count(), 0);
    }

    #[test]
    fn native_runs_are_byte_identical() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.backend = Backend::Native;
        config.template = Template::AppIconClassic;
        let output = config.output.clone();

        let builder = IconsetBuilder::new(
            config.clone(),
            Capabilities::new(
                Box::new(ResvgRasterizer),
                Box::new(ImageResizer),
                Box::new(IcnsPackager),
            ),
        );
        let first_report = builder.run().unwrap();
        let first = fs::read(&output).unwrap();

        let second_report = IconsetBuilder::from_config(config).run().unwrap();
        let second = fs::read(&output).unwrap();

        assert_eq!(first_report.bundle.entries, 2);
        assert_eq!(first, second);
        assert_eq!(first_report.sha256, second_report.sha256);
    }

    #[test]
    fn checksum_file_written_when_enabled() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.write_checksum = true;
        let (packager, _) = listing();
        let builder = IconsetBuilder::new(
            config,
            Capabilities::new(
                Box::new(SloppyRasterizer { fail_at: None }),
                Box::new(ImageResizer),
                packager,
            ),
        );

        let report = builder.run().unwrap();

        let checksum = report.checksum_file.unwrap();
        let contents = fs::read_to_string(checksum).unwrap();
        assert!(contents.starts_with(report.sha256.as_deref().unwrap()));
        assert!(contents.trim_end().ends_with("  AppIcon.icns"));
    }

    #[test]
    fn export_png_writes_exact_preview() {
        let temp = TempDir::new().unwrap();
        let (packager, _) = listing();
        let builder = IconsetBuilder::new(
            config_in(&temp),
            Capabilities::new(Box::new(ResvgRasterizer), Box::new(ImageResizer), packager),
        );
        let output = temp.path().join("Resources/AppIcon.png");

        builder
            .export_png(&builder.render_vector(), 48, &output)
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (48, 48));
    }
}
