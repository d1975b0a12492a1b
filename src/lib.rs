//! Build macOS icon bundles from embedded SVG artwork.
//!
//! The crate turns a vector icon into a directory of canonically named PNGs
//! (an `.iconset`) and packs that directory into one `.icns` container:
//!
//! - **Templates** - Embedded SVG sources, rendered without I/O
//! - **Sizes** - The resolution table and its `@2x` naming convention
//! - **Capabilities** - Rasterize / resize / package traits with host-tool and in-process implementations
//! - **Pipeline** - The builder that sequences them and owns the staging directory
//! - **Preflight checks** - Host tool validation before a run
//!
//! # Architecture
//!
//! ```text
//! iconset-builder (binary)
//!     │
//!     └── BuilderConfig (defaults or iconset.toml)
//!             │
//!             ▼
//!         IconsetBuilder
//!             ├── template::render_vector   ─► icon.svg in staging
//!             ├── Rasterizer + Resizer      ─► <Name>.iconset/icon_NxN[@2x].png
//!             └── Packager                  ─► <output>.icns
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use iconset_builder::{BuilderConfig, IconsetBuilder};
//!
//! let report = IconsetBuilder::from_config(BuilderConfig::default()).run()?;
//! println!(
//!     "{} of {} sizes in {}",
//!     report.bundle.entries,
//!     report.requested,
//!     report.bundle.path.display()
//! );
//! # Ok::<(), iconset_builder::BuildError>(())
//! ```

pub mod capability;
pub mod checksum;
pub mod config;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod sizes;
pub mod template;

pub use capability::{Backend, Capabilities, Packager, Rasterizer, Resizer};
pub use config::{load_config, BuilderConfig};
pub use pipeline::{BuildError, BuildReport, BuildState, IconBundle, IconsetBuilder, RasterSet};
pub use sizes::{SizeEntry, SizeSpec};
pub use template::{render_vector, Template, VectorImage};
