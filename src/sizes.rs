//! Target resolutions and their canonical iconset file names.

use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::HashSet;

/// One required raster: its pixel dimension and the file name the
/// packager expects for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeEntry {
    pub dimension: u32,
    pub file_name: String,
}

impl SizeEntry {
    pub fn new(dimension: u32, file_name: impl Into<String>) -> Self {
        Self {
            dimension,
            file_name: file_name.into(),
        }
    }
}

/// Ordered, validated list of [`SizeEntry`] values.
///
/// Dimensions are positive, file names are unique, and a canonical
/// iconset name agrees with its dimension. All are checked on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeSpec {
    entries: Vec<SizeEntry>,
}

/// The ten resolutions of a macOS `.iconset`, base and `@2x` variants.
pub const MACOS_ICONSET: &[(u32, &str)] = &[
    (16, "icon_16x16.png"),
    (32, "icon_16x16@2x.png"),
    (32, "icon_32x32.png"),
    (64, "icon_32x32@2x.png"),
    (128, "icon_128x128.png"),
    (256, "icon_128x128@2x.png"),
    (256, "icon_256x256.png"),
    (512, "icon_256x256@2x.png"),
    (512, "icon_512x512.png"),
    (1024, "icon_512x512@2x.png"),
];

impl SizeSpec {
    pub fn new(entries: Vec<SizeEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.dimension == 0 {
                bail!("size entry '{}' has a zero dimension", entry.file_name);
            }
            if entry.file_name.trim().is_empty() {
                bail!("size entry with dimension {} has an empty file name", entry.dimension);
            }
            if entry.file_name.contains('/') || entry.file_name.contains('\\') {
                bail!(
                    "size entry file name '{}' must not contain a path separator",
                    entry.file_name
                );
            }
            if let Some((points, scale)) = parse_iconset_name(&entry.file_name) {
                if points * scale != entry.dimension {
                    bail!(
                        "size entry '{}' names a {}px raster but asks for {}px",
                        entry.file_name,
                        points * scale,
                        entry.dimension
                    );
                }
            }
            if !seen.insert(entry.file_name.as_str()) {
                bail!("duplicate size entry file name '{}'", entry.file_name);
            }
        }
        Ok(Self { entries })
    }

    /// The standard macOS table ([`MACOS_ICONSET`]).
    pub fn macos() -> Self {
        Self {
            entries: MACOS_ICONSET
                .iter()
                .map(|(dimension, name)| SizeEntry::new(*dimension, *name))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[SizeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SizeSpec {
    fn default() -> Self {
        Self::macos()
    }
}

/// Parse a canonical iconset name such as `icon_32x32@2x.png`.
///
/// Returns the nominal point size and the density scale (1 or 2).
pub fn parse_iconset_name(file_name: &str) -> Option<(u32, u32)> {
    let stem = file_name.strip_prefix("icon_")?.strip_suffix(".png")?;
    let (dims, scale) = match stem.strip_suffix("@2x") {
        Some(base) => (base, 2),
        None => (stem, 1),
    };
    let (w, h) = dims.split_once('x')?;
    let w: u32 = w.parse().ok()?;
    let h: u32 = h.parse().ok()?;
    (w == h && w > 0).then_some((w, scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macos_table_is_valid() {
        let spec = SizeSpec::macos();
        assert_eq!(spec.len(), 10);
        assert!(SizeSpec::new(spec.entries().to_vec()).is_ok());
    }

    #[test]
    fn macos_names_match_their_dimension() {
        for entry in SizeSpec::macos().entries() {
            let (points, scale) = parse_iconset_name(&entry.file_name).unwrap();
            assert_eq!(points * scale, entry.dimension, "{}", entry.file_name);
        }
    }

    #[test]
    fn rejects_duplicate_names() {
        let result = SizeSpec::new(vec![
            SizeEntry::new(16, "icon_16x16.png"),
            SizeEntry::new(32, "icon_16x16.png"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_dimension() {
        assert!(SizeSpec::new(vec![SizeEntry::new(0, "icon_0x0.png")]).is_err());
    }

    #[test]
    fn rejects_path_in_name() {
        assert!(SizeSpec::new(vec![SizeEntry::new(16, "../icon_16x16.png")]).is_err());
    }

    #[test]
    fn rejects_name_dimension_mismatch() {
        let err = SizeSpec::new(vec![
            SizeEntry::new(20, "icon_16x16.png"),
            SizeEntry::new(32, "icon_16x16@2x.png"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("icon_16x16.png"));

        assert!(SizeSpec::new(vec![SizeEntry::new(16, "icon_16x16@2x.png")]).is_err());
    }

    #[test]
    fn non_canonical_names_take_any_dimension() {
        assert!(SizeSpec::new(vec![SizeEntry::new(20, "tray_20.png")]).is_ok());
    }

    #[test]
    fn same_dimension_different_names_is_allowed() {
        let spec = SizeSpec::new(vec![
            SizeEntry::new(32, "icon_16x16@2x.png"),
            SizeEntry::new(32, "icon_32x32.png"),
        ])
        .unwrap();
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn parse_iconset_name_cases() {
        assert_eq!(parse_iconset_name("icon_16x16.png"), Some((16, 1)));
        assert_eq!(parse_iconset_name("icon_512x512@2x.png"), Some((512, 2)));
        assert_eq!(parse_iconset_name("icon_16x32.png"), None);
        assert_eq!(parse_iconset_name("preview.png"), None);
    }
}
