//! In-process implementations: `resvg` for rasterizing, `image` for
//! resampling and `icns` for packing.
//!
//! These need no host tools, which makes them the fallback on machines
//! without librsvg, ImageMagick or the macOS utilities.

use anyhow::{Context, Result};
use icns::{IconFamily, IconType, Image};
use image::imageops::FilterType;
use image::ImageFormat;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{Packager, Rasterizer, Resizer};
use crate::sizes::parse_iconset_name;

/// Renders with `resvg`, scaling the document to fill `dimension` square.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResvgRasterizer;

impl Rasterizer for ResvgRasterizer {
    fn name(&self) -> &str {
        "resvg"
    }

    fn rasterize(&self, source: &Path, dimension: u32, work_dir: &Path) -> Result<PathBuf> {
        let data = fs::read(source)
            .with_context(|| format!("reading SVG source '{}'", source.display()))?;

        let mut opt = usvg::Options::default();
        opt.resources_dir = source.parent().map(Path::to_path_buf);
        let tree = usvg::Tree::from_data(&data, &opt)
            .with_context(|| format!("parsing SVG source '{}'", source.display()))?;

        let size = tree.size();
        let scale_x = dimension as f32 / size.width();
        let scale_y = dimension as f32 / size.height();

        let mut pixmap = Pixmap::new(dimension, dimension)
            .with_context(|| format!("allocating a {dimension}x{dimension} pixmap"))?;
        resvg::render(
            &tree,
            Transform::from_scale(scale_x, scale_y),
            &mut pixmap.as_mut(),
        );

        let output = work_dir.join(format!("resvg_{dimension}.png"));
        pixmap
            .save_png(&output)
            .with_context(|| format!("writing '{}'", output.display()))?;
        Ok(output)
    }
}

/// Exact resampling with a Lanczos3 filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageResizer;

impl Resizer for ImageResizer {
    fn name(&self) -> &str {
        "image"
    }

    fn resize(&self, input: &Path, width: u32, height: u32, output: &Path) -> Result<()> {
        let img = image::open(input)
            .with_context(|| format!("decoding raster '{}'", input.display()))?;
        img.resize_exact(width, height, FilterType::Lanczos3)
            .save_with_format(output, ImageFormat::Png)
            .with_context(|| format!("writing '{}'", output.display()))
    }
}

/// Writes the `.icns` container directly with the `icns` crate.
///
/// Each PNG is typed by its canonical iconset name, so `icon_16x16@2x.png`
/// and `icon_32x32.png` land in different slots despite sharing a pixel
/// size. Files that are not canonical iconset names are skipped, like
/// `iconutil` does.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcnsPackager;

fn icon_type_for(points: u32, scale: u32) -> Option<IconType> {
    let icon_type = match (points, scale) {
        (16, 1) => IconType::RGBA32_16x16,
        (16, 2) => IconType::RGBA32_16x16_2x,
        (32, 1) => IconType::RGBA32_32x32,
        (32, 2) => IconType::RGBA32_32x32_2x,
        (64, 1) => IconType::RGBA32_64x64,
        (128, 1) => IconType::RGBA32_128x128,
        (128, 2) => IconType::RGBA32_128x128_2x,
        (256, 1) => IconType::RGBA32_256x256,
        (256, 2) => IconType::RGBA32_256x256_2x,
        (512, 1) => IconType::RGBA32_512x512,
        (512, 2) => IconType::RGBA32_512x512_2x,
        _ => return None,
    };
    Some(icon_type)
}

impl Packager for IcnsPackager {
    fn name(&self) -> &str {
        "icns"
    }

    fn pack(&self, iconset_dir: &Path, output: &Path) -> Result<()> {
        let mut names = Vec::new();
        for entry in fs::read_dir(iconset_dir)
            .with_context(|| format!("reading iconset '{}'", iconset_dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            names.push(name);
        }
        // read_dir order is filesystem dependent; sort for reproducible output.
        names.sort();

        let mut family = IconFamily::new();
        for name in names {
            let Some(icon_type) =
                parse_iconset_name(&name).and_then(|(points, scale)| icon_type_for(points, scale))
            else {
                log::warn!("skipping '{}': not a recognised iconset entry", name);
                continue;
            };

            let path = iconset_dir.join(&name);
            let file =
                File::open(&path).with_context(|| format!("opening '{}'", path.display()))?;
            let image = Image::read_png(BufReader::new(file))
                .with_context(|| format!("decoding '{}'", path.display()))?;
            family
                .add_icon_with_type(&image, icon_type)
                .with_context(|| format!("adding '{}' as {:?}", name, icon_type))?;
        }

        let file = File::create(output)
            .with_context(|| format!("creating '{}'", output.display()))?;
        let mut writer = BufWriter::new(file);
        family
            .write(&mut writer)
            .with_context(|| format!("writing '{}'", output.display()))?;
        writer
            .flush()
            .with_context(|| format!("flushing '{}'", output.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{render_vector, Template};
    use image::RgbaImage;
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbaImage::from_pixel(width, height, image::Rgba([74, 144, 226, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn resvg_renders_requested_square() {
        let temp = TempDir::new().unwrap();
        let svg = temp.path().join("icon.svg");
        render_vector(Template::MenuBar).write_to(&svg).unwrap();

        let png = ResvgRasterizer.rasterize(&svg, 64, temp.path()).unwrap();

        assert_eq!(image::image_dimensions(&png).unwrap(), (64, 64));
    }

    #[test]
    fn resvg_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let svg = temp.path().join("broken.svg");
        fs::write(&svg, "not an svg").unwrap();

        assert!(ResvgRasterizer.rasterize(&svg, 16, temp.path()).is_err());
    }

    #[test]
    fn resize_hits_exact_dimensions() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in.png");
        let output = temp.path().join("out.png");
        write_png(&input, 10, 7);

        ImageResizer.resize(&input, 16, 16, &output).unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (16, 16));
    }

    #[test]
    fn icon_types_cover_macos_table() {
        for entry in crate::sizes::SizeSpec::macos().entries() {
            let (points, scale) = parse_iconset_name(&entry.file_name).unwrap();
            assert!(icon_type_for(points, scale).is_some(), "{}", entry.file_name);
        }
    }

    #[test]
    fn pack_types_entries_by_name() {
        let temp = TempDir::new().unwrap();
        let iconset = temp.path().join("AppIcon.iconset");
        fs::create_dir_all(&iconset).unwrap();
        write_png(&iconset.join("icon_16x16.png"), 16, 16);
        write_png(&iconset.join("icon_16x16@2x.png"), 32, 32);
        write_png(&iconset.join("icon_32x32.png"), 32, 32);
        fs::write(iconset.join("notes.txt"), "ignored").unwrap();
        let output = temp.path().join("AppIcon.icns");

        IcnsPackager.pack(&iconset, &output).unwrap();

        let family = IconFamily::read(BufReader::new(File::open(&output).unwrap())).unwrap();
        let available = family.available_icons();
        assert_eq!(available.len(), 3);
        assert!(available.contains(&IconType::RGBA32_16x16));
        assert!(available.contains(&IconType::RGBA32_16x16_2x));
        assert!(available.contains(&IconType::RGBA32_32x32));
    }

    #[test]
    fn pack_empty_iconset_yields_empty_family() {
        let temp = TempDir::new().unwrap();
        let iconset = temp.path().join("Empty.iconset");
        fs::create_dir_all(&iconset).unwrap();
        let output = temp.path().join("Empty.icns");

        IcnsPackager.pack(&iconset, &output).unwrap();

        let family = IconFamily::read(BufReader::new(File::open(&output).unwrap())).unwrap();
        assert!(family.elements.is_empty());
    }
}
