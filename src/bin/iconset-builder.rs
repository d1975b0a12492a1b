use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use iconset_builder::config::load_config;
use iconset_builder::{render_vector, BuilderConfig, IconsetBuilder, Template};

const APP_SVG_FILENAME: &str = "AppIcon.svg";
const APP_PNG_FILENAME: &str = "AppIcon.png";
const MENU_BAR_SVG_FILENAME: &str = "MenuBarIcon.svg";
const CLASSIC_MENU_BAR_SVG: &str = "menu_bar_icon.svg";
const CLASSIC_BUNDLE_NAME: &str = "ClipboardManager";
const DEFAULT_RESOURCES_DIR: &str = "Resources";
const PREVIEW_SIZE: u32 = 512;

fn usage() -> &'static str {
    "Usage:\n  iconset-builder [icns] [--config <iconset.toml>]\n  iconset-builder iconset\n  iconset-builder svg [<dir>]\n\nSet RUST_LOG=info (or debug) for tool selection and command lines."
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [] => build_icns(None),
        [icns] if icns == "icns" => build_icns(None),
        [icns, flag, path] if icns == "icns" && flag == "--config" => {
            build_icns(Some(Path::new(path)))
        }
        [flag, path] if flag == "--config" => build_icns(Some(Path::new(path))),
        [iconset] if iconset == "iconset" => build_classic_iconset(),
        [svg] if svg == "svg" => export_svg(Path::new(DEFAULT_RESOURCES_DIR)),
        [svg, dir] if svg == "svg" => export_svg(Path::new(dir)),
        [help] if help == "help" || help == "--help" || help == "-h" => {
            println!("{}", usage());
            Ok(())
        }
        _ => bail!(usage()),
    }
}

/// Full pipeline for the application icon.
fn build_icns(config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => BuilderConfig::default(),
    };

    println!("Creating ICNS file {}...", config.output.display());
    run(config)?;
    println!("\nICNS creation complete.");
    Ok(())
}

/// Classic palette bundle in the working directory plus its menu bar glyph.
fn build_classic_iconset() -> Result<()> {
    let config = BuilderConfig {
        bundle_name: CLASSIC_BUNDLE_NAME.to_string(),
        output: PathBuf::from(format!("{CLASSIC_BUNDLE_NAME}.icns")),
        template: Template::AppIconClassic,
        ..Default::default()
    };

    // The menu bar source does not depend on packaging, so write it first.
    render_vector(Template::MenuBarClassic).write_to(Path::new(CLASSIC_MENU_BAR_SVG))?;
    println!("Created {}", CLASSIC_MENU_BAR_SVG);

    let output = config.output.clone();
    run(config)?;

    println!("\nFiles created:");
    println!("  {} (for app bundle)", output.display());
    println!("  {} (for menu bar)", CLASSIC_MENU_BAR_SVG);
    Ok(())
}

/// Write the SVG sources and try a PNG preview of the app icon.
fn export_svg(dir: &Path) -> Result<()> {
    let app_svg = dir.join(APP_SVG_FILENAME);
    let app = render_vector(Template::AppIcon);
    app.write_to(&app_svg)?;
    println!("App icon SVG created: {}", app_svg.display());

    let menu_svg = dir.join(MENU_BAR_SVG_FILENAME);
    render_vector(Template::MenuBar).write_to(&menu_svg)?;
    println!("Menu bar icon created: {}", menu_svg.display());

    let preview = dir.join(APP_PNG_FILENAME);
    let builder = IconsetBuilder::from_config(BuilderConfig::default());
    match builder.export_png(&app, PREVIEW_SIZE, &preview) {
        Ok(()) => println!("PNG preview created: {}", preview.display()),
        Err(e) => println!("Could not create PNG preview: {:#}", e),
    }
    Ok(())
}

fn run(config: BuilderConfig) -> Result<()> {
    let builder = IconsetBuilder::from_config(config);

    let report = builder
        .run()
        .with_context(|| format!("building '{}'", builder.config().output.display()))?;

    if !report.raster_set.is_complete() {
        println!(
            "Warning: {} of {} sizes could not be rendered:",
            report.raster_set.failures().len(),
            report.requested
        );
        for failure in report.raster_set.failures() {
            println!("  {} ({}px)", failure.file_name, failure.dimension);
        }
    }
    if let Some(path) = &report.checksum_file {
        println!("  Wrote: {}", path.display());
    }
    Ok(())
}
