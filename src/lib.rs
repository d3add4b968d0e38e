use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod logging;
pub mod overlay;
pub mod regions;
pub mod server;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use overlay::{
    CanvasBounds, FitConfig, FitOutcome, FitResult, LayoutConfig, OverlayCommands, OverlayStyle,
    Rect, Region, RegionLayout, SystemFontLoader, decode_source, layout_region, render_overlay,
};
pub use regions::{OcrResultItem, parse_regions, regions_from_items};
pub use server::run_server;

pub const DEFAULT_OUTPUT: &str = "overlay.png";

#[derive(Debug, Clone)]
pub struct Config {
    pub image: PathBuf,
    pub regions: PathBuf,
    pub output: Option<PathBuf>,
    pub settings_path: Option<String>,
}

/// Renders the overlay for a local image and regions file, returning the
/// path the PNG was written to.
pub fn run(config: Config) -> Result<PathBuf> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let image_bytes = std::fs::read(&config.image)
        .with_context(|| format!("failed to read image {}", config.image.display()))?;
    let regions_json = std::fs::read_to_string(&config.regions)
        .with_context(|| format!("failed to read regions {}", config.regions.display()))?;
    let regions = parse_regions(&regions_json)?;

    let source = decode_source(&image_bytes)?;
    let fonts = SystemFontLoader::from_settings(&settings);
    let png = render_overlay(
        &source,
        &regions,
        &settings.layout_config(),
        &settings.overlay_style(),
        &fonts,
    )?;

    let output = config
        .output
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    std::fs::write(&output, &png)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        "wrote {} region(s) to {} ({} bytes)",
        regions.len(),
        output.display(),
        png.len()
    );
    Ok(output)
}
