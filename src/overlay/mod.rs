mod driver;
mod engine;
mod font;
mod geom;
mod render;

use anyhow::{Context, Result};
use image::GenericImageView;
use std::io::Cursor;
use tracing::debug;

pub use driver::{
    DrawText, FontSpec, LayoutConfig, OverlayCommands, Region, RegionLayout, SkipReason,
    apply_overlay, layout_region, layout_regions,
};
pub use engine::{
    FitConfig, FitOutcome, FitResult, Line, PlacedLine, fit_text, grow_to_fit, initial_font_size,
    place_lines,
};
pub use font::{
    BuiltinFont, CachedFontLoader, FontHandle, FontLoader, FontMetrics, FontUnavailable,
    ResolvedOverlayFont, ScaledFont, SystemFontLoader, TextExtent, TextMeasure, estimate_extent,
    load_font_metrics, overlay_fallback_fonts, resolve_overlay_font,
};
pub use geom::{CanvasBounds, Rect};
pub use render::{Canvas, OverlayStyle, SvgCanvas, image_format_from_mime, render_svg_bytes};

pub const OUTPUT_MIME: &str = "image/png";

/// Formats the SVG rasterizer can embed directly.
const EMBEDDABLE_MIMES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Decoded source image, ready to be embedded in the overlay canvas.
#[derive(Debug, Clone)]
pub struct SourceImage {
    bytes: Vec<u8>,
    mime: &'static str,
    bounds: CanvasBounds,
}

impl SourceImage {
    pub fn bounds(&self) -> CanvasBounds {
        self.bounds
    }

    pub fn mime(&self) -> &str {
        self.mime
    }
}

pub fn decode_source(image_bytes: &[u8]) -> Result<SourceImage> {
    let image = image::load_from_memory(image_bytes).with_context(|| "invalid image data")?;
    let (width, height) = image.dimensions();

    let sniffed = infer::get(image_bytes)
        .map(|kind| kind.mime_type())
        .filter(|mime| EMBEDDABLE_MIMES.contains(mime));
    let (bytes, mime) = match sniffed {
        Some(mime) => (image_bytes.to_vec(), mime),
        None => {
            let mut bytes = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                .with_context(|| "failed to re-encode source image")?;
            (bytes, OUTPUT_MIME)
        }
    };
    Ok(SourceImage {
        bytes,
        mime,
        bounds: CanvasBounds::new(width, height),
    })
}

/// Draws every region onto the image and returns the result as PNG.
pub fn render_overlay(
    source: &SourceImage,
    regions: &[Region],
    config: &LayoutConfig,
    style: &OverlayStyle,
    loader: &SystemFontLoader,
) -> Result<Vec<u8>> {
    let bounds = source.bounds;
    let cached = CachedFontLoader::new(loader);
    let commands = layout_regions(regions, bounds, &cached, config);
    debug!(
        "laid out {} of {} region(s) on {}x{} canvas",
        commands.len(),
        regions.len(),
        bounds.width,
        bounds.height
    );

    let mut canvas = SvgCanvas::new(&source.bytes, source.mime, bounds, loader.family());
    apply_overlay(&mut canvas, &commands, style);
    render_svg_bytes(&canvas.finish(), OUTPUT_MIME, loader.font_data())
}
