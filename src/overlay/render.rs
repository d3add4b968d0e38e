use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use resvg::render;
use std::io::Cursor;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use super::driver::FontSpec;
use super::geom::{CanvasBounds, Rect};

/// Draw surface the overlay commands are replayed onto.
pub trait Canvas {
    fn bounds(&self) -> CanvasBounds;

    fn fill_rectangle(&mut self, rect: Rect, color: &str);

    /// `(x, y)` is the top-left corner of the line box.
    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: &FontSpec, color: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayStyle {
    pub text_color: String,
    pub fill_color: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            text_color: "#000000".to_string(),
            fill_color: "#ffffff".to_string(),
        }
    }
}

/// Canvas that records the source image and every draw call as SVG.
pub struct SvgCanvas {
    bounds: CanvasBounds,
    font_family: Option<String>,
    svg: String,
}

impl SvgCanvas {
    pub fn new(
        image_bytes: &[u8],
        image_mime: &str,
        bounds: CanvasBounds,
        font_family: Option<&str>,
    ) -> Self {
        let encoded = BASE64.encode(image_bytes);
        let data_uri = format!("data:{};base64,{}", image_mime, encoded);

        let mut svg = String::new();
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = bounds.width,
            h = bounds.height
        ));
        svg.push_str(&format!(
            r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
            uri = data_uri,
            w = bounds.width,
            h = bounds.height
        ));
        Self {
            bounds,
            font_family: font_family.map(|family| family.to_string()),
            svg,
        }
    }

    pub fn finish(mut self) -> String {
        self.svg.push_str("</svg>");
        self.svg
    }
}

impl Canvas for SvgCanvas {
    fn bounds(&self) -> CanvasBounds {
        self.bounds
    }

    fn fill_rectangle(&mut self, rect: Rect, color: &str) {
        self.svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}"/>"#,
            x = rect.x,
            y = rect.y,
            w = rect.width,
            h = rect.height,
            fill = escape_xml(color)
        ));
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: &FontSpec, color: &str) {
        let family = match (font.fallback, self.font_family.as_deref()) {
            (false, Some(family)) => family,
            _ => "sans-serif",
        };
        let baseline = i64::from(y) + i64::from(font.ascent);
        self.svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" fill="{color}" font-family="{family}" xml:space="preserve">{text}</text>"#,
            x = x,
            y = baseline,
            size = font.size,
            color = escape_xml(color),
            family = escape_xml(family),
            text = escape_xml(text)
        ));
    }
}

pub fn render_svg_bytes(svg: &str, output_mime: &str, font_data: Option<&[u8]>) -> Result<Vec<u8>> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if let Some(data) = font_data {
        db.load_font_data(data.to_vec());
    }
    let options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let image = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build image buffer from SVG"))?;
    let format = image_format_from_mime(output_mime)
        .ok_or_else(|| anyhow!("unsupported output image mime '{}'", output_mime))?;
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    let output = match format {
        image::ImageFormat::Jpeg | image::ImageFormat::Bmp => {
            image::DynamicImage::ImageRgb8(image::DynamicImage::ImageRgba8(image).to_rgb8())
        }
        _ => image::DynamicImage::ImageRgba8(image),
    };
    output
        .write_to(&mut cursor, format)
        .with_context(|| "failed to encode image from SVG")?;
    Ok(bytes)
}

pub fn image_format_from_mime(mime: &str) -> Option<image::ImageFormat> {
    match mime {
        "image/png" => Some(image::ImageFormat::Png),
        "image/jpeg" => Some(image::ImageFormat::Jpeg),
        "image/jpg" => Some(image::ImageFormat::Jpeg),
        "image/gif" => Some(image::ImageFormat::Gif),
        "image/webp" => Some(image::ImageFormat::WebP),
        "image/bmp" => Some(image::ImageFormat::Bmp),
        "image/tiff" => Some(image::ImageFormat::Tiff),
        _ => None,
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
