use serde::{Deserialize, Serialize};
use tracing::debug;

use super::engine::{FitConfig, FitOutcome, fit_text, grow_to_fit, initial_font_size, place_lines};
use super::font::FontLoader;
use super::geom::{CanvasBounds, Rect};
use super::render::{Canvas, OverlayStyle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub rect: Rect,
    pub text: String,
}

impl Region {
    pub fn new(rect: Rect, text: impl Into<String>) -> Self {
        Self {
            rect,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutConfig {
    pub fit: FitConfig,
    pub cover_padding: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            fit: FitConfig::default(),
            cover_padding: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FontSpec {
    pub size: u32,
    pub ascent: u32,
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawText {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub font: FontSpec,
}

/// Everything needed to paint one region: the cover first, then the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayCommands {
    pub cover: Rect,
    pub content: Rect,
    pub text: Vec<DrawText>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    EmptyText,
    /// No positive area left after clamping, including boxes off the canvas.
    Degenerate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionLayout {
    Overlay(OverlayCommands),
    Skipped(SkipReason),
}

pub fn layout_region<L: FontLoader>(
    region: &Region,
    bounds: CanvasBounds,
    loader: &L,
    config: &LayoutConfig,
) -> RegionLayout {
    if region.text.trim().is_empty() {
        return RegionLayout::Skipped(SkipReason::EmptyText);
    }
    let Some(rect) = region.rect.clamp_to(bounds) else {
        return RegionLayout::Skipped(SkipReason::Degenerate);
    };

    let width = rect.width_u32();
    let height = rect.height_u32();
    let initial_size = initial_font_size(height, &config.fit);
    let outcome = fit_text(&region.text, width, height, initial_size, loader, &config.fit);
    let (content, fit) = match outcome {
        FitOutcome::Fits(result) => (rect, result),
        FitOutcome::Degraded(result) if result.fits(width, height) => (rect, result),
        FitOutcome::Overflow(result) | FitOutcome::Degraded(result) => {
            grow_to_fit(&region.text, rect, result, bounds, loader, &config.fit)
        }
    };

    let font = FontSpec {
        size: fit.font_size,
        ascent: fit.ascent,
        fallback: fit.fallback,
    };
    let text = place_lines(&fit, content, bounds, config.fit.line_spacing)
        .into_iter()
        .map(|line| DrawText {
            x: line.x,
            y: line.y,
            text: line.text,
            font,
        })
        .collect();

    RegionLayout::Overlay(OverlayCommands {
        cover: content.pad(config.cover_padding, bounds),
        content,
        text,
    })
}

/// Lays out every region in input order, dropping the ones that are skipped.
pub fn layout_regions<L: FontLoader>(
    regions: &[Region],
    bounds: CanvasBounds,
    loader: &L,
    config: &LayoutConfig,
) -> Vec<OverlayCommands> {
    let mut commands = Vec::with_capacity(regions.len());
    for (idx, region) in regions.iter().enumerate() {
        match layout_region(region, bounds, loader, config) {
            RegionLayout::Overlay(overlay) => commands.push(overlay),
            RegionLayout::Skipped(reason) => {
                debug!("skipping region {}: {:?}", idx, reason);
            }
        }
    }
    commands
}

pub fn apply_overlay<C: Canvas>(canvas: &mut C, commands: &[OverlayCommands], style: &OverlayStyle) {
    for overlay in commands {
        canvas.fill_rectangle(overlay.cover, &style.fill_color);
        for line in &overlay.text {
            canvas.draw_text(line.x, line.y, &line.text, &line.font, &style.text_color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::engine::testing::MonoLoader;

    fn config() -> LayoutConfig {
        LayoutConfig {
            fit: FitConfig {
                min_size: 8,
                max_size: 96,
                step: 2,
                line_spacing: 2,
                fallback_size: 14,
            },
            cover_padding: 2,
        }
    }

    fn overlay(layout: RegionLayout) -> OverlayCommands {
        match layout {
            RegionLayout::Overlay(commands) => commands,
            RegionLayout::Skipped(reason) => panic!("region skipped: {:?}", reason),
        }
    }

    #[test]
    fn empty_text_is_skipped() {
        let loader = MonoLoader::new();
        let bounds = CanvasBounds::new(100, 100);
        for text in ["", "   ", "\n\t"] {
            let region = Region::new(Rect::new(0, 0, 50, 50), text);
            assert_eq!(
                layout_region(&region, bounds, &loader, &config()),
                RegionLayout::Skipped(SkipReason::EmptyText)
            );
        }
        assert!(loader.requested().is_empty());
    }

    #[test]
    fn off_canvas_and_flat_regions_are_skipped() {
        let loader = MonoLoader::new();
        let bounds = CanvasBounds::new(100, 100);
        for rect in [
            Rect::new(100, 0, 10, 10),
            Rect::new(0, -20, 10, 10),
            Rect::new(10, 10, 0, 10),
            Rect::new(10, 10, 10, -1),
        ] {
            let region = Region::new(rect, "text");
            assert_eq!(
                layout_region(&region, bounds, &loader, &config()),
                RegionLayout::Skipped(SkipReason::Degenerate)
            );
        }
    }

    #[test]
    fn partially_outside_region_is_clamped_and_drawn() {
        let loader = MonoLoader::new();
        let region = Region::new(Rect::new(-5, 0, 10, 10), "i");
        let commands = overlay(layout_region(
            &region,
            CanvasBounds::new(100, 100),
            &loader,
            &config(),
        ));
        assert_eq!(commands.content, Rect::new(0, 0, 5, 10));
        assert_eq!(commands.cover, Rect::new(0, 0, 7, 12));
    }

    #[test]
    fn fitting_text_is_centered_under_padded_cover() {
        let loader = MonoLoader::new();
        let region = Region::new(Rect::new(10, 10, 100, 30), "Open 24 Hours");
        let commands = overlay(layout_region(
            &region,
            CanvasBounds::new(200, 200),
            &loader,
            &config(),
        ));
        assert_eq!(commands.content, Rect::new(10, 10, 100, 30));
        assert_eq!(commands.cover, Rect::new(8, 8, 104, 34));
        assert_eq!(commands.text.len(), 1);
        let line = &commands.text[0];
        assert_eq!(line.font.size, 14);
        assert_eq!((line.x, line.y), (14, 18));
        assert!(!line.font.fallback);
    }

    #[test]
    fn overflowing_text_grows_box_and_truncates_at_canvas() {
        let loader = MonoLoader::new();
        let region = Region::new(
            Rect::new(0, 0, 40, 20),
            "A very long sentence that cannot possibly fit",
        );
        let commands = overlay(layout_region(
            &region,
            CanvasBounds::new(200, 30),
            &loader,
            &config(),
        ));
        assert_eq!(commands.content, Rect::new(0, 0, 40, 30));
        let texts: Vec<&str> = commands.text.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["A very", "long", "sentence"]);
        assert!(commands.text.iter().all(|line| line.y + 8 <= 30));
    }

    #[test]
    fn degraded_font_still_draws_the_text() {
        let loader = MonoLoader::failing();
        let region = Region::new(Rect::new(0, 0, 100, 40), "hello there");
        let commands = overlay(layout_region(
            &region,
            CanvasBounds::new(100, 100),
            &loader,
            &config(),
        ));
        assert_eq!(commands.text.len(), 1);
        assert!(commands.text[0].font.fallback);
        assert_eq!(commands.text[0].text, "hello there");
    }

    #[test]
    fn layout_is_idempotent() {
        let region = Region::new(Rect::new(3, 4, 55, 21), "the same words every single time");
        let bounds = CanvasBounds::new(80, 60);
        let first = layout_region(&region, bounds, &MonoLoader::new(), &config());
        let second = layout_region(&region, bounds, &MonoLoader::new(), &config());
        assert_eq!(first, second);
    }

    #[test]
    fn regions_keep_input_order_and_drop_skips() {
        let loader = MonoLoader::new();
        let regions = vec![
            Region::new(Rect::new(0, 0, 60, 20), "first"),
            Region::new(Rect::new(10, 10, 60, 20), ""),
            Region::new(Rect::new(500, 500, 60, 20), "gone"),
            Region::new(Rect::new(5, 5, 60, 20), "second"),
        ];
        let commands = layout_regions(&regions, CanvasBounds::new(100, 100), &loader, &config());
        let texts: Vec<&str> = commands
            .iter()
            .flat_map(|overlay| overlay.text.iter().map(|line| line.text.as_str()))
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[derive(Default)]
    struct RecordingCanvas {
        ops: Vec<String>,
    }

    impl Canvas for RecordingCanvas {
        fn bounds(&self) -> CanvasBounds {
            CanvasBounds::new(100, 100)
        }

        fn fill_rectangle(&mut self, rect: Rect, color: &str) {
            self.ops.push(format!(
                "fill {} {} {} {} {}",
                rect.x, rect.y, rect.width, rect.height, color
            ));
        }

        fn draw_text(&mut self, x: i32, y: i32, text: &str, font: &FontSpec, color: &str) {
            self.ops
                .push(format!("text {} {} {} {} {}", x, y, font.size, text, color));
        }
    }

    #[test]
    fn apply_paints_cover_before_each_region_text() {
        let loader = MonoLoader::new();
        let regions = vec![
            Region::new(Rect::new(0, 0, 40, 10), "ab"),
            Region::new(Rect::new(0, 20, 40, 10), "cd"),
        ];
        let commands = layout_regions(&regions, CanvasBounds::new(100, 100), &loader, &config());
        let style = OverlayStyle {
            text_color: "#000000".to_string(),
            fill_color: "#ffffff".to_string(),
        };
        let mut canvas = RecordingCanvas::default();
        apply_overlay(&mut canvas, &commands, &style);
        assert_eq!(
            canvas.ops,
            vec![
                "fill 0 0 42 12 #ffffff",
                "text 15 0 10 ab #000000",
                "fill 0 18 42 14 #ffffff",
                "text 15 20 10 cd #000000",
            ]
        );
    }
}
