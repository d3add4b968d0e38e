use serde::Serialize;

use super::fit::FitResult;
use crate::overlay::geom::{CanvasBounds, Rect, saturate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedLine {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

/// Centers the block inside `rect`, one origin per line (top-left of the
/// line box). Lines that would cross the bottom of `rect` or of the canvas
/// are dropped together with every line after them.
pub fn place_lines(
    fit: &FitResult,
    rect: Rect,
    bounds: CanvasBounds,
    line_spacing: u32,
) -> Vec<PlacedLine> {
    let rect_w = i64::from(rect.width);
    let rect_h = i64::from(rect.height);
    let limit = rect.bottom().min(bounds.height_i64());

    let mut y = i64::from(rect.y) + ((rect_h - i64::from(fit.block_height)).max(0) / 2);
    let mut placed = Vec::with_capacity(fit.lines.len());
    for line in &fit.lines {
        let line_h = i64::from(line.height);
        if y + line_h > limit {
            break;
        }
        let x = i64::from(rect.x) + ((rect_w - i64::from(line.width)).max(0) / 2);
        placed.push(PlacedLine {
            x: saturate(x),
            y: saturate(y),
            text: line.text.clone(),
        });
        y += line_h + i64::from(line_spacing);
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::engine::fit::layout_block;
    use crate::overlay::engine::testing::MonoFont;

    #[test]
    fn single_line_is_centered_both_ways() {
        let fit = layout_block("Open 24 Hours", &MonoFont::new(14), 100, 2);
        let placed = place_lines(&fit, Rect::new(10, 10, 100, 30), CanvasBounds::new(200, 200), 2);
        assert_eq!(
            placed,
            vec![PlacedLine {
                x: 14,
                y: 18,
                text: "Open 24 Hours".to_string()
            }]
        );
    }

    #[test]
    fn each_line_is_centered_on_the_box_midline() {
        let font = MonoFont::new(10);
        let fit = layout_block("a bb ccc dddd eeeee ffffff", &font, 40, 2);
        let rect = Rect::new(7, 3, 40, 200);
        let placed = place_lines(&fit, rect, CanvasBounds::new(400, 400), 2);
        assert_eq!(placed.len(), fit.lines.len());
        for (placed, line) in placed.iter().zip(&fit.lines) {
            let center = placed.x as f32 + line.width as f32 / 2.0;
            let expected = rect.x as f32 + rect.width as f32 / 2.0;
            assert!((center - expected).abs() <= 1.0, "{:?}", placed);
        }
    }

    #[test]
    fn lines_advance_by_height_plus_spacing() {
        let fit = layout_block("one two three", &MonoFont::new(10), 10, 3);
        let placed = place_lines(&fit, Rect::new(0, 0, 20, 36), CanvasBounds::new(50, 50), 3);
        let ys: Vec<i32> = placed.iter().map(|line| line.y).collect();
        assert_eq!(ys, vec![0, 13, 26]);
    }

    #[test]
    fn taller_block_starts_at_box_top_and_is_truncated() {
        let fit = layout_block("one two three four", &MonoFont::new(10), 10, 2);
        assert_eq!(fit.block_height, 46);
        let placed = place_lines(&fit, Rect::new(5, 5, 30, 25), CanvasBounds::new(100, 100), 2);
        let texts: Vec<&str> = placed.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert_eq!(placed[0].y, 5);
    }

    #[test]
    fn canvas_bottom_also_truncates() {
        let fit = layout_block("one two", &MonoFont::new(10), 10, 2);
        let placed = place_lines(&fit, Rect::new(0, 0, 30, 22), CanvasBounds::new(30, 15), 2);
        assert_eq!(placed.len(), 1);
    }

    #[test]
    fn wide_line_is_pinned_to_left_edge() {
        let fit = layout_block("enormous", &MonoFont::new(10), 10, 2);
        let placed = place_lines(&fit, Rect::new(12, 0, 10, 20), CanvasBounds::new(100, 100), 2);
        assert_eq!(placed[0].x, 12);
    }
}
