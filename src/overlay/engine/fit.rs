use serde::Serialize;
use tracing::{debug, warn};

use super::wrap::wrap_words;
use crate::overlay::font::{FontLoader, TextMeasure, estimate_extent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FitConfig {
    pub min_size: u32,
    pub max_size: u32,
    pub step: u32,
    pub line_spacing: u32,
    /// Size used for the builtin font when no face can be loaded.
    pub fallback_size: u32,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            min_size: 8,
            max_size: 96,
            step: 2,
            line_spacing: 2,
            fallback_size: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub text: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FitResult {
    pub font_size: u32,
    pub ascent: u32,
    pub lines: Vec<Line>,
    pub block_width: u32,
    pub block_height: u32,
    /// Set when the builtin font stands in for the configured one.
    pub fallback: bool,
}

impl FitResult {
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.block_width <= width && self.block_height <= height
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FitOutcome {
    /// Largest size whose wrapped block fits the target.
    Fits(FitResult),
    /// Wrapped block at the minimum size, still larger than the target.
    Overflow(FitResult),
    /// Font loading failed; one unwrapped line in the builtin font.
    Degraded(FitResult),
}

impl FitOutcome {
    pub fn result(&self) -> &FitResult {
        match self {
            FitOutcome::Fits(result) | FitOutcome::Overflow(result) | FitOutcome::Degraded(result) => {
                result
            }
        }
    }

    pub fn into_result(self) -> FitResult {
        match self {
            FitOutcome::Fits(result) | FitOutcome::Overflow(result) | FitOutcome::Degraded(result) => {
                result
            }
        }
    }
}

/// Starting size for a box: its height, kept inside the configured range.
pub fn initial_font_size(rect_height: u32, config: &FitConfig) -> u32 {
    rect_height.min(config.max_size).max(config.min_size)
}

/// Walks font sizes down from `initial_size` by `config.step` and returns the
/// first size whose wrapped block fits `width` x `height`.
///
/// Sizes are only ever tried in decreasing order, so a fit at a larger size
/// always wins over any smaller one.
pub fn fit_text<L: FontLoader>(
    text: &str,
    width: u32,
    height: u32,
    initial_size: u32,
    loader: &L,
    config: &FitConfig,
) -> FitOutcome {
    let min_size = config.min_size;
    let step = config.step.max(1);
    let mut size = initial_size.max(min_size);

    loop {
        let font = match loader.load(size) {
            Ok(font) => font,
            Err(err) => {
                warn!("{}; drawing with builtin font", err);
                return FitOutcome::Degraded(degraded_fit(text, loader, config));
            }
        };
        let result = layout_block(text, &font, width, config.line_spacing);
        if result.fits(width, height) {
            debug!(
                "fit {} line(s) at {}px in {}x{}",
                result.lines.len(),
                size,
                width,
                height
            );
            return FitOutcome::Fits(result);
        }
        if size > min_size {
            size = size.saturating_sub(step).max(min_size);
            continue;
        }
        debug!(
            "block {}x{} overflows {}x{} at minimum size {}px",
            result.block_width, result.block_height, width, height, size
        );
        return FitOutcome::Overflow(result);
    }
}

/// Wraps `text` at `max_width` with an already loaded font and measures the block.
pub(crate) fn layout_block<M: TextMeasure>(
    text: &str,
    font: &M,
    max_width: u32,
    line_spacing: u32,
) -> FitResult {
    let lines: Vec<Line> = wrap_words(text, font, max_width)
        .into_iter()
        .map(|text| {
            let extent = font.measure(&text);
            Line {
                text,
                width: extent.width,
                height: extent.height,
            }
        })
        .collect();
    FitResult {
        font_size: font.size(),
        ascent: font.ascent(),
        block_width: block_width(&lines),
        block_height: block_height(&lines, line_spacing),
        lines,
        fallback: false,
    }
}

fn degraded_fit<L: FontLoader>(text: &str, loader: &L, config: &FitConfig) -> FitResult {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let (font_size, ascent, extent) = match loader.fallback() {
        Some(font) => (font.size(), font.ascent(), font.measure(&joined)),
        None => {
            let size = config.fallback_size.max(1);
            (size, size * 4 / 5, estimate_extent(&joined, size))
        }
    };
    let lines = if joined.is_empty() {
        Vec::new()
    } else {
        vec![Line {
            text: joined,
            width: extent.width,
            height: extent.height,
        }]
    };
    FitResult {
        font_size,
        ascent,
        block_width: block_width(&lines),
        block_height: block_height(&lines, config.line_spacing),
        lines,
        fallback: true,
    }
}

fn block_width(lines: &[Line]) -> u32 {
    lines.iter().map(|line| line.width).max().unwrap_or(0)
}

fn block_height(lines: &[Line], line_spacing: u32) -> u32 {
    let heights = lines
        .iter()
        .fold(0u32, |acc, line| acc.saturating_add(line.height));
    let gaps = (lines.len().saturating_sub(1) as u32).saturating_mul(line_spacing);
    heights.saturating_add(gaps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::engine::testing::{MonoFont, MonoLoader};

    fn config(min_size: u32, step: u32) -> FitConfig {
        FitConfig {
            min_size,
            max_size: 96,
            step,
            line_spacing: 2,
            fallback_size: 14,
        }
    }

    #[test]
    fn initial_size_follows_box_height_within_range() {
        let config = config(8, 2);
        assert_eq!(initial_font_size(30, &config), 30);
        assert_eq!(initial_font_size(4, &config), 8);
        assert_eq!(initial_font_size(400, &config), 96);
    }

    #[test]
    fn block_height_adds_spacing_between_lines_only() {
        let font = MonoFont::new(10);
        let single = layout_block("one", &font, 100, 3);
        assert_eq!(single.block_height, 10);
        let triple = layout_block("one two three", &font, 10, 3);
        assert_eq!(triple.lines.len(), 3);
        assert_eq!(triple.block_height, 10 * 3 + 3 * 2);
        assert_eq!(triple.block_width, 25);
    }

    #[test]
    fn short_label_fits_on_one_line() {
        let loader = MonoLoader::new();
        let outcome = fit_text("Open 24 Hours", 100, 30, 24, &loader, &config(14, 2));
        let FitOutcome::Fits(result) = outcome else {
            panic!("expected a fit, got {:?}", outcome);
        };
        assert!(result.font_size <= 24);
        assert_eq!(result.font_size, 14);
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].text, "Open 24 Hours");
        assert!(result.block_width <= 100);
        assert_eq!(loader.requested(), vec![24, 22, 20, 18, 16, 14]);
    }

    #[test]
    fn keeps_the_first_size_that_fits() {
        let loader = MonoLoader::new();
        let outcome = fit_text("fits", 200, 200, 40, &loader, &config(8, 2));
        assert_eq!(outcome.result().font_size, 40);
        assert_eq!(loader.requested(), vec![40]);
    }

    #[test]
    fn never_prefers_a_smaller_fitting_size() {
        let text = "menu of the day";
        let cfg = config(6, 3);
        for (width, height) in [(60, 20), (90, 40), (30, 60), (120, 12)] {
            let loader = MonoLoader::new();
            let outcome = fit_text(text, width, height, 40, &loader, &cfg);
            if let FitOutcome::Fits(result) = outcome {
                let mut size = 40;
                while size > result.font_size {
                    let larger = layout_block(text, &MonoFont::new(size), width, 2);
                    assert!(!larger.fits(width, height), "{} would fit", size);
                    size -= 3;
                }
            }
        }
    }

    #[test]
    fn shrink_terminates_within_the_step_bound() {
        let text = "this will never fit in such a tiny box whatever we do";
        for (initial, min, step) in [(30, 8, 2), (31, 8, 2), (20, 7, 3), (9, 9, 4), (50, 6, 0)] {
            let loader = MonoLoader::new();
            let outcome = fit_text(text, 5, 5, initial, &loader, &config(min, step));
            let step = step.max(1);
            let bound = (initial - min).div_ceil(step) + 1;
            assert!(matches!(outcome, FitOutcome::Overflow(_)));
            assert_eq!(outcome.result().font_size, min);
            assert!(loader.requested().len() as u32 <= bound);
            assert!(loader.requested().windows(2).all(|pair| pair[0] > pair[1]));
        }
    }

    #[test]
    fn lines_fit_width_except_single_long_words() {
        let loader = MonoLoader::new();
        let outcome = fit_text(
            "tiny supercalifragilistic words",
            60,
            200,
            20,
            &loader,
            &config(8, 2),
        );
        let result = outcome.result();
        for line in &result.lines {
            if line.text.contains(' ') {
                assert!(line.width <= 60);
            }
        }
    }

    #[test]
    fn unavailable_font_degrades_to_single_line() {
        let loader = MonoLoader::failing();
        let outcome = fit_text("  two   words ", 10, 10, 20, &loader, &config(8, 2));
        let FitOutcome::Degraded(result) = outcome else {
            panic!("expected degraded outcome");
        };
        assert!(result.fallback);
        assert_eq!(result.font_size, 10);
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].text, "two words");
        assert_eq!(loader.requested(), vec![20]);
    }

    #[test]
    fn degraded_without_builtin_font_estimates_metrics() {
        let loader = MonoLoader {
            without_fallback: true,
            ..MonoLoader::failing()
        };
        let outcome = fit_text("hello", 100, 100, 20, &loader, &config(8, 2));
        let result = outcome.into_result();
        assert!(result.fallback);
        assert_eq!(result.font_size, 14);
        assert_eq!(result.lines[0].width, estimate_extent("hello", 14).width);
    }

    #[test]
    fn load_failure_mid_search_stops_immediately() {
        let loader = MonoLoader {
            unavailable: [18].into_iter().collect(),
            ..MonoLoader::default()
        };
        let outcome = fit_text("far too long for this box", 20, 10, 22, &loader, &config(8, 2));
        assert!(matches!(outcome, FitOutcome::Degraded(_)));
        assert_eq!(loader.requested(), vec![22, 20, 18]);
    }
}
