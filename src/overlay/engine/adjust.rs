use tracing::{debug, warn};

use super::fit::{FitConfig, FitResult, layout_block};
use crate::overlay::font::FontLoader;
use crate::overlay::geom::{CanvasBounds, Rect, saturate};

/// Grows `rect` so an overflowing block at minimum size has room, without
/// leaving the canvas. Whatever still does not fit is cut by the placer.
pub fn grow_to_fit<L: FontLoader>(
    text: &str,
    rect: Rect,
    overflow: FitResult,
    bounds: CanvasBounds,
    loader: &L,
    config: &FitConfig,
) -> (Rect, FitResult) {
    let room_w = (bounds.width_i64() - i64::from(rect.x)).max(0);
    let room_h = (bounds.height_i64() - i64::from(rect.y)).max(0);

    let new_width = saturate(
        i64::from(rect.width)
            .max(i64::from(overflow.block_width))
            .min(room_w),
    );
    let mut result = overflow;
    if new_width != rect.width {
        match loader.load(result.font_size) {
            Ok(font) => {
                let width = u32::try_from(new_width).unwrap_or(0);
                result = layout_block(text, &font, width, config.line_spacing);
            }
            Err(err) => warn!("{}; keeping previous wrap", err),
        }
    }

    let new_height = saturate(
        i64::from(rect.height)
            .max(i64::from(result.block_height))
            .min(room_h),
    );
    let grown = Rect::new(rect.x, rect.y, new_width, new_height);
    debug!(
        "grew box {}x{} to {}x{} for block {}x{}",
        rect.width, rect.height, grown.width, grown.height, result.block_width, result.block_height
    );
    (grown, result)
}
