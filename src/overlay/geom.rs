use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasBounds {
    pub width: u32,
    pub height: u32,
}

impl CanvasBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub(crate) fn width_i64(&self) -> i64 {
        i64::from(self.width)
    }

    pub(crate) fn height_i64(&self) -> i64 {
        i64::from(self.height)
    }
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Intersects the rectangle with the canvas. Returns `None` when nothing
    /// with positive area is left, which includes rectangles lying entirely
    /// outside the canvas.
    pub fn clamp_to(&self, bounds: CanvasBounds) -> Option<Rect> {
        let x0 = i64::from(self.x).max(0);
        let y0 = i64::from(self.y).max(0);
        let x1 = self.right().min(bounds.width_i64());
        let y1 = self.bottom().min(bounds.height_i64());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(from_edges(x0, y0, x1, y1))
    }

    /// Grows the rectangle by `margin` on every side without leaving the canvas.
    pub fn pad(&self, margin: u32, bounds: CanvasBounds) -> Rect {
        let margin = i64::from(margin);
        let x0 = (i64::from(self.x) - margin).max(0);
        let y0 = (i64::from(self.y) - margin).max(0);
        let x1 = (self.right() + margin).min(bounds.width_i64()).max(x0);
        let y1 = (self.bottom() + margin).min(bounds.height_i64()).max(y0);
        from_edges(x0, y0, x1, y1)
    }

    pub(crate) fn width_u32(&self) -> u32 {
        u32::try_from(self.width).unwrap_or(0)
    }

    pub(crate) fn height_u32(&self) -> u32 {
        u32::try_from(self.height).unwrap_or(0)
    }
}

fn from_edges(x0: i64, y0: i64, x1: i64, y1: i64) -> Rect {
    Rect {
        x: saturate(x0),
        y: saturate(y0),
        width: saturate(x1 - x0),
        height: saturate(y1 - y0),
    }
}

pub(crate) fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
