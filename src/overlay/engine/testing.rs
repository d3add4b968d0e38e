use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::overlay::font::{FontLoader, FontUnavailable, TextExtent, TextMeasure};

/// Fixed-pitch metrics: every character is half the font size wide and a
/// line is exactly the font size tall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MonoFont {
    size: u32,
}

impl MonoFont {
    pub(crate) fn new(size: u32) -> Self {
        Self { size }
    }
}

impl TextMeasure for MonoFont {
    fn size(&self) -> u32 {
        self.size
    }

    fn measure(&self, text: &str) -> TextExtent {
        let chars = text.chars().count() as u32;
        TextExtent {
            width: chars * self.size / 2,
            height: self.size,
        }
    }

    fn ascent(&self) -> u32 {
        self.size * 3 / 4
    }
}

#[derive(Debug, Default)]
pub(crate) struct MonoLoader {
    pub(crate) unavailable: BTreeSet<u32>,
    pub(crate) without_fallback: bool,
    pub(crate) requested: RefCell<Vec<u32>>,
}

impl MonoLoader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            unavailable: (0..=512).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn requested(&self) -> Vec<u32> {
        self.requested.borrow().clone()
    }
}

impl FontLoader for MonoLoader {
    type Handle = MonoFont;

    fn load(&self, size: u32) -> Result<MonoFont, FontUnavailable> {
        self.requested.borrow_mut().push(size);
        if self.unavailable.contains(&size) {
            return Err(FontUnavailable {
                family: "mono".to_string(),
                size,
                reason: "disabled in test".to_string(),
            });
        }
        Ok(MonoFont::new(size))
    }

    fn fallback(&self) -> Option<MonoFont> {
        if self.without_fallback {
            None
        } else {
            Some(MonoFont::new(10))
        }
    }
}
