use anyhow::{Context, Result, anyhow};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use ttf_parser::Face;
use ttf_parser::name_id;
use usvg::fontdb;

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextExtent {
    pub width: u32,
    pub height: u32,
}

/// A font bound to one pixel size. Handles are immutable; a different size
/// means a different handle.
pub trait TextMeasure {
    fn size(&self) -> u32;

    /// Pixel box of `text` rendered on a single line.
    fn measure(&self, text: &str) -> TextExtent;

    /// Distance from the top of a line box to its baseline.
    fn ascent(&self) -> u32;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontUnavailable {
    pub family: String,
    pub size: u32,
    pub reason: String,
}

impl fmt::Display for FontUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "font '{}' unavailable at {}px: {}",
            self.family, self.size, self.reason
        )
    }
}

impl std::error::Error for FontUnavailable {}

pub trait FontLoader {
    type Handle: TextMeasure;

    fn load(&self, size: u32) -> Result<Self::Handle, FontUnavailable>;

    /// Built-in default font used when `load` fails.
    fn fallback(&self) -> Option<Self::Handle> {
        None
    }
}

impl<L: FontLoader + ?Sized> FontLoader for &L {
    type Handle = L::Handle;

    fn load(&self, size: u32) -> Result<Self::Handle, FontUnavailable> {
        (**self).load(size)
    }

    fn fallback(&self) -> Option<Self::Handle> {
        (**self).fallback()
    }
}

#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    ascender: i16,
    descender: i16,
    family: Option<String>,
    face_index: u32,
}

impl fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontMetrics")
            .field("family", &self.family)
            .field("face_index", &self.face_index)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn advance_units(&self, text: &str) -> Option<u32> {
        let face = Face::parse(&self.data, self.face_index).ok()?;
        let mut advance = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            if ch == ' ' {
                advance = advance.saturating_add(self.space_advance as u32);
                continue;
            }
            let glyph_advance = face
                .glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .unwrap_or(self.space_advance);
            advance = advance.saturating_add(glyph_advance as u32);
        }
        Some(advance)
    }

    fn line_units(&self) -> u32 {
        let span = i32::from(self.ascender) - i32::from(self.descender);
        u32::try_from(span)
            .ok()
            .filter(|units| *units > 0)
            .unwrap_or(self.units_per_em as u32)
    }
}

/// A parsed font face at a fixed pixel size.
#[derive(Debug, Clone)]
pub struct ScaledFont {
    metrics: FontMetrics,
    size: u32,
}

impl ScaledFont {
    pub fn new(metrics: FontMetrics, size: u32) -> Self {
        Self { metrics, size }
    }

    fn scale(&self, units: u32) -> u32 {
        scale_units(units, self.size, self.metrics.units_per_em)
    }
}

impl TextMeasure for ScaledFont {
    fn size(&self) -> u32 {
        self.size
    }

    fn measure(&self, text: &str) -> TextExtent {
        let width = match self.metrics.advance_units(text) {
            Some(units) => self.scale(units),
            None => estimate_width_px(text, self.size),
        };
        TextExtent {
            width,
            height: self.scale(self.metrics.line_units()),
        }
    }

    fn ascent(&self) -> u32 {
        let ascender = u32::try_from(self.metrics.ascender).unwrap_or(0);
        self.scale(ascender)
    }
}

/// Width table approximation used when no real font face can be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinFont {
    size: u32,
}

impl BuiltinFont {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }
}

impl TextMeasure for BuiltinFont {
    fn size(&self) -> u32 {
        self.size
    }

    fn measure(&self, text: &str) -> TextExtent {
        estimate_extent(text, self.size)
    }

    fn ascent(&self) -> u32 {
        ceil_div(u64::from(self.size) * 80, 100)
    }
}

#[derive(Debug, Clone)]
pub enum FontHandle {
    Face(ScaledFont),
    Builtin(BuiltinFont),
}

impl TextMeasure for FontHandle {
    fn size(&self) -> u32 {
        match self {
            FontHandle::Face(font) => font.size(),
            FontHandle::Builtin(font) => font.size(),
        }
    }

    fn measure(&self, text: &str) -> TextExtent {
        match self {
            FontHandle::Face(font) => font.measure(text),
            FontHandle::Builtin(font) => font.measure(text),
        }
    }

    fn ascent(&self) -> u32 {
        match self {
            FontHandle::Face(font) => font.ascent(),
            FontHandle::Builtin(font) => font.ascent(),
        }
    }
}

/// Loads the overlay font resolved from settings. Without a resolved face
/// every `load` reports `FontUnavailable` and callers drop to the builtin font.
#[derive(Debug, Clone)]
pub struct SystemFontLoader {
    font: Option<FontMetrics>,
    family: String,
    fallback_size: u32,
}

impl SystemFontLoader {
    pub fn new(font: Option<ResolvedOverlayFont>, fallback_size: u32) -> Self {
        match font {
            Some(resolved) => Self {
                font: Some(resolved.metrics),
                family: resolved.family,
                fallback_size,
            },
            None => Self::builtin_only(fallback_size),
        }
    }

    pub fn builtin_only(fallback_size: u32) -> Self {
        Self {
            font: None,
            family: "sans-serif".to_string(),
            fallback_size,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let font_path = settings.overlay_font_path.as_deref().map(Path::new);
        let font_family = settings.overlay_font_family.as_deref();
        match resolve_overlay_font(font_path, font_family, overlay_fallback_fonts()) {
            Ok(resolved) => {
                debug!("resolved overlay font family '{}'", resolved.family);
                Self::new(Some(resolved), settings.fallback_font_size)
            }
            Err(err) => {
                warn!("overlay font unavailable, using builtin metrics: {}", err);
                Self::builtin_only(settings.fallback_font_size)
            }
        }
    }

    /// Family name to request when drawing, if a real face was resolved.
    pub fn family(&self) -> Option<&str> {
        self.font.as_ref().map(|_| self.family.as_str())
    }

    pub fn font_data(&self) -> Option<&[u8]> {
        self.font.as_ref().map(FontMetrics::data)
    }
}

impl FontLoader for SystemFontLoader {
    type Handle = FontHandle;

    fn load(&self, size: u32) -> Result<FontHandle, FontUnavailable> {
        if size == 0 {
            return Err(FontUnavailable {
                family: self.family.clone(),
                size,
                reason: "font size must be positive".to_string(),
            });
        }
        match self.font.as_ref() {
            Some(metrics) => Ok(FontHandle::Face(ScaledFont::new(metrics.clone(), size))),
            None => Err(FontUnavailable {
                family: self.family.clone(),
                size,
                reason: "no font face resolved".to_string(),
            }),
        }
    }

    fn fallback(&self) -> Option<FontHandle> {
        Some(FontHandle::Builtin(BuiltinFont::new(self.fallback_size)))
    }
}

/// Memoizes successful loads per size for the lifetime of one request.
pub struct CachedFontLoader<L: FontLoader> {
    inner: L,
    cache: RefCell<HashMap<u32, L::Handle>>,
}

impl<L> CachedFontLoader<L>
where
    L: FontLoader,
    L::Handle: Clone,
{
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn cached_sizes(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<L> FontLoader for CachedFontLoader<L>
where
    L: FontLoader,
    L::Handle: Clone,
{
    type Handle = L::Handle;

    fn load(&self, size: u32) -> Result<L::Handle, FontUnavailable> {
        if let Some(handle) = self.cache.borrow().get(&size) {
            return Ok(handle.clone());
        }
        let handle = self.inner.load(size)?;
        self.cache.borrow_mut().insert(size, handle.clone());
        Ok(handle)
    }

    fn fallback(&self) -> Option<L::Handle> {
        self.inner.fallback()
    }
}

pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(&data, None)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

pub struct ResolvedOverlayFont {
    pub metrics: FontMetrics,
    pub family: String,
}

pub fn resolve_overlay_font(
    font_path: Option<&Path>,
    font_family: Option<&str>,
    fallback: &[&str],
) -> Result<ResolvedOverlayFont> {
    if let Some(path) = font_path {
        let metrics = load_font_metrics(path)?;
        let family = metrics
            .family()
            .map(|name| name.to_string())
            .or_else(|| font_family.map(|name| name.to_string()))
            .unwrap_or_else(|| "sans-serif".to_string());
        return Ok(ResolvedOverlayFont { metrics, family });
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    if let Some(family) = font_family {
        match load_font_metrics_from_family(&db, family) {
            Ok(resolved) => return Ok(resolved),
            Err(err) => warn!("configured font family '{}' not usable: {}", family, err),
        }
    }

    for candidate in fallback {
        if let Ok(resolved) = load_font_metrics_from_family(&db, candidate) {
            return Ok(resolved);
        }
    }

    Err(anyhow!("no fallback fonts found"))
}

#[cfg(target_os = "macos")]
pub fn overlay_fallback_fonts() -> &'static [&'static str] {
    &["Arial", "Helvetica", "sans-serif"]
}

#[cfg(target_os = "windows")]
pub fn overlay_fallback_fonts() -> &'static [&'static str] {
    &["Arial", "Segoe UI", "sans-serif"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn overlay_fallback_fonts() -> &'static [&'static str] {
    &["DejaVu Sans", "Liberation Sans", "sans-serif"]
}

fn load_font_metrics_from_data(data: &[u8], preferred_family: Option<&str>) -> Result<FontMetrics> {
    let shared = Arc::new(data.to_vec());
    let mut fallback = None;
    let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);
    for index in 0..count {
        let Ok(face) = Face::parse(data, index) else {
            continue;
        };
        let family = extract_family_name(&face);
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        let metrics = FontMetrics {
            data: shared.clone(),
            units_per_em,
            space_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            family: family.clone(),
            face_index: index,
        };
        if let (Some(preferred), Some(found)) = (preferred_family, &family) {
            if found.eq_ignore_ascii_case(preferred) {
                return Ok(metrics);
            }
        }
        if fallback.is_none() {
            fallback = Some(metrics);
        }
    }
    fallback.ok_or_else(|| anyhow!("failed to parse font data"))
}

fn load_font_metrics_from_family(
    db: &fontdb::Database,
    family: &str,
) -> Result<ResolvedOverlayFont> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let data = db
        .with_face_data(id, |data, _index| data.to_vec())
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    let metrics = load_font_metrics_from_data(&data, Some(family))?;
    let resolved_family = metrics
        .family()
        .map(|name| name.to_string())
        .unwrap_or_else(|| family.to_string());
    Ok(ResolvedOverlayFont {
        metrics,
        family: resolved_family,
    })
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

// Widths in hundredths of an em.
fn estimate_char_units(ch: char) -> u64 {
    if ch.is_whitespace() {
        25
    } else if ch.is_ascii_alphanumeric() {
        55
    } else if ch.is_ascii() {
        35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF | 0xAC00..=0xD7AF
    ) {
        100
    } else {
        90
    }
}

fn estimate_width_px(text: &str, size: u32) -> u32 {
    let units: u64 = text
        .chars()
        .filter(|ch| *ch != '\n')
        .map(estimate_char_units)
        .sum();
    ceil_div(units * u64::from(size), 100)
}

/// Extent of `text` under the builtin width table.
pub fn estimate_extent(text: &str, size: u32) -> TextExtent {
    TextExtent {
        width: estimate_width_px(text, size),
        height: ceil_div(u64::from(size) * 120, 100),
    }
}

fn scale_units(units: u32, size: u32, units_per_em: u16) -> u32 {
    ceil_div(
        u64::from(units) * u64::from(size),
        u64::from(units_per_em.max(1)),
    )
}

fn ceil_div(value: u64, divisor: u64) -> u32 {
    let divisor = divisor.max(1);
    u32::try_from(value.div_ceil(divisor)).unwrap_or(u32::MAX)
}
