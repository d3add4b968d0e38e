use anyhow::{Context, Result};
use serde::Deserialize;

use crate::overlay::{Rect, Region};

/// One OCR result as posted by clients. Field names vary between OCR
/// providers, so several aliases are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OcrResultItem {
    pub translated_text: Option<String>,
    pub text: Option<String>,
    pub bounding_box: Option<BoxSpec>,
    pub bbox: Option<BoxSpec>,
    #[serde(rename = "box")]
    pub box_: Option<BoxSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BoxSpec {
    // Listed before `Object`: derived structs also deserialize from sequences.
    Array(Vec<f64>),
    Object(BoxObject),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoxObject {
    pub left: Option<f64>,
    pub x: Option<f64>,
    pub top: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub w: Option<f64>,
    pub height: Option<f64>,
    pub h: Option<f64>,
}

impl BoxSpec {
    pub fn to_rect(&self) -> Option<Rect> {
        match self {
            BoxSpec::Object(value) => Some(Rect::new(
                to_px(value.left.or(value.x)),
                to_px(value.top.or(value.y)),
                to_px(value.width.or(value.w)),
                to_px(value.height.or(value.h)),
            )),
            BoxSpec::Array(values) if values.len() >= 4 => Some(Rect::new(
                to_px(Some(values[0])),
                to_px(Some(values[1])),
                to_px(Some(values[2])),
                to_px(Some(values[3])),
            )),
            BoxSpec::Array(_) | BoxSpec::Other(_) => None,
        }
    }

    /// Empty containers and falsy scalars count as a missing box, so the
    /// next alias is consulted.
    pub fn is_blank(&self) -> bool {
        match self {
            BoxSpec::Array(values) => values.is_empty(),
            BoxSpec::Object(value) => {
                [
                    value.left,
                    value.x,
                    value.top,
                    value.y,
                    value.width,
                    value.w,
                    value.height,
                    value.h,
                ]
                .iter()
                .all(Option::is_none)
            }
            BoxSpec::Other(value) => match value {
                serde_json::Value::Null => true,
                serde_json::Value::Bool(flag) => !flag,
                serde_json::Value::Number(number) => number.as_f64() == Some(0.0),
                serde_json::Value::String(text) => text.is_empty(),
                serde_json::Value::Array(items) => items.is_empty(),
                serde_json::Value::Object(map) => map.is_empty(),
            },
        }
    }
}

impl OcrResultItem {
    /// Translation if present and non-empty, else the source text.
    pub fn display_text(&self) -> &str {
        self.translated_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .or_else(|| self.text.as_deref().filter(|text| !text.is_empty()))
            .unwrap_or("")
    }

    pub fn rect(&self) -> Option<Rect> {
        [&self.bounding_box, &self.bbox, &self.box_]
            .into_iter()
            .flatten()
            .find(|spec| !spec.is_blank())?
            .to_rect()
    }

    pub fn to_region(&self) -> Option<Region> {
        let rect = self.rect()?;
        Some(Region::new(rect, self.display_text()))
    }
}

/// Items without a usable box are dropped; empty text is kept and skipped
/// later by the layout driver.
pub fn regions_from_items(items: &[OcrResultItem]) -> Vec<Region> {
    items.iter().filter_map(OcrResultItem::to_region).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegionsDocument {
    Items(Vec<OcrResultItem>),
    Wrapped {
        #[serde(rename = "ocrResults")]
        ocr_results: Vec<OcrResultItem>,
    },
}

/// Parses a regions file: either a bare array of OCR results or an object
/// carrying them under `ocrResults`.
pub fn parse_regions(json: &str) -> Result<Vec<Region>> {
    let document: RegionsDocument =
        serde_json::from_str(json).with_context(|| "failed to parse regions JSON")?;
    let items = match document {
        RegionsDocument::Items(items) => items,
        RegionsDocument::Wrapped { ocr_results } => ocr_results,
    };
    Ok(regions_from_items(&items))
}

fn to_px(value: Option<f64>) -> i32 {
    match value {
        Some(value) if value.is_finite() => value.trunc() as i32,
        _ => 0,
    }
}
