use serde::{Deserialize, Serialize};

use crate::regions::OcrResultItem;

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct OverlayRequest {
    pub(crate) image_url: Option<String>,
    pub(crate) ocr_results: Option<Vec<OcrResultItem>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
