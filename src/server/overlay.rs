use std::sync::Arc;
use tracing::info;

use crate::overlay::{Region, decode_source, render_overlay};
use crate::regions::regions_from_items;

use super::models::OverlayRequest;
use super::state::ServerState;

pub(crate) const INVALID_INPUT: &str = "Invalid input JSON: must contain imageUrl and ocrResults";

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: axum::http::StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: axum::http::StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(format!("{:#}", err))
    }
}

/// Checks the request shape and turns it into fetchable parts.
pub(crate) fn validate_request(
    request: OverlayRequest,
) -> Result<(String, Vec<Region>), ServerError> {
    let image_url = request
        .image_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ServerError::bad_request(INVALID_INPUT))?;
    let items = request
        .ocr_results
        .ok_or_else(|| ServerError::bad_request(INVALID_INPUT))?;
    Ok((image_url, regions_from_items(&items)))
}

pub(crate) async fn overlay_request(
    state: Arc<ServerState>,
    request: OverlayRequest,
) -> Result<Vec<u8>, ServerError> {
    let (image_url, regions) = validate_request(request)?;
    let image_bytes = state
        .fetcher
        .fetch(&image_url)
        .await
        .map_err(|err| ServerError::bad_request(format!("Error fetching image: {:#}", err)))?;
    info!(
        "overlaying {} region(s) on {} ({} bytes)",
        regions.len(),
        image_url,
        image_bytes.len()
    );

    tokio::task::spawn_blocking(move || render_blocking(&state, &image_bytes, &regions))
        .await
        .map_err(|err| ServerError::internal(format!("server task failed: {}", err)))?
}

fn render_blocking(
    state: &ServerState,
    image_bytes: &[u8],
    regions: &[Region],
) -> Result<Vec<u8>, ServerError> {
    let source = decode_source(image_bytes)
        .map_err(|err| ServerError::bad_request(format!("Invalid image data: {:#}", err)))?;
    let bytes = render_overlay(&source, regions, &state.layout, &state.style, &state.fonts)?;
    Ok(bytes)
}
