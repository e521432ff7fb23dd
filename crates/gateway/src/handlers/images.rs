//! Image handlers

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::AppState;
use picforge_common::errors::Result;

/// Serve one picture by file name
pub async fn get_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    let image = state.images.fetch(&name).await?;

    tracing::debug!(bytes = image.bytes.len(), content_type = image.content_type, "Image served");

    Ok(([(header::CONTENT_TYPE, image.content_type)], image.bytes).into_response())
}
