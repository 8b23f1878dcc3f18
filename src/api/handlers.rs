use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::embed::EmbedInfoResponse;
use crate::errors::AppError;
use crate::AppState;

pub async fn healthz() -> &'static str {
    "ok"
}

/// `GET /embed-info`: acquire a token, fetch report metadata, generate an
/// embed token and return the combined result.
pub async fn embed_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EmbedInfoResponse>, AppError> {
    let info = state.embed.embed_info().await?;
    Ok(Json(info))
}
