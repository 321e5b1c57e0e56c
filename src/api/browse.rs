use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::ApiResult;
use crate::state::AppState;
use model_manager::browse;
use model_manager::models::{BrowseRequest, BrowseResponse};

/// POST /browse_directory - 浏览目录结构
pub async fn browse_directory(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BrowseRequest>, JsonRejection>,
) -> ApiResult<BrowseResponse> {
    let Json(request) = payload?;
    let structure = browse::browse(&request.path, state.config.browse.max_children).await?;
    Ok(Json(BrowseResponse { success: true, structure }))
}
