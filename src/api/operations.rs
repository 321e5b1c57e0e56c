use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::{ApiError, ApiResult};
use crate::state::AppState;
use model_manager::models::{ActionRequest, ActionResponse};
use model_manager::operation::{OperationKind, ProgressSnapshot};

/// GET /progress - 当前操作进度
pub async fn get_progress(State(state): State<Arc<AppState>>) -> Json<ProgressSnapshot> {
    Json(state.gate.tracker().snapshot())
}

/// POST /download - 开始下载模型包
pub async fn download(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult<ActionResponse> {
    submit(&state, OperationKind::Download, payload)
}

/// POST /delete - 删除模型包文件
pub async fn delete(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult<ActionResponse> {
    submit(&state, OperationKind::Delete, payload)
}

fn submit(
    state: &AppState,
    kind: OperationKind,
    payload: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult<ActionResponse> {
    let Json(request) = payload?;
    let accepted = state.gate.submit(kind, &request).map_err(ApiError)?;
    tracing::info!(
        "Accepted {} of {} into {} (operation {})",
        kind.as_str(),
        request.model,
        request.base_path,
        accepted.operation_id
    );
    Ok(Json(ActionResponse::ok(accepted.message)))
}
