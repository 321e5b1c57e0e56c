pub mod browse;
pub mod catalog;
pub mod operations;
pub mod server;

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use model_manager::error::ManagerError;
use model_manager::models::ActionResponse;

/// All routes of the model manager API / 全部 API 路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(server::health_check))
        .route("/progress", get(operations::get_progress))
        .route("/download", post(operations::download))
        .route("/delete", post(operations::delete))
        .route("/model_info", post(catalog::model_info))
        .route("/check_status", post(catalog::check_status))
        .route("/load_configs", get(catalog::load_configs).post(catalog::load_configs))
        .route("/browse_directory", post(browse::browse_directory))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Failures go out as `{ success: false, message }` with HTTP 200
/// 失败统一返回 `{ success: false, message }`，状态码 200
pub struct ApiError(pub ManagerError);

pub type ApiResult<T> = Result<Json<T>, ApiError>;

impl From<ManagerError> for ApiError {
    fn from(e: ManagerError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ManagerError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            ManagerError::Validation(_) | ManagerError::Conflict => {
                tracing::debug!("Request rejected: {}", self.0)
            }
            e => tracing::warn!("Request failed: {}", e),
        }
        Json(ActionResponse::fail(self.0.to_string())).into_response()
    }
}
