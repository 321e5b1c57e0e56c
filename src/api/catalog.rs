use std::path::Path;
use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::ApiResult;
use crate::state::AppState;
use model_manager::catalog::ModelConfig;
use model_manager::error::ManagerError;
use model_manager::models::{
    CheckStatusRequest, CheckStatusResponse, FileStatus, LoadConfigsResponse, ModelInfoRequest,
    ModelInfoResponse,
};

fn lookup(state: &AppState, model: &str) -> Result<ModelConfig, ManagerError> {
    state
        .catalog
        .get(model.trim())
        .ok_or_else(|| ManagerError::validation("Invalid model selection"))
}

/// POST /model_info - 模型包详情
pub async fn model_info(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ModelInfoRequest>, JsonRejection>,
) -> ApiResult<ModelInfoResponse> {
    let Json(request) = payload?;
    let config = lookup(&state, &request.model)?;
    Ok(Json(ModelInfoResponse {
        success: true,
        model: request.model.trim().to_string(),
        requires_hf: config.requires_hf,
        files: config.files,
    }))
}

/// POST /check_status - 检查模型文件是否存在
pub async fn check_status(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckStatusRequest>, JsonRejection>,
) -> ApiResult<CheckStatusResponse> {
    let Json(request) = payload?;
    let config = lookup(&state, &request.model)?;
    let base_path = request.base_path.trim();
    if base_path.is_empty() {
        return Err(ManagerError::validation("Please enter a base path").into());
    }

    let mut file_status = Vec::with_capacity(config.files.len());
    for entry in &config.files {
        let target = entry.target_path(Path::new(base_path))?;
        let exists = tokio::fs::try_exists(&target).await.unwrap_or(false);
        file_status.push(FileStatus {
            path: target.to_string_lossy().to_string(),
            exists,
            filename: entry.file_name(),
            directory: entry.directory.clone(),
        });
    }
    let found = file_status.iter().filter(|f| f.exists).count();

    Ok(Json(CheckStatusResponse {
        success: true,
        model: request.model.trim().to_string(),
        base_path: base_path.to_string(),
        found,
        total: file_status.len(),
        file_status,
    }))
}

/// GET /load_configs - 重新加载模型配置
pub async fn load_configs(State(state): State<Arc<AppState>>) -> ApiResult<LoadConfigsResponse> {
    let count = state.catalog.reload().await?;
    Ok(Json(LoadConfigsResponse {
        success: true,
        count,
        models: state.catalog.names(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{call, test_state};
    use serde_json::json;

    #[tokio::test]
    async fn test_model_info() {
        let body = json!({"model": "flux-dev"});
        let value = call(test_state(), "POST", "/model_info", Some(body)).await;
        assert_eq!(value["success"], true);
        assert_eq!(value["requires_hf"], true);
        assert_eq!(value["files"][0]["directory"], "unet");

        let body = json!({"model": "missing"});
        let value = call(test_state(), "POST", "/model_info", Some(body)).await;
        assert_eq!(value, json!({"success": false, "message": "Invalid model selection"}));
    }

    #[tokio::test]
    async fn test_check_status_counts_present_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("vae")).unwrap();
        std::fs::write(dir.path().join("vae").join("sdxl_vae.safetensors"), b"x").unwrap();

        let body = json!({"model": "sdxl-base", "base_path": dir.path().to_string_lossy()});
        let value = call(test_state(), "POST", "/check_status", Some(body)).await;

        assert_eq!(value["success"], true);
        assert_eq!(value["found"], 1);
        assert_eq!(value["total"], 2);
        assert_eq!(value["file_status"][0]["exists"], false);
        assert_eq!(value["file_status"][0]["filename"], "sd_xl_base_1.0.safetensors");
        assert_eq!(value["file_status"][0]["directory"], "/checkpoints");
        assert_eq!(value["file_status"][1]["exists"], true);
    }

    #[tokio::test]
    async fn test_load_configs_failure_keeps_catalog() {
        // The in-memory test catalog has no backing document, so reloading fails
        let state = test_state();
        let value = call(state.clone(), "GET", "/load_configs", None).await;
        assert_eq!(value["success"], false);
        let message = value["message"].as_str().unwrap();
        assert!(message.starts_with("Failed to load model configurations"));
        assert_eq!(state.catalog.names().len(), 2);
    }

    #[tokio::test]
    async fn test_load_configs_reads_document() {
        use crate::state::AppState;
        use model_manager::catalog::ModelCatalog;
        use model_manager::config::{AppConfig, CatalogConfig};
        use model_manager::operation::{ActionGate, OperationTracker};
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("model_configs.json");
        std::fs::write(
            &doc,
            r#"{"sdxl-base": {"files": [{"directory": "checkpoints", "url": "https://hf.co/a.safetensors"}]},
                "animagine": {"hf": false, "files": []}}"#,
        )
        .unwrap();

        let catalog_config = CatalogConfig {
            source: doc.to_string_lossy().to_string(),
            timeout_secs: 5,
        };
        let catalog = Arc::new(ModelCatalog::new(&catalog_config).unwrap());
        let transfer = Arc::new(crate::api::tests::StubTransfer);
        let gate = ActionGate::new(OperationTracker::new(), catalog.clone(), transfer);
        let state = Arc::new(AppState::new(AppConfig::default(), catalog, gate));

        let value = call(state, "GET", "/load_configs", None).await;
        assert_eq!(
            value,
            json!({"success": true, "count": 2, "models": ["animagine", "sdxl-base"]})
        );
    }
}
