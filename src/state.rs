use std::sync::Arc;

use model_manager::catalog::ModelCatalog;
use model_manager::config::AppConfig;
use model_manager::operation::ActionGate;

/// Shared server state / 服务端共享状态
pub struct AppState {
    pub config: AppConfig,
    pub catalog: Arc<ModelCatalog>,
    /// Owns the operation tracker / 持有操作跟踪器
    pub gate: ActionGate,
}

impl AppState {
    pub fn new(config: AppConfig, catalog: Arc<ModelCatalog>, gate: ActionGate) -> Self {
        Self { config, catalog, gate }
    }
}
