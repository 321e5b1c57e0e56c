use std::path::PathBuf;
use std::sync::Arc;

use super::tracker::OperationTracker;
use super::types::OperationKind;
use super::worker::{self, Job};
use crate::catalog::ModelCatalog;
use crate::error::{ManagerError, Result};
use crate::models::ActionRequest;
use crate::transfer::FileTransfer;

/// Accepted submission / 已受理的请求
#[derive(Debug, Clone)]
pub struct Accepted {
    pub operation_id: String,
    pub message: String,
}

/// 操作闸门：串行化下载/删除请求
///
/// Validates a request, claims the tracker slot and spawns the worker. The caller gets
/// an acknowledgement immediately; the result is observed through the tracker.
#[derive(Clone)]
pub struct ActionGate {
    tracker: OperationTracker,
    catalog: Arc<ModelCatalog>,
    transfer: Arc<dyn FileTransfer>,
}

impl ActionGate {
    pub fn new(
        tracker: OperationTracker,
        catalog: Arc<ModelCatalog>,
        transfer: Arc<dyn FileTransfer>,
    ) -> Self {
        Self { tracker, catalog, transfer }
    }

    pub fn is_busy(&self) -> bool {
        self.tracker.is_busy()
    }

    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }

    /// Must be called inside a tokio runtime / 需在 tokio 运行时中调用
    pub fn submit(&self, kind: OperationKind, request: &ActionRequest) -> Result<Accepted> {
        let job = self.prepare(kind, request)?;

        let initial = match kind {
            OperationKind::Download => "",
            OperationKind::Delete => "Preparing to delete files...",
        };
        let run = self.tracker.try_begin(kind, job.files.len() as u64, initial)?;
        let operation_id = run.id().to_string();

        let message = match kind {
            OperationKind::Download => format!("Checking and downloading {} files...", job.model),
            OperationKind::Delete => format!("Checking and deleting {} files...", job.model),
        };

        match kind {
            OperationKind::Download => {
                tokio::spawn(worker::run_download(run, job, self.transfer.clone()));
            }
            OperationKind::Delete => {
                tokio::spawn(worker::run_delete(run, job));
            }
        }

        Ok(Accepted { operation_id, message })
    }

    fn prepare(&self, kind: OperationKind, request: &ActionRequest) -> Result<Job> {
        let model = request.model.trim();
        if model.is_empty() {
            return Err(ManagerError::validation("Please select a model package"));
        }
        let base_path = request.base_path.trim();
        if base_path.is_empty() {
            return Err(ManagerError::validation("Please enter a base path"));
        }

        let config = self
            .catalog
            .get(model)
            .filter(|c| !c.files.is_empty())
            .ok_or_else(|| ManagerError::validation("Invalid model selection"))?;

        let token = request
            .hf_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        if kind == OperationKind::Download && config.requires_hf && token.is_none() {
            return Err(ManagerError::validation(format!(
                "Hugging Face token is required for {}. Please provide your HF token and try again.",
                model
            )));
        }

        Ok(Job {
            model: model.to_string(),
            base_path: PathBuf::from(base_path),
            files: config.files,
            token: if kind == OperationKind::Download { token } else { None },
        })
    }
}
