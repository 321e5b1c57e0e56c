//! Client side of an action: local gate, submission, polling
//! 客户端操作流程：本地闸门、提交、轮询

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::backend::Backend;
use super::poller::{
    Notice, NoticeLevel, PollReport, ProgressPoller, ProgressView, SampleInterpreter,
};
use crate::error::{ManagerError, Result};
use crate::models::ActionRequest;
use crate::operation::OperationKind;

/// Client busy flag / 客户端忙碌标记
#[derive(Debug, Clone, Default)]
pub struct ClientGate {
    busy: Arc<AtomicBool>,
}

impl ClientGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn try_acquire(&self) -> Result<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| BusyGuard { busy: self.busy.clone() })
            .map_err(|_| ManagerError::Conflict)
    }
}

/// Releases the client gate when dropped / 释放时归还闸门
#[derive(Debug)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

pub struct Session<B: Backend + ?Sized> {
    backend: Arc<B>,
    gate: ClientGate,
    interval: Duration,
}

impl<B: Backend + ?Sized> Session<B> {
    pub fn new(backend: Arc<B>, interval: Duration) -> Self {
        Self { backend, gate: ClientGate::new(), interval }
    }

    pub fn gate(&self) -> &ClientGate {
        &self.gate
    }

    /// Checks that need no network round trip / 无需网络的本地校验
    pub fn validate(request: &ActionRequest) -> Result<()> {
        if request.model.trim().is_empty() {
            return Err(ManagerError::validation("Please select a model package"));
        }
        if request.base_path.trim().is_empty() {
            return Err(ManagerError::validation("Please enter a base path"));
        }
        Ok(())
    }

    /// Submit an action and follow it until the backend goes idle
    /// 提交操作并跟踪到后端空闲
    ///
    /// The gate is held from submission until the poller observes idle, and released
    /// on any failure before that.
    pub async fn run_action(
        &self,
        kind: OperationKind,
        request: &ActionRequest,
        view: &mut dyn ProgressView,
        cancel: CancellationToken,
    ) -> Result<PollReport> {
        Self::validate(request)?;
        let guard = self.gate.try_acquire()?;

        let accepted = self.backend.submit(kind, request).await?;
        tracing::debug!("{} accepted: {}", kind.as_str(), accepted.message);
        if !accepted.message.is_empty() {
            view.show_notice(&Notice::new(NoticeLevel::Info, accepted.message));
        }

        let poller = ProgressPoller::new(self.backend.clone(), self.interval, cancel);
        Ok(poller.run(SampleInterpreter::new(Some(guard)), view).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::poller::tests::{idle, running, RecordingView, ScriptedSource};
    use crate::client::poller::{PollOutcome, ProgressSource};
    use crate::models::{
        ActionResponse, CheckStatusResponse, LoadConfigsResponse, ModelInfoResponse, TreeNode,
    };
    use crate::operation::{LogEntry, Outcome, ProgressSnapshot};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FakeBackend {
        progress: ScriptedSource,
        reply: std::result::Result<String, String>,
        submitted: Mutex<Vec<(OperationKind, String)>>,
    }

    impl FakeBackend {
        fn new(reply: std::result::Result<&str, &str>, script: Vec<ProgressSnapshot>) -> Self {
            Self {
                progress: ScriptedSource::new(script.into_iter().map(Ok).collect()),
                reply: reply.map(str::to_string).map_err(str::to_string),
                submitted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProgressSource for FakeBackend {
        async fn fetch_progress(&self) -> Result<ProgressSnapshot> {
            self.progress.fetch_progress().await
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn submit(
            &self,
            kind: OperationKind,
            request: &ActionRequest,
        ) -> Result<ActionResponse> {
            self.submitted.lock().push((kind, request.model.clone()));
            match &self.reply {
                Ok(message) => Ok(ActionResponse::ok(message.as_str())),
                Err(message) => Err(ManagerError::Backend(message.clone())),
            }
        }

        async fn load_configs(&self) -> Result<LoadConfigsResponse> {
            unimplemented!()
        }

        async fn model_info(&self, _model: &str) -> Result<ModelInfoResponse> {
            unimplemented!()
        }

        async fn check_status(
            &self,
            _model: &str,
            _base_path: &str,
        ) -> Result<CheckStatusResponse> {
            unimplemented!()
        }

        async fn browse(&self, _path: &str) -> Result<Vec<TreeNode>> {
            unimplemented!()
        }
    }

    fn request(model: &str, base: &str) -> ActionRequest {
        ActionRequest {
            model: model.to_string(),
            base_path: base.to_string(),
            hf_token: None,
        }
    }

    #[test]
    fn test_guard_releases_gate() {
        let gate = ClientGate::new();
        let guard = gate.try_acquire().unwrap();
        assert!(gate.is_busy());
        assert!(matches!(gate.try_acquire(), Err(ManagerError::Conflict)));
        drop(guard);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn test_download_flow_releases_gate_on_idle() {
        let done = vec![
            LogEntry::new(Outcome::Success, "a", "Successfully downloaded: a"),
            LogEntry::new(Outcome::Success, "b", "Successfully downloaded: b"),
        ];
        let backend = Arc::new(FakeBackend::new(
            Ok("Checking and downloading sdxl-base files..."),
            vec![
                running(1, 2, "b", done[..1].to_vec()),
                idle(2, Some("2 file(s) downloaded successfully"), done),
            ],
        ));
        let session = Session::new(backend.clone(), Duration::from_millis(1));
        let mut view = RecordingView::default();

        let report = session
            .run_action(
                OperationKind::Download,
                &request("sdxl-base", "/m"),
                &mut view,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(matches!(report.outcome, PollOutcome::Completed(_)));
        assert!(!session.gate().is_busy());
        assert_eq!(view.notices.len(), 2);
        assert_eq!(view.notices[0].message, "Checking and downloading sdxl-base files...");
        assert_eq!(view.notices[1].level, NoticeLevel::Success);
        assert_eq!(view.log.len(), 2);
    }

    #[tokio::test]
    async fn test_action_rejected_locally_while_busy() {
        let backend = Arc::new(FakeBackend::new(Ok("ok"), vec![]));
        let session = Session::new(backend.clone(), Duration::from_millis(1));
        let _held = session.gate().try_acquire().unwrap();
        let mut view = RecordingView::default();

        let err = session
            .run_action(
                OperationKind::Delete,
                &request("sdxl-base", "/m"),
                &mut view,
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ManagerError::Conflict));
        assert!(backend.submitted.lock().is_empty());
        assert!(view.notices.is_empty());
    }

    #[tokio::test]
    async fn test_validation_happens_before_submission() {
        let backend = Arc::new(FakeBackend::new(Ok("ok"), vec![]));
        let session = Session::new(backend.clone(), Duration::from_millis(1));
        let mut view = RecordingView::default();

        let err = session
            .run_action(
                OperationKind::Download,
                &request("sdxl-base", ""),
                &mut view,
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Please enter a base path");
        assert!(backend.submitted.lock().is_empty());
        assert!(!session.gate().is_busy());
    }

    #[tokio::test]
    async fn test_rejected_submission_releases_gate() {
        let backend = Arc::new(FakeBackend::new(Err("Invalid model selection"), vec![]));
        let session = Session::new(backend.clone(), Duration::from_millis(1));
        let mut view = RecordingView::default();

        let err = session
            .run_action(
                OperationKind::Download,
                &request("nope", "/m"),
                &mut view,
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid model selection");
        assert_eq!(backend.submitted.lock().len(), 1);
        assert!(!session.gate().is_busy());
    }
}
