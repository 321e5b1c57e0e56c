use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use super::models::{LogEntry, OperationState, ProgressSnapshot};
use super::types::{OperationKind, OperationStatus};
use crate::error::ManagerError;

/// 操作跟踪器：进程内唯一的操作槽
///
/// Readers get snapshots; only the [`RunHandle`] returned by [`OperationTracker::try_begin`]
/// can mutate the running state, and at most one handle exists at a time.
#[derive(Clone, Default)]
pub struct OperationTracker {
    state: Arc<RwLock<OperationState>>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.read().snapshot()
    }

    pub fn state(&self) -> OperationState {
        self.state.read().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.read().is_running()
    }

    /// Claim the slot and reset the state for a new run / 占用操作槽并重置状态
    ///
    /// Fails with [`ManagerError::Conflict`] without touching the state if a run is active.
    pub fn try_begin(
        &self,
        kind: OperationKind,
        total: u64,
        initial_progress: &str,
    ) -> Result<RunHandle, ManagerError> {
        let mut state = self.state.write();
        if state.is_running() {
            return Err(ManagerError::Conflict);
        }

        let id = uuid::Uuid::new_v4().to_string();
        *state = OperationState {
            id: Some(id.clone()),
            kind: Some(kind),
            status: OperationStatus::Running,
            current: 0,
            total,
            current_file: String::new(),
            current_progress: initial_progress.to_string(),
            log: Vec::with_capacity(total as usize),
            started_at: Some(Utc::now()),
            finished_at: None,
        };
        drop(state);

        tracing::info!("Operation {} started: {} of {} files", id, kind.as_str(), total);
        Ok(RunHandle {
            tracker: self.clone(),
            id,
            finished: false,
        })
    }

    fn with_run<R>(&self, id: &str, f: impl FnOnce(&mut OperationState) -> R) -> Option<R> {
        let mut state = self.state.write();
        if state.is_running() && state.id.as_deref() == Some(id) {
            Some(f(&mut state))
        } else {
            None
        }
    }
}

/// Write access to the active run / 当前运行的写入句柄
///
/// Dropping an unfinished handle finishes the run, so the slot is released even if
/// the worker panics.
pub struct RunHandle {
    tracker: OperationTracker,
    id: String,
    finished: bool,
}

impl RunHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 更新当前文件与进度消息
    pub fn set_current(&self, file: &str, progress: impl Into<String>) {
        let progress = progress.into();
        self.tracker.with_run(&self.id, |state| {
            state.current_file = file.to_string();
            state.current_progress = progress;
        });
    }

    pub fn set_progress(&self, progress: impl Into<String>) {
        let progress = progress.into();
        self.tracker.with_run(&self.id, |state| {
            state.current_progress = progress;
        });
    }

    /// Append one file's outcome and advance the counter / 追加一个文件的结果并推进计数
    ///
    /// Returns false when every targeted file already has an entry.
    pub fn record(&self, entry: LogEntry) -> bool {
        self.tracker
            .with_run(&self.id, |state| {
                if state.current >= state.total {
                    tracing::warn!(
                        "Operation {} log is full, dropping: {}",
                        self.id,
                        entry.message
                    );
                    return false;
                }
                tracing::debug!(
                    "Operation {} [{}/{}] {}",
                    self.id,
                    state.current + 1,
                    state.total,
                    entry.message
                );
                state.log.push(entry);
                state.current += 1;
                true
            })
            .unwrap_or(false)
    }

    pub fn state(&self) -> OperationState {
        self.tracker.state()
    }

    /// Cloneable progress writer for transfer callbacks / 供传输回调使用的进度写入器
    pub fn reporter(&self) -> ProgressReporter {
        ProgressReporter {
            tracker: self.tracker.clone(),
            id: self.id.clone(),
        }
    }

    /// Transition to idle with a summary message / 以汇总消息结束运行
    pub fn finish(mut self, summary: impl Into<String>) {
        self.finish_inner(summary.into());
    }

    fn finish_inner(&mut self, summary: String) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.tracker.with_run(&self.id, |state| {
            state.status = OperationStatus::Idle;
            state.current_file.clear();
            state.current_progress = summary;
            state.finished_at = Some(Utc::now());
            tracing::info!(
                "Operation {} finished after {}/{} files: {}",
                self.id, state.current, state.total, state.current_progress
            );
        });
    }
}

#[derive(Clone)]
pub struct ProgressReporter {
    tracker: OperationTracker,
    id: String,
}

impl ProgressReporter {
    /// No-op once the run has finished
    pub fn set_progress(&self, progress: impl Into<String>) {
        let progress = progress.into();
        self.tracker.with_run(&self.id, |state| {
            state.current_progress = progress;
        });
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if !self.finished {
            tracing::error!("Operation {} ended without finishing", self.id);
            self.finish_inner("Operation error: worker stopped unexpectedly".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::types::Outcome;

    #[test]
    fn test_initial_state_is_idle() {
        let tracker = OperationTracker::new();
        let snap = tracker.snapshot();
        assert!(snap.is_idle());
        assert_eq!((snap.current, snap.total), (0, 0));
        assert!(snap.progress.is_empty());
        assert!(!tracker.is_busy());
    }

    #[test]
    fn test_single_slot() {
        let tracker = OperationTracker::new();
        let run = tracker.try_begin(OperationKind::Download, 3, "").unwrap();
        run.set_current("a.bin", "a.bin: Starting download...");
        let before = tracker.state();

        let err = tracker.try_begin(OperationKind::Delete, 1, "").err().unwrap();
        assert!(matches!(err, ManagerError::Conflict));

        let after = tracker.state();
        assert_eq!(after.id, before.id);
        assert_eq!(after.kind, Some(OperationKind::Download));
        assert_eq!(after.total, 3);
        assert_eq!(after.current_progress, "a.bin: Starting download...");
        drop(run);
    }

    #[test]
    fn test_counter_never_exceeds_total() {
        let tracker = OperationTracker::new();
        let run = tracker
            .try_begin(OperationKind::Delete, 2, "Preparing to delete files...")
            .unwrap();
        assert!(run.record(LogEntry::new(Outcome::Success, "a", "Successfully deleted: a")));
        assert!(run.record(LogEntry::new(Outcome::NotFound, "b", "File not found: b")));
        assert!(!run.record(LogEntry::new(Outcome::Error, "c", "extra")));

        let state = tracker.state();
        assert_eq!((state.current, state.total), (2, 2));
        assert_eq!(state.log.len(), 2);
        assert_eq!(state.log[0].file.as_deref(), Some("a"));
        assert_eq!(state.log[1].file.as_deref(), Some("b"));
        run.finish("done");
    }

    #[test]
    fn test_finish_is_terminal_and_next_run_starts_fresh() {
        let tracker = OperationTracker::new();
        let run = tracker.try_begin(OperationKind::Download, 1, "").unwrap();
        run.set_current("a", "a: Download completed");
        run.record(LogEntry::new(Outcome::Success, "a", "Successfully downloaded: a"));
        run.finish("1 file(s) downloaded successfully");

        let snap = tracker.snapshot();
        assert!(snap.is_idle());
        assert_eq!(snap.current_file(), None);
        assert_eq!(snap.current_progress(), Some("1 file(s) downloaded successfully"));
        assert_eq!(snap.progress.len(), 1);

        let run = tracker

            .try_begin(OperationKind::Delete, 4, "Preparing to delete files...")

            .unwrap();
        let state = tracker.state();
        assert!(state.is_running());
        assert_eq!((state.current, state.total), (0, 4));
        assert!(state.log.is_empty());
        assert!(state.finished_at.is_none());
        run.finish("All 0 files deleted successfully");
    }

    #[test]
    fn test_dropped_handle_releases_slot() {
        let tracker = OperationTracker::new();
        let run = tracker.try_begin(OperationKind::Download, 2, "").unwrap();
        let handle = std::thread::spawn(move || {
            let _run = run;
            panic!("worker crashed");
        });
        assert!(handle.join().is_err());

        let snap = tracker.snapshot();
        assert!(snap.is_idle());
        assert_eq!(snap.current_progress(), Some("Operation error: worker stopped unexpectedly"));
        assert!(tracker.try_begin(OperationKind::Download, 1, "").is_ok());
    }
}
