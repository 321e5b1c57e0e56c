//! Progress polling / 进度轮询
//!
//! Samples `/progress` at a fixed interval until the operation goes idle, rendering each
//! sample into a [`ProgressView`]. The terminal transition runs exactly once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::classifier::{Classification, KeywordClassifier, LogClassifier};
use super::session::BusyGuard;
use crate::error::Result;
use crate::operation::ProgressSnapshot;

/// Anything that can produce a progress snapshot / 进度来源
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn fetch_progress(&self) -> Result<ProgressSnapshot>;
}

/// Severity of the terminal notice / 结束通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }

    /// Build the notice shown when an operation ends / 根据最终进度生成结束通知
    pub fn terminal(current_progress: Option<&str>) -> Self {
        let Some(message) = current_progress.map(str::trim).filter(|m| !m.is_empty()) else {
            return Self::new(NoticeLevel::Success, "Operation completed!");
        };
        let lower = message.to_lowercase();
        let level = if lower.contains("error") {
            NoticeLevel::Error
        } else if lower.contains("already existed") {
            NoticeLevel::Info
        } else {
            NoticeLevel::Success
        };
        Self::new(level, message)
    }
}

/// What the progress area shows for a running operation / 运行中的进度展示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressDisplay {
    pub index: u64,
    pub total: u64,
    pub current_file: Option<String>,
    pub current_progress: Option<String>,
}

impl ProgressDisplay {
    pub fn from_snapshot(snapshot: &ProgressSnapshot) -> Self {
        Self {
            index: display_index(snapshot.current, snapshot.total),
            total: snapshot.total,
            current_file: snapshot.current_file().map(str::to_string),
            current_progress: snapshot.current_progress().map(str::to_string),
        }
    }

    pub fn headline(&self) -> String {
        format!("Processing {} of {} files", self.index, self.total)
    }
}

/// 1-based index of the file being processed, 0 when nothing is targeted
pub fn display_index(current: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        current.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntry {
    pub class: Classification,
    pub message: String,
}

/// UI collaborator driven by the poller / 由轮询器驱动的界面
pub trait ProgressView {
    fn show_progress(&mut self, display: &ProgressDisplay);

    /// Replaces everything previously rendered / 整体替换已渲染的日志
    fn show_log(&mut self, entries: &[RenderedEntry]);

    fn show_notice(&mut self, notice: &Notice);

    fn refresh_directory(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Finished(Notice),
    /// Sample arrived after the terminal transition / 结束后收到的样本
    Ignored,
}

/// Turns samples into view updates / 将进度样本转换为界面更新
pub struct SampleInterpreter {
    classifier: Box<dyn LogClassifier>,
    guard: Option<BusyGuard>,
    finished: bool,
}

impl SampleInterpreter {
    pub fn new(guard: Option<BusyGuard>) -> Self {
        Self::with_classifier(Box::new(KeywordClassifier), guard)
    }

    pub fn with_classifier(classifier: Box<dyn LogClassifier>, guard: Option<BusyGuard>) -> Self {
        Self { classifier, guard, finished: false }
    }

    pub fn on_sample(&mut self, snapshot: &ProgressSnapshot, view: &mut dyn ProgressView) -> Step {
        if self.finished {
            return Step::Ignored;
        }

        let entries: Vec<RenderedEntry> = snapshot
            .progress
            .iter()
            .map(|entry| RenderedEntry {
                class: self.classifier.classify(entry),
                message: entry.message.clone(),
            })
            .collect();

        if !snapshot.is_idle() {
            view.show_progress(&ProgressDisplay::from_snapshot(snapshot));
            view.show_log(&entries);
            return Step::Continue;
        }

        self.finished = true;
        view.show_log(&entries);
        let notice = Notice::terminal(snapshot.current_progress());
        view.show_notice(&notice);
        // Release the client gate before the view reloads anything
        drop(self.guard.take());
        view.refresh_directory();
        Step::Finished(notice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(Notice),
    Cancelled,
}

/// Result of a polling session / 一次轮询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    pub polls: u32,
    pub failures: u32,
}

pub struct ProgressPoller<S: ?Sized> {
    source: Arc<S>,
    interval: Duration,
    cancel: CancellationToken,
}

impl<S: ProgressSource + ?Sized> ProgressPoller<S> {
    pub fn new(source: Arc<S>, interval: Duration, cancel: CancellationToken) -> Self {
        Self { source, interval, cancel }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Poll until idle is observed or the token is cancelled / 轮询直到空闲或被取消
    ///
    /// The next request is only issued after the previous one has been handled.
    pub async fn run(
        &self,
        mut interpreter: SampleInterpreter,
        view: &mut dyn ProgressView,
    ) -> PollReport {
        let mut polls = 0;
        let mut failures = 0;

        loop {
            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => break,
                fetched = self.source.fetch_progress() => fetched,
            };

            match fetched {
                Ok(snapshot) => {
                    polls += 1;
                    if let Step::Finished(notice) = interpreter.on_sample(&snapshot, view) {
                        self.cancel.cancel();
                        let outcome = PollOutcome::Completed(notice);
                        return PollReport { outcome, polls, failures };
                    }
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!("Error polling progress: {}", e);
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::debug!("Progress polling cancelled after {} polls", polls);
        PollReport { outcome: PollOutcome::Cancelled, polls, failures }
    }
}
