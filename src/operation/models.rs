use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::types::{OperationKind, OperationStatus, Outcome};

/// One file's outcome in the operation log / 操作日志中单个文件的结果
///
/// Deserializes from a bare string as well as from `{message, outcome|status, file}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLogEntry")]
pub struct LogEntry {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl LogEntry {
    pub fn new(outcome: Outcome, file: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            outcome: Some(outcome),
            file: Some(file.to_string()),
        }
    }

    /// Entry without an explicit outcome / 未标注结果的日志
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            outcome: None,
            file: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLogEntry {
    Text(String),
    Record {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        file: Option<String>,
        #[serde(default, alias = "status")]
        outcome: Option<String>,
    },
}

impl From<RawLogEntry> for LogEntry {
    fn from(raw: RawLogEntry) -> Self {
        match raw {
            RawLogEntry::Text(message) => LogEntry::text(message),
            RawLogEntry::Record { message, file, outcome } => LogEntry {
                message: message
                    .or_else(|| file.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                outcome: outcome.as_deref().and_then(Outcome::from_label),
                file,
            },
        }
    }
}

/// Live record of the single operation slot / 单一操作槽的实时记录
#[derive(Debug, Clone, Default)]
pub struct OperationState {
    pub id: Option<String>,
    pub kind: Option<OperationKind>,
    pub status: OperationStatus,
    pub current: u64,
    pub total: u64,
    pub current_file: String,
    pub current_progress: String,
    pub log: Vec<LogEntry>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl OperationState {
    pub fn is_running(&self) -> bool {
        self.status == OperationStatus::Running
    }

    /// Count log entries with the given outcome / 按结果统计日志条数
    pub fn count(&self, outcome: Outcome) -> usize {
        self.log.iter().filter(|e| e.outcome == Some(outcome)).count()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        ProgressSnapshot {
            status: self.status,
            current: self.current,
            total: self.total,
            progress: self.log.clone(),
            current_file: non_empty(&self.current_file),
            current_progress: non_empty(&self.current_progress),
            operation: self.kind,
        }
    }
}

/// GET /progress 响应体，客户端与服务端共用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub status: OperationStatus,
    #[serde(default)]
    pub current: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub progress: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
}

impl ProgressSnapshot {
    pub fn is_idle(&self) -> bool {
        self.status == OperationStatus::Idle
    }

    /// Current file, ignoring blank values / 当前文件（忽略空白）
    pub fn current_file(&self) -> Option<&str> {
        self.current_file.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn current_progress(&self) -> Option<&str> {
        self.current_progress.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<LogEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<LogEntry>>::deserialize(deserializer)?.unwrap_or_default())
}
