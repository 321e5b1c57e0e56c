use serde::{Deserialize, Serialize};

/// 操作状态：idle 既是初始状态也是终止状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Older backends report a crashed run as "error"; it is terminal too.
    #[default]
    #[serde(alias = "error")]
    Idle,
    #[serde(alias = "downloading", alias = "deleting")]
    Running,
}

/// 操作类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Download,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Delete => "delete",
        }
    }
}

/// 单个文件的处理结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Error,
    Skipped,
    NotFound,
}

impl Outcome {
    /// Parse a status label as sent by the backend; unknown labels yield None
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "success" | "deleted" => Some(Self::Success),
            "error" => Some(Self::Error),
            "skipped" => Some(Self::Skipped),
            "not_found" => Some(Self::NotFound),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Skipped => "skipped",
            Self::NotFound => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accepts_legacy_words() {
        let parse = |s: &str| serde_json::from_str::<OperationStatus>(s).unwrap();
        assert_eq!(parse("\"idle\""), OperationStatus::Idle);
        assert_eq!(parse("\"running\""), OperationStatus::Running);
        assert_eq!(parse("\"downloading\""), OperationStatus::Running);
        assert_eq!(parse("\"deleting\""), OperationStatus::Running);
        assert_eq!(parse("\"error\""), OperationStatus::Idle);
        assert_eq!(serde_json::to_string(&OperationStatus::Running).unwrap(), "\"running\"");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::from_label("deleted"), Some(Outcome::Success));
        assert_eq!(Outcome::from_label("NOT_FOUND"), Some(Outcome::NotFound));
        assert_eq!(Outcome::from_label("downloading"), None);
        assert_eq!(serde_json::to_string(&Outcome::NotFound).unwrap(), "\"not_found\"");
    }
}
