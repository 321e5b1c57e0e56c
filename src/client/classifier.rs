//! Log entry classification / 日志分类
//!
//! Structured outcomes from the backend win; keyword matching on the message is only a
//! fallback for entries that arrive without one.

use crate::operation::{LogEntry, Outcome};

/// How a log line is displayed / 日志显示类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Error,
    Skipped,
    NotFound,
    /// No outcome and no keyword matched / 无法归类的中性信息
    Info,
}

impl From<Outcome> for Classification {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => Self::Success,
            Outcome::Error => Self::Error,
            Outcome::Skipped => Self::Skipped,
            Outcome::NotFound => Self::NotFound,
        }
    }
}

impl Classification {
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Success => Some(Outcome::Success),
            Self::Error => Some(Outcome::Error),
            Self::Skipped => Some(Outcome::Skipped),
            Self::NotFound => Some(Outcome::NotFound),
            Self::Info => None,
        }
    }
}

pub trait LogClassifier: Send + Sync {
    fn classify(&self, entry: &LogEntry) -> Classification;

    /// Copy of the entry with its outcome filled in when one could be derived
    fn classified(&self, entry: &LogEntry) -> LogEntry {
        LogEntry {
            outcome: self.classify(entry).outcome(),
            ..entry.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl LogClassifier for KeywordClassifier {
    fn classify(&self, entry: &LogEntry) -> Classification {
        entry
            .outcome
            .or_else(|| keyword_outcome(&entry.message))
            .map(Classification::from)
            .unwrap_or(Classification::Info)
    }
}

/// Keyword rules, checked in order / 按顺序匹配关键字
const RULES: &[(Outcome, &[&str])] = &[
    (Outcome::Success, &["downloaded successfully", "completed", "deleted"]),
    (Outcome::Error, &["failed", "error"]),
    (Outcome::Skipped, &["already exists", "already existed"]),
    (Outcome::NotFound, &["not found"]),
];

pub fn keyword_outcome(message: &str) -> Option<Outcome> {
    let message = message.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| message.contains(k)))
        .map(|(outcome, _)| *outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_outcome_wins() {
        let c = KeywordClassifier;
        let entry = LogEntry::new(Outcome::Skipped, "a", "download failed earlier");
        assert_eq!(c.classify(&entry), Classification::Skipped);
    }

    #[test]
    fn test_keyword_fallback() {
        let c = KeywordClassifier;
        let cases = [
            ("a.safetensors downloaded successfully", Classification::Success),
            ("Download completed", Classification::Success),
            ("Found file /m/a.bin...deleted!", Classification::Success),
            ("Failed to download: a.bin - HTTP 404", Classification::Error),
            ("Unexpected error with url", Classification::Error),
            ("File already exists: a.bin", Classification::Skipped),
            ("File not found: a.bin", Classification::NotFound),
            ("Starting download: a.bin", Classification::Info),
            ("", Classification::Info),
        ];
        for (message, expected) in cases {
            assert_eq!(c.classify(&LogEntry::text(message)), expected, "{}", message);
        }
    }

    #[test]
    fn test_classification_is_idempotent() {
        let c = KeywordClassifier;
        let messages = [
            "File not found: x",
            "Starting download: x",
            "Successfully deleted: x",
            "boom error",
        ];
        for message in messages {
            let entry = LogEntry::text(message);
            let once = c.classified(&entry);
            assert_eq!(c.classify(&once), c.classify(&entry));
            assert_eq!(c.classified(&once), once);
        }
    }
}
