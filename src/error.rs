//! Error taxonomy / 错误分类
//!
//! Validation and conflict errors are raised before any state changes.
//! Transport errors are transient; backend errors carry the server message verbatim.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    /// Missing or invalid parameter / 参数缺失或无效
    #[error("{0}")]
    Validation(String),

    /// Another operation holds the slot / 已有操作在运行
    #[error("Another operation is already running, please wait for it to finish")]
    Conflict,

    /// Network-layer failure / 网络层错误
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// `success: false` reported by the backend / 后端返回失败
    #[error("{0}")]
    Backend(String),

    /// File transfer failed (HTTP status, short body) / 文件传输失败
    #[error("{0}")]
    Transfer(String),

    #[error("Failed to load model configurations: {0}")]
    Catalog(String),

    #[error("{0}")]
    Browse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ManagerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
