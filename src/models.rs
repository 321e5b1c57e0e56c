//! Request/response bodies of the HTTP API, shared by server and client
//! HTTP 接口的请求与响应结构（服务端与客户端共用）

use serde::{Deserialize, Serialize};

use crate::catalog::ManifestEntry;

/// POST /download and POST /delete
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub base_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hf_token: Option<String>,
}

/// `{ success, message }`, also used for every failure / 也用于所有失败响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInfoRequest {
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub success: bool,
    pub model: String,
    pub requires_hf: bool,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckStatusRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub base_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub path: String,
    pub exists: bool,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckStatusResponse {
    pub success: bool,
    pub model: String,
    pub base_path: String,
    pub found: usize,
    pub total: usize,
    pub file_status: Vec<FileStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfigsResponse {
    pub success: bool,
    pub count: usize,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowseRequest {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// Directory tree node / 目录树节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Only meaningful for files / 仅对文件有意义
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self { name: name.into(), kind: NodeKind::File, size: Some(size), children: None }
    }

    pub fn folder(name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self { name: name.into(), kind: NodeKind::Folder, size: None, children: Some(children) }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseResponse {
    pub success: bool,
    pub structure: Vec<TreeNode>,
}
