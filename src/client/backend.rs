//! HTTP client for the model manager API / 模型管理 API 客户端

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::poller::ProgressSource;
use crate::config::ClientConfig;
use crate::error::{ManagerError, Result};
use crate::models::{
    ActionRequest, ActionResponse, BrowseRequest, BrowseResponse, CheckStatusRequest,
    CheckStatusResponse, LoadConfigsResponse, ModelInfoRequest, ModelInfoResponse, TreeNode,
};
use crate::operation::{OperationKind, ProgressSnapshot};

/// Backend operations used by the client / 客户端使用的后端接口
#[async_trait]
pub trait Backend: ProgressSource {
    async fn submit(&self, kind: OperationKind, request: &ActionRequest) -> Result<ActionResponse>;

    /// Reload the catalog; model names come back sorted / 重新加载模型配置（名称已排序）
    async fn load_configs(&self) -> Result<LoadConfigsResponse>;

    async fn model_info(&self, model: &str) -> Result<ModelInfoResponse>;

    async fn check_status(&self, model: &str, base_path: &str) -> Result<CheckStatusResponse>;

    async fn browse(&self, path: &str) -> Result<Vec<TreeNode>>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.endpoint(path)).json(body).send().await?;
        read_body(response).await
    }
}

/// Parse a response, turning `success: false` into a backend error
/// 解析响应，`success: false` 转为后端错误
async fn read_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let value: serde_json::Value = match response.json().await {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(ManagerError::Backend(format!("HTTP {}", status)))
        }
        Err(e) => return Err(e.into()),
    };

    if value.get("success").and_then(|s| s.as_bool()) == Some(false) {
        let message = value
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .unwrap_or("Request failed");
        return Err(ManagerError::Backend(message.to_string()));
    }

    serde_json::from_value(value)
        .map_err(|e| ManagerError::Backend(format!("Unexpected response: {}", e)))
}

#[async_trait]
impl ProgressSource for HttpBackend {
    async fn fetch_progress(&self) -> Result<ProgressSnapshot> {
        let response = self.client.get(self.endpoint("/progress")).send().await?;
        read_body(response).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn submit(&self, kind: OperationKind, request: &ActionRequest) -> Result<ActionResponse> {
        self.post(&format!("/{}", kind.as_str()), request).await
    }

    async fn load_configs(&self) -> Result<LoadConfigsResponse> {
        let response = self.client.get(self.endpoint("/load_configs")).send().await?;
        let mut configs: LoadConfigsResponse = read_body(response).await?;
        configs.models.sort();
        Ok(configs)
    }

    async fn model_info(&self, model: &str) -> Result<ModelInfoResponse> {
        self.post("/model_info", &ModelInfoRequest { model: model.to_string() }).await
    }

    async fn check_status(&self, model: &str, base_path: &str) -> Result<CheckStatusResponse> {
        let request = CheckStatusRequest {
            model: model.to_string(),
            base_path: base_path.to_string(),
        };
        self.post("/check_status", &request).await
    }

    async fn browse(&self, path: &str) -> Result<Vec<TreeNode>> {
        let request = BrowseRequest { path: path.to_string() };
        let response: BrowseResponse = self.post("/browse_directory", &request).await?;
        Ok(response.structure)
    }
}
