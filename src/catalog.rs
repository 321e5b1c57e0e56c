//! Model catalog / 模型配置目录
//!
//! Loads the model package document (`{ name: { hf, files: [...] } }`) from a URL or a
//! local file and keeps the last good copy in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;
use crate::error::{ManagerError, Result};
use crate::utils::{file_name_from_url, join_relative};

/// One file of a model package / 模型包中的单个文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub url: String,
}

impl ManifestEntry {
    /// Provided filename, or the last URL path segment / 指定的文件名，否则取 URL 最后一段
    pub fn file_name(&self) -> String {
        match self.filename.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => file_name_from_url(&self.url),
        }
    }

    /// Where the file lives under `base` / 文件在 base 下的完整路径
    pub fn target_path(&self, base: &Path) -> Result<PathBuf> {
        let name = self.file_name();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ManagerError::validation(format!("Invalid file name for {}", self.url)));
        }
        let dir = join_relative(base, &self.directory).map_err(ManagerError::Validation)?;
        Ok(dir.join(name))
    }
}

/// 模型包配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Downloads need a Hugging Face token / 下载需要 HF 令牌
    #[serde(rename = "hf", default)]
    pub requires_hf: bool,
    #[serde(default)]
    pub files: Vec<ManifestEntry>,
}

/// Where the catalog document comes from / 配置文档来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Remote(String),
    File(PathBuf),
}

impl CatalogSource {
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::Remote(source.to_string())
        } else {
            Self::File(PathBuf::from(source))
        }
    }
}

impl std::fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{}", url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub struct ModelCatalog {
    source: CatalogSource,
    client: reqwest::Client,
    models: RwLock<BTreeMap<String, ModelConfig>>,
}

impl ModelCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            source: CatalogSource::parse(&config.source),
            client,
            models: RwLock::new(BTreeMap::new()),
        })
    }

    /// Build a catalog from already-parsed models / 使用已解析的模型构造
    pub fn from_models(models: BTreeMap<String, ModelConfig>) -> Self {
        Self {
            source: CatalogSource::File(PathBuf::new()),
            client: reqwest::Client::new(),
            models: RwLock::new(models),
        }
    }

    /// Fetch the document again; on failure the previous catalog is kept
    /// 重新拉取配置；失败时保留旧数据
    pub async fn reload(&self) -> Result<usize> {
        tracing::info!("Loading model configurations from: {}", self.source);
        let content = match &self.source {
            CatalogSource::Remote(url) => {
                let response = self.client.get(url).send().await?.error_for_status()?;
                response.text().await?
            }
            CatalogSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ManagerError::Catalog(format!("{}: {}", path.display(), e)))?,
        };

        let models: BTreeMap<String, ModelConfig> = serde_json::from_str(&content)
            .map_err(|e| ManagerError::Catalog(format!("invalid JSON: {}", e)))?;
        let count = models.len();
        *self.models.write() = models;

        tracing::info!("Successfully loaded {} model configurations", count);
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<ModelConfig> {
        self.models.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.models.read().keys().cloned().collect()
    }
}
