//! File transfer module / 文件传输模块
//!
//! Streams a URL into `<target>.part` and renames it into place once complete, so an
//! interrupted download never looks like an existing file on the next run.
//! 先写入 .part 临时文件，完成后再重命名，避免中断的下载被当作已存在文件。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::config::TransferConfig;
use crate::error::{ManagerError, Result};

/// 进度回调类型 / Progress callback type
/// 参数: (已完成字节数, 总字节数) / Parameters: (completed_bytes, total_bytes)
pub type ProgressCallback = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Progress is reported at most once per this many bytes / 每传输这么多字节回调一次
const REPORT_EVERY: u64 = 1024 * 1024;

#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        token: Option<&str>,
        on_progress: ProgressCallback,
    ) -> Result<u64>;
}

pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(config: &TransferConfig) -> Result<Self> {
        // No overall timeout: model files can take hours / 不设总超时
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs.max(1)))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    async fn stream_to(
        &self,
        url: &str,
        part: &Path,
        token: Option<&str>,
        on_progress: &ProgressCallback,
    ) -> Result<u64> {
        let mut request = self.client.get(url);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ManagerError::Transfer(format!("HTTP {}", status)));
        }

        let total = response.content_length();
        let mut file = tokio::fs::File::create(part).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        let mut last_report: u64 = 0;

        on_progress(0, total);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if written - last_report >= REPORT_EVERY {
                last_report = written;
                on_progress(written, total);
            }
        }
        file.flush().await?;
        drop(file);

        if let Some(expected) = total {
            if written != expected {
                return Err(ManagerError::Transfer(format!(
                    "Incomplete download: got {} of {} bytes",
                    written, expected
                )));
            }
        }
        on_progress(written, total);
        Ok(written)
    }
}

#[async_trait]
impl FileTransfer for HttpDownloader {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        token: Option<&str>,
        on_progress: ProgressCallback,
    ) -> Result<u64> {
        let part = part_path(dest);
        match self.stream_to(url, &part, token, &on_progress).await {
            Ok(written) => {
                tokio::fs::rename(&part, dest).await?;
                Ok(written)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&part).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!("Failed to remove partial file {:?}: {}", part, rm);
                    }
                }
                Err(e)
            }
        }
    }
}

/// `model.safetensors` -> `model.safetensors.part`
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<(u64, Option<u64>)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb: ProgressCallback =
            Arc::new(move |done, total| sink.lock().unwrap().push((done, total)));
        (cb, seen)
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/m/a.safetensors")),
            PathBuf::from("/m/a.safetensors.part")
        );
    }

    #[tokio::test]
    async fn test_fetch_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flux1-dev.safetensors"))
            .and(header("authorization", "Bearer hf_secret"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("flux1-dev.safetensors");
        let downloader = HttpDownloader::new(&TransferConfig::default()).unwrap();
        let (cb, seen) = recorder();

        let written = downloader
            .fetch(&format!("{}/flux1-dev.safetensors", server.uri()), &dest, Some("hf_secret"), cb)
            .await
            .unwrap();

        assert_eq!(written, 4096);
        assert_eq!(std::fs::read(&dest).unwrap().len(), 4096);
        assert!(!part_path(&dest).exists());
        assert_eq!(seen.lock().unwrap().last(), Some(&(4096, Some(4096))));
    }

    #[tokio::test]
    async fn test_http_error_leaves_nothing_behind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("gated.safetensors");
        let downloader = HttpDownloader::new(&TransferConfig::default()).unwrap();
        let (cb, _) = recorder();

        let err = downloader
            .fetch(&format!("{}/gated.safetensors", server.uri()), &dest, None, cb)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("401"));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }
}
