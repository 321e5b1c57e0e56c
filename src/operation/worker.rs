//! Download/delete workers / 下载与删除执行器
//!
//! Each manifest entry produces exactly one log entry, in manifest order.

use std::path::PathBuf;
use std::sync::Arc;

use super::models::LogEntry;
use super::tracker::RunHandle;
use super::types::Outcome;
use crate::catalog::ManifestEntry;
use crate::error::Result;
use crate::transfer::{FileTransfer, ProgressCallback};
use crate::utils::format_file_size;

/// Work handed from the gate to a worker / 由 ActionGate 交给执行器的任务
#[derive(Debug, Clone)]
pub struct Job {
    pub model: String,
    pub base_path: PathBuf,
    pub files: Vec<ManifestEntry>,
    pub token: Option<String>,
}

pub async fn run_download(run: RunHandle, job: Job, transfer: Arc<dyn FileTransfer>) {
    tracing::info!(
        "Downloading {} files of {} into {:?}",
        job.files.len(),
        job.model,
        job.base_path
    );

    for entry in &job.files {
        let file = entry.file_name();
        run.set_current(&file, format!("Checking {}...", file));

        let target = match entry.target_path(&job.base_path) {
            Ok(path) => path,
            Err(e) => {
                run.set_progress(format!("{}: Download failed", file));
                let message = format!("Failed to download: {} - {}", file, e);
                run.record(LogEntry::new(Outcome::Error, &file, message));
                continue;
            }
        };

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            tracing::debug!("File already exists: {:?} - skipping", target);
            run.set_progress(format!("{}: File already exists", file));
            let message = format!("File already exists: {}", file);
            run.record(LogEntry::new(Outcome::Skipped, &file, message));
            continue;
        }

        run.set_progress(format!("{}: Starting download...", file));
        let result: Result<u64> = async {
            if let Some(dir) = target.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
            transfer
                .fetch(&entry.url, &target, job.token.as_deref(), progress_callback(&run, &file))
                .await
        }
        .await;

        match result {
            Ok(bytes) => {
                tracing::info!("Downloaded {} ({})", file, format_file_size(bytes));
                run.set_progress(format!("{}: Download completed", file));
                let message = format!("Successfully downloaded: {}", file);
                run.record(LogEntry::new(Outcome::Success, &file, message));
            }
            Err(e) => {
                tracing::warn!("Download failed for {}: {}", file, e);
                run.set_progress(format!("{}: Download failed", file));
                let message = format!("Failed to download: {} - {}", file, e);
                run.record(LogEntry::new(Outcome::Error, &file, message));
            }
        }
    }

    let state = run.state();
    let summary = download_summary(
        state.count(Outcome::Success),
        state.count(Outcome::Skipped),
        state.count(Outcome::Error),
    );
    run.finish(summary);
}

pub async fn run_delete(run: RunHandle, job: Job) {
    tracing::info!("Deleting {} files of {} from {:?}", job.files.len(), job.model, job.base_path);

    for entry in &job.files {
        let file = entry.file_name();
        run.set_current(&file, format!("{}: Checking for deletion...", file));

        let target = match entry.target_path(&job.base_path) {
            Ok(path) => path,
            Err(e) => {
                run.set_progress(format!("{}: Deletion failed", file));
                let message = format!("Failed to delete: {} - {}", file, e);
                run.record(LogEntry::new(Outcome::Error, &file, message));
                continue;
            }
        };

        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                tracing::info!("Deleted {:?}", target);
                run.set_progress(format!("{}: Deleted successfully", file));
                let message = format!("Successfully deleted: {}", file);
                run.record(LogEntry::new(Outcome::Success, &file, message));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                run.set_progress(format!("{}: File not found", file));
                let message = format!("File not found: {}", file);
                run.record(LogEntry::new(Outcome::NotFound, &file, message));
            }
            Err(e) => {
                tracing::warn!("Error deleting {:?}: {}", target, e);
                run.set_progress(format!("{}: Deletion failed", file));
                let message = format!("Failed to delete: {} - {}", file, e);
                run.record(LogEntry::new(Outcome::Error, &file, message));
            }
        }
    }

    let state = run.state();
    let summary = delete_summary(
        state.count(Outcome::Success),
        state.count(Outcome::NotFound),
        state.count(Outcome::Error),
    );
    run.finish(summary);
}

fn progress_callback(run: &RunHandle, file: &str) -> ProgressCallback {
    let reporter = run.reporter();
    let file = file.to_string();
    Arc::new(move |done, total| {
        let line = match total {
            Some(total) if total > 0 => format!(
                "{}: {}% of {}",
                file,
                done.saturating_mul(100) / total,
                format_file_size(total)
            ),
            _ => format!("{}: {} downloaded", file, format_file_size(done)),
        };
        reporter.set_progress(line);
    })
}

pub fn download_summary(downloaded: usize, skipped: usize, errors: usize) -> String {
    if errors > 0 {
        format!(
            "Completed with {} errors, {} downloaded, {} already existed",
            errors, downloaded, skipped
        )
    } else if skipped > 0 {
        format!("Completed: {} downloaded, {} file(s) already existed", downloaded, skipped)
    } else {
        format!("{} file(s) downloaded successfully", downloaded)
    }
}

pub fn delete_summary(deleted: usize, not_found: usize, errors: usize) -> String {
    if errors > 0 {
        format!(
            "Deletion completed with {} errors, {} deleted, {} not found",
            errors, deleted, not_found
        )
    } else if not_found > 0 {
        format!("Deletion completed: {} deleted, {} files were not found", deleted, not_found)
    } else {
        format!("All {} files deleted successfully", deleted)
    }
}
