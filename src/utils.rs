/// Path and display utility functions / 路径与显示工具函数

use std::path::{Path, PathBuf};

/// Join a relative path onto a base directory / 将相对路径拼接到基础目录
/// 1. Replace backslashes with forward slashes / 将反斜杠替换为正斜杠
/// 2. Drop leading / and empty or . segments / 去掉开头的 / 以及空段和 . 段
/// 3. Reject .. so the result never escapes base / 拒绝 .. 防止越出基础目录
pub fn join_relative(base: &Path, relative: &str) -> Result<PathBuf, String> {
    let relative = relative.replace('\\', "/");
    let mut joined = base.to_path_buf();

    for part in relative.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(format!("Path escapes base directory: {}", relative)),
            _ => joined.push(part),
        }
    }

    Ok(joined)
}

/// Extract file name from URL, removing query parameters / 从URL提取文件名（去掉查询参数）
pub fn file_name_from_url(raw: &str) -> String {
    let path = match url::Url::parse(raw) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => raw.split(['?', '#']).next().unwrap_or("").to_string(),
    };

    let last = path.rsplit('/').next().unwrap_or("");
    urlencoding::decode(last)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string())
}

/// Human readable size: 1536 -> "1.5 KB" / 可读文件大小
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    let rounded = (size * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[unit])
    } else {
        format!("{:.1} {}", rounded, UNITS[unit])
    }
}

/// Mask a Hugging Face token for display: keeps the "hf_" prefix / 掩码显示令牌
pub fn mask_token(token: &str) -> String {
    let hidden = token.chars().count().saturating_sub(3);
    format!("hf_{}", "●".repeat(hidden))
}
