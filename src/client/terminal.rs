//! Terminal rendering / 终端渲染

use indicatif::{ProgressBar, ProgressStyle};

use super::classifier::Classification;
use super::poller::{Notice, NoticeLevel, ProgressDisplay, ProgressView, RenderedEntry};
use crate::models::{CheckStatusResponse, ModelInfoResponse, TreeNode};
use crate::utils::format_file_size;

/// indicatif-backed progress view / 基于 indicatif 的进度视图
///
/// The log is kept as a model and fully replaced on every sample; only lines not yet
/// echoed are printed, unless the new log no longer extends what was printed.
pub struct TerminalView {
    bar: ProgressBar,
    log: Vec<RenderedEntry>,
    printed: usize,
    #[cfg(test)]
    transcript: Vec<String>,
    refresh_pending: bool,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::with_template("{msg:40} {bar:40} {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self {
            bar,
            log: Vec::new(),
            printed: 0,
            #[cfg(test)]
            transcript: Vec::new(),
            refresh_pending: false,
        }
    }

    pub fn log(&self) -> &[RenderedEntry] {
        &self.log
    }

    #[cfg(test)]
    fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Whether the directory view should be reloaded; clears the flag
    pub fn take_refresh(&mut self) -> bool {
        std::mem::take(&mut self.refresh_pending)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn println(&mut self, line: String) {
        self.bar.println(&line);
        #[cfg(test)]
        self.transcript.push(line);
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressView for TerminalView {
    fn show_progress(&mut self, display: &ProgressDisplay) {
        self.bar.set_length(display.total);
        self.bar.set_position(display.index);
        let detail = match (&display.current_file, &display.current_progress) {
            (_, Some(progress)) => progress.clone(),
            (Some(file), None) => file.clone(),
            (None, None) => display.headline(),
        };
        self.bar.set_message(detail);
    }

    fn show_log(&mut self, entries: &[RenderedEntry]) {
        let extends = self.printed <= entries.len()
            && self.log[..self.printed] == entries[..self.printed];
        if !extends {
            self.printed = 0;
        }
        for entry in &entries[self.printed..] {
            self.println(log_line(entry));
        }
        self.printed = entries.len();
        self.log = entries.to_vec();
    }

    fn show_notice(&mut self, notice: &Notice) {
        self.println(notice_line(notice));
    }

    fn refresh_directory(&mut self) {
        self.refresh_pending = true;
    }
}

pub fn log_line(entry: &RenderedEntry) -> String {
    let mark = match entry.class {
        Classification::Success => "✔",
        Classification::Error => "✘",
        Classification::Skipped => "↷",
        Classification::NotFound => "?",
        Classification::Info => "•",
    };
    format!("  {} {}", mark, entry.message)
}

pub fn notice_line(notice: &Notice) -> String {
    let label = match notice.level {
        NoticeLevel::Success => "[success]",
        NoticeLevel::Info => "[info]",
        NoticeLevel::Error => "[error]",
    };
    format!("{} {}", label, notice.message)
}

/// Indented directory tree / 缩进的目录树
pub fn render_tree(nodes: &[TreeNode]) -> Vec<String> {
    let mut lines = Vec::new();
    push_nodes(nodes, 0, &mut lines);
    lines
}

fn push_nodes(nodes: &[TreeNode], depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        if node.is_folder() {
            lines.push(format!("{}{}/", indent, node.name));
            if let Some(children) = &node.children {
                push_nodes(children, depth + 1, lines);
            }
        } else {
            let size = format_file_size(node.size.unwrap_or(0));
            lines.push(format!("{}{} ({})", indent, node.name, size));
        }
    }
}

pub fn render_status(status: &CheckStatusResponse) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {} of {} files present in {}",
        status.model, status.found, status.total, status.base_path
    )];
    for file in &status.file_status {
        let mark = if file.exists { "✔" } else { "✘" };
        lines.push(format!("  {} {}", mark, file.path));
    }
    lines
}

pub fn render_model_info(info: &ModelInfoResponse) -> Vec<String> {
    let mut lines = vec![format!("{} ({} files)", info.model, info.files.len())];
    if info.requires_hf {
        lines.push("  Requires a Hugging Face token".to_string());
    }
    for file in &info.files {
        let directory = file.directory.trim_matches('/');
        lines.push(format!("  {}/{}  <- {}", directory, file.file_name(), file.url));
    }
    lines
}
