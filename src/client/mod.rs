//! Terminal client: submits actions and follows them through `/progress`
//! 终端客户端：提交操作并通过 `/progress` 跟踪进度

pub mod backend;
pub mod classifier;
pub mod poller;
pub mod session;
pub mod terminal;

pub use backend::{Backend, HttpBackend};
pub use classifier::{Classification, KeywordClassifier, LogClassifier};
pub use poller::{
    display_index, Notice, NoticeLevel, PollOutcome, PollReport, ProgressDisplay, ProgressPoller,
    ProgressSource, ProgressView, RenderedEntry, SampleInterpreter, Step,
};
pub use session::{BusyGuard, ClientGate, Session};
pub use terminal::TerminalView;
