//! 文本处理管道模块 - 候选条目选择与批次编排

pub mod candidates;
pub mod orchestrator;

pub use candidates::{chunk_batches, select_candidates, TranslateMode};
pub use orchestrator::{BatchOrchestrator, CancelFlag, ProgressUpdate, RunOutcome};
