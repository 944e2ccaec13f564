//! # LingoDiff Library
//!
//! 用于维护本地化 JSON 文件的工具库：将"目标"翻译文件与"基准"文件保持同步，
//! 并通过生成式 AI 接口（Gemini / OpenAI）批量翻译缺失或过期的条目。
//!
//! ## 模块组织
//!
//! - `document` - JSON 文档的扁平化/还原与条目模型
//! - `translation` - 翻译子系统（配置、速率模型、服务商客户端、批次编排、检查点）

pub mod document;
pub mod translation;

// Re-export commonly used items for convenience
pub use document::{flatten, load_entry_pair, unflatten, TranslationEntry};
pub use translation::error::{FailureKind, TranslationError, TranslationResult};
pub use translation::pipeline::{
    BatchOrchestrator, CancelFlag, ProgressUpdate, RunOutcome, TranslateMode,
};
pub use translation::Settings;
