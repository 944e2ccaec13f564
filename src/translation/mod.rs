//! 翻译子系统
//!
//! 采用清晰的模块化架构：
//! - **config**: 设置加载与凭据解析
//! - **rates**: 按模型的请求预算表与冷却计算
//! - **provider**: 服务商边界契约与 Gemini/OpenAI 客户端
//! - **pipeline**: 候选选择、批次切分与运行编排
//! - **storage**: 检查点写入
//! - **error**: 统一错误类型与失败分类器
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::path::Path;
//! use lingodiff::document::load_entry_pair;
//! use lingodiff::translation::pipeline::{BatchOrchestrator, TranslateMode};
//! use lingodiff::translation::provider::GenerativeClient;
//! use lingodiff::translation::storage::CheckpointWriter;
//! use lingodiff::translation::Settings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! let profile = settings.resolve_provider()?;
//! let entries = load_entry_pair(Path::new("en.json"), Path::new("pt.json"))?;
//!
//! let orchestrator = BatchOrchestrator::new(
//!     GenerativeClient::new(profile),
//!     settings,
//!     CheckpointWriter::new("pt.json"),
//! );
//! let outcome = orchestrator.run(entries, TranslateMode::Missing).await?;
//! println!("翻译了 {} 条", outcome.translated);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod rates;
pub mod storage;

pub use config::{ProviderProfile, Settings};
pub use error::{FailureKind, TranslationError, TranslationResult};
pub use pipeline::{BatchOrchestrator, CancelFlag, ProgressUpdate, RunOutcome, TranslateMode};
pub use provider::{GenerativeClient, ProviderKind, TranslationProvider, TranslationRequest};
pub use storage::CheckpointWriter;
