//! 翻译配置管理模块
//!
//! 提供设置文件的发现与加载（TOML + `.env` + 环境变量覆盖）、示例配置生成，
//! 以及运行前的凭据解析。设置面是一个扁平的键值结构，与原有的界面设置项
//! 一一对应。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::provider::ProviderKind;
use crate::translation::rates::DEFAULT_GEMINI_MODEL;

/// 翻译配置常量
pub mod constants {
    use std::time::Duration;

    /// 默认批次大小（条目数）
    pub const DEFAULT_BATCH_SIZE: usize = 600;
    /// 批次大小建议区间（仅告警，不强制）
    pub const BATCH_SIZE_ADVISORY_MIN: usize = 10;
    pub const BATCH_SIZE_ADVISORY_MAX: usize = 2000;

    /// 编排器的批次间冷却绝对下限，与模型无关
    pub const MIN_BATCH_COOLDOWN: Duration = Duration::from_millis(5_000);

    pub const DEFAULT_TARGET_LANGUAGE: &str = "Portuguese (Brazil)";
    pub const DEFAULT_PROJECT_NAME: &str = "Software Application";
    pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

    /// 配置文件查找路径，按顺序取第一个存在的
    pub const CONFIG_PATHS: &[&str] = &[
        "lingodiff.toml",
        ".lingodiff.toml",
        "~/.config/lingodiff/config.toml",
        "/etc/lingodiff/config.toml",
    ];

    /// 环境变量覆盖前缀（如 `LINGODIFF_GEMINI_API_KEY`）
    pub const ENV_PREFIX: &str = "LINGODIFF_";
}

/// 运行所需的全部设置
///
/// 所有字段都有默认值，配置文件里只写需要覆盖的项即可。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Gemini API 密钥；与 OpenAI 密钥同时配置时优先使用 Gemini
    pub gemini_api_key: Option<String>,
    /// OpenAI API 密钥
    pub openai_api_key: Option<String>,
    /// Gemini 模型标识，缺省使用免费档最均衡的模型
    pub gemini_model: Option<String>,
    /// OpenAI 模型标识
    pub openai_model: Option<String>,
    /// 目标语言名称（自然语言描述，直接进入提示词）
    pub target_language: String,
    /// 项目名称，作为术语上下文提供给模型
    pub project_name: String,
    /// 项目描述（可为空）
    pub project_description: String,
    /// 用户补充的自由文本翻译语境
    pub translation_context: String,
    /// 批次大小（条目数），建议区间 [10, 2000]
    pub batch_size: usize,
    /// 瞬时失败批次的最大重试次数。0 = 不重试（默认）：失败批次的条目
    /// 本次运行保持未翻译状态
    pub max_batch_retries: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            openai_api_key: None,
            gemini_model: None,
            openai_model: None,
            target_language: constants::DEFAULT_TARGET_LANGUAGE.to_string(),
            project_name: constants::DEFAULT_PROJECT_NAME.to_string(),
            project_description: String::new(),
            translation_context: String::new(),
            batch_size: constants::DEFAULT_BATCH_SIZE,
            max_batch_retries: 0,
        }
    }
}

/// 凭据解析结果：本次运行实际使用的服务商、密钥与模型
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
}

impl Settings {
    /// 发现并加载设置
    ///
    /// 先加载 `.env`，再按 [`constants::CONFIG_PATHS`] 顺序取第一个存在的
    /// 配置文件；都不存在则使用默认值。环境变量覆盖最后生效。
    pub fn load() -> TranslationResult<Self> {
        load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded);
                return Self::load_from(Path::new(expanded.as_ref()));
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        let mut settings = Self::default();
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// 从指定文件加载设置（环境变量覆盖仍然生效）
    pub fn load_from(path: &Path) -> TranslationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranslationError::ConfigError(format!("读取配置文件 {} 失败: {}", path.display(), e))
        })?;

        let mut settings: Settings = toml::from_str(&content)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// 应用 `LINGODIFF_*` 环境变量覆盖
    fn apply_env_overrides(&mut self) {
        let env = |name: &str| std::env::var(format!("{}{}", constants::ENV_PREFIX, name)).ok();

        if let Some(v) = env("GEMINI_API_KEY") {
            self.gemini_api_key = Some(v);
        }
        if let Some(v) = env("OPENAI_API_KEY") {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = env("GEMINI_MODEL") {
            self.gemini_model = Some(v);
        }
        if let Some(v) = env("OPENAI_MODEL") {
            self.openai_model = Some(v);
        }
        if let Some(v) = env("TARGET_LANGUAGE") {
            self.target_language = v;
        }
        if let Some(v) = env("BATCH_SIZE") {
            match v.parse() {
                Ok(n) => self.batch_size = n,
                Err(_) => tracing::warn!("环境变量 {}BATCH_SIZE 不是有效数字: {}", constants::ENV_PREFIX, v),
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example(path: &Path) -> TranslationResult<()> {
        let example = Settings {
            gemini_api_key: Some("AIza...".to_string()),
            gemini_model: Some(DEFAULT_GEMINI_MODEL.to_string()),
            ..Default::default()
        };
        let content = toml::to_string_pretty(&example)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            TranslationError::ConfigError(format!("写入配置文件 {} 失败: {}", path.display(), e))
        })
    }

    /// 解析本次运行使用的凭据与模型
    ///
    /// Gemini 密钥优先；没有任何密钥时返回配置错误（运行不会开始）。
    /// 含空白字符的密钥视为粘贴错误，在发起任何网络请求之前就拒绝。
    pub fn resolve_provider(&self) -> TranslationResult<ProviderProfile> {
        let (kind, key, field) = if let Some(key) = self.gemini_api_key.as_deref() {
            (ProviderKind::Gemini, key, "gemini_api_key")
        } else if let Some(key) = self.openai_api_key.as_deref() {
            (ProviderKind::OpenAi, key, "openai_api_key")
        } else {
            return Err(TranslationError::ConfigError(
                "未配置任何 API 密钥，请在配置文件中设置 gemini_api_key 或 openai_api_key".to_string(),
            ));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(TranslationError::ConfigError(format!(
                "配置项 {} 为空，请粘贴完整的密钥",
                field
            )));
        }
        if key.contains(char::is_whitespace) {
            return Err(TranslationError::ConfigError(format!(
                "配置项 {} 含有空格或多余文本，请只粘贴密钥本身（Gemini 密钥以 AIza 开头）",
                field
            )));
        }

        let model = match kind {
            ProviderKind::Gemini => self
                .gemini_model
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            ProviderKind::OpenAi => self
                .openai_model
                .clone()
                .unwrap_or_else(|| constants::DEFAULT_OPENAI_MODEL.to_string()),
        };

        Ok(ProviderProfile {
            kind,
            api_key: key.to_string(),
            model,
        })
    }

    /// 批次大小（带建议区间告警）
    pub fn effective_batch_size(&self) -> usize {
        let size = self.batch_size.max(1);
        if size < constants::BATCH_SIZE_ADVISORY_MIN || size > constants::BATCH_SIZE_ADVISORY_MAX {
            tracing::warn!(
                "批次大小 {} 超出建议区间 [{}, {}]，仍按配置执行",
                size,
                constants::BATCH_SIZE_ADVISORY_MIN,
                constants::BATCH_SIZE_ADVISORY_MAX
            );
        }
        size
    }
}

/// 加载 `.env` 文件（按约定顺序取第一个存在的）
fn load_dotenv() {
    let env_files = [".env.local", ".env"];

    for env_file in &env_files {
        if Path::new(env_file).exists() {
            if dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }
}
