//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型，以及针对服务商失败消息的分类器。分类器是整个系统中
//! 唯一基于错误文本做判断的地方：服务商措辞变化或未来换用结构化错误 API 时，
//! 只需要改这里，编排器不受影响。

use thiserror::Error;

/// 翻译错误类型
///
/// 所有面向用户的错误消息必须包含足够的行动信息（哪个模型超额、哪个配置项
/// 有问题），它们会直接展示给使用者，而不仅仅用于诊断。
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误（缺失/格式错误的 API 密钥等），运行不会开始
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 当前模式下没有任何待翻译条目，运行不会开始
    #[error("没有需要翻译的条目（当前模式下所有条目均已翻译）")]
    NoWork,

    /// 基准/目标文档读取或解析失败
    #[error("文档错误: {0}")]
    DocumentError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 服务商响应解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 服务商返回的失败消息（由 [`FailureKind::classify`] 进一步分类）
    #[error("翻译服务错误: {0}")]
    ProviderError(String),

    /// 每日配额耗尽，运行终止；建议换用其他模型
    #[error("模型 {model} 每日配额已耗尽，请在设置中切换模型后重试。已完成的进度均已保存。详情: {message}")]
    DailyQuotaExceeded { model: String, message: String },

    /// 触发每分钟速率限制（429），本次运行不再重试
    #[error("请求频率超限 (429)，冷却机制未能避开限流。请改用速率配额更高的模型。详情: {0}")]
    RateLimited(String),

    /// 认证失败（401 / API 密钥问题）
    #[error("API 密钥验证失败，请在设置中检查密钥是否完整粘贴。详情: {0}")]
    AuthFailure(String),

    /// 检查点写入失败。已翻译内容的静默丢失不可接受，必须作为终止错误上报
    #[error("进度保存失败: {0}")]
    PersistenceError(String),
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        TranslationError::NetworkError(error.to_string())
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::ParseError(format!("JSON 解析失败: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ConfigError(format!("TOML 解析失败: {}", error))
    }
}

/// 服务商失败的分类结果
///
/// 对失败消息文本做封闭的子串匹配。分类故意偏保守：模糊的 429/401/配额信号
/// 一律按致命处理，持续冲击一个正在拒绝请求的服务商可能招致账号级处罚。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 每日配额耗尽，致命，终止运行并提示换模型
    DailyQuota,
    /// 每分钟速率限制（429），本次运行致命，停止并上报而非盲目循环
    RateLimited,
    /// 认证失败（401 / "API Key"），致命，提示检查凭据
    AuthFailure,
    /// 其余失败，跳过该批次，运行继续
    Transient,
}

impl FailureKind {
    /// 根据失败消息文本分类
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();

        if msg.contains("quota")
            && (msg.contains("day") || msg.contains("daily") || msg.contains("resource exhausted"))
        {
            return FailureKind::DailyQuota;
        }
        if msg.contains("429") {
            return FailureKind::RateLimited;
        }
        if msg.contains("401") || msg.contains("api key") {
            return FailureKind::AuthFailure;
        }

        FailureKind::Transient
    }

    /// 是否应终止整个运行
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FailureKind::Transient)
    }

    /// 将分类结果提升为携带行动信息的终止错误
    pub fn into_error(self, model: &str, message: String) -> TranslationError {
        match self {
            FailureKind::DailyQuota => TranslationError::DailyQuotaExceeded {
                model: model.to_string(),
                message,
            },
            FailureKind::RateLimited => TranslationError::RateLimited(message),
            FailureKind::AuthFailure => TranslationError::AuthFailure(message),
            FailureKind::Transient => TranslationError::ProviderError(message),
        }
    }
}
