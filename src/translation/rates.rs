//! 模型速率模型
//!
//! 静态的按模型请求预算表，以及由模型标识推导批次间冷却时长的纯函数。
//! 预算数值对应免费档的公开限额；未知模型一律落到保守档位，绝不 panic。

use std::time::Duration;

/// 单个模型的请求预算
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// 每分钟请求数
    pub requests_per_minute: u32,
    /// 每日请求数
    pub requests_per_day: u32,
    /// 每分钟令牌数
    pub tokens_per_minute: u32,
}

/// 已知模型的预算表
///
/// Flash 系列：高速、高配额；Pro 系列：更强但限额更低。表键同时用作
/// 带日期后缀模型名（如 `gemini-1.5-flash-002`）的子串匹配依据。
pub const MODEL_SPECS: &[(&str, ModelSpec)] = &[
    (
        "gemini-1.5-flash",
        ModelSpec {
            requests_per_minute: 15,
            requests_per_day: 1500,
            tokens_per_minute: 1_000_000,
        },
    ),
    (
        "gemini-1.5-flash-8b",
        ModelSpec {
            requests_per_minute: 15,
            requests_per_day: 1500,
            tokens_per_minute: 1_000_000,
        },
    ),
    (
        "gemini-1.5-pro",
        ModelSpec {
            requests_per_minute: 2,
            requests_per_day: 50,
            tokens_per_minute: 32_000,
        },
    ),
    // 旧版，但免费档限额往往高于 1.5 Pro
    (
        "gemini-1.0-pro",
        ModelSpec {
            requests_per_minute: 15,
            requests_per_day: 1500,
            tokens_per_minute: 32_000,
        },
    ),
];

/// 免费档最均衡的默认模型
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// 令牌预算低于等于该值的模型视为"重型"，强制放缓节奏
const LOW_TPM_THRESHOLD: u32 = 32_000;

/// 重型模型的最小冷却时长
const HEAVY_MODEL_FLOOR: Duration = Duration::from_millis(20_000);

/// 查找模型预算：精确匹配 → 表键为模型名子串 → 按 flash 标记回退
pub fn lookup_spec(model: &str) -> ModelSpec {
    if let Some((_, spec)) = MODEL_SPECS.iter().find(|(key, _)| *key == model) {
        return *spec;
    }
    if let Some((_, spec)) = MODEL_SPECS.iter().find(|(key, _)| model.contains(key)) {
        return *spec;
    }

    // 完全未知的模型：看起来像 flash 就按 flash，否则按 Pro 档保守处理
    let fallback = if model.contains("flash") {
        "gemini-1.5-flash"
    } else {
        "gemini-1.5-pro"
    };
    MODEL_SPECS
        .iter()
        .find(|(key, _)| *key == fallback)
        .map(|(_, spec)| *spec)
        .unwrap_or(ModelSpec {
            requests_per_minute: 2,
            requests_per_day: 50,
            tokens_per_minute: 32_000,
        })
}

/// 满足 RPM 限制所需的请求间隔（含 10% 安全余量）
///
/// 令牌预算偏低的模型额外抬到 20 秒下限，避免大块上下文连发。
/// 对任意输入都返回确定的非负时长。
pub fn sleep_time(model: &str) -> Duration {
    let spec = lookup_spec(model);
    let ms_per_request = (60_000.0 / spec.requests_per_minute as f64) * 1.1;
    let duration = Duration::from_millis(ms_per_request as u64);

    if spec.tokens_per_minute <= LOW_TPM_THRESHOLD {
        duration.max(HEAVY_MODEL_FLOOR)
    } else {
        duration
    }
}

/// 编排器实际使用的批次间冷却时长
///
/// 在 [`sleep_time`] 之上再套一个与模型无关的 5 秒绝对下限：大批次的服务端
/// 生成本身就需要数秒，更快的轮询没有收益。
pub fn batch_cooldown(model: &str) -> Duration {
    sleep_time(model).max(super::config::constants::MIN_BATCH_COOLDOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let spec = lookup_spec("gemini-1.5-pro");
        assert_eq!(spec.requests_per_minute, 2);
        assert_eq!(spec.requests_per_day, 50);
    }

    #[test]
    fn test_substring_match_for_dated_models() {
        // 带日期后缀的模型名落到对应的基础档位
        let spec = lookup_spec("gemini-1.5-flash-002");
        assert_eq!(spec.requests_per_minute, 15);
        assert_eq!(spec.tokens_per_minute, 1_000_000);
    }

    #[test]
    fn test_unknown_flash_like_model() {
        let spec = lookup_spec("gemini-3.0-flash-preview");
        assert_eq!(spec.tokens_per_minute, 1_000_000);
    }

    #[test]
    fn test_unknown_model_falls_back_conservatively() {
        let spec = lookup_spec("gpt-4o");
        assert_eq!(spec.requests_per_minute, 2, "unknown models take the pro profile");
    }

    #[test]
    fn test_flash_cooldown_below_pro_and_both_floored() {
        let flash = batch_cooldown("gemini-1.5-flash");
        let pro = batch_cooldown("gemini-1.5-pro");

        assert!(flash < pro, "flash tier has a higher RPM budget than pro");
        assert!(flash >= Duration::from_millis(5_000));
        assert!(pro >= Duration::from_millis(5_000));
    }

    #[test]
    fn test_heavy_model_floor() {
        // 1.0 Pro 的 RPM 很高，但 TPM 预算低，被抬到 20 秒
        assert_eq!(sleep_time("gemini-1.0-pro"), Duration::from_millis(20_000));
        // 1.5 Pro 纯按 RPM 计算已超过 20 秒
        assert_eq!(sleep_time("gemini-1.5-pro"), Duration::from_millis(33_000));
    }

    #[test]
    fn test_sleep_time_formula_with_margin() {
        // 60000 / 15 * 1.1 = 4400ms
        assert_eq!(sleep_time("gemini-1.5-flash"), Duration::from_millis(4_400));
    }
}
