//! 候选条目选择与批次切分
//!
//! 从条目列表中选出本次运行需要翻译的键值对，并按配置的批次大小切成
//! 有序批次。选择是纯函数：同一文档对上运行两次，得到相同的候选集合
//! 与顺序。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::TranslationEntry;

/// 翻译模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslateMode {
    /// 仅翻译缺失条目（目标缺失、为空、或与源文本相同）
    Missing,
    /// 重新翻译所有源值为字符串的条目（覆盖现有译文）
    All,
}

impl std::fmt::Display for TranslateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateMode::Missing => f.write_str("missing"),
            TranslateMode::All => f.write_str("all"),
        }
    }
}

/// 条目是否视为"尚未翻译"
///
/// 目标缺失、为空字符串、或与源文本逐字相同（大概率是直接复制过来还没翻）
/// 都算缺失。非字符串的目标值不参与判断。
pub fn is_missing(entry: &TranslationEntry) -> bool {
    match &entry.target {
        None => true,
        Some(Value::String(target)) => {
            target.is_empty() || entry.source_text() == Some(target.as_str())
        }
        Some(_) => false,
    }
}

/// 按模式选出候选 (键, 源文本) 对
///
/// 只有源值为字符串的条目才可能成为候选；结构化值（对象/数组/数字等）
/// 从不自动翻译。输出顺序与条目列表顺序一致。
pub fn select_candidates(
    entries: &[TranslationEntry],
    mode: TranslateMode,
) -> Vec<(String, String)> {
    entries
        .iter()
        .filter_map(|entry| {
            let source = entry.source_text()?;
            let selected = match mode {
                TranslateMode::All => true,
                TranslateMode::Missing => is_missing(entry),
            };
            selected.then(|| (entry.key.clone(), source.to_string()))
        })
        .collect()
}

/// 把候选列表切成至多 `batch_size` 条的连续批次
pub fn chunk_batches(
    candidates: &[(String, String)],
    batch_size: usize,
) -> Vec<Vec<(String, String)>> {
    candidates
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str, source: Value, target: Option<Value>) -> TranslationEntry {
        TranslationEntry::new(key, Some(source), target)
    }

    #[test]
    fn test_spec_scenario_identical_and_absent() {
        // 基准 {a: "Hello", b: "World"}，目标 {a: "Hello"}（与源相同，未翻译）
        let entries = vec![
            entry("a", json!("Hello"), Some(json!("Hello"))),
            entry("b", json!("World"), None),
        ];

        let missing = select_candidates(&entries, TranslateMode::Missing);
        assert_eq!(missing.len(), 2, "identical-to-source and absent both count");

        let all = select_candidates(&entries, TranslateMode::All);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_missing_skips_already_translated() {
        let entries = vec![
            entry("done", json!("Hello"), Some(json!("Olá"))),
            entry("empty", json!("World"), Some(json!(""))),
        ];

        let missing = select_candidates(&entries, TranslateMode::Missing);
        assert_eq!(missing, vec![("empty".to_string(), "World".to_string())]);
    }

    #[test]
    fn test_structured_sources_never_selected() {
        let entries = vec![
            entry("nums", json!([1, 2, 3]), None),
            entry("count", json!(42), None),
            entry("flag", json!(true), None),
            entry("text", json!("Hi"), None),
        ];

        let all = select_candidates(&entries, TranslateMode::All);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, "text");
    }

    #[test]
    fn test_selection_is_idempotent() {
        let entries = vec![
            entry("a", json!("Hello"), Some(json!("Hello"))),
            entry("b", json!("World"), None),
            entry("c", json!("Done"), Some(json!("Feito"))),
        ];

        let first = select_candidates(&entries, TranslateMode::Missing);
        let second = select_candidates(&entries, TranslateMode::Missing);
        assert_eq!(first, second, "same document pair yields same set and order");
    }

    #[test]
    fn test_chunking_sizes_and_order() {
        let candidates: Vec<(String, String)> = (0..7)
            .map(|i| (format!("k{}", i), format!("v{}", i)))
            .collect();

        let batches = chunk_batches(&candidates, 3);
        assert_eq!(batches.len(), 3, "ceil(7 / 3) batches");
        assert_eq!(batches[0].len(), 3);
        assert_eq!(batches[2].len(), 1);
        assert_eq!(batches[2][0].0, "k6");
    }

    #[test]
    fn test_non_string_target_not_missing() {
        let entries = vec![entry("obj", json!("Hi"), Some(json!({ "x": 1 })))];
        assert!(!is_missing(&entries[0]));
    }
}
