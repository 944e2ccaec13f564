//! 检查点写入器
//!
//! 每个批次成功后（以及运行结束时再一次）把累计的译文合并回目标文档结构
//! 并落盘。崩溃或强制退出最多丢失一个在途批次的工作量；落盘的文件永远是
//! 结构完整、可独立加载的 JSON 文档，不会出现半截碎片。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::document::{to_pretty_string, unflatten, TranslationEntry};
use crate::translation::error::{TranslationError, TranslationResult};

/// 检查点写入器
///
/// 持有目标文件路径；每次写入都整体覆盖之前的目标文件。
pub struct CheckpointWriter {
    path: PathBuf,
}

impl CheckpointWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 合并并持久化当前进度
    ///
    /// 对条目列表中的每一项，按优先级取值：
    /// 1. 本次运行新产生的译文
    /// 2. 原有的目标值
    /// 3. 两者皆无 → 整体省略该键
    ///
    /// 合并结果经 `unflatten` 还原为嵌套文档，以 4 空格缩进写入。
    pub fn write(
        &self,
        entries: &[TranslationEntry],
        translations: &HashMap<String, String>,
    ) -> TranslationResult<()> {
        let document = merge_document(entries, translations);
        let content = to_pretty_string(&document)?;

        std::fs::write(&self.path, content).map_err(|e| {
            TranslationError::PersistenceError(format!(
                "写入目标文件 {} 失败: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!("检查点已写入: {}", self.path.display());
        Ok(())
    }
}

/// 把累计译文合并进条目列表，得到完整的目标文档
pub fn merge_document(
    entries: &[TranslationEntry],
    translations: &HashMap<String, String>,
) -> Value {
    let flat: Vec<(String, Value)> = entries
        .iter()
        .filter_map(|entry| {
            let value = match translations.get(&entry.key) {
                Some(text) => Some(Value::String(text.clone())),
                None => entry.target.clone(),
            };
            value.map(|v| (entry.key.clone(), v))
        })
        .collect();

    unflatten(&flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str, source: Value, target: Option<Value>) -> TranslationEntry {
        TranslationEntry::new(key, Some(source), target)
    }

    #[test]
    fn test_merge_priority_new_then_existing_then_omit() {
        let entries = vec![
            entry("a", json!("Hello"), Some(json!("old"))),
            entry("b", json!("World"), Some(json!("Mundo"))),
            entry("c", json!("Bye"), None),
        ];
        let mut translations = HashMap::new();
        translations.insert("a".to_string(), "novo".to_string());

        let doc = merge_document(&entries, &translations);
        assert_eq!(doc, json!({ "a": "novo", "b": "Mundo" }));
    }

    #[test]
    fn test_structured_targets_carried_through() {
        let entries = vec![
            entry("nums", json!([1, 2]), Some(json!([1, 2]))),
            entry("msg", json!("Hi"), None),
        ];
        let doc = merge_document(&entries, &HashMap::new());
        assert_eq!(doc, json!({ "nums": [1, 2] }));
    }

    #[test]
    fn test_write_overwrites_previous_checkpoint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pt.json");
        std::fs::write(&path, "garbage that is not json").expect("seed file");

        let writer = CheckpointWriter::new(&path);
        let entries = vec![entry("greet.hi", json!("Hi"), None)];
        let mut translations = HashMap::new();
        translations.insert("greet.hi".to_string(), "Oi".to_string());

        writer.write(&entries, &translations).expect("write");

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read back"))
                .expect("checkpoint must be valid JSON");
        assert_eq!(written, json!({ "greet": { "hi": "Oi" } }));
    }

    #[test]
    fn test_write_failure_is_persistence_error() {
        let writer = CheckpointWriter::new("/nonexistent-dir/definitely/missing.json");
        let err = writer.write(&[], &HashMap::new()).unwrap_err();
        assert!(matches!(err, TranslationError::PersistenceError(_)));
    }
}
