//! 文档模型模块
//!
//! 将嵌套的 JSON 文档扁平化为有序的 (点分路径, 值) 条目列表，并支持从条目列表
//! 还原出嵌套结构。条目顺序即基准文档的插入顺序，在一次运行内保持稳定。
//!
//! 已知限制：`.` 既是路径分隔符，也可能出现在原始键名中。本模块不做转义处理，
//! `unflatten(flatten(doc)) == doc` 仅在键名不含 `.` 时成立。

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::translation::error::{TranslationError, TranslationResult};

/// 单个翻译条目
///
/// `key` 是点分路径，在一个文档内唯一；`source` 来自基准文档，`target` 来自
/// 目标文档（可能缺失）。非字符串的值（对象/数组/数字等）不会被翻译，但会被
/// 原样保留。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TranslationEntry {
    pub key: String,
    pub source: Option<Value>,
    pub target: Option<Value>,
}

impl TranslationEntry {
    pub fn new(key: impl Into<String>, source: Option<Value>, target: Option<Value>) -> Self {
        Self {
            key: key.into(),
            source,
            target,
        }
    }

    /// 源值是否为可翻译的字符串
    pub fn source_text(&self) -> Option<&str> {
        self.source.as_ref().and_then(Value::as_str)
    }
}

/// 将嵌套 JSON 对象扁平化为有序的 (路径, 值) 列表
///
/// 递归下降对象，叶子值（非对象）以点分路径输出。数组按叶子值处理，
/// 其内部元素不可单独寻址。输出顺序为文档的插入顺序。
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut entries = Vec::new();
    flatten_into(String::new(), value, &mut entries);
    entries
}

fn flatten_into(prefix: String, value: &Value, entries: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(obj) => {
            for (k, v) in obj {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten_into(key, v, entries);
            }
        }
        _ => entries.push((prefix, value.clone())),
    }
}

/// 从 (路径, 值) 列表还原嵌套 JSON 对象
///
/// 按 `.` 切分路径并按需创建中间对象。值为 `null` 的条目被整体省略，
/// 因此删除通过"缺席"表达，而不是墓碑标记。
pub fn unflatten(entries: &[(String, Value)]) -> Value {
    let mut root = Map::new();

    for (path, value) in entries {
        if value.is_null() {
            continue;
        }
        set_by_path(&mut root, path, value.clone());
    }

    Value::Object(root)
}

fn set_by_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = root;

    for segment in &segments[..segments.len() - 1] {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        // 路径冲突时（中间节点已是叶子值）以对象覆盖，保证输出始终结构合法
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(map) => current = map,
            _ => return,
        }
    }

    if let Some(last) = segments.last() {
        current.insert(last.to_string(), value);
    }
}

/// 载入基准/目标文件并构建条目列表
///
/// 基准文件必须是合法 JSON；目标文件允许缺失或损坏（按空对象处理，
/// 对应"尚未开始翻译"的新文件）。条目顺序为基准文档的扁平化顺序，
/// 仅存在于目标文档的键追加在末尾。
pub fn load_entry_pair(base_path: &Path, target_path: &Path) -> TranslationResult<Vec<TranslationEntry>> {
    let base_text = std::fs::read_to_string(base_path).map_err(|e| {
        TranslationError::DocumentError(format!("读取基准文件 {} 失败: {}", base_path.display(), e))
    })?;
    let base: Value = serde_json::from_str(&base_text).map_err(|e| {
        TranslationError::DocumentError(format!("解析基准文件 {} 失败: {}", base_path.display(), e))
    })?;

    let target: Value = std::fs::read_to_string(target_path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_else(|| Value::Object(Map::new()));

    Ok(build_entries(&base, &target))
}

/// 由已解析的基准/目标文档构建条目列表
pub fn build_entries(base: &Value, target: &Value) -> Vec<TranslationEntry> {
    let base_flat = flatten(base);
    let mut target_flat: Vec<(String, Value)> = flatten(target);

    let mut entries: Vec<TranslationEntry> = Vec::with_capacity(base_flat.len());
    for (key, source) in base_flat {
        let target_value = target_flat
            .iter()
            .position(|(k, _)| *k == key)
            .map(|i| target_flat.swap_remove(i).1);
        entries.push(TranslationEntry::new(key, Some(source), target_value));
    }

    // 仅存在于目标文档的键：保留，供检查点写回时原样带过
    for (key, value) in target_flat {
        entries.push(TranslationEntry::new(key, None, Some(value)));
    }

    entries
}

/// 以 4 空格缩进序列化 JSON 文档
///
/// 检查点文件与人工编辑的 locale 文件保持相同的缩进风格。
pub fn to_pretty_string(value: &Value) -> TranslationResult<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| TranslationError::DocumentError(format!("序列化文档失败: {}", e)))?;
    String::from_utf8(buf)
        .map_err(|e| TranslationError::DocumentError(format!("序列化文档失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_preserves_insertion_order() {
        let doc = json!({
            "menu": { "file": "File", "edit": "Edit" },
            "title": "Hello",
            "count": 3
        });

        let flat = flatten(&doc);
        let keys: Vec<&str> = flat.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["menu.file", "menu.edit", "title", "count"]);
    }

    #[test]
    fn test_arrays_are_leaf_values() {
        let doc = json!({ "tags": ["a", "b"], "nested": { "list": [1, 2] } });
        let flat = flatten(&doc);

        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0], ("tags".to_string(), json!(["a", "b"])));
        assert_eq!(flat[1], ("nested.list".to_string(), json!([1, 2])));
    }

    #[test]
    fn test_unflatten_roundtrip() {
        let doc = json!({
            "a": { "b": { "c": "deep" }, "d": true },
            "e": null,
            "f": [1, 2, 3]
        });

        let rebuilt = unflatten(&flatten(&doc));
        // null 条目被省略，其余结构完整还原
        let expected = json!({
            "a": { "b": { "c": "deep" }, "d": true },
            "f": [1, 2, 3]
        });
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn test_unflatten_skips_null_values() {
        let entries = vec![
            ("keep".to_string(), json!("yes")),
            ("drop".to_string(), Value::Null),
        ];
        let rebuilt = unflatten(&entries);
        assert_eq!(rebuilt, json!({ "keep": "yes" }));
    }

    #[test]
    fn test_build_entries_base_order_then_target_extras() {
        let base = json!({ "a": "Hello", "b": "World" });
        let target = json!({ "b": "Mundo", "extra": "kept" });

        let entries = build_entries(&base, &target);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].key, "a");
        assert_eq!(entries[0].target, None);
        assert_eq!(entries[1].key, "b");
        assert_eq!(entries[1].target, Some(json!("Mundo")));
        assert_eq!(entries[2].key, "extra");
        assert_eq!(entries[2].source, None);
    }

    #[test]
    fn test_load_entry_pair_missing_target_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base_path = dir.path().join("en.json");
        std::fs::write(&base_path, r#"{"a": "Hello"}"#).expect("write base");

        let entries = load_entry_pair(&base_path, &dir.path().join("pt.json"))
            .expect("missing target should be treated as empty");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, None);
    }

    #[test]
    fn test_pretty_string_uses_four_space_indent() {
        let doc = json!({ "a": { "b": "c" } });
        let text = to_pretty_string(&doc).expect("serialize");
        assert!(text.contains("\n    \"a\""));
        assert!(text.contains("\n        \"b\""));
    }
}
