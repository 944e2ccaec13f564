//! 集成测试公共工具
//!
//! 提供脚本化的 MockProvider（按调用顺序决定成功/失败）、测试设置与
//! 文档夹具。所有测试都通过边界契约驱动库，不触碰真实网络。

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use lingodiff::document::{build_entries, TranslationEntry};
use lingodiff::translation::provider::{TranslationProvider, TranslationRequest};
use lingodiff::translation::{CancelFlag, Settings, TranslationError, TranslationResult};

/// 固定的译文形式，方便断言
pub fn translated(source: &str) -> String {
    format!("PT:{}", source)
}

/// 脚本化的服务商替身
///
/// 每次调用按序弹出脚本项：`Ok(())` 返回所有键的译文，`Err(msg)` 返回
/// 带该消息的服务错误。脚本耗尽后默认成功。可携带取消标志，在第 N 次
/// 调用完成后置位，模拟"批次进行中用户点了取消"。
pub struct MockProvider {
    script: Mutex<VecDeque<Result<(), String>>>,
    pub calls: AtomicUsize,
    pub seen_batches: Mutex<Vec<Vec<String>>>,
    cancel_after: Mutex<Option<(usize, CancelFlag)>>,
}

impl MockProvider {
    pub fn always_ok() -> Self {
        Self::scripted(vec![])
    }

    pub fn scripted(script: Vec<Result<(), String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            seen_batches: Mutex::new(Vec::new()),
            cancel_after: Mutex::new(None),
        }
    }

    /// 在第 `nth` 次调用（从 1 计）完成后置取消标志
    pub fn arm_cancel(&self, nth: usize, flag: CancelFlag) {
        *self.cancel_after.lock().expect("cancel_after lock") = Some((nth, flag));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    async fn translate_batch(
        &self,
        request: &TranslationRequest,
    ) -> TranslationResult<HashMap<String, String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen_batches
            .lock()
            .expect("seen_batches lock")
            .push(request.pairs.iter().map(|(k, _)| k.clone()).collect());

        let step = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(Ok(()));

        if let Some((nth, flag)) = self.cancel_after.lock().expect("cancel_after lock").as_ref() {
            if call == *nth {
                flag.cancel();
            }
        }

        match step {
            Ok(()) => Ok(request
                .pairs
                .iter()
                .map(|(key, source)| (key.clone(), translated(source)))
                .collect()),
            Err(message) => Err(TranslationError::ProviderError(message)),
        }
    }
}

/// 带合法 Gemini 密钥的测试设置
pub fn test_settings(batch_size: usize) -> Settings {
    Settings {
        gemini_api_key: Some("AIzaTestKey".to_string()),
        batch_size,
        ..Default::default()
    }
}

/// 四个字符串键的基准文档 + 空目标：batch_size 控制批次数
pub fn four_key_entries() -> Vec<TranslationEntry> {
    let base = json!({
        "menu": { "file": "File", "edit": "Edit" },
        "title": "Hello",
        "footer": "Bye"
    });
    build_entries(&base, &json!({}))
}
