//! 批次编排器
//!
//! 翻译运行的控制回路：选择候选条目、按批次驱动服务商客户端、依照速率模型
//! 在批次间冷却、套用错误分类器、驱动检查点写入，并响应协作式取消。
//!
//! 状态机：`Idle → Preparing → (Running[i] → Cooldown[i])* → {Done | Cancelled | Failed}`。
//! 整个回路是单一顺序控制流，只有两个挂起点：等待服务商响应、批次间冷却。
//! 任意时刻最多一个批次在途，服务商调用、检查点写入、进度上报都严格按批次
//! 序号发生：后写的检查点必须是先写检查点的超集。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::document::TranslationEntry;
use crate::translation::config::Settings;
use crate::translation::error::{FailureKind, TranslationError, TranslationResult};
use crate::translation::pipeline::candidates::{chunk_batches, select_candidates, TranslateMode};
use crate::translation::provider::{TranslationProvider, TranslationRequest};
use crate::translation::rates;
use crate::translation::storage::CheckpointWriter;

/// 协作式取消标志
///
/// 只在每轮循环顶部（批次开始前）被检查：在途批次总是先完成或失败，
/// 不会留下翻译到一半的批次，也不会破坏检查点的合并逻辑。
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消。已累计的译文不会被丢弃，最后一次检查点保留在磁盘上。
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// 单向的进度通知：状态文本 + 百分比
///
/// 终点进度恒为 100，表示"运行回路已退出"，而非"所有候选均已翻译"。
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub status: String,
    pub percent: u8,
}

/// 一次运行的最终结果
///
/// 即使运行失败，也会返回更新后的内存文档，调用方可以据此重试保存
/// （已翻译内容的静默丢失不可接受）。
#[derive(Debug)]
pub struct RunOutcome {
    /// 套用了全部累计译文的条目列表
    pub entries: Vec<TranslationEntry>,
    /// 本次运行产出的译文数量
    pub translated: usize,
    /// 是否被取消
    pub cancelled: bool,
    /// 运行中途的终止错误（每日配额 / 限流 / 认证 / 持久化失败）
    pub error: Option<TranslationError>,
}

/// 批次编排器
///
/// 非重入：同一时刻只应有一个运行在进行，由调用方保证单飞使用。
/// 运行期间唯一的共享可变状态是编排器独占的累计译文映射，按所有权
/// 在循环中显式传递。
pub struct BatchOrchestrator<P: TranslationProvider> {
    provider: P,
    settings: Settings,
    checkpoint: CheckpointWriter,
    cancel: CancelFlag,
    progress: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl<P: TranslationProvider> BatchOrchestrator<P> {
    pub fn new(provider: P, settings: Settings, checkpoint: CheckpointWriter) -> Self {
        Self {
            provider,
            settings,
            checkpoint,
            cancel: CancelFlag::new(),
            progress: None,
        }
    }

    /// 获取取消标志的句柄（可跨任务克隆）
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// 访问内部服务商
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// 订阅进度通知
    pub fn progress_updates(&mut self) -> mpsc::UnboundedReceiver<ProgressUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.progress = Some(tx);
        rx
    }

    /// 执行一次翻译运行
    ///
    /// 返回 `Err` 仅限运行尚未开始的情形（配置错误、无待翻译条目）；
    /// 首个服务商调用之后的一切失败都体现在 `RunOutcome::error` 里，
    /// 部分成果照常返回。
    pub async fn run(
        &self,
        entries: Vec<TranslationEntry>,
        mode: TranslateMode,
    ) -> TranslationResult<RunOutcome> {
        // Preparing：先验证凭据再做任何事，密钥问题必须在发起请求前暴露
        let profile = self.settings.resolve_provider()?;
        let model = profile.model.clone();

        let candidates = select_candidates(&entries, mode);
        if candidates.is_empty() {
            return Err(TranslationError::NoWork);
        }

        let batch_size = self.settings.effective_batch_size();
        let batches = chunk_batches(&candidates, batch_size);
        let total = batches.len();

        tracing::info!(
            "开始翻译运行: 模式 {}，候选 {} 条，批次 {} 个（每批至多 {} 条），模型 {}",
            mode,
            candidates.len(),
            total,
            batch_size,
            model
        );

        let mut translations: HashMap<String, String> = HashMap::new();
        let mut cancelled = false;
        let mut run_error: Option<TranslationError> = None;

        for (index, batch) in batches.iter().enumerate() {
            // 取消只在批次边界生效
            if self.cancel.is_cancelled() {
                cancelled = true;
                self.report("已取消，正在保存进度...", percent_of(index, total));
                break;
            }

            let percent = percent_of(index, total);
            self.report(
                format!("翻译批次 {}/{}（模型 {}）...", index + 1, total, model),
                percent,
            );

            match self.translate_with_retries(batch, index).await {
                Ok(batch_result) => {
                    // 累计映射只增不减
                    translations.extend(batch_result);

                    if let Err(err) = self.checkpoint.write(&entries, &translations) {
                        tracing::error!("{}", err);
                        run_error = Some(err);
                        break;
                    }

                    // 最后一个批次之后不再冷却
                    if index + 1 < total {
                        let cooldown = rates::batch_cooldown(&model);
                        self.report(
                            format!("冷却中：等待 {} 秒（速率限制保护）...", cooldown.as_secs()),
                            percent,
                        );
                        tokio::time::sleep(cooldown).await;
                    }
                }
                Err(err) => {
                    let kind = FailureKind::classify(&err.to_string());
                    if kind.is_fatal() {
                        let fatal = kind.into_error(&model, err.to_string());
                        tracing::error!("批次 {}/{} 触发致命错误，停止运行: {}", index + 1, total, fatal);
                        run_error = Some(fatal);
                        break;
                    }
                    // 瞬时失败：该批次的候选本次保持未翻译，直接进入下一批次
                    // （不补冷却，失败的请求大概率没有消耗生成配额）
                    tracing::warn!("批次 {}/{} 失败，跳过: {}", index + 1, total, err);
                }
            }
        }

        // 运行结束再写一次检查点，保证磁盘状态与返回的内存文档一致
        if let Err(err) = self.checkpoint.write(&entries, &translations) {
            tracing::error!("{}", err);
            if run_error.is_none() {
                run_error = Some(err);
            }
        }

        let entries = apply_translations(entries, &translations);

        let status = if cancelled {
            "已取消！"
        } else if run_error.is_some() {
            "运行终止，已保存部分进度。"
        } else {
            "完成！"
        };
        // 终点进度恒为 100：运行回路已退出
        self.report(status, 100);

        Ok(RunOutcome {
            entries,
            translated: translations.len(),
            cancelled,
            error: run_error,
        })
    }

    /// 调用服务商翻译一个批次，按配置对瞬时失败做有限重试
    ///
    /// 致命分类（配额/限流/认证）从不重试，立即上抛。默认重试次数为 0，
    /// 即与"失败批次直接跳过"的基线行为一致。
    async fn translate_with_retries(
        &self,
        batch: &[(String, String)],
        index: usize,
    ) -> TranslationResult<HashMap<String, String>> {
        let request = TranslationRequest {
            pairs: batch.to_vec(),
            target_language: self.settings.target_language.clone(),
            project_name: self.settings.project_name.clone(),
            project_description: self.settings.project_description.clone(),
            context: self.settings.translation_context.clone(),
        };

        let mut attempt = 0;
        loop {
            match self.provider.translate_batch(&request).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    let kind = FailureKind::classify(&err.to_string());
                    if kind.is_fatal() || attempt >= self.settings.max_batch_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    tracing::warn!(
                        "批次 {} 第 {} 次尝试失败，重试 ({}/{}): {}",
                        index + 1,
                        attempt,
                        attempt,
                        self.settings.max_batch_retries,
                        err
                    );
                }
            }
        }
    }

    fn report(&self, status: impl Into<String>, percent: u8) {
        let update = ProgressUpdate {
            status: status.into(),
            percent,
        };
        tracing::info!("[{:3}%] {}", update.percent, update.status);
        if let Some(tx) = &self.progress {
            // 接收端关闭只影响界面，不影响运行
            let _ = tx.send(update);
        }
    }
}

/// 批次 index 开始时的进度：round(index / total * 100)
fn percent_of(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((index as f64 / total as f64) * 100.0).round() as u8
}

/// 把累计译文套用到内存条目上
fn apply_translations(
    mut entries: Vec<TranslationEntry>,
    translations: &HashMap<String, String>,
) -> Vec<TranslationEntry> {
    for entry in &mut entries {
        if let Some(text) = translations.get(&entry.key) {
            entry.target = Some(Value::String(text.clone()));
        }
    }
    entries
}
