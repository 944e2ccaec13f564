//! 服务商客户端
//!
//! 翻译服务商的边界契约与具体实现：把一个批次的 (键, 源文本) 对发送给
//! 生成式语言接口，拿回 键 → 译文 的映射。编排器只依赖这里定义的
//! [`TranslationProvider`] trait，不关心任何厂商响应结构。

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::translation::config::ProviderProfile;
use crate::translation::error::{TranslationError, TranslationResult};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// 支持的服务商
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一个批次的翻译请求
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// (键, 源文本) 对，保持批次内顺序
    pub pairs: Vec<(String, String)>,
    /// 目标语言名称（自然语言，进入提示词）
    pub target_language: String,
    /// 项目名称，作为术语上下文
    pub project_name: String,
    /// 项目描述（可为空）
    pub project_description: String,
    /// 用户补充的自由文本语境
    pub context: String,
}

/// 翻译服务商边界契约
///
/// 网络 I/O、凭据处理、厂商请求结构都是实现方的事；调用方只拿到
/// 键 → 译文 的映射，或一条可被错误分类器匹配的失败消息。
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate_batch(
        &self,
        request: &TranslationRequest,
    ) -> TranslationResult<HashMap<String, String>>;
}

/// 基于 reqwest 的 Gemini / OpenAI 客户端
pub struct GenerativeClient {
    profile: ProviderProfile,
    http: reqwest::Client,
}

impl GenerativeClient {
    pub fn new(profile: ProviderProfile) -> Self {
        Self {
            profile,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.profile.model
    }

    async fn call_gemini(&self, prompt: &str) -> TranslationResult<String> {
        // 模型名需要带 models/ 前缀才能拼进 URL
        let model_name = if self.profile.model.starts_with("models/") {
            self.profile.model.clone()
        } else {
            format!("models/{}", self.profile.model)
        };
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE, model_name, self.profile.api_key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                // 支持的模型会强制输出 JSON
                "responseMimeType": "application/json"
            }
        });

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        let payload: Value = response.json().await?;

        if !status.is_success() {
            let code = payload
                .pointer("/error/code")
                .and_then(Value::as_u64)
                .unwrap_or(status.as_u16() as u64);
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("Gemini API Error");
            return Err(TranslationError::ProviderError(format!(
                "Gemini Error ({}): {}",
                code, message
            )));
        }

        payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                TranslationError::ParseError("Gemini 响应缺少 candidates 内容".to_string())
            })
    }

    async fn call_openai(&self, system_prompt: &str, user_prompt: &str) -> TranslationResult<String> {
        let url = format!("{}/chat/completions", OPENAI_API_BASE);
        let body = json!({
            "model": self.profile.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": 0.3
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.profile.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let payload: Value = response.json().await?;

        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("OpenAI API Error");
            return Err(TranslationError::ProviderError(format!(
                "OpenAI Error ({}): {}",
                status.as_u16(),
                message
            )));
        }

        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                TranslationError::ParseError("OpenAI 响应缺少 choices 内容".to_string())
            })
    }

    /// 列出可用模型
    ///
    /// 列表接口失败时回退到内置的常见模型清单，保证设置界面/命令行
    /// 始终有可选项。
    pub async fn list_models(&self) -> Vec<String> {
        match self.try_list_models().await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) | Err(_) => {
                tracing::warn!("获取 {} 模型列表失败，使用内置清单", self.profile.kind);
                fallback_models(self.profile.kind)
            }
        }
    }

    async fn try_list_models(&self) -> TranslationResult<Vec<String>> {
        let mut models: Vec<String> = match self.profile.kind {
            ProviderKind::Gemini => {
                let url = format!("{}/models?key={}", GEMINI_API_BASE, self.profile.api_key);
                let payload: Value = self.http.get(&url).send().await?.json().await?;
                payload
                    .pointer("/models")
                    .and_then(Value::as_array)
                    .map(|models| {
                        models
                            .iter()
                            .filter_map(|m| m.pointer("/name").and_then(Value::as_str))
                            .filter(|name| name.to_lowercase().contains("gemini"))
                            .map(|name| name.trim_start_matches("models/").to_string())
                            .collect()
                    })
                    .unwrap_or_default()
            }
            ProviderKind::OpenAi => {
                let url = format!("{}/models", OPENAI_API_BASE);
                let payload: Value = self
                    .http
                    .get(&url)
                    .bearer_auth(&self.profile.api_key)
                    .send()
                    .await?
                    .json()
                    .await?;
                payload
                    .pointer("/data")
                    .and_then(Value::as_array)
                    .map(|models| {
                        models
                            .iter()
                            .filter_map(|m| m.pointer("/id").and_then(Value::as_str))
                            .filter(|id| id.contains("gpt"))
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default()
            }
        };
        models.sort();
        Ok(models)
    }
}

#[async_trait]
impl TranslationProvider for GenerativeClient {
    async fn translate_batch(
        &self,
        request: &TranslationRequest,
    ) -> TranslationResult<HashMap<String, String>> {
        let system_prompt = build_system_prompt(request);
        let user_prompt = build_payload(&request.pairs)?;

        tracing::debug!(
            "发送 {} 个键至 {} ({})",
            request.pairs.len(),
            self.profile.model,
            self.profile.kind
        );

        let content = match self.profile.kind {
            ProviderKind::Gemini => {
                let prompt = format!("{}\n\nInput JSON:\n{}", system_prompt, user_prompt);
                self.call_gemini(&prompt).await?
            }
            ProviderKind::OpenAi => self.call_openai(&system_prompt, &user_prompt).await?,
        };

        let translations = parse_translation_map(&content)?;
        tracing::debug!("解析出 {} 个译文", translations.len());
        Ok(translations)
    }
}

/// 构建系统提示词
///
/// 五条固定规则（保持大小写习惯、保留占位符/标记、项目上下文、地道表达、
/// 只返回裸 JSON）加上用户自由语境。提示词本身保持英文，与接口约定一致。
pub fn build_system_prompt(request: &TranslationRequest) -> String {
    let project_clause = if request.project_description.is_empty() {
        String::new()
    } else {
        format!(", which is {}", request.project_description)
    };
    let context = if request.context.is_empty() {
        "Friendly but professional administrative panel tone"
    } else {
        request.context.as_str()
    };
    let language = &request.target_language;

    format!(
        r#"You are a professional software localization expert.
You will receive a JSON object where keys are the specific IDs and values are the source text in English (or the source language).
Your task is to translate the source text into {language} with HIGH FIDELITY to the software context.

### CRITICAL RULES:
1. **Preserve Case**: If the source is lowercase ("connect fail"), keeping it lowercase is usually preferred unless it violates grammar significantly. If it's Title Case ("Connect Fail"), use Title Case.
2. **Preserve Variables**: Do not translate or alter HTML tags, placeholders like %s, {{0}}, {{name}}, or special tokens.
3. **Software Context**: This is for **{project_name}**{project_clause}. Treat specific terms related to this software as technical terms.
4. **Natural & Professional**: Use idiomatic {language}. Fix minor typos in the source if the intent is clear.
5. **No Hallucinations**: Do not explain your logic. Return ONLY valid JSON.

### USER CONTEXT:
The user provided this additional context: "{context}"

Return ONLY the raw JSON object with all original keys and translated values. No Markdown block quotes.
"#,
        language = language,
        project_name = request.project_name,
        project_clause = project_clause,
        context = context,
    )
}

/// 构建用户负载：键 → 源文本 的 JSON 对象，保持批次内顺序
fn build_payload(pairs: &[(String, String)]) -> TranslationResult<String> {
    let mut payload = Map::new();
    for (key, source) in pairs {
        payload.insert(key.clone(), Value::String(source.clone()));
    }
    serde_json::to_string_pretty(&Value::Object(payload)).map_err(TranslationError::from)
}

/// 去掉可选的 Markdown 代码围栏包裹
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// 把响应文本解析为 键 → 译文 映射
///
/// 非字符串值（模型偶尔会回传嵌套对象）被丢弃并告警，不会中断整个批次。
fn parse_translation_map(content: &str) -> TranslationResult<HashMap<String, String>> {
    let cleaned = strip_code_fence(content);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| TranslationError::ParseError(format!("服务商响应不是合法 JSON: {}", e)))?;

    let object = value.as_object().ok_or_else(|| {
        TranslationError::ParseError("服务商响应不是 JSON 对象".to_string())
    })?;

    let mut translations = HashMap::with_capacity(object.len());
    for (key, value) in object {
        match value.as_str() {
            Some(text) => {
                translations.insert(key.clone(), text.to_string());
            }
            None => tracing::warn!("键 {} 的译文不是字符串，已丢弃", key),
        }
    }
    Ok(translations)
}

/// 各服务商的内置模型清单（列表接口不可用时的兜底）
fn fallback_models(kind: ProviderKind) -> Vec<String> {
    let models: &[&str] = match kind {
        ProviderKind::Gemini => &["gemini-1.5-flash", "gemini-pro", "gemini-1.5-pro"],
        ProviderKind::OpenAi => &["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo", "gpt-4o"],
    };
    models.iter().map(|m| m.to_string()).collect()
}
