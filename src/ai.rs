//! AI 学习辅助内容生成
//!
//! 调用 DashScope 兼容的 chat completions 接口为单词生成例句、
//! 翻译和助记。对外的 `generate` 永不失败：所有失败路径（未配置、
//! 网络、超时、非 2xx、无法解析）都记录日志后退化为确定性的默认内容，
//! 调用方无需区分网络故障。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::storage::models::AiContent;

const DEFAULT_MODEL: &str = "qwen-plus";
const DEFAULT_API_ENDPOINT: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const TEMPERATURE: f64 = 0.7;

/// 生成器配置
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl GeneratorConfig {
    /// 从环境变量读取配置
    pub fn from_env() -> Self {
        let api_key = env_string("ZENVOCAB_API_KEY").or_else(|| env_string("DASHSCOPE_API_KEY"));
        let model = env_string("ZENVOCAB_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint =
            env_string("ZENVOCAB_API_ENDPOINT").unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());
        let timeout =
            Duration::from_millis(env_u64("ZENVOCAB_TIMEOUT_MS").unwrap_or(DEFAULT_TIMEOUT_MS));

        Self {
            api_key,
            model,
            api_endpoint,
            timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// 生成失败的内部分类，仅用于日志诊断，不对外暴露
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("API key 未配置")]
    NotConfigured,
    #[error("请求失败: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("响应 choices 为空")]
    EmptyChoices,
    #[error("响应中没有 JSON 对象")]
    MissingJson,
    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// AI 内容生成器
pub struct AiGenerator {
    config: GeneratorConfig,
    client: reqwest::Client,
}

impl AiGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(GeneratorConfig::from_env())
    }

    /// 为单词生成学习辅助内容
    ///
    /// 永不失败：任何失败路径都退化为由单词构造的默认内容。
    pub async fn generate(&self, word: &str) -> AiContent {
        match self.request_content(word).await {
            Ok(content) => content,
            Err(err) => {
                warn!(word = %word, error = %err, "AI 内容生成失败，使用默认内容");
                fallback_content(word)
            }
        }
    }

    async fn request_content(&self, word: &str) -> Result<AiContent, GenerateError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(GenerateError::NotConfigured)?;

        let url = format!(
            "{}/chat/completions",
            self.config.api_endpoint.trim_end_matches('/')
        );
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "user", "content": build_prompt(word) }
            ],
            "temperature": TEMPERATURE,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::HttpStatus { status, body });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or(GenerateError::EmptyChoices)?;

        parse_content(content)
    }
}

/// 构建固定模板的生成指令
fn build_prompt(word: &str) -> String {
    format!(
        r#"请为单词"{word}"生成学习辅助内容，要求：
1. 一个简短、地道的英文例句（10-15个词）
2. 该例句的中文翻译
3. 一个有趣的中文助记方法（可以是词根记忆、谐音联想等）

请严格按照以下JSON格式返回，不要有任何额外文字：
{{
  "example": "英文例句",
  "exampleTranslation": "中文翻译",
  "mnemonic": "助记方法"
}}"#
    )
}

/// 从模型回复中解析内容三元组
///
/// 截取首个 `{` 到末尾 `}` 之间的子串按 JSON 解析；
/// 三个字段缺一不可。
fn parse_content(text: &str) -> Result<AiContent, GenerateError> {
    let json = extract_json(text).ok_or(GenerateError::MissingJson)?;
    Ok(serde_json::from_str(json)?)
}

fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// 生成失败时的默认内容，仅由输入单词构造
pub fn fallback_content(word: &str) -> AiContent {
    AiContent {
        example: format!("I need to learn the word \"{word}\"."),
        example_translation: format!("我需要学习单词\"{word}\"。"),
        mnemonic: "暂时无法生成助记，请稍后重试。".to_string(),
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
