//! OpenAI AI Provider 实现
//!
//! 通过 OpenAI 兼容的 Chat Completions 接口实现工具调用模型。
//!
//! # 配置文件示例
//! ```toml
//! [ai]
//! api_key = "${OPENAI_API_KEY}"
//! model = "gpt-4o-mini"
//! base_url = "https://api.openai.com/v1"
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{AiProvider, ChatMessage, ChatRequest, ChatResponse, MessageRole, TokenUsage, ToolCall, ToolDefinition};
use crate::ai::constants::{DEFAULT_TIMEOUT, OPENAI_BASE_URL, POOL_IDLE_TIMEOUT, POOL_MAX_IDLE_PER_HOST};
use crate::infra::error::{Error, Result};

/// OpenAI Provider 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API Key
    pub api_key: String,
    /// API Base URL
    pub base_url: Option<String>,
    /// 组织 ID（可选）
    pub organization_id: Option<String>,
}

/// OpenAI 聊天请求
#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// OpenAI 消息
#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    /// 带工具调用的助手消息内容可以为 null
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAIToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunctionDef,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// OpenAI 聊天响应
#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    id: String,
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn function_type() -> String {
    "function".to_string()
}

/// OpenAI Provider
///
/// 实现 OpenAI GPT 模型的工具调用接口
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    /// 配置
    config: OpenAIConfig,
    /// HTTP 客户端
    http_client: reqwest::Client,
}

impl OpenAIProvider {
    /// 创建新的 OpenAI Provider
    ///
    /// # 参数说明
    /// * `config` - Provider 配置
    ///
    /// # 返回值
    /// 创建的 Provider；HTTP 客户端构建失败时返回网络错误
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build()
            .map_err(|e| Error::Network(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self { config, http_client })
    }

    /// 获取 API Base URL
    fn get_base_url(&self) -> String {
        self.config
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

/// 转换为 OpenAI 格式的消息
fn to_openai_message(msg: &ChatMessage) -> OpenAIMessage {
    let role = match msg.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    };

    let content = if msg.role == MessageRole::Assistant && msg.content.is_empty() && !msg.tool_calls.is_empty() {
        None
    } else {
        Some(msg.content.clone())
    };

    OpenAIMessage {
        role: role.to_string(),
        content,
        tool_calls: msg
            .tool_calls
            .iter()
            .map(|call| OpenAIToolCall {
                id: call.id.clone(),
                call_type: function_type(),
                function: OpenAIFunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                },
            })
            .collect(),
        tool_call_id: msg.tool_call_id.clone(),
    }
}

fn to_openai_tool(tool: &ToolDefinition) -> OpenAITool {
    OpenAITool {
        tool_type: "function",
        function: OpenAIFunctionDef {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

/// 将 OpenAI 响应转换为通用响应
fn into_chat_response(body: OpenAIChatResponse) -> Result<ChatResponse> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Ai("OpenAI 响应中没有 choices".to_string()))?;

    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();

    let usage = body
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        id: body.id,
        content: choice.message.content.unwrap_or_default(),
        done: tool_calls.is_empty(),
        tool_calls,
        usage,
    })
}

#[async_trait]
impl AiProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let model = request.model.model.clone();
        let base_url = self.get_base_url();

        debug!(model = %model, messages = request.messages.len(), "发送 OpenAI 聊天请求");

        let chat_request = OpenAIChatRequest {
            model: model.clone(),
            messages: request.messages.iter().map(to_openai_message).collect(),
            tools: request.tools.iter().map(to_openai_tool).collect(),
            max_tokens: request.model.max_tokens,
            temperature: request.model.temperature,
        };

        let mut request_builder = self
            .http_client
            .post(format!("{}/chat/completions", base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        if let Some(org_id) = &self.config.organization_id {
            request_builder = request_builder.header("OpenAI-Organization", org_id);
        }

        let response = request_builder
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| Error::Ai(format!("OpenAI API 请求失败: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(status = ?status, error = %error_text, "OpenAI API 错误");
            return Err(Error::Ai(format!("OpenAI API 错误 ({}): {}", status, error_text)));
        }

        let response_body: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Ai(format!("解析 OpenAI 响应失败: {}", e)))?;

        let chat_response = into_chat_response(response_body)?;

        info!(
            model = %model,
            tool_calls = chat_response.tool_calls.len(),
            prompt_tokens = chat_response.usage.prompt_tokens,
            completion_tokens = chat_response.usage.completion_tokens,
            "OpenAI 聊天响应"
        );

        Ok(chat_response)
    }
}
