//! AI Provider 接口模块
//!
//! 定义工具调用模型（tool-caller）的统一接口：
//! 输入完整对话历史和工具定义，输出文本和/或工具调用列表。

pub mod openai;

use serde::{Deserialize, Serialize};

use crate::infra::error::Result;

/// 消息角色
///
/// 定义消息在对话中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// 系统消息
    System,
    /// 用户消息
    User,
    /// 助手消息（模型输出，可能带工具调用）
    Assistant,
    /// 工具执行结果
    Tool,
}

/// 工具调用
///
/// 模型请求执行的一次函数调用。`id` 是不透明值，必须原样回传给对应的工具结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// 调用 ID
    pub id: String,
    /// 函数名称
    pub name: String,
    /// JSON 格式的参数字符串（可能不合法）
    pub arguments: String,
}

/// 聊天消息
///
/// 单条对话消息，写入历史后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// 消息角色
    pub role: MessageRole,
    /// 消息内容
    pub content: String,
    /// 助手消息携带的工具调用
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// 工具结果对应的调用 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// 创建系统消息
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::System, content)
    }

    /// 创建用户消息
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::User, content)
    }

    /// 创建助手消息
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(MessageRole::Assistant, content)
        }
    }

    /// 创建工具结果消息
    pub fn tool_result(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::plain(MessageRole::Tool, output)
        }
    }

    fn plain(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// 模型配置
///
/// 单次请求的模型参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 模型名称
    pub model: String,
    /// 温度参数（0.0 - 2.0）
    pub temperature: Option<f32>,
    /// 最大 Token 数
    pub max_tokens: Option<u32>,
}

/// 工具定义
///
/// 定义可用的工具（用于 Function Calling）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// 工具名称
    pub name: String,
    /// 工具描述
    pub description: String,
    /// 参数模式（JSON Schema）
    pub parameters: serde_json::Value,
}

/// 聊天请求
///
/// 发送给模型的请求
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// 模型配置
    pub model: ModelConfig,
    /// 消息历史
    pub messages: Vec<ChatMessage>,
    /// 工具定义
    pub tools: Vec<ToolDefinition>,
}

/// 聊天响应
///
/// 模型的输出：文本和/或工具调用
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// 响应 ID
    pub id: String,
    /// 文本内容（可能为空）
    pub content: String,
    /// 请求的工具调用
    pub tool_calls: Vec<ToolCall>,
    /// 使用的 Token 数
    pub usage: TokenUsage,
    /// 是否完成
    pub done: bool,
}

impl ChatResponse {
    /// 是否请求了工具调用
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// 转换为可写入历史的助手消息
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::assistant(self.content.clone(), self.tool_calls.clone())
    }
}

/// Token 使用统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// 提示词 Token 数
    pub prompt_tokens: u32,
    /// 完成 Token 数
    pub completion_tokens: u32,
    /// 总 Token 数
    pub total_tokens: u32,
}

/// AI Provider Trait
///
/// 定义工具调用模型的统一接口
///
/// # 实现要求
/// - 必须实现 `Send + Sync`
/// - 传输层失败（无文本也无调用）返回 `Err`，由调用方中止本轮对话
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// 获取 Provider 名称
    fn name(&self) -> &str;

    /// 发送聊天请求
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
