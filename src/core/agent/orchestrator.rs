//! 对话轮次编排
//!
//! 一轮对话的状态机：
//! ```text
//! 追加用户消息 -> 等待模型 -> { 完成, 执行工具 }
//! 执行工具 -> 等待模型
//! ```
//! 整轮在会话锁内执行，先在副本上修改，结束时一次性提交；
//! 模型调用失败时整轮放弃，会话保持原样。

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::dispatch::{dispatch, ToolArgs};
use crate::ai::constants::{
    found_courses_reply, EMPTY_REPLY, FOUND_SINGLE_COURSE_REPLY, LOOP_EXCEEDED_REPLY, MAX_TOOL_ROUNDS,
};
use crate::ai::provider::{AiProvider, ChatMessage, ChatRequest, ModelConfig, ToolDefinition};
use crate::ai::tools::catalog_tools;
use crate::catalog::{CatalogClient, FailureKind, ToolFailure, ToolOutcome};
use crate::core::session::InMemorySessionStore;
use crate::infra::error::Result;

/// 本轮最后一次得到的课程列表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    /// 课程
    pub items: Vec<Value>,
    /// 是否为序号定位到的单门课程
    pub hint_match: bool,
}

/// 一轮对话的结果
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// 会话 ID
    pub session_id: String,
    /// 模型的文本回复
    pub reply: String,
    /// 最后一次工具调用得到的课程列表
    pub listing: Option<Listing>,
    /// 执行的工具轮数
    pub rounds: usize,
    /// 是否因工具轮数超限而结束
    pub loop_exceeded: bool,
}

impl TurnOutcome {
    /// 非空课程列表
    pub fn items(&self) -> Option<&[Value]> {
        self.listing
            .as_ref()
            .map(|listing| listing.items.as_slice())
            .filter(|items| !items.is_empty())
    }

    /// 对外展示的回复
    ///
    /// 有课程列表时用固定模板代替模型的文字，避免和课程卡片重复。
    pub fn display_reply(&self) -> String {
        match (&self.listing, self.items()) {
            (Some(listing), Some(items)) if listing.hint_match && items.len() == 1 => {
                FOUND_SINGLE_COURSE_REPLY.to_string()
            }
            (_, Some(items)) => found_courses_reply(items.len()),
            _ => self.reply.clone(),
        }
    }
}

/// 对话编排器
#[derive(Clone)]
pub struct TurnOrchestrator {
    provider: Arc<dyn AiProvider>,
    catalog: Arc<CatalogClient>,
    store: InMemorySessionStore,
    model: ModelConfig,
    tools: Vec<ToolDefinition>,
    max_tool_rounds: usize,
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("provider", &self.provider.name())
            .field("model", &self.model.model)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish()
    }
}

impl TurnOrchestrator {
    /// 创建编排器
    ///
    /// # 参数说明
    /// * `provider` - 工具调用模型
    /// * `catalog` - 目录客户端
    /// * `store` - 会话存储
    /// * `model` - 模型配置
    pub fn new(
        provider: Arc<dyn AiProvider>,
        catalog: Arc<CatalogClient>,
        store: InMemorySessionStore,
        model: ModelConfig,
    ) -> Self {
        Self {
            provider,
            catalog,
            store,
            model,
            tools: catalog_tools(),
            max_tool_rounds: MAX_TOOL_ROUNDS,
        }
    }

    /// 设置工具调用最大轮数（至少 1）
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds.max(1);
        self
    }

    /// 会话存储
    pub fn store(&self) -> &InMemorySessionStore {
        &self.store
    }

    /// 目录客户端
    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    /// 模型名称
    pub fn model_name(&self) -> &str {
        &self.model.model
    }

    fn request(&self, messages: &[ChatMessage]) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: self.tools.clone(),
        }
    }

    /// 执行一轮对话
    ///
    /// # 参数说明
    /// * `session_id` - 会话 ID
    /// * `message` - 用户消息
    ///
    /// # 返回值
    /// 本轮结果；模型调用失败时返回错误且会话不变
    #[instrument(skip(self, message), fields(session_id = %session_id))]
    pub async fn run_turn(&self, session_id: &str, message: &str) -> Result<TurnOutcome> {
        let handle = self.store.handle(session_id);
        let mut session = handle.lock().await;

        let mut staged = session.clone();
        staged.messages.push(ChatMessage::user(message));

        let mut listing = None;
        let mut rounds = 0;
        let mut loop_exceeded = false;

        let reply = loop {
            let response = self.provider.chat(&self.request(&staged.messages)).await?;
            staged.messages.push(response.to_message());

            if !response.has_tool_calls() {
                break if response.content.trim().is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    response.content
                };
            }

            if rounds >= self.max_tool_rounds {
                warn!(rounds, pending = response.tool_calls.len(), "工具调用轮数超限");
                let output = ToolOutcome::from(ToolFailure::new(FailureKind::ToolLoopExceeded)).to_tool_output();
                for call in &response.tool_calls {
                    staged.messages.push(ChatMessage::tool_result(&call.id, output.clone()));
                }
                loop_exceeded = true;
                break LOOP_EXCEEDED_REPLY.to_string();
            }

            rounds += 1;
            for call in &response.tool_calls {
                debug!(round = rounds, tool = %call.name, args = %call.arguments, "tool_call");

                let args = ToolArgs::parse(&call.arguments);
                let outcome = dispatch(&self.catalog, &mut staged.cursor, &call.name, &args).await;

                if let Some(items) = outcome.items() {
                    listing = Some(Listing {
                        items: items.to_vec(),
                        hint_match: outcome.is_hint_match(),
                    });
                }
                staged.messages.push(ChatMessage::tool_result(&call.id, outcome.to_tool_output()));
            }
        };

        staged.touch();
        *session = staged;

        info!(
            rounds,
            loop_exceeded,
            items = listing.as_ref().map(|l: &Listing| l.items.len()).unwrap_or(0),
            "对话轮次完成"
        );

        Ok(TurnOutcome {
            session_id: session_id.to_string(),
            reply,
            listing,
            rounds,
            loop_exceeded,
        })
    }

    /// 重置会话
    pub async fn reset(&self, session_id: &str) {
        self.store.reset(session_id).await;
    }
}
