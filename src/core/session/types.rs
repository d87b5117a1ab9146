//! 会话类型定义
//!
//! 定义会话相关的核心数据结构。

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use crate::ai::constants::SYSTEM_PROMPT;
use crate::ai::provider::ChatMessage;
use crate::core::pagination::Cursor;

/// 当前时间戳（毫秒）
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as i64
}

/// 会话信息
///
/// 一个会话拥有完整的对话历史和一个翻页游标。
///
/// # 字段说明
/// * `id` - 调用方提供的会话 ID
/// * `messages` - 对话历史，第一条始终是系统提示词
/// * `cursor` - 最近一次列表或搜索请求的游标
/// * `created_at` - 创建时间
/// * `updated_at` - 最后活动时间
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// 会话 ID
    pub id: String,
    /// 对话历史
    pub messages: Vec<ChatMessage>,
    /// 翻页游标
    pub cursor: Option<Cursor>,
    /// 创建时间戳
    pub created_at: i64,
    /// 最后更新时间戳
    pub updated_at: i64,
}

impl Session {
    /// 创建新会话，历史中只有系统提示词
    pub fn new(id: &str) -> Self {
        let now = now_millis();
        Self {
            id: id.to_string(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT)],
            cursor: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 重置为只有系统提示词、没有游标的状态
    pub fn reset(&mut self) {
        self.messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        self.cursor = None;
        self.touch();
    }

    /// 更新最后活动时间
    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }

    /// 检查会话是否过期
    ///
    /// `expire_seconds` 为 0 时永不过期
    pub fn is_expired(&self, expire_seconds: u64) -> bool {
        if expire_seconds == 0 {
            return false;
        }
        let elapsed = (now_millis() - self.updated_at) / 1000;
        elapsed > expire_seconds as i64
    }
}
