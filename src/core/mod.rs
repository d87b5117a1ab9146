//! 核心运行时模块
//!
//! 负责对话编排、翻页游标和会话管理
//!
//! # 模块结构
//! - `agent/` - 对话轮次编排与工具分发
//! - `pagination` - 翻页游标
//! - `session/` - 会话管理（对话历史和游标）

pub mod agent;
pub mod pagination;
pub mod session;
