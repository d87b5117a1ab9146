//! Agent 模块
//!
//! - dispatch：工具调用分发
//! - orchestrator：对话轮次编排

pub mod dispatch;
pub mod orchestrator;

pub use dispatch::{dispatch, ToolArgs};
pub use orchestrator::{Listing, TurnOrchestrator, TurnOutcome};
