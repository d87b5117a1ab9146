//! LearnIT 课程推荐 Agent 库入口
//!
//! 本模块导出所有公共 API。
//!
//! # 使用示例
//! ```rust,no_run
//! use learnit_agent::infra::config::ConfigLoader;
//! use learnit_agent::service::AgentService;
//!
//! # async fn run() -> learnit_agent::infra::error::Result<()> {
//! let config = ConfigLoader::new().load("learnit.toml").await?;
//! AgentService::new(config)?.start().await
//! # }
//! ```

pub mod ai;
pub mod catalog;
pub mod core;
pub mod infra;
pub mod service;
pub mod web;
