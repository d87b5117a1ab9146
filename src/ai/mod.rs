//! AI 集成模块
//!
//! 本模块提供了工具调用模型的统一接口、工具定义和相关常量。

pub mod constants;
pub mod provider;
pub mod tools;
