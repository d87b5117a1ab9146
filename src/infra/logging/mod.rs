//! 日志系统模块
//!
//! 本模块提供了统一的日志记录功能，使用 `tracing` 库实现。

use tracing::{info, Level};

/// 日志级别
///
/// 从低到高：Trace < Debug < Info < Warn < Error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// 最详细的日志级别（调试用）
    Trace,
    /// 调试信息
    Debug,
    /// 一般信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// 从配置字符串解析日志级别
    ///
    /// 无法识别的值回退到 `Info`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    fn as_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// 日志格式
///
/// 日志的输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 默认格式（人类可读）
    Default,
    /// JSON 格式（机器可读）
    Json,
}

impl LogFormat {
    /// 从配置字符串解析日志格式
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Default
        }
    }
}

/// 日志配置
///
/// 配置日志系统的行为
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 日志格式
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    /// 默认配置
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Default,
        }
    }
}

/// 初始化日志系统
///
/// 重复初始化时保留已有的 subscriber，不会 panic。
///
/// # 参数说明
/// * `config` - 日志配置
pub fn init(config: &LoggingConfig) {
    let level = config.level.as_level();

    let result = match config.format {
        LogFormat::Default => {
            let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_max_level(level)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    if result.is_err() {
        // 已经有全局 subscriber（例如测试环境）
        return;
    }

    info!(level = ?config.level, format = ?config.format, "日志系统初始化完成");
}
