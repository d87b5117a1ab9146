//! 配置管理系统模块
//!
//! 本模块负责加载和管理系统配置。
//!
//! 加载顺序：
//! 1. TOML 配置文件（不存在时使用默认值）
//! 2. `${VAR_NAME}` 占位符替换
//! 3. 环境变量覆盖（`COURSE_API_BASE_URL`、`COURSE_WEB_BASE_URL`、`OPENAI_*`）
//!
//! # 配置文件示例
//! ```toml
//! [ai]
//! api_key = "${OPENAI_API_KEY}"
//! model = "gpt-4o-mini"
//!
//! [catalog]
//! api_base_url = "http://host.docker.internal:8080"
//! web_base_url = "http://localhost:8080"
//!
//! [agent]
//! max_tool_rounds = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{env, fs};

use super::error::{Error, Result};
use super::logging::{LogFormat, LogLevel, LoggingConfig};

/// 课程 API 默认地址
pub const DEFAULT_COURSE_API_BASE_URL: &str = "http://localhost:8080";

/// 课程详情页默认地址
pub const DEFAULT_COURSE_WEB_BASE_URL: &str = "http://localhost:8080";

/// 默认模型
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// AI 配置
    #[serde(default)]
    pub ai: AiConfig,
    /// 课程目录配置
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Agent 配置
    #[serde(default)]
    pub agent: AgentSettings,
    /// 会话配置
    #[serde(default)]
    pub session: SessionSettings,
    /// HTTP 服务配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfigConfig,
}

impl Config {
    /// 生成日志系统配置
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self
                .logging
                .level
                .as_deref()
                .map(LogLevel::parse)
                .unwrap_or(LogLevel::Info),
            format: self
                .logging
                .format
                .as_deref()
                .map(LogFormat::parse)
                .unwrap_or(LogFormat::Default),
        }
    }
}

/// AI 配置（OpenAI 兼容接口）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// API Key
    pub api_key: Option<String>,
    /// Base URL
    pub base_url: Option<String>,
    /// 组织 ID（发送 `OpenAI-Organization` 请求头）
    pub organization_id: Option<String>,
    /// 模型名称
    pub model: String,
    /// 温度参数
    pub temperature: Option<f32>,
    /// 最大 Token 数
    pub max_tokens: Option<u32>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            organization_id: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// 课程目录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// 课程 API 地址
    pub api_base_url: String,
    /// 用户可点击的详情页地址
    pub web_base_url: String,
    /// API 路径前缀
    pub api_prefix: String,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
    /// 演示数据的标题前缀（序号匹配用）
    pub demo_title_prefix: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_COURSE_API_BASE_URL.to_string(),
            web_base_url: DEFAULT_COURSE_WEB_BASE_URL.to_string(),
            api_prefix: "/api".to_string(),
            timeout_secs: 10,
            demo_title_prefix: "샘플 강의".to_string(),
        }
    }
}

/// Agent 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// 单轮对话中工具调用的最大轮数
    pub max_tool_rounds: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { max_tool_rounds: 10 }
    }
}

/// 会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// 空闲过期时间（秒），0 表示永不过期
    pub expire_seconds: u64,
    /// 过期清理间隔（秒）
    pub cleanup_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            expire_seconds: 3600,
            cleanup_interval_secs: 300,
        }
    }
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfigConfig {
    /// 日志级别
    pub level: Option<String>,
    /// 日志格式（default / json）
    pub format: Option<String>,
}

/// 配置加载器
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// 创建新的配置加载器
    pub fn new() -> Self {
        Self
    }

    /// 加载配置
    ///
    /// # 参数说明
    /// * `path` - 配置文件路径，不存在时使用默认配置
    ///
    /// # 返回值
    /// 应用了占位符替换和环境变量覆盖的配置
    pub async fn load(&self, path: &str) -> Result<Config> {
        tracing::info!(path = path, "加载配置文件");

        let mut config = if PathBuf::from(path).exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("读取配置文件失败: {}", e)))?;
            self.parse(&content)?
        } else {
            tracing::warn!(path = path, "配置文件不存在，使用默认配置");
            Config::default()
        };

        self.apply_overrides(&mut config, |key| env::var(key).ok());
        self.validate(&config)?;

        tracing::info!(
            api_base_url = %config.catalog.api_base_url,
            web_base_url = %config.catalog.web_base_url,
            model = %config.ai.model,
            "配置加载成功"
        );
        Ok(config)
    }

    /// 解析 TOML 内容并替换 `${VAR}` 占位符
    pub fn parse(&self, content: &str) -> Result<Config> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("解析配置文件失败: {}", e)))?;
        self.substitute_env_vars(&mut config);
        Ok(config)
    }

    /// 应用环境变量覆盖
    ///
    /// `lookup` 返回变量值；空字符串视为未设置。
    pub fn apply_overrides<F>(&self, config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("COURSE_API_BASE_URL") {
            config.catalog.api_base_url = v;
        }
        if let Some(v) = get("COURSE_WEB_BASE_URL") {
            config.catalog.web_base_url = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            config.ai.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            config.ai.base_url = Some(v);
        }
        if let Some(v) = get("OPENAI_ORGANIZATION") {
            config.ai.organization_id = Some(v);
        }
        if let Some(v) = get("OPENAI_MODEL") {
            config.ai.model = v;
        }

        config.catalog.api_base_url = trim_base_url(&config.catalog.api_base_url);
        config.catalog.web_base_url = trim_base_url(&config.catalog.web_base_url);
    }

    /// 校验配置
    pub fn validate(&self, config: &Config) -> Result<()> {
        if config.catalog.api_base_url.is_empty() {
            return Err(Error::Config("catalog.api_base_url 不能为空".to_string()));
        }
        if config.catalog.timeout_secs == 0 {
            return Err(Error::Config("catalog.timeout_secs 必须大于 0".to_string()));
        }
        if config.agent.max_tool_rounds == 0 {
            return Err(Error::Config("agent.max_tool_rounds 必须大于 0".to_string()));
        }
        Ok(())
    }

    /// 替换环境变量
    ///
    /// 将 `${VAR_NAME}` 格式的字符串替换为对应的环境变量值
    fn substitute_env_vars(&self, config: &mut Config) {
        if let Some(api_key) = &config.ai.api_key {
            config.ai.api_key = Some(self.replace_env_vars(api_key));
        }
        if let Some(base_url) = &config.ai.base_url {
            config.ai.base_url = Some(self.replace_env_vars(base_url));
        }
        if let Some(org_id) = &config.ai.organization_id {
            config.ai.organization_id = Some(self.replace_env_vars(org_id));
        }
        config.catalog.api_base_url = self.replace_env_vars(&config.catalog.api_base_url);
        config.catalog.web_base_url = self.replace_env_vars(&config.catalog.web_base_url);
    }

    /// 替换字符串中的环境变量
    fn replace_env_vars(&self, input: &str) -> String {
        let re = match regex::Regex::new(r"\$\{([^}]+)\}") {
            Ok(re) => re,
            Err(_) => return input.to_string(),
        };
        re.replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
    }
}

/// 去掉末尾的 `/`，避免拼接出 `//api`
fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
