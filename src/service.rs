//! 服务模块
//!
//! 负责 Agent 服务的完整生命周期：组装组件、启动 Web 服务、定期清理会话、响应关闭信号。

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::ai::provider::openai::{OpenAIConfig, OpenAIProvider};
use crate::ai::provider::{AiProvider, ModelConfig};
use crate::catalog::CatalogClient;
use crate::core::agent::TurnOrchestrator;
use crate::core::session::InMemorySessionStore;
use crate::infra::config::Config;
use crate::infra::error::{Error, Result};
use crate::web::{WebServer, WebState};

/// 服务状态
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceStatus {
    Initializing,
    Running,
    Stopping,
    Stopped,
    Error(String),
}

/// 根据配置组装对话编排器
///
/// # 参数说明
/// * `config` - 已加载的配置
/// * `provider` - 工具调用模型
///
/// # 返回值
/// 编排器；目录客户端构建失败时返回错误
pub fn build_orchestrator(config: &Config, provider: Arc<dyn AiProvider>) -> Result<TurnOrchestrator> {
    let catalog = CatalogClient::new(&config.catalog)?;
    let model = ModelConfig {
        model: config.ai.model.clone(),
        temperature: config.ai.temperature,
        max_tokens: config.ai.max_tokens,
    };

    Ok(
        TurnOrchestrator::new(provider, Arc::new(catalog), InMemorySessionStore::new(), model)
            .with_max_tool_rounds(config.agent.max_tool_rounds),
    )
}

/// 根据配置创建 OpenAI Provider
///
/// 未配置 API Key 时返回配置错误
pub fn build_provider(config: &Config) -> Result<Arc<dyn AiProvider>> {
    let api_key = config
        .ai
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty() && !key.starts_with("${"))
        .ok_or_else(|| Error::Config("OPENAI_API_KEY 未设置".to_string()))?;

    let provider = OpenAIProvider::new(OpenAIConfig {
        api_key,
        base_url: config.ai.base_url.clone(),
        organization_id: config.ai.organization_id.clone(),
    })?;
    Ok(Arc::new(provider))
}

/// Agent 服务
#[derive(Clone)]
pub struct AgentService {
    config: Config,
    status: Arc<tokio::sync::RwLock<ServiceStatus>>,
    shutdown_tx: broadcast::Sender<()>,
    orchestrator: Arc<TurnOrchestrator>,
}

impl AgentService {
    /// 创建服务
    pub fn new(config: Config) -> Result<Self> {
        let provider = build_provider(&config)?;
        let orchestrator = build_orchestrator(&config, provider)?;
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    /// 使用已组装的编排器创建服务
    pub fn with_orchestrator(config: Config, orchestrator: TurnOrchestrator) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            status: Arc::new(tokio::sync::RwLock::new(ServiceStatus::Initializing)),
            shutdown_tx,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// 对话编排器
    pub fn orchestrator(&self) -> Arc<TurnOrchestrator> {
        self.orchestrator.clone()
    }

    /// 当前状态
    pub async fn status(&self) -> ServiceStatus {
        self.status.read().await.clone()
    }

    /// 通知服务关闭
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// 启动服务，直到收到 Ctrl+C 或关闭通知
    pub async fn start(&self) -> Result<()> {
        info!("开始启动服务...");

        let web_server = WebServer::new(
            &self.config.server.host,
            self.config.server.port,
            WebState {
                orchestrator: self.orchestrator.clone(),
                course_api_base_url: self.config.catalog.api_base_url.clone(),
                course_web_base_url: self.config.catalog.web_base_url.clone(),
            },
        );

        let cleanup = self.spawn_session_cleanup();
        let mut rx = self.shutdown_tx.subscribe();

        *self.status.write().await = ServiceStatus::Running;
        info!(
            host = %self.config.server.host,
            port = self.config.server.port,
            "服务已启动"
        );

        let result = tokio::select! {
            result = web_server.start() => result,
            _ = signal::ctrl_c() => {
                warn!("收到 Ctrl+C 信号，准备关闭服务...");
                Ok(())
            }
            _ = rx.recv() => Ok(()),
        };

        *self.status.write().await = ServiceStatus::Stopping;
        self.shutdown();
        cleanup.abort();

        match &result {
            Ok(()) => *self.status.write().await = ServiceStatus::Stopped,
            Err(e) => {
                error!(error = %e, "服务运行出错");
                *self.status.write().await = ServiceStatus::Error(e.to_string());
            }
        }
        info!("服务已停止");
        result
    }

    /// 启动定期清理过期会话的后台任务
    fn spawn_session_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let store = self.orchestrator.store().clone();
        let expire_seconds = self.config.session.expire_seconds;
        let interval_secs = self.config.session.cleanup_interval_secs.max(1);
        let mut rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            if expire_seconds == 0 {
                debug!("会话过期已禁用");
                return;
            }

            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        store.cleanup_expired(expire_seconds);
                    }
                    _ = rx.recv() => break,
                }
            }
        })
    }
}
