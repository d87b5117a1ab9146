//! Web 接口模块
//!
//! 对外提供聊天、会话重置和健康检查接口。

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::{error, info};

use crate::core::agent::TurnOrchestrator;
use crate::infra::error::{Error, Result};

// ==================== 类型定义 ====================

/// Web 服务器状态
#[derive(Clone)]
pub struct WebState {
    /// 对话编排器
    pub orchestrator: Arc<TurnOrchestrator>,
    /// 课程 API 地址（健康检查展示用）
    pub course_api_base_url: String,
    /// 课程站点地址（健康检查展示用）
    pub course_web_base_url: String,
}

/// 聊天请求
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// 会话 ID
    pub session_id: String,
    /// 用户消息
    pub message: String,
}

/// 聊天响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// 会话 ID
    pub session_id: String,
    /// 回复
    pub reply: String,
    /// 课程卡片
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<JsonValue>>,
}

/// 会话重置请求
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    /// 会话 ID
    #[serde(default)]
    pub session_id: Option<String>,
}

// ==================== 路由处理器 ====================

// 健康检查
async fn health_handler(State(state): State<WebState>) -> Json<JsonValue> {
    let orchestrator = &state.orchestrator;
    Json(json!({
        "ok": true,
        "course_api_base_url": state.course_api_base_url,
        "course_web_base_url": state.course_web_base_url,
        "model": orchestrator.model_name(),
        "store": orchestrator.store().kind(),
        "sessions": orchestrator.store().len(),
    }))
}

// 聊天：执行一轮对话
async fn chat_handler(State(state): State<WebState>, Json(req): Json<ChatRequest>) -> Response {
    info!(session_id = %req.session_id, "收到聊天请求");

    match state.orchestrator.run_turn(&req.session_id, &req.message).await {
        Ok(outcome) => Json(ChatResponse {
            session_id: outcome.session_id.clone(),
            reply: outcome.display_reply(),
            items: outcome.items().map(<[JsonValue]>::to_vec),
        })
        .into_response(),
        Err(e) => {
            error!(session_id = %req.session_id, error = %e, "对话轮次失败");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"sessionId": req.session_id, "error": e.to_string()})),
            )
                .into_response()
        }
    }
}

// 重置会话
async fn reset_handler(State(state): State<WebState>, Json(req): Json<ResetRequest>) -> Json<JsonValue> {
    match req.session_id.filter(|id| !id.is_empty()) {
        Some(session_id) => {
            state.orchestrator.reset(&session_id).await;
            Json(json!({"ok": true, "sessionId": session_id}))
        }
        None => Json(json!({"ok": false, "error": "sessionId required"})),
    }
}

// ==================== Web 服务器 ====================

/// Web 服务器
#[derive(Clone)]
pub struct WebServer {
    /// 监听地址
    host: String,
    /// 服务器端口
    port: u16,
    /// 服务器状态
    state: WebState,
}

impl WebServer {
    /// 创建新的 Web 服务器
    pub fn new(host: &str, port: u16, state: WebState) -> Self {
        Self {
            host: host.to_string(),
            port,
            state,
        }
    }

    /// 获取状态
    pub fn state(&self) -> &WebState {
        &self.state
    }

    /// 创建 Axum 路由
    pub fn create_router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/api/chat", post(chat_handler))
            .route("/api/session/reset", post(reset_handler))
            .with_state(self.state.clone())
    }

    /// 启动服务器
    pub async fn start(&self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        info!(addr = %addr, "启动 Web 服务");

        let router = self.create_router();

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Network(format!("绑定 {} 失败: {}", addr, e)))?;
        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Network(format!("Web 服务异常退出: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{AiProvider, ChatRequest as ModelRequest, ChatResponse as ModelResponse, ModelConfig};
    use crate::catalog::CatalogClient;
    use crate::core::session::InMemorySessionStore;
    use crate::infra::config::CatalogConfig;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[derive(Debug)]
    struct EchoProvider {
        fail: bool,
    }

    #[async_trait]
    impl AiProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, request: &ModelRequest) -> Result<ModelResponse> {
            if self.fail {
                return Err(Error::Ai("upstream down".to_string()));
            }
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ModelResponse {
                content: format!("echo: {}", last),
                done: true,
                ..ModelResponse::default()
            })
        }
    }

    fn server(fail: bool) -> WebServer {
        let catalog = CatalogClient::new(&CatalogConfig::default()).unwrap();
        let orchestrator = TurnOrchestrator::new(
            Arc::new(EchoProvider { fail }),
            Arc::new(catalog),
            InMemorySessionStore::new(),
            ModelConfig {
                model: "test-model".to_string(),
                ..ModelConfig::default()
            },
        );
        WebServer::new(
            "127.0.0.1",
            0,
            WebState {
                orchestrator: Arc::new(orchestrator),
                course_api_base_url: "http://api.test".to_string(),
                course_web_base_url: "http://web.test".to_string(),
            },
        )
    }

    async fn call(router: Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let server = server(false);
        let (status, body) = call(server.create_router(), "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["store"], "in_memory");
        assert_eq!(body["sessions"], 0);
        assert_eq!(body["course_api_base_url"], "http://api.test");
    }

    #[tokio::test]
    async fn test_chat_returns_reply_without_items() {
        let server = server(false);
        let (status, body) = call(
            server.create_router(),
            "POST",
            "/api/chat",
            Some(json!({"sessionId": "s1", "message": "안녕"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], "s1");
        assert_eq!(body["reply"], "echo: 안녕");
        assert!(body.get("items").is_none());
        assert_eq!(server.state().orchestrator.store().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_provider_failure_is_bad_gateway() {
        let server = server(true);
        let (status, body) = call(
            server.create_router(),
            "POST",
            "/api/chat",
            Some(json!({"sessionId": "s1", "message": "안녕"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["sessionId"], "s1");
        assert!(body["error"].as_str().unwrap().contains("upstream down"));

        let session = server.state().orchestrator.store().get_or_create("s1").await;
        assert_eq!(session.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_requires_session_id() {
        let server = server(false);

        let (_, body) = call(server.create_router(), "POST", "/api/session/reset", Some(json!({}))).await;
        assert_eq!(body, json!({"ok": false, "error": "sessionId required"}));

        let (_, body) = call(
            server.create_router(),
            "POST",
            "/api/session/reset",
            Some(json!({"sessionId": ""})),
        )
        .await;
        assert_eq!(body["ok"], false);

        let (_, body) = call(
            server.create_router(),
            "POST",
            "/api/session/reset",
            Some(json!({"sessionId": "s9"})),
        )
        .await;
        assert_eq!(body, json!({"ok": true, "sessionId": "s9"}));
    }
}
