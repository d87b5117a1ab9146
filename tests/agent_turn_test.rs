//! 对话轮次端到端测试
//!
//! 脚本化的工具调用模型 + 本地 axum 模拟的课程目录后端，不访问外部网络。

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Notify;

use learnit_agent::ai::constants::{FOUND_SINGLE_COURSE_REPLY, LOOP_EXCEEDED_REPLY};
use learnit_agent::ai::provider::{AiProvider, ChatMessage, ChatRequest, ChatResponse, MessageRole, ModelConfig, ToolCall};
use learnit_agent::catalog::{CatalogClient, SortOrder, Tab};
use learnit_agent::core::agent::TurnOrchestrator;
use learnit_agent::core::pagination::Cursor;
use learnit_agent::core::session::InMemorySessionStore;
use learnit_agent::infra::config::CatalogConfig;
use learnit_agent::infra::error::{Error, Result};

// ==================== 脚本化模型 ====================

enum Step {
    Reply(ChatResponse),
    Fail,
}

#[derive(Default)]
struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<ChatResponse>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    fn repeating(response: ChatResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(response)) => Ok(response),
            Some(Step::Fail) => Err(Error::Ai("scripted failure".to_string())),
            None => Ok(self.fallback.clone().unwrap_or_else(|| text("done"))),
        }
    }
}

fn text(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        done: true,
        ..ChatResponse::default()
    }
}

fn call(id: &str, name: &str, arguments: &str) -> ChatResponse {
    calls(&[(id, name, arguments)])
}

fn calls(list: &[(&str, &str, &str)]) -> ChatResponse {
    ChatResponse {
        tool_calls: list
            .iter()
            .map(|(id, name, arguments)| ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            })
            .collect(),
        ..ChatResponse::default()
    }
}

// ==================== 模拟目录后端 ====================

#[derive(Clone, Default)]
struct Backend {
    course_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl Backend {
    fn course_queries(&self) -> Vec<HashMap<String, String>> {
        self.course_queries.lock().unwrap().clone()
    }
}

async fn courses(State(backend): State<Backend>, Query(query): Query<HashMap<String, String>>) -> Response {
    backend.course_queries.lock().unwrap().push(query.clone());

    if query.get("categoryId").map(String::as_str) == Some("99") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let page: u64 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let items: Vec<Value> = (1..=3)
        .map(|i| json!({"courseId": page * 100 + i, "title": format!("강의 {}-{}", page, i), "price": 0}))
        .collect();
    Json(json!({"content": items, "totalElements": 40})).into_response()
}

async fn categories() -> Json<Value> {
    Json(json!([
        {"name": "백엔드 개발", "categoryId": 1},
        {"name": "프론트엔드 개발", "categoryId": 2}
    ]))
}

async fn search() -> Json<Value> {
    let items: Vec<Value> = (1..=100)
        .map(|n| {
            let title = if n == 37 {
                "#37 스프링 입문".to_string()
            } else {
                format!("스프링 실전 {}", n)
            };
            json!({"courseId": n, "title": title})
        })
        .collect();
    Json(Value::Array(items))
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let router = Router::new()
        .route("/api/courses", get(courses))
        .route("/api/categories", get(categories))
        .route("/api/search/courses", get(search))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), backend)
}

async fn setup(provider: Arc<dyn AiProvider>, max_rounds: usize) -> (TurnOrchestrator, Backend) {
    let (base_url, backend) = spawn_backend().await;
    let catalog = CatalogClient::new(&CatalogConfig {
        api_base_url: base_url,
        web_base_url: "http://web.test".to_string(),
        timeout_secs: 5,
        ..CatalogConfig::default()
    })
    .unwrap();

    let orchestrator = TurnOrchestrator::new(
        provider,
        Arc::new(catalog),
        InMemorySessionStore::new(),
        ModelConfig {
            model: "scripted-model".to_string(),
            ..ModelConfig::default()
        },
    )
    .with_max_tool_rounds(max_rounds);
    (orchestrator, backend)
}

fn tool_results(messages: &[ChatMessage]) -> Vec<(String, Value)> {
    messages
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .map(|m| {
            let payload: Value = serde_json::from_str(&m.content).unwrap();
            (m.tool_call_id.clone().unwrap_or_default(), payload["result"].clone())
        })
        .collect()
}

// ==================== 测试 ====================

#[tokio::test]
async fn test_next_page_replays_last_list_query() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Reply(call("c1", "get_popular_courses", r#"{"tab":"free","page":2}"#)),
        Step::Reply(text("무료 인기 강의예요")),
        Step::Reply(call("c2", "get_next_page", "{}")),
        Step::Reply(text("다음 페이지예요")),
    ]));
    let (orchestrator, backend) = setup(provider.clone(), 10).await;

    let first = orchestrator.run_turn("s1", "무료 인기 강의").await.unwrap();
    assert_eq!(first.rounds, 1);
    assert_eq!(first.items().map(<[Value]>::len), Some(3));
    assert_eq!(first.display_reply(), "강의 3개를 찾았어요.");
    assert_eq!(first.reply, "무료 인기 강의예요");

    let second = orchestrator.run_turn("s1", "더보기").await.unwrap();
    assert_eq!(second.items().unwrap()[0]["courseId"], 301);
    assert_eq!(
        second.items().unwrap()[0]["detailUrl"],
        "http://web.test/CourseDetail?courseId=301&tab=intro"
    );

    let queries = backend.course_queries();
    assert_eq!(queries.len(), 2);
    for (query, page) in queries.iter().zip(["2", "3"]) {
        assert_eq!(query["sort"], "popular");
        assert_eq!(query["tab"], "free");
        assert_eq!(query["page"], page);
        assert_eq!(query["size"], "12");
        assert!(!query.contains_key("categoryId"));
    }

    let session = orchestrator.store().get_or_create("s1").await;
    assert_eq!(
        session.cursor,
        Some(Cursor::List {
            sort: SortOrder::Popular,
            tab: Tab::Free,
            category_id: None,
            page: 3,
            size: 12,
        })
    );
    // system + (user, assistant call, tool, assistant text) * 2
    assert_eq!(session.messages.len(), 9);
    assert_eq!(provider.request_count(), 4);
}

#[tokio::test]
async fn test_next_page_without_previous_query() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Reply(call("c1", "get_next_page", "{}")),
        Step::Reply(text("이전 검색이 없어요")),
    ]));
    let (orchestrator, backend) = setup(provider, 10).await;

    let outcome = orchestrator.run_turn("fresh", "더보기").await.unwrap();
    assert_eq!(outcome.display_reply(), "이전 검색이 없어요");
    assert!(outcome.items().is_none());
    assert!(backend.course_queries().is_empty());

    let session = orchestrator.store().get_or_create("fresh").await;
    let results = tool_results(&session.messages);
    assert_eq!(results, vec![("c1".to_string(), json!({"error": "NO_PREVIOUS_QUERY", "detail": "이전에 조회한 목록이 없습니다."}))]);
    assert!(session.cursor.is_none());
}

#[tokio::test]
async fn test_hint_search_finds_item_beyond_first_page() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Reply(call("c1", "search_courses", r##"{"keyword":"#37 스프링","page":0,"size":12}"##)),
        Step::Reply(text("찾았어요")),
    ]));
    let (orchestrator, _) = setup(provider, 10).await;

    let outcome = orchestrator.run_turn("s1", "#37 스프링 강의 찾아줘").await.unwrap();
    assert_eq!(outcome.display_reply(), FOUND_SINGLE_COURSE_REPLY);
    let items = outcome.items().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "#37 스프링 입문");

    let session = orchestrator.store().get_or_create("s1").await;
    let (_, result) = &tool_results(&session.messages)[0];
    assert_eq!(result["page"], 0);
    assert_eq!(result["size"], 1);
    assert_eq!(result["total"], 100);
    assert_eq!(result["hint"], 37);
    assert_eq!(result["keyword"], "스프링");
    assert_eq!(
        session.cursor,
        Some(Cursor::Search {
            keyword: "스프링".to_string(),
            page: 0,
            size: 12,
        })
    );
}

#[tokio::test]
async fn test_search_then_next_page_slices_client_side() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Reply(call("c1", "search_courses", r#"{"keyword":"스프링","size":"30"}"#)),
        Step::Reply(text("검색 결과")),
        Step::Reply(call("c2", "get_next_page", "")),
        Step::Reply(text("다음")),
    ]));
    let (orchestrator, _) = setup(provider, 10).await;

    let first = orchestrator.run_turn("s1", "스프링").await.unwrap();
    assert_eq!(first.items().unwrap().len(), 30);
    assert!(!first.listing.as_ref().unwrap().hint_match);

    let second = orchestrator.run_turn("s1", "더보기").await.unwrap();
    let items = second.items().unwrap();
    assert_eq!(items.len(), 30);
    assert_eq!(items[0]["courseId"], 31);
    assert_eq!(second.display_reply(), "강의 30개를 찾았어요.");
}

#[tokio::test]
async fn test_category_resolution() {
    let provider = Arc::new(ScriptedProvider::new(vec![Step::Reply(calls(&[
        ("c1", "resolve_category_id", r#"{"categoryName":"백엔드"}"#),
        ("c2", "resolve_category_id", r#"{"categoryName":"우주공학"}"#),
    ]))]));
    let (orchestrator, _) = setup(provider, 10).await;

    let outcome = orchestrator.run_turn("s1", "백엔드 강의").await.unwrap();
    assert!(outcome.listing.is_none());

    let session = orchestrator.store().get_or_create("s1").await;
    let results = tool_results(&session.messages);
    assert_eq!(results[0].1, json!({"categoryId": 1, "matchedName": "백엔드 개발"}));
    assert_eq!(results[1].1, json!({"categoryId": null, "matchedName": null}));
    assert!(session.cursor.is_none());
}

#[tokio::test]
async fn test_parameters_are_sanitized() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Reply(calls(&[
            ("c1", "get_latest_courses", r#"{"page":-5,"size":999,"tab":"VIP"}"#),
            ("c2", "get_popular_courses", "{oops"),
        ])),
        Step::Reply(text("ok")),
    ]));
    let (orchestrator, backend) = setup(provider, 10).await;

    orchestrator.run_turn("s1", "최신 강의").await.unwrap();

    let queries = backend.course_queries();
    assert_eq!(queries[0]["sort"], "latest");
    assert_eq!(queries[0]["page"], "0");
    assert_eq!(queries[0]["size"], "12");
    assert_eq!(queries[0]["tab"], "all");
    assert_eq!(queries[1]["sort"], "popular");
    assert_eq!(queries[1]["page"], "0");
}

#[tokio::test]
async fn test_soft_failures_reach_the_model() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Reply(calls(&[
            ("c1", "get_latest_courses_by_category", r#"{"categoryId":"abc"}"#),
            ("c2", "get_popular_courses_by_category", r#"{"categoryId":99}"#),
            ("c3", "delete_everything", "{}"),
        ])),
        Step::Reply(text("문제가 있었어요")),
    ]));
    let (orchestrator, backend) = setup(provider.clone(), 10).await;

    let outcome = orchestrator.run_turn("s1", "강의").await.unwrap();
    assert_eq!(outcome.display_reply(), "문제가 있었어요");

    let session = orchestrator.store().get_or_create("s1").await;
    let results = tool_results(&session.messages);
    assert_eq!(results[0].1["error"], "INVALID_CATEGORY_ID");
    assert_eq!(results[1].1["error"], "COURSE_API_REQUEST_FAILED");
    assert_eq!(results[1].1["status"], 500);
    assert_eq!(results[1].1["body"], "boom");
    assert_eq!(results[2].1["error"], "UNKNOWN_FUNCTION");
    assert_eq!(results[2].1["detail"], "Unknown function: delete_everything");

    // 失败的请求也会成为最近一次查询
    assert!(matches!(session.cursor, Some(Cursor::List { category_id: Some(99), .. })));
    assert_eq!(backend.course_queries().len(), 1);

    // 第二次模型调用能看到全部工具结果
    let requests = provider.requests.lock().unwrap();
    let last = requests.last().unwrap();
    assert_eq!(last.messages.iter().filter(|m| m.role == MessageRole::Tool).count(), 3);
}

#[tokio::test]
async fn test_next_page_after_invalid_category_lists_unfiltered() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Reply(calls(&[("c1", "search_courses", r#"{"keyword":"자바"}"#)])),
        Step::Reply(calls(&[("c2", "get_popular_courses_by_category", r#"{"categoryId":null,"tab":"free"}"#)])),
        Step::Reply(calls(&[("c3", "get_next_page", "{}")])),
        Step::Reply(text("다음 목록이에요")),
    ]));
    let (orchestrator, backend) = setup(provider, 10).await;

    orchestrator.run_turn("s1", "더보기").await.unwrap();

    let queries = backend.course_queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["sort"], "popular");
    assert_eq!(queries[0]["tab"], "free");
    assert_eq!(queries[0]["page"], "1");
    assert!(queries[0].get("categoryId").is_none());
}

#[tokio::test]
async fn test_tool_loop_is_bounded() {
    let provider = Arc::new(ScriptedProvider::repeating(call("loop", "get_popular_courses", "{}")));
    let (orchestrator, backend) = setup(provider.clone(), 2).await;

    let outcome = orchestrator.run_turn("s1", "인기 강의").await.unwrap();
    assert!(outcome.loop_exceeded);
    assert_eq!(outcome.rounds, 2);
    assert_eq!(outcome.reply, LOOP_EXCEEDED_REPLY);
    assert_eq!(provider.request_count(), 3);
    assert_eq!(backend.course_queries().len(), 2);

    let session = orchestrator.store().get_or_create("s1").await;
    let calls = session.messages.iter().map(|m| m.tool_calls.len()).sum::<usize>();
    let results = tool_results(&session.messages);
    assert_eq!(calls, results.len());
    assert_eq!(results.last().unwrap().1, json!({"error": "TOOL_LOOP_EXCEEDED"}));
}

#[tokio::test]
async fn test_provider_failure_commits_nothing() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Reply(call("c1", "get_popular_courses", "{}")),
        Step::Reply(text("첫 번째 답변")),
        Step::Reply(call("c2", "search_courses", r#"{"keyword":"자바"}"#)),
        Step::Fail,
    ]));
    let (orchestrator, _) = setup(provider, 10).await;

    orchestrator.run_turn("s1", "인기 강의").await.unwrap();
    let before = orchestrator.store().get_or_create("s1").await;

    let err = orchestrator.run_turn("s1", "자바 검색").await.unwrap_err();
    assert!(matches!(err, Error::Ai(_)));

    let after = orchestrator.store().get_or_create("s1").await;
    assert_eq!(after.messages, before.messages);
    assert_eq!(after.cursor, before.cursor);
    assert!(matches!(after.cursor, Some(Cursor::List { .. })));
}

#[tokio::test]
async fn test_reset_clears_history_and_cursor() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Reply(call("c1", "get_popular_courses", "{}")),
        Step::Reply(text("ok")),
        Step::Reply(call("c2", "get_next_page", "{}")),
        Step::Reply(text("no more")),
    ]));
    let (orchestrator, _) = setup(provider, 10).await;

    orchestrator.run_turn("s1", "인기").await.unwrap();
    orchestrator.reset("s1").await;

    let session = orchestrator.store().get_or_create("s1").await;
    assert_eq!(session.messages.len(), 1);
    assert!(session.cursor.is_none());

    orchestrator.run_turn("s1", "더보기").await.unwrap();
    let session = orchestrator.store().get_or_create("s1").await;
    assert_eq!(tool_results(&session.messages)[0].1["error"], "NO_PREVIOUS_QUERY");
}

// ==================== 并发 ====================

/// "wait" 消息阻塞到 "go" 消息到达
struct GateProvider {
    gate: Notify,
}

#[async_trait]
impl AiProvider for GateProvider {
    fn name(&self) -> &str {
        "gate"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let last = request.messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        match last {
            "wait" => self.gate.notified().await,
            "go" => self.gate.notify_one(),
            _ => {}
        }
        Ok(text(&format!("reply to {}", last)))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_distinct_sessions_run_in_parallel() {
    let provider = Arc::new(GateProvider { gate: Notify::new() });
    let (orchestrator, _) = setup(provider, 10).await;
    let orchestrator = Arc::new(orchestrator);

    let waiting = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run_turn("a", "wait").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let go = tokio::time::timeout(Duration::from_secs(5), orchestrator.run_turn("b", "go"))
        .await
        .expect("session b must not wait for session a")
        .unwrap();
    assert_eq!(go.reply, "reply to go");

    let waited = tokio::time::timeout(Duration::from_secs(5), waiting)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(waited.reply, "reply to wait");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_session_turns_never_interleave() {
    let provider = Arc::new(ScriptedProvider::default());
    let (orchestrator, _) = setup(provider, 10).await;
    let orchestrator = Arc::new(orchestrator);

    let mut tasks = Vec::new();
    for n in 0..10 {
        let orchestrator = orchestrator.clone();
        tasks.push(tokio::spawn(async move {
            orchestrator.run_turn("shared", &format!("message {}", n)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let session = orchestrator.store().get_or_create("shared").await;
    assert_eq!(session.messages.len(), 1 + 10 * 2);
    assert_eq!(session.messages[0].role, MessageRole::System);
    for pair in session.messages[1..].chunks(2) {
        assert_eq!(pair[0].role, MessageRole::User);
        assert_eq!(pair[1].role, MessageRole::Assistant);
        assert_eq!(pair[1].content, "done");
    }
}
