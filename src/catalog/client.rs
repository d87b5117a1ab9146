//! 课程目录客户端
//!
//! 每个目录能力对应一个操作，全部以软失败的方式返回 `ToolOutcome`：
//! 非 2xx、超时或非 JSON 响应都转换为带错误码和诊断信息的结果，而不是错误。

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::normalize::{attach_detail_links, normalize_page};
use super::query::{ListQuery, SearchQuery};
use super::resolver::{best_category_match, HintMatcher, TitleHintMatcher};
use super::types::{CategoryMatch, FailureKind, PageParams, PagedResult, SortOrder, ToolFailure, ToolOutcome};
use crate::infra::config::CatalogConfig;
use crate::infra::error::{Error, Result};

/// 课程列表接口的错误码前缀
const COURSE_API: &str = "COURSE_API";

/// 搜索接口的错误码前缀
const SEARCH_API: &str = "SEARCH_API";

/// 分类接口的错误码前缀
const CATEGORY_API: &str = "CATEGORY_API";

/// 错误上下文中响应体的最大字符数
const MAX_ERROR_BODY_CHARS: usize = 1000;

/// 课程目录客户端
///
/// # 字段说明
/// * `http_client` - 带固定超时的 HTTP 客户端
/// * `api_base_url` - API 基础 URL（已拼接前缀）
/// * `web_base_url` - 前端站点 URL，用于生成详情页链接
/// * `hint_matcher` - 序号匹配策略
#[derive(Clone)]
pub struct CatalogClient {
    http_client: reqwest::Client,
    api_base_url: String,
    web_base_url: String,
    hint_matcher: Arc<dyn HintMatcher>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api_base_url", &self.api_base_url)
            .field("web_base_url", &self.web_base_url)
            .finish()
    }
}

impl CatalogClient {
    /// 创建目录客户端
    ///
    /// # 参数说明
    /// * `config` - 目录配置
    ///
    /// # 返回值
    /// 创建的客户端；HTTP 客户端构建失败时返回网络错误
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Network(format!("创建目录 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            http_client,
            api_base_url: format!(
                "{}{}",
                config.api_base_url.trim_end_matches('/'),
                config.api_prefix.trim_end_matches('/')
            ),
            web_base_url: config.web_base_url.trim_end_matches('/').to_string(),
            hint_matcher: Arc::new(TitleHintMatcher::new(config.demo_title_prefix.clone())),
        })
    }

    /// 替换序号匹配策略
    pub fn with_hint_matcher(mut self, hint_matcher: Arc<dyn HintMatcher>) -> Self {
        self.hint_matcher = hint_matcher;
        self
    }

    /// API 基础 URL（含前缀）
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// 前端站点 URL
    pub fn web_base_url(&self) -> &str {
        &self.web_base_url
    }

    /// 热门课程
    pub async fn list_popular(&self, tab: Option<&str>, page: Option<i64>, size: Option<i64>) -> ToolOutcome {
        self.fetch_courses(&ListQuery::new(SortOrder::Popular, tab, page, size)).await
    }

    /// 最新课程
    pub async fn list_latest(&self, tab: Option<&str>, page: Option<i64>, size: Option<i64>) -> ToolOutcome {
        self.fetch_courses(&ListQuery::new(SortOrder::Latest, tab, page, size)).await
    }

    /// 按分类的热门课程
    pub async fn list_popular_by_category(
        &self,
        category_id: Option<i64>,
        tab: Option<&str>,
        page: Option<i64>,
        size: Option<i64>,
    ) -> ToolOutcome {
        match ListQuery::in_category(SortOrder::Popular, category_id, tab, page, size) {
            Ok(query) => self.fetch_courses(&query).await,
            Err(failure) => failure.into(),
        }
    }

    /// 按分类的最新课程
    pub async fn list_latest_by_category(
        &self,
        category_id: Option<i64>,
        tab: Option<&str>,
        page: Option<i64>,
        size: Option<i64>,
    ) -> ToolOutcome {
        match ListQuery::in_category(SortOrder::Latest, category_id, tab, page, size) {
            Ok(query) => self.fetch_courses(&query).await,
            Err(failure) => failure.into(),
        }
    }

    /// 执行已清洗的列表查询
    pub async fn fetch_courses(&self, query: &ListQuery) -> ToolOutcome {
        match self.get_json(COURSE_API, "/courses", &query.query_pairs()).await {
            Ok(raw) => {
                let mut page = PagedResult::from_page(normalize_page(raw), query.params);
                page.items = attach_detail_links(std::mem::take(&mut page.items), &self.web_base_url);
                ToolOutcome::Page(page)
            }
            Err(failure) => failure.into(),
        }
    }

    /// 关键词搜索
    pub async fn search(&self, keyword: &str, page: Option<i64>, size: Option<i64>) -> ToolOutcome {
        self.run_search(&SearchQuery::new(keyword, page, size)).await
    }

    /// 执行已清洗的搜索
    ///
    /// 后端不分页，客户端在完整结果上先做序号匹配，再按 `page * size` 切片。
    pub async fn run_search(&self, query: &SearchQuery) -> ToolOutcome {
        let raw = match self.get_json(SEARCH_API, "/search/courses", &query.query_pairs()).await {
            Ok(raw) => raw,
            Err(failure) => return failure.into(),
        };

        let all_items = match raw {
            Value::Array(items) => items,
            other => match normalize_page(other) {
                Value::Object(mut map) => match map.remove("items") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            },
        };
        let total = all_items.len() as u64;

        if let Some(hint) = query.hint {
            if let Some(index) = self.hint_matcher.find(&all_items, hint) {
                info!(hint, index, keyword = %query.keyword, "序号命中课程");
                let matched: Vec<Value> = all_items.into_iter().nth(index).into_iter().collect();
                let mut page = PagedResult::new(
                    attach_detail_links(matched, &self.web_base_url),
                    PageParams { page: 0, size: 1 },
                    Some(total),
                );
                page.hint = Some(hint);
                page.keyword = Some(query.keyword.clone());
                return ToolOutcome::Page(page);
            }
            debug!(hint, "序号未命中，按普通分页返回");
        }

        let (start, end) = query.params.window();
        let items: Vec<Value> = all_items.into_iter().skip(start).take(end - start).collect();

        ToolOutcome::Page(PagedResult::new(
            attach_detail_links(items, &self.web_base_url),
            query.params,
            Some(total),
        ))
    }

    /// 热门课程的规范化原始数据
    ///
    /// 除附加详情链接外保留后端返回的全部字段。
    pub async fn debug_popular_raw(&self, page: Option<i64>, size: Option<i64>) -> ToolOutcome {
        let query = ListQuery::new(SortOrder::Popular, None, page, size);
        let raw = match self.get_json(COURSE_API, "/courses", &query.query_pairs()).await {
            Ok(raw) => raw,
            Err(failure) => return failure.into(),
        };

        let decorated = match normalize_page(raw) {
            Value::Object(mut map) => {
                if let Some(Value::Array(items)) = map.remove("items") {
                    map.insert(
                        "items".to_string(),
                        Value::Array(attach_detail_links(items, &self.web_base_url)),
                    );
                }
                Value::Object(map)
            }
            Value::Array(items) => Value::Array(attach_detail_links(items, &self.web_base_url)),
            other => other,
        };

        ToolOutcome::Raw(decorated)
    }

    /// 获取全部分类
    ///
    /// 失败或返回非数组时记录警告并返回空列表
    pub async fn fetch_categories(&self) -> Vec<Value> {
        match self.get_json(CATEGORY_API, "/categories", &[]).await {
            Ok(Value::Array(categories)) => categories,
            Ok(other) => {
                warn!(kind = %json_kind(&other), "分类接口返回的不是数组");
                Vec::new()
            }
            Err(failure) => {
                warn!(error = %failure.code, "获取分类失败");
                Vec::new()
            }
        }
    }

    /// 分类名称 -> categoryId
    pub async fn resolve_category(&self, name: &str) -> CategoryMatch {
        let categories = self.fetch_categories().await;
        let matched = best_category_match(&categories, name);
        debug!(name = %name, category_id = ?matched.category_id, "分类匹配结果");
        matched
    }

    /// GET 请求并解析 JSON，失败时返回软失败
    async fn get_json(
        &self,
        api: &str,
        path: &str,
        pairs: &[(&'static str, String)],
    ) -> std::result::Result<Value, ToolFailure> {
        let url = format!("{}{}", self.api_base_url, path);
        let params = params_context(pairs);

        debug!(url = %url, params = %params, "请求课程目录 API");

        let response = match self.http_client.get(&url).query(pairs).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "课程目录 API 请求失败");
                return Err(ToolFailure::for_api(api, FailureKind::RequestFailed)
                    .detail(e.to_string())
                    .context("url", url)
                    .context("params", params));
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %final_url, error = %e, "读取课程目录 API 响应失败");
                return Err(ToolFailure::for_api(api, FailureKind::RequestFailed)
                    .detail(e.to_string())
                    .context("status", status.as_u16())
                    .context("url", final_url)
                    .context("params", params));
            }
        };

        if !status.is_success() {
            warn!(url = %final_url, status = status.as_u16(), "课程目录 API 返回错误状态");
            return Err(ToolFailure::for_api(api, FailureKind::RequestFailed)
                .context("status", status.as_u16())
                .context("url", final_url)
                .context("params", params)
                .context("body", truncate_body(&body)));
        }

        serde_json::from_slice(&body).map_err(|e| {
            warn!(url = %final_url, content_type = %content_type, "课程目录 API 返回非 JSON");
            ToolFailure::for_api(api, FailureKind::NonJsonResponse)
                .detail(e.to_string())
                .context("status", status.as_u16())
                .context("url", final_url)
                .context("content_type", content_type)
                .context("body", truncate_body(&body))
        })
    }
}

fn params_context(pairs: &[(&'static str, String)]) -> Value {
    let map: Map<String, Value> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
        .collect();
    Value::Object(map)
}

fn truncate_body(body: &[u8]) -> String {
    String::from_utf8_lossy(body).chars().take(MAX_ERROR_BODY_CHARS).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
