//! 工具分发
//!
//! 将模型请求的工具调用映射到目录操作，并按规则更新会话游标。

use serde_json::{Map, Value};
use tracing::debug;

use crate::ai::tools::CatalogTool;
use crate::catalog::{CatalogClient, FailureKind, ListQuery, SearchQuery, SortOrder, ToolFailure, ToolOutcome};
use crate::core::pagination::{advance, Cursor};

/// 工具调用参数
///
/// 参数解析失败或不是 JSON 对象时视为空参数，不会中断对话。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    /// 解析模型给出的 JSON 参数字符串
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    /// 字符串参数
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// 整数参数，兼容浮点数和数字字符串
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 严格整数参数，带小数部分的数字视为无效
    pub fn exact_int(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// 执行单个工具调用
///
/// # 参数说明
/// * `catalog` - 目录客户端
/// * `cursor` - 会话游标（列表和搜索调用会覆盖，"下一页"会读取并递增）
/// * `name` - 工具名称
/// * `args` - 工具参数
///
/// # 返回值
/// 工具结果；未知工具返回 `UNKNOWN_FUNCTION`
pub async fn dispatch(
    catalog: &CatalogClient,
    cursor: &mut Option<Cursor>,
    name: &str,
    args: &ToolArgs,
) -> ToolOutcome {
    let Some(tool) = CatalogTool::from_name(name) else {
        return ToolFailure::new(FailureKind::UnknownFunction)
            .detail(format!("Unknown function: {}", name))
            .into();
    };

    let tab = args.str("tab");
    let page = args.int("page");
    let size = args.int("size");

    match tool {
        CatalogTool::ResolveCategoryId => {
            let name = args.str("categoryName").unwrap_or_default();
            ToolOutcome::Category(catalog.resolve_category(name).await)
        }
        CatalogTool::GetPopularCourses => {
            run_list(catalog, cursor, ListQuery::new(SortOrder::Popular, tab, page, size)).await
        }
        CatalogTool::GetLatestCourses => {
            run_list(catalog, cursor, ListQuery::new(SortOrder::Latest, tab, page, size)).await
        }
        CatalogTool::GetPopularCoursesByCategory | CatalogTool::GetLatestCoursesByCategory => {
            let sort = if tool == CatalogTool::GetPopularCoursesByCategory {
                SortOrder::Popular
            } else {
                SortOrder::Latest
            };
            match ListQuery::in_category(sort, args.exact_int("categoryId"), tab, page, size) {
                Ok(query) => run_list(catalog, cursor, query).await,
                Err(failure) => {
                    // 无效分类不发请求，游标按未过滤的列表记录
                    *cursor = Some(Cursor::from(&ListQuery::new(sort, tab, page, size)));
                    failure.into()
                }
            }
        }
        CatalogTool::SearchCourses => {
            let query = SearchQuery::new(args.str("keyword").unwrap_or_default(), page, size);
            let outcome = catalog.run_search(&query).await;
            *cursor = Some(Cursor::from(&query));
            outcome
        }
        CatalogTool::GetNextPage => {
            let outcome = advance(catalog, cursor).await;
            debug!(cursor = ?cursor, "翻页后的游标");
            outcome
        }
        CatalogTool::DebugPopularRaw => catalog.debug_popular_raw(page, size).await,
    }
}

/// 执行列表查询并以本次参数覆盖游标
async fn run_list(catalog: &CatalogClient, cursor: &mut Option<Cursor>, query: ListQuery) -> ToolOutcome {
    let outcome = catalog.fetch_courses(&query).await;
    *cursor = Some(Cursor::from(&query));
    outcome
}
