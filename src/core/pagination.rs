//! 翻页游标
//!
//! 每个会话保存最近一次列表或搜索请求的参数，"下一页"据此重放请求。

use serde::{Deserialize, Serialize};

use crate::catalog::{
    CatalogClient, FailureKind, ListQuery, PageParams, SearchQuery, SortOrder, Tab, ToolFailure, ToolOutcome,
};

/// 没有可翻页的查询时给模型的说明
pub const NO_PREVIOUS_QUERY_DETAIL: &str = "이전에 조회한 목록이 없습니다.";

/// 翻页游标
///
/// `mode` 决定哪些字段有效：列表游标没有 keyword，搜索游标没有 sort / tab / categoryId。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Cursor {
    /// 列表（热门 / 最新，可带分类）
    List {
        sort: SortOrder,
        tab: Tab,
        #[serde(rename = "categoryId", default, skip_serializing_if = "Option::is_none")]
        category_id: Option<i64>,
        page: u32,
        size: u32,
    },
    /// 关键词搜索
    Search { keyword: String, page: u32, size: u32 },
}

impl Cursor {
    /// 当前页码
    pub fn page(&self) -> u32 {
        match self {
            Cursor::List { page, .. } | Cursor::Search { page, .. } => *page,
        }
    }

    fn increment_page(&mut self) {
        match self {
            Cursor::List { page, .. } | Cursor::Search { page, .. } => *page = page.saturating_add(1),
        }
    }
}

impl From<&ListQuery> for Cursor {
    fn from(query: &ListQuery) -> Self {
        Cursor::List {
            sort: query.sort,
            tab: query.tab,
            category_id: query.category_id,
            page: query.params.page,
            size: query.params.size,
        }
    }
}

impl From<&SearchQuery> for Cursor {
    fn from(query: &SearchQuery) -> Self {
        Cursor::Search {
            keyword: query.keyword.clone(),
            page: query.params.page,
            size: query.params.size,
        }
    }
}

/// 获取下一页
///
/// # 参数说明
/// * `catalog` - 目录客户端
/// * `cursor` - 会话的游标
///
/// # 返回值
/// 没有游标时返回 `NO_PREVIOUS_QUERY`；否则按游标重放 `page + 1` 的请求，
/// 成功时原地递增游标页码，失败时游标保持不变以便重试。
pub async fn advance(catalog: &CatalogClient, cursor: &mut Option<Cursor>) -> ToolOutcome {
    let Some(current) = cursor.as_mut() else {
        return ToolFailure::new(FailureKind::NoPreviousQuery)
            .detail(NO_PREVIOUS_QUERY_DETAIL)
            .into();
    };

    let outcome = match &*current {
        Cursor::List {
            sort,
            tab,
            category_id,
            page,
            size,
        } => {
            let query = ListQuery {
                sort: *sort,
                tab: *tab,
                category_id: *category_id,
                params: PageParams {
                    page: page.saturating_add(1),
                    size: *size,
                },
            };
            catalog.fetch_courses(&query).await
        }
        Cursor::Search { keyword, page, size } => {
            let query = SearchQuery {
                keyword: keyword.clone(),
                hint: None,
                params: PageParams {
                    page: page.saturating_add(1),
                    size: *size,
                },
            };
            catalog.run_search(&query).await
        }
    };

    if !outcome.is_failure() {
        current.increment_page();
    }
    outcome
}
