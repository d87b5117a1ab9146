//! 目录查询参数
//!
//! 列表与搜索请求在发出前统一清洗，同一份参数既用于请求也用于记录翻页游标。

use super::resolver::extract_hint;
use super::types::{FailureKind, PageParams, SortOrder, Tab, ToolFailure};

/// 课程列表查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 排序
    pub sort: SortOrder,
    /// 标签页
    pub tab: Tab,
    /// 分类过滤
    pub category_id: Option<i64>,
    /// 分页
    pub params: PageParams,
}

impl ListQuery {
    /// 不带分类的列表查询
    pub fn new(sort: SortOrder, tab: Option<&str>, page: Option<i64>, size: Option<i64>) -> Self {
        Self {
            sort,
            tab: Tab::parse(tab),
            category_id: None,
            params: PageParams::sanitize(page, size),
        }
    }

    /// 按分类的列表查询
    ///
    /// categoryId 缺失或不为正数时返回 `INVALID_CATEGORY_ID`
    pub fn in_category(
        sort: SortOrder,
        category_id: Option<i64>,
        tab: Option<&str>,
        page: Option<i64>,
        size: Option<i64>,
    ) -> Result<Self, ToolFailure> {
        match category_id {
            Some(id) if id > 0 => Ok(Self {
                category_id: Some(id),
                ..Self::new(sort, tab, page, size)
            }),
            _ => Err(ToolFailure::new(FailureKind::InvalidCategory)),
        }
    }

    /// 后端查询参数
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("sort", self.sort.as_str().to_string()),
            ("tab", self.tab.as_str().to_string()),
            ("page", self.params.page.to_string()),
            ("size", self.params.size.to_string()),
        ];
        if let Some(id) = self.category_id {
            pairs.push(("categoryId", id.to_string()));
        }
        pairs
    }
}

/// 关键词搜索
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// 去掉序号提示后的关键词
    pub keyword: String,
    /// 序号提示
    pub hint: Option<u64>,
    /// 分页
    pub params: PageParams,
}

impl SearchQuery {
    /// 从用户关键词构造，提取其中的序号提示
    pub fn new(keyword: &str, page: Option<i64>, size: Option<i64>) -> Self {
        let (keyword, hint) = extract_hint(keyword);
        Self {
            keyword,
            hint,
            params: PageParams::sanitize(page, size),
        }
    }

    /// 后端查询参数
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("keyword", self.keyword.clone()),
            ("page", self.params.page.to_string()),
            ("size", self.params.size.to_string()),
        ]
    }
}
