//! 课程目录模块
//!
//! 封装外部课程目录 API：
//! - client：目录客户端（列表、分类、搜索、调试）
//! - query：清洗后的查询参数
//! - normalize：分页响应规范化与详情页链接
//! - resolver：分类模糊匹配与序号提示
//! - types：分页结果与软失败类型

pub mod client;
pub mod normalize;
pub mod query;
pub mod resolver;
pub mod types;

pub use client::CatalogClient;
pub use query::{ListQuery, SearchQuery};
pub use resolver::{HintMatcher, TitleHintMatcher};
pub use types::{
    CategoryMatch, FailureKind, PageParams, PagedResult, SortOrder, Tab, ToolFailure, ToolOutcome,
};
