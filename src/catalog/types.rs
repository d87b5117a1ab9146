//! 课程目录类型定义
//!
//! 包含分页参数的清洗规则、规范化的分页结果，以及工具执行结果的标签联合。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::normalize::ITEM_LIST_KEYS;

/// 默认页大小
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// 最大页大小
pub const MAX_PAGE_SIZE: u32 = 50;

/// 标签页过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    /// 全部课程
    #[default]
    All,
    /// 免费课程
    Free,
}

impl Tab {
    /// 解析标签页，只接受 `all` / `free`，其他值一律视为 `all`
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("free") => Tab::Free,
            _ => Tab::All,
        }
    }

    /// 查询参数值
    pub fn as_str(self) -> &'static str {
        match self {
            Tab::All => "all",
            Tab::Free => "free",
        }
    }
}

/// 排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// 热门
    Popular,
    /// 最新
    Latest,
}

impl SortOrder {
    /// 查询参数值
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Popular => "popular",
            SortOrder::Latest => "latest",
        }
    }
}

/// 清洗后的分页参数
///
/// * `page` 从 0 开始，负数或缺省为 0
/// * `size` 范围 `(0, 50]`，越界或缺省为 12
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    /// 页码
    pub page: u32,
    /// 页大小
    pub size: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageParams {
    /// 按清洗规则构造分页参数
    pub fn sanitize(page: Option<i64>, size: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p > 0 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => 0,
        };
        let size = match size {
            Some(s) if s > 0 && s <= i64::from(MAX_PAGE_SIZE) => s as u32,
            _ => DEFAULT_PAGE_SIZE,
        };
        Self { page, size }
    }

    /// 下一页
    pub fn next(self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            size: self.size,
        }
    }

    /// 当前页在完整结果集中的起止下标 `[start, end)`
    pub fn window(self) -> (usize, usize) {
        let size = self.size as usize;
        let start = (self.page as usize).saturating_mul(size);
        (start, start.saturating_add(size))
    }
}

/// 规范化的分页结果
///
/// `items` 始终存在；后端返回的其他字段原样保留在 `extra` 中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult {
    /// 课程列表（已附加 detailUrl）
    pub items: Vec<Value>,
    /// 页码
    pub page: u32,
    /// 页大小
    pub size: u32,
    /// 总数（后端提供或搜索时的完整结果数）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// 命中的序号提示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<u64>,
    /// 去掉序号后的关键词
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// 透传字段
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 由 `PagedResult` 自身管理、不能出现在透传字段里的键
const RESERVED_KEYS: [&str; 6] = ["items", "page", "size", "total", "hint", "keyword"];

/// 后端可能使用的总数字段
const TOTAL_KEYS: [&str; 4] = ["total", "totalElements", "totalCount", "totalItems"];

impl PagedResult {
    /// 创建只包含列表的分页结果
    pub fn new(items: Vec<Value>, params: PageParams, total: Option<u64>) -> Self {
        Self {
            items,
            page: params.page,
            size: params.size,
            total,
            hint: None,
            keyword: None,
            extra: Map::new(),
        }
    }

    /// 从规范化后的后端分页对象构造
    ///
    /// * 对象：取出 `items`，识别总数字段，其余字段透传；已提升为 `items` 的候选列表字段不再重复保留
    /// * 数组：整体作为 `items`
    /// * 其他：空列表
    pub fn from_page(normalized: Value, params: PageParams) -> Self {
        match normalized {
            Value::Object(mut map) => {
                let items = match map.remove("items") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                let total = TOTAL_KEYS
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_u64));

                for key in RESERVED_KEYS {
                    map.remove(key);
                }
                for key in ITEM_LIST_KEYS {
                    if map.get(key).is_some_and(Value::is_array) {
                        map.remove(key);
                    }
                }

                Self {
                    extra: map,
                    ..Self::new(items, params, total)
                }
            }
            Value::Array(items) => Self::new(items, params, None),
            _ => Self::new(Vec::new(), params, None),
        }
    }
}

/// 分类匹配结果
///
/// 没有匹配时两个字段都为 `null`，调用方应视为"不按分类过滤"。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMatch {
    /// 分类 ID
    pub category_id: Option<i64>,
    /// 匹配到的分类名
    pub matched_name: Option<String>,
}

/// 软失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 后端返回非 2xx 或请求本身失败（含超时）
    RequestFailed,
    /// 后端返回的不是 JSON
    NonJsonResponse,
    /// categoryId 缺失或不合法
    InvalidCategory,
    /// 没有可翻页的上一次查询
    NoPreviousQuery,
    /// 未知的工具名称
    UnknownFunction,
    /// 工具调用轮数超限
    ToolLoopExceeded,
}

impl FailureKind {
    /// 与具体接口无关的错误码
    pub fn code(self) -> &'static str {
        match self {
            FailureKind::RequestFailed => "REQUEST_FAILED",
            FailureKind::NonJsonResponse => "NON_JSON_RESPONSE",
            FailureKind::InvalidCategory => "INVALID_CATEGORY_ID",
            FailureKind::NoPreviousQuery => "NO_PREVIOUS_QUERY",
            FailureKind::UnknownFunction => "UNKNOWN_FUNCTION",
            FailureKind::ToolLoopExceeded => "TOOL_LOOP_EXCEEDED",
        }
    }
}

/// 软失败
///
/// 序列化为 `{"error": <code>, "detail": ..., ...context}`，原样交给模型。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolFailure {
    /// 类别
    #[serde(skip)]
    pub kind: FailureKind,
    /// 错误码
    #[serde(rename = "error")]
    pub code: String,
    /// 说明
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// 诊断上下文（status、url、body 等）
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

impl ToolFailure {
    /// 使用类别默认错误码创建
    pub fn new(kind: FailureKind) -> Self {
        Self::with_code(kind, kind.code())
    }

    /// 使用接口前缀创建，例如 `COURSE_API` + `RequestFailed` => `COURSE_API_REQUEST_FAILED`
    pub fn for_api(api: &str, kind: FailureKind) -> Self {
        Self::with_code(kind, format!("{}_{}", api, kind.code()))
    }

    fn with_code(kind: FailureKind, code: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            detail: None,
            context: Map::new(),
        }
    }

    /// 附加说明
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 附加诊断字段
    pub fn context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

/// 工具执行结果
///
/// 内部逻辑使用的标签联合，只在交给模型时序列化为通用 JSON。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutcome {
    /// 分页课程列表
    Page(PagedResult),
    /// 规范化后的原始数据（调试用）
    Raw(Value),
    /// 分类匹配结果
    Category(CategoryMatch),
    /// 软失败
    Failure(ToolFailure),
}

impl ToolOutcome {
    /// 是否为软失败
    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutcome::Failure(_))
    }

    /// 软失败类别
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ToolOutcome::Failure(failure) => Some(failure.kind),
            _ => None,
        }
    }

    /// 结果携带的课程列表
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            ToolOutcome::Page(page) => Some(&page.items),
            ToolOutcome::Raw(value) => value.get("items").and_then(Value::as_array).map(Vec::as_slice),
            _ => None,
        }
    }

    /// 是否为序号定位到的单门课程
    pub fn is_hint_match(&self) -> bool {
        matches!(self, ToolOutcome::Page(page) if page.hint.is_some())
    }

    /// 交给模型的工具输出：`{"result": <结果>}`
    pub fn to_tool_output(&self) -> String {
        serde_json::json!({ "result": self }).to_string()
    }
}

impl From<ToolFailure> for ToolOutcome {
    fn from(failure: ToolFailure) -> Self {
        ToolOutcome::Failure(failure)
    }
}
