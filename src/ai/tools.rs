//! 工具定义模块
//!
//! 暴露给模型的固定工具集合，以及工具名称与内部操作之间的映射。

use serde_json::{json, Value};

use super::provider::ToolDefinition;

/// 课程目录工具
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogTool {
    /// 分类名称 -> categoryId
    ResolveCategoryId,
    /// 热门课程（全部）
    GetPopularCourses,
    /// 最新课程（全部）
    GetLatestCourses,
    /// 热门课程（按分类）
    GetPopularCoursesByCategory,
    /// 最新课程（按分类）
    GetLatestCoursesByCategory,
    /// 关键词搜索
    SearchCourses,
    /// 下一页（分页伪工具）
    GetNextPage,
    /// 调试：热门课程原始数据
    DebugPopularRaw,
}

impl CatalogTool {
    /// 全部工具，按声明顺序
    pub const ALL: [CatalogTool; 8] = [
        CatalogTool::ResolveCategoryId,
        CatalogTool::GetPopularCourses,
        CatalogTool::GetLatestCourses,
        CatalogTool::GetPopularCoursesByCategory,
        CatalogTool::GetLatestCoursesByCategory,
        CatalogTool::SearchCourses,
        CatalogTool::GetNextPage,
        CatalogTool::DebugPopularRaw,
    ];

    /// 工具名称
    pub fn name(self) -> &'static str {
        match self {
            CatalogTool::ResolveCategoryId => "resolve_category_id",
            CatalogTool::GetPopularCourses => "get_popular_courses",
            CatalogTool::GetLatestCourses => "get_latest_courses",
            CatalogTool::GetPopularCoursesByCategory => "get_popular_courses_by_category",
            CatalogTool::GetLatestCoursesByCategory => "get_latest_courses_by_category",
            CatalogTool::SearchCourses => "search_courses",
            CatalogTool::GetNextPage => "get_next_page",
            CatalogTool::DebugPopularRaw => "debug_popular_raw",
        }
    }

    /// 根据名称查找工具，未知名称返回 None
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// 工具定义（名称、描述、JSON Schema 参数）
    pub fn definition(self) -> ToolDefinition {
        let (description, parameters) = match self {
            CatalogTool::ResolveCategoryId => (
                "카테고리 이름을 받아 categoryId로 매핑한다. 내부적으로 카테고리 목록을 조회해 가장 유사한 이름을 찾는다.",
                json!({
                    "type": "object",
                    "properties": {
                        "categoryName": {"type": "string", "description": "예: '프론트엔드', '백엔드', '자바'"}
                    },
                    "required": ["categoryName"]
                }),
            ),
            CatalogTool::GetPopularCourses => ("인기 강의 목록(전체)을 가져온다.", list_parameters(false)),
            CatalogTool::GetLatestCourses => ("신규 강의 목록(전체)을 가져온다.", list_parameters(false)),
            CatalogTool::GetPopularCoursesByCategory => (
                "인기 강의(카테고리)를 가져온다. categoryId는 resolve_category_id 결과만 사용.",
                list_parameters(true),
            ),
            CatalogTool::GetLatestCoursesByCategory => (
                "신규 강의(카테고리)를 가져온다. categoryId는 resolve_category_id 결과만 사용.",
                list_parameters(true),
            ),
            CatalogTool::SearchCourses => (
                "검색어로 강의를 검색한다. '#10' 또는 '10번' 같은 번호가 있으면 해당 강의 하나를 찾아준다.",
                json!({
                    "type": "object",
                    "properties": {
                        "keyword": {"type": "string", "description": "검색어 (예: 자바, 스프링, #10 강의)"},
                        "page": {"type": "integer", "description": "페이지 번호(0부터). 기본 0"},
                        "size": {"type": "integer", "description": "페이지 크기. 기본 12"}
                    },
                    "required": ["keyword"]
                }),
            ),
            CatalogTool::GetNextPage => (
                "더보기/다음: 직전 요청이 검색이면 검색 다음 페이지, 아니면 목록 다음 페이지를 가져온다.",
                json!({"type": "object", "properties": {}, "required": []}),
            ),
            CatalogTool::DebugPopularRaw => (
                "디버그: 인기 강의 API 원본 JSON(정규화 포함)을 그대로 반환한다.",
                json!({
                    "type": "object",
                    "properties": {
                        "page": {"type": "integer", "description": "페이지 번호(0부터)"},
                        "size": {"type": "integer", "description": "페이지 크기"}
                    },
                    "required": []
                }),
            ),
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

fn list_parameters(with_category: bool) -> Value {
    let mut properties = json!({
        "tab": {"type": "string", "description": "탭 필터 (all|free). 기본 all"},
        "page": {"type": "integer", "description": "페이지 번호(0부터). 기본 0"},
        "size": {"type": "integer", "description": "페이지 크기. 기본 12"}
    });
    let mut required = Vec::new();

    if with_category {
        properties["categoryId"] = json!({
            "type": "integer",
            "description": "카테고리 ID (resolve_category_id로 얻은 값만)"
        });
        required.push("categoryId");
    }

    json!({"type": "object", "properties": properties, "required": required})
}

/// 完整的工具定义列表
pub fn catalog_tools() -> Vec<ToolDefinition> {
    CatalogTool::ALL.into_iter().map(CatalogTool::definition).collect()
}
