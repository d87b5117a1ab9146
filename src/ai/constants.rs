//! AI 模块常量定义
//!
//! 集中管理 AI 模块中的所有硬编码常量
//!
//! # 常量分类
//! - API 基础 URL 与 HTTP 参数
//! - 系统提示词
//! - 工具调用循环
//! - 固定回复

use std::time::Duration;

/// ==================== API 基础 URL ====================

/// OpenAI API 基础 URL
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// ==================== HTTP 参数 ====================

/// 模型请求超时时间（60秒）
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// 连接池空闲超时（30秒）
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// 连接池最大空闲连接数
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// ==================== 系统提示词 ====================

/// 固定系统提示词，每个会话历史的第一条消息
pub const SYSTEM_PROMPT: &str = concat!(
    "너는 강의 추천 AI다. ",
    "사용자가 강의 목록(인기/신규/무료/카테고리/더보기/검색)을 요청하면 반드시 tool을 호출해 API 결과 기반으로만 답변하라. ",
    "규칙: 인기/핫/많이결제=popular, 신규/최근=latest, 무료/0원=tab:free, 그 외 tab:all. ",
    "사용자가 특정 키워드(예: '자바 강의', '스프링 찾아줘')나 번호(예: '#10 강의', '10번 강의')를 말하면 search_courses를 호출하라. ",
    "카테고리 이름이 명확히 언급되면 resolve_category_id로 categoryId를 얻은 뒤 ",
    "get_popular_courses_by_category 또는 get_latest_courses_by_category를 호출하라. ",
    "categoryId가 null이면 카테고리 없이 get_popular_courses 또는 get_latest_courses를 호출하라. ",
    "사용자가 '더보기/다음/계속'을 말하면 get_next_page를 호출하라. ",
    "문장에 '최신'과 '인기'가 동시에 있으면 하나만 선택해서 호출하라. 기본 우선순위는 인기(popular)이다. ",
    "툴 호출 없이 추측 금지. ",
    "응답에 이미지 마크다운(![...](...))을 절대 포함하지 마라. ",
    "항상 각 강의마다 detailUrl(상세페이지 링크)을 함께 안내하라. ",
    "사용자가 '원본', 'raw', '디버그'라고 하면 debug_popular_raw를 호출해 원본 JSON을 보여줘라."
);

/// ==================== 工具调用循环 ====================

/// 单轮对话中工具调用的默认最大轮数
pub const MAX_TOOL_ROUNDS: usize = 10;

/// ==================== 固定回复 ====================

/// 模型输出空文本时的占位回复
pub const EMPTY_REPLY: &str = "(empty)";

/// 超出工具调用轮数时的回复
pub const LOOP_EXCEEDED_REPLY: &str = "요청을 처리하는 중 도구 호출이 너무 많이 반복되었어요. 다시 한 번 말씀해 주세요.";

/// 找到多门课程时的回复模板前缀
pub const FOUND_COURSES_TEMPLATE: &str = "강의 {count}개를 찾았어요.";

/// 通过序号定位到单门课程时的回复
pub const FOUND_SINGLE_COURSE_REPLY: &str = "요청하신 강의를 찾았어요.";

/// 生成"找到 N 门课程"回复
pub fn found_courses_reply(count: usize) -> String {
    FOUND_COURSES_TEMPLATE.replace("{count}", &count.to_string())
}
