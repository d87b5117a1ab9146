//! 引用解析
//!
//! * 分类名称模糊匹配为 categoryId
//! * 从关键词中提取 `#N` / `N번` 序号提示，并在结果集中定位对应课程

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use similar::TextDiff;

use super::types::CategoryMatch;

/// 分类名称相似度下限
pub const CATEGORY_MATCH_CUTOFF: f32 = 0.4;

/// 默认的示例课程标题前缀
pub const DEFAULT_DEMO_TITLE_PREFIX: &str = "샘플 강의";

fn hint_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#([0-9]+)|([0-9]+)번").expect("序号提示正则非法"))
}

/// 提取序号提示
///
/// # 参数说明
/// * `text` - 原始关键词
///
/// # 返回值
/// `(清理后的关键词, 序号)`。只识别第一个 `#N` 或 `N번`，匹配片段会被移除，两侧空白收成一个空格；
/// 数字超出范围时视为没有提示，关键词原样返回。
pub fn extract_hint(text: &str) -> (String, Option<u64>) {
    let Some(caps) = hint_pattern().captures(text) else {
        return (text.to_string(), None);
    };

    let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
        return (text.to_string(), None);
    };

    let Ok(hint) = digits.as_str().parse::<u64>() else {
        return (text.to_string(), None);
    };

    let before = text[..whole.start()].trim();
    let after = text[whole.end()..].trim();
    let cleaned = match (before.is_empty(), after.is_empty()) {
        (false, false) => format!("{} {}", before, after),
        _ => format!("{}{}", before, after),
    };
    (cleaned, Some(hint))
}

/// 序号匹配策略
///
/// 在完整（未分页）的搜索结果中找到与序号对应的课程下标。
pub trait HintMatcher: Send + Sync + Debug {
    /// 返回匹配课程的下标，没有匹配时返回 None
    fn find(&self, items: &[Value], hint: u64) -> Option<usize>;
}

/// 按标题匹配序号
///
/// 依次尝试：标题含 `#N`、标题含 `<前缀> N`、标题含 `N`，每一步取第一条命中。
#[derive(Debug, Clone)]
pub struct TitleHintMatcher {
    demo_prefix: String,
}

impl TitleHintMatcher {
    /// 使用指定的示例标题前缀创建
    pub fn new(demo_prefix: impl Into<String>) -> Self {
        Self {
            demo_prefix: demo_prefix.into(),
        }
    }
}

impl Default for TitleHintMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_DEMO_TITLE_PREFIX)
    }
}

impl HintMatcher for TitleHintMatcher {
    fn find(&self, items: &[Value], hint: u64) -> Option<usize> {
        let patterns = [
            format!("#{}", hint),
            format!("{} {}", self.demo_prefix, hint),
            hint.to_string(),
        ];

        patterns.iter().find_map(|pattern| {
            items.iter().position(|item| {
                item.get("title")
                    .and_then(Value::as_str)
                    .is_some_and(|title| title.contains(pattern.as_str()))
            })
        })
    }
}

/// 两个字符串的相似度 `[0, 1]`
///
/// 基于最长公共子序列，与 Ratcliff/Obershelp 算法在 0.4 附近的短字符串上可能给出不同结果。
pub fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

fn category_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 收集有效分类：名称非空且 categoryId 为整数，重名时后出现的覆盖先出现的
fn category_index(categories: &[Value]) -> BTreeMap<String, i64> {
    let mut index = BTreeMap::new();
    for entry in categories {
        let name = entry.get("name").and_then(Value::as_str).filter(|n| !n.is_empty());
        let id = entry.get("categoryId").and_then(category_id);
        if let (Some(name), Some(id)) = (name, id) {
            index.insert(name.to_string(), id);
        }
    }
    index
}

/// 在分类列表中找到与名称最相近的分类
///
/// # 参数说明
/// * `categories` - 后端返回的分类列表
/// * `name` - 用户给出的分类名
///
/// # 返回值
/// 相似度不低于 0.4 的最佳匹配；相似度相同时取名称较大者。没有匹配时两个字段都为 None
pub fn best_category_match(categories: &[Value], name: &str) -> CategoryMatch {
    let index = category_index(categories);

    let best = index
        .iter()
        .map(|(candidate, id)| (similarity(name, candidate), candidate, *id))
        .filter(|(score, _, _)| *score >= CATEGORY_MATCH_CUTOFF)
        .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    match best {
        Some((_, matched, id)) => CategoryMatch {
            category_id: Some(id),
            matched_name: Some(matched.clone()),
        },
        None => CategoryMatch::default(),
    }
}
