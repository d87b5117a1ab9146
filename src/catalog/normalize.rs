//! 响应规范化
//!
//! 后端的分页对象形态不固定（`items` / `content` / `data` / `list` / `results`），
//! 这里统一为带 `items` 的对象，并为每门课程附加详情页链接。

use serde_json::Value;

/// 可能承载课程列表的字段，按优先级排列
pub const ITEM_LIST_KEYS: [&str; 4] = ["content", "data", "list", "results"];

/// 规范化分页对象
///
/// * 非对象原样返回
/// * 已有数组类型的 `items` 时原样返回
/// * 否则取第一个数组类型的候选字段作为 `items`，都没有时 `items` 为空数组
///
/// 其余字段全部保留。
pub fn normalize_page(raw: Value) -> Value {
    let Value::Object(mut map) = raw else {
        return raw;
    };

    if map.get("items").is_some_and(Value::is_array) {
        return Value::Object(map);
    }

    let items = ITEM_LIST_KEYS
        .iter()
        .find_map(|key| map.get(*key).filter(|v| v.is_array()).cloned())
        .unwrap_or_else(|| Value::Array(Vec::new()));

    map.insert("items".to_string(), items);
    Value::Object(map)
}

/// 课程的标识：优先 `courseId`，为空时回退到 `id`
fn course_identifier(item: &Value) -> Option<String> {
    let primary = item.get("courseId").filter(|v| is_truthy(v));
    let id = primary.or_else(|| item.get("id")).filter(|v| !v.is_null())?;

    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// 生成课程详情页链接
pub fn detail_url(web_base_url: &str, course_id: &str) -> String {
    format!(
        "{}/CourseDetail?courseId={}&tab=intro",
        web_base_url.trim_end_matches('/'),
        course_id
    )
}

/// 为单门课程附加 `detailUrl`
///
/// 非对象或没有标识的条目原样返回；重复调用结果不变。
pub fn attach_detail_link(item: Value, web_base_url: &str) -> Value {
    let Some(course_id) = course_identifier(&item) else {
        return item;
    };

    match item {
        Value::Object(mut map) => {
            map.insert(
                "detailUrl".to_string(),
                Value::String(detail_url(web_base_url, &course_id)),
            );
            Value::Object(map)
        }
        other => other,
    }
}

/// 为列表中的每门课程附加 `detailUrl`
pub fn attach_detail_links(items: Vec<Value>, web_base_url: &str) -> Vec<Value> {
    items
        .into_iter()
        .map(|item| attach_detail_link(item, web_base_url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WEB: &str = "http://localhost:5173";

    #[test]
    fn test_normalize_promotes_first_list_key() {
        let page = normalize_page(json!({"data": "x", "list": [1, 2], "results": [3]}));
        assert_eq!(page["items"], json!([1, 2]));
        assert_eq!(page["data"], "x");
        assert_eq!(page["list"], json!([1, 2]));
    }

    #[test]
    fn test_normalize_keeps_existing_items() {
        let raw = json!({"items": [{"id": 1}], "content": [{"id": 2}]});
        assert_eq!(normalize_page(raw.clone()), raw);
    }

    #[test]
    fn test_normalize_without_candidates() {
        let page = normalize_page(json!({"items": "nope", "total": 0}));
        assert_eq!(page["items"], json!([]));
        assert_eq!(page["total"], 0);
    }

    #[test]
    fn test_normalize_non_object_is_identity() {
        assert_eq!(normalize_page(json!([1, 2, 3])), json!([1, 2, 3]));
        assert_eq!(normalize_page(json!("text")), json!("text"));
        assert_eq!(normalize_page(Value::Null), Value::Null);
    }

    #[test]
    fn test_detail_link_prefers_course_id() {
        let item = attach_detail_link(json!({"courseId": 7, "id": 99, "title": "A"}), WEB);
        assert_eq!(
            item["detailUrl"],
            "http://localhost:5173/CourseDetail?courseId=7&tab=intro"
        );
        assert_eq!(item["title"], "A");
    }

    #[test]
    fn test_detail_link_falls_back_to_id() {
        let item = attach_detail_link(json!({"courseId": null, "id": "c-12"}), WEB);
        assert_eq!(
            item["detailUrl"],
            "http://localhost:5173/CourseDetail?courseId=c-12&tab=intro"
        );
    }

    #[test]
    fn test_detail_link_skips_unidentified_items() {
        assert_eq!(attach_detail_link(json!({"title": "x"}), WEB), json!({"title": "x"}));
        assert_eq!(attach_detail_link(json!(42), WEB), json!(42));
    }

    #[test]
    fn test_detail_link_is_idempotent() {
        let once = attach_detail_links(vec![json!({"courseId": 3})], WEB);
        let twice = attach_detail_links(once.clone(), WEB);
        assert_eq!(once, twice);
    }
}
