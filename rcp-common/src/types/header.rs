use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 请求头的值：单值或保持顺序且去重的多值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    pub fn values(&self) -> &[String] {
        match self {
            HeaderValue::Single(value) => std::slice::from_ref(value),
            HeaderValue::Multi(values) => values,
        }
    }

    /// 多值请求头按 `, ` 拼接为单行
    pub fn joined(&self) -> String {
        self.values().join(", ")
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Single(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Single(value)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        HeaderValue::Multi(values)
    }
}

pub type Headers = BTreeMap<String, HeaderValue>;
pub type Cookies = BTreeMap<String, String>;

/// 合并两个请求头值
///
/// 先取 `a` 的值再取 `b` 的值，按首次出现的顺序去重。
/// 结果只有一个值时退化为 `Single`，没有值时返回 `None`。
pub fn concat_to_array_or_string(
    a: Option<&HeaderValue>,
    b: Option<&HeaderValue>,
) -> Option<HeaderValue> {
    let mut merged: Vec<String> = Vec::new();
    for value in a.into_iter().chain(b).flat_map(HeaderValue::values) {
        if !merged.contains(value) {
            merged.push(value.clone());
        }
    }

    match merged.len() {
        0 => None,
        1 => merged.pop().map(HeaderValue::Single),
        _ => Some(HeaderValue::Multi(merged)),
    }
}

/// 去重后的规范形式，`concat(a, a) == normalize(a)`
pub fn normalize(value: &HeaderValue) -> Option<HeaderValue> {
    concat_to_array_or_string(Some(value), None)
}

/// 将 `delta` 中的每个键按去重拼接规则合并进 `target`
pub fn merge_headers(target: &mut Headers, delta: &Headers) {
    for (key, value) in delta {
        match concat_to_array_or_string(target.get(key), Some(value)) {
            Some(merged) => {
                target.insert(key.clone(), merged);
            }
            None => {
                target.remove(key);
            }
        }
    }
}

/// 解析 `a=1; b=2` 形式的 Cookie 字符串，缺少 `=` 的片段被忽略
pub fn parse_cookie_string(raw: &str) -> Cookies {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// 生成 `Cookie` 请求头的值
pub fn cookie_header(cookies: &Cookies) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}
