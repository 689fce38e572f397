//! 调用参数绑定与路径组合

use log::warn;
use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::cancel::CancelToken;
use crate::error::{RcpError, Result};
use crate::types::header::{Cookies, HeaderValue, Headers, merge_headers, parse_cookie_string};
use crate::types::param::{Arg, ParamBinding, ParamRole, RequestContent};
use crate::types::range::{RangeSpec, parse_transfer_range};

/// 按绑定解析出的请求组成部分
#[derive(Debug, Default)]
pub struct BoundParams {
    pub queries: Vec<(String, String)>,
    pub content: Option<RequestContent>,
    pub headers: Headers,
    pub cookies: Cookies,
    pub token: Option<CancelToken>,
    pub range: Option<RangeSpec>,
}

/// 依次解析每个绑定
///
/// 缺失或为空的参数不产生查询参数、请求头与 Cookie；
/// 多个 `Content` 绑定时最后一个生效。
pub fn bind(bindings: &[ParamBinding], args: &[Arg]) -> Result<BoundParams> {
    let mut bound = BoundParams::default();
    let null = Arg::Null;

    for binding in bindings {
        let arg = args.get(binding.index).unwrap_or(&null);
        match binding.role {
            ParamRole::Query => {
                if let Some(value) = arg.stringify() {
                    bound.queries.push((binding.key.clone(), value));
                }
            }
            ParamRole::Content => bound.content = content_of(arg)?,
            ParamRole::Header => {
                if let Some(value) = header_value_of(arg) {
                    let mut delta = Headers::new();
                    delta.insert(binding.key.clone(), value);
                    merge_headers(&mut bound.headers, &delta);
                }
            }
            ParamRole::Cookie if binding.key.is_empty() => bound.cookies.extend(cookies_of(arg)),
            ParamRole::Cookie => {
                if let Some(value) = arg.stringify() {
                    bound.cookies.insert(binding.key.clone(), value);
                }
            }
            ParamRole::CancelToken => {
                if let Arg::Token(token) = arg {
                    bound.token = Some(token.clone());
                }
            }
            ParamRole::TransferRange => match parse_transfer_range(arg) {
                Some(range) => bound.range = Some(range),
                None if !arg.is_null() => {
                    warn!("ignoring malformed transfer range argument {:?}", arg);
                }
                None => {}
            },
        }
    }

    Ok(bound)
}

fn content_of(arg: &Arg) -> Result<Option<RequestContent>> {
    let content = match arg {
        _ if arg.is_null() => None,
        Arg::Invalid(reason) => {
            return Err(RcpError::Configuration(format!(
                "request body could not be serialized: {}",
                reason
            )));
        }
        Arg::Token(_) => {
            return Err(RcpError::Configuration(
                "a cancel token cannot be used as request body".to_string(),
            ));
        }
        Arg::Content(content) => Some(content.clone()),
        Arg::Json(value) => Some(RequestContent::Json(value.clone())),
        Arg::Cookies(cookies) => Some(RequestContent::Form(
            cookies.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        )),
        other => other.stringify().map(RequestContent::Text),
    };
    Ok(content)
}

fn header_value_of(arg: &Arg) -> Option<HeaderValue> {
    match arg {
        Arg::Json(serde_json::Value::Array(items)) => {
            let values: Vec<String> = items
                .iter()
                .filter_map(|item| Arg::Json(item.clone()).stringify())
                .collect();
            (!values.is_empty()).then_some(HeaderValue::Multi(values))
        }
        other => other.stringify().map(HeaderValue::Single),
    }
}

fn cookies_of(arg: &Arg) -> Cookies {
    match arg {
        Arg::Text(raw) | Arg::Json(serde_json::Value::String(raw)) => parse_cookie_string(raw),
        Arg::Cookies(cookies) => cookies.clone(),
        Arg::Json(serde_json::Value::Object(map)) => map
            .iter()
            .filter_map(|(name, value)| {
                Arg::Json(value.clone())
                    .stringify()
                    .map(|value| (name.clone(), value))
            })
            .collect(),
        _ => Cookies::new(),
    }
}

/// 将成员路径拼接到 base address 的路径之后
///
/// 结果总以 `/` 开头；`path` 本身是完整 URL 或没有 base address 时原样返回。
pub fn combine_pathname(base_address: Option<&str>, path: &str) -> String {
    let Some(base) = base_address else {
        return path.to_string();
    };
    if path.contains("://") {
        return path.to_string();
    }

    let base_path = match Url::parse(base) {
        Ok(url) => url.path().to_string(),
        Err(_) => base.to_string(),
    };
    let base_path = base_path.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    let joined = if path.is_empty() {
        base_path.to_string()
    } else {
        format!("{}/{}", base_path, path)
    };
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{}", joined)
    }
}

/// 追加查询参数：先绑定参数（百分号编码），后路径中已有的查询串
pub fn merge_query(path: &str, bound: &[(String, String)]) -> String {
    let (pathname, declared) = match path.split_once('?') {
        Some((pathname, query)) => (pathname, query),
        None => (path, ""),
    };

    let mut pairs: Vec<String> = bound
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                byte_serialize(key.as_bytes()).collect::<String>(),
                byte_serialize(value.as_bytes()).collect::<String>()
            )
        })
        .collect();
    pairs.extend(
        declared
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(str::to_string),
    );

    if pairs.is_empty() {
        pathname.to_string()
    } else {
        format!("{}?{}", pathname, pairs.join("&"))
    }
}
