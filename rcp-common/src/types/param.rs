use std::fmt;

use proc_macro2::{Ident, Span, TokenStream};
use quote::{ToTokens, quote};
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::types::header::{Cookies, cookie_header};
use crate::types::range::{RangeSpec, TransferRange};

/// 参数在请求构造中承担的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    Query,
    Content,
    Header,
    Cookie,
    CancelToken,
    TransferRange,
}

impl ParamRole {
    /// 该角色是否需要键名
    pub fn requires_key(&self) -> bool {
        matches!(self, ParamRole::Query | ParamRole::Header)
    }
}

impl ToTokens for ParamRole {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let variant = Ident::new(
            match self {
                ParamRole::Query => "Query",
                ParamRole::Content => "Content",
                ParamRole::Header => "Header",
                ParamRole::Cookie => "Cookie",
                ParamRole::CancelToken => "CancelToken",
                ParamRole::TransferRange => "TransferRange",
            },
            Span::call_site(),
        );
        tokens.extend(quote! { ::rcp_common::ParamRole::#variant });
    }
}

/// 参数位置与其角色的绑定
///
/// `key` 对 `Content`、`CancelToken`、`TransferRange` 为空；
/// `Cookie` 的空键表示整段 Cookie 字符串。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub index: usize,
    pub role: ParamRole,
    pub key: String,
}

impl ParamBinding {
    pub fn new(index: usize, role: ParamRole, key: impl Into<String>) -> Self {
        Self {
            index,
            role,
            key: key.into(),
        }
    }

    pub fn query(index: usize, key: impl Into<String>) -> Self {
        Self::new(index, ParamRole::Query, key)
    }

    pub fn content(index: usize) -> Self {
        Self::new(index, ParamRole::Content, "")
    }

    pub fn header(index: usize, key: impl Into<String>) -> Self {
        Self::new(index, ParamRole::Header, key)
    }

    pub fn cookie(index: usize, key: impl Into<String>) -> Self {
        Self::new(index, ParamRole::Cookie, key)
    }

    pub fn cancel_token(index: usize) -> Self {
        Self::new(index, ParamRole::CancelToken, "")
    }

    pub fn transfer_range(index: usize) -> Self {
        Self::new(index, ParamRole::TransferRange, "")
    }
}

impl ToTokens for ParamBinding {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let index = self.index;
        let role = self.role;
        let key = &self.key;
        tokens.extend(quote! { ::rcp_common::ParamBinding::new(#index, #role, #key) });
    }
}

/// 请求体
#[derive(Debug, Clone, PartialEq)]
pub enum RequestContent {
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// 调用时的实参
///
/// 声明层把每个位置参数转换为 `Arg`，绑定按下标读取。
#[derive(Clone, Default)]
pub enum Arg {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    Json(serde_json::Value),
    Content(RequestContent),
    Cookies(Cookies),
    Token(CancelToken),
    Range(RangeSpec),
    /// 序列化失败的参数，携带失败原因
    Invalid(String),
}

impl Arg {
    /// 将任意可序列化的值转换为 JSON 参数
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Arg::Json(value),
            Err(e) => Arg::Invalid(e.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Arg::Null | Arg::Json(serde_json::Value::Null))
    }

    /// 查询参数、请求头与 Cookie 使用的字符串形式
    pub fn stringify(&self) -> Option<String> {
        match self {
            Arg::Null | Arg::Token(_) | Arg::Invalid(_) => None,
            Arg::Text(text) => Some(text.clone()),
            Arg::Number(value) => Some(format_number(*value)),
            Arg::Integer(value) => Some(value.to_string()),
            Arg::Bool(value) => Some(value.to_string()),
            Arg::Json(serde_json::Value::Null) => None,
            Arg::Json(serde_json::Value::String(text)) => Some(text.clone()),
            Arg::Json(value) => Some(value.to_string()),
            Arg::Content(RequestContent::Text(text)) => Some(text.clone()),
            Arg::Content(RequestContent::Bytes(bytes)) => {
                Some(String::from_utf8_lossy(bytes).into_owned())
            }
            Arg::Content(RequestContent::Json(value)) => Some(value.to_string()),
            Arg::Content(RequestContent::Form(pairs)) => Some(
                url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish(),
            ),
            Arg::Cookies(cookies) => cookie_header(cookies),
            Arg::Range(spec) => Some(spec.header_value()),
        }
    }
}

/// 整数值不带小数部分输出
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Null => f.write_str("Null"),
            Arg::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Arg::Number(value) => f.debug_tuple("Number").field(value).finish(),
            Arg::Integer(value) => f.debug_tuple("Integer").field(value).finish(),
            Arg::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Arg::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Arg::Content(content) => f.debug_tuple("Content").field(content).finish(),
            Arg::Cookies(cookies) => f.debug_tuple("Cookies").field(cookies).finish(),
            Arg::Token(token) => f.debug_tuple("Token").field(&token.is_cancel()).finish(),
            Arg::Range(spec) => f.debug_tuple("Range").field(spec).finish(),
            Arg::Invalid(reason) => f.debug_tuple("Invalid").field(reason).finish(),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::Text(value.clone())
    }
}

macro_rules! integer_args {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Integer(i64::from(value))
                }
            }
        )*
    };
}

integer_args!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Arg::Number(value as f64), Arg::Integer)
    }
}

impl From<usize> for Arg {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(Arg::Number(value as f64), Arg::Integer)
    }
}

impl From<f32> for Arg {
    fn from(value: f32) -> Self {
        Arg::Number(f64::from(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Number(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<serde_json::Value> for Arg {
    fn from(value: serde_json::Value) -> Self {
        Arg::Json(value)
    }
}

impl From<Vec<u8>> for Arg {
    fn from(value: Vec<u8>) -> Self {
        Arg::Content(RequestContent::Bytes(value))
    }
}

impl From<RequestContent> for Arg {
    fn from(value: RequestContent) -> Self {
        Arg::Content(value)
    }
}

impl From<Cookies> for Arg {
    fn from(value: Cookies) -> Self {
        Arg::Cookies(value)
    }
}

impl From<CancelToken> for Arg {
    fn from(value: CancelToken) -> Self {
        Arg::Token(value)
    }
}

impl From<&CancelToken> for Arg {
    fn from(value: &CancelToken) -> Self {
        Arg::Token(value.clone())
    }
}

impl From<RangeSpec> for Arg {
    fn from(value: RangeSpec) -> Self {
        Arg::Range(value)
    }
}

impl From<TransferRange> for Arg {
    fn from(value: TransferRange) -> Self {
        Arg::Range(RangeSpec::Single(value))
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(Arg::from("abc").stringify().unwrap(), "abc");
        assert_eq!(Arg::from(42u32).stringify().unwrap(), "42");
        assert_eq!(Arg::from(1.0f64).stringify().unwrap(), "1");
        assert_eq!(Arg::from(1.5f64).stringify().unwrap(), "1.5");
        assert_eq!(Arg::from(true).stringify().unwrap(), "true");
        assert!(Arg::Null.stringify().is_none());
        assert!(Arg::from(None::<String>).stringify().is_none());
    }

    #[test]
    fn test_stringify_json() {
        assert_eq!(Arg::from(serde_json::json!("raw")).stringify().unwrap(), "raw");
        assert_eq!(
            Arg::from(serde_json::json!({"a": 1})).stringify().unwrap(),
            "{\"a\":1}"
        );
        assert!(Arg::from(serde_json::Value::Null).is_null());
    }

    #[test]
    fn test_json_serialization_failure_is_invalid() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], "value");
        assert!(matches!(Arg::json(&map), Arg::Invalid(_)));
    }

    #[test]
    fn test_large_unsigned_falls_back_to_number() {
        assert!(matches!(Arg::from(u64::MAX), Arg::Number(_)));
        assert!(matches!(Arg::from(7usize), Arg::Integer(7)));
    }

    #[test]
    fn test_binding_constructors() {
        let binding = ParamBinding::query(2, "page");
        assert_eq!(binding.index, 2);
        assert_eq!(binding.role, ParamRole::Query);
        assert_eq!(binding.key, "page");
        assert!(ParamBinding::content(0).key.is_empty());
        assert!(ParamRole::Header.requires_key());
        assert!(!ParamRole::Cookie.requires_key());
    }

    #[test]
    fn test_binding_tokens() {
        let tokens = ParamBinding::header(1, "X-Trace").to_token_stream().to_string();
        assert!(tokens.contains("ParamBinding :: new"));
        assert!(tokens.contains("ParamRole :: Header"));
        assert!(tokens.contains("\"X-Trace\""));
    }
}
