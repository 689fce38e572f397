use std::str::FromStr;

use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Ident, Lit, LitBool, LitInt, LitStr, Meta, Token};

use crate::parsing::client::{parse_duration_value, parse_string_value};
use crate::types::args::{ParamAttr, RetryArg, RouteAttr};
use crate::types::http::HttpMethod;
use crate::types::response::DestinationKind;
use crate::types::retry::RetryConfig;

/// 路由方法上可用的属性名
pub const ROUTE_ATTRIBUTES: &[&str] = &[
    "get",
    "post",
    "put",
    "delete",
    "patch",
    "head",
    "options",
    "request",
    "retry",
    "auto_close",
    "header",
    "cookie",
    "map",
    "destination",
    "interceptor",
    "no_request",
];

/// 路由参数上可用的属性名
pub const PARAM_ATTRIBUTES: &[&str] = &[
    "query",
    "content",
    "header",
    "cookie",
    "cancel_token",
    "transfer_range",
];

fn attribute_name(attr: &Attribute) -> Option<String> {
    attr.path().get_ident().map(Ident::to_string)
}

pub fn is_route_attribute(attr: &Attribute) -> bool {
    attribute_name(attr).is_some_and(|name| ROUTE_ATTRIBUTES.contains(&name.as_str()))
}

pub fn is_param_attribute(attr: &Attribute) -> bool {
    attribute_name(attr).is_some_and(|name| PARAM_ATTRIBUTES.contains(&name.as_str()))
}

impl RouteAttr {
    /// 解析方法属性，不属于路由声明的属性返回 `None`
    pub fn from_attribute(attr: &Attribute) -> syn::Result<Option<Self>> {
        if !is_route_attribute(attr) {
            return Ok(None);
        }
        let name = attribute_name(attr).unwrap_or_default();

        let parsed = match name.as_str() {
            "get" | "post" | "put" | "delete" | "patch" | "head" | "options" => {
                let method = HttpMethod::from_str(&name).map_err(|msg| syn::Error::new_spanned(attr, msg))?;
                RouteAttr::Bind {
                    method,
                    path: attr.parse_args::<LitStr>()?,
                    timeout_ms: None,
                }
            }
            "request" => parse_request(attr)?,
            "retry" => RouteAttr::Retry(match attr.parse_args::<Lit>()? {
                Lit::Int(count) => RetryArg::Count(count.base10_parse()?),
                Lit::Str(policy) => RetryArg::Policy(RetryConfig::parse(&policy)?),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "retry must be a count (e.g., 2) or a policy string (e.g., \"exponential(3, 100ms)\")",
                    ));
                }
            }),
            "auto_close" => match &attr.meta {
                Meta::Path(_) => RouteAttr::AutoClose(true),
                _ => RouteAttr::AutoClose(attr.parse_args::<LitBool>()?.value),
            },
            "header" => {
                let (name, value) = parse_string_pair(attr)?;
                RouteAttr::Header(name, value)
            }
            "cookie" => {
                let (name, value) = parse_string_pair(attr)?;
                RouteAttr::Cookie(name, value)
            }
            "map" => RouteAttr::Map(attr.parse_args::<Expr>()?),
            "destination" => parse_destination(attr)?,
            "interceptor" => match &attr.meta {
                Meta::Path(_) => RouteAttr::Interceptor(None),
                _ => RouteAttr::Interceptor(Some(attr.parse_args::<LitInt>()?.base10_parse()?)),
            },
            "no_request" => {
                attr.meta.require_path_only()?;
                RouteAttr::NoRequest
            }
            _ => return Ok(None),
        };
        Ok(Some(parsed))
    }
}

/// `#[request(method = POST, path = "/x", timeout = "5s")]`
fn parse_request(attr: &Attribute) -> syn::Result<RouteAttr> {
    let mut method = None;
    let mut path = None;
    let mut timeout_ms = None;

    let pairs = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
    for pair in pairs {
        let Meta::NameValue(name_value) = pair else {
            return Err(syn::Error::new_spanned(pair, "expected key-value pair"));
        };
        let key = name_value.path.get_ident().ok_or_else(|| {
            syn::Error::new_spanned(&name_value.path, "expected identifier as key")
        })?;
        match key.to_string().as_str() {
            "method" => method = Some(parse_method_value(&name_value.value)?),
            "path" => path = Some(parse_string_value(&name_value.value, "path")?),
            "timeout" => timeout_ms = Some(parse_duration_value(&name_value.value, "timeout")?),
            _ => {
                return Err(syn::Error::new_spanned(
                    key,
                    "Only 'method', 'path', and 'timeout' are supported",
                ));
            }
        }
    }

    let path = path.ok_or_else(|| syn::Error::new_spanned(attr, "Missing required 'path' parameter"))?;
    Ok(RouteAttr::Bind {
        method: method.unwrap_or_default(),
        path,
        timeout_ms,
    })
}

fn parse_method_value(value: &Expr) -> syn::Result<HttpMethod> {
    let raw = match value {
        Expr::Path(expr_path) => expr_path
            .path
            .get_ident()
            .map(Ident::to_string)
            .ok_or_else(|| syn::Error::new_spanned(value, "method must be an identifier"))?,
        Expr::Lit(syn::ExprLit {
            lit: Lit::Str(lit), ..
        }) => lit.value(),
        _ => return Err(syn::Error::new_spanned(value, "method must be an identifier such as POST")),
    };
    HttpMethod::from_str(&raw).map_err(|msg| syn::Error::new_spanned(value, msg))
}

fn parse_string_pair(attr: &Attribute) -> syn::Result<(LitStr, LitStr)> {
    let values = attr.parse_args_with(Punctuated::<LitStr, Token![,]>::parse_terminated)?;
    let mut values = values.into_iter();
    match (values.next(), values.next(), values.next()) {
        (Some(name), Some(value), None) => Ok((name, value)),
        _ => Err(syn::Error::new_spanned(
            attr,
            "expected a name and a value, e.g. (\"X-Key\", \"value\")",
        )),
    }
}

/// `#[destination(download_to_file, "accessor")]`
fn parse_destination(attr: &Attribute) -> syn::Result<RouteAttr> {
    attr.parse_args_with(|input: syn::parse::ParseStream| {
        let kind: Ident = input.parse()?;
        input.parse::<Token![,]>()?;
        let accessor: LitStr = input.parse()?;
        let kind = DestinationKind::from_str(&kind.to_string()).map_err(|msg| syn::Error::new_spanned(&kind, msg))?;
        Ok(RouteAttr::Destination { kind, accessor })
    })
}

fn parse_optional_key(attr: &Attribute) -> syn::Result<Option<LitStr>> {
    match &attr.meta {
        Meta::Path(_) => Ok(None),
        Meta::List(_) => attr.parse_args::<LitStr>().map(Some),
        Meta::NameValue(_) => Err(syn::Error::new_spanned(attr, "expected #[name] or #[name(\"key\")]")),
    }
}

impl ParamAttr {
    /// 解析参数属性，不属于参数绑定的属性返回 `None`
    pub fn from_attribute(attr: &Attribute) -> syn::Result<Option<Self>> {
        if !is_param_attribute(attr) {
            return Ok(None);
        }
        let name = attribute_name(attr).unwrap_or_default();

        let parsed = match name.as_str() {
            "query" => ParamAttr::Query(parse_optional_key(attr)?),
            "header" => ParamAttr::Header(parse_optional_key(attr)?),
            "cookie" => ParamAttr::Cookie(parse_optional_key(attr)?),
            "content" | "cancel_token" | "transfer_range" => {
                attr.meta.require_path_only()?;
                match name.as_str() {
                    "content" => ParamAttr::Content,
                    "cancel_token" => ParamAttr::CancelToken,
                    _ => ParamAttr::TransferRange,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(parsed))
    }
}
