//! 声明宏的参数类型
//!
//! 解析实现见 `parsing` 模块，这里只定义数据结构以及生成代码时需要的 `ToTokens`。

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Expr, Ident, LitStr, Path};

use crate::types::http::HttpMethod;
use crate::types::options::{ProxyConfig, ProxyType};
use crate::types::param::{ParamBinding, ParamRole};
use crate::types::response::DestinationKind;
use crate::types::retry::RetryConfig;

/// `#[rcp_client(...)]` 的参数
#[derive(Default)]
pub struct ClientArgs {
    pub base_address: Option<LitStr>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub interceptors: Vec<Path>,
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub proxy: Option<ProxyConfig>,
    /// 解析响应去向名称的方法，签名为 `fn(&self, DestinationKind, &str) -> Option<Destination>`
    pub destination: Option<Ident>,
}

impl ClientArgs {
    pub fn has_connection(&self) -> bool {
        self.timeout_ms.is_some() || self.connect_timeout_ms.is_some() || self.proxy.is_some()
    }
}

/// `#[retry(...)]` 的两种写法
#[derive(Debug, Clone)]
pub enum RetryArg {
    /// `#[retry(2)]`
    Count(u32),
    /// `#[retry("exponential(3, 100ms)")]`，次数取自策略
    Policy(RetryConfig),
}

/// 路由方法上的属性
#[derive(Debug, Clone)]
pub enum RouteAttr {
    /// `#[get("/path")]` 或 `#[request(method = POST, path = "/path", timeout = "5s")]`
    Bind {
        method: HttpMethod,
        path: LitStr,
        timeout_ms: Option<u64>,
    },
    Retry(RetryArg),
    AutoClose(bool),
    Header(LitStr, LitStr),
    Cookie(LitStr, LitStr),
    /// `#[map(rcp_common::to_json)]`
    Map(Expr),
    /// `#[destination(download_to_file, "report_file")]`
    Destination { kind: DestinationKind, accessor: LitStr },
    /// `#[interceptor]` 或 `#[interceptor(0)]`
    Interceptor(Option<usize>),
    NoRequest,
}

impl RouteAttr {
    pub fn is_bind(&self) -> bool {
        matches!(self, RouteAttr::Bind { .. })
    }
}

/// 路由参数上的属性
#[derive(Debug, Clone)]
pub enum ParamAttr {
    /// 未给出名称时使用参数名
    Query(Option<LitStr>),
    Content,
    Header(Option<LitStr>),
    /// 不带名称时参数按完整的 Cookie 字符串解析
    Cookie(Option<LitStr>),
    CancelToken,
    TransferRange,
}

impl ParamAttr {
    pub fn role(&self) -> ParamRole {
        match self {
            ParamAttr::Query(_) => ParamRole::Query,
            ParamAttr::Content => ParamRole::Content,
            ParamAttr::Header(_) => ParamRole::Header,
            ParamAttr::Cookie(_) => ParamRole::Cookie,
            ParamAttr::CancelToken => ParamRole::CancelToken,
            ParamAttr::TransferRange => ParamRole::TransferRange,
        }
    }

    /// 生成位于 `index` 的参数绑定，`param_name` 用于补全缺省的名称
    pub fn binding(&self, index: usize, param_name: &str) -> ParamBinding {
        let key = match self {
            ParamAttr::Query(key) | ParamAttr::Header(key) => key
                .as_ref()
                .map(LitStr::value)
                .unwrap_or_else(|| param_name.to_string()),
            ParamAttr::Cookie(key) => key.as_ref().map(LitStr::value).unwrap_or_default(),
            _ => String::new(),
        };
        ParamBinding::new(index, self.role(), key)
    }
}

impl ToTokens for DestinationKind {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let variant = match self {
            DestinationKind::IncomingDataCallback => quote! { IncomingDataCallback },
            DestinationKind::DownloadToFile => quote! { DownloadToFile },
            DestinationKind::DownloadToStream => quote! { DownloadToStream },
            DestinationKind::NetworkOutputQueue => quote! { NetworkOutputQueue },
        };
        tokens.extend(quote! { ::rcp_common::DestinationKind::#variant });
    }
}

impl ToTokens for ProxyType {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.extend(match self {
            ProxyType::Http => quote! { ::rcp_common::ProxyType::Http },
            ProxyType::Socks5 => quote! { ::rcp_common::ProxyType::Socks5 },
        });
    }
}

fn option_string(value: &Option<String>) -> TokenStream {
    match value {
        Some(value) => quote! { ::std::option::Option::Some(#value.to_string()) },
        None => quote! { ::std::option::Option::None },
    }
}

impl ToTokens for ProxyConfig {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.extend(match self {
            ProxyConfig::Url(url) => quote! { ::rcp_common::ProxyConfig::Url(#url.to_string()) },
            ProxyConfig::Disabled(flag) => quote! { ::rcp_common::ProxyConfig::Disabled(#flag) },
            ProxyConfig::Full {
                proxy_type,
                url,
                username,
                password,
                no_proxy,
            } => {
                let proxy_type = match proxy_type {
                    Some(proxy_type) => quote! { ::std::option::Option::Some(#proxy_type) },
                    None => quote! { ::std::option::Option::None },
                };
                let username = option_string(username);
                let password = option_string(password);
                let no_proxy = option_string(no_proxy);
                quote! {
                    ::rcp_common::ProxyConfig::Full {
                        proxy_type: #proxy_type,
                        url: #url.to_string(),
                        username: #username,
                        password: #password,
                        no_proxy: #no_proxy,
                    }
                }
            }
        });
    }
}
