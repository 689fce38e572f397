use heck::ToUpperCamelCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use rcp_common::{ParamAttr, RetryArg, RouteAttr};
use syn::ext::IdentExt;
use syn::{FnArg, ImplItemFn, Pat, Type, parse_quote};

use crate::conversion::{generate_arg_conversion, generate_type_conversion};
use crate::error::ErrorHandler;

/// 单个方法展开的结果
#[derive(Default)]
pub struct MethodExpansion {
    /// 在 `declare_routes` 中执行的注册语句
    pub declarations: TokenStream,
    /// 需要放在 impl 块之外的条目
    pub items: TokenStream,
    /// 参与默认路由推断的成员名
    pub route_name: Option<String>,
}

/// 按方法上的属性决定展开方式
///
/// - `#[no_request]`：保持原样，标记为非请求
/// - `#[interceptor]`：保持原样，注册为拦截器
/// - 路由属性或满足 `async fn(&self, ..)`：替换方法体为调用注册表
/// - 其他方法保持原样
pub fn expand_method(self_ty: &Type, item: &mut ImplItemFn) -> syn::Result<MethodExpansion> {
    let mut route_attrs = Vec::new();
    let mut kept = Vec::new();
    for attr in item.attrs.drain(..) {
        match RouteAttr::from_attribute(&attr)? {
            Some(route_attr) => route_attrs.push((attr, route_attr)),
            None => kept.push(attr),
        }
    }
    item.attrs = kept;

    let name = item.sig.ident.unraw().to_string();

    if let Some((attr, _)) = route_attrs
        .iter()
        .find(|(_, route_attr)| matches!(route_attr, RouteAttr::NoRequest))
    {
        if route_attrs.len() > 1 {
            return Err(syn::Error::new_spanned(
                attr,
                "no_request cannot be combined with other route attributes",
            ));
        }
        return Ok(MethodExpansion {
            declarations: quote! { registry.mark_not_request::<Self>(#name); },
            ..Default::default()
        });
    }

    if let Some((attr, index)) = route_attrs.iter().find_map(|(attr, route_attr)| match route_attr {
        RouteAttr::Interceptor(index) => Some((attr, *index)),
        _ => None,
    }) {
        if route_attrs.len() > 1 {
            return Err(syn::Error::new_spanned(
                attr,
                "interceptor cannot be combined with other route attributes",
            ));
        }
        return expand_interceptor(self_ty, item, &name, index);
    }

    if route_attrs.is_empty() && !ErrorHandler::is_route_candidate(&item.sig) {
        return Ok(MethodExpansion::default());
    }

    let route_attrs = route_attrs.into_iter().map(|(_, route_attr)| route_attr).collect();
    expand_route(item, &name, route_attrs)
}

/// 把方法注册为会话拦截器，生成捕获接收者的标记类型
fn expand_interceptor(
    self_ty: &Type,
    item: &ImplItemFn,
    name: &str,
    index: Option<usize>,
) -> syn::Result<MethodExpansion> {
    ErrorHandler::validate_interceptor_signature(&item.sig)?;

    let method = &item.sig.ident;
    let type_name = match self_ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    let marker = format_ident!(
        "__Rcp{}{}Interceptor",
        type_name.to_upper_camel_case(),
        name.to_upper_camel_case()
    );
    let index = match index {
        Some(index) => quote! { ::std::option::Option::Some(#index) },
        None => quote! { ::std::option::Option::None },
    };

    Ok(MethodExpansion {
        declarations: quote! {
            registry.mark_not_request::<Self>(#name);
            registry.insert_interceptor::<Self>(
                #index,
                ::std::sync::Arc::new(::rcp_common::CapturedMethod::<Self, #marker>::new(#marker)),
            );
        },
        items: quote! {
            #[doc(hidden)]
            struct #marker;

            #[::rcp_common::async_trait]
            impl ::rcp_common::MethodInterceptor<#self_ty> for #marker {
                async fn call(
                    &self,
                    receiver: &#self_ty,
                    context: &mut ::rcp_common::RequestContext<'_>,
                    next: ::rcp_common::Next<'_>,
                ) -> ::rcp_common::Result<::rcp_common::Response> {
                    receiver
                        .#method(context, next)
                        .await
                        .map_err(::std::convert::Into::into)
                }
            }
        },
        route_name: None,
    })
}

/// 替换路由方法体，并生成对应的路由绑定与请求配置
fn expand_route(item: &mut ImplItemFn, name: &str, route_attrs: Vec<RouteAttr>) -> syn::Result<MethodExpansion> {
    ErrorHandler::validate_route_signature(&item.sig)?;
    let ok_type = ErrorHandler::validate_and_extract_ok_type(&item.sig.output)?.clone();

    let mut bindings = Vec::new();
    let mut conversions = Vec::new();
    for (index, input) in item.sig.inputs.iter_mut().skip(1).enumerate() {
        let FnArg::Typed(pat_type) = input else {
            return Err(syn::Error::new_spanned(input, "unexpected receiver"));
        };
        let ident = match &*pat_type.pat {
            Pat::Ident(pat_ident) => pat_ident.ident.clone(),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "route parameters must be plain identifiers",
                ));
            }
        };

        let mut param_attrs = Vec::new();
        let mut kept = Vec::new();
        for attr in pat_type.attrs.drain(..) {
            match ParamAttr::from_attribute(&attr)? {
                Some(param_attr) => param_attrs.push((attr, param_attr)),
                None => kept.push(attr),
            }
        }
        pat_type.attrs = kept;

        if let Some((attr, _)) = param_attrs.get(1) {
            return Err(syn::Error::new_spanned(
                attr,
                "a parameter can have only one binding attribute",
            ));
        }
        if let Some((_, param_attr)) = param_attrs.first() {
            bindings.push(param_attr.binding(index, &ident.unraw().to_string()));
        }
        conversions.push(generate_arg_conversion(&ident, &pat_type.ty));
    }

    if let Some(RouteAttr::Bind { path, .. }) = route_attrs.iter().filter(|route_attr| route_attr.is_bind()).nth(1) {
        return Err(syn::Error::new_spanned(
            path,
            "a route method can have only one verb attribute",
        ));
    }

    let mut declarations = TokenStream::new();
    let mut fragment = quote! { ::rcp_common::RequestConfig::default() };
    let mut mapped = false;

    for route_attr in &route_attrs {
        match route_attr {
            RouteAttr::Bind {
                method,
                path,
                timeout_ms,
            } => {
                let configuration = match timeout_ms {
                    Some(ms) => quote! {
                        ::std::option::Option::Some(::rcp_common::TransportOptions {
                            timeout_ms: ::std::option::Option::Some(#ms),
                            ..::std::default::Default::default()
                        })
                    },
                    None => quote! { ::std::option::Option::None },
                };
                declarations.extend(quote! {
                    registry.bind::<Self>(#name, #method, #path, #configuration);
                });
            }
            RouteAttr::Retry(RetryArg::Count(count)) => fragment.extend(quote! { .with_retry(#count) }),
            RouteAttr::Retry(RetryArg::Policy(config)) => {
                let policy = &config.policy;
                fragment.extend(quote! { .with_backoff(#policy) });
            }
            RouteAttr::AutoClose(auto_close) => fragment.extend(quote! { .with_auto_close(#auto_close) }),
            RouteAttr::Header(key, value) => fragment.extend(quote! { .with_header(#key, #value) }),
            RouteAttr::Cookie(key, value) => fragment.extend(quote! { .with_cookie(#key, #value) }),
            RouteAttr::Map(map) => {
                mapped = true;
                fragment.extend(quote! { .with_map(::rcp_common::ResponseMap::new(#map)) });
            }
            RouteAttr::Destination { kind, accessor } => fragment.extend(quote! {
                .with_destination(::rcp_common::ResponseSet::accessor(#kind, #accessor))
            }),
            RouteAttr::Interceptor(_) | RouteAttr::NoRequest => {}
        }
    }
    for binding in &bindings {
        fragment.extend(quote! { .with_param(#binding) });
    }
    declarations.extend(quote! {
        registry.merge_request::<Self>(#name, #fragment);
    });

    let conversion = generate_type_conversion(&ok_type, mapped);
    item.block = parse_quote! {{
        let args: ::std::vec::Vec<::rcp_common::Arg> = ::std::vec![#(#conversions),*];
        let output = ::rcp_common::Client::registry(self)
            .invoke(self, #name, args)
            .await?;
        ::std::result::Result::Ok(#conversion?)
    }};

    Ok(MethodExpansion {
        declarations,
        items: TokenStream::new(),
        route_name: Some(name.to_string()),
    })
}
