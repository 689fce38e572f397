use std::str::FromStr;

use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Ident, LitStr, Path, Token};

use crate::types::args::ClientArgs;
use crate::types::options::{ProxyConfig, ProxyType};
use crate::types::retry::parse_duration;

impl Parse for ClientArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ClientArgs::default();

        let pairs = Punctuated::<syn::Meta, Token![,]>::parse_terminated(input)?;
        for meta in pairs {
            match meta {
                syn::Meta::NameValue(nv) => {
                    let key = nv.path.get_ident().ok_or_else(|| {
                        syn::Error::new_spanned(&nv.path, "expected identifier as key")
                    })?;
                    match key.to_string().as_str() {
                        "base_address" => args.base_address = Some(parse_string_value(&nv.value, "base_address")?),
                        "header" => args.headers.push(parse_pair(&nv.value, ':', "header", "Name: value")?),
                        "cookie" => args.cookies.push(parse_pair(&nv.value, '=', "cookie", "name=value")?),
                        "interceptor" => args.interceptors.push(parse_interceptor_value(&nv.value)?),
                        "timeout" => args.timeout_ms = Some(parse_duration_value(&nv.value, "timeout")?),
                        "connect_timeout" => {
                            args.connect_timeout_ms = Some(parse_duration_value(&nv.value, "connect_timeout")?)
                        }
                        "proxy" => args.proxy = Some(parse_proxy_simple_value(&nv.value)?),
                        "destination" => args.destination = Some(parse_ident_value(&nv.value, "destination")?),
                        _ => {
                            return Err(syn::Error::new_spanned(
                                key,
                                "Only 'base_address', 'header', 'cookie', 'interceptor', 'timeout', \
                                 'connect_timeout', 'proxy', or 'destination' are supported",
                            ));
                        }
                    }
                }
                syn::Meta::List(ml) if ml.path.is_ident("proxy") => {
                    args.proxy = Some(parse_proxy_full_value(&ml)?);
                }
                _ => {
                    return Err(syn::Error::new_spanned(meta, "Expected key-value pair or function-like macro"));
                }
            }
        }

        Ok(args)
    }
}

pub(crate) fn parse_string_value(value: &syn::Expr, name: &str) -> syn::Result<LitStr> {
    if let syn::Expr::Lit(syn::ExprLit {
        lit: syn::Lit::Str(lit),
        ..
    }) = value
    {
        Ok(lit.clone())
    } else {
        Err(syn::Error::new_spanned(
            value,
            format!("{} must be a string literal", name),
        ))
    }
}

/// 解析 `"Name: value"` 或 `"name=value"` 形式的键值对
fn parse_pair(value: &syn::Expr, separator: char, name: &str, example: &str) -> syn::Result<(String, String)> {
    let lit = parse_string_value(value, name)?;
    let raw = lit.value();
    match raw.split_once(separator) {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.trim().to_string())),
        _ => Err(syn::Error::new_spanned(
            &lit,
            format!("{} must look like \"{}\"", name, example),
        )),
    }
}

fn parse_interceptor_value(value: &syn::Expr) -> syn::Result<Path> {
    if let syn::Expr::Path(expr_path) = value {
        Ok(expr_path.path.clone())
    } else {
        Err(syn::Error::new_spanned(
            value,
            "interceptor must be a type path",
        ))
    }
}

fn parse_ident_value(value: &syn::Expr, name: &str) -> syn::Result<Ident> {
    if let syn::Expr::Path(expr_path) = value {
        if let Some(ident) = expr_path.path.get_ident() {
            return Ok(ident.clone());
        }
    }
    Err(syn::Error::new_spanned(
        value,
        format!("{} must be a method name", name),
    ))
}

pub(crate) fn parse_duration_value(value: &syn::Expr, name: &str) -> syn::Result<u64> {
    match value {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => parse_duration(&lit.value()).map_err(|msg| syn::Error::new_spanned(lit, msg)),
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(lit),
            ..
        }) => lit.base10_parse(),
        _ => Err(syn::Error::new_spanned(
            value,
            format!("{} must be a duration such as \"5s\" or \"500ms\"", name),
        )),
    }
}

fn parse_proxy_simple_value(value: &syn::Expr) -> syn::Result<ProxyConfig> {
    match value {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => Ok(ProxyConfig::Url(lit.value())),
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Bool(lit),
            ..
        }) => {
            if lit.value {
                Err(syn::Error::new_spanned(
                    value,
                    "proxy = true is not supported, use proxy = \"url\" instead",
                ))
            } else {
                Ok(ProxyConfig::Disabled(false))
            }
        }
        _ => Err(syn::Error::new_spanned(
            value,
            "proxy must be a string literal (URL) or false (to disable)",
        )),
    }
}

fn parse_proxy_full_value(meta_list: &syn::MetaList) -> syn::Result<ProxyConfig> {
    let mut proxy_type = None;
    let mut url = None;
    let mut username = None;
    let mut password = None;
    let mut no_proxy = None;

    let nested = meta_list.parse_args_with(Punctuated::<syn::Meta, Token![,]>::parse_terminated)?;

    for meta in nested {
        let syn::Meta::NameValue(nv) = meta else {
            return Err(syn::Error::new_spanned(meta, "Expected key-value pair in proxy configuration"));
        };
        if nv.path.is_ident("type") {
            let ident = parse_ident_value(&nv.value, "proxy type")?;
            proxy_type = Some(
                ProxyType::from_str(&ident.to_string()).map_err(|msg| syn::Error::new_spanned(&ident, msg))?,
            );
        } else if nv.path.is_ident("url") {
            url = Some(parse_string_value(&nv.value, "url")?.value());
        } else if nv.path.is_ident("username") {
            username = Some(parse_string_value(&nv.value, "username")?.value());
        } else if nv.path.is_ident("password") {
            password = Some(parse_string_value(&nv.value, "password")?.value());
        } else if nv.path.is_ident("no_proxy") {
            no_proxy = Some(parse_string_value(&nv.value, "no_proxy")?.value());
        } else {
            return Err(syn::Error::new_spanned(
                &nv.path,
                "Only 'type', 'url', 'username', 'password', or 'no_proxy' are supported in proxy configuration",
            ));
        }
    }

    let url = url.ok_or_else(|| {
        syn::Error::new_spanned(&meta_list.path, "proxy configuration must include 'url'")
    })?;

    Ok(ProxyConfig::Full {
        proxy_type,
        url,
        username,
        password,
        no_proxy,
    })
}

/// 解析客户端参数，供 `parse_macro_input!` 使用
pub fn parse_client_args(input: ParseStream) -> syn::Result<ClientArgs> {
    ClientArgs::parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use syn::parse_quote;

    #[test]
    fn test_parse_full_client_args() {
        let tokens = quote! {
            base_address = "https://api.example.com",
            header = "Accept: application/json",
            header = "X-Client: rcp",
            cookie = "lang=en",
            interceptor = AuthInterceptor,
            timeout = "5s",
            connect_timeout = 500,
            destination = destinations
        };
        let args = syn::parse2::<ClientArgs>(tokens).unwrap();

        assert_eq!(args.base_address.unwrap().value(), "https://api.example.com");
        assert_eq!(
            args.headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("X-Client".to_string(), "rcp".to_string()),
            ]
        );
        assert_eq!(args.cookies, vec![("lang".to_string(), "en".to_string())]);
        assert_eq!(args.interceptors.len(), 1);
        assert_eq!(args.timeout_ms, Some(5000));
        assert_eq!(args.connect_timeout_ms, Some(500));
        assert_eq!(args.destination.unwrap().to_string(), "destinations");
    }

    #[test]
    fn test_parse_proxy_forms() {
        let simple = syn::parse2::<ClientArgs>(quote! { proxy = "http://proxy:8080" }).unwrap();
        assert_eq!(simple.proxy, Some(ProxyConfig::Url("http://proxy:8080".into())));

        let disabled = syn::parse2::<ClientArgs>(quote! { proxy = false }).unwrap();
        assert!(disabled.proxy.unwrap().is_disabled());

        let full = syn::parse2::<ClientArgs>(quote! {
            proxy(type = socks5, url = "127.0.0.1:1080", username = "u", password = "p")
        })
        .unwrap();
        assert_eq!(full.proxy.unwrap().proxy_type(), Some(ProxyType::Socks5));
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_values() {
        assert!(syn::parse2::<ClientArgs>(quote! { base_url = "x" }).is_err());
        assert!(syn::parse2::<ClientArgs>(quote! { header = "no separator" }).is_err());
        assert!(syn::parse2::<ClientArgs>(quote! { proxy = true }).is_err());
        assert!(syn::parse2::<ClientArgs>(quote! { proxy(type = ftp, url = "x") }).is_err());
        assert!(syn::parse2::<ClientArgs>(quote! { proxy(type = http) }).is_err());
        assert!(syn::parse2::<ClientArgs>(quote! { timeout = "soon" }).is_err());
    }

    #[test]
    fn test_parse_string_value() {
        let expr = parse_quote! { 123 };
        assert!(parse_string_value(&expr, "base_address").is_err());
        let expr = parse_quote! { "https://api.example.com" };
        assert_eq!(parse_string_value(&expr, "base_address").unwrap().value(), "https://api.example.com");
    }
}
