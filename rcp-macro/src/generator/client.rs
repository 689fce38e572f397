use proc_macro2::TokenStream;
use quote::quote;
use rcp_common::ClientArgs;
use syn::{Fields, ItemStruct, parse_quote};

/// 生成客户端结构体与会话声明
///
/// 结构体被改写为只持有注册表句柄，`new` 在首次构造时合并会话配置并执行 `declare_routes`。
pub fn generate_client_impl(mut input: ItemStruct, args: &ClientArgs) -> syn::Result<TokenStream> {
    if !matches!(input.fields, Fields::Unit) {
        return Err(syn::Error::new_spanned(
            &input.fields,
            "rcp_client must be placed on a unit struct",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "rcp_client does not support generic structs",
        ));
    }

    let name = input.ident.clone();
    input.fields = Fields::Named(parse_quote! {
        { registry: ::rcp_common::Registry }
    });
    input.semi_token = None;
    let vis = &input.vis;
    let session = generate_session_fragment(args);
    let destination = args.destination.as_ref().map(|method| {
        quote! {
            fn destination(
                &self,
                kind: ::rcp_common::DestinationKind,
                name: &str,
            ) -> ::std::option::Option<::rcp_common::Destination> {
                self.#method(kind, name)
            }
        }
    });

    Ok(quote! {
        #input

        impl #name {
            #vis fn new(registry: &::rcp_common::Registry) -> Self {
                registry.declare::<Self>(|registry| {
                    registry.merge_session::<Self>(#session);
                    Self::declare_routes(registry);
                });
                #name {
                    registry: registry.clone(),
                }
            }
        }

        impl ::rcp_common::Client for #name {
            fn registry(&self) -> &::rcp_common::Registry {
                &self.registry
            }

            #destination
        }
    })
}

/// 会话配置片段，按声明顺序链式构造
fn generate_session_fragment(args: &ClientArgs) -> TokenStream {
    let mut fragment = quote! { ::rcp_common::SessionConfig::default() };

    if let Some(base_address) = &args.base_address {
        fragment.extend(quote! { .with_base_address(#base_address) });
    }
    for (key, value) in &args.headers {
        fragment.extend(quote! { .with_header(#key, #value) });
    }
    for (key, value) in &args.cookies {
        fragment.extend(quote! { .with_cookie(#key, #value) });
    }
    for interceptor in &args.interceptors {
        fragment.extend(quote! {
            .with_interceptor(registry.shared_interceptor::<#interceptor>())
        });
    }
    if args.has_connection() {
        let timeout_ms = option_u64(args.timeout_ms);
        let connect_timeout_ms = option_u64(args.connect_timeout_ms);
        let proxy = match &args.proxy {
            Some(proxy) => quote! { ::std::option::Option::Some(#proxy) },
            None => quote! { ::std::option::Option::None },
        };
        fragment.extend(quote! {
            .with_connection(::rcp_common::ConnectionOptions {
                timeout_ms: #timeout_ms,
                connect_timeout_ms: #connect_timeout_ms,
                proxy: #proxy,
                ..::std::default::Default::default()
            })
        });
    }
    fragment
}

fn option_u64(value: Option<u64>) -> TokenStream {
    match value {
        Some(value) => quote! { ::std::option::Option::Some(#value) },
        None => quote! { ::std::option::Option::None },
    }
}
