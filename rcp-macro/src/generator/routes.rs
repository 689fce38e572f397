use proc_macro2::TokenStream;
use quote::quote;
use syn::{ImplItem, ItemImpl};

use super::method::expand_method;

/// 为 `#[rcp_routes]` 标注的 impl 块生成路由声明
///
/// 路由方法的方法体被替换为对注册表的调用，
/// 所有声明集中到生成的 `declare_routes` 中，由客户端构造时执行一次。
pub fn generate_routes_impl(mut input: ItemImpl) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "rcp_routes does not support generic impl blocks",
        ));
    }
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "rcp_routes must be placed on an inherent impl block",
        ));
    }

    let self_ty = (*input.self_ty).clone();
    let mut declarations = TokenStream::new();
    let mut items = TokenStream::new();
    let mut route_names = Vec::new();

    for item in input.items.iter_mut() {
        if let ImplItem::Fn(method) = item {
            let expansion = expand_method(&self_ty, method)?;
            declarations.extend(expansion.declarations);
            items.extend(expansion.items);
            route_names.extend(expansion.route_name);
        }
    }

    Ok(quote! {
        #input

        #items

        impl #self_ty {
            #[doc(hidden)]
            pub fn declare_routes(registry: &::rcp_common::Registry) {
                #declarations
                registry.infer_routes::<Self>(&[#(#route_names),*]);
            }
        }
    })
}
