//! rcp 声明式 HTTP 客户端的过程宏
//!
//! ```ignore
//! #[rcp_client(base_address = "https://jsonplaceholder.typicode.com", header = "Accept: application/json")]
//! pub struct Placeholder;
//!
//! #[rcp_routes]
//! impl Placeholder {
//!     #[get("/posts")]
//!     #[retry(2)]
//!     async fn posts(&self, #[query("userId")] user_id: u32) -> rcp_common::Result<Vec<Post>> {}
//! }
//! ```

mod conversion;
mod error;
mod generator;

use proc_macro::TokenStream;
use rcp_common::parse_client_args;
use syn::{ItemImpl, ItemStruct, parse_macro_input};

/// 声明客户端类型及其会话配置
///
/// 支持的参数：`base_address`、`header = "K: V"`、`cookie = "k=v"`、
/// `interceptor = Type`、`timeout`、`connect_timeout`、`proxy`、`destination = method`。
/// 结构体必须是无字段的单元结构体。
#[proc_macro_attribute]
pub fn rcp_client(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    let args = parse_macro_input!(args with parse_client_args);

    generator::generate_client_impl(input, &args)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// 声明客户端的路由方法
///
/// 方法级属性：`get`/`post`/`put`/`delete`/`patch`/`head`/`options`/`request`、
/// `retry`、`auto_close`、`header`、`cookie`、`map`、`destination`、`interceptor`、`no_request`。
/// 参数级属性：`query`、`content`、`header`、`cookie`、`cancel_token`、`transfer_range`。
///
/// 没有动词属性的 `async fn(&self, ..)` 按方法名推断路由。
#[proc_macro_attribute]
pub fn rcp_routes(args: TokenStream, item: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "rcp_routes does not take arguments",
        )
        .into_compile_error()
        .into();
    }
    let input = parse_macro_input!(item as ItemImpl);

    generator::generate_routes_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
