use std::fmt;
use std::str::FromStr;

use proc_macro2::{Ident, Span, TokenStream};
use quote::{ToTokens, quote};
use syn::parse::{Parse, ParseStream};

/// HTTP 方法枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Head,
    Put,
    Delete,
    Patch,
    Options,
}

impl HttpMethod {
    /// 按路由推断时的匹配顺序排列
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Head,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Options,
    ];

    /// 返回HTTP方法的字符串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Head => "HEAD",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// 返回枚举变体标识符，供宏生成代码使用
    pub fn variant_ident(&self) -> Ident {
        Ident::new(
            match self {
                HttpMethod::Get => "Get",
                HttpMethod::Post => "Post",
                HttpMethod::Head => "Head",
                HttpMethod::Put => "Put",
                HttpMethod::Delete => "Delete",
                HttpMethod::Patch => "Patch",
                HttpMethod::Options => "Options",
            },
            Span::call_site(),
        )
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unsupported http method: {}", s))
    }
}

impl Parse for HttpMethod {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let ident: Ident = input.parse()?;
        ident.to_string().parse().map_err(|msg: String| syn::Error::new_spanned(&ident, msg))
    }
}

impl ToTokens for HttpMethod {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let variant = self.variant_ident();
        tokens.extend(quote! { ::rcp_common::HttpMethod::#variant });
    }
}

/// 由成员名推断请求方法与路径
///
/// `getUser` => `GET user`，`fetchAll` => `GET fetchall`。
/// 动词与路径之间的空白或下划线会被跳过，因此 `get_user` 同样得到 `GET user`。
pub fn infer_route(member: &str) -> (HttpMethod, String) {
    for method in HttpMethod::ALL {
        let verb = method.as_str();
        let matched = member
            .get(..verb.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(verb));
        if matched {
            let rest = member[verb.len()..]
                .trim_start_matches(|c: char| c.is_whitespace() || c == '_');
            return (method, rest.to_lowercase());
        }
    }
    (HttpMethod::Get, member.to_lowercase())
}
